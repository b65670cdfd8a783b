use crate::application::flow::FlowResult;
use crate::domain::outcome::{Outcome, SaleStatus};
use crate::domain::terminal::TerminalBinding;
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};

/// Redirect target telling the POS to send the register through registration.
pub const REGISTER_REDIRECT: &str = "register";

/// What the proxy reports back to the POS for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyResponse {
    /// Gateway purchase number, or the device id for a lookup.
    pub id: String,
    pub amount: String,
    pub register_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SaleStatus>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ProxyResponse {
    pub fn from_outcome(outcome: Outcome) -> Self {
        Self {
            id: outcome.purchase_number.unwrap_or_default(),
            amount: outcome.amount,
            register_id: outcome.register_id,
            status: Some(outcome.sale_status),
            message: outcome.customer_message,
            ..Default::default()
        }
    }

    pub fn from_flow(result: FlowResult, register_id: &str, session_id: &str) -> Self {
        match result {
            FlowResult::Completed(outcome) => Self::from_outcome(outcome),
            FlowResult::NeedsRegistration => Self::needs_registration(register_id, Some(session_id)),
        }
    }

    pub fn needs_registration(register_id: &str, session_id: Option<&str>) -> Self {
        Self {
            register_id: register_id.to_string(),
            message: "This register is not yet linked to the payment gateway".to_string(),
            redirect: Some(REGISTER_REDIRECT.to_string()),
            session_id: session_id.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn bound(binding: &TerminalBinding) -> Self {
        Self {
            id: binding.gateway_device_id.clone(),
            register_id: binding.pos_register_id.clone(),
            message: format!("Register is bound to merchant {}", binding.gateway_merchant_id),
            ..Default::default()
        }
    }

    /// Customer-safe failure; the detailed reason goes to the log only.
    pub fn from_error(err: &GatewayError, register_id: &str) -> Self {
        tracing::error!(%err, register_id, "request failed");
        Self::from_outcome(Outcome::from_error(err, register_id))
    }
}
