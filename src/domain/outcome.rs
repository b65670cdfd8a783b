use super::payload::GatewayResponse;
use super::response_code::{ResponseCode, TxnStatus};
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};

const GENERIC_CUSTOMER_MESSAGE: &str =
    "We are unable to process this request. Please contact support";
const TIMEOUT_CUSTOMER_MESSAGE: &str = "The payment gateway did not respond in time";

/// Sale status understood by the POS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SaleStatus {
    Accepted,
    Cancelled,
    Declined,
    Failed,
    Timeout,
    Unknown,
}

impl From<TxnStatus> for SaleStatus {
    fn from(status: TxnStatus) -> Self {
        match status {
            TxnStatus::Approved => SaleStatus::Accepted,
            TxnStatus::Declined => SaleStatus::Declined,
            TxnStatus::Failed => SaleStatus::Failed,
        }
    }
}

/// Canonical result of one gateway operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub txn_status: TxnStatus,
    pub sale_status: SaleStatus,
    pub customer_message: String,
    pub log_message: String,
    /// Gateway purchase number, only set on approval.
    pub purchase_number: Option<String>,
    /// Amount reported back to the register.
    pub amount: String,
    pub register_id: String,
}

impl Outcome {
    /// Builds the outcome for a classified, authenticated gateway reply.
    pub fn from_response(
        code: &ResponseCode,
        response: &GatewayResponse,
        amount: impl Into<String>,
        register_id: impl Into<String>,
    ) -> Self {
        let approved = code.txn_status == TxnStatus::Approved;
        Self {
            txn_status: code.txn_status,
            sale_status: code.txn_status.into(),
            customer_message: code.customer_message.to_string(),
            log_message: format!("{} ({})", code.log_message, response.code),
            purchase_number: (approved && !response.purchase_number.is_empty())
                .then(|| response.purchase_number.clone()),
            amount: if approved { amount.into() } else { String::new() },
            register_id: register_id.into(),
        }
    }

    /// Turns an error into a failed outcome with a customer-safe message.
    ///
    /// The log message keeps the specific reason.
    pub fn from_error(err: &GatewayError, register_id: impl Into<String>) -> Self {
        let (sale_status, customer_message) = if err.is_timeout() {
            (SaleStatus::Timeout, TIMEOUT_CUSTOMER_MESSAGE)
        } else {
            (SaleStatus::Failed, GENERIC_CUSTOMER_MESSAGE)
        };
        Self {
            txn_status: TxnStatus::Failed,
            sale_status,
            customer_message: customer_message.to_string(),
            log_message: err.to_string(),
            purchase_number: None,
            amount: String::new(),
            register_id: register_id.into(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.txn_status == TxnStatus::Approved
    }
}
