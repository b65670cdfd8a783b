use crate::error::{GatewayError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Whether a POS request charges the customer or gives money back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentIntent {
    Payment,
    Refund,
}

/// Per-flow state carried from the POS request to the gateway call.
///
/// Lives in the session while the register is sent through registration and
/// is discarded once the payment or refund completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentContext {
    pub origin_domain: String,
    pub pos_register_id: String,
    #[serde(default)]
    pub sale_id: String,
    /// Amount in minor units, signed as the POS sent it.
    pub amount: String,
    /// Amount in major units as the POS sent it. Negative for refunds.
    pub amount_major: Decimal,
    #[serde(default)]
    pub purchase_code: String,
}

impl PaymentContext {
    /// Builds a context from the POS request, parsing and converting the amount.
    pub fn from_request(
        origin_domain: impl Into<String>,
        pos_register_id: impl Into<String>,
        amount: &str,
    ) -> Result<Self> {
        let amount_major = parse_amount(amount)?;
        let minor = to_minor_units(amount_major).map_err(|_| GatewayError::InvalidAmount {
            amount: amount.to_string(),
            reason: "amount is out of range".to_string(),
        })?;
        Ok(Self {
            origin_domain: origin_domain.into(),
            pos_register_id: pos_register_id.into(),
            sale_id: String::new(),
            amount: minor,
            amount_major,
            purchase_code: String::new(),
        })
    }

    pub fn with_sale_id(mut self, sale_id: impl Into<String>) -> Self {
        self.sale_id = sale_id.into().trim().to_string();
        self
    }

    pub fn with_purchase_code(mut self, purchase_code: impl Into<String>) -> Self {
        self.purchase_code = purchase_code.into().trim().to_string();
        self
    }

    /// A negative amount marks a refund.
    pub fn intent(&self) -> PaymentIntent {
        if self.amount_major.is_sign_negative() && !self.amount_major.is_zero() {
            PaymentIntent::Refund
        } else {
            PaymentIntent::Payment
        }
    }

    /// The sign-stripped minor-unit amount the gateway expects.
    pub fn gateway_amount(&self) -> String {
        self.amount.trim_start_matches('-').to_string()
    }
}

/// Parses a POS decimal amount such as `"44.00"` or `"-12.5"`.
pub fn parse_amount(amount: &str) -> Result<Decimal> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::InvalidAmount {
            amount: amount.to_string(),
            reason: "amount is required".to_string(),
        });
    }
    trimmed
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|e| GatewayError::InvalidAmount {
            amount: amount.to_string(),
            reason: e.to_string(),
        })
}

/// Major units to a whole number of minor units, e.g. `44.005` → `"4400"`.
///
/// Midpoints round to even. Fails when the amount has no minor-unit
/// representation within `Decimal` range.
pub fn to_minor_units(amount: Decimal) -> Result<String> {
    let minor = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| GatewayError::InvalidAmount {
            amount: amount.to_string(),
            reason: "amount is out of range".to_string(),
        })?;
    Ok(minor
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .normalize()
        .to_string())
}
