//! Gateway result codes and their canonical classification.
//!
//! Each operation has its own table. A code only has meaning for the
//! operation whose table lists it; unrecognized codes fall back to the
//! table's `EISE01` server-error entry.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The code every table uses for an unrecognized or server-side failure.
pub const GENERIC_FAILURE_CODE: &str = "EISE01";

const SUPPORT_CONTACT: &str = "Please contact pit@oxipay.com.au for further support";
const INVALID_REQUEST: &str = "The request to Oxipay was invalid. You can try again with a different Payment Code. Please contact pit@oxipay.com.au for further support";
const SIGNATURE_MISMATCH_LOG: &str =
    "Signature mismatch error. Has the terminal changed, try removing the key for the device?";

/// The gateway operation a result code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Registration,
    Authorisation,
    SalesAdjustment,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Registration => "registration",
            OperationType::Authorisation => "authorisation",
            OperationType::SalesAdjustment => "sales adjustment",
        };
        f.write_str(name)
    }
}

/// Canonical transaction status, independent of the raw gateway code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxnStatus {
    Approved,
    Declined,
    Failed,
}

/// Classification of one gateway result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCode {
    pub txn_status: TxnStatus,
    pub log_message: &'static str,
    pub customer_message: &'static str,
}

const fn entry(
    code: &'static str,
    txn_status: TxnStatus,
    log_message: &'static str,
    customer_message: &'static str,
) -> (&'static str, ResponseCode) {
    (
        code,
        ResponseCode {
            txn_status,
            log_message,
            customer_message,
        },
    )
}

use TxnStatus::{Approved, Declined, Failed};

const REGISTRATION_CODES: &[(&str, ResponseCode)] = &[
    entry("SCRK01", Approved, "SUCCESS", "SUCCESS"),
    entry(
        "FCRK01",
        Failed,
        "Device token provided could not be found",
        "Device token provided could not be found",
    ),
    entry(
        "FCRK02",
        Failed,
        "Device token provided has already been used",
        "Device token provided has already been used",
    ),
    entry("EVAL01", Failed, "Request is invalid", INVALID_REQUEST),
    entry("ESIG01", Failed, SIGNATURE_MISMATCH_LOG, SUPPORT_CONTACT),
    entry(GENERIC_FAILURE_CODE, Failed, "Server Error", SUPPORT_CONTACT),
];

const AUTHORISATION_CODES: &[(&str, ResponseCode)] = &[
    entry("SPRA01", Approved, "APPROVED", "APPROVED"),
    entry(
        "FPRA01",
        Declined,
        "Declined due to internal risk assessment against the customer",
        "Do not try again",
    ),
    entry(
        "FPRA02",
        Declined,
        "Declined due to insufficient funds for the deposit",
        "Please call customer support",
    ),
    entry(
        "FPRA03",
        Failed,
        "Declined as communication to the bank is currently unavailable",
        "Please try again shortly. Communication to the bank is unavailable",
    ),
    entry(
        "FPRA04",
        Declined,
        "Declined because the customer limit has been exceeded",
        "Please contact Oxipay customer support",
    ),
    entry(
        "FPRA05",
        Declined,
        "Declined due to negative payment history for the customer",
        "Please contact Oxipay customer support for more information",
    ),
    entry(
        "FPRA06",
        Declined,
        "Declined because the credit-card used for the deposit is expired",
        "Declined because the credit-card used for the deposit is expired",
    ),
    entry(
        "FPRA07",
        Declined,
        "Declined because supplied POSTransactionRef has already been processed",
        "We have seen this Transaction ID before, please try again",
    ),
    entry(
        "FPRA08",
        Declined,
        "Declined because the instalment amount was below the minimum threshold",
        "Transaction below minimum",
    ),
    entry(
        "FPRA09",
        Declined,
        "Declined because purchase amount exceeded pre-approved amount",
        "Please contact Oxipay customer support",
    ),
    entry(
        "FPRA21",
        Declined,
        "The Payment Code was not found",
        "This is not a valid Payment Code.",
    ),
    entry(
        "FPRA22",
        Declined,
        "The Payment Code has already been used",
        "The Payment Code has already been used",
    ),
    entry(
        "FPRA23",
        Declined,
        "The Payment Code has expired",
        "The Payment Code has expired",
    ),
    entry(
        "FPRA24",
        Declined,
        "The Payment Code has been cancelled",
        "Payment Code has been cancelled. Please try again with a new Payment Code",
    ),
    entry(
        "FPRA99",
        Declined,
        "DECLINED by Oxipay Gateway",
        "Transaction has been declined by the Oxipay Gateway",
    ),
    entry("EVAL02", Failed, "Request is invalid", INVALID_REQUEST),
    entry("ESIG01", Failed, SIGNATURE_MISMATCH_LOG, SUPPORT_CONTACT),
    entry(GENERIC_FAILURE_CODE, Failed, "Server Error", SUPPORT_CONTACT),
];

const SALES_ADJUSTMENT_CODES: &[(&str, ResponseCode)] = &[
    entry("SPSA01", Approved, "APPROVED", "APPROVED"),
    entry(
        "FPSA01",
        Declined,
        "Unable to find the specified POS transaction reference",
        "Unable to find the specified POS transaction reference",
    ),
    entry(
        "FPSA02",
        Failed,
        "This contract has already been completed",
        "This contract has already been completed",
    ),
    entry(
        "FPSA03",
        Failed,
        "This Oxipay contract has previously been cancelled and all payments collected have been refunded to the customer",
        "This Oxipay contract has previously been cancelled and all payments collected have been refunded to the customer",
    ),
    entry(
        "FPSA04",
        Failed,
        "Sales adjustment cannot be processed for this amount",
        "Sales adjustment cannot be processed for this amount",
    ),
    entry(
        "FPSA05",
        Failed,
        "Unable to process a sales adjustment for this contract. Please contact Merchant Services during business hours for further information",
        "Unable to process a sales adjustment for this contract. Please contact Merchant Services during business hours for further information",
    ),
    entry(
        "FPSA06",
        Failed,
        "Sales adjustment cannot be processed. Please call Oxipay Collections",
        "Sales adjustment cannot be processed. Please call Oxipay Collections",
    ),
    entry(
        "FPSA07",
        Failed,
        "Sales adjustment cannot be processed at this store",
        "Sales adjustment cannot be processed at this store",
    ),
    entry(
        "FPSA08",
        Failed,
        "Sales adjustment cannot be processed for this transaction. Duplicate receipt number found.",
        "Sales adjustment cannot be processed for this transaction. Duplicate receipt number found.",
    ),
    entry(
        "FPSA09",
        Failed,
        "Amount must be greater than 0.",
        "Amount must be greater than 0.",
    ),
    entry(
        "EAUT01",
        Failed,
        "Authentication to gateway error",
        "The request to Oxipay was not what we were expecting. You can try again with a different Payment Code. Please contact pit@oxipay.com.au for further support",
    ),
    entry("EVAL01", Failed, "Request is invalid", INVALID_REQUEST),
    entry("ESIG01", Failed, SIGNATURE_MISMATCH_LOG, SUPPORT_CONTACT),
    entry(GENERIC_FAILURE_CODE, Failed, "Server Error", SUPPORT_CONTACT),
];

fn table(operation: OperationType) -> &'static [(&'static str, ResponseCode)] {
    match operation {
        OperationType::Registration => REGISTRATION_CODES,
        OperationType::Authorisation => AUTHORISATION_CODES,
        OperationType::SalesAdjustment => SALES_ADJUSTMENT_CODES,
    }
}

/// Strict lookup; fails with [`GatewayError::UnknownResultCode`] for codes the
/// operation's table does not list.
pub fn lookup(operation: OperationType, code: &str) -> Result<&'static ResponseCode, GatewayError> {
    table(operation)
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, response)| response)
        .ok_or_else(|| GatewayError::UnknownResultCode {
            operation: operation.to_string(),
            code: code.to_string(),
        })
}

/// Classifies a result code, falling back to the generic server-error entry.
pub fn classify(operation: OperationType, code: &str) -> &'static ResponseCode {
    match lookup(operation, code) {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(%err, "falling back to {GENERIC_FAILURE_CODE}");
            generic_failure(operation)
        }
    }
}

fn generic_failure(operation: OperationType) -> &'static ResponseCode {
    table(operation)
        .iter()
        .find(|(known, _)| *known == GENERIC_FAILURE_CODE)
        .map(|(_, response)| response)
        .unwrap_or(&FALLBACK)
}

// Only reachable if a table lost its EISE01 row; the table tests guard that.
const FALLBACK: ResponseCode = ResponseCode {
    txn_status: Failed,
    log_message: "Server Error",
    customer_message: SUPPORT_CONTACT,
};
