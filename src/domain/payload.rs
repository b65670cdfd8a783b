//! Gateway request and response payloads.
//!
//! Every payload declares which of its fields take part in the canonical
//! plaintext through [`Signable`]. The set is fixed per [`PayloadKind`]; the
//! `signature` and `tracking_data` fields never participate.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const MERCHANT_ID: &str = "x_merchant_id";
pub const DEVICE_ID: &str = "x_device_id";
pub const DEVICE_TOKEN: &str = "x_device_token";
pub const OPERATOR_ID: &str = "x_operator_id";
pub const FIRMWARE_VERSION: &str = "x_firmware_version";
pub const POS_VENDOR: &str = "x_pos_vendor";
pub const POS_TRANSACTION_REF: &str = "x_pos_transaction_ref";
pub const PRE_APPROVAL_CODE: &str = "x_pre_approval_code";
pub const FINANCE_AMOUNT: &str = "x_finance_amount";
pub const PURCHASE_AMOUNT: &str = "x_purchase_amount";
pub const PURCHASE_REF: &str = "x_purchase_ref";
pub const AMOUNT: &str = "x_amount";
pub const PURCHASE_NUMBER: &str = "x_purchase_number";
pub const STATUS: &str = "x_status";
pub const CODE: &str = "x_code";
pub const MESSAGE: &str = "x_message";
pub const KEY: &str = "x_key";

const REGISTRATION_FIELDS: &[&str] = &[
    MERCHANT_ID,
    DEVICE_ID,
    DEVICE_TOKEN,
    OPERATOR_ID,
    FIRMWARE_VERSION,
    POS_VENDOR,
];

const AUTHORISATION_FIELDS: &[&str] = &[
    MERCHANT_ID,
    DEVICE_ID,
    OPERATOR_ID,
    FIRMWARE_VERSION,
    POS_TRANSACTION_REF,
    PRE_APPROVAL_CODE,
    FINANCE_AMOUNT,
    PURCHASE_AMOUNT,
];

const SALES_ADJUSTMENT_FIELDS: &[&str] = &[
    POS_TRANSACTION_REF,
    PURCHASE_REF,
    MERCHANT_ID,
    AMOUNT,
    DEVICE_ID,
    OPERATOR_ID,
    FIRMWARE_VERSION,
];

const RESPONSE_FIELDS: &[&str] = &[PURCHASE_NUMBER, STATUS, CODE, MESSAGE, KEY];

/// The payload types exchanged with the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Registration,
    Authorisation,
    SalesAdjustment,
    Response,
}

impl PayloadKind {
    /// Wire names of the fields eligible for signing, in declaration order.
    pub fn signable_fields(self) -> &'static [&'static str] {
        match self {
            PayloadKind::Registration => REGISTRATION_FIELDS,
            PayloadKind::Authorisation => AUTHORISATION_FIELDS,
            PayloadKind::SalesAdjustment => SALES_ADJUSTMENT_FIELDS,
            PayloadKind::Response => RESPONSE_FIELDS,
        }
    }
}

/// A payload whose signable fields can be canonicalized.
pub trait Signable {
    /// `(wire name, value)` for every signable field, empty values included.
    fn signable_fields(&self) -> Vec<(&'static str, &str)>;
}

/// Registers a new POS device with the gateway (`CreateKey`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    #[serde(rename = "x_merchant_id")]
    pub merchant_id: String,
    #[serde(rename = "x_device_id")]
    pub device_id: String,
    #[serde(rename = "x_device_token")]
    pub device_token: String,
    #[serde(rename = "x_operator_id")]
    pub operator_id: String,
    #[serde(rename = "x_firmware_version")]
    pub firmware_version: String,
    #[serde(rename = "x_pos_vendor")]
    pub pos_vendor: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tracking_data: String,
    #[serde(default)]
    pub signature: String,
}

impl Signable for RegistrationPayload {
    fn signable_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            (MERCHANT_ID, self.merchant_id.as_str()),
            (DEVICE_ID, self.device_id.as_str()),
            (DEVICE_TOKEN, self.device_token.as_str()),
            (OPERATOR_ID, self.operator_id.as_str()),
            (FIRMWARE_VERSION, self.firmware_version.as_str()),
            (POS_VENDOR, self.pos_vendor.as_str()),
        ]
    }
}

/// Requests a purchase authorisation against a customer's payment code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorisationPayload {
    #[serde(rename = "x_merchant_id")]
    pub merchant_id: String,
    #[serde(rename = "x_device_id")]
    pub device_id: String,
    #[serde(rename = "x_operator_id")]
    pub operator_id: String,
    #[serde(rename = "x_firmware_version")]
    pub firmware_version: String,
    #[serde(rename = "x_pos_transaction_ref")]
    pub pos_transaction_ref: String,
    #[serde(rename = "x_pre_approval_code")]
    pub pre_approval_code: String,
    #[serde(rename = "x_finance_amount")]
    pub finance_amount: String,
    #[serde(rename = "x_purchase_amount")]
    pub purchase_amount: String,
    #[serde(default)]
    pub signature: String,
}

impl Signable for AuthorisationPayload {
    fn signable_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            (MERCHANT_ID, self.merchant_id.as_str()),
            (DEVICE_ID, self.device_id.as_str()),
            (OPERATOR_ID, self.operator_id.as_str()),
            (FIRMWARE_VERSION, self.firmware_version.as_str()),
            (POS_TRANSACTION_REF, self.pos_transaction_ref.as_str()),
            (PRE_APPROVAL_CODE, self.pre_approval_code.as_str()),
            (FINANCE_AMOUNT, self.finance_amount.as_str()),
            (PURCHASE_AMOUNT, self.purchase_amount.as_str()),
        ]
    }
}

/// Adjusts (refunds against) an existing purchase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesAdjustmentPayload {
    #[serde(rename = "x_pos_transaction_ref")]
    pub pos_transaction_ref: String,
    #[serde(rename = "x_purchase_ref")]
    pub purchase_ref: String,
    #[serde(rename = "x_merchant_id")]
    pub merchant_id: String,
    #[serde(rename = "x_amount", default, skip_serializing_if = "String::is_empty")]
    pub amount: String,
    #[serde(rename = "x_device_id", default, skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(rename = "x_operator_id", default, skip_serializing_if = "String::is_empty")]
    pub operator_id: String,
    #[serde(
        rename = "x_firmware_version",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub firmware_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tracking_data: String,
    #[serde(default)]
    pub signature: String,
}

impl Signable for SalesAdjustmentPayload {
    fn signable_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            (POS_TRANSACTION_REF, self.pos_transaction_ref.as_str()),
            (PURCHASE_REF, self.purchase_ref.as_str()),
            (MERCHANT_ID, self.merchant_id.as_str()),
            (AMOUNT, self.amount.as_str()),
            (DEVICE_ID, self.device_id.as_str()),
            (OPERATOR_ID, self.operator_id.as_str()),
            (FIRMWARE_VERSION, self.firmware_version.as_str()),
        ]
    }
}

/// Reply returned by every gateway endpoint.
///
/// Absent and `null` fields both read as empty strings so that a sparse reply
/// still canonicalizes the same way the gateway signed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    #[serde(
        rename = "x_purchase_number",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub purchase_number: String,
    #[serde(
        rename = "x_status",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub status: String,
    #[serde(
        rename = "x_code",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub code: String,
    #[serde(rename = "x_message", default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(
        rename = "x_key",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub signature: String,
}

impl Signable for GatewayResponse {
    fn signable_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            (PURCHASE_NUMBER, self.purchase_number.as_str()),
            (STATUS, self.status.as_str()),
            (CODE, self.code.as_str()),
            (MESSAGE, self.message.as_str()),
            (KEY, self.key.as_str()),
        ]
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A loosely-typed field bag restricted to one payload kind's manifest.
///
/// Lets callers that only hold name/value pairs (e.g. a decoded form) sign and
/// verify without building the typed payload. Names outside the kind's
/// manifest are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet {
    kind: PayloadKind,
    values: BTreeMap<String, String>,
}

impl FieldSet {
    pub fn new<I, K, V>(kind: PayloadKind, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind,
            values: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }
}

impl Signable for FieldSet {
    fn signable_fields(&self) -> Vec<(&'static str, &str)> {
        self.kind
            .signable_fields()
            .iter()
            .filter_map(|name| self.values.get(*name).map(|v| (*name, v.as_str())))
            .collect()
    }
}
