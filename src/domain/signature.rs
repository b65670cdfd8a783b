//! Canonical plaintext and HMAC-SHA256 signing for gateway messages.
//!
//! Signer and verifier must agree on the plaintext: the non-empty signable
//! fields, sorted by wire name, each written as `name` then `value` with no
//! separators.

use super::payload::{FieldSet, PayloadKind, Signable};
use crate::error::{GatewayError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Builds the canonical plaintext for a payload.
///
/// Fails with [`GatewayError::EmptyPayload`] when no signable field carries a
/// value.
pub fn canonicalize<P: Signable + ?Sized>(payload: &P) -> Result<String> {
    let mut fields: Vec<(&str, &str)> = payload
        .signable_fields()
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();

    if fields.is_empty() {
        return Err(GatewayError::EmptyPayload);
    }

    fields.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let capacity = fields.iter().map(|(n, v)| n.len() + v.len()).sum();
    let mut plaintext = String::with_capacity(capacity);
    for (name, value) in fields {
        plaintext.push_str(name);
        plaintext.push_str(value);
    }
    Ok(plaintext)
}

/// HMAC-SHA256 of `plaintext` under `key`, as lowercase hex.
pub fn sign_message(plaintext: &str, key: &str) -> String {
    hex::encode(mac_bytes(plaintext, key))
}

/// Canonicalizes and signs a payload in one step.
pub fn sign<P: Signable + ?Sized>(payload: &P, key: &str) -> Result<String> {
    Ok(sign_message(&canonicalize(payload)?, key))
}

/// Checks `signature` against the payload's recomputed signature.
///
/// The comparison is constant-time. An empty signature never authenticates.
pub fn authenticate<P: Signable + ?Sized>(payload: &P, signature: &str, key: &str) -> Result<()> {
    if signature.is_empty() {
        return Err(GatewayError::SignatureMismatch);
    }
    let expected = sign(payload, key)?;
    if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        Ok(())
    } else {
        Err(GatewayError::SignatureMismatch)
    }
}

/// Signs loosely-typed fields of the given payload kind.
pub fn sign_fields<'a, I>(kind: PayloadKind, fields: I, key: &str) -> Result<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    sign(&FieldSet::new(kind, fields), key)
}

/// Returns whether `signature` authenticates the given fields under `key`.
pub fn verify_fields<'a, I>(kind: PayloadKind, fields: I, signature: &str, key: &str) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    authenticate(&FieldSet::new(kind, fields), signature, key).is_ok()
}

fn mac_bytes(plaintext: &str, key: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(plaintext.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payload::{AuthorisationPayload, GatewayResponse};

    fn reference_authorisation() -> AuthorisationPayload {
        AuthorisationPayload {
            device_id: "foobar".to_string(),
            merchant_id: "3342342".to_string(),
            finance_amount: "1000".to_string(),
            firmware_version: "version 4.0".to_string(),
            operator_id: "John".to_string(),
            purchase_amount: "1000".to_string(),
            pre_approval_code: "1234".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_signature() {
        let signature = sign(&reference_authorisation(), "TEST").unwrap();
        assert_eq!(
            signature,
            "7dfd655530d41cee284b3e4cb7d08a058edf7b5641dffd15fdf1b61ff6a8699b"
        );
    }

    #[test]
    fn test_plaintext_is_sorted_and_skips_empty_fields() {
        let plaintext = canonicalize(&reference_authorisation()).unwrap();
        assert_eq!(
            plaintext,
            "x_device_idfoobarx_finance_amount1000x_firmware_versionversion 4.0\
             x_merchant_id3342342x_operator_idJohnx_pre_approval_code1234x_purchase_amount1000"
        );
        assert!(!plaintext.contains("x_pos_transaction_ref"));
    }

    #[test]
    fn test_field_order_does_not_change_signature() {
        let typed = reference_authorisation();
        let shuffled = FieldSet::new(
            PayloadKind::Authorisation,
            [
                ("x_purchase_amount", "1000"),
                ("x_operator_id", "John"),
                ("x_device_id", "foobar"),
                ("x_pre_approval_code", "1234"),
                ("x_merchant_id", "3342342"),
                ("x_finance_amount", "1000"),
                ("x_firmware_version", "version 4.0"),
            ],
        );
        assert_eq!(canonicalize(&shuffled).unwrap(), canonicalize(&typed).unwrap());
        assert_eq!(
            sign(&shuffled, "TEST").unwrap(),
            "7dfd655530d41cee284b3e4cb7d08a058edf7b5641dffd15fdf1b61ff6a8699b"
        );
    }

    #[test]
    fn test_populated_field_changes_plaintext() {
        let empty = reference_authorisation();
        let populated = AuthorisationPayload {
            pos_transaction_ref: "sale-0001".to_string(),
            ..reference_authorisation()
        };
        let plain_empty = canonicalize(&empty).unwrap();
        let plain_populated = canonicalize(&populated).unwrap();
        assert_ne!(plain_empty, plain_populated);
        assert!(plain_populated.contains("x_pos_transaction_refsale-0001"));

        let fields = [
            ("x_device_id", "foobar"),
            ("x_merchant_id", "3342342"),
            ("x_pos_transaction_ref", "sale-0001"),
            ("x_purchase_amount", "1000"),
        ];
        let signature = sign_fields(PayloadKind::Authorisation, fields, "TEST").unwrap();
        assert!(verify_fields(PayloadKind::Authorisation, fields, &signature, "TEST"));
        assert!(!verify_fields(PayloadKind::Authorisation, fields, &signature, "OTHER"));
        assert!(!verify_fields(
            PayloadKind::Authorisation,
            [("x_device_id", "foobar"), ("x_merchant_id", "3342342"), ("x_purchase_amount", "1000")],
            &signature,
            "TEST"
        ));
    }

    #[test]
    fn test_registration_response_authenticates() {
        let raw = r#"{"x_key":"hEz3dnWwEWuo","x_status":"Success","x_code":"SCRK01","x_message":"Success","signature":"5385041e76753e1b6e7ac09d52c6363854f1df4e79a7aa01c44f2d4618063483","tracking_data":null}"#;
        let response: GatewayResponse = serde_json::from_str(raw).unwrap();
        assert!(authenticate(&response, &response.signature, "szUb4YwzQNXn").is_ok());
    }

    #[test]
    fn test_empty_signature_is_rejected() {
        let payload = reference_authorisation();
        assert!(matches!(
            authenticate(&payload, "", "TEST"),
            Err(GatewayError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_empty_payload_cannot_be_signed() {
        let payload = AuthorisationPayload::default();
        assert!(matches!(
            sign(&payload, "TEST"),
            Err(GatewayError::EmptyPayload)
        ));
    }

    #[test]
    fn test_sign_message_is_lowercase_hex() {
        let signature = sign_message("x_codeSPRA01", "key");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
