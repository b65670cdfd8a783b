use serde::{Deserialize, Serialize};
use std::fmt;

/// Secret shared between a bound terminal and the gateway.
///
/// `Debug` is redacted so bindings can be logged without leaking the key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Lends the raw key for one sign or verify call.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(**redacted**)")
    }
}

/// Durable pairing of a POS register with a gateway device identity.
///
/// `(origin_domain, pos_register_id)` identifies the terminal; a binding is
/// written once at registration and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalBinding {
    /// The POS web domain, e.g. `https://shop.vendhq.com`.
    pub origin_domain: String,
    /// The register ID as known to the POS.
    pub pos_register_id: String,
    /// Device ID registered with the gateway.
    pub gateway_device_id: String,
    /// Merchant number at the gateway.
    pub gateway_merchant_id: String,
    signing_key: SigningKey,
}

impl TerminalBinding {
    pub fn new(
        origin_domain: impl Into<String>,
        pos_register_id: impl Into<String>,
        gateway_device_id: impl Into<String>,
        gateway_merchant_id: impl Into<String>,
        signing_key: SigningKey,
    ) -> Self {
        Self {
            origin_domain: origin_domain.into(),
            pos_register_id: pos_register_id.into(),
            gateway_device_id: gateway_device_id.into(),
            gateway_merchant_id: gateway_merchant_id.into(),
            signing_key,
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}
