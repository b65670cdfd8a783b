use thiserror::Error;

/// Errors raised while signing, classifying, or dispatching gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("payload has no signable fields")]
    EmptyPayload,
    #[error("signature does not match the expected signature")]
    SignatureMismatch,
    #[error("terminal {origin}/{register_id} is already bound")]
    DuplicateBinding { origin: String, register_id: String },
    #[error("no terminal bound for {origin}/{register_id}")]
    BindingNotFound { origin: String, register_id: String },
    #[error("terminal registry unavailable: {0}")]
    RegistryUnavailable(String),
    #[error("gateway {endpoint} unavailable: {reason}")]
    GatewayUnavailable {
        endpoint: String,
        reason: String,
        timed_out: bool,
    },
    #[error("malformed response from {endpoint} (HTTP {status}): {reason}")]
    MalformedResponse {
        endpoint: String,
        status: u16,
        reason: String,
    },
    #[error("unknown {operation} result code {code:?}")]
    UnknownResultCode { operation: String, code: String },
    #[error("no payment context stored for session {0}")]
    SessionContextMissing(String),
    #[error("invalid amount {amount:?}: {reason}")]
    InvalidAmount { amount: String, reason: String },
    #[error("session store error: {0}")]
    Session(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// True when the caller should send the register through registration
    /// instead of reporting a failure.
    pub fn needs_registration(&self) -> bool {
        matches!(self, GatewayError::BindingNotFound { .. })
    }

    /// True when the error came from a gateway call that ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            GatewayError::GatewayUnavailable {
                timed_out: true,
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
