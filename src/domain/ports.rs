use super::payment::PaymentContext;
use super::terminal::TerminalBinding;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Durable store of terminal bindings.
///
/// Implementations must enforce uniqueness of `(origin_domain,
/// pos_register_id)` themselves so that concurrent saves for one terminal
/// leave exactly one winner.
#[async_trait]
pub trait TerminalRegistry: Send + Sync {
    /// Persists a new binding. Fails with `DuplicateBinding` if the terminal is
    /// already bound.
    async fn save(&self, created_by: &str, binding: &TerminalBinding) -> Result<bool>;
    /// Fails with `BindingNotFound` if nothing matches, or
    /// `RegistryUnavailable` if the store cannot answer.
    async fn lookup(&self, origin_domain: &str, pos_register_id: &str) -> Result<TerminalBinding>;
}

/// Key-value session holding in-flight payment contexts.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session_id: &str, context: &PaymentContext) -> Result<()>;
    async fn get(&self, session_id: &str) -> Result<Option<PaymentContext>>;
    async fn remove(&self, session_id: &str) -> Result<()>;
}

/// Gateway endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CreateKey,
    ProcessAuthorisation,
    ProcessSalesAdjustment,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::CreateKey => "CreateKey",
            Endpoint::ProcessAuthorisation => "ProcessAuthorisation",
            Endpoint::ProcessSalesAdjustment => "ProcessSalesAdjustment",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Raw reply from the gateway transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Posts JSON to the gateway and returns whatever came back.
///
/// Transport failures surface as `GatewayUnavailable`; a non-2xx status is
/// not an error at this level.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn post(&self, endpoint: Endpoint, body: &serde_json::Value) -> Result<TransportReply>;
}

pub type TerminalRegistryBox = Box<dyn TerminalRegistry>;
pub type SessionStoreBox = Box<dyn SessionStore>;
pub type GatewayTransportBox = Box<dyn GatewayTransport>;
