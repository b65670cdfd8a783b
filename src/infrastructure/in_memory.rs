use crate::domain::payment::PaymentContext;
use crate::domain::ports::{SessionStore, TerminalRegistry};
use crate::domain::terminal::TerminalBinding;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

type TerminalKey = (String, String);

/// A thread-safe in-memory terminal registry.
///
/// Uniqueness is checked and the binding inserted under one write lock, so
/// concurrent saves for the same terminal have a single winner.
#[derive(Default, Clone)]
pub struct InMemoryTerminalRegistry {
    bindings: Arc<RwLock<HashMap<TerminalKey, TerminalBinding>>>,
}

impl InMemoryTerminalRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bindings.read().await.is_empty()
    }
}

#[async_trait]
impl TerminalRegistry for InMemoryTerminalRegistry {
    async fn save(&self, created_by: &str, binding: &TerminalBinding) -> Result<bool> {
        let key = (
            binding.origin_domain.clone(),
            binding.pos_register_id.clone(),
        );
        let mut bindings = self.bindings.write().await;
        match bindings.entry(key) {
            Entry::Occupied(_) => Err(GatewayError::DuplicateBinding {
                origin: binding.origin_domain.clone(),
                register_id: binding.pos_register_id.clone(),
            }),
            Entry::Vacant(slot) => {
                tracing::debug!(created_by, device_id = %binding.gateway_device_id, "binding saved");
                slot.insert(binding.clone());
                Ok(true)
            }
        }
    }

    async fn lookup(&self, origin_domain: &str, pos_register_id: &str) -> Result<TerminalBinding> {
        let bindings = self.bindings.read().await;
        bindings
            .get(&(origin_domain.to_string(), pos_register_id.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::BindingNotFound {
                origin: origin_domain.to_string(),
                register_id: pos_register_id.to_string(),
            })
    }
}

/// A thread-safe in-memory session store. Contents are lost on exit.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    contexts: Arc<RwLock<HashMap<String, PaymentContext>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session_id: &str, context: &PaymentContext) -> Result<()> {
        let mut contexts = self.contexts.write().await;
        contexts.insert(session_id.to_string(), context.clone());
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<PaymentContext>> {
        let contexts = self.contexts.read().await;
        Ok(contexts.get(session_id).cloned())
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        let mut contexts = self.contexts.write().await;
        contexts.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::terminal::SigningKey;

    fn binding(register_id: &str, key: &str) -> TerminalBinding {
        TerminalBinding::new(
            "https://shop.vendhq.com",
            register_id,
            "01SUCCES-abc",
            "30190000",
            SigningKey::new(key),
        )
    }

    #[tokio::test]
    async fn test_save_then_lookup() {
        let registry = InMemoryTerminalRegistry::new();
        assert!(registry.save("test", &binding("r1", "k1")).await.unwrap());

        let found = registry
            .lookup("https://shop.vendhq.com", "r1")
            .await
            .unwrap();
        assert_eq!(found.signing_key().expose(), "k1");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_save_keeps_first_key() {
        let registry = InMemoryTerminalRegistry::new();
        registry.save("test", &binding("r1", "k1")).await.unwrap();

        let err = registry.save("test", &binding("r1", "k2")).await.unwrap_err();
        assert!(matches!(err, GatewayError::DuplicateBinding { .. }));

        let found = registry
            .lookup("https://shop.vendhq.com", "r1")
            .await
            .unwrap();
        assert_eq!(found.signing_key().expose(), "k1");
    }

    #[tokio::test]
    async fn test_lookup_missing_is_not_found() {
        let registry = InMemoryTerminalRegistry::new();
        let err = registry
            .lookup("https://shop.vendhq.com", "r9")
            .await
            .unwrap_err();
        assert!(err.needs_registration());
    }

    #[tokio::test]
    async fn test_session_store_roundtrip() {
        let store = InMemorySessionStore::new();
        let context = PaymentContext::from_request("https://shop.vendhq.com", "r1", "44.00")
            .unwrap()
            .with_sale_id("s-1");

        store.put("sess", &context).await.unwrap();
        assert_eq!(store.get("sess").await.unwrap(), Some(context));

        store.remove("sess").await.unwrap();
        assert!(store.get("sess").await.unwrap().is_none());
    }
}
