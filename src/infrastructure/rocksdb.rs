use crate::domain::payment::PaymentContext;
use crate::domain::ports::SessionStore;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding parked payment contexts, keyed by session id.
pub const CF_SESSIONS: &str = "sessions";

impl From<rocksdb::Error> for GatewayError {
    fn from(err: rocksdb::Error) -> Self {
        GatewayError::Session(err.into_string())
    }
}

/// A persistent session store backed by RocksDB.
///
/// Contexts are stored as JSON so a register can finish registration in a
/// later process and still resume its payment.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbSessionStore {
    db: Arc<DB>,
}

impl RocksDbSessionStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the sessions will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_sessions = ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_sessions])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn sessions(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_SESSIONS)
            .ok_or_else(|| GatewayError::Session("sessions column family not found".to_string()))
    }
}

#[async_trait]
impl SessionStore for RocksDbSessionStore {
    async fn put(&self, session_id: &str, context: &PaymentContext) -> Result<()> {
        let value = serde_json::to_vec(context)?;
        self.db.put_cf(self.sessions()?, session_id.as_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<PaymentContext>> {
        match self.db.get_cf(self.sessions()?, session_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        self.db.delete_cf(self.sessions()?, session_id.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbSessionStore::open(dir.path()).expect("Failed to open RocksDB");
        assert!(store.db.cf_handle(CF_SESSIONS).is_some());
    }

    #[tokio::test]
    async fn test_context_survives_reopen() {
        let dir = tempdir().unwrap();
        let context = PaymentContext::from_request("https://shop.vendhq.com", "r1", "-12.50")
            .unwrap()
            .with_sale_id("s-9");

        {
            let store = RocksDbSessionStore::open(dir.path()).unwrap();
            store.put("sess", &context).await.unwrap();
        }

        let store = RocksDbSessionStore::open(dir.path()).unwrap();
        assert_eq!(store.get("sess").await.unwrap(), Some(context));

        store.remove("sess").await.unwrap();
        assert!(store.get("sess").await.unwrap().is_none());
    }
}
