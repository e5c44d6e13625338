//! Durable store backed by sled, for deployments that must survive
//! restarts.
//!
//! sled has no native TTL, so each entry carries an absolute expiry
//! deadline in epoch millis. Expired entries read as absent and are
//! removed when observed.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::KvStore;
use crate::error::{Result, SyncError};

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    expires_at_ms: Option<u64>,
}

pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| SyncError::Storage(format!("failed to open sled database: {e}")))?;
        Ok(SledStore { db })
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn storage_err(e: sled::Error) -> SyncError {
    SyncError::Storage(e.to_string())
}

#[async_trait]
impl KvStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(bytes) = self.db.get(key).map_err(storage_err)? else {
            return Ok(None);
        };
        let entry: StoredEntry = serde_json::from_slice(&bytes)?;

        if entry.expires_at_ms.is_some_and(|at| now_ms() > at) {
            self.db.remove(key).map_err(storage_err)?;
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let entry = StoredEntry {
            value: value.to_string(),
            expires_at_ms: ttl.map(|ttl| now_ms() + ttl.as_millis() as u64),
        };
        self.db
            .insert(key, serde_json::to_vec(&entry)?)
            .map_err(storage_err)?;
        self.db.flush_async().await.map_err(storage_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.db.remove(key).map_err(storage_err)?;
        self.db.flush_async().await.map_err(storage_err)?;
        Ok(())
    }
}
