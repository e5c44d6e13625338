//! Key-value storage abstraction.
//!
//! Board configs, webhook records and debounce markers all live behind
//! the same small contract, so the server can run against an in-memory
//! map or a durable sled database interchangeably. Implementations must
//! provide read-your-writes consistency for a single key; the debounce
//! marker relies on it.

mod memory;
mod sled;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::MemoryStore;
pub use self::sled::SledStore;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value. When a ttl is given the entry must read as absent
    /// once that much time has elapsed, measured from this call.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

pub fn config_key(board_id: i64) -> String {
    format!("config:{board_id}")
}

pub fn webhook_key(board_id: i64) -> String {
    format!("webhook:{board_id}")
}

pub fn debounce_key(board_id: i64, item_id: i64) -> String {
    format!("debounce:{board_id}:{item_id}")
}
