// src/store/mod.rs - Remote trade store boundary
pub mod memory;
pub mod realtime;
pub mod supabase;

use crate::errors::LedgerError;
use crate::types::{CloseTradeRow, NewTradeRow, Trade};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use memory::InMemoryTradeStore;
pub use realtime::RealtimeListener;
pub use supabase::SupabaseTradeStore;

pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// "Something changed" notification for the trades collection. The only
/// delivery guarantee is "re-read": consumers are expected to issue a fresh
/// fetch rather than patch local state.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub trade_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, trade_id: Option<String>) -> Self {
        Self {
            kind,
            trade_id,
            timestamp: Utc::now(),
        }
    }
}

/// CRUD + change-notification boundary of the remote trade store.
///
/// Per-row atomicity is the store's responsibility; a single `update` or
/// `delete` is assumed atomic there. The trait does not expose versioning,
/// so callers racing on the same id see last-write-wins semantics.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// All trades, server-sorted by open timestamp descending.
    async fn fetch_all(&self) -> Result<Vec<Trade>, LedgerError>;

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Trade>, LedgerError>;

    /// Inserts a new row; the store assigns the id and returns the stored row.
    async fn insert(&self, row: NewTradeRow) -> Result<Trade, LedgerError>;

    /// Applies the close patch to the row with `id`. Returns `None` if the row
    /// does not exist (including a row deleted since the caller last read it).
    async fn update(&self, id: &str, patch: CloseTradeRow) -> Result<Option<Trade>, LedgerError>;

    /// Removes the row with `id`, reporting whether a row was actually removed.
    async fn delete(&self, id: &str) -> Result<bool, LedgerError>;

    /// Change-notification stream for the trades collection.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}
