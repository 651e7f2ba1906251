// src/store/memory.rs - In-process trade store for tests and offline runs
use crate::errors::LedgerError;
use crate::store::{ChangeEvent, ChangeKind, TradeStore, CHANGE_CHANNEL_CAPACITY};
use crate::types::{CloseTradeRow, NewTradeRow, Trade};
use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// Mirrors the remote store's contract (id assignment, timestamp-descending
/// ordering, change events) without the network.
pub struct InMemoryTradeStore {
    trades: Mutex<Vec<Trade>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl InMemoryTradeStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            trades: Mutex::new(Vec::new()),
            changes,
        }
    }

    fn publish(&self, kind: ChangeKind, trade_id: Option<String>) {
        let _ = self.changes.send(ChangeEvent::new(kind, trade_id));
    }
}

impl Default for InMemoryTradeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TradeStore for InMemoryTradeStore {
    async fn fetch_all(&self) -> Result<Vec<Trade>, LedgerError> {
        let trades = self.trades.lock().await;
        let mut all: Vec<Trade> = trades.clone();
        all.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        Ok(all)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Trade>, LedgerError> {
        let trades = self.trades.lock().await;
        Ok(trades.iter().find(|t| t.id == id).cloned())
    }

    async fn insert(&self, row: NewTradeRow) -> Result<Trade, LedgerError> {
        let trade = Trade {
            id: Uuid::new_v4().to_string(),
            asset: row.asset,
            side: row.side,
            entry_price: row.entry_price,
            exit_price: None,
            position_size: row.position_size,
            pnl: None,
            pnl_percentage: None,
            status: row.status,
            opened_at: row.timestamp,
            duration: None,
            owner_id: Some(row.user_id),
        };

        self.trades.lock().await.push(trade.clone());
        self.publish(ChangeKind::Insert, Some(trade.id.clone()));
        Ok(trade)
    }

    async fn update(&self, id: &str, patch: CloseTradeRow) -> Result<Option<Trade>, LedgerError> {
        let mut trades = self.trades.lock().await;
        let updated = match trades.iter_mut().find(|t| t.id == id) {
            Some(trade) => {
                trade.status = patch.status;
                trade.exit_price = Some(patch.exit_price);
                trade.pnl = Some(patch.pnl);
                trade.pnl_percentage = Some(patch.pnl_percentage);
                trade.duration = Some(patch.duration);
                Some(trade.clone())
            }
            None => None,
        };
        drop(trades);

        if let Some(trade) = &updated {
            self.publish(ChangeKind::Update, Some(trade.id.clone()));
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<bool, LedgerError> {
        let mut trades = self.trades.lock().await;
        let before = trades.len();
        trades.retain(|t| t.id != id);
        let removed = trades.len() < before;
        drop(trades);

        if removed {
            self.publish(ChangeKind::Delete, Some(id.to_string()));
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
