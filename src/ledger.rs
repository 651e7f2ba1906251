// src/ledger.rs - Trade lifecycle and P&L settlement
use crate::auth::IdentityProvider;
use crate::errors::LedgerError;
use crate::store::{ChangeEvent, TradeStore};
use crate::types::{CloseTradeRow, NewTradeRow, Trade, TradeSide, TradeStatus};
use chrono::Utc;
use log::info;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Owns the create/read/close/delete lifecycle of Trade records. Holds no
/// trade state of its own: every read is a fresh round trip to the store, and
/// consumers are told about changes through the store's notification channel.
pub struct TradeLedger {
    store: Arc<dyn TradeStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl TradeLedger {
    pub fn new(store: Arc<dyn TradeStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    /// Change-notification stream for dependent views. On any event the
    /// expectation is a full re-fetch, not an incremental patch.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.store.subscribe()
    }

    /// All trades visible to the caller, most recently opened first.
    pub async fn list_trades(&self) -> Result<Vec<Trade>, LedgerError> {
        self.store.fetch_all().await
    }

    /// Opens a new trade. The UI pre-validates, but preconditions are
    /// re-checked here defensively.
    pub async fn create_trade(
        &self,
        asset: &str,
        side: TradeSide,
        entry_price: f64,
        position_size: f64,
    ) -> Result<Trade, LedgerError> {
        let asset = asset.trim();
        if asset.is_empty() {
            return Err(LedgerError::Validation(
                "asset symbol must not be empty".to_string(),
            ));
        }
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(LedgerError::Validation(
                "entry price must be a positive number".to_string(),
            ));
        }
        if !position_size.is_finite() || position_size <= 0.0 {
            return Err(LedgerError::Validation(
                "position size must be a positive number".to_string(),
            ));
        }

        let owner = self.identity.current_user_id().await?;

        let row = NewTradeRow {
            asset: asset.to_string(),
            side,
            entry_price,
            position_size,
            status: TradeStatus::Open,
            timestamp: Utc::now(),
            user_id: owner,
        };

        let trade = self.store.insert(row).await?;
        info!(
            "📈 [LEDGER] Opened {} {} @ {} x {} (id {})",
            trade.asset, trade.side, trade.entry_price, trade.position_size, trade.id
        );
        Ok(trade)
    }

    /// One-shot transition from open to closed: settles P&L and writes the
    /// derived fields as a single store mutation. A second close on the same
    /// id fails with `InvalidState`, never silently succeeds.
    pub async fn close_trade(
        &self,
        id: &str,
        exit_price: f64,
        duration: &str,
    ) -> Result<Trade, LedgerError> {
        if !exit_price.is_finite() {
            return Err(LedgerError::Validation(
                "exit price must be a finite number".to_string(),
            ));
        }

        let trade = self
            .store
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;

        if trade.is_closed() {
            return Err(LedgerError::InvalidState(format!(
                "trade {} is already closed",
                id
            )));
        }

        let (pnl, pnl_percentage) =
            settle_pnl(trade.side, trade.entry_price, trade.position_size, exit_price);

        let patch = CloseTradeRow {
            status: TradeStatus::Closed,
            exit_price,
            pnl,
            pnl_percentage,
            duration: duration.to_string(),
        };

        // No compare-and-swap here: a delete landing between the read above
        // and this patch surfaces as NotFound.
        let updated = self
            .store
            .update(id, patch)
            .await?
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;

        info!(
            "💰 [LEDGER] Closed {} @ {} with pnl {:.2} ({:.2}%)",
            updated.id, exit_price, pnl, pnl_percentage
        );
        Ok(updated)
    }

    /// Removes a trade unconditionally, open or closed.
    pub async fn delete_trade(&self, id: &str) -> Result<(), LedgerError> {
        let removed = self.store.delete(id).await?;
        if !removed {
            return Err(LedgerError::NotFound(id.to_string()));
        }
        info!("🗑️  [LEDGER] Deleted trade {}", id);
        Ok(())
    }
}

/// Realized P&L for a closing trade: absolute currency units and percentage
/// of the entry price.
pub fn settle_pnl(
    side: TradeSide,
    entry_price: f64,
    position_size: f64,
    exit_price: f64,
) -> (f64, f64) {
    match side {
        TradeSide::Long => (
            (exit_price - entry_price) * position_size,
            (exit_price - entry_price) / entry_price * 100.0,
        ),
        TradeSide::Short => (
            (entry_price - exit_price) * position_size,
            (entry_price - exit_price) / entry_price * 100.0,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_winner_settles_positive() {
        let (pnl, pct) = settle_pnl(TradeSide::Long, 100.0, 2.0, 110.0);
        assert_eq!(pnl, 20.0);
        assert_eq!(pct, 10.0);
    }

    #[test]
    fn short_winner_settles_positive() {
        let (pnl, pct) = settle_pnl(TradeSide::Short, 100.0, 2.0, 90.0);
        assert_eq!(pnl, 20.0);
        assert_eq!(pct, 10.0);
    }

    #[test]
    fn long_loser_settles_negative() {
        let (pnl, pct) = settle_pnl(TradeSide::Long, 100.0, 1.0, 95.0);
        assert_eq!(pnl, -5.0);
        assert_eq!(pct, -5.0);
    }

    #[test]
    fn short_loser_settles_negative() {
        let (pnl, pct) = settle_pnl(TradeSide::Short, 50.0, 4.0, 55.0);
        assert_eq!(pnl, -20.0);
        assert_eq!(pct, -10.0);
    }
}
