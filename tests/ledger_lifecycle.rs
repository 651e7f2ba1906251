// tests/ledger_lifecycle.rs
//
// End-to-end lifecycle of the trade ledger over the in-memory store: the
// store contract (ordering, change events) is identical to the remote one,
// minus the network.

use std::sync::Arc;
use std::time::Duration;

use trade_ledger::auth::StaticIdentity;
use trade_ledger::errors::LedgerError;
use trade_ledger::ledger::TradeLedger;
use trade_ledger::stats::compute_performance_statistics;
use trade_ledger::store::{ChangeKind, InMemoryTradeStore};
use trade_ledger::types::{TradeSide, TradeStatus};

fn test_ledger() -> (TradeLedger, Arc<InMemoryTradeStore>) {
    let store = Arc::new(InMemoryTradeStore::new());
    let identity = Arc::new(StaticIdentity("test-user".to_string()));
    (TradeLedger::new(store.clone(), identity), store)
}

#[tokio::test]
async fn create_then_list_yields_open_trade() {
    let (ledger, _) = test_ledger();

    let created = ledger
        .create_trade("BTC/USD", TradeSide::Long, 42000.0, 0.5)
        .await
        .unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(created.status, TradeStatus::Open);
    assert_eq!(created.owner_id.as_deref(), Some("test-user"));

    let trades = ledger.list_trades().await.unwrap();
    assert_eq!(trades.len(), 1);
    let trade = &trades[0];
    assert_eq!(trade.id, created.id);
    assert_eq!(trade.status, TradeStatus::Open);
    assert!(trade.exit_price.is_none());
    assert!(trade.pnl.is_none());
    assert!(trade.pnl_percentage.is_none());
    assert!(trade.duration.is_none());
}

#[tokio::test]
async fn list_orders_most_recent_first() {
    let (ledger, _) = test_ledger();

    for asset in ["FIRST/USD", "SECOND/USD", "THIRD/USD"] {
        ledger
            .create_trade(asset, TradeSide::Long, 100.0, 1.0)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let trades = ledger.list_trades().await.unwrap();
    let assets: Vec<&str> = trades.iter().map(|t| t.asset.as_str()).collect();
    assert_eq!(assets, vec!["THIRD/USD", "SECOND/USD", "FIRST/USD"]);
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let (ledger, _) = test_ledger();

    let empty_asset = ledger
        .create_trade("   ", TradeSide::Long, 100.0, 1.0)
        .await;
    assert!(matches!(empty_asset, Err(LedgerError::Validation(_))));

    let zero_entry = ledger
        .create_trade("BTC/USD", TradeSide::Long, 0.0, 1.0)
        .await;
    assert!(matches!(zero_entry, Err(LedgerError::Validation(_))));

    let negative_size = ledger
        .create_trade("BTC/USD", TradeSide::Long, 100.0, -1.0)
        .await;
    assert!(matches!(negative_size, Err(LedgerError::Validation(_))));

    let nan_entry = ledger
        .create_trade("BTC/USD", TradeSide::Long, f64::NAN, 1.0)
        .await;
    assert!(matches!(nan_entry, Err(LedgerError::Validation(_))));

    assert!(ledger.list_trades().await.unwrap().is_empty());
}

#[tokio::test]
async fn close_settles_long_winner() {
    let (ledger, _) = test_ledger();

    let trade = ledger
        .create_trade("BTC/USD", TradeSide::Long, 100.0, 2.0)
        .await
        .unwrap();
    let closed = ledger.close_trade(&trade.id, 110.0, "1h 30m").await.unwrap();

    assert_eq!(closed.status, TradeStatus::Closed);
    assert_eq!(closed.exit_price, Some(110.0));
    assert_eq!(closed.pnl, Some(20.0));
    assert_eq!(closed.pnl_percentage, Some(10.0));
    assert_eq!(closed.duration.as_deref(), Some("1h 30m"));
}

#[tokio::test]
async fn close_settles_short_winner() {
    let (ledger, _) = test_ledger();

    let trade = ledger
        .create_trade("BTC/USD", TradeSide::Short, 100.0, 2.0)
        .await
        .unwrap();
    let closed = ledger.close_trade(&trade.id, 90.0, "45m").await.unwrap();

    assert_eq!(closed.pnl, Some(20.0));
    assert_eq!(closed.pnl_percentage, Some(10.0));
}

#[tokio::test]
async fn close_settles_long_loser() {
    let (ledger, _) = test_ledger();

    let trade = ledger
        .create_trade("ETH/USD", TradeSide::Long, 100.0, 1.0)
        .await
        .unwrap();
    let closed = ledger.close_trade(&trade.id, 95.0, "20m").await.unwrap();

    assert_eq!(closed.pnl, Some(-5.0));
    assert_eq!(closed.pnl_percentage, Some(-5.0));
}

#[tokio::test]
async fn close_is_not_idempotent() {
    let (ledger, _) = test_ledger();

    let trade = ledger
        .create_trade("BTC/USD", TradeSide::Long, 100.0, 1.0)
        .await
        .unwrap();
    ledger.close_trade(&trade.id, 105.0, "1h").await.unwrap();

    let second = ledger.close_trade(&trade.id, 120.0, "2h").await;
    assert!(matches!(second, Err(LedgerError::InvalidState(_))));

    // First close result must be untouched by the failed second attempt
    let trades = ledger.list_trades().await.unwrap();
    assert_eq!(trades[0].exit_price, Some(105.0));
}

#[tokio::test]
async fn close_rejects_missing_id_and_bad_exit_price() {
    let (ledger, _) = test_ledger();

    let missing = ledger.close_trade("no-such-id", 100.0, "1h").await;
    assert!(matches!(missing, Err(LedgerError::NotFound(_))));

    let trade = ledger
        .create_trade("BTC/USD", TradeSide::Long, 100.0, 1.0)
        .await
        .unwrap();
    let nan_exit = ledger.close_trade(&trade.id, f64::NAN, "1h").await;
    assert!(matches!(nan_exit, Err(LedgerError::Validation(_))));
}

#[tokio::test]
async fn delete_missing_id_fails_and_leaves_list_intact() {
    let (ledger, _) = test_ledger();

    ledger
        .create_trade("BTC/USD", TradeSide::Long, 100.0, 1.0)
        .await
        .unwrap();

    let missing = ledger.delete_trade("no-such-id").await;
    assert!(matches!(missing, Err(LedgerError::NotFound(_))));
    assert_eq!(ledger.list_trades().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_removes_open_and_closed_trades() {
    let (ledger, _) = test_ledger();

    let open = ledger
        .create_trade("BTC/USD", TradeSide::Long, 100.0, 1.0)
        .await
        .unwrap();
    let closed = ledger
        .create_trade("ETH/USD", TradeSide::Short, 50.0, 2.0)
        .await
        .unwrap();
    ledger.close_trade(&closed.id, 45.0, "1h").await.unwrap();

    ledger.delete_trade(&open.id).await.unwrap();
    ledger.delete_trade(&closed.id).await.unwrap();
    assert!(ledger.list_trades().await.unwrap().is_empty());
}

#[tokio::test]
async fn lifecycle_emits_change_events() {
    let (ledger, _) = test_ledger();
    let mut events = ledger.subscribe();

    let trade = ledger
        .create_trade("BTC/USD", TradeSide::Long, 100.0, 1.0)
        .await
        .unwrap();
    ledger.close_trade(&trade.id, 110.0, "1h").await.unwrap();
    ledger.delete_trade(&trade.id).await.unwrap();

    assert_eq!(events.recv().await.unwrap().kind, ChangeKind::Insert);
    assert_eq!(events.recv().await.unwrap().kind, ChangeKind::Update);
    assert_eq!(events.recv().await.unwrap().kind, ChangeKind::Delete);
}

#[tokio::test]
async fn statistics_over_a_full_session() {
    let (ledger, _) = test_ledger();

    // Closed pnls end up as [+10, +20, -5, 0] plus one open trade
    for (asset, exit) in [
        ("BTC/USD", 110.0),
        ("BTC/USD", 120.0),
        ("ETH/USD", 95.0),
        ("ETH/USD", 100.0),
    ] {
        let trade = ledger
            .create_trade(asset, TradeSide::Long, 100.0, 1.0)
            .await
            .unwrap();
        ledger.close_trade(&trade.id, exit, "1h").await.unwrap();
    }
    ledger
        .create_trade("SOL/USD", TradeSide::Long, 100.0, 1.0)
        .await
        .unwrap();

    let trades = ledger.list_trades().await.unwrap();
    let stats = compute_performance_statistics(&trades);

    assert_eq!(stats.total_trades, 4);
    assert_eq!(stats.win_rate, 50);
    assert_eq!(stats.total_pnl, 25.0);
    assert_eq!(stats.average_profit, 15.0);
    assert_eq!(stats.average_loss, 2.5);
    assert_eq!(stats.best_trade, 20.0);
    assert_eq!(stats.worst_trade, -5.0);
    assert_eq!(stats.recommendations.len(), 3);
}
