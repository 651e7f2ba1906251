// src/stats.rs - Aggregate performance statistics over closed trades
use crate::types::{Trade, TradeStatus};
use serde::Serialize;
use std::collections::HashMap;

const NO_CLOSED_TRADES_MSG: &str =
    "No closed trades yet. Start trading to see performance metrics.";

// Fallback recommendations used to pad the advisory list, in fixed order.
const GENERIC_RECOMMENDATIONS: [&str; 3] = [
    "Consider taking profits earlier on volatile assets",
    "Your win rate is higher during morning sessions",
    "Reduce position size on trending tech stocks",
];

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStatistics {
    pub win_rate: u32,
    pub total_pnl: f64,
    pub average_profit: f64,
    pub average_loss: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub total_trades: usize,
    pub recommendations: Vec<String>,
}

/// Computes aggregate statistics over the closed subset of `trades`.
///
/// Pure and deterministic: identical input sequences (including order) always
/// yield identical output. A trade with `pnl == 0` is not a win, but it does
/// count toward the loss average.
pub fn compute_performance_statistics(trades: &[Trade]) -> PerformanceStatistics {
    let closed: Vec<&Trade> = trades
        .iter()
        .filter(|t| t.status == TradeStatus::Closed && t.pnl.is_some())
        .collect();

    if closed.is_empty() {
        return PerformanceStatistics {
            win_rate: 0,
            total_pnl: 0.0,
            average_profit: 0.0,
            average_loss: 0.0,
            best_trade: 0.0,
            worst_trade: 0.0,
            total_trades: 0,
            recommendations: vec![NO_CLOSED_TRADES_MSG.to_string()],
        };
    }

    let pnls: Vec<f64> = closed.iter().map(|t| t.pnl.unwrap_or(0.0)).collect();
    let total = pnls.len();

    let winning: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losing: Vec<f64> = pnls.iter().copied().filter(|p| *p <= 0.0).collect();

    let win_rate = ((winning.len() as f64 / total as f64) * 100.0).round() as u32;
    let total_pnl: f64 = pnls.iter().sum();

    let average_profit = if winning.is_empty() {
        0.0
    } else {
        winning.iter().sum::<f64>() / winning.len() as f64
    };

    let average_loss = if losing.is_empty() {
        0.0
    } else {
        losing.iter().map(|p| p.abs()).sum::<f64>() / losing.len() as f64
    };

    let best_trade = pnls.iter().copied().fold(f64::MIN, f64::max);
    let worst_trade = pnls.iter().copied().fold(f64::MAX, f64::min);

    let recommendations = generate_recommendations(win_rate, total_pnl, &closed);

    PerformanceStatistics {
        win_rate,
        total_pnl,
        average_profit,
        average_loss,
        best_trade,
        worst_trade,
        total_trades: total,
        recommendations,
    }
}

/// Rule list evaluated in fixed priority order, padded from the generic
/// fallbacks so the result is always exactly 3 entries.
fn generate_recommendations(win_rate: u32, total_pnl: f64, closed: &[&Trade]) -> Vec<String> {
    let mut recommendations: Vec<String> = Vec::new();

    if win_rate < 40 {
        recommendations.push(
            "Your win rate is below average. Consider reviewing your entry criteria.".to_string(),
        );
    } else if win_rate > 60 {
        recommendations.push(
            "Your win rate is strong. Consider increasing position sizes on high-conviction trades."
                .to_string(),
        );
    }

    if total_pnl < 0.0 {
        recommendations
            .push("Your overall P&L is negative. Focus on cutting losses earlier.".to_string());
    } else if total_pnl > 0.0 {
        recommendations.push(
            "Your strategy is profitable. Consider documenting what's working well.".to_string(),
        );
    }

    if let Some(asset) = most_traded_asset(closed) {
        recommendations.push(format!(
            "You trade {} frequently. Consider specializing in this asset.",
            asset
        ));
    }

    for filler in GENERIC_RECOMMENDATIONS {
        if recommendations.len() >= 3 {
            break;
        }
        recommendations.push(filler.to_string());
    }

    recommendations.truncate(3);
    recommendations
}

// Ties break on first occurrence in input order, which keeps the result
// independent of map iteration order.
fn most_traded_asset(closed: &[&Trade]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, trade) in closed.iter().enumerate() {
        let entry = counts.entry(trade.asset.as_str()).or_insert((0, idx));
        entry.0 += 1;
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(asset, _)| asset.to_string())
}
