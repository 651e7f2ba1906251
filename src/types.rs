// src/types.rs - Trade domain model and store row mapping
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    #[serde(rename = "buy")]
    Long,
    #[serde(rename = "sell")]
    Short,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Long => write!(f, "buy"),
            TradeSide::Short => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// A single position record. `exit_price`, `pnl`, `pnl_percentage` and
/// `duration` are absent while the trade is open and all set by the one-shot
/// close transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub asset: String,
    pub side: TradeSide,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub position_size: f64,
    pub pnl: Option<f64>,
    pub pnl_percentage: Option<f64>,
    pub status: TradeStatus,
    pub opened_at: DateTime<Utc>,
    pub duration: Option<String>,
    pub owner_id: Option<String>,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }
}

// The store serializes numeric columns either as JSON numbers or as
// string-encoded decimals depending on the column type; accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Num(f64),
    Str(String),
}

fn de_decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDecimal::deserialize(deserializer)? {
        RawDecimal::Num(v) => Ok(v),
        RawDecimal::Str(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

fn de_opt_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDecimal>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDecimal::Num(v)) => Ok(Some(v)),
        Some(RawDecimal::Str(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed
                    .parse::<f64>()
                    .map(Some)
                    .map_err(serde::de::Error::custom)
            }
        }
    }
}

/// Row shape returned by the remote store. Column names are the store's
/// (snake_case, `type` for the side, `timestamp` for the open time, `user_id`
/// for the owner).
#[derive(Debug, Clone, Deserialize)]
pub struct TradeRow {
    pub id: String,
    pub asset: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    #[serde(deserialize_with = "de_decimal")]
    pub entry_price: f64,
    #[serde(default, deserialize_with = "de_opt_decimal")]
    pub exit_price: Option<f64>,
    #[serde(deserialize_with = "de_decimal")]
    pub position_size: f64,
    #[serde(default, deserialize_with = "de_opt_decimal")]
    pub pnl: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_decimal")]
    pub pnl_percentage: Option<f64>,
    pub status: TradeStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl From<TradeRow> for Trade {
    fn from(row: TradeRow) -> Self {
        Trade {
            id: row.id,
            asset: row.asset,
            side: row.side,
            entry_price: row.entry_price,
            exit_price: row.exit_price,
            position_size: row.position_size,
            pnl: row.pnl,
            pnl_percentage: row.pnl_percentage,
            status: row.status,
            opened_at: row.timestamp,
            duration: row.duration,
            owner_id: row.user_id,
        }
    }
}

/// Insert payload for a newly opened trade, in the store's column names.
/// The store assigns the id.
#[derive(Debug, Clone, Serialize)]
pub struct NewTradeRow {
    pub asset: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub entry_price: f64,
    pub position_size: f64,
    pub status: TradeStatus,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
}

/// Patch applied by the close transition. This is the only field-level update
/// the ledger ever issues, and it is sent as a single store mutation.
#[derive(Debug, Clone, Serialize)]
pub struct CloseTradeRow {
    pub status: TradeStatus,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_percentage: f64,
    pub duration: String,
}
