// src/store/supabase.rs - PostgREST-backed trade store
use crate::config::Config;
use crate::errors::LedgerError;
use crate::store::{ChangeEvent, ChangeKind, TradeStore, CHANGE_CHANNEL_CAPACITY};
use crate::types::{CloseTradeRow, NewTradeRow, Trade, TradeRow};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tokio::sync::broadcast;

/// Trade store backed by a Supabase project's REST endpoint
/// (`{base}/rest/v1/{table}`). Every successful local mutation is published on
/// the change channel; remote mutations arrive through the realtime listener
/// feeding the same channel.
pub struct SupabaseTradeStore {
    http: reqwest::Client,
    endpoint: String,
    changes: broadcast::Sender<ChangeEvent>,
}

impl SupabaseTradeStore {
    pub fn new(config: &Config) -> Result<Self, LedgerError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.supabase_anon_key)
            .map_err(|e| LedgerError::StoreUnavailable(format!("invalid API key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.supabase_anon_key))
            .map_err(|e| LedgerError::StoreUnavailable(format!("invalid API key: {}", e)))?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder().default_headers(headers).build()?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Self {
            http,
            endpoint: format!(
                "{}/rest/v1/{}",
                config.supabase_url.trim_end_matches('/'),
                config.trades_table
            ),
            changes,
        })
    }

    /// Sender half of the change channel, for the realtime listener to feed
    /// remote events into.
    pub fn change_sender(&self) -> broadcast::Sender<ChangeEvent> {
        self.changes.clone()
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.http.request(method, &self.endpoint)
    }

    async fn read_rows(response: Response) -> Result<Vec<TradeRow>, LedgerError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::store_error(status, &body));
        }
        Ok(response.json().await?)
    }

    fn store_error(status: StatusCode, body: &str) -> LedgerError {
        LedgerError::StoreUnavailable(format!("store returned {}: {}", status, body))
    }

    fn publish(&self, kind: ChangeKind, trade_id: Option<String>) {
        // Send only fails when nobody is subscribed, which is fine.
        let _ = self.changes.send(ChangeEvent::new(kind, trade_id));
    }
}

#[async_trait]
impl TradeStore for SupabaseTradeStore {
    async fn fetch_all(&self) -> Result<Vec<Trade>, LedgerError> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "*"), ("order", "timestamp.desc")])
            .send()
            .await?;

        let rows = Self::read_rows(response).await?;
        debug!("📥 [STORE] Fetched {} trade rows", rows.len());
        Ok(rows.into_iter().map(Trade::from).collect())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Trade>, LedgerError> {
        let id_filter = format!("eq.{}", id);
        let response = self
            .request(Method::GET)
            .query(&[("select", "*"), ("id", id_filter.as_str())])
            .send()
            .await?;

        let rows = Self::read_rows(response).await?;
        Ok(rows.into_iter().next().map(Trade::from))
    }

    async fn insert(&self, row: NewTradeRow) -> Result<Trade, LedgerError> {
        let response = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        let mut rows = Self::read_rows(response).await?;
        let stored = rows.pop().ok_or_else(|| {
            LedgerError::StoreUnavailable("insert returned no representation".to_string())
        })?;

        let trade = Trade::from(stored);
        self.publish(ChangeKind::Insert, Some(trade.id.clone()));
        Ok(trade)
    }

    async fn update(&self, id: &str, patch: CloseTradeRow) -> Result<Option<Trade>, LedgerError> {
        let id_filter = format!("eq.{}", id);
        let response = self
            .request(Method::PATCH)
            .query(&[("id", id_filter.as_str())])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;

        // PostgREST answers an update of a missing row with an empty array,
        // not an error status.
        let mut rows = Self::read_rows(response).await?;
        match rows.pop() {
            Some(row) => {
                let trade = Trade::from(row);
                self.publish(ChangeKind::Update, Some(trade.id.clone()));
                Ok(Some(trade))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, LedgerError> {
        let id_filter = format!("eq.{}", id);
        let response = self
            .request(Method::DELETE)
            .query(&[("id", id_filter.as_str())])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        let rows = Self::read_rows(response).await?;
        let removed = !rows.is_empty();
        if removed {
            self.publish(ChangeKind::Delete, Some(id.to_string()));
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
