// src/store/realtime.rs - Supabase realtime change feed client
use crate::config::Config;
use crate::store::{ChangeEvent, ChangeKind};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use serde_json::json;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const HEARTBEAT_INTERVAL_SECS: u64 = 30;
const RECONNECT_DELAY_SECS: u64 = 5;

/// Subscribes to the store's realtime websocket and forwards remote
/// insert/update/delete events into the shared change channel. Missed events
/// are not replayed across a disconnect; a rejoin publishes a generic "re-read"
/// poke instead.
pub struct RealtimeListener {
    ws_url: String,
    topic: String,
    changes: broadcast::Sender<ChangeEvent>,
}

impl RealtimeListener {
    pub fn new(config: &Config, changes: broadcast::Sender<ChangeEvent>) -> Self {
        let ws_base = config
            .supabase_url
            .trim_end_matches('/')
            .replacen("http", "ws", 1);

        Self {
            ws_url: format!(
                "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
                ws_base, config.supabase_anon_key
            ),
            topic: format!("realtime:public:{}", config.trades_table),
            changes,
        }
    }

    /// Keeps a realtime session alive, reconnecting with a fixed delay when
    /// the socket drops. Never returns.
    pub async fn run_forever(self) {
        let mut first_session = true;
        loop {
            match self.run_session(first_session).await {
                Ok(()) => warn!("📡 [REALTIME] Session ended, reconnecting"),
                Err(e) => error!("❌ [REALTIME] Session failed: {}", e),
            }
            first_session = false;
            tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
        }
    }

    async fn run_session(
        &self,
        first_session: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (ws_stream, _) = connect_async(&self.ws_url).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let join_msg = json!({
            "topic": self.topic,
            "event": "phx_join",
            "payload": {},
            "ref": "1"
        });
        ws_sender.send(Message::Text(join_msg.to_string())).await?;
        info!("📡 [REALTIME] Joined channel {}", self.topic);

        // Events emitted while we were disconnected are gone; poke consumers
        // into a fresh fetch.
        if !first_session {
            let _ = self.changes.send(ChangeEvent::new(ChangeKind::Update, None));
        }

        let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        heartbeat.tick().await; // first tick fires immediately
        let mut heartbeat_ref: u64 = 1;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    heartbeat_ref += 1;
                    let msg = json!({
                        "topic": "phoenix",
                        "event": "heartbeat",
                        "payload": {},
                        "ref": heartbeat_ref.to_string()
                    });
                    ws_sender.send(Message::Text(msg.to_string())).await?;
                }
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_message(&text),
                        Some(Ok(Message::Ping(payload))) => {
                            ws_sender.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            warn!("📡 [REALTIME] Server closed the connection");
                            break;
                        }
                        Some(Err(e)) => {
                            error!("❌ [REALTIME] WebSocket error: {}", e);
                            break;
                        }
                        None => {
                            warn!("📡 [REALTIME] Stream ended");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_message(&self, text: &str) {
        let data: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!("⚠️  [REALTIME] Unparseable frame: {}", e);
                return;
            }
        };

        let kind = match data.get("event").and_then(|e| e.as_str()) {
            Some("INSERT") => ChangeKind::Insert,
            Some("UPDATE") => ChangeKind::Update,
            Some("DELETE") => ChangeKind::Delete,
            Some("phx_reply") => {
                debug!("📡 [REALTIME] Channel reply: {}", text);
                return;
            }
            other => {
                trace!("Ignoring realtime event {:?}", other);
                return;
            }
        };

        let payload = data.get("payload");
        let trade_id = payload
            .and_then(|p| p.get("record").or_else(|| p.get("old_record")))
            .and_then(|r| r.get("id"))
            .and_then(|id| id.as_str())
            .map(|id| id.to_string());

        debug!("📡 [REALTIME] {:?} event for trade {:?}", kind, trade_id);
        let _ = self.changes.send(ChangeEvent::new(kind, trade_id));
    }
}
