// src/ws_server.rs - WebSocket push of trade change events
use crate::store::ChangeEvent;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use uuid::Uuid;

type ClientMap = Arc<DashMap<String, mpsc::UnboundedSender<Message>>>;

/// Fans change events out to connected UI clients. Clients are expected to
/// re-fetch the trade list after every event (and after a reconnect); no
/// missed events are buffered for them.
pub struct ChangeFeedServer {
    clients: ClientMap,
    events: broadcast::Receiver<ChangeEvent>,
}

impl ChangeFeedServer {
    pub fn new(events: broadcast::Receiver<ChangeEvent>) -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
            events,
        }
    }

    pub async fn start(
        self,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(addr).await?;
        info!("📡 [CHANGE_FEED] WebSocket server listening on {}", addr);

        // Fan-out task
        let clients = Arc::clone(&self.clients);
        let mut events = self.events;
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                Self::broadcast_event(&clients, &event);
            }
        });

        while let Ok((stream, peer)) = listener.accept().await {
            let clients = Arc::clone(&self.clients);
            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, peer, clients).await {
                    error!("❌ [CHANGE_FEED] Connection error from {}: {}", peer, e);
                }
            });
        }

        Ok(())
    }

    fn broadcast_event(clients: &ClientMap, event: &ChangeEvent) {
        let frame = json!({
            "type": "trades_changed",
            "event": event.kind,
            "trade_id": event.trade_id,
            "timestamp": event.timestamp.to_rfc3339(),
        })
        .to_string();

        let mut dead: Vec<String> = Vec::new();
        for entry in clients.iter() {
            if entry.value().send(Message::Text(frame.clone())).is_err() {
                dead.push(entry.key().clone());
            }
        }
        for id in dead {
            clients.remove(&id);
        }

        debug!(
            "📡 [CHANGE_FEED] Broadcast {:?} to {} clients",
            event.kind,
            clients.len()
        );
    }

    async fn handle_connection(
        stream: TcpStream,
        peer: SocketAddr,
        clients: ClientMap,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let ws_stream = accept_async(stream).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let client_id = Uuid::new_v4().to_string();
        let (tx, mut rx) = mpsc::unbounded_channel();

        info!("🔗 [CHANGE_FEED] Client {} connected from {}", client_id, peer);

        let welcome = json!({
            "type": "connected",
            "client_id": client_id,
            "message": "Connected to trade ledger change feed",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        ws_sender.send(Message::Text(welcome.to_string())).await?;

        clients.insert(client_id.clone(), tx);

        // Writer task: everything queued for this client goes out here.
        let writer_clients = Arc::clone(&clients);
        let writer_id = client_id.clone();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(e) = ws_sender.send(message).await {
                    warn!(
                        "⚠️  [CHANGE_FEED] Dropping client {}: {}",
                        writer_id, e
                    );
                    writer_clients.remove(&writer_id);
                    break;
                }
            }
        });

        // Reader loop: the feed is one-way, we only react to control frames.
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Ping(payload)) => {
                    if let Some(sender) = clients.get(&client_id) {
                        let _ = sender.send(Message::Pong(payload));
                    }
                }
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }

        clients.remove(&client_id);
        info!("🔌 [CHANGE_FEED] Client {} disconnected", client_id);
        Ok(())
    }
}
