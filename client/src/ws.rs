//! Push-channel side of the discussion view: a per-ticket WebSocket
//! subscription delivering comment events inside the standard envelope
//! `{ "type": "event", "event": "...", "topic": "...", "payload": ..., "ts": "..." }`.
//!
//! The feed is a trait so tests (or another transport) can stand in for the
//! real socket; [`WsTicketFeed`] is the tokio-tungstenite implementation.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::ClientError;
use crate::models::MessagePayload;

pub const EVENT_MESSAGE_CREATED: &str = "ticket.message_created";
pub const EVENT_TYPING: &str = "ticket.typing";

/// Canonical topic path for one ticket's chat stream.
pub fn ticket_topic(ticket_id: i64) -> String {
    format!("tickets:{ticket_id}")
}

/// Standard event envelope received over WebSocket topics.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub topic: String,
    pub payload: serde_json::Value,
    pub ts: String,
}

/// Decoded push event the view model reacts to.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Message(MessagePayload),
    Typing { sender: String },
}

/// Decodes one text frame. Malformed frames and unhandled event names are
/// dropped with a debug log; the caller never sees a partial decode.
pub fn decode_event(raw: &str) -> Option<FeedEvent> {
    let envelope: EventEnvelope = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(err) => {
            log::debug!("dropping malformed push frame: {err}");
            return None;
        }
    };

    match envelope.event.as_str() {
        EVENT_MESSAGE_CREATED => match serde_json::from_value(envelope.payload) {
            Ok(payload) => Some(FeedEvent::Message(payload)),
            Err(err) => {
                log::debug!("dropping malformed comment payload on {}: {err}", envelope.topic);
                None
            }
        },
        EVENT_TYPING => envelope
            .payload
            .get("sender")
            .and_then(|v| v.as_str())
            .map(|sender| FeedEvent::Typing {
                sender: sender.to_string(),
            }),
        "pong" => None,
        other => {
            log::debug!("ignoring push event '{other}' on {}", envelope.topic);
            None
        }
    }
}

/// Cancellation handle for an active subscription. Cancel is idempotent and
/// also fires on drop, so replacing a subscription tears the old one down.
#[derive(Debug, Default)]
pub struct FeedGuard {
    abort: Option<AbortHandle>,
}

impl FeedGuard {
    pub fn new(abort: AbortHandle) -> Self {
        Self { abort: Some(abort) }
    }

    /// Detached guard for feeds with no reader task of their own.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A live per-ticket subscription: the event stream plus its guard.
pub struct FeedSubscription {
    pub events: mpsc::Receiver<FeedEvent>,
    pub guard: FeedGuard,
}

/// Abstraction over the push transport; one subscription per call, scoped to
/// a single ticket.
#[async_trait]
pub trait TicketFeed: Send + Sync {
    async fn subscribe(
        &self,
        ticket_id: i64,
        token: Option<&str>,
    ) -> Result<FeedSubscription, ClientError>;
}

/// WebSocket-backed feed connecting to `{ws_base}/tickets:{id}?token=...`.
pub struct WsTicketFeed {
    ws_base: String,
}

impl WsTicketFeed {
    pub fn new(ws_base: &str) -> Self {
        Self {
            ws_base: ws_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config() -> Self {
        Self::new(&common::Config::get().ws_base_url)
    }
}

#[async_trait]
impl TicketFeed for WsTicketFeed {
    async fn subscribe(
        &self,
        ticket_id: i64,
        token: Option<&str>,
    ) -> Result<FeedSubscription, ClientError> {
        let mut url = format!("{}/{}", self.ws_base, ticket_topic(ticket_id));
        if let Some(token) = token {
            url.push_str(&format!("?token={token}"));
        }

        let request = url.into_client_request()?;
        let (stream, _response) = connect_async(request).await?;

        let (tx, rx) = mpsc::channel(64);
        let reader = tokio::spawn(read_loop(stream, tx, ticket_id));

        Ok(FeedSubscription {
            events: rx,
            guard: FeedGuard::new(reader.abort_handle()),
        })
    }
}

async fn read_loop(
    mut stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    tx: mpsc::Sender<FeedEvent>,
    ticket_id: i64,
) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Some(event) = decode_event(text.as_str()) {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            // Ping/pong frames are answered by the protocol layer.
            Ok(_) => {}
            Err(err) => {
                log::warn!("push channel for ticket {ticket_id} failed: {err}");
                break;
            }
        }
    }
    log::debug!("push channel for ticket {ticket_id} closed");
}
