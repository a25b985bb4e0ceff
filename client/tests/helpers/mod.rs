//! Stub ClubHub server for integration tests: the REST envelope endpoints the
//! client speaks plus the `/ws/{topic}` push channel, served on a random port.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
use axum::extract::{Multipart, Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};

use client::discussion::ViewState;
use client::ws::EVENT_MESSAGE_CREATED;
use client::{TicketDiscussion, TicketScope};

pub struct StubState {
    pub next_message_id: AtomicI64,
    pub fail_sends: AtomicBool,
    pub send_calls: AtomicUsize,
    pub send_delay_ms: AtomicU64,
    pub topic: broadcast::Sender<String>,
}

impl StubState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_message_id: AtomicI64::new(100),
            fail_sends: AtomicBool::new(false),
            send_calls: AtomicUsize::new(0),
            send_delay_ms: AtomicU64::new(0),
            topic: broadcast::channel(64).0,
        })
    }
}

/// Hydration payload for any ticket id: two historical messages sharing one
/// attachment name, so the merged gallery must contain it exactly once.
fn detail_json(id: i64) -> Value {
    json!({
        "id": id,
        "subject": "Projector broken",
        "description": "No signal in the club room",
        "status": "open",
        "priority": "high",
        "reporter": { "id": 1, "username": "thandi" },
        "assignee": { "id": 2, "username": "agent" },
        "created_at": "2026-08-01T09:00:00Z",
        "updated_at": "2026-08-02T10:00:00Z",
        "messages": [
            {
                "id": 1,
                "ticket_id": id,
                "content": "It broke during movie night",
                "created_at": "2026-08-01T09:05:00Z",
                "user": { "id": 1, "username": "thandi" },
                "attachments": [{ "name": "photo.png" }]
            },
            {
                "id": 2,
                "ticket_id": id,
                "content": "Here is another angle",
                "created_at": "2026-08-02T10:00:00Z",
                "user": { "id": 1, "username": "thandi" },
                "attachments": [{ "name": "photo.png" }, { "name": "cable.jpg" }]
            }
        ]
    })
}

async fn get_ticket(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": detail_json(id),
        "message": "Ticket retrieved successfully"
    }))
}

async fn my_tickets() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "tickets": [
                {
                    "id": 42,
                    "subject": "Projector broken",
                    "status": "open",
                    "priority": "high",
                    "reporter": { "id": 1, "username": "thandi" },
                    "created_at": "2026-08-01T09:00:00Z",
                    "updated_at": "2026-08-02T10:00:00Z"
                },
                {
                    "id": 43,
                    "subject": "Door code wrong",
                    "status": "resolved",
                    "priority": "low",
                    "reporter": { "id": 1, "username": "thandi" },
                    "created_at": "2026-07-01T09:00:00Z",
                    "updated_at": "2026-07-02T10:00:00Z"
                }
            ],
            "stats": { "total": 2, "open": 1, "in_progress": 0, "resolved": 1, "closed": 0 }
        },
        "message": "Tickets retrieved successfully"
    }))
}

async fn list_tickets(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let page: i32 = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    let status = params.get("status").map(String::as_str);

    let all = [
        json!({
            "id": 42,
            "subject": "Projector broken",
            "status": "open",
            "priority": "high",
            "reporter": { "id": 1, "username": "thandi" },
            "created_at": "2026-08-01T09:00:00Z",
            "updated_at": "2026-08-02T10:00:00Z"
        }),
        json!({
            "id": 43,
            "subject": "Door code wrong",
            "status": "resolved",
            "priority": "low",
            "reporter": { "id": 1, "username": "thandi" },
            "created_at": "2026-07-01T09:00:00Z",
            "updated_at": "2026-07-02T10:00:00Z"
        }),
    ];
    let tickets: Vec<Value> = all
        .iter()
        .filter(|t| status.is_none_or(|s| t["status"] == s))
        .cloned()
        .collect();
    let total = tickets.len();

    Json(json!({
        "success": true,
        "data": {
            "tickets": tickets,
            "page": page,
            "per_page": 20,
            "total": total
        },
        "message": "Tickets retrieved successfully"
    }))
}

async fn create_message(
    Path(id): Path<i64>,
    State(state): State<Arc<StubState>>,
    mut multipart: Multipart,
) -> Json<Value> {
    state.send_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.send_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if state.fail_sends.load(Ordering::SeqCst) {
        return Json(json!({
            "success": false,
            "data": null,
            "message": "Failed to create message"
        }));
    }

    let mut content = String::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name() {
            Some("message") => {
                let raw = field.text().await.unwrap();
                let parsed: Value = serde_json::from_str(&raw).unwrap();
                content = parsed["content"].as_str().unwrap_or_default().to_string();
            }
            Some("files[]") => {
                let name = field.file_name().unwrap_or("file").to_string();
                let _ = field.bytes().await.unwrap();
                files.push(json!({ "name": name }));
            }
            _ => {}
        }
    }

    let message_id = state.next_message_id.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "success": true,
        "data": {
            "id": message_id,
            "ticket_id": id,
            "content": content,
            "created_at": Utc::now().to_rfc3339(),
            "user": { "id": 2, "username": "agent" },
            "attachments": files
        },
        "message": "Message created successfully"
    }))
}

async fn ws_handler(
    Path(_topic): Path<String>,
    State(state): State<Arc<StubState>>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    let mut rx = state.topic.subscribe();
    upgrade.on_upgrade(move |mut socket| async move {
        while let Ok(frame) = rx.recv().await {
            if socket.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    })
}

pub fn stub_app(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/api/ticket/my", get(my_tickets))
        .route("/api/ticket/my/{id}", get(get_ticket))
        .route("/api/ticket/my/{id}/messages", post(create_message))
        .route("/api/tickets", get(list_tickets))
        .route("/api/tickets/{id}", get(get_ticket))
        .route("/api/tickets/{id}/messages", post(create_message))
        .route("/ws/{topic}", get(ws_handler))
        .with_state(state)
}

/// Spawns the stub on a random local port.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A member-scope discussion wired against the stub server.
pub fn make_discussion(addr: &SocketAddr) -> TicketDiscussion {
    let api = client::api::TicketApi::new(&format!("http://{addr}/api"), None).unwrap();
    let feed = Arc::new(client::ws::WsTicketFeed::new(&format!("ws://{addr}/ws")));
    TicketDiscussion::new(api, feed, None, TicketScope::My, 10)
}

/// Broadcasts a well-formed comment event on the push channel.
pub fn push_comment(state: &StubState, ticket_id: i64, message_id: i64, content: &str) {
    let frame = json!({
        "type": "event",
        "event": EVENT_MESSAGE_CREATED,
        "topic": format!("tickets:{ticket_id}"),
        "payload": {
            "id": message_id,
            "ticket_id": ticket_id,
            "content": content,
            "created_at": Utc::now().to_rfc3339(),
            "user": { "id": 9, "username": "sipho" },
            "attachments": [{ "name": "photo.png" }]
        },
        "ts": Utc::now().to_rfc3339()
    })
    .to_string();
    let _ = state.topic.send(frame);
}

pub fn push_raw(state: &StubState, frame: &str) {
    let _ = state.topic.send(frame.to_string());
}

/// Polls the reactive state until `pred` holds or the timeout hits.
pub async fn wait_for_state<F>(rx: &mut watch::Receiver<ViewState>, mut pred: F) -> ViewState
where
    F: FnMut(&ViewState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let current = rx.borrow_and_update();
                if pred(&current) {
                    return current.clone();
                }
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .expect("condition not reached in time")
}
