//! HTTP client for the ClubHub ticket API.
//!
//! Every endpoint wraps its JSON body in the standard envelope
//! `{ "success": bool, "data": ..., "message": "..." }`; the helpers here
//! unwrap that envelope and turn `success: false` into [`ClientError::Api`].

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use crate::error::ClientError;
use crate::models::{
    MessagePayload, TicketDetailPayload, TicketListQuery, TicketPage, TicketStats, TicketSummary,
};

/// Standard response envelope used by every ClubHub endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
}

/// `GET /ticket/my` body: list rows plus status counters.
#[derive(Debug, Deserialize)]
pub struct MyTickets {
    pub tickets: Vec<TicketSummary>,
    #[serde(default)]
    pub stats: TicketStats,
}

/// A staged file ready to go on the wire.
#[derive(Debug, Clone)]
pub struct OutgoingFile {
    pub name: String,
    pub mime: String,
    pub data: Bytes,
}

pub struct TicketApi {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl TicketApi {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, token, Duration::from_secs(30))
    }

    pub fn with_timeout(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Builds a client from the process-wide [`common::Config`].
    pub fn from_config(token: Option<String>) -> Result<Self, ClientError> {
        let config = common::Config::get();
        Self::with_timeout(
            &config.api_base_url,
            token,
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// `GET /ticket/my` — the caller's tickets with status counters.
    pub async fn my_tickets(&self) -> Result<MyTickets, ClientError> {
        self.get(&format!("{}/ticket/my", self.base)).await
    }

    /// `GET /ticket/my/{id}` — full hydration payload.
    pub async fn my_ticket(&self, ticket_id: i64) -> Result<TicketDetailPayload, ClientError> {
        self.get(&format!("{}/ticket/my/{ticket_id}", self.base))
            .await
    }

    /// `POST /ticket/my/{id}/messages` — multipart message submit.
    pub async fn send_my_message(
        &self,
        ticket_id: i64,
        content: &str,
        files: &[OutgoingFile],
    ) -> Result<MessagePayload, ClientError> {
        self.post_message(
            &format!("{}/ticket/my/{ticket_id}/messages", self.base),
            content,
            files,
        )
        .await
    }

    /// `GET /tickets` — paged, filterable admin list.
    pub async fn tickets(&self, query: &TicketListQuery) -> Result<TicketPage, ClientError> {
        let request = self.authorized(self.http.get(format!("{}/tickets", self.base)));
        let response = request.query(query).send().await?;
        decode(response).await
    }

    /// `GET /tickets/{id}` — admin hydration payload.
    pub async fn ticket(&self, ticket_id: i64) -> Result<TicketDetailPayload, ClientError> {
        self.get(&format!("{}/tickets/{ticket_id}", self.base))
            .await
    }

    /// `POST /tickets/{id}/messages` — admin-side message submit.
    pub async fn send_message(
        &self,
        ticket_id: i64,
        content: &str,
        files: &[OutgoingFile],
    ) -> Result<MessagePayload, ClientError> {
        self.post_message(
            &format!("{}/tickets/{ticket_id}/messages", self.base),
            content,
            files,
        )
        .await
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        let response = self.authorized(self.http.get(url)).send().await?;
        decode(response).await
    }

    async fn post_message(
        &self,
        url: &str,
        content: &str,
        files: &[OutgoingFile],
    ) -> Result<MessagePayload, ClientError> {
        let mut form = Form::new().text("message", json!({ "content": content }).to_string());
        for file in files {
            let part = Part::bytes(file.data.to_vec())
                .file_name(file.name.clone())
                .mime_str(&file.mime)?;
            form = form.part("files[]", part);
        }

        let response = self
            .authorized(self.http.post(url))
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let envelope: ApiResponse<T> = response
        .json()
        .await
        .map_err(|_| ClientError::decode(format!("unexpected response body (HTTP {status})")))?;
    unwrap_envelope(envelope, status.as_u16())
}

fn unwrap_envelope<T>(envelope: ApiResponse<T>, status: u16) -> Result<T, ClientError> {
    if !envelope.success {
        let message = if envelope.message.is_empty() {
            format!("request failed (HTTP {status})")
        } else {
            envelope.message
        };
        return Err(ClientError::Api(message));
    }
    envelope
        .data
        .ok_or_else(|| ClientError::decode("envelope is missing its data field"))
}
