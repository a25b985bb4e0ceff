use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::message::{MessagePayload, TicketMessage};
use super::user::UserSummary;
use crate::models::attachment::TicketAttachment;
use crate::models::timeline::TicketTimelineEvent;
use crate::projection::{self, parse_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Status counters returned next to the ticket list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketStats {
    pub total: i64,
    pub open: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub closed: i64,
}

/// One row of the ticket list screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: i64,
    pub subject: String,
    pub status: TicketStatus,
    #[serde(default)]
    pub priority: TicketPriority,
    pub reporter: UserSummary,
    pub created_at: String,
    pub updated_at: String,
}

/// Query parameters for the admin ticket list. `sort` takes comma-separated
/// fields with a `-` prefix for descending.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TicketListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

/// Paged admin list response.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketPage {
    pub tickets: Vec<TicketSummary>,
    pub page: i32,
    pub per_page: i32,
    pub total: i32,
}

/// Full hydration payload for one ticket, as served by
/// `GET /ticket/my/{id}` and `GET /tickets/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketDetailPayload {
    pub id: i64,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub status: TicketStatus,
    #[serde(default)]
    pub priority: TicketPriority,
    pub reporter: UserSummary,
    #[serde(default)]
    pub assignee: Option<UserSummary>,
    #[serde(default)]
    pub participants: Vec<UserSummary>,
    #[serde(default)]
    pub messages: Vec<MessagePayload>,
    pub created_at: String,
    pub updated_at: String,
}

/// Aggregate root for one open ticket. Owned by the view for as long as the
/// screen is open; replaced wholesale on open and discarded on close.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketDetail {
    pub id: i64,
    pub subject: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub reporter: UserSummary,
    pub assignee: Option<UserSummary>,
    pub participants: Vec<UserSummary>,
    pub messages: Vec<TicketMessage>,
    pub attachments: Vec<TicketAttachment>,
    pub timeline: Vec<TicketTimelineEvent>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TicketDetail {
    /// Builds the aggregate from a hydration payload: normalizes messages,
    /// seeds participants, merges the gallery and rebuilds the full timeline.
    pub fn hydrate(payload: TicketDetailPayload, api_base: &str) -> Self {
        let messages: Vec<TicketMessage> = payload
            .messages
            .into_iter()
            .map(|m| TicketMessage::from_payload(m, api_base))
            .collect();

        let mut participants = payload.participants;
        let mut seen: Vec<i64> = participants.iter().map(|p| p.id).collect();
        let mut admit = |user: &UserSummary| {
            if user.id != 0 && !seen.contains(&user.id) {
                seen.push(user.id);
                participants.push(user.clone());
            }
        };
        admit(&payload.reporter);
        if let Some(assignee) = &payload.assignee {
            admit(assignee);
        }
        for message in &messages {
            admit(&message.author);
        }

        let created_at = parse_timestamp(&payload.created_at);
        let updated_at = parse_timestamp(&payload.updated_at);

        let attachments = projection::merge_attachments(&messages);
        let timeline = projection::build_timeline(
            payload.id,
            payload.status,
            created_at,
            updated_at,
            &messages,
        );

        Self {
            id: payload.id,
            subject: payload.subject,
            description: payload.description,
            status: payload.status,
            priority: payload.priority,
            reporter: payload.reporter,
            assignee: payload.assignee,
            participants,
            messages,
            attachments,
            timeline,
            created_at,
            updated_at,
        }
    }
}
