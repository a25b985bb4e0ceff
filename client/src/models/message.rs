use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::attachment::{AttachmentPayload, TicketAttachment};
use super::user::UserSummary;
use crate::projection::parse_timestamp;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeliveryStatus {
    #[default]
    Sent,
    Delivered,
    Read,
}

/// Message record as delivered by the REST endpoints and the push channel.
/// Timestamps stay raw strings here; parsing is best-effort downstream so one
/// bad record cannot poison a whole hydration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: i64,
    pub ticket_id: i64,
    pub content: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub status: Option<DeliveryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
}

/// One chat entry in the discussion thread. Immutable once merged; the view
/// model only ever appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMessage {
    pub id: i64,
    pub ticket_id: i64,
    pub author: UserSummary,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
    pub attachments: Vec<TicketAttachment>,
}

impl TicketMessage {
    pub fn from_payload(payload: MessagePayload, api_base: &str) -> Self {
        let attachments = payload
            .attachments
            .iter()
            .map(|raw| TicketAttachment::normalize(raw, api_base))
            .collect();

        Self {
            id: payload.id,
            ticket_id: payload.ticket_id,
            author: payload.user.unwrap_or_else(UserSummary::unknown),
            content: payload.content,
            created_at: parse_timestamp(&payload.created_at),
            status: payload.status.unwrap_or_default(),
            attachments,
        }
    }
}
