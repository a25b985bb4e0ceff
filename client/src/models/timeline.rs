use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Icon category for a timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimelineKind {
    Created,
    Updated,
    Status,
    Assignee,
    Comment,
}

/// One row of the ticket activity timeline. Timestamps are `None` when the
/// source record carried an unparseable date; unknown sorts before known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketTimelineEvent {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: TimelineKind,
    pub timestamp: Option<DateTime<Utc>>,
}
