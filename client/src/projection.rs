//! Pure derivations over the merged message set: the attachment gallery and
//! the activity timeline. No hidden state; safe to recompute on every change.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashSet;

use crate::models::attachment::TicketAttachment;
use crate::models::message::TicketMessage;
use crate::models::ticket::TicketStatus;
use crate::models::timeline::{TicketTimelineEvent, TimelineKind};

/// Best-effort timestamp parsing. RFC 3339 first, then the bare
/// `YYYY-MM-DD HH:MM:SS` form some endpoints emit. Anything else is unknown.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// De-duplicated attachment gallery over all messages, first-seen order.
pub fn merge_attachments(messages: &[TicketMessage]) -> Vec<TicketAttachment> {
    let mut seen = HashSet::new();
    let mut gallery = Vec::new();
    for message in messages {
        fold_attachments_inner(&mut gallery, &mut seen, &message.attachments);
    }
    gallery
}

/// Incremental counterpart of [`merge_attachments`]: folds one message's
/// attachments into an existing gallery without disturbing prior order.
pub fn fold_attachments(gallery: &mut Vec<TicketAttachment>, incoming: &[TicketAttachment]) {
    let mut seen: HashSet<String> = gallery.iter().map(|a| a.identity_key()).collect();
    fold_attachments_inner(gallery, &mut seen, incoming);
}

fn fold_attachments_inner(
    gallery: &mut Vec<TicketAttachment>,
    seen: &mut HashSet<String>,
    incoming: &[TicketAttachment],
) {
    for attachment in incoming {
        if seen.insert(attachment.identity_key()) {
            gallery.push(attachment.clone());
        }
    }
}

/// Timeline entry for one message. Used by the full rebuild and by the
/// incremental merge path, so both produce identical events.
pub fn comment_event(message: &TicketMessage) -> TicketTimelineEvent {
    TicketTimelineEvent {
        id: format!("comment:{}", message.id),
        label: format!("{} commented", message.author.username),
        description: Some(message.content.clone()),
        kind: TimelineKind::Comment,
        timestamp: message.created_at,
    }
}

/// Full timeline rebuild used at hydration time: creation, current status,
/// an update marker when distinct from creation, and one comment entry per
/// historical message, sorted ascending once. Unknown timestamps sort first.
pub fn build_timeline(
    ticket_id: i64,
    status: TicketStatus,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    messages: &[TicketMessage],
) -> Vec<TicketTimelineEvent> {
    let mut events = vec![
        TicketTimelineEvent {
            id: format!("created:{ticket_id}"),
            label: "Ticket created".to_string(),
            description: None,
            kind: TimelineKind::Created,
            timestamp: created_at,
        },
        TicketTimelineEvent {
            id: format!("status:{ticket_id}"),
            label: format!("Status: {status}"),
            description: None,
            kind: TimelineKind::Status,
            timestamp: updated_at.or(created_at),
        },
    ];

    if updated_at != created_at {
        events.push(TicketTimelineEvent {
            id: format!("updated:{ticket_id}"),
            label: "Ticket updated".to_string(),
            description: None,
            kind: TimelineKind::Updated,
            timestamp: updated_at,
        });
    }

    events.extend(messages.iter().map(comment_event));
    events.sort_by_key(|e| e.timestamp);
    events
}
