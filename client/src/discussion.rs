//! The ticket discussion view model.
//!
//! One [`TicketDiscussion`] backs one open ticket screen. It owns the shared
//! `TicketDetail` aggregate behind a `watch` channel, feeds it from two
//! sources (the push channel and the composer's submit response) through a
//! single append-and-dedup merge path, and tears everything down on `close`.
//!
//! Sent messages are not inserted optimistically: they appear only once the
//! server acknowledges them, and identity-based dedup at the merge point
//! absorbs the echo that may still arrive over the push channel.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use bytes::Bytes;
use tokio::sync::watch;

use crate::api::TicketApi;
use crate::composer::Composer;
use crate::error::ClientError;
use crate::models::{TicketDetail, TicketMessage};
use crate::projection;
use crate::ws::{FeedEvent, FeedGuard, FeedSubscription, TicketFeed, WsTicketFeed};

/// Which API surface this view talks to: the member-facing `/ticket/my`
/// endpoints or the admin `/tickets` ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketScope {
    My,
    Admin,
}

/// Reactive snapshot the hosting view renders from.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub ticket: Option<TicketDetail>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Render-friendly description of one staged attachment.
#[derive(Debug, Clone)]
pub struct StagedSummary {
    pub id: u64,
    pub name: String,
    pub size: u64,
    pub mime: String,
    pub is_image: bool,
    pub preview: Option<PathBuf>,
}

struct Inner {
    api: TicketApi,
    feed: Arc<dyn TicketFeed>,
    token: Option<String>,
    scope: TicketScope,
    state: watch::Sender<ViewState>,
    typing: watch::Sender<Option<String>>,
    composer: Mutex<Composer>,
    guard: Mutex<Option<FeedGuard>>,
    // Bumped on every open/close; pump tasks from earlier generations see the
    // mismatch and stop mutating state.
    epoch: AtomicU64,
    sending: AtomicBool,
}

#[derive(Clone)]
pub struct TicketDiscussion {
    inner: Arc<Inner>,
}

impl TicketDiscussion {
    pub fn new(
        api: TicketApi,
        feed: Arc<dyn TicketFeed>,
        token: Option<String>,
        scope: TicketScope,
        max_attachment_mb: u64,
    ) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        let (typing, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                api,
                feed,
                token,
                scope,
                state,
                typing,
                composer: Mutex::new(Composer::new(max_attachment_mb)),
                guard: Mutex::new(None),
                epoch: AtomicU64::new(0),
                sending: AtomicBool::new(false),
            }),
        }
    }

    /// Member-facing discussion wired from the process-wide config.
    pub fn from_config(token: Option<String>) -> Result<Self, ClientError> {
        let config = common::Config::get();
        Ok(Self::new(
            TicketApi::from_config(token.clone())?,
            Arc::new(WsTicketFeed::from_config()),
            token,
            TicketScope::My,
            config.max_attachment_mb,
        ))
    }

    /// Hydrates `ticket_id` and attaches the live feed, tearing down any
    /// previously open ticket first. The aggregate is swapped in atomically;
    /// no state from the old ticket leaks into the new one.
    ///
    /// A hydration failure leaves the state empty with the error recorded. A
    /// feed failure after successful hydration keeps the hydrated ticket
    /// visible, records the error, and still returns it.
    pub async fn open(&self, ticket_id: i64) -> Result<(), ClientError> {
        let inner = &self.inner;
        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        drop(inner.guard.lock().expect("guard lock poisoned").take());
        let _ = inner.typing.send(None);

        inner.state.send_modify(|s| {
            *s = ViewState {
                ticket: None,
                is_loading: true,
                error: None,
            };
        });

        let payload = match inner.scope {
            TicketScope::My => inner.api.my_ticket(ticket_id).await,
            TicketScope::Admin => inner.api.ticket(ticket_id).await,
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(err) => {
                if inner.epoch.load(Ordering::SeqCst) == epoch {
                    let message = err.to_string();
                    inner.state.send_modify(|s| {
                        s.is_loading = false;
                        s.error = Some(message.clone());
                    });
                }
                return Err(err);
            }
        };

        let detail = TicketDetail::hydrate(payload, inner.api.base_url());

        if inner.epoch.load(Ordering::SeqCst) != epoch {
            // Superseded by a newer open/close while fetching.
            return Ok(());
        }
        inner.state.send_modify(|s| {
            *s = ViewState {
                ticket: Some(detail),
                is_loading: false,
                error: None,
            };
        });

        let subscription = match inner
            .feed
            .subscribe(ticket_id, inner.token.as_deref())
            .await
        {
            Ok(subscription) => subscription,
            Err(err) => {
                if inner.epoch.load(Ordering::SeqCst) == epoch {
                    let message = err.to_string();
                    inner
                        .state
                        .send_modify(|s| s.error = Some(message.clone()));
                }
                return Err(err);
            }
        };

        if inner.epoch.load(Ordering::SeqCst) != epoch {
            subscription.guard.cancel();
            return Ok(());
        }

        let FeedSubscription { mut events, guard } = subscription;
        *inner.guard.lock().expect("guard lock poisoned") = Some(guard);

        let pump = self.inner.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if pump.epoch.load(Ordering::SeqCst) != epoch {
                    break;
                }
                match event {
                    FeedEvent::Message(payload) => {
                        let message = TicketMessage::from_payload(payload, pump.api.base_url());
                        pump.merge(message);
                    }
                    FeedEvent::Typing { sender } => {
                        let _ = pump.typing.send(Some(sender));
                    }
                }
            }
            log::debug!("feed pump for ticket {ticket_id} stopped");
        });

        Ok(())
    }

    /// Submits the given text plus every staged attachment as one message.
    ///
    /// Exactly one network call; a concurrent send is rejected. On success the
    /// acknowledged message is merged through the shared dedup path and the
    /// composer (draft and staged files) is cleared. On failure both are left
    /// untouched so the user can retry.
    pub async fn send_message(&self, content: &str) -> Result<(), ClientError> {
        let inner = &self.inner;
        let ticket_id = inner
            .state
            .borrow()
            .ticket
            .as_ref()
            .map(|t| t.id)
            .ok_or(ClientError::NotOpen)?;

        let files = {
            let mut composer = inner.composer.lock().expect("composer lock poisoned");
            composer.set_draft(content);
            if composer.is_empty() {
                return Err(ClientError::validation(
                    "a message needs text or at least one attachment",
                ));
            }
            composer.outgoing()
        };

        if inner
            .sending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ClientError::SendInFlight);
        }

        let result = match inner.scope {
            TicketScope::My => inner.api.send_my_message(ticket_id, content, &files).await,
            TicketScope::Admin => inner.api.send_message(ticket_id, content, &files).await,
        };
        inner.sending.store(false, Ordering::SeqCst);

        match result {
            Ok(payload) => {
                let message = TicketMessage::from_payload(payload, inner.api.base_url());
                inner.merge(message);
                inner
                    .composer
                    .lock()
                    .expect("composer lock poisoned")
                    .clear();
                inner.state.send_modify(|s| s.error = None);
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                inner
                    .state
                    .send_modify(|s| s.error = Some(message.clone()));
                Err(err)
            }
        }
    }

    /// Releases the push subscription, discards the aggregate and clears the
    /// composer. Safe to call repeatedly or without a prior `open`.
    pub fn close(&self) {
        let inner = &self.inner;
        inner.epoch.fetch_add(1, Ordering::SeqCst);
        drop(inner.guard.lock().expect("guard lock poisoned").take());
        inner.state.send_modify(|s| *s = ViewState::default());
        let _ = inner.typing.send(None);
        inner
            .composer
            .lock()
            .expect("composer lock poisoned")
            .clear();
    }

    pub fn snapshot(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    /// Transient typing notifications from other participants.
    pub fn subscribe_typing(&self) -> watch::Receiver<Option<String>> {
        self.inner.typing.subscribe()
    }

    // ----- composer passthrough -----

    pub fn set_draft(&self, text: &str) {
        self.inner
            .composer
            .lock()
            .expect("composer lock poisoned")
            .set_draft(text);
    }

    pub fn draft(&self) -> String {
        self.inner
            .composer
            .lock()
            .expect("composer lock poisoned")
            .draft()
            .to_string()
    }

    pub fn stage_attachment(&self, path: &Path) -> Result<u64, ClientError> {
        self.inner
            .composer
            .lock()
            .expect("composer lock poisoned")
            .stage_file(path)
    }

    pub fn stage_attachment_bytes(
        &self,
        name: &str,
        modified: Option<SystemTime>,
        data: Bytes,
    ) -> Result<u64, ClientError> {
        self.inner
            .composer
            .lock()
            .expect("composer lock poisoned")
            .stage_bytes(name, modified, data)
    }

    pub fn unstage_attachment(&self, id: u64) -> bool {
        self.inner
            .composer
            .lock()
            .expect("composer lock poisoned")
            .unstage(id)
    }

    pub fn staged_attachments(&self) -> Vec<StagedSummary> {
        self.inner
            .composer
            .lock()
            .expect("composer lock poisoned")
            .staged()
            .iter()
            .map(|s| StagedSummary {
                id: s.id,
                name: s.name.clone(),
                size: s.size,
                mime: s.mime.clone(),
                is_image: s.is_image(),
                preview: s.preview_path().map(Path::to_path_buf),
            })
            .collect()
    }
}

impl Inner {
    /// Folds one acknowledged/pushed message into the aggregate. Both the
    /// feed pump and the composer land here, so the dedup rule is enforced in
    /// exactly one place.
    fn merge(&self, message: TicketMessage) {
        self.state.send_if_modified(|s| {
            let Some(detail) = s.ticket.as_mut() else {
                return false;
            };
            if detail.id != message.ticket_id {
                log::debug!(
                    "ignoring message {} for ticket {} (viewing {})",
                    message.id,
                    message.ticket_id,
                    detail.id
                );
                return false;
            }
            apply_message(detail, message)
        });
    }
}

/// Append-and-dedup merge of one message into the aggregate. Returns `false`
/// (leaving the aggregate untouched) when the identity already exists.
fn apply_message(detail: &mut TicketDetail, message: TicketMessage) -> bool {
    if detail.messages.iter().any(|m| m.id == message.id) {
        log::debug!("discarding duplicate message {}", message.id);
        return false;
    }

    if message.author.id != 0
        && !detail
            .participants
            .iter()
            .any(|p| p.id == message.author.id)
    {
        detail.participants.push(message.author.clone());
    }

    projection::fold_attachments(&mut detail.attachments, &message.attachments);

    let event = projection::comment_event(&message);
    let out_of_order = detail
        .timeline
        .last()
        .is_some_and(|last| last.timestamp > event.timestamp);
    detail.timeline.push(event);
    if out_of_order {
        detail.timeline.sort_by_key(|e| e.timestamp);
    }

    if let Some(ts) = message.created_at {
        if detail.updated_at.is_none_or(|current| ts > current) {
            detail.updated_at = Some(ts);
        }
    }

    detail.messages.push(message);
    true
}
