//! Client-side view model for the ClubHub ticket discussion screen.
//!
//! The hosting view opens a ticket, renders from the reactive
//! [`ViewState`](discussion::ViewState) snapshot, stages attachments and sends
//! messages through [`TicketDiscussion`](discussion::TicketDiscussion), and
//! closes the handle when the screen goes away. Everything else (live comment
//! delivery, identity-based merging, gallery/timeline derivation) happens
//! behind that handle.

pub mod api;
pub mod composer;
pub mod discussion;
pub mod error;
pub mod models;
pub mod projection;
pub mod ws;

pub use discussion::{TicketDiscussion, TicketScope, ViewState};
pub use error::ClientError;
