pub mod attachment;
pub mod message;
pub mod ticket;
pub mod timeline;
pub mod user;

pub use attachment::{AttachmentPayload, TicketAttachment};
pub use message::{DeliveryStatus, MessagePayload, TicketMessage};
pub use ticket::{
    TicketDetail, TicketDetailPayload, TicketListQuery, TicketPage, TicketPriority, TicketStats,
    TicketStatus, TicketSummary,
};
pub use timeline::{TicketTimelineEvent, TimelineKind};
pub use user::UserSummary;
