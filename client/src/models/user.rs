use serde::{Deserialize, Serialize};

/// Light user representation embedded in tickets and messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

impl UserSummary {
    /// Placeholder author for payloads whose user fields were stripped.
    pub fn unknown() -> Self {
        Self {
            id: 0,
            username: "unknown".to_string(),
        }
    }
}
