use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub from_id: u64,
    pub to_id: u64,
    /// Cleared when the recipient deletes the message; the sender still sees it.
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

fn default_visible() -> bool {
    true
}
