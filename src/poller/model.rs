use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 通知概要，通知条目本身保持服务端原样
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationSummary {
    pub unread_count: u64,
    pub items: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl NotificationSummary {
    pub fn is_empty(&self) -> bool {
        self.unread_count == 0 && self.items.is_empty()
    }
}
