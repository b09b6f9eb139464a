use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::RelationInfo;

/// The opaque body of a feedback record: everything the author said, plus the relation
/// snapshot the session was opened with so a retried extraction sees the same subjects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedbackPayload {
    pub relations: Vec<RelationInfo>,
    pub messages: Vec<String>,
}

impl FeedbackPayload {
    pub fn accumulated_text(&self) -> String {
        self.messages.join("\n")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub raw_data: FeedbackPayload,
    pub is_calculated: bool,
}
