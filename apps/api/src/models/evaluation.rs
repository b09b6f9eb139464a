use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::feedback::metrics::{Metrics, SentimentTerm, TargetType};

/// A stored, immutable evaluation of one target derived from exactly one feedback record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationRecord {
    pub id: Uuid,
    pub feedback_id: Uuid,
    pub target_type: TargetType,
    /// `None` for company evaluations.
    pub target_user_id: Option<Uuid>,
    pub target_user_name: String,
    pub author_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub metrics: Metrics,
    pub sentiment: Vec<SentimentTerm>,
}
