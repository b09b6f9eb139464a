//! In-memory `FeedbackGateway` used by the service and handler tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::feedback::gateway::FeedbackGateway;
use crate::feedback::metrics::TargetType;
use crate::models::evaluation::EvaluationRecord;
use crate::models::feedback::{FeedbackPayload, FeedbackRecord};
use crate::models::user::{RelationInfo, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    /// Directed `(user_id1, user_id2, relationship)` rows.
    relations: Vec<(Uuid, Uuid, String)>,
    feedback: Vec<FeedbackRecord>,
    evaluations: Vec<EvaluationRecord>,
}

#[derive(Default)]
pub struct MemoryGateway {
    tables: RwLock<Tables>,
    /// When set, `mark_calculated` fails as if the process died before the final write.
    fail_mark_calculated: AtomicBool,
    /// When set, feedback inserts and updates fail as if the database were unreachable.
    fail_feedback_writes: AtomicBool,
}

impl MemoryGateway {
    pub async fn add_user(&self, name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            company_id: 0,
        };
        self.tables.write().await.users.push(user.clone());
        user
    }

    pub async fn relate(&self, a: Uuid, b: Uuid, relationship: &str) {
        self.tables
            .write()
            .await
            .relations
            .push((a, b, relationship.to_string()));
    }

    pub async fn feedback(&self) -> Vec<FeedbackRecord> {
        self.tables.read().await.feedback.clone()
    }

    pub async fn evaluations(&self) -> Vec<EvaluationRecord> {
        self.tables.read().await.evaluations.clone()
    }

    pub fn fail_mark_calculated(&self, fail: bool) {
        self.fail_mark_calculated.store(fail, Ordering::SeqCst);
    }

    pub fn fail_feedback_writes(&self, fail: bool) {
        self.fail_feedback_writes.store(fail, Ordering::SeqCst);
    }

    fn check_feedback_writes(&self) -> Result<(), AppError> {
        if self.fail_feedback_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("storage unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedbackGateway for MemoryGateway {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn relations_for(&self, user_id: Uuid) -> Result<Vec<RelationInfo>, AppError> {
        let tables = self.tables.read().await;
        let name_of = |id: Uuid| tables.users.iter().find(|u| u.id == id).map(|u| u.name.clone());

        let mut out = Vec::new();
        for (a, b, relationship) in &tables.relations {
            let other = if *a == user_id {
                *b
            } else if *b == user_id {
                *a
            } else {
                continue;
            };
            let user_name = name_of(other).ok_or_else(|| {
                AppError::TargetNotFound(format!(
                    "Relation of user {user_id} references missing user {other}"
                ))
            })?;
            out.push(RelationInfo {
                user_id: other,
                user_name,
                relationship: relationship.clone(),
            });
        }
        Ok(out)
    }

    async fn insert_feedback(
        &self,
        user_id: Uuid,
        payload: &FeedbackPayload,
        at: DateTime<Utc>,
    ) -> Result<FeedbackRecord, AppError> {
        self.check_feedback_writes()?;
        let record = FeedbackRecord {
            id: Uuid::new_v4(),
            user_id,
            created_at: at,
            raw_data: payload.clone(),
            is_calculated: false,
        };
        self.tables.write().await.feedback.push(record.clone());
        Ok(record)
    }

    async fn find_open_feedback(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<FeedbackRecord>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .feedback
            .iter()
            .filter(|f| f.user_id == user_id && !f.is_calculated && f.created_at >= since)
            .max_by_key(|f| f.created_at)
            .cloned())
    }

    async fn update_feedback_data(
        &self,
        feedback_id: Uuid,
        payload: &FeedbackPayload,
    ) -> Result<(), AppError> {
        self.check_feedback_writes()?;
        let mut tables = self.tables.write().await;
        let record = tables
            .feedback
            .iter_mut()
            .find(|f| f.id == feedback_id && !f.is_calculated)
            .ok_or_else(|| AppError::NotFound(format!("Open feedback {feedback_id} not found")))?;
        record.raw_data = payload.clone();
        Ok(())
    }

    async fn mark_calculated(&self, feedback_id: Uuid) -> Result<(), AppError> {
        if self.fail_mark_calculated.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("storage unavailable")));
        }
        let mut tables = self.tables.write().await;
        if let Some(record) = tables.feedback.iter_mut().find(|f| f.id == feedback_id) {
            record.is_calculated = true;
        }
        Ok(())
    }

    async fn insert_evaluation(&self, evaluation: &EvaluationRecord) -> Result<(), AppError> {
        self.tables.write().await.evaluations.push(evaluation.clone());
        Ok(())
    }

    async fn evaluations_by_feedback(
        &self,
        feedback_id: Uuid,
    ) -> Result<Vec<EvaluationRecord>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .evaluations
            .iter()
            .filter(|e| e.feedback_id == feedback_id)
            .cloned()
            .collect())
    }

    async fn evaluations_by_target(
        &self,
        target_user_id: Uuid,
    ) -> Result<Vec<EvaluationRecord>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .evaluations
            .iter()
            .filter(|e| e.target_user_id == Some(target_user_id))
            .cloned()
            .collect())
    }

    async fn evaluations_by_type(
        &self,
        target_type: TargetType,
    ) -> Result<Vec<EvaluationRecord>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .evaluations
            .iter()
            .filter(|e| e.target_type == target_type)
            .cloned()
            .collect())
    }
}
