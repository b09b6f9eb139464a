//! Persistence Gateway — the storage capability the feedback core depends on.
//!
//! Every write is a single-row operation; there are no cross-record transactions, so
//! callers sequence writes such that a crash leaves the feedback record uncalculated and
//! retryable.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::feedback::metrics::TargetType;
use crate::models::evaluation::EvaluationRecord;
use crate::models::feedback::{FeedbackPayload, FeedbackRecord};
use crate::models::user::{RelationInfo, User};

pub use postgres::PgGateway;

#[async_trait]
pub trait FeedbackGateway: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    /// Relations of `user_id` in both directions; `RelationInfo::user_id` is the counterpart.
    async fn relations_for(&self, user_id: Uuid) -> Result<Vec<RelationInfo>, AppError>;

    async fn insert_feedback(
        &self,
        user_id: Uuid,
        payload: &FeedbackPayload,
        at: DateTime<Utc>,
    ) -> Result<FeedbackRecord, AppError>;

    /// Most recent uncalculated record of `user_id` created at or after `since`.
    async fn find_open_feedback(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<FeedbackRecord>, AppError>;

    /// Replaces the payload of a record that is still uncalculated.
    async fn update_feedback_data(
        &self,
        feedback_id: Uuid,
        payload: &FeedbackPayload,
    ) -> Result<(), AppError>;

    async fn mark_calculated(&self, feedback_id: Uuid) -> Result<(), AppError>;

    async fn insert_evaluation(&self, evaluation: &EvaluationRecord) -> Result<(), AppError>;

    async fn evaluations_by_feedback(
        &self,
        feedback_id: Uuid,
    ) -> Result<Vec<EvaluationRecord>, AppError>;

    async fn evaluations_by_target(
        &self,
        target_user_id: Uuid,
    ) -> Result<Vec<EvaluationRecord>, AppError>;

    async fn evaluations_by_type(
        &self,
        target_type: TargetType,
    ) -> Result<Vec<EvaluationRecord>, AppError>;
}
