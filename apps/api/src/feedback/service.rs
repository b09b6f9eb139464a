//! Orchestrates the feedback flow over the session store, the gateway and the extractor.
//!
//! Evaluate runs: close session → upsert feedback → extract → validate → insert
//! evaluations → mark calculated. There is no transaction around it. If anything fails
//! before the last step the record stays uncalculated and the next `evaluate` re-extracts
//! from the stored payload, possibly storing a second set of evaluations. Aggregation
//! tolerates that. Evaluate calls for one user never overlap.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::feedback::aggregate::{build_profile, EvaluationProfile, ProfileTarget};
use crate::feedback::extraction::{EvaluationExtractor, ExtractionRequest};
use crate::feedback::gateway::FeedbackGateway;
use crate::feedback::metrics::TargetType;
use crate::feedback::prompts::{continue_prompt, initiate_prompt};
use crate::feedback::session::{SessionError, SessionStore};
use crate::feedback::validation::{validate_candidate, ValidatedEvaluation, ValidationIssue};
use crate::models::evaluation::EvaluationRecord;
use crate::models::feedback::{FeedbackPayload, FeedbackRecord};
use crate::models::user::RelationInfo;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub company_name: String,
    pub session_ttl: Duration,
    pub feedback_dedup_window: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReply {
    pub user_id: Uuid,
    pub prompt: String,
    /// The open feedback record holding the draft, once one exists.
    pub feedback_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub user_id: Uuid,
    pub open: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DroppedCandidate {
    pub index: usize,
    pub reasons: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub feedback_id: Uuid,
    pub stored: Vec<EvaluationRecord>,
    pub dropped: Vec<DroppedCandidate>,
}

pub struct FeedbackService {
    gateway: Arc<dyn FeedbackGateway>,
    extractor: Arc<dyn EvaluationExtractor>,
    sessions: SessionStore,
    company_name: String,
    dedup_window: Duration,
}

impl FeedbackService {
    pub fn new(
        gateway: Arc<dyn FeedbackGateway>,
        extractor: Arc<dyn EvaluationExtractor>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            gateway,
            extractor,
            sessions: SessionStore::new(settings.session_ttl),
            company_name: settings.company_name,
            dedup_window: settings.feedback_dedup_window,
        }
    }

    pub async fn initiate_for(&self, user_id: Uuid) -> Result<SessionReply, AppError> {
        self.initiate_at(user_id, Utc::now()).await
    }

    pub async fn continue_feedback(
        &self,
        user_id: Uuid,
        text: &str,
    ) -> Result<SessionReply, AppError> {
        self.continue_at(user_id, text, Utc::now()).await
    }

    pub async fn evaluate(&self, user_id: Uuid) -> Result<EvaluationSummary, AppError> {
        self.evaluate_at(user_id, Utc::now()).await
    }

    pub async fn session_open(&self, user_id: Uuid) -> bool {
        self.sessions.is_open(user_id, Utc::now()).await
    }

    /// Best-effort housekeeping; see `SessionStore::sweep_expired`.
    pub async fn sweep_expired_sessions(&self) -> usize {
        self.sessions.sweep_expired(Utc::now()).await
    }

    pub async fn profile_for_user(&self, user_id: Uuid) -> Result<EvaluationProfile, AppError> {
        let user = self
            .gateway
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::TargetNotFound(format!("User {user_id} not found")))?;
        let evaluations = self.gateway.evaluations_by_target(user_id).await?;
        Ok(build_profile(
            ProfileTarget::Person {
                user_id,
                user_name: user.name,
            },
            &evaluations,
        ))
    }

    pub async fn company_profile(&self) -> Result<EvaluationProfile, AppError> {
        let evaluations = self.gateway.evaluations_by_type(TargetType::Company).await?;
        Ok(build_profile(ProfileTarget::Company, &evaluations))
    }

    pub async fn evaluations_for_feedback(
        &self,
        feedback_id: Uuid,
    ) -> Result<Vec<EvaluationRecord>, AppError> {
        let evaluations = self.gateway.evaluations_by_feedback(feedback_id).await?;
        if evaluations.is_empty() {
            return Err(AppError::NotFound(format!(
                "No evaluations for feedback {feedback_id}"
            )));
        }
        Ok(evaluations)
    }

    async fn initiate_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<SessionReply, AppError> {
        let user = self
            .gateway
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::TargetNotFound(format!("User {user_id} not found")))?;

        let mut relations: Vec<RelationInfo> = Vec::new();
        for relation in self.gateway.relations_for(user_id).await? {
            if relation.user_id == user_id {
                warn!("Ignoring self-relation of user {user_id}");
                continue;
            }
            if relations.iter().any(|r| r.user_id == relation.user_id) {
                continue;
            }
            relations.push(relation);
        }

        let prompt = initiate_prompt(&user.name, &self.company_name, &relations);
        self.sessions
            .initiate(user_id, &user.name, relations, now)
            .await?;

        Ok(SessionReply {
            user_id,
            prompt,
            feedback_id: None,
        })
    }

    async fn continue_at(
        &self,
        user_id: Uuid,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionReply, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("Feedback message is empty".to_string()));
        }

        // Held until the draft is stored so the same user's turns persist in order.
        // The turn is recorded only after the draft write succeeds.
        let text = text.trim();
        let mut session = self.sessions.checkout(user_id, now).await?;
        let record = self
            .save_feedback_draft(user_id, &session.payload_with(text), now)
            .await?;
        session.record(text, now);
        let prompt = continue_prompt(&session.relations, &session.accumulated_text());
        drop(session);

        Ok(SessionReply {
            user_id,
            prompt,
            feedback_id: Some(record.id),
        })
    }

    /// Writes `payload` into the user's open record inside the dedup window, or starts a
    /// new record when there is none.
    async fn save_feedback_draft(
        &self,
        user_id: Uuid,
        payload: &FeedbackPayload,
        now: DateTime<Utc>,
    ) -> Result<FeedbackRecord, AppError> {
        let since = now - self.dedup_window;
        match self.gateway.find_open_feedback(user_id, since).await? {
            Some(mut record) => {
                self.gateway.update_feedback_data(record.id, payload).await?;
                record.raw_data = payload.clone();
                Ok(record)
            }
            None => self.gateway.insert_feedback(user_id, payload, now).await,
        }
    }

    async fn evaluate_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<EvaluationSummary, AppError> {
        // A second evaluate for this user waits here, then finds the record calculated.
        let _evaluating = self.sessions.evaluation_guard(user_id).await;

        let (feedback, author_name) = match self.sessions.close(user_id, now).await {
            Ok(session) => {
                if session.messages.is_empty() {
                    return Err(AppError::Validation(
                        "No feedback was given in this session".to_string(),
                    ));
                }
                let record = self.save_feedback_draft(user_id, &session.payload(), now).await?;
                (record, session.user_name)
            }
            Err(SessionError::NoOpenSession(_)) => {
                let record = self
                    .gateway
                    .find_open_feedback(user_id, now - self.dedup_window)
                    .await?
                    .ok_or(AppError::NoOpenSession(user_id))?;
                let author = self
                    .gateway
                    .find_user(user_id)
                    .await?
                    .ok_or_else(|| AppError::TargetNotFound(format!("User {user_id} not found")))?;
                info!("Retrying extraction of open feedback {} for user {user_id}", record.id);
                (record, author.name)
            }
            Err(e) => return Err(e.into()),
        };

        let text = feedback.raw_data.accumulated_text();
        let candidates = self
            .extractor
            .extract(&ExtractionRequest {
                author_name: &author_name,
                company_name: &self.company_name,
                relations: &feedback.raw_data.relations,
                text: &text,
            })
            .await?;

        let mut accepted = Vec::new();
        let mut dropped = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            let outcome = match validate_candidate(candidate) {
                Ok(valid) => self.resolve_target(valid, user_id).await?,
                Err(issues) => Err(issues),
            };
            match outcome {
                Ok(record) => accepted.push(record),
                Err(reasons) => {
                    warn!(
                        "Dropped candidate {index} of feedback {}: {:?}",
                        feedback.id, reasons
                    );
                    dropped.push(DroppedCandidate { index, reasons });
                }
            }
        }

        if accepted.is_empty() {
            warn!(
                "Feedback {} produced no valid evaluations ({} candidate(s))",
                feedback.id,
                candidates.len()
            );
            return Err(AppError::NoEvaluationsProduced {
                feedback_id: feedback.id,
                dropped: dropped.len(),
            });
        }

        let mut stored = Vec::with_capacity(accepted.len());
        for target in accepted {
            let record = EvaluationRecord {
                id: Uuid::new_v4(),
                feedback_id: feedback.id,
                target_type: target.target_type,
                target_user_id: target.subject_user_id,
                target_user_name: target.subject_name,
                author_user_id: user_id,
                created_at: now,
                metrics: target.metrics,
                sentiment: target.sentiment,
            };
            self.gateway.insert_evaluation(&record).await?;
            stored.push(record);
        }

        self.gateway.mark_calculated(feedback.id).await?;
        info!(
            "Feedback {} evaluated: {} stored, {} dropped",
            feedback.id,
            stored.len(),
            dropped.len()
        );

        Ok(EvaluationSummary {
            feedback_id: feedback.id,
            stored,
            dropped,
        })
    }

    /// Checks a person subject against the directory and fills in display names.
    /// Gateway failures are fatal; an unknown subject only drops the candidate.
    async fn resolve_target(
        &self,
        mut valid: ValidatedEvaluation,
        author_id: Uuid,
    ) -> Result<Result<ValidatedEvaluation, Vec<ValidationIssue>>, AppError> {
        match (valid.target_type, valid.subject_user_id) {
            (TargetType::Person, Some(subject_id)) => {
                if subject_id == author_id {
                    return Ok(Err(vec![ValidationIssue {
                        field: "SubjectUserID".to_string(),
                        reason: "author cannot evaluate themselves".to_string(),
                    }]));
                }
                match self.gateway.find_user(subject_id).await? {
                    Some(subject) => {
                        valid.subject_name = subject.name;
                        Ok(Ok(valid))
                    }
                    None => Ok(Err(vec![ValidationIssue {
                        field: "SubjectUserID".to_string(),
                        reason: format!("target user {subject_id} not found"),
                    }])),
                }
            }
            (TargetType::Person, None) => Ok(Err(vec![ValidationIssue {
                field: "SubjectUserID".to_string(),
                reason: "missing".to_string(),
            }])),
            (TargetType::Company, _) => {
                if valid.subject_name.is_empty() {
                    valid.subject_name = self.company_name.clone();
                }
                Ok(Ok(valid))
            }
        }
    }
}
