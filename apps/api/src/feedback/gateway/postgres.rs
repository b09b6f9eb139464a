use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::feedback::gateway::FeedbackGateway;
use crate::feedback::metrics::{MetricScore, Metrics, SentimentTerm, TargetType};
use crate::models::evaluation::EvaluationRecord;
use crate::models::feedback::{FeedbackPayload, FeedbackRecord};
use crate::models::user::{RelationInfo, User};

const EVALUATION_COLUMNS: &str = r#"
    id, feedback_id, target_type, target_user_id, target_user_name, author_user_id, created_at,
    company_fulfillment, company_fulfillment_weight,
    company_autonomy, company_autonomy_weight,
    company_growth_opportunities, company_growth_opportunities_weight,
    company_workload, company_workload_weight,
    company_stress, company_stress_weight,
    company_work_life_balance, company_work_life_balance_weight,
    person_recognition, person_recognition_weight,
    person_sympathy, person_sympathy_weight,
    person_trust, person_trust_weight,
    person_pro_support, person_pro_support_weight,
    person_growth_support, person_growth_support_weight,
    sentiment_data
"#;

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    company_id: i64,
}

#[derive(Debug, FromRow)]
struct RelationRow {
    user_id: Uuid,
    /// `None` when the counterpart is missing from `users`.
    user_name: Option<String>,
    relationship: String,
}

#[derive(Debug, FromRow)]
struct FeedbackRow {
    id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    raw_data: Value,
    is_calculated: bool,
}

impl TryFrom<FeedbackRow> for FeedbackRecord {
    type Error = AppError;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let raw_data: FeedbackPayload = serde_json::from_value(row.raw_data).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("feedback {} has unreadable raw_data: {e}", row.id))
        })?;
        Ok(FeedbackRecord {
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
            raw_data,
            is_calculated: row.is_calculated,
        })
    }
}

/// One column per metric score and weight, mirroring the `evaluations` table.
#[derive(Debug, FromRow)]
struct EvaluationRow {
    id: Uuid,
    feedback_id: Uuid,
    target_type: i16,
    target_user_id: Option<Uuid>,
    target_user_name: String,
    author_user_id: Uuid,
    created_at: DateTime<Utc>,
    company_fulfillment: i64,
    company_fulfillment_weight: f64,
    company_autonomy: i64,
    company_autonomy_weight: f64,
    company_growth_opportunities: i64,
    company_growth_opportunities_weight: f64,
    company_workload: i64,
    company_workload_weight: f64,
    company_stress: i64,
    company_stress_weight: f64,
    company_work_life_balance: i64,
    company_work_life_balance_weight: f64,
    person_recognition: i64,
    person_recognition_weight: f64,
    person_sympathy: i64,
    person_sympathy_weight: f64,
    person_trust: i64,
    person_trust_weight: f64,
    person_pro_support: i64,
    person_pro_support_weight: f64,
    person_growth_support: i64,
    person_growth_support_weight: f64,
    sentiment_data: Value,
}

impl TryFrom<EvaluationRow> for EvaluationRecord {
    type Error = AppError;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        let target_type = TargetType::from_code(i64::from(row.target_type)).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "evaluation {} has unknown target type {}",
                row.id,
                row.target_type
            ))
        })?;
        let sentiment: Vec<SentimentTerm> =
            serde_json::from_value(row.sentiment_data).map_err(|e| {
                AppError::Internal(anyhow::anyhow!(
                    "evaluation {} has unreadable sentiment_data: {e}",
                    row.id
                ))
            })?;

        Ok(EvaluationRecord {
            id: row.id,
            feedback_id: row.feedback_id,
            target_type,
            target_user_id: row.target_user_id,
            target_user_name: row.target_user_name,
            author_user_id: row.author_user_id,
            created_at: row.created_at,
            metrics: Metrics {
                fulfillment: MetricScore::new(row.company_fulfillment, row.company_fulfillment_weight),
                autonomy: MetricScore::new(row.company_autonomy, row.company_autonomy_weight),
                growth_opportunities: MetricScore::new(
                    row.company_growth_opportunities,
                    row.company_growth_opportunities_weight,
                ),
                workload: MetricScore::new(row.company_workload, row.company_workload_weight),
                stress: MetricScore::new(row.company_stress, row.company_stress_weight),
                work_life_balance: MetricScore::new(
                    row.company_work_life_balance,
                    row.company_work_life_balance_weight,
                ),
                recognition: MetricScore::new(row.person_recognition, row.person_recognition_weight),
                sympathy: MetricScore::new(row.person_sympathy, row.person_sympathy_weight),
                trust: MetricScore::new(row.person_trust, row.person_trust_weight),
                pro_support: MetricScore::new(row.person_pro_support, row.person_pro_support_weight),
                growth_support: MetricScore::new(
                    row.person_growth_support,
                    row.person_growth_support_weight,
                ),
            },
            sentiment,
        })
    }
}

/// `FeedbackGateway` over the Postgres schema in `migrations/`.
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_evaluations(
        &self,
        filter: &str,
        bind: EvaluationFilter,
    ) -> Result<Vec<EvaluationRecord>, AppError> {
        let sql = format!(
            "SELECT {EVALUATION_COLUMNS} FROM evaluations WHERE {filter} ORDER BY created_at, id"
        );
        let query = sqlx::query_as::<_, EvaluationRow>(&sql);
        let rows = match bind {
            EvaluationFilter::Id(id) => query.bind(id),
            EvaluationFilter::TargetType(code) => query.bind(code),
        }
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(EvaluationRecord::try_from).collect()
    }
}

enum EvaluationFilter {
    Id(Uuid),
    TargetType(i16),
}

#[async_trait]
impl FeedbackGateway for PgGateway {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, name, company_id FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| User {
            id: r.id,
            name: r.name,
            company_id: r.company_id,
        }))
    }

    async fn relations_for(&self, user_id: Uuid) -> Result<Vec<RelationInfo>, AppError> {
        let rows: Vec<RelationRow> = sqlx::query_as(
            r#"
            SELECT r.user_id2 AS user_id, u.name AS user_name, r.relationship
            FROM user_relations r
            LEFT JOIN users u ON u.id = r.user_id2
            WHERE r.user_id1 = $1
            UNION ALL
            SELECT r.user_id1 AS user_id, u.name AS user_name, r.relationship
            FROM user_relations r
            LEFT JOIN users u ON u.id = r.user_id1
            WHERE r.user_id2 = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<RelationInfo, AppError> {
                let user_name = r.user_name.ok_or_else(|| {
                    AppError::TargetNotFound(format!(
                        "Relation of user {user_id} references missing user {}",
                        r.user_id
                    ))
                })?;
                Ok(RelationInfo {
                    user_id: r.user_id,
                    user_name,
                    relationship: r.relationship,
                })
            })
            .collect()
    }

    async fn insert_feedback(
        &self,
        user_id: Uuid,
        payload: &FeedbackPayload,
        at: DateTime<Utc>,
    ) -> Result<FeedbackRecord, AppError> {
        let id = Uuid::new_v4();
        let raw_data = serde_json::to_value(payload).map_err(anyhow::Error::from)?;
        sqlx::query(
            "INSERT INTO feedback (id, user_id, created_at, raw_data, is_calculated) \
             VALUES ($1, $2, $3, $4, FALSE)",
        )
        .bind(id)
        .bind(user_id)
        .bind(at)
        .bind(&raw_data)
        .execute(&self.pool)
        .await?;

        info!("Inserted feedback {id} for user {user_id}");
        Ok(FeedbackRecord {
            id,
            user_id,
            created_at: at,
            raw_data: payload.clone(),
            is_calculated: false,
        })
    }

    async fn find_open_feedback(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<FeedbackRecord>, AppError> {
        let row: Option<FeedbackRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, created_at, raw_data, is_calculated
            FROM feedback
            WHERE user_id = $1 AND created_at >= $2 AND is_calculated = FALSE
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;
        row.map(FeedbackRecord::try_from).transpose()
    }

    async fn update_feedback_data(
        &self,
        feedback_id: Uuid,
        payload: &FeedbackPayload,
    ) -> Result<(), AppError> {
        let raw_data = serde_json::to_value(payload).map_err(anyhow::Error::from)?;
        let result = sqlx::query(
            "UPDATE feedback SET raw_data = $1 WHERE id = $2 AND is_calculated = FALSE",
        )
        .bind(&raw_data)
        .bind(feedback_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Open feedback {feedback_id} not found"
            )));
        }
        Ok(())
    }

    async fn mark_calculated(&self, feedback_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE feedback SET is_calculated = TRUE WHERE id = $1")
            .bind(feedback_id)
            .execute(&self.pool)
            .await?;
        info!("Feedback {feedback_id} marked as calculated");
        Ok(())
    }

    async fn insert_evaluation(&self, e: &EvaluationRecord) -> Result<(), AppError> {
        let sentiment = serde_json::to_value(&e.sentiment).map_err(anyhow::Error::from)?;
        let m = &e.metrics;
        sqlx::query(&format!(
            "INSERT INTO evaluations ({EVALUATION_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
              $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30)"
        ))
        .bind(e.id)
        .bind(e.feedback_id)
        .bind(e.target_type.code())
        .bind(e.target_user_id)
        .bind(&e.target_user_name)
        .bind(e.author_user_id)
        .bind(e.created_at)
        .bind(m.fulfillment.score)
        .bind(m.fulfillment.weight)
        .bind(m.autonomy.score)
        .bind(m.autonomy.weight)
        .bind(m.growth_opportunities.score)
        .bind(m.growth_opportunities.weight)
        .bind(m.workload.score)
        .bind(m.workload.weight)
        .bind(m.stress.score)
        .bind(m.stress.weight)
        .bind(m.work_life_balance.score)
        .bind(m.work_life_balance.weight)
        .bind(m.recognition.score)
        .bind(m.recognition.weight)
        .bind(m.sympathy.score)
        .bind(m.sympathy.weight)
        .bind(m.trust.score)
        .bind(m.trust.weight)
        .bind(m.pro_support.score)
        .bind(m.pro_support.weight)
        .bind(m.growth_support.score)
        .bind(m.growth_support.weight)
        .bind(&sentiment)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn evaluations_by_feedback(
        &self,
        feedback_id: Uuid,
    ) -> Result<Vec<EvaluationRecord>, AppError> {
        self.fetch_evaluations("feedback_id = $1", EvaluationFilter::Id(feedback_id))
            .await
    }

    async fn evaluations_by_target(
        &self,
        target_user_id: Uuid,
    ) -> Result<Vec<EvaluationRecord>, AppError> {
        self.fetch_evaluations("target_user_id = $1", EvaluationFilter::Id(target_user_id))
            .await
    }

    async fn evaluations_by_type(
        &self,
        target_type: TargetType,
    ) -> Result<Vec<EvaluationRecord>, AppError> {
        self.fetch_evaluations(
            "target_type = $1",
            EvaluationFilter::TargetType(target_type.code()),
        )
        .await
    }
}
