//! Extraction Adapter — hands accumulated feedback text to a structured-extraction
//! capability and returns raw candidates. It performs no persistence and is not assumed
//! to be deterministic; every candidate is validated by the caller.
//!
//! Default backend: `LlmExtractor` (Claude, forced tool call against the fixed schema).
//! `FeedbackService` holds an `Arc<dyn EvaluationExtractor>`.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::feedback::prompts::{
    build_extraction_prompt, EXTRACTION_SYSTEM, EXTRACTION_TOOL_DESCRIPTION, EXTRACTION_TOOL_NAME,
};
use crate::feedback::schema::{evaluation_tool_schema, CandidateEvaluation, ExtractionOutput};
use crate::llm_client::{LlmClient, ToolSpec};
use crate::models::user::RelationInfo;

#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    pub author_name: &'a str,
    pub company_name: &'a str,
    pub relations: &'a [RelationInfo],
    pub text: &'a str,
}

#[async_trait]
pub trait EvaluationExtractor: Send + Sync {
    async fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Vec<CandidateEvaluation>, AppError>;
}

pub fn extraction_tool() -> ToolSpec {
    ToolSpec {
        name: EXTRACTION_TOOL_NAME.to_string(),
        description: EXTRACTION_TOOL_DESCRIPTION.to_string(),
        input_schema: evaluation_tool_schema(),
    }
}

pub struct LlmExtractor {
    llm: LlmClient,
    tool: ToolSpec,
}

impl LlmExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            tool: extraction_tool(),
        }
    }
}

#[async_trait]
impl EvaluationExtractor for LlmExtractor {
    async fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Vec<CandidateEvaluation>, AppError> {
        let prompt = build_extraction_prompt(
            request.author_name,
            request.company_name,
            request.relations,
            request.text,
        );
        let output: ExtractionOutput = self
            .llm
            .call_tool(&prompt, EXTRACTION_SYSTEM, &self.tool)
            .await
            .map_err(|e| AppError::Llm(format!("Failed to extract evaluations: {e}")))?;
        Ok(output.into_candidates())
    }
}

#[cfg(test)]
pub mod scripted {
    use std::collections::VecDeque;
    use std::time::Duration;

    use serde_json::Value;
    use tokio::sync::Mutex;

    use super::*;

    /// Replays canned extractor outputs in order and records the text it was given.
    #[derive(Default)]
    pub struct ScriptedExtractor {
        replies: Mutex<VecDeque<Vec<Value>>>,
        pub seen: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl ScriptedExtractor {
        /// Every call sleeps for `delay` before answering.
        pub fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        pub async fn push(&self, candidates: Vec<Value>) {
            self.replies.lock().await.push_back(candidates);
        }
    }

    #[async_trait]
    impl EvaluationExtractor for ScriptedExtractor {
        async fn extract(
            &self,
            request: &ExtractionRequest<'_>,
        ) -> Result<Vec<CandidateEvaluation>, AppError> {
            self.seen.lock().await.push(request.text.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = self.replies.lock().await.pop_front().ok_or_else(|| {
                AppError::Llm("scripted extractor has no reply left".to_string())
            })?;
            Ok(reply.into_iter().map(CandidateEvaluation::from).collect())
        }
    }
}
