//! Wire contract with the structured-extraction capability.
//!
//! The extractor is handed a tool whose single array parameter `evaluations` describes one
//! object per subject. Field names are fixed: `EvaluationTargetType`, `SubjectUserID`,
//! `SubjectName`, `<Scope>_<Metric>` / `<Scope>_<Metric>Weight` for the 11 metrics, and
//! `SentimentData`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::feedback::metrics::Metric;

pub const FIELD_TARGET_TYPE: &str = "EvaluationTargetType";
pub const FIELD_SUBJECT_USER_ID: &str = "SubjectUserID";
pub const FIELD_SUBJECT_NAME: &str = "SubjectName";
pub const FIELD_SENTIMENT: &str = "SentimentData";

/// One raw evaluation object as returned by the extractor, before validation.
/// Kept as an untyped map so that a malformed field rejects only its own candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CandidateEvaluation(pub Map<String, Value>);

impl CandidateEvaluation {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }
}

impl From<Value> for CandidateEvaluation {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => CandidateEvaluation(map),
            _ => CandidateEvaluation::default(),
        }
    }
}

/// Top-level tool input: `{"evaluations": [...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionOutput {
    #[serde(default)]
    pub evaluations: Vec<Value>,
}

impl ExtractionOutput {
    pub fn into_candidates(self) -> Vec<CandidateEvaluation> {
        self.evaluations
            .into_iter()
            .map(CandidateEvaluation::from)
            .collect()
    }
}

/// Names of the fields every candidate must carry.
pub fn required_fields() -> Vec<String> {
    let mut fields = vec![
        FIELD_TARGET_TYPE.to_string(),
        FIELD_SUBJECT_USER_ID.to_string(),
        FIELD_SUBJECT_NAME.to_string(),
    ];
    for metric in Metric::ALL {
        fields.push(metric.score_key());
        fields.push(metric.weight_key());
    }
    fields
}

/// JSON Schema of the extraction tool input.
pub fn evaluation_tool_schema() -> Value {
    let mut properties = Map::new();
    properties.insert(
        FIELD_TARGET_TYPE.to_string(),
        json!({"type": "integer", "enum": [1, 2], "description": "Type of target: 1=Company 2=Person"}),
    );
    properties.insert(
        FIELD_SUBJECT_USER_ID.to_string(),
        json!({"type": "string", "description": "Person ID (empty for the company)"}),
    );
    properties.insert(
        FIELD_SUBJECT_NAME.to_string(),
        json!({"type": "string", "description": "Person name, or the company name"}),
    );
    for metric in Metric::ALL {
        properties.insert(
            metric.score_key(),
            json!({"type": "integer", "description": format!("Score for {}", metric.name())}),
        );
        properties.insert(
            metric.weight_key(),
            json!({
                "type": "number",
                "minimum": 0,
                "maximum": 1,
                "description": format!("Weight for the {} score", metric.name())
            }),
        );
    }
    properties.insert(
        FIELD_SENTIMENT.to_string(),
        json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "word": {"type": "string", "description": "The word of sentiment"},
                    "weight": {"type": "number", "minimum": 0, "maximum": 1,
                               "description": "decimal: 0 is negative, 1 is positive"},
                    "count": {"type": "integer", "minimum": 1, "description": "number of appearance"}
                },
                "required": ["word", "weight", "count"]
            }
        }),
    );

    json!({
        "type": "object",
        "properties": {
            "evaluations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": Value::Object(properties),
                    "required": required_fields()
                }
            }
        },
        "required": ["evaluations"]
    })
}
