use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::feedback::metrics::{Metric, MetricScore, Metrics, SentimentTerm, TargetType};
use crate::feedback::schema::{
    CandidateEvaluation, FIELD_SENTIMENT, FIELD_SUBJECT_NAME, FIELD_SUBJECT_USER_ID,
    FIELD_TARGET_TYPE,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationIssue {
    pub field: String,
    pub reason: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A candidate that passed every structural check. Whether a person subject actually
/// exists is decided later against the directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEvaluation {
    pub target_type: TargetType,
    /// Always `Some` for `Person`, always `None` for `Company`.
    pub subject_user_id: Option<Uuid>,
    pub subject_name: String,
    pub metrics: Metrics,
    pub sentiment: Vec<SentimentTerm>,
}

/// Validates one extracted candidate.
///
/// PASS requires:
/// - `EvaluationTargetType` present and one of 1 (Company) / 2 (Person)
/// - `SubjectUserID` and `SubjectName` present; for a Person the ID must be a UUID
/// - all 11 metric scores present as integers (no range enforced)
/// - all 11 metric weights present as numbers in [0, 1]
/// - `SentimentData`, when present, an array of `{word, weight ∈ [0,1], count ≥ 1}`
///
/// Every failing field is reported, not just the first.
pub fn validate_candidate(
    candidate: &CandidateEvaluation,
) -> Result<ValidatedEvaluation, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    let target_type = match candidate.get(FIELD_TARGET_TYPE) {
        None => {
            issues.push(ValidationIssue::new(FIELD_TARGET_TYPE, "missing"));
            None
        }
        Some(v) => {
            let parsed = v.as_i64().and_then(TargetType::from_code);
            if parsed.is_none() {
                issues.push(ValidationIssue::new(
                    FIELD_TARGET_TYPE,
                    format!("unrecognized target type {v}"),
                ));
            }
            parsed
        }
    };

    let subject_user_id = match candidate.get(FIELD_SUBJECT_USER_ID) {
        None => {
            issues.push(ValidationIssue::new(FIELD_SUBJECT_USER_ID, "missing"));
            None
        }
        Some(Value::String(raw)) => match target_type {
            Some(TargetType::Person) => match Uuid::parse_str(raw.trim()) {
                Ok(id) => Some(id),
                Err(_) => {
                    issues.push(ValidationIssue::new(
                        FIELD_SUBJECT_USER_ID,
                        format!("'{raw}' is not a user id"),
                    ));
                    None
                }
            },
            _ => None,
        },
        Some(_) => {
            issues.push(ValidationIssue::new(FIELD_SUBJECT_USER_ID, "must be a string"));
            None
        }
    };

    let subject_name = match candidate.get(FIELD_SUBJECT_NAME) {
        Some(Value::String(name)) => name.trim().to_string(),
        Some(_) => {
            issues.push(ValidationIssue::new(FIELD_SUBJECT_NAME, "must be a string"));
            String::new()
        }
        None => {
            issues.push(ValidationIssue::new(FIELD_SUBJECT_NAME, "missing"));
            String::new()
        }
    };

    let mut metrics = Metrics::default();
    for metric in Metric::ALL {
        let score = integer_field(candidate, &metric.score_key(), &mut issues);
        let weight = unit_field(candidate, &metric.weight_key(), &mut issues);
        if let (Some(score), Some(weight)) = (score, weight) {
            metrics.set(metric, MetricScore::new(score, weight));
        }
    }

    let sentiment = validate_sentiment(candidate.get(FIELD_SENTIMENT), &mut issues);

    match target_type {
        Some(target_type) if issues.is_empty() => Ok(ValidatedEvaluation {
            target_type,
            subject_user_id,
            subject_name,
            metrics,
            sentiment,
        }),
        _ => Err(issues),
    }
}

fn integer_field(
    candidate: &CandidateEvaluation,
    key: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<i64> {
    match candidate.get(key) {
        None => {
            issues.push(ValidationIssue::new(key, "missing"));
            None
        }
        Some(v) => {
            let score = v.as_i64();
            if score.is_none() {
                issues.push(ValidationIssue::new(key, format!("score {v} is not an integer")));
            }
            score
        }
    }
}

fn unit_field(
    candidate: &CandidateEvaluation,
    key: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<f64> {
    match candidate.get(key) {
        None => {
            issues.push(ValidationIssue::new(key, "missing"));
            None
        }
        Some(v) => match v.as_f64() {
            Some(w) if (0.0..=1.0).contains(&w) => Some(w),
            _ => {
                issues.push(ValidationIssue::new(key, format!("weight {v} is outside [0, 1]")));
                None
            }
        },
    }
}

fn validate_sentiment(value: Option<&Value>, issues: &mut Vec<ValidationIssue>) -> Vec<SentimentTerm> {
    let Some(value) = value else {
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        issues.push(ValidationIssue::new(FIELD_SENTIMENT, "must be an array"));
        return Vec::new();
    };

    let mut terms = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let field = format!("{FIELD_SENTIMENT}[{i}]");
        let word = item
            .get("word")
            .and_then(|w| w.as_str())
            .map(str::trim)
            .filter(|w| !w.is_empty());
        let weight = item
            .get("weight")
            .and_then(|w| w.as_f64())
            .filter(|w| (0.0..=1.0).contains(w));
        let count = item
            .get("count")
            .and_then(|c| c.as_u64())
            .filter(|c| *c >= 1);

        match (word, weight, count) {
            (Some(word), Some(weight), Some(count)) => terms.push(SentimentTerm {
                word: word.to_string(),
                weight,
                count,
            }),
            _ => issues.push(ValidationIssue::new(
                field,
                "needs a non-empty word, weight in [0, 1] and count >= 1",
            )),
        }
    }
    terms
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// A fully valid candidate for `subject` with every weight set to zero.
    pub(crate) fn candidate_json(target_type: i64, subject: &str, name: &str) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(FIELD_TARGET_TYPE.into(), json!(target_type));
        map.insert(FIELD_SUBJECT_USER_ID.into(), json!(subject));
        map.insert(FIELD_SUBJECT_NAME.into(), json!(name));
        for metric in Metric::ALL {
            map.insert(metric.score_key(), json!(5));
            map.insert(metric.weight_key(), json!(0.0));
        }
        Value::Object(map)
    }

    fn person(id: Uuid) -> CandidateEvaluation {
        CandidateEvaluation::from(candidate_json(2, &id.to_string(), "Bob"))
    }

    #[test]
    fn test_valid_person_candidate() {
        let id = Uuid::new_v4();
        let mut c = person(id);
        c.0.insert("Person_Trust".into(), json!(9));
        c.0.insert("Person_TrustWeight".into(), json!(0.8));
        c.0.insert(
            FIELD_SENTIMENT.into(),
            json!([{"word": "supportive", "weight": 0.9, "count": 1}]),
        );

        let v = validate_candidate(&c).unwrap();
        assert_eq!(v.target_type, TargetType::Person);
        assert_eq!(v.subject_user_id, Some(id));
        assert_eq!(v.subject_name, "Bob");
        assert_eq!(v.metrics.trust, MetricScore::new(9, 0.8));
        assert_eq!(v.sentiment.len(), 1);
    }

    #[test]
    fn test_company_candidate_ignores_subject_id() {
        let c = CandidateEvaluation::from(candidate_json(1, "", "Acme"));
        let v = validate_candidate(&c).unwrap();
        assert_eq!(v.target_type, TargetType::Company);
        assert_eq!(v.subject_user_id, None);
    }

    #[test]
    fn test_missing_subject_user_id_fails() {
        let mut c = person(Uuid::new_v4());
        c.0.remove(FIELD_SUBJECT_USER_ID);
        let issues = validate_candidate(&c).unwrap_err();
        assert_eq!(issues, vec![ValidationIssue::new(FIELD_SUBJECT_USER_ID, "missing")]);
    }

    #[test]
    fn test_person_subject_must_be_uuid() {
        let c = CandidateEvaluation::from(candidate_json(2, "bob", "Bob"));
        let issues = validate_candidate(&c).unwrap_err();
        assert_eq!(issues[0].field, FIELD_SUBJECT_USER_ID);
    }

    #[test]
    fn test_unknown_target_type_fails() {
        let c = CandidateEvaluation::from(candidate_json(3, "", "Acme"));
        let issues = validate_candidate(&c).unwrap_err();
        assert_eq!(issues[0].field, FIELD_TARGET_TYPE);
    }

    #[test]
    fn test_fractional_score_fails() {
        let mut c = person(Uuid::new_v4());
        c.0.insert("Company_Stress".into(), json!(6.5));
        let issues = validate_candidate(&c).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "Company_Stress");
    }

    #[test]
    fn test_score_range_is_not_enforced() {
        let mut c = person(Uuid::new_v4());
        c.0.insert("Company_Stress".into(), json!(-40));
        assert!(validate_candidate(&c).is_ok());
    }

    #[test]
    fn test_weight_out_of_range_fails() {
        let mut c = person(Uuid::new_v4());
        c.0.insert("Person_SympathyWeight".into(), json!(1.2));
        let issues = validate_candidate(&c).unwrap_err();
        assert_eq!(issues[0].field, "Person_SympathyWeight");
    }

    #[test]
    fn test_missing_weight_fails() {
        let mut c = person(Uuid::new_v4());
        c.0.remove("Company_AutonomyWeight");
        assert!(validate_candidate(&c).is_err());
    }

    #[test]
    fn test_sentiment_count_zero_fails() {
        let mut c = person(Uuid::new_v4());
        c.0.insert(
            FIELD_SENTIMENT.into(),
            json!([{"word": "late", "weight": 0.2, "count": 0}]),
        );
        let issues = validate_candidate(&c).unwrap_err();
        assert_eq!(issues[0].field, "SentimentData[0]");
    }

    #[test]
    fn test_large_sentiment_count_kept() {
        let mut c = person(Uuid::new_v4());
        c.0.insert(
            FIELD_SENTIMENT.into(),
            json!([{"word": "great", "weight": 0.9, "count": 3_000_000_000u64}]),
        );
        let v = validate_candidate(&c).unwrap();
        assert_eq!(v.sentiment[0].count, 3_000_000_000);
    }

    #[test]
    fn test_sentiment_weight_out_of_range_fails() {
        let mut c = person(Uuid::new_v4());
        c.0.insert(
            FIELD_SENTIMENT.into(),
            json!([{"word": "great", "weight": 2.0, "count": 1}]),
        );
        assert!(validate_candidate(&c).is_err());
    }

    #[test]
    fn test_null_sentiment_is_empty() {
        let mut c = person(Uuid::new_v4());
        c.0.insert(FIELD_SENTIMENT.into(), Value::Null);
        assert!(validate_candidate(&c).unwrap().sentiment.is_empty());
    }

    #[test]
    fn test_empty_object_reports_every_missing_field() {
        let issues = validate_candidate(&CandidateEvaluation::default()).unwrap_err();
        assert_eq!(issues.len(), 3 + 22);
    }
}
