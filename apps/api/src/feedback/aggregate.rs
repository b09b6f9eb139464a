//! Evaluation Aggregator — weighted rollups over stored evaluations.
//!
//! For each metric: `rollup = Σ(score × weight) / Σ(weight)`. A metric whose weights sum
//! to zero is `Undefined`. Sentiment terms merge per word: counts add up, and the weight
//! becomes the count-weighted mean of every occurrence.
//!
//! Pure functions of their input. Contributions are sorted before summation so that any
//! permutation of the same evaluations yields bit-identical results.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::feedback::metrics::{Metric, MetricScope, Metrics, SentimentTerm};
use crate::models::evaluation::EvaluationRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rollup {
    Value(f64),
    /// Total weight was zero: nothing in the input speaks to this metric.
    Undefined,
}

impl Rollup {
    pub fn value(self) -> Option<f64> {
        match self {
            Rollup::Value(v) => Some(v),
            Rollup::Undefined => None,
        }
    }
}

impl Serialize for Rollup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value() {
            Some(v) => serializer.serialize_f64(v),
            None => serializer.serialize_str("undefined"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricRollup {
    pub metric: Metric,
    pub scope: MetricScope,
    pub rollup: Rollup,
    pub total_weight: f64,
    /// Evaluations that contributed a non-zero weight.
    pub samples: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileTarget {
    Person { user_id: Uuid, user_name: String },
    Company,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvaluationProfile {
    pub target: ProfileTarget,
    pub evaluation_count: usize,
    pub metrics: Vec<MetricRollup>,
    pub sentiment: Vec<SentimentTerm>,
}

pub fn build_profile(target: ProfileTarget, evaluations: &[EvaluationRecord]) -> EvaluationProfile {
    EvaluationProfile {
        target,
        evaluation_count: evaluations.len(),
        metrics: aggregate_metrics(evaluations.iter().map(|e| &e.metrics)),
        sentiment: aggregate_sentiment(evaluations.iter().flat_map(|e| e.sentiment.iter())),
    }
}

/// One rollup per metric, in `Metric::ALL` order.
pub fn aggregate_metrics<'a>(metrics: impl IntoIterator<Item = &'a Metrics>) -> Vec<MetricRollup> {
    let mut pairs: BTreeMap<Metric, Vec<(i64, f64)>> = BTreeMap::new();
    for m in metrics {
        for metric in Metric::ALL {
            let s = m.get(metric);
            if s.weight > 0.0 {
                pairs.entry(metric).or_default().push((s.score, s.weight));
            }
        }
    }

    Metric::ALL
        .iter()
        .map(|&metric| {
            let mut contributions = pairs.remove(&metric).unwrap_or_default();
            contributions.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
            let (rollup, total_weight) = weighted_mean(&contributions);
            MetricRollup {
                metric,
                scope: metric.scope(),
                rollup,
                total_weight,
                samples: contributions.len(),
            }
        })
        .collect()
}

/// `contributions` must be sorted and carry only positive weights.
fn weighted_mean(contributions: &[(i64, f64)]) -> (Rollup, f64) {
    let total_weight: f64 = contributions.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return (Rollup::Undefined, 0.0);
    }
    let weighted: f64 = contributions.iter().map(|(s, w)| *s as f64 * w).sum();

    // Rounding can push the quotient a hair outside its inputs.
    let min = contributions.first().map(|(s, _)| *s as f64).unwrap_or(0.0);
    let max = contributions.last().map(|(s, _)| *s as f64).unwrap_or(0.0);
    let mean = (weighted / total_weight).clamp(min, max);
    (Rollup::Value(mean), total_weight)
}

/// Merges sentiment terms by exact word. Output is ordered by count (desc), then word.
pub fn aggregate_sentiment<'a>(terms: impl IntoIterator<Item = &'a SentimentTerm>) -> Vec<SentimentTerm> {
    let mut by_word: BTreeMap<&str, Vec<(f64, u64)>> = BTreeMap::new();
    for t in terms {
        by_word.entry(t.word.as_str()).or_default().push((t.weight, t.count));
    }

    let mut merged: Vec<SentimentTerm> = by_word
        .into_iter()
        .map(|(word, mut occurrences)| {
            occurrences.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let count = occurrences
                .iter()
                .fold(0u64, |total, (_, c)| total.saturating_add(*c));
            let weighted: f64 = occurrences.iter().map(|(w, c)| w * *c as f64).sum();
            SentimentTerm {
                word: word.to_string(),
                weight: (weighted / count as f64).clamp(0.0, 1.0),
                count,
            }
        })
        .collect();

    merged.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::metrics::MetricScore;

    fn with(metric: Metric, score: i64, weight: f64) -> Metrics {
        let mut m = Metrics::default();
        m.set(metric, MetricScore::new(score, weight));
        m
    }

    fn rollup_of(rollups: &[MetricRollup], metric: Metric) -> Rollup {
        rollups.iter().find(|r| r.metric == metric).unwrap().rollup
    }

    fn term(word: &str, weight: f64, count: u64) -> SentimentTerm {
        SentimentTerm {
            word: word.to_string(),
            weight,
            count,
        }
    }

    #[test]
    fn test_zero_weight_contributes_nothing() {
        let input = [with(Metric::Trust, 8, 0.5), with(Metric::Trust, 2, 0.0)];
        let rollups = aggregate_metrics(&input);
        assert_eq!(rollup_of(&rollups, Metric::Trust), Rollup::Value(8.0));
        let trust = rollups.iter().find(|r| r.metric == Metric::Trust).unwrap();
        assert_eq!(trust.samples, 1);
        assert_eq!(trust.total_weight, 0.5);
    }

    #[test]
    fn test_weighted_mean() {
        // (9×0.75 + 3×0.25) / 1.0 = 7.5
        let input = [with(Metric::Stress, 9, 0.75), with(Metric::Stress, 3, 0.25)];
        let rollups = aggregate_metrics(&input);
        assert_eq!(rollup_of(&rollups, Metric::Stress), Rollup::Value(7.5));
    }

    #[test]
    fn test_zero_total_weight_is_undefined() {
        let input = [with(Metric::Trust, 8, 0.5)];
        let rollups = aggregate_metrics(&input);
        assert_eq!(rollup_of(&rollups, Metric::Autonomy), Rollup::Undefined);
        assert_eq!(rollups.len(), 11);
    }

    #[test]
    fn test_empty_input_is_all_undefined() {
        let rollups = aggregate_metrics(&Vec::<Metrics>::new());
        assert!(rollups.iter().all(|r| r.rollup == Rollup::Undefined));
    }

    #[test]
    fn test_rollup_bounded_by_inputs() {
        let input: Vec<Metrics> = [(3, 0.1), (7, 0.3), (5, 0.9), (10, 0.05), (-2, 0.7)]
            .iter()
            .map(|&(s, w)| with(Metric::Recognition, s, w))
            .collect();
        let value = rollup_of(&aggregate_metrics(&input), Metric::Recognition)
            .value()
            .unwrap();
        assert!((-2.0..=10.0).contains(&value), "rollup was {value}");
    }

    #[test]
    fn test_identical_scores_roll_up_exactly() {
        let input: Vec<Metrics> = [0.1, 0.2, 0.3, 0.7]
            .iter()
            .map(|&w| with(Metric::Sympathy, 6, w))
            .collect();
        assert_eq!(
            rollup_of(&aggregate_metrics(&input), Metric::Sympathy),
            Rollup::Value(6.0)
        );
    }

    #[test]
    fn test_order_independent() {
        let base: Vec<Metrics> = [(3, 0.1), (7, 0.3), (5, 0.9), (10, 0.05), (1, 0.7)]
            .iter()
            .map(|&(s, w)| with(Metric::ProSupport, s, w))
            .collect();
        let mut reversed = base.clone();
        reversed.reverse();
        let mut rotated = base.clone();
        rotated.rotate_left(2);

        let expected = aggregate_metrics(&base);
        assert_eq!(aggregate_metrics(&reversed), expected);
        assert_eq!(aggregate_metrics(&rotated), expected);
    }

    #[test]
    fn test_rerun_after_append_recomputes() {
        let mut input = vec![with(Metric::Workload, 4, 1.0)];
        let first = aggregate_metrics(&input);
        assert_eq!(first, aggregate_metrics(&input));

        input.push(with(Metric::Workload, 8, 1.0));
        assert_eq!(
            rollup_of(&aggregate_metrics(&input), Metric::Workload),
            Rollup::Value(6.0)
        );
    }

    #[test]
    fn test_sentiment_merges_by_word() {
        let terms = [
            term("supportive", 1.0, 3),
            term("late", 0.2, 1),
            term("supportive", 0.6, 1),
        ];
        let merged = aggregate_sentiment(&terms);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].word, "supportive");
        assert_eq!(merged[0].count, 4);
        // (1.0×3 + 0.6×1) / 4 = 0.9
        assert!((merged[0].weight - 0.9).abs() < 1e-12);
        assert_eq!(merged[1], term("late", 0.2, 1));
    }

    #[test]
    fn test_sentiment_order_independent() {
        let terms = vec![
            term("calm", 0.8, 2),
            term("busy", 0.3, 2),
            term("calm", 0.1, 5),
            term("alert", 0.5, 2),
        ];
        let mut reversed = terms.clone();
        reversed.reverse();
        assert_eq!(aggregate_sentiment(&terms), aggregate_sentiment(&reversed));
        // ties on count fall back to the word
        let merged = aggregate_sentiment(&terms);
        assert_eq!(merged[1].word, "alert");
        assert_eq!(merged[2].word, "busy");
    }

    #[test]
    fn test_undefined_serializes_as_string() {
        assert_eq!(serde_json::to_value(Rollup::Undefined).unwrap(), "undefined");
        assert_eq!(serde_json::to_value(Rollup::Value(7.5)).unwrap(), 7.5);
    }

    #[test]
    fn test_sentiment_counts_beyond_u32() {
        let terms = vec![term("great", 1.0, 3_000_000_000), term("great", 0.0, 3_000_000_000)];
        let merged = aggregate_sentiment(&terms);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].count, 6_000_000_000);
        assert!((merged[0].weight - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sentiment_count_saturates() {
        let terms = vec![term("great", 0.8, u64::MAX), term("great", 0.8, 5)];
        let merged = aggregate_sentiment(&terms);
        assert_eq!(merged[0].count, u64::MAX);
        assert!((0.0..=1.0).contains(&merged[0].weight));
    }
}
