//! The fixed evaluation vocabulary: 11 named metric dimensions, the target kinds, and the
//! sentiment term shape shared by the extraction contract, storage and aggregation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricScope {
    Company,
    Person,
}

/// The subject kind of one evaluation. Wire codes: 1 = Company, 2 = Person.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TargetType {
    Company,
    Person,
}

impl TargetType {
    pub fn code(self) -> i16 {
        match self {
            TargetType::Company => 1,
            TargetType::Person => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(TargetType::Company),
            2 => Some(TargetType::Person),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Fulfillment,
    Autonomy,
    GrowthOpportunities,
    Workload,
    Stress,
    WorkLifeBalance,
    Recognition,
    Sympathy,
    Trust,
    ProSupport,
    GrowthSupport,
}

impl Metric {
    /// Canonical order: the six company dimensions, then the five person dimensions.
    pub const ALL: [Metric; 11] = [
        Metric::Fulfillment,
        Metric::Autonomy,
        Metric::GrowthOpportunities,
        Metric::Workload,
        Metric::Stress,
        Metric::WorkLifeBalance,
        Metric::Recognition,
        Metric::Sympathy,
        Metric::Trust,
        Metric::ProSupport,
        Metric::GrowthSupport,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Fulfillment => "Fulfillment",
            Metric::Autonomy => "Autonomy",
            Metric::GrowthOpportunities => "GrowthOpportunities",
            Metric::Workload => "Workload",
            Metric::Stress => "Stress",
            Metric::WorkLifeBalance => "WorkLifeBalance",
            Metric::Recognition => "Recognition",
            Metric::Sympathy => "Sympathy",
            Metric::Trust => "Trust",
            Metric::ProSupport => "ProSupport",
            Metric::GrowthSupport => "GrowthSupport",
        }
    }

    pub fn scope(self) -> MetricScope {
        match self {
            Metric::Fulfillment
            | Metric::Autonomy
            | Metric::GrowthOpportunities
            | Metric::Workload
            | Metric::Stress
            | Metric::WorkLifeBalance => MetricScope::Company,
            Metric::Recognition
            | Metric::Sympathy
            | Metric::Trust
            | Metric::ProSupport
            | Metric::GrowthSupport => MetricScope::Person,
        }
    }

    /// Field name carrying the score in the extraction schema, e.g. `Person_Trust`.
    pub fn score_key(self) -> String {
        let prefix = match self.scope() {
            MetricScope::Company => "Company",
            MetricScope::Person => "Person",
        };
        format!("{prefix}_{}", self.name())
    }

    /// Field name carrying the weight in the extraction schema, e.g. `Person_TrustWeight`.
    pub fn weight_key(self) -> String {
        format!("{}Weight", self.score_key())
    }

    pub fn description(self) -> &'static str {
        match self {
            Metric::Fulfillment => {
                "How much employees feel their work is meaningful and fulfilling."
            }
            Metric::Autonomy => {
                "The extent to which employees feel free and independent to make decisions about their work."
            }
            Metric::GrowthOpportunities => {
                "How many opportunities for growth and development the company offers."
            }
            Metric::Workload => {
                "Whether employees perceive their workload as manageable and balanced."
            }
            Metric::Stress => "The level of stress employees experience in their work environment.",
            Metric::WorkLifeBalance => {
                "How well employees balance their work responsibilities with their personal life."
            }
            Metric::Recognition => {
                "How often the person is recognized and appreciated for their work."
            }
            Metric::Sympathy => {
                "The extent to which colleagues feel empathetic and understanding towards the person."
            }
            Metric::Trust => "How much trust and confidence colleagues place in the person.",
            Metric::ProSupport => {
                "How much professional support the person offers to their colleagues."
            }
            Metric::GrowthSupport => {
                "How much the person supports colleagues' growth and development."
            }
        }
    }
}

/// One `(score, weight)` pair. The weight is the extractor's confidence that the text
/// actually speaks to this dimension; `0.0` means "no signal".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricScore {
    pub score: i64,
    pub weight: f64,
}

impl MetricScore {
    pub fn new(score: i64, weight: f64) -> Self {
        Self { score, weight }
    }
}

/// All eleven metric pairs of one evaluation, one named field per dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Metrics {
    pub fulfillment: MetricScore,
    pub autonomy: MetricScore,
    pub growth_opportunities: MetricScore,
    pub workload: MetricScore,
    pub stress: MetricScore,
    pub work_life_balance: MetricScore,
    pub recognition: MetricScore,
    pub sympathy: MetricScore,
    pub trust: MetricScore,
    pub pro_support: MetricScore,
    pub growth_support: MetricScore,
}

impl Metrics {
    pub fn get(&self, metric: Metric) -> MetricScore {
        match metric {
            Metric::Fulfillment => self.fulfillment,
            Metric::Autonomy => self.autonomy,
            Metric::GrowthOpportunities => self.growth_opportunities,
            Metric::Workload => self.workload,
            Metric::Stress => self.stress,
            Metric::WorkLifeBalance => self.work_life_balance,
            Metric::Recognition => self.recognition,
            Metric::Sympathy => self.sympathy,
            Metric::Trust => self.trust,
            Metric::ProSupport => self.pro_support,
            Metric::GrowthSupport => self.growth_support,
        }
    }

    pub fn set(&mut self, metric: Metric, value: MetricScore) {
        let slot = match metric {
            Metric::Fulfillment => &mut self.fulfillment,
            Metric::Autonomy => &mut self.autonomy,
            Metric::GrowthOpportunities => &mut self.growth_opportunities,
            Metric::Workload => &mut self.workload,
            Metric::Stress => &mut self.stress,
            Metric::WorkLifeBalance => &mut self.work_life_balance,
            Metric::Recognition => &mut self.recognition,
            Metric::Sympathy => &mut self.sympathy,
            Metric::Trust => &mut self.trust,
            Metric::ProSupport => &mut self.pro_support,
            Metric::GrowthSupport => &mut self.growth_support,
        };
        *slot = value;
    }
}

/// A sentiment-bearing word. `weight` runs from 0 (negative) to 1 (positive).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentTerm {
    pub word: String,
    pub weight: f64,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_company_and_five_person_metrics() {
        let company = Metric::ALL
            .iter()
            .filter(|m| m.scope() == MetricScope::Company)
            .count();
        assert_eq!(company, 6);
        assert_eq!(Metric::ALL.len() - company, 5);
    }

    #[test]
    fn test_wire_keys() {
        assert_eq!(Metric::Trust.score_key(), "Person_Trust");
        assert_eq!(Metric::Trust.weight_key(), "Person_TrustWeight");
        assert_eq!(
            Metric::WorkLifeBalance.weight_key(),
            "Company_WorkLifeBalanceWeight"
        );
    }

    #[test]
    fn test_metrics_get_set_by_name() {
        let mut metrics = Metrics::default();
        metrics.set(Metric::ProSupport, MetricScore::new(7, 0.6));
        assert_eq!(metrics.get(Metric::ProSupport), MetricScore::new(7, 0.6));
        assert_eq!(metrics.pro_support.score, 7);
        assert_eq!(metrics.get(Metric::Trust), MetricScore::default());
    }

    #[test]
    fn test_target_type_codes() {
        assert_eq!(TargetType::from_code(1), Some(TargetType::Company));
        assert_eq!(TargetType::from_code(2), Some(TargetType::Person));
        assert_eq!(TargetType::from_code(3), None);
        assert_eq!(TargetType::Person.code(), 2);
    }
}
