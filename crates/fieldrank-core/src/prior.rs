use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How stable a metric's externally validated weight has been over time.
///
/// The label decides how far a learned weight may stray from the validated
/// recommendation, see [`TrendConfidence::guardrail_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendConfidence {
    Stable,
    Watch,
    Chronic,
}

/// Confidence assumed for metrics with a missing or unrecognized trend label.
pub const DEFAULT_TREND_CONFIDENCE: TrendConfidence = TrendConfidence::Watch;

impl TrendConfidence {
    /// Parses a trend label, case-insensitively.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "STABLE" => Some(Self::Stable),
            "WATCH" => Some(Self::Watch),
            "CHRONIC" => Some(Self::Chronic),
            _ => None,
        }
    }

    /// Relative half-width of the guardrail band around a recommended weight.
    #[must_use]
    pub const fn guardrail_range(self) -> f64 {
        match self {
            Self::Stable => 0.10,
            Self::Watch => 0.20,
            Self::Chronic => 0.35,
        }
    }
}

/// Externally validated recommendation for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationPrior {
    pub recommended_weight: f64,
    /// Raw trend label as supplied (`STABLE`, `WATCH`, `CHRONIC`).
    #[serde(default)]
    pub trend: Option<String>,
}

impl ValidationPrior {
    #[must_use]
    pub fn new(recommended_weight: f64, trend: Option<TrendConfidence>) -> Self {
        let trend = trend.map(|t| {
            match t {
                TrendConfidence::Stable => "STABLE",
                TrendConfidence::Watch => "WATCH",
                TrendConfidence::Chronic => "CHRONIC",
            }
            .to_owned()
        });
        Self {
            recommended_weight,
            trend,
        }
    }

    /// Resolved trend confidence, falling back to [`DEFAULT_TREND_CONFIDENCE`].
    #[must_use]
    pub fn confidence(&self) -> TrendConfidence {
        match self.trend.as_deref() {
            None => DEFAULT_TREND_CONFIDENCE,
            Some(label) => TrendConfidence::parse(label).unwrap_or_else(|| {
                tracing::debug!(label, "unknown trend label, using default confidence");
                DEFAULT_TREND_CONFIDENCE
            }),
        }
    }
}

/// Validation priors keyed by metric label.
pub type ValidationPriors = BTreeMap<String, ValidationPrior>;
