//! Candidate weights from a prior template and learned signal.
//!
//! # Pipeline
//!
//! For every group of the prior template:
//!
//! ```text
//! model_g    = normalize(|classifier weight| of the group's metrics)
//! share_m    = model_share * reliability
//! blended_g  = blend_by_magnitude(prior_g, model_g, prior_share, share_m)
//! blended_g  = blend_by_magnitude(blended_g, validation_g, 1 - v, v)     (if priors)
//! blended_g  = sign inversion                                            (Flip policy)
//! blended_g  = apply_guardrails(blended_g, bands)                        (if priors)
//! ```
//!
//! Group weights are blended the same way, with the model side given by
//! [`fill_group_weights`](crate::weights::fill_group_weights) over the mean
//! absolute classifier weight per group.
//! A model with zero reliability therefore leaves the prior untouched.

use fieldrank_core::{
    BlendConfig, SignInversionPolicy, ValidationPriors, WeightMap, WeightSet, normalize,
};
use fieldrank_model::{cross_validation::CrossValidationReport, signal::CorrelationEntry};
use serde::{Deserialize, Serialize};

use crate::weights::{self, GuardrailBands};

/// Learned evidence about metric importance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSignal {
    /// Classifier weight per metric label.
    pub metric_weights: WeightMap,
    /// Cross-validation reliability in `[0, 1]`; 0 when no model is available.
    pub reliability: f64,
    pub correlations: Vec<CorrelationEntry>,
}

impl ModelSignal {
    /// Signal from a cross-validation report, or correlation-only when the
    /// model is unavailable.
    #[must_use]
    pub fn new(
        report: Option<&CrossValidationReport>,
        correlations: Vec<CorrelationEntry>,
    ) -> Self {
        let Some(report) = report else {
            return Self {
                correlations,
                ..Self::default()
            };
        };
        Self {
            metric_weights: report
                .model
                .weights
                .iter()
                .map(|w| (w.label.clone(), w.weight))
                .collect(),
            reliability: report.reliability.score,
            correlations,
        }
    }

    /// Mean absolute classifier weight per group of `template`.
    ///
    /// `None` when there is no usable model.
    #[must_use]
    pub fn suggested_group_weights(&self, template: &WeightSet) -> Option<WeightMap> {
        if self.metric_weights.is_empty() || self.reliability <= 0.0 {
            return None;
        }
        let suggested = template
            .metric_weights()
            .iter()
            .filter_map(|(group, metrics)| {
                let weights = metrics
                    .keys()
                    .filter_map(|m| self.metric_weights.get(m))
                    .map(|w| w.abs())
                    .collect::<Vec<_>>();
                if weights.is_empty() {
                    return None;
                }
                #[expect(clippy::cast_precision_loss)]
                let mean = weights.iter().sum::<f64>() / weights.len() as f64;
                Some((group.clone(), mean))
            })
            .collect::<WeightMap>();
        (!suggested.is_empty()).then(|| normalize(&suggested))
    }

    fn group_model_weights(&self, metrics: &WeightMap) -> WeightMap {
        let model = metrics
            .keys()
            .map(|m| (m.clone(), self.metric_weights.get(m).map_or(0.0, |w| w.abs())))
            .collect();
        normalize(&model)
    }
}

/// What the blender changed beyond plain mixing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendOutcome {
    pub weights: WeightSet,
    /// Metrics whose weight was forced negative.
    pub inverted: Vec<String>,
    /// Effective model share after reliability scaling.
    pub model_share: f64,
}

/// Merges a prior template with learned signal.
#[derive(Debug, Clone, Default)]
pub struct WeightBlender {
    pub config: BlendConfig,
}

impl WeightBlender {
    #[must_use]
    pub fn new(config: BlendConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn blend_candidate(
        &self,
        prior: &WeightSet,
        signal: &ModelSignal,
        validation: Option<&ValidationPriors>,
    ) -> BlendOutcome {
        let config = &self.config;
        let model_share = config.model_share * signal.reliability.clamp(0.0, 1.0);
        let bands = validation.map(weights::build_bands).unwrap_or_default();
        let inverted = self.inverted_metrics(signal);

        let mut metric_weights = prior.metric_weights().clone();
        for (group, metrics) in &mut metric_weights {
            let model = signal.group_model_weights(metrics);
            let mut blended =
                weights::blend_by_magnitude(metrics, &model, config.prior_share, model_share);
            if let Some(priors) = validation {
                blended = blend_validation(&blended, priors, config.validation_share);
            }
            for (metric, weight) in &mut blended {
                if inverted.contains(metric) {
                    *weight = -weight.abs();
                }
            }
            *metrics = guard(&blended, &bands);
            tracing::debug!(group = group.as_str(), metrics = metrics.len(), "blended group");
        }

        let group_weights = match signal.suggested_group_weights(prior) {
            Some(suggested) => {
                let filled = weights::fill_group_weights(&suggested, prior.group_weights());
                weights::blend(prior.group_weights(), &filled, config.prior_share, model_share)
            }
            None => normalize(prior.group_weights()),
        };

        tracing::info!(
            model_share,
            reliability = signal.reliability,
            inverted = inverted.len(),
            "blended candidate weights"
        );
        BlendOutcome {
            weights: WeightSet::new(group_weights, metric_weights).normalized(),
            inverted,
            model_share,
        }
    }

    fn inverted_metrics(&self, signal: &ModelSignal) -> Vec<String> {
        if self.config.sign_inversion == SignInversionPolicy::Ignore {
            return vec![];
        }
        signal
            .correlations
            .iter()
            .filter(|e| e.lower_is_better && e.contradicts_direction())
            .map(|e| e.label.clone())
            .collect()
    }
}

/// Pulls metrics toward their validated recommendation.
///
/// Metrics without a recommendation keep their blended weight on both sides,
/// so they are not dragged toward zero.
fn blend_validation(blended: &WeightMap, priors: &ValidationPriors, share: f64) -> WeightMap {
    let target = blended
        .iter()
        .map(|(metric, weight)| {
            let rec = priors
                .get(metric)
                .map_or(*weight, |p| p.recommended_weight.abs() * weight.signum());
            (metric.clone(), rec)
        })
        .collect::<WeightMap>();
    weights::blend_by_magnitude(blended, &target, 1.0 - share, share)
}

fn guard(metrics: &WeightMap, bands: &GuardrailBands) -> WeightMap {
    if bands.is_empty() {
        return metrics.clone();
    }
    weights::apply_guardrails(metrics, bands)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_abs_diff_eq;
    use fieldrank_core::{NORMALIZATION_TOLERANCE, TrendConfidence, ValidationPrior};

    use super::*;

    fn map(entries: &[(&str, f64)]) -> WeightMap {
        entries.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    fn prior() -> WeightSet {
        WeightSet::new(
            map(&[("approach", 0.5), ("putting", 0.5)]),
            BTreeMap::from([
                ("approach".to_owned(), map(&[("gir", 0.5), ("prox", 0.5)])),
                ("putting".to_owned(), map(&[("putts", 1.0)])),
            ]),
        )
    }

    fn correlation(label: &str, correlation: f64, lower_is_better: bool) -> CorrelationEntry {
        CorrelationEntry {
            label: label.to_owned(),
            correlation,
            sample_count: 40,
            low_confidence: false,
            lower_is_better,
        }
    }

    #[test]
    fn test_unreliable_model_keeps_prior() {
        let signal = ModelSignal {
            metric_weights: map(&[("gir", 3.0), ("prox", 0.1), ("putts", 0.5)]),
            reliability: 0.0,
            correlations: vec![],
        };
        let outcome = WeightBlender::default().blend_candidate(&prior(), &signal, None);
        assert_eq!(outcome.weights, prior());
        assert_eq!(outcome.model_share, 0.0);
    }

    #[test]
    fn test_reliable_model_shifts_weight() {
        let signal = ModelSignal {
            metric_weights: map(&[("gir", 3.0), ("prox", 1.0), ("putts", 0.5)]),
            reliability: 1.0,
            correlations: vec![],
        };
        let outcome = WeightBlender::default().blend_candidate(&prior(), &signal, None);
        let w = &outcome.weights;
        // 0.6 * 0.5 + 0.4 * 0.75 = 0.6
        assert_abs_diff_eq!(w.metric_weight("approach", "gir"), 0.6, epsilon = 1e-12);
        assert!(w.group_weight("approach") > w.group_weight("putting"));
        assert!(w.is_normalized(NORMALIZATION_TOLERANCE));
    }

    #[test]
    fn test_sign_inversion_policy() {
        let signal = ModelSignal {
            correlations: vec![correlation("putts", 0.3, true), correlation("gir", -0.2, false)],
            ..ModelSignal::default()
        };
        let flipped = WeightBlender::default().blend_candidate(&prior(), &signal, None);
        assert_eq!(flipped.inverted, vec!["putts".to_owned()]);
        assert_abs_diff_eq!(flipped.weights.metric_weight("putting", "putts"), -1.0);
        // higher-is-better metrics are never flipped
        assert!(flipped.weights.metric_weight("approach", "gir") > 0.0);

        let blender = WeightBlender::new(BlendConfig {
            sign_inversion: SignInversionPolicy::Ignore,
            ..BlendConfig::default()
        });
        let kept = blender.blend_candidate(&prior(), &signal, None);
        assert!(kept.inverted.is_empty());
        assert_abs_diff_eq!(kept.weights.metric_weight("putting", "putts"), 1.0);
    }

    #[test]
    fn test_validation_and_guardrails() {
        let priors = ValidationPriors::from([(
            "gir".to_owned(),
            ValidationPrior::new(0.8, Some(TrendConfidence::Stable)),
        )]);
        let outcome = WeightBlender::default().blend_candidate(
            &prior(),
            &ModelSignal::default(),
            Some(&priors),
        );
        let w = &outcome.weights;
        assert!(w.metric_weight("approach", "gir") > 0.5);
        let group_sum = w.group_metrics("approach").unwrap().values().sum::<f64>();
        assert_abs_diff_eq!(group_sum, 1.0, epsilon = 1e-12);
        assert!(w.is_normalized(NORMALIZATION_TOLERANCE));
    }

    #[test]
    fn test_suggested_group_weights() {
        let signal = ModelSignal {
            metric_weights: map(&[("gir", -2.0), ("prox", 1.0), ("putts", 0.5)]),
            reliability: 0.5,
            correlations: vec![],
        };
        let suggested = signal.suggested_group_weights(&prior()).unwrap();
        assert_abs_diff_eq!(suggested["approach"], 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(suggested["putting"], 0.25, epsilon = 1e-12);
        assert!(ModelSignal::default().suggested_group_weights(&prior()).is_none());
    }
}
