//! Per-metric correlation with finishing performance.

use fieldrank_core::{CoreError, EventData, MetricCatalog, TrainingSetConfig, WeightMap};
use fieldrank_stats::correlation::spearman;
use serde::{Deserialize, Serialize};

/// Rank correlation between one metric's raw readings and performance.
///
/// Performance is the negated finish position, so a positive correlation means
/// larger raw readings go with better finishes. For a lower-is-better metric
/// the expected sign is therefore negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub label: String,
    pub correlation: f64,
    pub sample_count: usize,
    pub low_confidence: bool,
    pub lower_is_better: bool,
}

impl CorrelationEntry {
    /// Correlation of the oriented metric (larger is better) with performance.
    #[must_use]
    pub fn oriented_correlation(&self) -> f64 {
        if self.lower_is_better {
            -self.correlation
        } else {
            self.correlation
        }
    }

    /// Whether the learned sign contradicts the metric's declared direction.
    #[must_use]
    pub fn contradicts_direction(&self) -> bool {
        !self.low_confidence && self.oriented_correlation() < 0.0
    }
}

/// Computes one [`CorrelationEntry`] per catalog metric, in catalog order.
///
/// Every player with a recorded finish and a finite reading contributes one
/// pair, pooled across events. Metrics with fewer than
/// `min_correlation_samples` pairs report zero with `low_confidence` set.
pub fn metric_correlations(
    catalog: &MetricCatalog,
    events: &[EventData],
    config: &TrainingSetConfig,
) -> Result<Vec<CorrelationEntry>, CoreError> {
    let mut pairs = vec![(vec![], vec![]); catalog.len()];
    for event in events {
        event.validate(catalog)?;
        let truth = event.ground_truth(false);
        for vector in &event.field {
            let Some(finish) = truth.recorded_finish(&vector.player_id) else {
                continue;
            };
            for (slot, spec) in catalog.iter().enumerate() {
                if let Some(value) = vector.value(spec.index) {
                    pairs[slot].0.push(value);
                    pairs[slot].1.push(-finish);
                }
            }
        }
    }

    let entries = catalog
        .iter()
        .zip(pairs)
        .map(|(spec, (values, performance))| {
            let sample_count = values.len();
            let low_confidence = sample_count < config.min_correlation_samples;
            let correlation = if low_confidence {
                0.0
            } else {
                spearman(&values, &performance)
            };
            CorrelationEntry {
                label: spec.label.clone(),
                correlation,
                sample_count,
                low_confidence,
                lower_is_better: spec.lower_is_better,
            }
        })
        .collect::<Vec<_>>();

    let low = entries.iter().filter(|e| e.low_confidence).count();
    if low > 0 {
        tracing::debug!(low, "metrics with too few samples for a correlation");
    }
    Ok(entries)
}

/// Oriented correlations keyed by metric label, the reference direction for
/// alignment scoring.
#[must_use]
pub fn signal_map(entries: &[CorrelationEntry]) -> WeightMap {
    entries
        .iter()
        .map(|e| (e.label.clone(), e.oriented_correlation()))
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use fieldrank_core::{FeatureVector, MetricSpec, OutcomeLabel};

    use super::*;

    fn catalog() -> MetricCatalog {
        MetricCatalog::new(vec![
            MetricSpec::new("sg_total", 0, false),
            MetricSpec::new("scoring_avg", 1, true),
            MetricSpec::new("rare_stat", 2, false),
        ])
        .unwrap()
    }

    fn event() -> EventData {
        // sg_total rises with quality, scoring_avg falls with it
        let field = (1..=8)
            .map(|finish| {
                let f = f64::from(finish);
                let rare = if finish <= 2 { f } else { f64::NAN };
                FeatureVector::new(format!("p{finish}"), vec![10.0 - f, 67.0 + f, rare])
            })
            .collect();
        let results = (1..=8)
            .map(|finish| OutcomeLabel::new(format!("p{finish}"), Some(finish)))
            .collect();
        EventData {
            event_id: "e".to_owned(),
            season: None,
            field,
            results,
        }
    }

    #[test]
    fn test_signs_follow_raw_direction() {
        let entries =
            metric_correlations(&catalog(), &[event()], &TrainingSetConfig::default()).unwrap();
        assert_abs_diff_eq!(entries[0].correlation, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(entries[1].correlation, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(entries[1].oriented_correlation(), 1.0, epsilon = 1e-12);
        assert!(!entries[1].contradicts_direction());
    }

    #[test]
    fn test_few_samples_are_low_confidence() {
        let entries =
            metric_correlations(&catalog(), &[event()], &TrainingSetConfig::default()).unwrap();
        let rare = &entries[2];
        assert_eq!(rare.sample_count, 2);
        assert!(rare.low_confidence);
        assert_eq!(rare.correlation, 0.0);
        assert!(!rare.contradicts_direction());
    }

    #[test]
    fn test_unplaced_players_are_ignored() {
        let mut event = event();
        event.field.push(FeatureVector::new("wd", vec![100.0, 0.0, 0.0]));
        event.results.push(OutcomeLabel::new("wd", None));
        let entries =
            metric_correlations(&catalog(), &[event], &TrainingSetConfig::default()).unwrap();
        assert_eq!(entries[0].sample_count, 8);
        assert_abs_diff_eq!(entries[0].correlation, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lower_is_better_contradiction() {
        let entry = CorrelationEntry {
            label: "putts".to_owned(),
            correlation: 0.4,
            sample_count: 50,
            low_confidence: false,
            lower_is_better: true,
        };
        assert!(entry.contradicts_direction());
        let map = signal_map(&[entry]);
        assert_abs_diff_eq!(map["putts"], -0.4);
    }
}
