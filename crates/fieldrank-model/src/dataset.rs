//! Supervised samples derived from historical events.

use std::collections::BTreeSet;

use fieldrank_core::{CoreError, EventData, MetricCatalog, TrainingSetConfig};
use serde::{Deserialize, Serialize};

/// One labeled player-event observation.
///
/// `features` holds oriented readings (larger is better) in catalog order;
/// missing readings stay non-finite and are imputed at standardization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub event_id: String,
    pub player_id: String,
    pub features: Vec<f64>,
    pub finish: u32,
    pub label: bool,
}

/// Labeled samples sharing one feature layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub feature_labels: Vec<String>,
    pub samples: Vec<TrainingSample>,
}

impl TrainingSet {
    /// Builds samples from every event.
    ///
    /// A player contributes a sample when they have a recorded finish and
    /// their feature vector covers at least `min_coverage` of the metrics.
    /// Synthetic finishes are never used for training. The label is
    /// `finish <= top_n`.
    pub fn from_events(
        catalog: &MetricCatalog,
        events: &[EventData],
        config: &TrainingSetConfig,
    ) -> Result<Self, CoreError> {
        let mut samples = vec![];
        let mut low_coverage = 0;
        let mut unplaced = 0;

        for event in events {
            event.validate(catalog)?;
            let truth = event.ground_truth(false);
            for vector in &event.field {
                let Some(finish) = truth.recorded_finish(&vector.player_id) else {
                    unplaced += 1;
                    continue;
                };
                if vector.coverage() < config.min_coverage {
                    low_coverage += 1;
                    continue;
                }
                let features = catalog
                    .iter()
                    .map(|spec| vector.value(spec.index).map_or(f64::NAN, |v| spec.orient(v)))
                    .collect();
                #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let finish = finish as u32;
                samples.push(TrainingSample {
                    event_id: event.event_id.clone(),
                    player_id: vector.player_id.clone(),
                    features,
                    finish,
                    label: finish <= config.top_n,
                });
            }
        }

        tracing::debug!(
            samples = samples.len(),
            low_coverage,
            unplaced,
            "built training set"
        );
        if low_coverage > 0 {
            tracing::info!(
                low_coverage,
                min_coverage = config.min_coverage,
                "discarded low-coverage feature vectors from training"
            );
        }

        Ok(Self {
            feature_labels: catalog.labels().map(str::to_owned).collect(),
            samples,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.feature_labels.len()
    }

    /// Distinct event ids, sorted.
    #[must_use]
    pub fn event_ids(&self) -> Vec<String> {
        self.samples
            .iter()
            .map(|s| s.event_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrainingSample> + '_ {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use fieldrank_core::{FeatureVector, MetricSpec, OutcomeLabel};

    use super::*;

    fn catalog() -> MetricCatalog {
        MetricCatalog::new(vec![
            MetricSpec::new("sg_total", 0, false),
            MetricSpec::new("scoring_avg", 1, true),
            MetricSpec::new("gir", 2, false),
        ])
        .unwrap()
    }

    fn event() -> EventData {
        EventData {
            event_id: "open".to_owned(),
            season: Some(2023),
            field: vec![
                FeatureVector::new("winner", vec![2.0, 68.0, 0.7]),
                FeatureVector::new("sparse", vec![1.0, f64::NAN, f64::NAN]),
                FeatureVector::new("withdrawn", vec![0.0, 72.0, 0.6]),
                FeatureVector::new("midfield", vec![0.5, 70.0, f64::NAN]),
            ],
            results: vec![
                OutcomeLabel::new("winner", Some(1)),
                OutcomeLabel::new("sparse", Some(5)),
                OutcomeLabel::new("withdrawn", None),
                OutcomeLabel::new("midfield", Some(30)),
            ],
        }
    }

    #[test]
    fn test_filters_and_labels() {
        let config = TrainingSetConfig::default();
        let set = TrainingSet::from_events(&catalog(), &[event()], &config).unwrap();

        // sparse: coverage 1/3; withdrawn: no finish; midfield: coverage 2/3 < 0.7
        let ids = set.iter().map(|s| s.player_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["winner"]);
        assert!(set.samples[0].label);
        assert_eq!(set.samples[0].features, vec![2.0, -68.0, 0.7]);
        assert_eq!(set.dimension(), 3);
    }

    #[test]
    fn test_coverage_threshold_is_inclusive() {
        let config = TrainingSetConfig {
            min_coverage: 2.0 / 3.0,
            ..TrainingSetConfig::default()
        };
        let set = TrainingSet::from_events(&catalog(), &[event()], &config).unwrap();
        let midfield = set.iter().find(|s| s.player_id == "midfield").unwrap();
        assert!(!midfield.label);
        assert!(midfield.features[2].is_nan());
    }

    #[test]
    fn test_rejects_structurally_invalid_event() {
        let mut bad = event();
        bad.field.push(FeatureVector::new("extra", vec![1.0]));
        let result = TrainingSet::from_events(&catalog(), &[bad], &TrainingSetConfig::default());
        assert!(matches!(result, Err(CoreError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_event_ids_sorted_and_distinct() {
        let mut second = event();
        second.event_id = "masters".to_owned();
        let set = TrainingSet::from_events(
            &catalog(),
            &[second, event()],
            &TrainingSetConfig::default(),
        )
        .unwrap();
        assert_eq!(set.event_ids(), vec!["masters".to_owned(), "open".to_owned()]);
    }
}
