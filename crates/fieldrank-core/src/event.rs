use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{CoreError, FeatureVector, MetricCatalog, OutcomeLabel};

/// Everything the engine knows about one historical event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub event_id: String,
    #[serde(default)]
    pub season: Option<i32>,
    pub field: Vec<FeatureVector>,
    #[serde(default)]
    pub results: Vec<OutcomeLabel>,
}

impl EventData {
    /// Checks the structural invariants of the event against `catalog`.
    ///
    /// Every player id must be non-empty and every feature vector must have one
    /// reading per metric.
    pub fn validate(&self, catalog: &MetricCatalog) -> Result<(), CoreError> {
        let empty_id = || CoreError::EmptyPlayerId {
            event_id: self.event_id.clone(),
        };
        for vector in &self.field {
            if vector.player_id.is_empty() {
                return Err(empty_id());
            }
            catalog.check_vector(vector)?;
        }
        if self.results.iter().any(|r| r.player_id.is_empty()) {
            return Err(empty_id());
        }
        Ok(())
    }

    /// Builds the finish lookup for this event.
    #[must_use]
    pub fn ground_truth(&self, synthetic_worst_rank: bool) -> GroundTruth {
        GroundTruth::from_outcomes(&self.results, synthetic_worst_rank)
    }
}

/// Finish position lookup for one event.
///
/// Built from raw outcomes with these rules:
///
/// 1. Duplicate records for one player collapse to the best (lowest) finish.
/// 2. Players with no recorded position are excluded, unless
///    `synthetic_worst_rank` is set and at least one position is known, in
///    which case they are placed at `max_finish + 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    finishes: BTreeMap<String, f64>,
    synthetic: HashSet<String>,
    max_finish: Option<u32>,
}

impl GroundTruth {
    #[must_use]
    pub fn from_outcomes(outcomes: &[OutcomeLabel], synthetic_worst_rank: bool) -> Self {
        let mut best = BTreeMap::<String, u32>::new();
        let mut unplaced = HashSet::new();
        for outcome in outcomes {
            match outcome.finish_position {
                Some(position) => {
                    best.entry(outcome.player_id.clone())
                        .and_modify(|current| *current = (*current).min(position))
                        .or_insert(position);
                }
                None => {
                    unplaced.insert(outcome.player_id.clone());
                }
            }
        }

        let max_finish = best.values().copied().max();
        let mut finishes = best
            .iter()
            .map(|(id, pos)| (id.clone(), f64::from(*pos)))
            .collect::<BTreeMap<_, _>>();

        let mut synthetic = HashSet::new();
        if let (true, Some(max)) = (synthetic_worst_rank, max_finish) {
            for id in unplaced {
                if !finishes.contains_key(&id) {
                    finishes.insert(id.clone(), f64::from(max) + 1.0);
                    synthetic.insert(id);
                }
            }
        }

        Self {
            finishes,
            synthetic,
            max_finish,
        }
    }

    #[must_use]
    pub fn finish(&self, player_id: &str) -> Option<f64> {
        self.finishes.get(player_id).copied()
    }

    /// Whether the player's finish was synthesized rather than recorded.
    #[must_use]
    pub fn is_synthetic(&self, player_id: &str) -> bool {
        self.synthetic.contains(player_id)
    }

    /// Best recorded finish for a player, ignoring synthetic placements.
    #[must_use]
    pub fn recorded_finish(&self, player_id: &str) -> Option<f64> {
        if self.is_synthetic(player_id) {
            None
        } else {
            self.finish(player_id)
        }
    }

    #[must_use]
    pub fn max_finish(&self) -> Option<u32> {
        self.max_finish
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.finishes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.finishes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.finishes.iter().map(|(id, finish)| (id.as_str(), *finish))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetricSpec;

    fn outcomes() -> Vec<OutcomeLabel> {
        vec![
            OutcomeLabel::new("a", Some(3)),
            OutcomeLabel::new("a", Some(1)),
            OutcomeLabel::new("b", Some(2)),
            OutcomeLabel::new("c", None),
        ]
    }

    #[test]
    fn test_duplicates_keep_best_finish() {
        let truth = GroundTruth::from_outcomes(&outcomes(), false);
        assert_eq!(truth.finish("a"), Some(1.0));
        assert_eq!(truth.finish("b"), Some(2.0));
        assert_eq!(truth.finish("c"), None);
        assert_eq!(truth.max_finish(), Some(2));
        assert_eq!(truth.len(), 2);
    }

    #[test]
    fn test_synthetic_worst_rank() {
        let truth = GroundTruth::from_outcomes(&outcomes(), true);
        assert_eq!(truth.finish("c"), Some(3.0));
        assert!(truth.is_synthetic("c"));
        assert_eq!(truth.recorded_finish("c"), None);
        assert_eq!(truth.recorded_finish("a"), Some(1.0));
    }

    #[test]
    fn test_synthetic_rank_needs_known_maximum() {
        let truth = GroundTruth::from_outcomes(&[OutcomeLabel::new("c", None)], true);
        assert!(truth.is_empty());
    }

    #[test]
    fn test_placed_record_wins_over_withdrawal() {
        let truth = GroundTruth::from_outcomes(
            &[
                OutcomeLabel::new("a", None),
                OutcomeLabel::new("a", Some(4)),
            ],
            true,
        );
        assert_eq!(truth.finish("a"), Some(4.0));
        assert!(!truth.is_synthetic("a"));
    }

    #[test]
    fn test_validate_rejects_structural_errors() {
        let catalog = MetricCatalog::new(vec![MetricSpec::new("m", 0, false)]).unwrap();
        let event = EventData {
            event_id: "e1".to_owned(),
            season: Some(2024),
            field: vec![FeatureVector::new("", vec![1.0])],
            results: vec![],
        };
        assert_eq!(
            event.validate(&catalog),
            Err(CoreError::EmptyPlayerId {
                event_id: "e1".to_owned()
            })
        );

        let event = EventData {
            field: vec![FeatureVector::new("p", vec![1.0, 2.0])],
            ..event
        };
        assert!(matches!(
            event.validate(&catalog),
            Err(CoreError::DimensionMismatch { .. })
        ));
    }
}
