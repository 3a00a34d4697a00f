//! Optimizer fitness: ranking quality plus agreement with the learned signal.
//!
//! ```text
//! correlation_score     = (correlation + 1) / 2
//! top20_composite_score = s * weighted_top20 / 100 + (1 - s) * top20 / 100
//! alignment_score       = (alignment + 1) / 2
//! combined_score        = w_c * correlation_score
//!                       + w_t * top20_composite_score
//!                       + w_a * alignment_score
//! ```
//!
//! with `s = top20_weighted_share` and `(w_c, w_t, w_a)` from
//! [`FitnessWeights`] (defaults `0.5` and `0.3 / 0.5 / 0.2`). Every component
//! is in `[0, 1]`, so the combined score is too.

use fieldrank_core::{CoreError, FitnessWeights, RankingGenerator, WeightMap, WeightSet};
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::{AggregateEvaluation, EventSuite, FoldResult},
    ranking_evaluator::RankingEvaluator,
};

/// Cosine similarity between two weight maps over the union of their keys.
///
/// Missing keys count as zero. Returns `0.0` when either side has zero norm.
#[must_use]
pub fn alignment(weights: &WeightMap, signal: &WeightMap) -> f64 {
    let dot = weights
        .iter()
        .filter_map(|(k, w)| signal.get(k).map(|s| w * s))
        .sum::<f64>();
    let norm = |m: &WeightMap| m.values().map(|v| v * v).sum::<f64>().sqrt();
    let (a, b) = (norm(weights), norm(signal));
    if a == 0.0 || b == 0.0 {
        return 0.0;
    }
    (dot / (a * b)).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombinedScore {
    pub correlation_score: f64,
    pub top20_composite_score: f64,
    pub alignment_score: f64,
    pub combined_score: f64,
}

impl CombinedScore {
    #[must_use]
    pub fn compute(
        aggregate: &AggregateEvaluation,
        alignment: f64,
        weights: &FitnessWeights,
    ) -> Self {
        let correlation_score = (aggregate.correlation + 1.0) / 2.0;
        let share = weights.top20_weighted_share;
        let top20_composite_score = share * aggregate.top20_weighted_score / 100.0
            + (1.0 - share) * aggregate.top20 / 100.0;
        let alignment_score = (alignment + 1.0) / 2.0;
        Self {
            correlation_score,
            top20_composite_score,
            alignment_score,
            combined_score: weights.correlation * correlation_score
                + weights.top20 * top20_composite_score
                + weights.alignment * alignment_score,
        }
    }
}

/// Full fitness of one weight set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessEvaluation {
    pub folds: Vec<FoldResult>,
    pub aggregate: AggregateEvaluation,
    pub alignment: f64,
    pub score: CombinedScore,
}

/// Scores candidate weight sets against a fixed set of events and signal.
#[derive(Debug)]
pub struct FitnessOracle<'a, G: ?Sized> {
    pub generator: &'a G,
    pub suite: &'a EventSuite,
    pub evaluator: RankingEvaluator,
    pub signal: &'a WeightMap,
    pub weights: FitnessWeights,
}

impl<G> FitnessOracle<'_, G>
where
    G: RankingGenerator + ?Sized,
{
    pub fn score(&self, candidate: &WeightSet) -> Result<FitnessEvaluation, CoreError> {
        let folds = self.suite.evaluate(self.generator, candidate, &self.evaluator)?;
        let aggregate = AggregateEvaluation::from_folds(&folds);
        let alignment = alignment(&candidate.effective_metric_weights(), self.signal);
        let score = CombinedScore::compute(&aggregate, alignment, &self.weights);
        Ok(FitnessEvaluation {
            folds,
            aggregate,
            alignment,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn map(entries: &[(&str, f64)]) -> WeightMap {
        entries.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    #[test]
    fn test_alignment() {
        let signal = map(&[("a", 1.0), ("b", 0.0)]);
        assert_abs_diff_eq!(alignment(&map(&[("a", 2.0)]), &signal), 1.0);
        assert_abs_diff_eq!(alignment(&map(&[("a", -1.0)]), &signal), -1.0);
        assert_abs_diff_eq!(alignment(&map(&[("b", 1.0)]), &signal), 0.0);
        assert_abs_diff_eq!(
            alignment(&map(&[("a", 1.0), ("b", 1.0)]), &signal),
            1.0 / 2.0_f64.sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(alignment(&WeightMap::new(), &signal), 0.0);
    }

    #[test]
    fn test_combined_score_defaults() {
        let aggregate = AggregateEvaluation {
            available: true,
            correlation: 0.6,
            top20: 80.0,
            top20_weighted_score: 60.0,
            ..AggregateEvaluation::default()
        };
        let score = CombinedScore::compute(&aggregate, 0.0, &FitnessWeights::default());
        assert_abs_diff_eq!(score.correlation_score, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(score.top20_composite_score, 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(score.alignment_score, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(
            score.combined_score,
            0.3 * 0.8 + 0.5 * 0.7 + 0.2 * 0.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_combined_score_bounds() {
        let best = AggregateEvaluation {
            correlation: 1.0,
            top20: 100.0,
            top20_weighted_score: 100.0,
            ..AggregateEvaluation::default()
        };
        let worst = AggregateEvaluation {
            correlation: -1.0,
            ..AggregateEvaluation::default()
        };
        let weights = FitnessWeights::default();
        assert_abs_diff_eq!(
            CombinedScore::compute(&best, 1.0, &weights).combined_score,
            1.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            CombinedScore::compute(&worst, -1.0, &weights).combined_score,
            0.0
        );
    }
}
