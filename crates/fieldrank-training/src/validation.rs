//! Re-validating a fixed weight set across seasons and folds.
//!
//! The runner ranks every event once, then reports the same per-event
//! evaluations three ways:
//!
//! - **per fold**, using the event grouping the cross-validator uses
//!   ([`FoldPlan`]), so a baseline and an optimized weight set are compared on
//!   identical folds
//! - **per season**, each with a stress test on the pooled result
//! - **overall**, a mean weighted by matched players
//!
//! # Interpreting a Comparison
//!
//! [`compare`] looks at three deltas (`optimized - baseline`): correlation,
//! RMSE and weighted top-20 score. A delta is material when it exceeds
//! [`MATERIALITY`] in either direction.
//!
//! | Condition                                             | Result               |
//! |-------------------------------------------------------|----------------------|
//! | Δcorr ≥ 0.05, Δweighted ≥ 5 and Δrmse ≤ 0             | `strong_improvement` |
//! | no material delta                                     | `no_material_change` |
//! | more dimensions improved than regressed               | `improvement`        |
//! | more dimensions regressed than improved               | `regression`         |
//! | otherwise                                             | `mixed`              |
//!
//! This is a rule table, not a significance test.

use std::collections::BTreeMap;

use fieldrank_core::{CoreError, RandomSource, RankingGenerator, WeightSet};
use fieldrank_evaluator::{
    aggregate::{AggregateEvaluation, EventSuite, FoldResult},
    ranking_evaluator::{RankingEvaluation, RankingEvaluator, StressTest},
};
use fieldrank_model::cross_validation::FoldPlan;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldSummary {
    pub fold: usize,
    pub event_ids: Vec<String>,
    pub aggregate: AggregateEvaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    /// `None` groups events without a season.
    pub season: Option<i32>,
    pub events: usize,
    pub aggregate: AggregateEvaluation,
    pub stress: StressTest,
}

/// One weight set evaluated event by event, fold by fold and season by season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub label: String,
    pub events: Vec<FoldResult>,
    pub folds: Vec<FoldSummary>,
    pub seasons: Vec<SeasonSummary>,
    pub overall: AggregateEvaluation,
}

/// Applies weight sets to a fixed set of events under a fixed fold plan.
#[derive(Debug)]
pub struct MultiYearValidationRunner<'a, G: ?Sized> {
    pub generator: &'a G,
    pub suite: &'a EventSuite,
    pub evaluator: RankingEvaluator,
    pub plan: FoldPlan,
}

impl<'a, G> MultiYearValidationRunner<'a, G>
where
    G: RankingGenerator + ?Sized,
{
    /// Builds the fold plan over the suite's events.
    ///
    /// `folds` follows [`FoldPlan::build`]: `None` or an out-of-range count
    /// holds out one event per fold.
    pub fn new<R>(
        generator: &'a G,
        suite: &'a EventSuite,
        evaluator: RankingEvaluator,
        folds: Option<usize>,
        rng: &mut R,
    ) -> Self
    where
        R: RandomSource + ?Sized,
    {
        let event_ids = suite.iter().map(|e| e.event_id.clone()).collect::<Vec<_>>();
        let plan = FoldPlan::build(&event_ids, folds, rng);
        Self {
            generator,
            suite,
            evaluator,
            plan,
        }
    }

    pub fn validate(
        &self,
        label: &str,
        weights: &WeightSet,
    ) -> Result<ValidationSummary, CoreError> {
        let events = self.suite.evaluate(self.generator, weights, &self.evaluator)?;

        let folds = self
            .plan
            .folds()
            .iter()
            .enumerate()
            .map(|(fold, event_ids)| FoldSummary {
                fold,
                event_ids: event_ids.clone(),
                aggregate: AggregateEvaluation::from_evaluations(
                    events
                        .iter()
                        .filter(|r| event_ids.contains(&r.label))
                        .map(|r| &r.evaluation),
                ),
            })
            .collect();

        let mut by_season = BTreeMap::<Option<i32>, Vec<&RankingEvaluation>>::new();
        for (event, result) in self.suite.iter().zip(&events) {
            by_season
                .entry(event.season)
                .or_default()
                .push(&result.evaluation);
        }
        let seasons = by_season
            .into_iter()
            .map(|(season, evaluations)| {
                let aggregate = AggregateEvaluation::from_evaluations(evaluations.iter().copied());
                let stress = self.evaluator.stress_test(&pooled(&aggregate));
                tracing::info!(
                    label,
                    season = ?season,
                    events = evaluations.len(),
                    correlation = aggregate.correlation,
                    rmse = aggregate.rmse,
                    top20_weighted = aggregate.top20_weighted_score,
                    stress = stress.status(),
                    "season summary"
                );
                SeasonSummary {
                    season,
                    events: evaluations.len(),
                    aggregate,
                    stress,
                }
            })
            .collect();

        let overall = AggregateEvaluation::from_folds(&events);
        Ok(ValidationSummary {
            label: label.to_owned(),
            events,
            folds,
            seasons,
            overall,
        })
    }

    /// Validates both weight sets on the same folds and compares them.
    pub fn compare_weights(
        &self,
        baseline: &WeightSet,
        optimized: &WeightSet,
    ) -> Result<ValidationComparison, CoreError> {
        let baseline = self.validate("baseline", baseline)?;
        let optimized = self.validate("optimized", optimized)?;
        let comparison = compare(&baseline, &optimized);
        tracing::info!(
            interpretation = %comparison.interpretation,
            delta_correlation = comparison.deltas.correlation,
            delta_rmse = comparison.deltas.rmse,
            delta_top20_weighted = comparison.deltas.top20_weighted_score,
            "compared weight sets"
        );
        Ok(ValidationComparison {
            baseline,
            optimized,
            comparison,
        })
    }
}

/// Season aggregate in the shape the stress test reads.
fn pooled(aggregate: &AggregateEvaluation) -> RankingEvaluation {
    RankingEvaluation {
        available: aggregate.available,
        matched_players: aggregate.matched_players,
        correlation: aggregate.correlation,
        rmse: aggregate.rmse,
        mae: aggregate.mae,
        top10: aggregate.top10,
        top20: aggregate.top20,
        top20_weighted_score: aggregate.top20_weighted_score,
        ..RankingEvaluation::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpretation {
    #[display("strong_improvement")]
    StrongImprovement,
    #[display("improvement")]
    Improvement,
    #[display("mixed")]
    Mixed,
    #[display("no_material_change")]
    NoMaterialChange,
    #[display("regression")]
    Regression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Correlation,
    Rmse,
    WeightedTop20,
}

/// Per-dimension values: deltas or thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Deltas {
    pub correlation: f64,
    pub rmse: f64,
    pub top20_weighted_score: f64,
}

/// Smallest delta that counts as a change.
pub const MATERIALITY: Deltas = Deltas {
    correlation: 0.01,
    rmse: 0.1,
    top20_weighted_score: 1.0,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub deltas: Deltas,
    pub improved: Vec<Dimension>,
    pub regressed: Vec<Dimension>,
    pub interpretation: Interpretation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationComparison {
    pub baseline: ValidationSummary,
    pub optimized: ValidationSummary,
    pub comparison: Comparison,
}

/// Interprets `optimized` against `baseline` by their overall aggregates.
#[must_use]
pub fn compare(baseline: &ValidationSummary, optimized: &ValidationSummary) -> Comparison {
    compare_aggregates(&baseline.overall, &optimized.overall)
}

#[must_use]
pub fn compare_aggregates(
    baseline: &AggregateEvaluation,
    optimized: &AggregateEvaluation,
) -> Comparison {
    let deltas = Deltas {
        correlation: optimized.correlation - baseline.correlation,
        rmse: optimized.rmse - baseline.rmse,
        top20_weighted_score: optimized.top20_weighted_score - baseline.top20_weighted_score,
    };

    // Positive means better for every dimension.
    let signed = [
        (Dimension::Correlation, deltas.correlation, MATERIALITY.correlation),
        (Dimension::Rmse, -deltas.rmse, MATERIALITY.rmse),
        (
            Dimension::WeightedTop20,
            deltas.top20_weighted_score,
            MATERIALITY.top20_weighted_score,
        ),
    ];
    let improved = signed
        .iter()
        .filter(|(_, delta, threshold)| *delta >= *threshold)
        .map(|(dimension, ..)| *dimension)
        .collect::<Vec<_>>();
    let regressed = signed
        .iter()
        .filter(|(_, delta, threshold)| *delta <= -*threshold)
        .map(|(dimension, ..)| *dimension)
        .collect::<Vec<_>>();

    let interpretation = if deltas.correlation >= 0.05
        && deltas.top20_weighted_score >= 5.0
        && deltas.rmse <= 0.0
    {
        Interpretation::StrongImprovement
    } else if improved.is_empty() && regressed.is_empty() {
        Interpretation::NoMaterialChange
    } else if improved.len() > regressed.len() {
        Interpretation::Improvement
    } else if regressed.len() > improved.len() {
        Interpretation::Regression
    } else {
        Interpretation::Mixed
    };

    Comparison {
        deltas,
        improved,
        regressed,
        interpretation,
    }
}
