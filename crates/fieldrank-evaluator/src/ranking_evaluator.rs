//! Ranking evaluation: how well one predicted ranking matches one event.
//!
//! # How It Works
//!
//! 1. **Match** - Every ranked player with a finish in the [`GroundTruth`] is
//!    kept; players without one are excluded, not penalized.
//! 2. **Rescale** - Depending on [`RankScale`], predicted ranks and finishes
//!    are used as-is, re-ranked `1..m` among matched players, or additionally
//!    mapped to percentiles.
//! 3. **Score** - Rank correlation, error measures and top-N measures.
//!
//! ```text
//! error_i      = predicted_i - actual_i
//! rmse         = sqrt(mean(error²))
//! mae          = mean(|error|)
//! correlation  = spearman(predicted, actual)
//! top{10,20}   = top_n_accuracy(predicted, actual, n)        (percent)
//! weighted_*   = weighted_top_n(predicted, actual, n)        (percent)
//!
//! percentile(r) = (r - 1) / (m - 1)                           (error measures only)
//! ```
//!
//! Fewer than two matched players give an unavailable evaluation: the match
//! count is recorded and every measure is zero.
//!
//! # Stress Test
//!
//! A quick sanity gate on a finished evaluation. It fails when too few players
//! matched, the correlation is too weak, or the weighted top-20 score is too
//! low; every failed condition is reported.

use fieldrank_core::{EvaluationConfig, GroundTruth, PlayerRanking};
use fieldrank_stats::{
    correlation::{rank, spearman},
    descriptive::DescriptiveStats,
    ranking::{top_n_accuracy, weighted_top_n},
};
use serde::{Deserialize, Serialize};

/// How ranks are scaled before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankScale {
    /// Predicted ranks and finishes as given.
    #[default]
    Raw,
    /// Re-ranked `1..m` among matched players.
    Subset,
    /// Subset ranks mapped to `[0, 1]` for the error measures.
    Percentile,
}

/// Quality of one predicted ranking against one event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankingEvaluation {
    pub available: bool,
    pub matched_players: usize,
    pub correlation: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mean_error: f64,
    pub error_std_dev: f64,
    pub top10: f64,
    pub top20: f64,
    pub top10_weighted_score: f64,
    pub top20_weighted_score: f64,
}

impl RankingEvaluation {
    #[must_use]
    pub fn unavailable(matched_players: usize) -> Self {
        Self {
            matched_players,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StressFailure {
    #[display("only {matched} matched players, need {required}")]
    TooFewPlayers { matched: usize, required: usize },
    #[display("correlation {correlation:.3} below {required}")]
    WeakCorrelation { correlation: f64, required: f64 },
    #[display("weighted top-20 score {score:.1} below {required}")]
    WeakTopTwenty { score: f64, required: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTest {
    pub passed: bool,
    pub reasons: Vec<StressFailure>,
}

impl StressTest {
    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.passed { "pass" } else { "fail" }
    }
}

/// Scores predicted rankings against ground truth.
#[derive(Debug, Clone, Default)]
pub struct RankingEvaluator {
    pub scale: RankScale,
    pub config: EvaluationConfig,
}

impl RankingEvaluator {
    #[must_use]
    pub fn new(scale: RankScale, config: EvaluationConfig) -> Self {
        Self { scale, config }
    }

    #[must_use]
    pub fn evaluate(&self, ranking: &[PlayerRanking], truth: &GroundTruth) -> RankingEvaluation {
        let (mut predicted, mut actual): (Vec<f64>, Vec<f64>) = ranking
            .iter()
            .filter_map(|r| Some((f64::from(r.rank), truth.finish(&r.player_id)?)))
            .unzip();
        let matched_players = predicted.len();
        if matched_players < 2 {
            return RankingEvaluation::unavailable(matched_players);
        }

        if self.scale != RankScale::Raw {
            predicted = rank(&predicted);
            actual = rank(&actual);
        }
        let correlation = spearman(&predicted, &actual);
        let top10 = top_n_accuracy(&predicted, &actual, 10);
        let top20 = top_n_accuracy(&predicted, &actual, 20);
        let top10_weighted_score = weighted_top_n(&predicted, &actual, 10);
        let top20_weighted_score = weighted_top_n(&predicted, &actual, 20);

        let errors = if self.scale == RankScale::Percentile {
            #[expect(clippy::cast_precision_loss)]
            let span = (matched_players - 1) as f64;
            predicted
                .iter()
                .zip(&actual)
                .map(|(p, a)| (p - 1.0) / span - (a - 1.0) / span)
                .collect::<Vec<_>>()
        } else {
            predicted
                .iter()
                .zip(&actual)
                .map(|(p, a)| p - a)
                .collect()
        };
        let Some(error_stats) = DescriptiveStats::new(errors.iter().copied()) else {
            return RankingEvaluation::unavailable(matched_players);
        };
        let rmse = DescriptiveStats::new(errors.iter().map(|e| e * e))
            .map_or(0.0, |s| s.mean.sqrt());
        let mae = DescriptiveStats::new(errors.iter().map(|e| e.abs())).map_or(0.0, |s| s.mean);

        RankingEvaluation {
            available: true,
            matched_players,
            correlation,
            rmse,
            mae,
            mean_error: error_stats.mean,
            error_std_dev: error_stats.std_dev,
            top10,
            top20,
            top10_weighted_score,
            top20_weighted_score,
        }
    }

    #[must_use]
    pub fn stress_test(&self, evaluation: &RankingEvaluation) -> StressTest {
        let config = &self.config;
        let mut reasons = vec![];
        if evaluation.matched_players < config.stress_min_players {
            reasons.push(StressFailure::TooFewPlayers {
                matched: evaluation.matched_players,
                required: config.stress_min_players,
            });
        }
        if evaluation.correlation < config.stress_min_correlation {
            reasons.push(StressFailure::WeakCorrelation {
                correlation: evaluation.correlation,
                required: config.stress_min_correlation,
            });
        }
        if evaluation.top20_weighted_score < config.stress_min_weighted_top20 {
            reasons.push(StressFailure::WeakTopTwenty {
                score: evaluation.top20_weighted_score,
                required: config.stress_min_weighted_top20,
            });
        }
        StressTest {
            passed: reasons.is_empty(),
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use fieldrank_core::OutcomeLabel;

    use super::*;

    fn ranking(ids: &[&str]) -> Vec<PlayerRanking> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| PlayerRanking {
                player_id: (*id).to_owned(),
                rank: u32::try_from(i + 1).unwrap(),
                score: 0.0,
                metrics: vec![],
            })
            .collect()
    }

    fn truth(finishes: &[(&str, Option<u32>)]) -> GroundTruth {
        let outcomes = finishes
            .iter()
            .map(|(id, f)| OutcomeLabel::new(*id, *f))
            .collect::<Vec<_>>();
        GroundTruth::from_outcomes(&outcomes, false)
    }

    fn perfect(n: u32) -> (Vec<PlayerRanking>, GroundTruth) {
        let ids = (1..=n).map(|i| format!("p{i}")).collect::<Vec<_>>();
        let refs = ids.iter().map(String::as_str).collect::<Vec<_>>();
        let outcomes = (1..=n)
            .map(|i| OutcomeLabel::new(format!("p{i}"), Some(i)))
            .collect::<Vec<_>>();
        (ranking(&refs), GroundTruth::from_outcomes(&outcomes, false))
    }

    #[test]
    fn test_perfect_ranking() {
        let (ranking, truth) = perfect(25);
        let eval = RankingEvaluator::default().evaluate(&ranking, &truth);
        assert!(eval.available);
        assert_eq!(eval.matched_players, 25);
        assert_abs_diff_eq!(eval.correlation, 1.0, epsilon = 1e-12);
        assert_eq!(eval.rmse, 0.0);
        assert_eq!(eval.mae, 0.0);
        assert_eq!(eval.top10, 100.0);
        assert_eq!(eval.top20, 100.0);
        assert_abs_diff_eq!(eval.top20_weighted_score, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unmatched_players_are_excluded() {
        let ranking = ranking(&["a", "ghost", "b", "c"]);
        let truth = truth(&[("a", Some(1)), ("b", Some(3)), ("c", Some(2))]);
        let eval = RankingEvaluator::default().evaluate(&ranking, &truth);
        assert_eq!(eval.matched_players, 3);
        // raw ranks: a=1, b=3, c=4 against finishes 1, 3, 2
        assert_abs_diff_eq!(eval.mae, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval.mean_error, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_subset_reranks_matched_players() {
        let ranking = ranking(&["a", "ghost", "b", "c"]);
        let truth = truth(&[("a", Some(1)), ("b", Some(30)), ("c", Some(40))]);
        let evaluator = RankingEvaluator::new(RankScale::Subset, EvaluationConfig::default());
        let eval = evaluator.evaluate(&ranking, &truth);
        assert_eq!(eval.rmse, 0.0);
        assert_abs_diff_eq!(eval.correlation, 1.0, epsilon = 1e-12);
        assert_eq!(eval.top20, 100.0);
    }

    #[test]
    fn test_percentile_errors_are_bounded() {
        let ranking = ranking(&["a", "b", "c"]);
        let truth = truth(&[("a", Some(3)), ("b", Some(2)), ("c", Some(1))]);
        let evaluator = RankingEvaluator::new(RankScale::Percentile, EvaluationConfig::default());
        let eval = evaluator.evaluate(&ranking, &truth);
        // errors: -1, 0, 1
        assert_abs_diff_eq!(eval.mae, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval.rmse, (2.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(eval.correlation, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fewer_than_two_matches() {
        let ranking = ranking(&["a", "b"]);
        let truth = truth(&[("a", Some(1))]);
        let eval = RankingEvaluator::default().evaluate(&ranking, &truth);
        assert_eq!(eval, RankingEvaluation::unavailable(1));
        assert!(!eval.available);
    }

    #[test]
    fn test_synthetic_finishes_are_matched() {
        let ranking = ranking(&["a", "b", "wd"]);
        let outcomes = vec![
            OutcomeLabel::new("a", Some(1)),
            OutcomeLabel::new("b", Some(2)),
            OutcomeLabel::new("wd", None),
        ];
        let truth = GroundTruth::from_outcomes(&outcomes, true);
        let eval = RankingEvaluator::default().evaluate(&ranking, &truth);
        assert_eq!(eval.matched_players, 3);
        assert_eq!(eval.rmse, 0.0);
    }

    #[test]
    fn test_stress_test_pass_and_fail() {
        let evaluator = RankingEvaluator::default();
        let (ranking, truth) = perfect(25);
        let strong = evaluator.evaluate(&ranking, &truth);
        let pass = evaluator.stress_test(&strong);
        assert!(pass.passed);
        assert_eq!(pass.status(), "pass");

        let weak = RankingEvaluation {
            available: true,
            matched_players: 12,
            correlation: 0.05,
            top20_weighted_score: 75.0,
            ..RankingEvaluation::default()
        };
        let fail = evaluator.stress_test(&weak);
        assert_eq!(fail.status(), "fail");
        assert_eq!(fail.reasons.len(), 2);
        assert!(matches!(
            fail.reasons[0],
            StressFailure::TooFewPlayers {
                matched: 12,
                required: 20
            }
        ));
        assert_eq!(
            fail.reasons[1].to_string(),
            "correlation 0.050 below 0.1"
        );
    }
}
