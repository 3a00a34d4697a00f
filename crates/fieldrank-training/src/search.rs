//! Randomized local search over weight sets.
//!
//! The optimizer keeps one incumbent weight set and repeatedly perturbs it.
//! A perturbed candidate replaces the incumbent only when it scores better, so
//! the search climbs from the seed set rather than sampling blindly.
//!
//! # Algorithm Overview
//!
//! 1. **Score the seed** - The seed weight set is trial 0, so the result is
//!    never worse than the starting point
//! 2. **Propose** - Draw `batch_size` candidates from the incumbent:
//!    - pick 2–3 groups, scale each by a factor in `[0.8, 1.2)`, renormalize
//!    - scale every metric weight by a factor in `[0.85, 1.15)`
//!    - clamp metrics to their guardrail bands, renormalize each group
//! 3. **Evaluate** - Rank every event with the external generator, score the
//!    rankings, aggregate by matched players, and add the alignment term
//!    (see [`fieldrank_evaluator::fitness`])
//! 4. **Select** - The best candidate of the batch becomes the incumbent if it
//!    beats it
//! 5. **Repeat** - Until `max_tests` trials have been run
//!
//! # Selection Order
//!
//! Candidates are compared by combined score, then by raw correlation. On a
//! full tie the earlier trial wins, which makes the winner independent of how
//! a batch was split across threads.
//!
//! # Parallelization
//!
//! All candidates of a batch are drawn from the random source before any is
//! evaluated. Evaluation is then spread over `workers` scoped threads and the
//! results are reduced in trial order. With the same seed and inputs, the
//! winner is bit-identical for any worker count.
//!
//! # Current Limitations
//!
//! - **Fixed budget**: No early stopping; every run performs `max_tests` trials
//! - **Local only**: No restarts, so the result depends on the seed weight set
//! - **No global guarantee**: Heuristic search, not an optimality proof

use std::{cmp::Ordering, thread};

use fieldrank_core::{
    CoreError, RandomSource, RankingGenerator, SearchConfig, WeightSet, normalize_by_magnitude,
};
use fieldrank_evaluator::{
    aggregate::AggregateEvaluation,
    fitness::{CombinedScore, FitnessEvaluation, FitnessOracle},
};
use fieldrank_stats::descriptive::DescriptiveStats;
use serde::{Deserialize, Serialize};

use crate::weights::{self, GuardrailBands};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SearchError {
    #[display("seed weight set has no groups")]
    EmptySeed,
    #[display("no events to evaluate candidates on")]
    NoEvents,
    #[display("failed to score candidate at trial {trial}")]
    Scoring { trial: usize, source: CoreError },
    #[display("candidate evaluation thread panicked")]
    WorkerPanicked,
}

/// A scored weight set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub trial: usize,
    pub weights: WeightSet,
    pub score: CombinedScore,
    pub aggregate: AggregateEvaluation,
    pub alignment: f64,
}

impl Trial {
    fn new(trial: usize, weights: WeightSet, fitness: FitnessEvaluation) -> Self {
        Self {
            trial,
            weights,
            score: fitness.score,
            aggregate: fitness.aggregate,
            alignment: fitness.alignment,
        }
    }

    /// Whether `self` should replace `incumbent`.
    fn beats(&self, incumbent: &Self) -> bool {
        match self
            .score
            .combined_score
            .total_cmp(&incumbent.score.combined_score)
        {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => {
                self.aggregate.correlation.total_cmp(&incumbent.aggregate.correlation)
                    == Ordering::Greater
            }
        }
    }
}

/// A point where the incumbent changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub trial: usize,
    pub combined_score: f64,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub trials_run: usize,
    /// Seed weight set scored as trial 0.
    pub baseline: Trial,
    pub best: Trial,
    pub improvements: Vec<Improvement>,
}

/// Random local search driven by a [`FitnessOracle`].
#[derive(Debug)]
pub struct RandomSearchOptimizer<'a, G: ?Sized> {
    pub oracle: FitnessOracle<'a, G>,
    pub config: SearchConfig,
    /// Guardrails applied to every proposed metric weight.
    pub bands: GuardrailBands,
}

impl<G> RandomSearchOptimizer<'_, G>
where
    G: RankingGenerator + Sync + ?Sized,
{
    /// Runs `max_tests` trials starting from `seed`.
    pub fn run<R>(&self, seed: &WeightSet, rng: &mut R) -> Result<SearchResult, SearchError>
    where
        R: RandomSource + ?Sized,
    {
        if seed.group_weights().is_empty() {
            return Err(SearchError::EmptySeed);
        }
        if self.oracle.suite.is_empty() {
            return Err(SearchError::NoEvents);
        }

        let seed = seed.normalized();
        let fitness = self
            .oracle
            .score(&seed)
            .map_err(|source| SearchError::Scoring { trial: 0, source })?;
        let baseline = Trial::new(0, seed, fitness);
        tracing::info!(
            combined = baseline.score.combined_score,
            correlation = baseline.aggregate.correlation,
            "scored seed weights"
        );

        let config = &self.config;
        let batch_size = config.batch_size.max(1);
        let mut best = baseline.clone();
        let mut improvements = vec![];
        let mut combined_scores = vec![baseline.score.combined_score];
        let mut next_trial = 1;

        while next_trial <= config.max_tests {
            let len = batch_size.min(config.max_tests - next_trial + 1);
            let candidates = (next_trial..next_trial + len)
                .map(|trial| (trial, self.propose(&best.weights, rng)))
                .collect::<Vec<_>>();
            let results = self.score_batch(&candidates)?;

            for ((trial, weights), fitness) in candidates.into_iter().zip(results) {
                combined_scores.push(fitness.score.combined_score);
                let candidate = Trial::new(trial, weights, fitness);
                if candidate.beats(&best) {
                    tracing::debug!(
                        trial,
                        combined = candidate.score.combined_score,
                        correlation = candidate.aggregate.correlation,
                        "new best weights"
                    );
                    improvements.push(Improvement {
                        trial,
                        combined_score: candidate.score.combined_score,
                        correlation: candidate.aggregate.correlation,
                    });
                    best = candidate;
                }
            }

            let done = next_trial + len - 1;
            let interval = config.log_interval;
            if interval > 0 && done / interval > (next_trial - 1) / interval {
                tracing::info!(
                    trial = done,
                    max_tests = config.max_tests,
                    best = best.score.combined_score,
                    best_trial = best.trial,
                    "search progress"
                );
            }
            next_trial += len;
        }

        if let Some(stats) = DescriptiveStats::new(combined_scores) {
            tracing::info!(
                trials = stats.count,
                mean = stats.mean,
                std_dev = stats.std_dev,
                max = stats.max,
                best_trial = best.trial,
                "search finished"
            );
        }

        Ok(SearchResult {
            trials_run: config.max_tests,
            baseline,
            best,
            improvements,
        })
    }

    /// Draws one candidate from `incumbent`.
    pub fn propose<R>(&self, incumbent: &WeightSet, rng: &mut R) -> WeightSet
    where
        R: RandomSource + ?Sized,
    {
        let config = &self.config;
        let groups = weights::perturb_groups(
            rng,
            incumbent.group_weights(),
            config.min_groups_perturbed,
            config.max_groups_perturbed,
            config.group_perturbation,
        );
        let metrics = incumbent
            .metric_weights()
            .iter()
            .map(|(group, metrics)| {
                let perturbed = weights::perturb_metrics(rng, metrics, config.metric_perturbation);
                let guarded = if self.bands.is_empty() {
                    normalize_by_magnitude(&perturbed)
                } else {
                    weights::apply_guardrails(&perturbed, &self.bands)
                };
                (group.clone(), guarded)
            })
            .collect();
        WeightSet::new(groups, metrics).normalized()
    }

    fn score_batch(
        &self,
        candidates: &[(usize, WeightSet)],
    ) -> Result<Vec<FitnessEvaluation>, SearchError> {
        let score = |(trial, weights): &(usize, WeightSet)| {
            self.oracle
                .score(weights)
                .map_err(|source| SearchError::Scoring {
                    trial: *trial,
                    source,
                })
        };
        let workers = self.config.workers.max(1);
        if workers == 1 || candidates.len() == 1 {
            return candidates.iter().map(score).collect();
        }

        let chunk_size = candidates.len().div_ceil(workers);
        let chunks = thread::scope(|s| {
            let handles = candidates
                .chunks(chunk_size)
                .map(|chunk| s.spawn(move || chunk.iter().map(score).collect::<Vec<_>>()))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| handle.join().map_err(|_| SearchError::WorkerPanicked))
                .collect::<Result<Vec<_>, _>>()
        })?;
        chunks.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_abs_diff_eq;
    use fieldrank_core::{
        EventData, FeatureVector, FitnessWeights, MetricCatalog, MetricSpec,
        NORMALIZATION_TOLERANCE, OutcomeLabel, SeededRandom, WeightMap, WeightedSumRanker,
    };
    use fieldrank_evaluator::{aggregate::EventSuite, ranking_evaluator::RankingEvaluator};

    use super::*;

    fn catalog() -> MetricCatalog {
        MetricCatalog::new(vec![
            MetricSpec::new("form", 0, false),
            MetricSpec::new("noise", 1, false),
        ])
        .unwrap()
    }

    fn events() -> Vec<EventData> {
        (0..2_u32)
            .map(|e| EventData {
                event_id: format!("e{e}"),
                season: None,
                field: (1..=12_u32)
                    .map(|i| {
                        let noise = f64::from((i * 5 + e * 3) % 12);
                        FeatureVector::new(format!("p{i}"), vec![f64::from(30 - i), noise])
                    })
                    .collect(),
                results: (1..=12_u32)
                    .map(|i| OutcomeLabel::new(format!("p{i}"), Some(i)))
                    .collect(),
            })
            .collect()
    }

    fn seed() -> WeightSet {
        WeightSet::new(
            WeightMap::from([("all".to_owned(), 1.0)]),
            BTreeMap::from([(
                "all".to_owned(),
                WeightMap::from([("form".to_owned(), 0.3), ("noise".to_owned(), 0.7)]),
            )]),
        )
    }

    fn run(config: SearchConfig, phrase: &str) -> SearchResult {
        let catalog = catalog();
        let suite = EventSuite::new(&catalog, &events(), true).unwrap();
        let ranker = WeightedSumRanker::new(catalog);
        let signal = WeightMap::from([("form".to_owned(), 1.0), ("noise".to_owned(), 0.0)]);
        let optimizer = RandomSearchOptimizer {
            oracle: FitnessOracle {
                generator: &ranker,
                suite: &suite,
                evaluator: RankingEvaluator::default(),
                signal: &signal,
                weights: FitnessWeights::default(),
            },
            config,
            bands: GuardrailBands::new(),
        };
        let mut rng = SeededRandom::from_phrase(Some(phrase));
        optimizer.run(&seed(), &mut rng).unwrap()
    }

    fn small_config() -> SearchConfig {
        SearchConfig {
            max_tests: 120,
            log_interval: 0,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_never_worse_than_seed() {
        let result = run(small_config(), "climb");
        assert_eq!(result.baseline.trial, 0);
        assert!(result.best.score.combined_score >= result.baseline.score.combined_score);
        assert!(result.best.weights.is_normalized(NORMALIZATION_TOLERANCE));
        assert_eq!(result.trials_run, 120);
    }

    #[test]
    fn test_improvements_are_monotonic() {
        let result = run(small_config(), "climb");
        let scores = result
            .improvements
            .iter()
            .map(|i| i.combined_score)
            .collect::<Vec<_>>();
        assert!(scores.is_sorted());
        if let Some(last) = result.improvements.last() {
            assert_eq!(last.trial, result.best.trial);
        }
    }

    #[test]
    fn test_moves_toward_signal() {
        let result = run(small_config(), "climb");
        let effective = result.best.weights.effective_metric_weights();
        assert!(effective["form"] > 0.3);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = run(small_config(), "repeat");
        let b = run(small_config(), "repeat");
        assert_eq!(a, b);
    }

    #[test]
    fn test_worker_count_does_not_change_result() {
        let batched = |workers| SearchConfig {
            batch_size: 4,
            workers,
            ..small_config()
        };
        let single = run(batched(1), "threads");
        let parallel = run(batched(3), "threads");
        assert_eq!(single, parallel);
    }

    #[test]
    fn test_proposals_respect_guardrails() {
        let catalog = catalog();
        let suite = EventSuite::new(&catalog, &events(), true).unwrap();
        let ranker = WeightedSumRanker::new(catalog);
        let signal = WeightMap::new();
        let bands = GuardrailBands::from([(
            "form".to_owned(),
            weights::GuardrailBand::around(0.3, 0.1),
        )]);
        let optimizer = RandomSearchOptimizer {
            oracle: FitnessOracle {
                generator: &ranker,
                suite: &suite,
                evaluator: RankingEvaluator::default(),
                signal: &signal,
                weights: FitnessWeights::default(),
            },
            config: SearchConfig::default(),
            bands,
        };
        let mut rng = SeededRandom::from_phrase(Some("bands"));
        for _ in 0..20 {
            let candidate = optimizer.propose(&seed(), &mut rng);
            let group = candidate.group_metrics("all").unwrap();
            assert_abs_diff_eq!(group.values().sum::<f64>(), 1.0, epsilon = 1e-12);
            // form clamped to [0.27, 0.33] before renormalizing against noise in [0.595, 0.805)
            assert!(group["form"] > 0.27 / (0.33 + 0.805) - 1e-12);
            assert!(group["form"] < 0.33 / (0.27 + 0.595) + 1e-12);
        }
    }

    fn scored(trial: usize, combined_score: f64, correlation: f64) -> Trial {
        Trial {
            trial,
            weights: seed(),
            score: CombinedScore {
                combined_score,
                ..CombinedScore::default()
            },
            aggregate: AggregateEvaluation {
                available: true,
                correlation,
                ..AggregateEvaluation::default()
            },
            alignment: 0.0,
        }
    }

    #[test]
    fn test_equal_scores_break_on_correlation() {
        let incumbent = scored(3, 0.6, 0.40);
        let stronger = scored(7, 0.6, 0.55);
        let weaker = scored(8, 0.6, 0.25);
        assert!(stronger.beats(&incumbent));
        assert!(!weaker.beats(&incumbent));
    }

    #[test]
    fn test_full_tie_keeps_earlier_trial() {
        let incumbent = scored(2, 0.6, 0.4);
        let later = scored(9, 0.6, 0.4);
        assert!(!later.beats(&incumbent));
        assert!(!incumbent.beats(&later));
    }

    #[test]
    fn test_combined_score_outranks_correlation() {
        let incumbent = scored(1, 0.6, 0.9);
        let better = scored(4, 0.61, 0.1);
        assert!(better.beats(&incumbent));
        assert!(!incumbent.beats(&better));
    }

    #[test]
    fn test_empty_seed_is_rejected() {
        let catalog = catalog();
        let suite = EventSuite::new(&catalog, &events(), true).unwrap();
        let ranker = WeightedSumRanker::new(catalog);
        let signal = WeightMap::new();
        let optimizer = RandomSearchOptimizer {
            oracle: FitnessOracle {
                generator: &ranker,
                suite: &suite,
                evaluator: RankingEvaluator::default(),
                signal: &signal,
                weights: FitnessWeights::default(),
            },
            config: small_config(),
            bands: GuardrailBands::new(),
        };
        let mut rng = SeededRandom::from_phrase(Some("empty"));
        assert!(matches!(
            optimizer.run(&WeightSet::default(), &mut rng),
            Err(SearchError::EmptySeed)
        ));
    }
}
