//! Run configuration.
//!
//! A single immutable [`RunConfig`] is built once (defaults, optionally
//! overlaid by a JSON document and command-line flags) and passed by reference
//! to every component. Nothing in the engine reads configuration from the
//! environment.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// All tunables for one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seed phrase for the shared random source; `None` draws a fresh seed.
    pub seed: Option<String>,
    pub training_set: TrainingSetConfig,
    pub classifier: ClassifierConfig,
    pub cross_validation: CrossValidationConfig,
    pub reliability: ReliabilityConfig,
    pub blend: BlendConfig,
    pub evaluation: EvaluationConfig,
    pub fitness: FitnessWeights,
    pub search: SearchConfig,
}

/// How training samples are derived from events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSetConfig {
    /// A finish at or above this position is a positive label.
    pub top_n: u32,
    /// Feature vectors with lower coverage are left out of training.
    pub min_coverage: f64,
    /// Place unplaced players at `max_finish + 1` during ranking evaluation.
    pub synthetic_worst_rank: bool,
    /// Minimum paired samples for a metric correlation to count.
    pub min_correlation_samples: usize,
}

impl Default for TrainingSetConfig {
    fn default() -> Self {
        Self {
            top_n: 20,
            min_coverage: 0.70,
            synthetic_worst_rank: true,
            min_correlation_samples: 5,
        }
    }
}

/// Logistic classifier training parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    pub min_samples: usize,
    /// Number of features reported in the weight ranking.
    pub ranking_size: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            iterations: 400,
            learning_rate: 0.1,
            min_samples: 10,
            ranking_size: 10,
        }
    }
}

/// Event-grouped cross-validation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    /// Number of folds; `None`, 0, 1, or at least the event count means
    /// leave-one-event-out.
    pub folds: Option<usize>,
    pub l2_grid: Vec<f64>,
    pub min_events: usize,
    pub min_train_samples: usize,
    pub min_test_samples: usize,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            folds: None,
            l2_grid: vec![0.0, 0.001, 0.005, 0.01, 0.05, 0.1],
            min_events: 3,
            min_train_samples: 20,
            min_test_samples: 10,
        }
    }
}

/// Thresholds for the cross-validation reliability score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    pub good_log_loss: f64,
    pub bad_log_loss: f64,
    pub good_accuracy: f64,
    pub bad_accuracy: f64,
    pub min_events: usize,
    pub max_events: usize,
    pub min_samples: usize,
    pub max_samples: usize,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            good_log_loss: 0.45,
            bad_log_loss: 0.69,
            good_accuracy: 0.75,
            bad_accuracy: 0.50,
            min_events: 3,
            max_events: 10,
            min_samples: 30,
            max_samples: 300,
        }
    }
}

/// What to do with a lower-is-better metric whose learned correlation points
/// the other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInversionPolicy {
    /// Force the weight negative (`-|w|`).
    #[default]
    Flip,
    /// Keep the weight as blended.
    Ignore,
}

/// Shares used when blending prior and learned weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub prior_share: f64,
    pub model_share: f64,
    /// Share given to the validation prior in the second blending stage.
    pub validation_share: f64,
    pub sign_inversion: SignInversionPolicy,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            prior_share: 0.6,
            model_share: 0.4,
            validation_share: 0.3,
            sign_inversion: SignInversionPolicy::Flip,
        }
    }
}

/// Ranking evaluation and stress-test floors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub stress_min_players: usize,
    pub stress_min_correlation: f64,
    pub stress_min_weighted_top20: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            stress_min_players: 20,
            stress_min_correlation: 0.1,
            stress_min_weighted_top20: 60.0,
        }
    }
}

/// Convex weights of the optimizer's combined score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub correlation: f64,
    pub top20: f64,
    pub alignment: f64,
    /// Share of the weighted top-20 score inside the top-20 composite; the
    /// rest goes to plain top-20 accuracy.
    pub top20_weighted_share: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            correlation: 0.3,
            top20: 0.5,
            alignment: 0.2,
            top20_weighted_share: 0.5,
        }
    }
}

/// Random search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_tests: usize,
    pub min_groups_perturbed: usize,
    pub max_groups_perturbed: usize,
    /// Relative group perturbation, `0.20` means a factor in `[0.8, 1.2)`.
    pub group_perturbation: f64,
    /// Relative metric perturbation.
    pub metric_perturbation: f64,
    /// Candidates drawn from the same incumbent before the best is promoted.
    pub batch_size: usize,
    /// Threads used to score one batch.
    pub workers: usize,
    pub log_interval: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_tests: 1500,
            min_groups_perturbed: 2,
            max_groups_perturbed: 3,
            group_perturbation: 0.20,
            metric_perturbation: 0.15,
            batch_size: 1,
            workers: 1,
            log_interval: 250,
        }
    }
}

impl RunConfig {
    /// Rejects configurations no component can run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |reason: String| Err(CoreError::InvalidConfig { reason });

        let f = &self.fitness;
        let fitness_sum = f.correlation + f.top20 + f.alignment;
        if [f.correlation, f.top20, f.alignment].iter().any(|w| *w < 0.0)
            || (fitness_sum - 1.0).abs() > 1e-9
        {
            return invalid(format!(
                "fitness weights must be non-negative and sum to 1, got {fitness_sum}"
            ));
        }
        let shares = [
            ("top20_weighted_share", f.top20_weighted_share),
            ("prior_share", self.blend.prior_share),
            ("model_share", self.blend.model_share),
            ("validation_share", self.blend.validation_share),
            ("min_coverage", self.training_set.min_coverage),
        ];
        for (name, value) in shares {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} must be within [0, 1], got {value}"));
            }
        }
        if self.classifier.iterations == 0 || self.classifier.learning_rate <= 0.0 {
            return invalid("classifier needs a positive iteration count and learning rate".into());
        }
        if self.cross_validation.l2_grid.is_empty()
            || self.cross_validation.l2_grid.iter().any(|l2| *l2 < 0.0)
        {
            return invalid("l2 grid must be non-empty and non-negative".into());
        }
        let search = &self.search;
        if search.batch_size == 0 || search.workers == 0 {
            return invalid("search batch size and workers must be positive".into());
        }
        if search.min_groups_perturbed > search.max_groups_perturbed {
            return invalid(format!(
                "min_groups_perturbed ({}) exceeds max_groups_perturbed ({})",
                search.min_groups_perturbed, search.max_groups_perturbed
            ));
        }
        if !(0.0..1.0).contains(&search.group_perturbation)
            || !(0.0..1.0).contains(&search.metric_perturbation)
        {
            return invalid("perturbation ranges must be within [0, 1)".into());
        }
        let r = &self.reliability;
        if r.good_log_loss >= r.bad_log_loss || r.good_accuracy <= r.bad_accuracy {
            return invalid("reliability good/bad thresholds are inverted".into());
        }
        if r.max_events < r.min_events || r.max_samples < r.min_samples {
            return invalid("reliability ramps need max >= min".into());
        }
        Ok(())
    }
}
