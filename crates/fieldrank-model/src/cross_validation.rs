//! Event-grouped cross-validation and L2 selection.
//!
//! Samples from the same event always land in the same fold, so the held-out
//! score measures how well the model transfers to an unseen event rather than
//! to unseen players of a seen event.
//!
//! # Fold Assignment
//!
//! - `folds` unset, 0, 1, or at least the number of events: leave-one-event-out,
//!   one fold per event in sorted id order. The random source is not touched.
//! - otherwise: event ids are sorted, shuffled with the shared
//!   [`RandomSource`], and dealt round-robin into `k` folds.
//!
//! # Selection
//!
//! Every L2 value in the grid is trained on all-but-one fold and scored on the
//! held-out fold. Folds with too few training or test samples are skipped. The
//! L2 with the lowest mean held-out log-loss wins (the earlier grid entry on a
//! tie) and the final model is retrained on every sample.

use std::collections::BTreeMap;

use fieldrank_core::{CrossValidationConfig, RandomSource, ReliabilityConfig, RunConfig, shuffle};
use serde::{Deserialize, Serialize};

use crate::{
    dataset::{TrainingSample, TrainingSet},
    logistic::{LogisticClassifier, ModelScore, TrainingOutcome, TrainingReport, UnavailableReason},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FoldMode {
    LeaveOneEventOut,
    KFold { k: usize },
}

/// Assignment of event ids to folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldPlan {
    mode: FoldMode,
    folds: Vec<Vec<String>>,
}

impl FoldPlan {
    /// Groups `event_ids` into folds; duplicates are ignored.
    pub fn build<R>(event_ids: &[String], folds: Option<usize>, rng: &mut R) -> Self
    where
        R: RandomSource + ?Sized,
    {
        let mut ids = event_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        match folds {
            Some(k) if k > 1 && k < ids.len() => {
                shuffle(rng, &mut ids);
                let mut folds = vec![vec![]; k];
                for (i, id) in ids.into_iter().enumerate() {
                    folds[i % k].push(id);
                }
                Self {
                    mode: FoldMode::KFold { k },
                    folds,
                }
            }
            _ => Self {
                mode: FoldMode::LeaveOneEventOut,
                folds: ids.into_iter().map(|id| vec![id]).collect(),
            },
        }
    }

    #[must_use]
    pub fn mode(&self) -> FoldMode {
        self.mode
    }

    #[must_use]
    pub fn folds(&self) -> &[Vec<String>] {
        &self.folds
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// Fold index per event id.
    #[must_use]
    pub fn assignments(&self) -> BTreeMap<&str, usize> {
        self.folds
            .iter()
            .enumerate()
            .flat_map(|(fold, ids)| ids.iter().map(move |id| (id.as_str(), fold)))
            .collect()
    }
}

/// Confidence in a cross-validated model, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reliability {
    pub score: f64,
    pub quality: f64,
    pub event_adequacy: f64,
    pub sample_adequacy: f64,
}

impl Reliability {
    /// Combines held-out quality with the amount of data behind it.
    #[must_use]
    pub fn assess(
        config: &ReliabilityConfig,
        log_loss: f64,
        accuracy: f64,
        events: usize,
        samples: usize,
    ) -> Self {
        let log_loss_score = ramp(-log_loss, -config.bad_log_loss, -config.good_log_loss);
        let accuracy_score = ramp(accuracy, config.bad_accuracy, config.good_accuracy);
        let quality = f64::midpoint(log_loss_score, accuracy_score);
        let event_adequacy = count_ramp(events, config.min_events, config.max_events);
        let sample_adequacy = count_ramp(samples, config.min_samples, config.max_samples);
        Self {
            score: quality * event_adequacy * sample_adequacy,
            quality,
            event_adequacy,
            sample_adequacy,
        }
    }
}

/// Linear ramp: 0 at or below `zero_at`, 1 at or above `one_at`.
fn ramp(value: f64, zero_at: f64, one_at: f64) -> f64 {
    if one_at <= zero_at {
        return if value >= one_at { 1.0 } else { 0.0 };
    }
    ((value - zero_at) / (one_at - zero_at)).clamp(0.0, 1.0)
}

/// Ramp from 0 at `min - 1` to 1 at `max`.
#[expect(clippy::cast_precision_loss)]
fn count_ramp(count: usize, min: usize, max: usize) -> f64 {
    ramp(count as f64, min.saturating_sub(1) as f64, max as f64)
}

/// Mean held-out quality of one L2 value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L2Candidate {
    pub l2: f64,
    pub mean_log_loss: f64,
    pub mean_accuracy: f64,
    pub valid_folds: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub mode: FoldMode,
    pub fold_count: usize,
    pub event_count: usize,
    pub sample_count: usize,
    /// Candidates with at least one valid fold, in grid order.
    pub candidates: Vec<L2Candidate>,
    pub selected_l2: f64,
    pub held_out_log_loss: f64,
    pub held_out_accuracy: f64,
    pub reliability: Reliability,
    /// Model retrained on every sample with the selected L2.
    pub model: TrainingReport,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossValidationUnavailable {
    #[display("need samples from at least {required} events")]
    TooFewEvents { required: usize },
    #[display("no fold had enough training and test samples")]
    NoValidFolds,
    #[display("final model unavailable: {_0}")]
    FinalModel(UnavailableReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CrossValidationOutcome {
    Completed(Box<CrossValidationReport>),
    Unavailable {
        reason: CrossValidationUnavailable,
        event_count: usize,
        sample_count: usize,
    },
}

impl CrossValidationOutcome {
    #[must_use]
    pub fn report(&self) -> Option<&CrossValidationReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Chooses the L2 strength of a [`LogisticClassifier`] by held-out log-loss.
#[derive(Debug, Clone)]
pub struct CrossValidator {
    pub classifier: LogisticClassifier,
    pub config: CrossValidationConfig,
    pub reliability: ReliabilityConfig,
}

struct Split<'a> {
    train: Vec<&'a TrainingSample>,
    test: Vec<&'a TrainingSample>,
}

impl CrossValidator {
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            classifier: LogisticClassifier::from_config(&config.classifier),
            config: config.cross_validation.clone(),
            reliability: config.reliability.clone(),
        }
    }

    pub fn run<R>(&self, set: &TrainingSet, rng: &mut R) -> CrossValidationOutcome
    where
        R: RandomSource + ?Sized,
    {
        let event_ids = set.event_ids();
        let event_count = event_ids.len();
        let sample_count = set.len();
        let unavailable = |reason| CrossValidationOutcome::Unavailable {
            reason,
            event_count,
            sample_count,
        };

        if event_count < self.config.min_events {
            tracing::info!(
                event_count,
                required = self.config.min_events,
                "skipping cross-validation: too few events"
            );
            return unavailable(CrossValidationUnavailable::TooFewEvents {
                required: self.config.min_events,
            });
        }

        let plan = FoldPlan::build(&event_ids, self.config.folds, rng);
        let splits = self.splits(set, &plan);
        let candidates = self.score_grid(&splits, set.dimension());

        // strict comparison keeps the earliest grid entry on ties
        let mut best: Option<&L2Candidate> = None;
        for candidate in &candidates {
            if best.is_none_or(|b| candidate.mean_log_loss < b.mean_log_loss) {
                best = Some(candidate);
            }
        }
        let Some(best) = best.cloned() else {
            tracing::info!(folds = plan.len(), "no valid cross-validation folds");
            return unavailable(CrossValidationUnavailable::NoValidFolds);
        };

        let model = match self.classifier.train(set, best.l2) {
            TrainingOutcome::Trained(report) => report,
            TrainingOutcome::Unavailable { reason, .. } => {
                return unavailable(CrossValidationUnavailable::FinalModel(reason));
            }
        };
        let reliability = Reliability::assess(
            &self.reliability,
            best.mean_log_loss,
            best.mean_accuracy,
            event_count,
            sample_count,
        );
        tracing::info!(
            l2 = best.l2,
            log_loss = best.mean_log_loss,
            accuracy = best.mean_accuracy,
            reliability = reliability.score,
            "selected regularization strength"
        );

        CrossValidationOutcome::Completed(Box::new(CrossValidationReport {
            mode: plan.mode(),
            fold_count: plan.len(),
            event_count,
            sample_count,
            candidates,
            selected_l2: best.l2,
            held_out_log_loss: best.mean_log_loss,
            held_out_accuracy: best.mean_accuracy,
            reliability,
            model,
        }))
    }

    fn splits<'a>(&self, set: &'a TrainingSet, plan: &FoldPlan) -> Vec<Split<'a>> {
        let assignments = plan.assignments();
        let mut splits = vec![];
        for fold in 0..plan.len() {
            let (test, train): (Vec<_>, Vec<_>) = set
                .iter()
                .partition(|s| assignments.get(s.event_id.as_str()) == Some(&fold));
            if train.len() < self.config.min_train_samples
                || test.len() < self.config.min_test_samples
            {
                tracing::debug!(
                    fold,
                    train = train.len(),
                    test = test.len(),
                    "skipping fold with too few samples"
                );
                continue;
            }
            splits.push(Split { train, test });
        }
        splits
    }

    fn score_grid(&self, splits: &[Split<'_>], dimension: usize) -> Vec<L2Candidate> {
        let mut candidates = vec![];
        for &l2 in &self.config.l2_grid {
            let scores = splits
                .iter()
                .filter_map(|split| {
                    let model = self.classifier.fit(&split.train, dimension, l2).ok()?;
                    Some(model.score(split.test.iter().copied()))
                })
                .collect::<Vec<ModelScore>>();
            if scores.is_empty() {
                continue;
            }
            #[expect(clippy::cast_precision_loss)]
            let n = scores.len() as f64;
            candidates.push(L2Candidate {
                l2,
                mean_log_loss: scores.iter().map(|s| s.log_loss).sum::<f64>() / n,
                mean_accuracy: scores.iter().map(|s| s.accuracy).sum::<f64>() / n,
                valid_folds: scores.len(),
            });
        }
        candidates
    }
}
