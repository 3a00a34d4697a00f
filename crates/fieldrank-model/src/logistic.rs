//! L2-regularized logistic regression over standardized features.
//!
//! The classifier predicts whether a player finishes inside the top N. It is
//! deliberately small: full-batch gradient descent with a fixed iteration
//! count and learning rate, no early stopping, no randomness. Training the same
//! samples twice yields bit-identical models.
//!
//! # Standardization
//!
//! Per-feature mean and standard deviation come from the training samples
//! (finite values only). A zero standard deviation is replaced by 1. Missing
//! readings are imputed with the feature mean, i.e. they become 0 after
//! standardization and contribute nothing to the logit.
//!
//! # Unavailable Results
//!
//! Fewer than `min_samples` samples, or samples whose dimensionality disagrees
//! with the feature layout, produce [`TrainingOutcome::Unavailable`] instead of
//! an error.

use std::cmp::Ordering;

use fieldrank_core::ClassifierConfig;
use serde::{Deserialize, Serialize};

use crate::dataset::{TrainingSample, TrainingSet};

const LOG_LOSS_EPSILON: f64 = 1e-9;
const DECISION_THRESHOLD: f64 = 0.5;

/// Trained model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    pub l2: f64,
}

impl ClassifierModel {
    fn standardize(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(x, (mean, std))| if x.is_finite() { (x - mean) / std } else { 0.0 })
            .collect()
    }

    fn logit(&self, standardized: &[f64]) -> f64 {
        standardized
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.bias
    }

    /// Probability that the sample is a top-N finisher.
    #[must_use]
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        sigmoid(self.logit(&self.standardize(features)))
    }

    #[must_use]
    pub fn predict(&self, features: &[f64]) -> bool {
        self.predict_proba(features) >= DECISION_THRESHOLD
    }

    /// Accuracy and log-loss over `samples`.
    #[must_use]
    pub fn score<'a, I>(&self, samples: I) -> ModelScore
    where
        I: IntoIterator<Item = &'a TrainingSample>,
    {
        let mut count = 0_usize;
        let mut correct = 0_usize;
        let mut loss = 0.0;
        for sample in samples {
            let p = self.predict_proba(&sample.features);
            count += 1;
            if (p >= DECISION_THRESHOLD) == sample.label {
                correct += 1;
            }
            loss += sample_log_loss(p, sample.label);
        }
        if count == 0 {
            return ModelScore {
                samples: 0,
                accuracy: 0.0,
                log_loss: 0.0,
            };
        }
        #[expect(clippy::cast_precision_loss)]
        let n = count as f64;
        #[expect(clippy::cast_precision_loss)]
        let accuracy = correct as f64 / n;
        ModelScore {
            samples: count,
            accuracy,
            log_loss: loss / n,
        }
    }
}

/// Classification quality over a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub samples: usize,
    pub accuracy: f64,
    pub log_loss: f64,
}

/// Feature label with its learned weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedWeight {
    pub label: String,
    pub weight: f64,
}

/// Summary of a successful training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub accuracy: f64,
    pub log_loss: f64,
    pub bias: f64,
    pub weights: Vec<RankedWeight>,
    /// Features sorted by absolute weight, largest first.
    pub weight_ranking: Vec<RankedWeight>,
    pub model: ClassifierModel,
}

/// Why a classifier could not be trained.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    #[display("need at least {required} samples")]
    TooFewSamples { required: usize },
    #[display("sample dimension does not match the {expected} feature labels")]
    DimensionMismatch { expected: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainingOutcome {
    Trained(TrainingReport),
    Unavailable {
        reason: UnavailableReason,
        sample_count: usize,
    },
}

impl TrainingOutcome {
    #[must_use]
    pub fn report(&self) -> Option<&TrainingReport> {
        match self {
            Self::Trained(report) => Some(report),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Batch gradient descent trainer.
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    pub iterations: usize,
    pub learning_rate: f64,
    pub min_samples: usize,
    pub ranking_size: usize,
}

impl LogisticClassifier {
    #[must_use]
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            iterations: config.iterations,
            learning_rate: config.learning_rate,
            min_samples: config.min_samples,
            ranking_size: config.ranking_size,
        }
    }

    /// Trains on the whole set and reports in-sample quality.
    #[must_use]
    pub fn train(&self, set: &TrainingSet, l2: f64) -> TrainingOutcome {
        let samples = set.iter().collect::<Vec<_>>();
        match self.fit(&samples, set.dimension(), l2) {
            Ok(model) => {
                TrainingOutcome::Trained(self.report(&set.feature_labels, &samples, model))
            }
            Err(reason) => TrainingOutcome::Unavailable {
                reason,
                sample_count: samples.len(),
            },
        }
    }

    /// Fits model parameters on `samples`.
    pub fn fit(
        &self,
        samples: &[&TrainingSample],
        dimension: usize,
        l2: f64,
    ) -> Result<ClassifierModel, UnavailableReason> {
        if samples.len() < self.min_samples.max(1) {
            return Err(UnavailableReason::TooFewSamples {
                required: self.min_samples.max(1),
            });
        }
        if samples.iter().any(|s| s.features.len() != dimension) {
            return Err(UnavailableReason::DimensionMismatch {
                expected: dimension,
            });
        }

        let (means, stds) = feature_moments(samples, dimension);
        let mut model = ClassifierModel {
            weights: vec![0.0; dimension],
            bias: 0.0,
            means,
            stds,
            l2,
        };
        let rows = samples
            .iter()
            .map(|s| (model.standardize(&s.features), f64::from(u8::from(s.label))))
            .collect::<Vec<_>>();

        #[expect(clippy::cast_precision_loss)]
        let n = rows.len() as f64;
        let mut grad_w = vec![0.0; dimension];
        for _ in 0..self.iterations {
            grad_w.fill(0.0);
            let mut grad_b = 0.0;
            for (x, y) in &rows {
                let err = sigmoid(model.logit(x)) - y;
                for (g, xi) in grad_w.iter_mut().zip(x) {
                    *g += err * xi;
                }
                grad_b += err;
            }
            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= self.learning_rate * (g / n + l2 * *w);
            }
            model.bias -= self.learning_rate * grad_b / n;
        }
        Ok(model)
    }

    fn report(
        &self,
        labels: &[String],
        samples: &[&TrainingSample],
        model: ClassifierModel,
    ) -> TrainingReport {
        let score = model.score(samples.iter().copied());
        let weights = labels
            .iter()
            .zip(&model.weights)
            .map(|(label, weight)| RankedWeight {
                label: label.clone(),
                weight: *weight,
            })
            .collect::<Vec<_>>();
        let mut weight_ranking = weights.clone();
        weight_ranking.sort_by(|a, b| match b.weight.abs().total_cmp(&a.weight.abs()) {
            Ordering::Equal => a.label.cmp(&b.label),
            ord => ord,
        });
        weight_ranking.truncate(self.ranking_size);
        TrainingReport {
            samples: score.samples,
            accuracy: score.accuracy,
            log_loss: score.log_loss,
            bias: model.bias,
            weights,
            weight_ranking,
            model,
        }
    }
}

fn feature_moments(samples: &[&TrainingSample], dimension: usize) -> (Vec<f64>, Vec<f64>) {
    let mut means = Vec::with_capacity(dimension);
    let mut stds = Vec::with_capacity(dimension);
    for j in 0..dimension {
        let values = samples
            .iter()
            .map(|s| s.features[j])
            .filter(|v| v.is_finite())
            .collect::<Vec<_>>();
        if values.is_empty() {
            means.push(0.0);
            stds.push(1.0);
            continue;
        }
        #[expect(clippy::cast_precision_loss)]
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        means.push(mean);
        stds.push(if std > 0.0 { std } else { 1.0 });
    }
    (means, stds)
}

/// Numerically stable logistic function.
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn sample_log_loss(p: f64, label: bool) -> f64 {
    if label {
        -(p + LOG_LOSS_EPSILON).ln()
    } else {
        -(1.0 - p + LOG_LOSS_EPSILON).ln()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use fieldrank_core::ClassifierConfig;

    use super::*;

    fn sample(i: usize, features: Vec<f64>, label: bool) -> TrainingSample {
        TrainingSample {
            event_id: "e".to_owned(),
            player_id: format!("p{i}"),
            features,
            finish: if label { 1 } else { 50 },
            label,
        }
    }

    #[expect(clippy::cast_precision_loss)]
    fn clusters() -> TrainingSet {
        let mut samples = vec![];
        for i in 0..20 {
            let jitter = (i % 5) as f64 * 0.1;
            samples.push(sample(i, vec![2.0 + jitter, 1.5 - jitter], true));
            samples.push(sample(100 + i, vec![-2.0 - jitter, -1.5 + jitter], false));
        }
        TrainingSet {
            feature_labels: vec!["strength".to_owned(), "form".to_owned()],
            samples,
        }
    }

    fn classifier() -> LogisticClassifier {
        LogisticClassifier::from_config(&ClassifierConfig::default())
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_abs_diff_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
        assert_abs_diff_eq!(sigmoid(2.0) + sigmoid(-2.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_separable_clusters() {
        let outcome = classifier().train(&clusters(), 0.0);
        let report = outcome.report().unwrap();
        assert!(report.accuracy >= 0.9);
        assert!(report.log_loss.is_finite());
        assert!(report.log_loss < 0.3);
        assert_eq!(report.samples, 40);
        assert!(report.weights.iter().all(|w| w.weight > 0.0));
    }

    #[test]
    fn test_training_is_deterministic() {
        let a = classifier().train(&clusters(), 0.01);
        let b = classifier().train(&clusters(), 0.01);
        assert_eq!(a, b);
    }

    #[test]
    fn test_l2_shrinks_weights() {
        let loose = classifier().train(&clusters(), 0.0);
        let tight = classifier().train(&clusters(), 0.1);
        let norm = |o: &TrainingOutcome| {
            o.report()
                .unwrap()
                .model
                .weights
                .iter()
                .map(|w| w * w)
                .sum::<f64>()
        };
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn test_too_few_samples() {
        let mut set = clusters();
        set.samples.truncate(9);
        let outcome = classifier().train(&set, 0.0);
        assert_eq!(
            outcome,
            TrainingOutcome::Unavailable {
                reason: UnavailableReason::TooFewSamples { required: 10 },
                sample_count: 9,
            }
        );
    }

    #[test]
    fn test_dimension_mismatch_is_unavailable() {
        let mut set = clusters();
        set.samples[3].features.push(1.0);
        let outcome = classifier().train(&set, 0.0);
        assert!(matches!(
            outcome,
            TrainingOutcome::Unavailable {
                reason: UnavailableReason::DimensionMismatch { expected: 2 },
                ..
            }
        ));
    }

    #[test]
    fn test_missing_values_are_imputed() {
        let mut set = clusters();
        set.samples[0].features[1] = f64::NAN;
        let report = classifier().train(&set, 0.0).report().cloned().unwrap();
        assert!(report.log_loss.is_finite());
        let model = &report.model;
        // an all-missing row sits at the mean, its logit is the bias alone
        assert_abs_diff_eq!(
            model.predict_proba(&[f64::NAN, f64::NAN]),
            sigmoid(model.bias),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_weight_ranking_is_truncated() {
        let config = ClassifierConfig {
            ranking_size: 1,
            ..ClassifierConfig::default()
        };
        let outcome = LogisticClassifier::from_config(&config).train(&clusters(), 0.0);
        let report = outcome.report().unwrap();
        assert_eq!(report.weight_ranking.len(), 1);
        assert_eq!(report.weights.len(), 2);
    }
}
