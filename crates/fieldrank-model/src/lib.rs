//! Learned signal: metric correlations, a top-N logistic classifier, and
//! event-grouped cross-validation.
//!
//! This crate turns historical events into two kinds of evidence about which
//! metrics matter:
//!
//! 1. **Correlation signal** ([`signal`]) - per-metric Spearman correlation
//!    between raw readings and finishing performance.
//! 2. **Model signal** ([`logistic`], [`cross_validation`]) - an L2-regularized
//!    logistic regression predicting "finished in the top N", with the L2
//!    strength chosen by held-out log-loss and a reliability score describing
//!    how much the result can be trusted.
//!
//! # Pipeline
//!
//! ```text
//! MetricCatalog + EventData
//!     ↓ TrainingSet::from_events (coverage filter, top-N labels)
//! TrainingSet
//!     ↓ CrossValidator::run (folds grouped by event, L2 grid)
//! CrossValidationReport
//!     ├─ selected L2 + final ClassifierModel (retrained on all samples)
//!     └─ Reliability (quality × event adequacy × sample adequacy)
//! ```
//!
//! # Not Enough Data
//!
//! Nothing here fails because data is thin. The classifier returns
//! [`logistic::TrainingOutcome::Unavailable`] below its sample floor, the
//! cross-validator returns [`cross_validation::CrossValidationOutcome::Unavailable`]
//! with fewer than three events, and correlations with fewer than five samples
//! are reported as zero with `low_confidence` set.

pub mod cross_validation;
pub mod dataset;
pub mod logistic;
pub mod signal;
