//! Weight tuning: blending prior templates with learned signal, random search,
//! and multi-season re-validation.
//!
//! This crate sits on top of the learned evidence from `fieldrank-model` and
//! the scoring in `fieldrank-evaluator`. It produces the weight sets a ranking
//! generator runs with.
//!
//! # How Tuning Works
//!
//! 1. **Signal** - Per-metric correlations and a cross-validated classifier
//!    describe which metrics predict good finishes
//! 2. **Blend** - The prior template is mixed with the classifier weights,
//!    scaled by how reliable cross-validation found the model to be
//! 3. **Guard** - Externally validated recommendations clamp metric weights to
//!    a band that depends on trend confidence
//! 4. **Search** - Random local search perturbs the blended weights and keeps
//!    whichever set ranks past events best
//! 5. **Validate** - The baseline and the winner are re-scored season by
//!    season and the difference is interpreted
//!
//! # Architecture
//!
//! ```text
//! Prior WeightSet + ModelSignal (+ ValidationPriors)
//!     ↓ WeightBlender
//! Blended candidate
//!     ↓ RandomSearchOptimizer (FitnessOracle as fitness)
//! Winning WeightSet + CombinedScore
//!     ↓ MultiYearValidationRunner
//! Per-season / per-fold summaries + Interpretation
//! ```
//!
//! [`pipeline`] wires the whole chain together for callers that only have a
//! dataset and a template.
//!
//! # Current Limitations
//!
//! - **Single search strategy**: Only multiplicative perturbation of the
//!   incumbent; no population or gradient information
//! - **Heuristic interpretation**: The baseline/optimized comparison is a rule
//!   table, not a significance test

pub mod blend;
pub mod pipeline;
pub mod search;
pub mod validation;
pub mod weights;
