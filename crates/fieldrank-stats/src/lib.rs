//! Statistical primitives for ranking evaluation and weight tuning.
//!
//! This crate provides the numeric building blocks used by the rest of the
//! workspace. Everything here operates on plain `f64` slices and has no
//! knowledge of players, events, or weight templates.
//!
//! - **Descriptive statistics**: mean, median, variance, standard deviation
//! - **Rank correlation**: mid-rank tie handling, Pearson and Spearman correlation
//! - **Ranking quality**: NDCG-style weighted top-N score and top-N accuracy
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`correlation`]: Ranks and correlation coefficients
//! - [`ranking`]: Top-N ranking quality measures
//!
//! # Degenerate Input
//!
//! None of the functions in this crate panic or return `NaN` for "not enough
//! data". Correlations fall back to `0.0` for empty, mismatched, or constant
//! input, and the ranking scores return `0.0` when there is nothing to score.
//!
//! # Examples
//!
//! ## Rank correlation
//!
//! ```
//! use fieldrank_stats::correlation;
//!
//! assert_eq!(correlation::rank(&[1.0, 1.0, 2.0]), vec![1.5, 1.5, 3.0]);
//!
//! let x = [1.0, 2.0, 3.0, 4.0];
//! let y = [10.0, 20.0, 30.0, 40.0];
//! assert!((correlation::spearman(&x, &y) - 1.0).abs() < 1e-12);
//! ```
//!
//! ## Weighted top-N
//!
//! ```
//! use fieldrank_stats::ranking;
//!
//! // Predicted ranks and actual finishes, one entry per matched player.
//! let predicted = [1.0, 2.0, 3.0];
//! let actual = [1.0, 2.0, 3.0];
//! assert_eq!(ranking::weighted_top_n(&predicted, &actual, 3), 100.0);
//! ```

pub mod correlation;
pub mod descriptive;
pub mod ranking;
