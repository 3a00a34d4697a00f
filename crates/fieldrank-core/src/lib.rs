//! Shared data model for ranking, training, and weight optimization.
//!
//! This crate holds the types every other crate in the workspace agrees on:
//! the metric catalog, per-player feature vectors and finish outcomes, the
//! nested [`WeightSet`], the immutable [`RunConfig`], and the deterministic
//! [`RandomSource`] contract. It also defines the two collaborator seams the
//! engine calls out to:
//!
//! - [`RankingGenerator`] turns a field of feature vectors and a weight set into
//!   a ranked list. [`WeightedSumRanker`] is the reference implementation.
//! - [`TemplateRepository`] stores named weight templates.
//!
//! # Data Flow
//!
//! ```text
//! MetricCatalog + EventData (field, results)
//!     ↓ ranked by
//! RankingGenerator (WeightSet)
//!     ↓ produces
//! PlayerRanking list
//!     ↓ compared against
//! GroundTruth (best finish per player)
//! ```
//!
//! # Weight Representation
//!
//! Weights are always held in nested form (`group → metric → weight`). The flat
//! `"Group::Metric"` form only exists at the template boundary, see
//! [`FlatTemplate`].

pub use self::{
    config::*, error::*, event::*, metric::*, player::*, prior::*, random::*, ranker::*,
    template::*, weight_set::*,
};

mod config;
mod error;
mod event;
mod metric;
mod player;
mod prior;
mod random;
mod ranker;
mod template;
mod weight_set;
