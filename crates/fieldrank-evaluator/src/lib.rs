//! Ranking quality evaluation.
//!
//! - [`ranking_evaluator`] scores one predicted ranking against one event's
//!   ground truth and runs the stress test.
//! - [`aggregate`] prepares events once, ranks and scores every event for a
//!   weight set, and combines per-event results weighted by matched players.
//! - [`fitness`] turns an aggregate into the optimizer's [`fitness::CombinedScore`].

pub mod aggregate;
pub mod fitness;
pub mod ranking_evaluator;
