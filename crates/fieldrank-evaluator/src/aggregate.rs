//! Scoring a weight set across many events.

use fieldrank_core::{
    CoreError, EventData, FeatureVector, GroundTruth, MetricCatalog, RankingGenerator, WeightSet,
};
use fieldrank_stats::descriptive::weighted_mean;
use serde::{Deserialize, Serialize};

use crate::ranking_evaluator::{RankingEvaluation, RankingEvaluator};

/// An event with its finish lookup built once.
#[derive(Debug, Clone)]
pub struct PreparedEvent {
    pub event_id: String,
    pub season: Option<i32>,
    pub field: Vec<FeatureVector>,
    pub truth: GroundTruth,
}

/// Events ready to be ranked and scored repeatedly.
#[derive(Debug, Clone, Default)]
pub struct EventSuite {
    events: Vec<PreparedEvent>,
}

impl EventSuite {
    /// Validates every event against `catalog` and builds its ground truth.
    pub fn new(
        catalog: &MetricCatalog,
        events: &[EventData],
        synthetic_worst_rank: bool,
    ) -> Result<Self, CoreError> {
        let events = events
            .iter()
            .map(|event| {
                event.validate(catalog)?;
                Ok(PreparedEvent {
                    event_id: event.event_id.clone(),
                    season: event.season,
                    field: event.field.clone(),
                    truth: event.ground_truth(synthetic_worst_rank),
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;
        tracing::debug!(events = events.len(), "prepared event suite");
        Ok(Self { events })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PreparedEvent> + '_ {
        self.events.iter()
    }

    /// Events whose ids are in `event_ids`, in suite order.
    #[must_use]
    pub fn subset(&self, event_ids: &[String]) -> Self {
        Self {
            events: self
                .events
                .iter()
                .filter(|e| event_ids.contains(&e.event_id))
                .cloned()
                .collect(),
        }
    }

    /// Ranks and scores every event under `weights`.
    pub fn evaluate<G>(
        &self,
        generator: &G,
        weights: &WeightSet,
        evaluator: &RankingEvaluator,
    ) -> Result<Vec<FoldResult>, CoreError>
    where
        G: RankingGenerator + ?Sized,
    {
        self.events
            .iter()
            .map(|event| {
                let ranking = generator.rank_players(&event.field, weights)?;
                Ok(FoldResult {
                    label: event.event_id.clone(),
                    evaluation: evaluator.evaluate(&ranking, &event.truth),
                })
            })
            .collect()
    }
}

/// One labeled evaluation: an event, a season, or a cross-validation fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub label: String,
    pub evaluation: RankingEvaluation,
}

/// Evaluations combined by a mean weighted by matched players.
///
/// Unavailable evaluations carry no weight. An aggregate with no available
/// evaluation is itself unavailable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateEvaluation {
    pub available: bool,
    pub folds: usize,
    pub matched_players: usize,
    pub correlation: f64,
    pub rmse: f64,
    pub mae: f64,
    pub top10: f64,
    pub top20: f64,
    pub top20_weighted_score: f64,
}

impl AggregateEvaluation {
    #[must_use]
    pub fn from_evaluations<'a, I>(evaluations: I) -> Self
    where
        I: IntoIterator<Item = &'a RankingEvaluation>,
    {
        let all = evaluations.into_iter().collect::<Vec<_>>();
        let usable = all.iter().copied().filter(|e| e.available).collect::<Vec<_>>();
        let matched_players = usable.iter().map(|e| e.matched_players).sum();

        #[expect(clippy::cast_precision_loss)]
        let mean = |f: fn(&RankingEvaluation) -> f64| {
            weighted_mean(usable.iter().map(|e| (f(e), e.matched_players as f64))).unwrap_or(0.0)
        };
        Self {
            available: matched_players > 0,
            folds: all.len(),
            matched_players,
            correlation: mean(|e| e.correlation),
            rmse: mean(|e| e.rmse),
            mae: mean(|e| e.mae),
            top10: mean(|e| e.top10),
            top20: mean(|e| e.top20),
            top20_weighted_score: mean(|e| e.top20_weighted_score),
        }
    }

    #[must_use]
    pub fn from_folds(folds: &[FoldResult]) -> Self {
        Self::from_evaluations(folds.iter().map(|f| &f.evaluation))
    }
}
