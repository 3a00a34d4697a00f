//! The whole tuning chain over one dataset.
//!
//! ```text
//! metric_correlations ─┐
//! TrainingSet ─ CrossValidator ─ ModelSignal ─ WeightBlender ─ RandomSearchOptimizer
//! ```
//!
//! Every step draws from the same [`RandomSource`], in this order: fold
//! assignment during cross-validation, then search proposals. A run is
//! therefore reproducible from the seed phrase alone.

use fieldrank_core::{
    CoreError, EventData, MetricCatalog, RandomSource, RankingGenerator, RunConfig,
    ValidationPriors, WeightSet,
};
use fieldrank_evaluator::{
    aggregate::EventSuite,
    fitness::FitnessOracle,
    ranking_evaluator::{RankScale, RankingEvaluator},
};
use fieldrank_model::{
    cross_validation::{CrossValidationOutcome, CrossValidator},
    dataset::TrainingSet,
    signal::{self, CorrelationEntry},
};
use serde::{Deserialize, Serialize};

use crate::{
    blend::{BlendOutcome, ModelSignal, WeightBlender},
    search::{RandomSearchOptimizer, SearchError, SearchResult},
    validation::{MultiYearValidationRunner, ValidationComparison},
    weights,
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PipelineError {
    #[display("invalid input")]
    Input(CoreError),
    #[display("weight search failed")]
    Search(SearchError),
}

/// Learned evidence about a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAnalysis {
    pub correlations: Vec<CorrelationEntry>,
    pub training_samples: usize,
    pub cross_validation: CrossValidationOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub analysis: ModelAnalysis,
    pub blend: BlendOutcome,
    pub search: SearchResult,
}

/// A dataset, a ranking generator and the run configuration.
#[derive(Debug)]
pub struct Pipeline<'a, G: ?Sized> {
    pub generator: &'a G,
    pub catalog: &'a MetricCatalog,
    pub events: &'a [EventData],
    pub config: &'a RunConfig,
}

impl<G> Pipeline<'_, G>
where
    G: RankingGenerator + Sync + ?Sized,
{
    /// Correlations, training set and cross-validated classifier.
    pub fn analyze<R>(&self, rng: &mut R) -> Result<ModelAnalysis, CoreError>
    where
        R: RandomSource + ?Sized,
    {
        let correlations =
            signal::metric_correlations(self.catalog, self.events, &self.config.training_set)?;
        let set = TrainingSet::from_events(self.catalog, self.events, &self.config.training_set)?;
        let cross_validation = CrossValidator::from_config(self.config).run(&set, rng);
        if let CrossValidationOutcome::Unavailable { reason, .. } = &cross_validation {
            tracing::warn!(%reason, "model signal unavailable, blending with prior only");
        }
        Ok(ModelAnalysis {
            correlations,
            training_samples: set.len(),
            cross_validation,
        })
    }

    /// Blends `template` with learned signal and searches from the blend.
    pub fn optimize<R>(
        &self,
        template: &WeightSet,
        priors: Option<&ValidationPriors>,
        rng: &mut R,
    ) -> Result<OptimizationReport, PipelineError>
    where
        R: RandomSource + ?Sized,
    {
        if template.group_weights().is_empty() {
            return Err(CoreError::EmptyTemplate.into());
        }
        let analysis = self.analyze(rng)?;

        let model_signal = ModelSignal::new(
            analysis.cross_validation.report(),
            analysis.correlations.clone(),
        );
        let blend = WeightBlender::new(self.config.blend.clone()).blend_candidate(
            template,
            &model_signal,
            priors,
        );

        let suite = self.suite()?;
        let alignment_signal = signal::signal_map(&analysis.correlations);
        let optimizer = RandomSearchOptimizer {
            oracle: FitnessOracle {
                generator: self.generator,
                suite: &suite,
                evaluator: self.evaluator(),
                signal: &alignment_signal,
                weights: self.config.fitness.clone(),
            },
            config: self.config.search.clone(),
            bands: priors.map(weights::build_bands).unwrap_or_default(),
        };
        let search = optimizer.run(&blend.weights, rng)?;

        Ok(OptimizationReport {
            analysis,
            blend,
            search,
        })
    }

    /// Re-scores two weight sets season by season on shared folds.
    pub fn validate<R>(
        &self,
        baseline: &WeightSet,
        optimized: &WeightSet,
        rng: &mut R,
    ) -> Result<ValidationComparison, CoreError>
    where
        R: RandomSource + ?Sized,
    {
        let suite = self.suite()?;
        let runner = MultiYearValidationRunner::new(
            self.generator,
            &suite,
            self.evaluator(),
            self.config.cross_validation.folds,
            rng,
        );
        runner.compare_weights(baseline, optimized)
    }

    fn suite(&self) -> Result<EventSuite, CoreError> {
        EventSuite::new(
            self.catalog,
            self.events,
            self.config.training_set.synthetic_worst_rank,
        )
    }

    fn evaluator(&self) -> RankingEvaluator {
        RankingEvaluator::new(RankScale::Raw, self.config.evaluation.clone())
    }
}
