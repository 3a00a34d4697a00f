use chrono::{DateTime, Utc};
use fieldrank_core::{FlatTemplate, SearchSeed};
use fieldrank_evaluator::fitness::CombinedScore;
use fieldrank_model::signal::CorrelationEntry;
use fieldrank_training::{
    pipeline::{ModelAnalysis, OptimizationReport},
    validation::ValidationComparison,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationOutput {
    pub generated_at: DateTime<Utc>,
    pub correlations: Vec<CorrelationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOutput {
    pub generated_at: DateTime<Utc>,
    /// Seed of the fold shuffle
    pub seed: SearchSeed,
    pub analysis: ModelAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOutput {
    pub generated_at: DateTime<Utc>,
    pub seed: SearchSeed,
    /// Name of the prior template the run started from
    pub template: String,
    /// Winning weights in template form
    pub weights: FlatTemplate,
    pub score: CombinedScore,
    pub report: OptimizationReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutput {
    pub generated_at: DateTime<Utc>,
    pub seed: SearchSeed,
    pub baseline: String,
    pub optimized: String,
    pub result: ValidationComparison,
}
