use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use fieldrank_core::{TemplateRepository, WeightedSumRanker};
use fieldrank_training::pipeline::Pipeline;

use crate::{
    command::{self, CommonArg, RunArg},
    schema::{report::OptimizationOutput, template_file::JsonTemplateRepository},
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct OptimizeArg {
    #[clap(flatten)]
    common: CommonArg,
    #[clap(flatten)]
    run: RunArg,
    /// Prior template name
    #[arg(long, default_value = "default")]
    pub(super) template: String,
    /// Template JSON file; a uniform template is used when omitted
    #[arg(long)]
    pub(super) templates: Option<PathBuf>,
    /// Number of search trials
    #[arg(long)]
    pub(super) max_tests: Option<usize>,
    /// Threads used to score each batch of `search.batch_size` candidates
    #[arg(long)]
    pub(super) workers: Option<usize>,
    /// Store the winning weights in the template file under this name
    #[arg(long, requires = "templates")]
    pub(super) save_as: Option<String>,
}

pub(crate) fn run(arg: &OptimizeArg) -> anyhow::Result<()> {
    let OptimizeArg {
        common,
        run,
        template,
        templates,
        max_tests,
        workers,
        save_as,
    } = arg;
    let mut config = common.load_config(run)?;
    if let Some(max_tests) = max_tests {
        config.search.max_tests = *max_tests;
    }
    if let Some(workers) = workers {
        config.search.workers = *workers;
    }
    config.validate().context("Invalid run configuration")?;

    let dataset = util::read_dataset_file(&common.dataset)?;
    let mut repo = templates
        .as_ref()
        .map(JsonTemplateRepository::open)
        .transpose()?;
    let prior = match &repo {
        Some(repo) => repo
            .get(template)
            .with_context(|| format!("Failed to load template '{template}'"))?,
        None => dataset.uniform_template(),
    };

    let ranker = WeightedSumRanker::new(dataset.metrics.clone());
    let pipeline = Pipeline {
        generator: &ranker,
        catalog: &dataset.metrics,
        events: &dataset.events,
        config: &config,
    };
    let mut rng = command::random_source(&config);
    let report = pipeline.optimize(&prior, dataset.validation_prior.as_ref(), &mut rng)?;

    let best = &report.search.best;
    tracing::info!(
        baseline = report.search.baseline.score.combined_score,
        best = best.score.combined_score,
        best_trial = best.trial,
        improvements = report.search.improvements.len(),
        "optimization finished"
    );

    if let (Some(name), Some(repo)) = (save_as, repo.as_mut()) {
        repo.put(name, best.weights.clone())?;
        repo.save()?;
        tracing::info!(name = name.as_str(), "saved winning weights");
    }

    let output = OptimizationOutput {
        generated_at: Utc::now(),
        seed: rng.seed(),
        template: template.clone(),
        weights: best.weights.flatten(),
        score: best.score,
        report,
    };
    Output::save_json(&output, common.output.clone())
}
