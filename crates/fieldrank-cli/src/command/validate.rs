use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use fieldrank_core::{TemplateRepository, WeightedSumRanker};
use fieldrank_training::pipeline::Pipeline;

use crate::{
    command::{self, CommonArg, RunArg},
    schema::{report::ValidationOutput, template_file::JsonTemplateRepository},
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ValidateArg {
    #[clap(flatten)]
    common: CommonArg,
    #[clap(flatten)]
    run: RunArg,
    /// Template JSON file holding both weight sets
    #[arg(long)]
    templates: PathBuf,
    /// Template name of the reference weights
    #[arg(long)]
    baseline: String,
    /// Template name of the weights under test
    #[arg(long)]
    optimized: String,
}

pub(crate) fn run(arg: &ValidateArg) -> anyhow::Result<()> {
    let ValidateArg {
        common,
        run,
        templates,
        baseline,
        optimized,
    } = arg;
    let config = common.load_config(run)?;
    let dataset = util::read_dataset_file(&common.dataset)?;
    let repo = JsonTemplateRepository::open(templates)?;
    let load = |name: &str| {
        repo.get(name)
            .with_context(|| format!("Failed to load template '{name}'"))
    };
    let baseline_weights = load(baseline)?;
    let optimized_weights = load(optimized)?;

    let ranker = WeightedSumRanker::new(dataset.metrics.clone());
    let pipeline = Pipeline {
        generator: &ranker,
        catalog: &dataset.metrics,
        events: &dataset.events,
        config: &config,
    };
    let mut rng = command::random_source(&config);
    let result = pipeline.validate(&baseline_weights, &optimized_weights, &mut rng)?;

    let output = ValidationOutput {
        generated_at: Utc::now(),
        seed: rng.seed(),
        baseline: baseline.clone(),
        optimized: optimized.clone(),
        result,
    };
    Output::save_json(&output, common.output.clone())
}
