use chrono::Utc;
use fieldrank_core::WeightedSumRanker;
use fieldrank_training::pipeline::Pipeline;

use crate::{
    command::{self, CommonArg, RunArg},
    schema::report::ModelOutput,
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainModelArg {
    #[clap(flatten)]
    common: CommonArg,
    #[clap(flatten)]
    run: RunArg,
}

pub(crate) fn run(arg: &TrainModelArg) -> anyhow::Result<()> {
    let TrainModelArg { common, run } = arg;
    let config = common.load_config(run)?;
    let dataset = util::read_dataset_file(&common.dataset)?;
    let ranker = WeightedSumRanker::new(dataset.metrics.clone());
    let pipeline = Pipeline {
        generator: &ranker,
        catalog: &dataset.metrics,
        events: &dataset.events,
        config: &config,
    };

    let mut rng = command::random_source(&config);
    let analysis = pipeline.analyze(&mut rng)?;
    match analysis.cross_validation.report() {
        Some(report) => tracing::info!(
            samples = analysis.training_samples,
            l2 = report.selected_l2,
            held_out_log_loss = report.held_out_log_loss,
            reliability = report.reliability.score,
            "model trained"
        ),
        None => tracing::warn!(samples = analysis.training_samples, "model unavailable"),
    }

    let output = ModelOutput {
        generated_at: Utc::now(),
        seed: rng.seed(),
        analysis,
    };
    Output::save_json(&output, common.output.clone())
}
