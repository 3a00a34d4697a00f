use chrono::Utc;
use fieldrank_model::signal;

use crate::{
    command::{CommonArg, RunArg},
    schema::report::CorrelationOutput,
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct CorrelateArg {
    #[clap(flatten)]
    common: CommonArg,
}

pub(crate) fn run(arg: &CorrelateArg) -> anyhow::Result<()> {
    let CorrelateArg { common } = arg;
    let config = common.load_config(&RunArg::default())?;
    let dataset = util::read_dataset_file(&common.dataset)?;

    let correlations =
        signal::metric_correlations(&dataset.metrics, &dataset.events, &config.training_set)?;
    for entry in &correlations {
        tracing::info!(
            metric = entry.label.as_str(),
            correlation = entry.correlation,
            samples = entry.sample_count,
            low_confidence = entry.low_confidence,
            "metric correlation"
        );
    }

    let output = CorrelationOutput {
        generated_at: Utc::now(),
        correlations,
    };
    Output::save_json(&output, common.output.clone())
}
