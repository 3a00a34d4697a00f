use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fieldrank_core::{RunConfig, SeededRandom};

use crate::util;

use self::{
    correlate::CorrelateArg, optimize::OptimizeArg, train_model::TrainModelArg,
    validate::ValidateArg,
};

mod correlate;
mod optimize;
mod train_model;
mod validate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Correlate every metric with finishing position
    Correlate(#[clap(flatten)] CorrelateArg),
    /// Cross-validate the top-N classifier
    TrainModel(#[clap(flatten)] TrainModelArg),
    /// Blend a template with learned signal and search for better weights
    Optimize(#[clap(flatten)] OptimizeArg),
    /// Compare two templates season by season
    Validate(#[clap(flatten)] ValidateArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Correlate(arg) => correlate::run(&arg)?,
        Mode::TrainModel(arg) => train_model::run(&arg)?,
        Mode::Optimize(arg) => optimize::run(&arg)?,
        Mode::Validate(arg) => validate::run(&arg)?,
    }
    Ok(())
}

/// Options shared by every subcommand
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct CommonArg {
    /// Dataset JSON file (metrics, events, optional validation prior)
    #[arg(long)]
    dataset: PathBuf,
    /// Run configuration JSON file; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Overrides for the run configuration
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct RunArg {
    /// Seed phrase; a random seed is drawn when neither this nor the config sets one
    #[arg(long)]
    seed: Option<String>,
    /// Number of cross-validation folds (leave-one-event-out when omitted)
    #[arg(long)]
    folds: Option<usize>,
}

impl CommonArg {
    fn load_config(&self, run: &RunArg) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json_file::<RunConfig, _>("config", path)?,
            None => RunConfig::default(),
        };
        if let Some(seed) = &run.seed {
            config.seed = Some(seed.clone());
        }
        if let Some(folds) = run.folds {
            config.cross_validation.folds = Some(folds);
        }
        config.validate().context("Invalid run configuration")?;
        Ok(config)
    }
}

fn random_source(config: &RunConfig) -> SeededRandom {
    let rng = SeededRandom::from_phrase(config.seed.as_deref());
    tracing::info!(seed = ?rng.seed(), "seeded random source");
    rng
}
