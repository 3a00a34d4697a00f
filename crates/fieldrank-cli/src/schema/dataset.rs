use fieldrank_core::{EventData, MetricCatalog, ValidationPriors, WeightMap, WeightSet};
use serde::{Deserialize, Serialize};

/// Input document shared by every subcommand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub metrics: MetricCatalog,
    pub events: Vec<EventData>,
    /// Externally validated weights keyed by metric label
    #[serde(default)]
    pub validation_prior: Option<ValidationPriors>,
}

impl Dataset {
    /// Single-group template weighting every catalog metric equally.
    ///
    /// Used when no template file is given.
    #[must_use]
    pub fn uniform_template(&self) -> WeightSet {
        let metrics = self
            .metrics
            .labels()
            .map(|label| (label.to_owned(), 1.0))
            .collect::<WeightMap>();
        WeightSet::new(
            WeightMap::from([(UNIFORM_GROUP.to_owned(), 1.0)]),
            [(UNIFORM_GROUP.to_owned(), metrics)].into(),
        )
        .normalized()
    }
}

const UNIFORM_GROUP: &str = "all";
