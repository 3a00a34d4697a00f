use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One player's metric readings for one event.
///
/// Non-finite values are missing readings. They serialize as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub player_id: String,
    #[serde(with = "nullable_values")]
    pub values: Vec<f64>,
}

impl FeatureVector {
    #[must_use]
    pub fn new(player_id: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            player_id: player_id.into(),
            values,
        }
    }

    /// Number of finite readings.
    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    /// Fraction of readings that are present, `0.0` for an empty vector.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn coverage(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.valid_count() as f64 / self.values.len() as f64
    }

    /// Returns the reading at `index` if it is present.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().filter(|v| v.is_finite())
    }
}

/// A player's result in one event.
///
/// `finish_position` is `None` for withdrawals and cuts without a recorded
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeLabel {
    pub player_id: String,
    pub finish_position: Option<u32>,
}

impl OutcomeLabel {
    #[must_use]
    pub fn new(player_id: impl Into<String>, finish_position: Option<u32>) -> Self {
        Self {
            player_id: player_id.into(),
            finish_position,
        }
    }
}

/// One entry of a generated ranking.
///
/// `rank` is 1-based. `metrics` holds the per-metric contributions the
/// generator used, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRanking {
    pub player_id: String,
    pub rank: u32,
    pub score: f64,
    pub metrics: Vec<f64>,
}

mod nullable_values {
    use super::{Deserialize, Deserializer, Serialize, Serializer};

    pub(super) fn serialize<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        values
            .iter()
            .map(|v| v.is_finite().then_some(*v))
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}
