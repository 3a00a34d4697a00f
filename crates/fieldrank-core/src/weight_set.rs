use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Weights keyed by name.
///
/// `BTreeMap` keeps iteration order stable, which the optimizer's
/// reproducibility depends on.
pub type WeightMap = BTreeMap<String, f64>;

/// Tolerance used when checking that a weight group sums to one.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;

/// Divides every weight by the sum of all weights.
///
/// Returns the input unchanged when the sum is exactly zero (including the
/// empty map).
///
/// ```
/// # use fieldrank_core::{WeightMap, normalize};
/// let weights = WeightMap::from([("a".to_owned(), 1.0), ("b".to_owned(), 3.0)]);
/// let normalized = normalize(&weights);
/// assert_eq!(normalized["a"], 0.25);
/// assert!(normalize(&WeightMap::new()).is_empty());
/// ```
#[must_use]
pub fn normalize(weights: &WeightMap) -> WeightMap {
    let sum = weights.values().sum::<f64>();
    if sum == 0.0 {
        return weights.clone();
    }
    weights
        .iter()
        .map(|(k, v)| (k.clone(), v / sum))
        .collect()
}

/// Divides every weight by the sum of absolute weights.
///
/// Signs are preserved, only magnitudes are rebalanced. For non-negative
/// weights this is identical to [`normalize`].
#[must_use]
pub fn normalize_by_magnitude(weights: &WeightMap) -> WeightMap {
    let sum = weights.values().map(|v| v.abs()).sum::<f64>();
    if sum == 0.0 {
        return weights.clone();
    }
    weights
        .iter()
        .map(|(k, v)| (k.clone(), v / sum))
        .collect()
}

/// Group and metric weights for one ranking template.
///
/// Canonical nested representation: `group → weight` plus
/// `group → metric → weight`. A metric may appear under more than one group;
/// its effective weight is the sum of `group_weight * metric_weight` over those
/// groups.
///
/// A `WeightSet` is never modified in place. Every transform returns a new
/// value, and [`WeightSet::normalized`] restores the invariants:
///
/// - within each group, absolute metric weights sum to 1 when any is non-zero
/// - group weights sum to 1 when any is non-zero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightSet {
    group_weights: WeightMap,
    metric_weights: BTreeMap<String, WeightMap>,
}

impl WeightSet {
    /// Builds a weight set; groups that only appear in `metric_weights` get a
    /// group weight of zero.
    #[must_use]
    pub fn new(mut group_weights: WeightMap, metric_weights: BTreeMap<String, WeightMap>) -> Self {
        for group in metric_weights.keys() {
            group_weights.entry(group.clone()).or_insert(0.0);
        }
        Self {
            group_weights,
            metric_weights,
        }
    }

    #[must_use]
    pub fn group_weights(&self) -> &WeightMap {
        &self.group_weights
    }

    #[must_use]
    pub fn metric_weights(&self) -> &BTreeMap<String, WeightMap> {
        &self.metric_weights
    }

    /// Metric weights of one group, empty if the group has none.
    #[must_use]
    pub fn group_metrics(&self, group: &str) -> Option<&WeightMap> {
        self.metric_weights.get(group)
    }

    #[must_use]
    pub fn group_weight(&self, group: &str) -> f64 {
        self.group_weights.get(group).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn metric_weight(&self, group: &str, metric: &str) -> f64 {
        self.metric_weights
            .get(group)
            .and_then(|m| m.get(metric))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.group_weights.keys().map(String::as_str)
    }

    /// Distinct metric labels across all groups, sorted.
    #[must_use]
    pub fn metric_labels(&self) -> Vec<&str> {
        let mut labels = self
            .metric_weights
            .values()
            .flat_map(|m| m.keys().map(String::as_str))
            .collect::<Vec<_>>();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Groups a metric belongs to.
    pub fn groups_of<'a>(&'a self, metric: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.metric_weights
            .iter()
            .filter(move |(_, metrics)| metrics.contains_key(metric))
            .map(|(group, _)| group.as_str())
    }

    /// Effective weight per metric: `Σ group_weight * metric_weight`.
    #[must_use]
    pub fn effective_metric_weights(&self) -> WeightMap {
        let mut effective = WeightMap::new();
        for (group, metrics) in &self.metric_weights {
            let group_weight = self.group_weight(group);
            for (metric, weight) in metrics {
                *effective.entry(metric.clone()).or_insert(0.0) += group_weight * weight;
            }
        }
        effective
    }

    /// Returns a copy with new group weights; groups without an entry keep theirs.
    #[must_use]
    pub fn with_group_weights(&self, group_weights: &WeightMap) -> Self {
        let mut next = self.clone();
        for (group, weight) in group_weights {
            next.group_weights.insert(group.clone(), *weight);
        }
        next
    }

    /// Returns a copy with one group's metric weights replaced.
    #[must_use]
    pub fn with_group_metrics(&self, group: &str, metrics: WeightMap) -> Self {
        let mut next = self.clone();
        next.group_weights.entry(group.to_owned()).or_insert(0.0);
        next.metric_weights.insert(group.to_owned(), metrics);
        next
    }

    /// Returns a copy with every metric weight mapped through `f(group, metric, weight)`.
    #[must_use]
    pub fn map_metric_weights<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str, &str, f64) -> f64,
    {
        let metric_weights = self
            .metric_weights
            .iter()
            .map(|(group, metrics)| {
                let metrics = metrics
                    .iter()
                    .map(|(metric, w)| (metric.clone(), f(group, metric, *w)))
                    .collect();
                (group.clone(), metrics)
            })
            .collect();
        Self {
            group_weights: self.group_weights.clone(),
            metric_weights,
        }
    }

    /// Returns a copy that satisfies the normalization invariants.
    ///
    /// Group weights are normalized by their sum; metric weights within each
    /// group are normalized by their absolute sum so negative weights keep
    /// their sign.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            group_weights: normalize(&self.group_weights),
            metric_weights: self
                .metric_weights
                .iter()
                .map(|(group, metrics)| (group.clone(), normalize_by_magnitude(metrics)))
                .collect(),
        }
    }

    /// Whether the set satisfies the normalization invariants within `tolerance`.
    #[must_use]
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        let sums_to_one = |values: &mut dyn Iterator<Item = f64>| {
            let (sum, any_nonzero) = values.fold((0.0, false), |(sum, nz), v| {
                (sum + v, nz || v != 0.0)
            });
            !any_nonzero || (sum - 1.0).abs() <= tolerance
        };
        sums_to_one(&mut self.group_weights.values().copied())
            && self
                .metric_weights
                .values()
                .all(|m| sums_to_one(&mut m.values().map(|v| v.abs())))
    }

    /// Converts to the flat template form with `"Group::Metric"` keys.
    #[must_use]
    pub fn flatten(&self) -> FlatTemplate {
        let metrics = self
            .metric_weights
            .iter()
            .flat_map(|(group, metrics)| {
                metrics
                    .iter()
                    .map(move |(metric, w)| (format!("{group}{KEY_SEPARATOR}{metric}"), *w))
            })
            .collect();
        FlatTemplate {
            groups: self.group_weights.clone(),
            metrics,
        }
    }

    /// Builds a nested weight set from the flat template form.
    pub fn nest(flat: &FlatTemplate) -> Result<Self, CoreError> {
        let mut metric_weights = BTreeMap::<String, WeightMap>::new();
        for (key, weight) in &flat.metrics {
            let (group, metric) = key
                .split_once(KEY_SEPARATOR)
                .filter(|(g, m)| !g.is_empty() && !m.is_empty())
                .ok_or_else(|| CoreError::MalformedTemplateKey { key: key.clone() })?;
            metric_weights
                .entry(group.to_owned())
                .or_default()
                .insert(metric.to_owned(), *weight);
        }
        let set = Self::new(flat.groups.clone(), metric_weights);
        if set.group_weights.is_empty() {
            return Err(CoreError::EmptyTemplate);
        }
        Ok(set)
    }
}

const KEY_SEPARATOR: &str = "::";

/// Flat weight template as stored at the template boundary.
///
/// `groups` maps group names to group weights; `metrics` uses
/// `"Group::Metric"` keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatTemplate {
    pub groups: WeightMap,
    pub metrics: WeightMap,
}
