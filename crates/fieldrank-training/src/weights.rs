//! Weight map operations for blending and search.
//!
//! This module provides the building blocks used by
//! [`WeightBlender`](crate::blend::WeightBlender) and
//! [`RandomSearchOptimizer`](crate::search::RandomSearchOptimizer). Every
//! function returns a new map; inputs are never modified.
//!
//! # Operations
//!
//! - **Blending**: [`blend`] and [`blend_by_magnitude`] mix two weight maps
//!   under share percentages
//! - **Group fill**: [`fill_group_weights`] overlays suggested group weights on
//!   a fallback
//! - **Guardrails**: [`GuardrailBand`], [`build_bands`] and [`apply_guardrails`]
//!   keep metric weights near externally validated recommendations
//! - **Perturbation**: [`perturb_groups`] and [`perturb_metrics`] apply
//!   multiplicative noise for random search
//!
//! # Normalization
//!
//! Group weights are normalized by their sum. Metric weights inside a group
//! are normalized by the sum of absolute values, so a metric whose weight was
//! flipped negative keeps its sign while the group magnitudes still sum to one.

use std::collections::BTreeMap;

use fieldrank_core::{
    RandomSource, ValidationPriors, WeightMap, normalize, normalize_by_magnitude, sample_indices,
};
use serde::{Deserialize, Serialize};

fn union_mix(a: &WeightMap, b: &WeightMap, a_share: f64, b_share: f64) -> WeightMap {
    let mut mixed = WeightMap::new();
    for (key, weight) in a {
        *mixed.entry(key.clone()).or_insert(0.0) += a_share * weight;
    }
    for (key, weight) in b {
        *mixed.entry(key.clone()).or_insert(0.0) += b_share * weight;
    }
    mixed
}

/// Blends two weight maps and renormalizes by sum.
///
/// Keys missing on one side count as zero on that side.
///
/// # Examples
///
/// ```
/// use fieldrank_core::WeightMap;
/// use fieldrank_training::weights;
///
/// let prior = WeightMap::from([("a".to_owned(), 1.0)]);
/// let model = WeightMap::from([("b".to_owned(), 1.0)]);
/// let blended = weights::blend(&prior, &model, 0.6, 0.4);
/// assert_eq!(blended["a"], 0.6);
/// assert_eq!(blended["b"], 0.4);
/// ```
#[must_use]
pub fn blend(
    prior: &WeightMap,
    model: &WeightMap,
    prior_share: f64,
    model_share: f64,
) -> WeightMap {
    normalize(&union_mix(prior, model, prior_share, model_share))
}

/// Like [`blend`], but renormalizes by the sum of absolute values so signs
/// survive.
#[must_use]
pub fn blend_by_magnitude(
    prior: &WeightMap,
    model: &WeightMap,
    prior_share: f64,
    model_share: f64,
) -> WeightMap {
    normalize_by_magnitude(&union_mix(prior, model, prior_share, model_share))
}

/// Overlays `suggested` group weights onto `fallback` and renormalizes across
/// the full group set.
///
/// Groups only present in `suggested` are added.
#[must_use]
pub fn fill_group_weights(suggested: &WeightMap, fallback: &WeightMap) -> WeightMap {
    let mut filled = fallback.clone();
    for (group, weight) in suggested {
        filled.insert(group.clone(), *weight);
    }
    normalize(&filled)
}

/// Allowed weight range around a validated recommendation.
///
/// ```text
/// band = [rec * (1 - range), rec * (1 + range)]
/// ```
///
/// where `range` comes from the metric's trend confidence
/// (see [`TrendConfidence::guardrail_range`](fieldrank_core::TrendConfidence::guardrail_range)).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuardrailBand {
    pub min: f64,
    pub max: f64,
}

impl GuardrailBand {
    #[must_use]
    pub fn around(recommended: f64, range: f64) -> Self {
        let a = recommended * (1.0 - range);
        let b = recommended * (1.0 + range);
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Clamps the magnitude of `weight` into the band, keeping its sign.
    #[must_use]
    pub fn clamp(&self, weight: f64) -> f64 {
        let (lo, hi) = (self.min.abs(), self.max.abs());
        let magnitude = weight.abs().clamp(lo.min(hi), lo.max(hi));
        if weight < 0.0 { -magnitude } else { magnitude }
    }

    #[must_use]
    pub fn contains(&self, weight: f64) -> bool {
        let (lo, hi) = (self.min.abs(), self.max.abs());
        (lo.min(hi)..=lo.max(hi)).contains(&weight.abs())
    }
}

/// Guardrail bands keyed by metric label.
pub type GuardrailBands = BTreeMap<String, GuardrailBand>;

/// Builds one band per validated metric.
#[must_use]
pub fn build_bands(priors: &ValidationPriors) -> GuardrailBands {
    priors
        .iter()
        .map(|(metric, prior)| {
            let range = prior.confidence().guardrail_range();
            (
                metric.clone(),
                GuardrailBand::around(prior.recommended_weight, range),
            )
        })
        .collect()
}

/// Clamps every banded metric of one group, then renormalizes the group by
/// magnitude.
///
/// Metrics without a band pass through unchanged before renormalization.
#[must_use]
pub fn apply_guardrails(metrics: &WeightMap, bands: &GuardrailBands) -> WeightMap {
    let clamped = metrics
        .iter()
        .map(|(metric, weight)| {
            let w = match bands.get(metric) {
                Some(band) if !band.contains(*weight) => {
                    let clamped = band.clamp(*weight);
                    tracing::debug!(
                        metric = metric.as_str(),
                        from = weight,
                        to = clamped,
                        "guardrail clamp"
                    );
                    clamped
                }
                _ => *weight,
            };
            (metric.clone(), w)
        })
        .collect();
    normalize_by_magnitude(&clamped)
}

/// Scales a random subset of groups and renormalizes.
///
/// Between `min_groups` and `max_groups` groups (bounded by the group count)
/// are picked; each is multiplied by a uniform factor in
/// `[1 - range, 1 + range)`.
///
/// # Arguments
///
/// * `rng` - Shared random source
/// * `groups` - Current group weights
/// * `min_groups` / `max_groups` - How many groups to touch
/// * `range` - Relative perturbation, e.g. `0.20`
pub fn perturb_groups<R>(
    rng: &mut R,
    groups: &WeightMap,
    min_groups: usize,
    max_groups: usize,
    range: f64,
) -> WeightMap
where
    R: RandomSource + ?Sized,
{
    let names = groups.keys().collect::<Vec<_>>();
    let upper = max_groups.min(names.len());
    let lower = min_groups.min(upper);
    let count = lower + rng.index(upper - lower + 1);

    let mut next = groups.clone();
    for i in sample_indices(rng, names.len(), count) {
        let factor = rng.uniform(1.0 - range, 1.0 + range);
        if let Some(w) = next.get_mut(names[i]) {
            *w *= factor;
        }
    }
    normalize(&next)
}

/// Multiplies every metric weight by its own uniform factor in
/// `[1 - range, 1 + range)`.
///
/// The result is not renormalized; callers clamp to guardrails first.
pub fn perturb_metrics<R>(rng: &mut R, metrics: &WeightMap, range: f64) -> WeightMap
where
    R: RandomSource + ?Sized,
{
    metrics
        .iter()
        .map(|(metric, weight)| {
            let factor = rng.uniform(1.0 - range, 1.0 + range);
            (metric.clone(), weight * factor)
        })
        .collect()
}
