//! Top-N ranking quality measures.
//!
//! Both measures take parallel slices: `predicted_ranks[i]` and
//! `actual_finishes[i]` describe the same player. Smaller is better on both
//! sides. Inputs of different lengths score `0.0`.
//!
//! # Weighted Top-N (NDCG-style)
//!
//! ```text
//! gain(p)  = n - p + 1   if p <= n, else 0
//! DCG      = Σ gain(actual_i) / log2(position_i + 1)    (position in predicted order, 1-based)
//! IDCG     = same sum over the gains sorted descending
//! score    = 100 * DCG / IDCG                            (0 when IDCG = 0)
//! ```
//!
//! The winner contributes `n` gain and the N-th place contributes `1`, so
//! placing the best finishers at the top of the prediction matters most.
//!
//! # Top-N Accuracy
//!
//! The share, in percent, of the predicted top-N that also finished in the
//! actual top-N.

/// NDCG-style weighted top-N score in `[0, 100]`.
///
/// Players are ordered by predicted rank (ties keep input order). Returns
/// exactly `0.0` when nobody in `actual_finishes` placed at or above `n`.
///
/// ```
/// # use fieldrank_stats::ranking::weighted_top_n;
/// // Perfect prediction.
/// assert_eq!(weighted_top_n(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 2), 100.0);
/// // Nobody finished in the top 2.
/// assert_eq!(weighted_top_n(&[1.0, 2.0], &[5.0, 6.0], 2), 0.0);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn weighted_top_n(predicted_ranks: &[f64], actual_finishes: &[f64], n: usize) -> f64 {
    if predicted_ranks.len() != actual_finishes.len() || n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let gain = |finish: f64| {
        if finish >= 1.0 && finish <= n {
            n - finish + 1.0
        } else {
            0.0
        }
    };

    let mut order = (0..predicted_ranks.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| predicted_ranks[a].total_cmp(&predicted_ranks[b]));
    let predicted_gains = order
        .iter()
        .map(|&i| gain(actual_finishes[i]))
        .collect::<Vec<_>>();

    let mut ideal_gains = predicted_gains.clone();
    ideal_gains.sort_by(|a, b| b.total_cmp(a));

    let idcg = discounted_sum(&ideal_gains);
    if idcg == 0.0 {
        return 0.0;
    }
    100.0 * (discounted_sum(&predicted_gains) / idcg)
}

/// Percentage of the predicted top-N that also finished in the actual top-N.
///
/// The predicted top-N is every player with `predicted_rank <= n`; that set's
/// size is the denominator. Returns `0.0` if the predicted set is empty.
///
/// ```
/// # use fieldrank_stats::ranking::top_n_accuracy;
/// let predicted = [1.0, 2.0, 3.0, 4.0];
/// let actual = [1.0, 4.0, 2.0, 3.0];
/// assert_eq!(top_n_accuracy(&predicted, &actual, 2), 50.0);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn top_n_accuracy(predicted_ranks: &[f64], actual_finishes: &[f64], n: usize) -> f64 {
    if predicted_ranks.len() != actual_finishes.len() {
        return 0.0;
    }
    let n = n as f64;
    let (selected, hits) = predicted_ranks
        .iter()
        .zip(actual_finishes)
        .filter(|(predicted, _)| **predicted <= n)
        .fold((0_usize, 0_usize), |(selected, hits), (_, actual)| {
            (selected + 1, hits + usize::from(*actual <= n))
        });
    if selected == 0 {
        return 0.0;
    }
    100.0 * hits as f64 / selected as f64
}

/// Top-N accuracy for predictions that carry no explicit rank.
///
/// `actual_in_predicted_order` lists actual finishes in the order the players
/// were predicted; the first `n` entries form the predicted top-N, so the
/// denominator is `min(n, len)`.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn top_n_accuracy_by_order(actual_in_predicted_order: &[f64], n: usize) -> f64 {
    let selected = n.min(actual_in_predicted_order.len());
    if selected == 0 {
        return 0.0;
    }
    let cutoff = n as f64;
    let hits = actual_in_predicted_order[..selected]
        .iter()
        .filter(|actual| **actual <= cutoff)
        .count();
    100.0 * hits as f64 / selected as f64
}

#[expect(clippy::cast_precision_loss)]
fn discounted_sum(gains: &[f64]) -> f64 {
    gains
        .iter()
        .enumerate()
        .map(|(i, g)| g / ((i + 2) as f64).log2())
        .sum()
}
