//! Ranks and correlation coefficients.
//!
//! # Tie Handling
//!
//! [`rank`] uses mid-rank tie handling: values that compare equal share the
//! average of the 1-based ranks they would jointly occupy. `[1, 1, 2]` ranks as
//! `[1.5, 1.5, 3]`. The result does not depend on input order beyond the
//! positions of the values themselves.
//!
//! # Zero-Variance Fallback
//!
//! [`pearson`] and [`spearman`] return `0.0` when the inputs are empty, have
//! mismatched lengths, or either side has zero variance (for Spearman, all
//! values tied). Downstream code treats a zero correlation as "no signal".

/// Assigns 1-based ranks to `values`, averaging ranks across ties.
///
/// Smaller values receive smaller ranks.
///
/// ```
/// # use fieldrank_stats::correlation::rank;
/// assert_eq!(rank(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
/// assert_eq!(rank(&[1.0, 1.0, 2.0]), vec![1.5, 1.5, 3.0]);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn rank(values: &[f64]) -> Vec<f64> {
    let mut order = (0..values.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end occupy ranks start+1..=end
        let shared = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = shared;
        }
        start = end;
    }
    ranks
}

/// Pearson product-moment correlation of `x` and `y`.
///
/// Returns `0.0` for empty or mismatched input and when either series has zero
/// variance. The result is clamped into `[-1, 1]` to absorb rounding.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.is_empty() || x.len() != y.len() {
        return 0.0;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Spearman rank correlation: Pearson correlation of the mid-ranks.
///
/// ```
/// # use fieldrank_stats::correlation::spearman;
/// let x = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let reversed = [5.0, 4.0, 3.0, 2.0, 1.0];
/// assert!((spearman(&x, &x) - 1.0).abs() < 1e-12);
/// assert!((spearman(&x, &reversed) + 1.0).abs() < 1e-12);
/// assert_eq!(spearman(&x, &[2.0; 5]), 0.0);
/// ```
#[must_use]
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    if x.is_empty() || x.len() != y.len() {
        return 0.0;
    }
    pearson(&rank(x), &rank(y))
}
