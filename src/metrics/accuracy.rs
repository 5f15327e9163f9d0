use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Computes top-k accuracy, in percent, for every `k` in `topk`.
///
/// # Arguments
/// - `output` — class scores, shape `(batch_size, num_classes)`
/// - `target` — true class index per example, length `batch_size`
/// - `topk`   — requested k values; results come back in the same order
///
/// An example counts as correct for `k` when its label is among its `k`
/// highest scores. Scores are ranked with `f64::total_cmp` using a stable
/// sort, so equal scores rank the lower class index first.
///
/// # Errors
/// `InvalidArgument` when `topk` is empty, contains `0` or a value above
/// `num_classes`, when `target.len() != batch_size`, when the batch is empty,
/// or when a label is not a valid class index.
pub fn accuracy(output: &Matrix, target: &[usize], topk: &[usize]) -> Result<Vec<f64>> {
    let (batch_size, num_classes) = output.shape();

    if topk.is_empty() {
        return Err(Error::invalid("topk must name at least one k"));
    }
    if let Some(&k) = topk.iter().find(|&&k| k == 0 || k > num_classes) {
        return Err(Error::invalid(format!(
            "k = {} is outside 1..={} classes",
            k, num_classes
        )));
    }
    if target.len() != batch_size {
        return Err(Error::invalid(format!(
            "{} score rows but {} labels",
            batch_size,
            target.len()
        )));
    }
    if batch_size == 0 {
        return Err(Error::invalid("batch is empty"));
    }
    if let Some((i, &label)) = target.iter().enumerate().find(|&(_, &l)| l >= num_classes) {
        return Err(Error::invalid(format!(
            "label {} of example {} is not below {} classes",
            label, i, num_classes
        )));
    }

    // Every example's label rank is enough to answer all k at once.
    let ranks: Vec<usize> = (0..batch_size)
        .map(|i| label_rank(output.row(i), target[i]))
        .collect();

    let res = topk
        .iter()
        .map(|&k| {
            let correct = ranks.iter().filter(|&&rank| rank < k).count();
            correct as f64 * 100.0 / batch_size as f64
        })
        .collect();

    Ok(res)
}

/// Class indices of `scores` from highest to lowest score.
pub fn ranked_classes(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}

/// Zero-based position of `label` in the descending ranking of `scores`.
fn label_rank(scores: &[f64], label: usize) -> usize {
    ranked_classes(scores)
        .iter()
        .position(|&class| class == label)
        .unwrap_or(scores.len())
}
