use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Returns the row indices of the `k` points in `data_points` closest to
/// `query` by Euclidean distance, nearest first.
///
/// `k` is clamped to the number of rows. Equal distances keep the lower row
/// index first.
pub fn find_knn(query: &[f64], data_points: &Matrix, k: usize) -> Result<Vec<usize>> {
    if data_points.rows > 0 && query.len() != data_points.cols {
        return Err(Error::shape(format!(
            "query has {} dimensions, data points have {}",
            query.len(),
            data_points.cols
        )));
    }

    let mut by_distance: Vec<(usize, f64)> = data_points.data
        .iter()
        .enumerate()
        .map(|(i, point)| (i, squared_distance(query, point)))
        .collect();
    by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));

    Ok(by_distance
        .into_iter()
        .take(k)
        .map(|(i, _)| i)
        .collect())
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
