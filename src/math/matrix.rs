use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// Row-major dense matrix.
///
/// Used for score matrices (`batch_size × num_classes`), embedding tables
/// (one row per point) and single image channel planes (`height × width`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![value; cols]; rows]
        }
    }

    /// Builds a matrix from rows, rejecting ragged input.
    /// An empty `data` gives a `0 × 0` matrix.
    pub fn from_data(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let cols = data.first().map_or(0, |row| row.len());
        if let Some((i, row)) = data.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(Error::shape(format!(
                "row {} has {} columns, expected {}",
                i,
                row.len(),
                cols
            )));
        }
        Ok(Matrix {
            rows: data.len(),
            cols,
            data
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i][j]
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }

        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data
                .iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect()
        }
    }

    /// In-place element-wise update.
    pub fn apply<F>(&mut self, functor: F)
    where
        F: Fn(f64) -> f64,
    {
        for row in &mut self.data {
            for x in row.iter_mut() {
                *x = functor(*x);
            }
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}
