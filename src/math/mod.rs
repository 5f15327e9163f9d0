pub mod float_serde;
pub mod matrix;

pub use matrix::Matrix;
