pub mod image_tensor;
pub mod gaussian_blur;

pub use image_tensor::ImageTensor;
pub use gaussian_blur::{GaussianBlur, gaussian_kernel};
