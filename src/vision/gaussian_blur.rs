use image::RgbImage;
use rand::Rng;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::vision::image_tensor::ImageTensor;

/// Lower bound of the blur strength drawn by `GaussianBlur::apply`.
pub const SIGMA_MIN: f64 = 0.1;
/// Upper bound (exclusive) of the blur strength drawn by `GaussianBlur::apply`.
pub const SIGMA_MAX: f64 = 2.0;

/// Random Gaussian blur augmentation for single RGB images.
///
/// Each call draws `σ ~ U[SIGMA_MIN, SIGMA_MAX)`, reflection-pads the image
/// by the kernel radius and runs a separable convolution (one 1-D pass per
/// axis) with the same normalized kernel on every channel. The output has
/// the input's dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianBlur {
    radius: usize,
}

impl GaussianBlur {
    /// Even sizes round up: `kernel_size = 4` blurs with a 5-tap kernel.
    pub fn new(kernel_size: usize) -> GaussianBlur {
        GaussianBlur { radius: kernel_size / 2 }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Effective number of taps, always odd.
    pub fn kernel_size(&self) -> usize {
        self.radius * 2 + 1
    }

    /// Blurs `img` with a freshly drawn sigma.
    pub fn apply<R: Rng + ?Sized>(&self, img: &RgbImage, rng: &mut R) -> Result<RgbImage> {
        let sigma = rng.gen_range(SIGMA_MIN..SIGMA_MAX);
        tracing::debug!(sigma, kernel_size = self.kernel_size(), "gaussian blur");

        self.apply_with_sigma(&ImageTensor::from_rgb_image(img), sigma)?
            .to_rgb_image()
    }

    /// Deterministic core of `apply`: blurs every channel with `sigma`.
    ///
    /// `sigma` must be finite and positive.
    pub fn apply_with_sigma(&self, tensor: &ImageTensor, sigma: f64) -> Result<ImageTensor> {
        let kernel = gaussian_kernel(self.radius, sigma)?;
        Ok(ImageTensor {
            channels: tensor.channels
                .iter()
                .map(|plane| blur_plane(plane, &kernel))
                .collect(),
        })
    }
}

/// Normalized 1-D Gaussian weights `exp(-x² / 2σ²)` for `x ∈ [-radius, radius]`.
///
/// Fails with `InvalidArgument` unless `sigma` is finite and positive.
pub fn gaussian_kernel(radius: usize, sigma: f64) -> Result<Vec<f64>> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(Error::invalid(format!("blur sigma must be finite and positive, got {}", sigma)));
    }
    let r = radius as isize;
    let weights: Vec<f64> = (-r..=r)
        .map(|x| (-((x * x) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / total).collect())
}

/// Horizontal pass, then the vertical pass as a horizontal pass on the
/// transposed plane.
fn blur_plane(plane: &Matrix, kernel: &[f64]) -> Matrix {
    let horizontal = convolve_rows(plane, kernel);
    convolve_rows(&horizontal.transpose(), kernel).transpose()
}

fn convolve_rows(plane: &Matrix, kernel: &[f64]) -> Matrix {
    let radius = (kernel.len() / 2) as isize;
    let width = plane.cols;
    let mut res = Matrix::zeros(plane.rows, plane.cols);

    for (out_row, row) in res.data.iter_mut().zip(plane.data.iter()) {
        for (j, out) in out_row.iter_mut().enumerate() {
            *out = kernel
                .iter()
                .enumerate()
                .map(|(t, w)| w * row[reflect(j as isize + t as isize - radius, width)])
                .sum();
        }
    }

    res
}

/// Mirror index into `0..len` without repeating the edge sample
/// (`-1 → 1`, `len → len - 2`). Offsets wider than the axis keep bouncing.
fn reflect(i: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    if m < len as isize { m as usize } else { (period - m) as usize }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Rgb;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(3, 1.3).unwrap();
        assert_eq!(k.len(), 7);
        assert_abs_diff_eq!(k.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        for i in 0..3 {
            assert_abs_diff_eq!(k[i], k[6 - i], epsilon = 1e-15);
            assert!(k[i] < k[i + 1]);
        }
    }

    #[test]
    fn zero_radius_kernel_is_identity() {
        assert_eq!(gaussian_kernel(0, 0.5).unwrap(), vec![1.0]);
    }

    #[test]
    fn bad_sigma_is_rejected() {
        let tensor = ImageTensor::filled(3, 4, 4, 0.5);
        let blur = GaussianBlur::new(3);
        for sigma in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(gaussian_kernel(1, sigma), Err(Error::InvalidArgument(_))));
            assert!(matches!(blur.apply_with_sigma(&tensor, sigma), Err(Error::InvalidArgument(_))));
        }
        // Tiny but positive still gives a usable kernel.
        let k = gaussian_kernel(2, 1e-3).unwrap();
        assert!(k.iter().all(|w| w.is_finite()));
    }

    #[test]
    fn even_kernel_size_rounds_up() {
        let blur = GaussianBlur::new(4);
        assert_eq!(blur.radius(), 2);
        assert_eq!(blur.kernel_size(), 5);
        assert_eq!(GaussianBlur::new(23).kernel_size(), 23);
    }

    #[test]
    fn reflect_mirrors_without_edge_repeat() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(-2, 5), 2);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(6, 5), 2);
        assert_eq!(reflect(2, 5), 2);
        assert_eq!(reflect(-3, 1), 0);
    }

    #[test]
    fn constant_image_is_unchanged() {
        let img = RgbImage::from_pixel(9, 6, Rgb([10, 128, 250]));
        let mut rng = StdRng::seed_from_u64(7);
        let out = GaussianBlur::new(5).apply(&img, &mut rng).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn output_keeps_input_size() {
        let img = RgbImage::from_fn(13, 4, |x, y| Rgb([(x * 19) as u8, (y * 60) as u8, 0]));
        let mut rng = StdRng::seed_from_u64(1);
        let out = GaussianBlur::new(9).apply(&img, &mut rng).unwrap();
        assert_eq!(out.dimensions(), (13, 4));
    }

    #[test]
    fn radius_wider_than_image_is_handled() {
        let img = RgbImage::from_fn(2, 2, |x, _| Rgb([(x * 200) as u8, 0, 0]));
        let mut rng = StdRng::seed_from_u64(3);
        let out = GaussianBlur::new(11).apply(&img, &mut rng).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
    }

    #[test]
    fn impulse_spreads_and_keeps_mass() {
        let mut plane = Matrix::zeros(9, 9);
        plane.data[4][4] = 1.0;
        let tensor = ImageTensor::new(vec![plane]).unwrap();

        let out = GaussianBlur::new(5).apply_with_sigma(&tensor, 1.0).unwrap();
        let blurred = &out.channels[0];

        let total: f64 = blurred.data.iter().flatten().sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        assert!(blurred.get(4, 4) < 1.0);
        assert!(blurred.get(4, 5) > 0.0);
        assert_abs_diff_eq!(blurred.get(3, 4), blurred.get(5, 4), epsilon = 1e-15);
        assert_abs_diff_eq!(blurred.get(4, 3), blurred.get(3, 4), epsilon = 1e-15);
    }

    #[test]
    fn same_seed_same_blur() {
        let img = RgbImage::from_fn(8, 8, |x, y| Rgb([((x + y) * 15) as u8, 40, 90]));
        let blur = GaussianBlur::new(3);
        let a = blur.apply(&img, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = blur.apply(&img, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }
}
