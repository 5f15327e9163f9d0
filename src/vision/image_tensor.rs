//! Channel-first image tensors and their conversion to and from `image`
//! buffers.
//!
//! Pixel values are `[0, 1]` after `from_rgb_image`; `normalize` moves them
//! into the standardized space the model consumes and `denormalize` brings
//! them back for display.
use image::{Rgb, RgbImage};
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// A CHW image: one `height × width` plane per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTensor {
    /// Every plane must have the same shape. `new` checks this; code that
    /// fills the field directly is responsible for it, and `to_rgb_image`
    /// reports a mismatch as `Error::Shape`.
    pub channels: Vec<Matrix>,
}

impl ImageTensor {
    /// Wraps channel planes, which must all share one shape.
    pub fn new(channels: Vec<Matrix>) -> Result<ImageTensor> {
        if let Some(first) = channels.first() {
            if let Some(bad) = channels.iter().find(|c| c.shape() != first.shape()) {
                return Err(Error::shape(format!(
                    "channel planes differ: {:?} vs {:?}",
                    first.shape(),
                    bad.shape()
                )));
            }
        }
        Ok(ImageTensor { channels })
    }

    /// `channels` planes of `height × width`, all set to `value`.
    pub fn filled(channels: usize, height: usize, width: usize, value: f64) -> ImageTensor {
        ImageTensor {
            channels: (0..channels).map(|_| Matrix::filled(height, width, value)).collect(),
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// `(height, width)`; `(0, 0)` for a tensor without channels.
    pub fn dims(&self) -> (usize, usize) {
        self.channels.first().map_or((0, 0), |c| c.shape())
    }

    /// Decodes an RGB buffer into three planes scaled to `[0, 1]`.
    pub fn from_rgb_image(img: &RgbImage) -> ImageTensor {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let mut channels = vec![Matrix::zeros(height, width); 3];
        for (x, y, pixel) in img.enumerate_pixels() {
            for (c, &value) in pixel.0.iter().enumerate() {
                channels[c].data[y as usize][x as usize] = value as f64 / 255.0;
            }
        }
        ImageTensor { channels }
    }

    /// Clips to `[0, 1]` and writes the planes out in HWC pixel order.
    ///
    /// Fails unless the tensor has exactly three channels of one shape.
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        if self.num_channels() != 3 {
            return Err(Error::shape(format!(
                "rgb output needs 3 channels, tensor has {}",
                self.num_channels()
            )));
        }
        let (height, width) = self.dims();
        for (c, plane) in self.channels.iter().enumerate() {
            let fits = plane.shape() == (height, width)
                && plane.data.len() == height
                && plane.data.iter().all(|row| row.len() == width);
            if !fits {
                return Err(Error::shape(format!(
                    "channel {} does not match the {}x{} plane of channel 0",
                    c, height, width
                )));
            }
        }
        let to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;

        Ok(RgbImage::from_fn(width as u32, height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            Rgb([
                to_u8(self.channels[0].data[y][x]),
                to_u8(self.channels[1].data[y][x]),
                to_u8(self.channels[2].data[y][x]),
            ])
        }))
    }

    /// Per channel `x ← x * std[c] + mean[c]`.
    ///
    /// Channels are paired with `mean`/`std` positionally; any channel past
    /// the shorter of the two is left unchanged.
    pub fn denormalize(&mut self, mean: &[f64], std: &[f64]) -> &mut Self {
        for ((plane, &m), &s) in self.channels.iter_mut().zip(mean).zip(std) {
            plane.apply(|x| x * s + m);
        }
        self
    }

    /// Per channel `x ← (x - mean[c]) / std[c]`; inverse of `denormalize`.
    pub fn normalize(&mut self, mean: &[f64], std: &[f64]) -> &mut Self {
        for ((plane, &m), &s) in self.channels.iter_mut().zip(mean).zip(std) {
            plane.apply(|x| (x - m) / s);
        }
        self
    }

    pub fn clip(&mut self, lo: f64, hi: f64) -> &mut Self {
        for plane in &mut self.channels {
            plane.apply(|x| x.clamp(lo, hi));
        }
        self
    }
}
