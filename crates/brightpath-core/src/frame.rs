//! Normalized single-channel intensity frames.
//!
//! Every search and profile operates on a [`Frame`]: one `f64` per pixel
//! in `[0, 255]`. Inputs are 2-D or 2-D + channel arrays (row-major,
//! channels interleaved) or decoded images from the `image` crate.
//!
//! Conversion is three steps, in this order:
//!
//! 1. clip every sample to `[0, 255]` (NaN counts as 0),
//! 2. min-max normalize the whole array to `[0, 255]`,
//! 3. average the channels of each pixel.
//!
//! A constant input has no range to stretch and normalizes to all zeros.

use image::{DynamicImage, GrayImage};

use crate::types::{Coord, CoreError, Dimensions};

/// A grayscale intensity grid normalized to `[0, 255]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    dimensions: Dimensions,
    data: Vec<f64>,
}

impl Frame {
    /// Build a frame from a row-major array with `channels` interleaved
    /// samples per pixel.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the frame would be empty,
    /// `channels` is zero, or `data.len()` is not
    /// `width * height * channels`.
    pub fn from_channels<V: Copy + Into<f64>>(
        width: u32,
        height: u32,
        channels: usize,
        data: &[V],
    ) -> Result<Self, CoreError> {
        let dimensions = Dimensions { width, height };
        let pixels = dimensions.pixel_count();
        if pixels == 0 {
            return Err(CoreError::invalid(format!(
                "frame must not be empty, got {width}x{height}"
            )));
        }
        if channels == 0 {
            return Err(CoreError::invalid("frame needs at least one channel"));
        }
        if data.len() != pixels * channels {
            return Err(CoreError::invalid(format!(
                "expected {} samples for {width}x{height}x{channels}, got {}",
                pixels * channels,
                data.len()
            )));
        }

        let clipped: Vec<f64> = data
            .iter()
            .map(|&v| {
                let v: f64 = v.into();
                if v.is_nan() { 0.0 } else { v.clamp(0.0, 255.0) }
            })
            .collect();

        let (min, max) = clipped
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        let stretch = |v: f64| {
            if range > f64::EPSILON {
                (v - min) / range * 255.0
            } else {
                0.0
            }
        };

        #[allow(clippy::cast_precision_loss)]
        let divisor = channels as f64;
        let data = clipped
            .chunks_exact(channels)
            .map(|pixel| pixel.iter().map(|&v| stretch(v)).sum::<f64>() / divisor)
            .collect();

        Ok(Self { dimensions, data })
    }

    /// Build a frame from a grayscale image.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the image is empty.
    pub fn from_gray(image: &GrayImage) -> Result<Self, CoreError> {
        Self::from_channels(image.width(), image.height(), 1, image.as_raw())
    }

    /// Build a frame from any decoded image, averaging its native channels.
    ///
    /// 8-bit layouts are read as-is. 16-bit samples are rescaled to
    /// `[0, 255]` and float samples (nominally `[0, 1]`) are multiplied
    /// by 255, both without rounding, so their extra depth survives.
    /// Any other layout is converted to 8-bit RGB.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the image is empty.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self, CoreError> {
        let (width, height) = (image.width(), image.height());
        match image {
            DynamicImage::ImageLuma8(img) => Self::from_channels(width, height, 1, img.as_raw()),
            DynamicImage::ImageLumaA8(img) => Self::from_channels(width, height, 2, img.as_raw()),
            DynamicImage::ImageRgb8(img) => Self::from_channels(width, height, 3, img.as_raw()),
            DynamicImage::ImageRgba8(img) => Self::from_channels(width, height, 4, img.as_raw()),
            DynamicImage::ImageLuma16(img) => Self::from_wide(width, height, 1, img.as_raw()),
            DynamicImage::ImageLumaA16(img) => Self::from_wide(width, height, 2, img.as_raw()),
            DynamicImage::ImageRgb16(img) => Self::from_wide(width, height, 3, img.as_raw()),
            DynamicImage::ImageRgba16(img) => Self::from_wide(width, height, 4, img.as_raw()),
            DynamicImage::ImageRgb32F(img) => Self::from_float(width, height, 3, img.as_raw()),
            DynamicImage::ImageRgba32F(img) => Self::from_float(width, height, 4, img.as_raw()),
            other => Self::from_channels(width, height, 3, other.to_rgb8().as_raw()),
        }
    }

    fn from_wide(width: u32, height: u32, channels: usize, data: &[u16]) -> Result<Self, CoreError> {
        let scaled: Vec<f64> = data.iter().map(|&v| f64::from(v) / 257.0).collect();
        Self::from_channels(width, height, channels, &scaled)
    }

    fn from_float(width: u32, height: u32, channels: usize, data: &[f32]) -> Result<Self, CoreError> {
        let scaled: Vec<f64> = data.iter().map(|&v| f64::from(v) * 255.0).collect();
        Self::from_channels(width, height, channels, &scaled)
    }

    /// Build a frame by evaluating `f` at every pixel, then normalizing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the frame would be empty.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> f64,
    ) -> Result<Self, CoreError> {
        let data: Vec<f64> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self::from_channels(width, height, 1, &data)
    }

    /// Wrap values that are already in `[0, 255]`.
    pub(crate) const fn from_normalized(dimensions: Dimensions, data: Vec<f64>) -> Self {
        Self { dimensions, data }
    }

    /// Frame size in pixels.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Row-major offset of `coord`. The caller checks bounds.
    pub(crate) const fn offset(&self, coord: Coord) -> usize {
        coord.y as usize * self.dimensions.width as usize + coord.x as usize
    }

    /// Intensity at a row-major offset.
    pub(crate) fn at_offset(&self, offset: usize) -> f64 {
        self.data[offset]
    }

    /// Intensity at `coord`, or `None` outside the frame.
    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<f64> {
        coord
            .within(self.dimensions)
            .then(|| self.data[self.offset(coord)])
    }

    /// All intensities in row-major order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.data
    }
}
