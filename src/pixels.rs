//! Pixel extraction and raster statistics.
//!
//! A decoded raster is flattened row-major into a [`PixelSet`] of
//! floating-point RGB observations before clustering. The raster's
//! [`Shape`] travels separately so the clustering result can be mapped
//! back onto the grid later.

use image::RgbImage;

use crate::error::{PaletteError, Result};

/// One RGB observation, components in `0.0..=255.0`.
pub type Observation = [f64; 3];

/// Height and width of a raster, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub height: usize,
    pub width: usize,
}

impl Shape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn of(image: &RgbImage) -> Self {
        Self::new(image.height() as usize, image.width() as usize)
    }

    /// Number of pixels covered by this shape.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::InvalidConfiguration`] if `height * width`
    /// overflows `usize`.
    pub fn checked_len(&self) -> Result<usize> {
        self.height.checked_mul(self.width).ok_or_else(|| {
            PaletteError::InvalidConfiguration(format!(
                "{}x{} raster is too large",
                self.width, self.height
            ))
        })
    }
}

/// Ordered pixel observations, one per raster pixel in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSet {
    observations: Vec<Observation>,
}

impl PixelSet {
    /// Wrap already extracted observations.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::InvalidInput`] if any component is not finite.
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        if let Some(i) = observations
            .iter()
            .position(|o| o.iter().any(|c| !c.is_finite()))
        {
            return Err(PaletteError::InvalidInput(format!(
                "observation {i} has a non-finite component"
            )));
        }
        Ok(Self { observations })
    }

    /// Flatten an RGB raster row-major.
    pub fn from_image(image: &RgbImage) -> Self {
        let observations = image
            .pixels()
            .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64])
            .collect();
        Self { observations }
    }

    /// Flatten an interleaved 8-bit buffer with explicit shape.
    ///
    /// Only three-channel RGB data is accepted.
    ///
    /// # Errors
    ///
    /// - [`PaletteError::InvalidInput`] if `channels != 3`
    /// - [`PaletteError::InvalidConfiguration`] if the buffer length does not
    ///   match `height * width * channels`
    pub fn from_raw(
        height: usize,
        width: usize,
        channels: usize,
        raw: &[u8],
    ) -> Result<(Self, Shape)> {
        if channels != 3 {
            return Err(PaletteError::InvalidInput(format!(
                "expected 3 color channels, got {channels}"
            )));
        }
        let shape = Shape::new(height, width);
        let expected = shape.checked_len()?.checked_mul(channels).ok_or_else(|| {
            PaletteError::InvalidConfiguration(format!("{width}x{height} raster is too large"))
        })?;
        if raw.len() != expected {
            return Err(PaletteError::InvalidConfiguration(format!(
                "buffer holds {} bytes but a {}x{} RGB raster needs {}",
                raw.len(),
                width,
                height,
                expected
            )));
        }
        let observations = raw
            .chunks_exact(3)
            .map(|c| [c[0] as f64, c[1] as f64, c[2] as f64])
            .collect();
        Ok((Self { observations }, shape))
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }

    /// Mean of the per-channel variances.
    ///
    /// Used to scale the relative convergence tolerance.
    pub(crate) fn mean_channel_variance(&self) -> f64 {
        let n = self.observations.len() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let mut sum = [0.0f64; 3];
        for o in &self.observations {
            for c in 0..3 {
                sum[c] += o[c];
            }
        }
        let mean = sum.map(|s| s / n);
        let mut var = [0.0f64; 3];
        for o in &self.observations {
            for c in 0..3 {
                let d = o[c] - mean[c];
                var[c] += d * d;
            }
        }
        var.iter().map(|v| v / n).sum::<f64>() / 3.0
    }
}

/// Basic facts about a decoded raster.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub total_pixels: usize,
    pub min_value: u8,
    pub max_value: u8,
    /// Mean over every channel sample, rounded to two decimals.
    pub mean_value: f64,
}

impl ImageInfo {
    /// # Errors
    ///
    /// Returns [`PaletteError::InvalidInput`] for a raster with no pixels.
    pub fn from_image(image: &RgbImage) -> Result<Self> {
        let samples = image.as_raw();
        if samples.is_empty() {
            return Err(PaletteError::InvalidInput("image has no pixels".to_string()));
        }

        let mut min_value = u8::MAX;
        let mut max_value = u8::MIN;
        let mut total: u64 = 0;
        for &s in samples {
            min_value = min_value.min(s);
            max_value = max_value.max(s);
            total += s as u64;
        }
        let mean = total as f64 / samples.len() as f64;

        let shape = Shape::of(image);
        // `samples` is already in memory, so this count cannot overflow.
        let total_pixels = samples.len() / 3;
        Ok(Self {
            height: shape.height,
            width: shape.width,
            channels: 3,
            total_pixels,
            min_value,
            max_value,
            mean_value: round2(mean),
        })
    }
}

/// 256-bin sample counts for the R, G and B channels.
pub fn channel_histograms(image: &RgbImage) -> [[u32; 256]; 3] {
    let mut bins = [[0u32; 256]; 3];
    for p in image.pixels() {
        for c in 0..3 {
            bins[c][p[c] as usize] += 1;
        }
    }
    bins
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
