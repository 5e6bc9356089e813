//! Rebuild a raster from cluster assignments.

use image::RgbImage;

use crate::color::truncate_centroid;
use crate::error::{PaletteError, Result};
use crate::kmeans::Centroid;
use crate::pixels::Shape;

/// Cluster id for every pixel, laid out like the source raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    shape: Shape,
    labels: Vec<usize>,
}

impl LabelMap {
    pub fn height(&self) -> usize {
        self.shape.height
    }

    pub fn width(&self) -> usize {
        self.shape.width
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Cluster id at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.shape.height || col >= self.shape.width {
            return None;
        }
        self.labels.get(row * self.shape.width + col).copied()
    }

    /// Row-major labels.
    pub fn as_slice(&self) -> &[usize] {
        &self.labels
    }

    pub fn min_label(&self) -> Option<usize> {
        self.labels.iter().copied().min()
    }

    pub fn max_label(&self) -> Option<usize> {
        self.labels.iter().copied().max()
    }
}

/// Paint every pixel with its centroid and lay the labels out on the grid.
///
/// # Errors
///
/// - [`PaletteError::InvalidConfiguration`] if `labels.len()` differs from
///   `shape.height * shape.width`, the product overflows, or the shape
///   does not fit an image
/// - [`PaletteError::InvalidInput`] if a label has no centroid
pub fn reconstruct(
    labels: &[usize],
    centroids: &[Centroid],
    shape: Shape,
) -> Result<(RgbImage, LabelMap)> {
    if labels.len() != shape.checked_len()? {
        return Err(PaletteError::InvalidConfiguration(format!(
            "{} labels cannot fill a {}x{} raster",
            labels.len(),
            shape.width,
            shape.height
        )));
    }
    let (width, height) = match (u32::try_from(shape.width), u32::try_from(shape.height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(PaletteError::InvalidConfiguration(format!(
                "{}x{} exceeds the maximum image size",
                shape.width, shape.height
            )));
        }
    };

    let palette: Vec<[u8; 3]> = centroids
        .iter()
        .map(|&c| {
            let rgb = truncate_centroid(c);
            [rgb.red, rgb.green, rgb.blue]
        })
        .collect();

    let mut raw = Vec::with_capacity(labels.len() * 3);
    for (i, &label) in labels.iter().enumerate() {
        let color = palette.get(label).ok_or_else(|| {
            PaletteError::InvalidInput(format!(
                "pixel {i} has label {label} but only {} centroids exist",
                centroids.len()
            ))
        })?;
        raw.extend_from_slice(color);
    }

    let quantized = RgbImage::from_raw(width, height, raw).ok_or_else(|| {
        PaletteError::InvalidConfiguration("failed to rebuild image buffer".to_string())
    })?;
    let label_map = LabelMap {
        shape,
        labels: labels.to_vec(),
    };
    Ok((quantized, label_map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_reconstruct_paints_centroids() {
        let centroids = [[255.9, 0.0, 0.0], [0.0, 0.4, 254.6]];
        let labels = [0, 1, 1, 0, 0, 1];
        let (image, map) = reconstruct(&labels, &centroids, Shape::new(2, 3)).unwrap();

        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(*image.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*image.get_pixel(1, 0), Rgb([0, 0, 254]));
        assert_eq!(*image.get_pixel(2, 1), Rgb([0, 0, 254]));
        assert_eq!(*image.get_pixel(0, 1), Rgb([255, 0, 0]));

        assert_eq!(map.height(), 2);
        assert_eq!(map.width(), 3);
        assert_eq!(map.get(1, 2), Some(1));
        assert_eq!(map.get(1, 0), Some(0));
        assert_eq!(map.get(2, 0), None);
        assert_eq!(map.as_slice(), &labels);
        assert_eq!(map.min_label(), Some(0));
        assert_eq!(map.max_label(), Some(1));
    }

    #[test]
    fn test_reconstruct_length_mismatch() {
        let err = reconstruct(&[0, 0, 0], &[[0.0; 3]], Shape::new(2, 2)).unwrap_err();
        assert!(matches!(err, PaletteError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_reconstruct_overflowing_shape() {
        let err = reconstruct(&[], &[[0.0; 3]], Shape::new(usize::MAX, 2)).unwrap_err();
        assert!(matches!(err, PaletteError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_reconstruct_unknown_label() {
        let err = reconstruct(&[0, 3], &[[0.0; 3]], Shape::new(1, 2)).unwrap_err();
        assert!(matches!(err, PaletteError::InvalidInput(_)));
    }

    #[test]
    fn test_reconstruct_empty_shape() {
        let (image, map) = reconstruct(&[], &[[0.0; 3]], Shape::new(0, 0)).unwrap();
        assert_eq!(image.dimensions(), (0, 0));
        assert_eq!(map.min_label(), None);
    }
}
