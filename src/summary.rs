//! Per-cluster population statistics.

use palette::Srgb;

use crate::color::truncate_centroid;
use crate::error::{PaletteError, Result};
use crate::kmeans::Centroid;
use crate::pixels::round2;

/// One populated cluster and its share of the image.
#[derive(Debug, Clone, PartialEq)]
pub struct DominantColor {
    pub color_id: usize,
    /// Centroid truncated to 8-bit channels.
    pub rgb: Srgb<u8>,
    /// Share of all pixels, in percent, rounded to two decimals.
    pub percentage: f64,
}

/// Summarize a clustering as dominant colors, most common first.
///
/// Only clusters that own at least one pixel appear. Entries with equal
/// percentages are ordered by ascending `color_id`.
///
/// # Errors
///
/// Returns [`PaletteError::InvalidInput`] if a label has no centroid.
pub fn summarize(centroids: &[Centroid], labels: &[usize]) -> Result<Vec<DominantColor>> {
    let total = labels.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let mut counts = vec![0usize; centroids.len()];
    for (i, &label) in labels.iter().enumerate() {
        let count = counts.get_mut(label).ok_or_else(|| {
            PaletteError::InvalidInput(format!(
                "pixel {i} has label {label} but only {} centroids exist",
                centroids.len()
            ))
        })?;
        *count += 1;
    }

    let mut colors: Vec<DominantColor> = counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(color_id, &count)| DominantColor {
            color_id,
            rgb: truncate_centroid(centroids[color_id]),
            percentage: round2(count as f64 / total as f64 * 100.0),
        })
        .collect();

    colors.sort_by(|a, b| {
        b.percentage
            .total_cmp(&a.percentage)
            .then(a.color_id.cmp(&b.color_id))
    });
    Ok(colors)
}
