//! Human-readable names for palette colors.
//!
//! A fixed table of 40 named colors covers the achromatic ramp, the
//! primary and secondary hues in dark/base/light variants and a handful
//! of warm and cool in-between tones. Table order is significant: when
//! two entries are equally close the earlier one wins.

use std::sync::LazyLock;

use palette::{Lab, Srgb};

use crate::color::{perceptual_distance, rgb_from_components, to_hsv, to_perceptual};
use crate::error::{PaletteError, Result};
use crate::kmeans::Centroid;

/// One entry of the reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedColor {
    pub name: &'static str,
    pub rgb: [u8; 3],
}

impl NamedColor {
    const fn new(name: &'static str, r: u8, g: u8, b: u8) -> Self {
        Self { name, rgb: [r, g, b] }
    }

    pub fn srgb(&self) -> Srgb<u8> {
        Srgb::new(self.rgb[0], self.rgb[1], self.rgb[2])
    }
}

/// Reference color names in lookup order.
pub static NAMED_COLORS: [NamedColor; 40] = [
    // achromatic
    NamedColor::new("Siyah", 0, 0, 0),
    NamedColor::new("Koyu Gri", 64, 64, 64),
    NamedColor::new("Gri", 128, 128, 128),
    NamedColor::new("Acik Gri", 192, 192, 192),
    NamedColor::new("Beyaz", 255, 255, 255),
    // red
    NamedColor::new("Koyu Kirmizi", 139, 0, 0),
    NamedColor::new("Kirmizi", 255, 0, 0),
    NamedColor::new("Acik Kirmizi", 255, 102, 102),
    // orange
    NamedColor::new("Koyu Turuncu", 200, 100, 0),
    NamedColor::new("Turuncu", 255, 140, 0),
    NamedColor::new("Acik Turuncu", 255, 179, 102),
    // yellow
    NamedColor::new("Koyu Sari", 204, 170, 0),
    NamedColor::new("Sari", 255, 220, 0),
    NamedColor::new("Acik Sari", 255, 255, 153),
    // green
    NamedColor::new("Koyu Yesil", 0, 100, 0),
    NamedColor::new("Yesil", 0, 180, 0),
    NamedColor::new("Acik Yesil", 144, 238, 144),
    // blue
    NamedColor::new("Koyu Mavi", 0, 0, 139),
    NamedColor::new("Mavi", 0, 100, 255),
    NamedColor::new("Acik Mavi", 135, 206, 250),
    NamedColor::new("Lacivert", 0, 0, 80),
    // purple
    NamedColor::new("Koyu Mor", 75, 0, 130),
    NamedColor::new("Mor", 148, 0, 211),
    NamedColor::new("Lila", 200, 162, 200),
    // pink
    NamedColor::new("Pembe", 255, 105, 180),
    NamedColor::new("Acik Pembe", 255, 182, 193),
    // warm in-between
    NamedColor::new("Kahverengi", 139, 69, 19),
    NamedColor::new("Koyu Kahve", 80, 40, 10),
    NamedColor::new("Bej", 210, 180, 140),
    NamedColor::new("Krem", 255, 253, 208),
    NamedColor::new("Somon", 250, 128, 114),
    NamedColor::new("Mercan", 255, 127, 80),
    NamedColor::new("Bordo", 128, 0, 0),
    NamedColor::new("Altin", 255, 193, 37),
    NamedColor::new("Amber", 255, 191, 0),
    // cool in-between
    NamedColor::new("Camgobegi", 0, 255, 255),
    NamedColor::new("Turkuaz", 0, 206, 209),
    NamedColor::new("Leylak", 150, 120, 182),
    NamedColor::new("Arduvaz", 112, 128, 144),
    NamedColor::new("Zeytin", 128, 128, 0),
];

/// Lab coordinates of [`NAMED_COLORS`], computed on first use.
static NAMED_COLORS_LAB: LazyLock<Vec<Lab>> = LazyLock::new(|| {
    NAMED_COLORS
        .iter()
        .map(|c| to_perceptual(c.srgb()))
        .collect()
});

/// How a [`ColorNamer`] maps colors onto names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingPolicy {
    /// Nearest table entry by Euclidean distance in CIE L\*a\*b\*.
    #[default]
    NearestLab,
    /// Bucket by hue, saturation and value thresholds.
    ///
    /// Coarser than [`NamingPolicy::NearestLab`]; every returned name is
    /// still a table entry.
    HsvThreshold,
}

/// A centroid with the name chosen for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorClassification {
    pub color_id: usize,
    pub rgb: Srgb<u8>,
    pub name: &'static str,
}

/// Classifies colors with a single fixed [`NamingPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorNamer {
    policy: NamingPolicy,
}

impl ColorNamer {
    pub fn new(policy: NamingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> NamingPolicy {
        self.policy
    }

    /// Name for an 8-bit sRGB color.
    pub fn classify(&self, rgb: Srgb<u8>) -> &'static str {
        match self.policy {
            NamingPolicy::NearestLab => NAMED_COLORS[find_nearest(rgb).0].name,
            NamingPolicy::HsvThreshold => classify_hsv(rgb),
        }
    }

    /// Name for loosely typed components.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::InvalidInput`] if any component is outside `0..=255`.
    pub fn classify_components(&self, r: i64, g: i64, b: i64) -> Result<&'static str> {
        Ok(self.classify(rgb_from_components(r, g, b)?))
    }

    /// Name every centroid, keeping centroid order and ids.
    ///
    /// Centroids are truncated to integers before lookup.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::InvalidInput`] if a centroid component is not
    /// finite or truncates outside `0..=255`.
    pub fn classify_all(&self, centroids: &[Centroid]) -> Result<Vec<ColorClassification>> {
        centroids
            .iter()
            .enumerate()
            .map(|(color_id, c)| {
                if c.iter().any(|v| !v.is_finite()) {
                    return Err(PaletteError::InvalidInput(format!(
                        "centroid {color_id} has a non-finite component"
                    )));
                }
                let rgb = rgb_from_components(c[0] as i64, c[1] as i64, c[2] as i64)?;
                Ok(ColorClassification {
                    color_id,
                    rgb,
                    name: self.classify(rgb),
                })
            })
            .collect()
    }
}

/// Index into [`NAMED_COLORS`] of the perceptually nearest entry, with its
/// Lab distance.
pub fn find_nearest(rgb: Srgb<u8>) -> (usize, f32) {
    let lab = to_perceptual(rgb);

    let mut best_idx = 0;
    let mut best_dist = f32::MAX;
    for (i, &reference) in NAMED_COLORS_LAB.iter().enumerate() {
        let dist = perceptual_distance(lab, reference);
        if dist < best_dist {
            best_dist = dist;
            best_idx = i;
        }
    }

    (best_idx, best_dist)
}

/// Upper hue bound (exclusive, degrees) and dark/base/light names.
const HUE_FAMILIES: [(f32, [&str; 3]); 8] = [
    (15.0, ["Koyu Kirmizi", "Kirmizi", "Acik Kirmizi"]),
    (40.0, ["Koyu Turuncu", "Turuncu", "Acik Turuncu"]),
    (70.0, ["Koyu Sari", "Sari", "Acik Sari"]),
    (165.0, ["Koyu Yesil", "Yesil", "Acik Yesil"]),
    (195.0, ["Turkuaz", "Camgobegi", "Acik Mavi"]),
    (255.0, ["Koyu Mavi", "Mavi", "Acik Mavi"]),
    (290.0, ["Koyu Mor", "Mor", "Lila"]),
    (345.0, ["Bordo", "Pembe", "Acik Pembe"]),
];

fn classify_hsv(rgb: Srgb<u8>) -> &'static str {
    let (hue, saturation, value) = to_hsv(rgb);

    if value < 0.15 {
        return "Siyah";
    }
    if saturation < 0.15 {
        return match value {
            v if v < 0.35 => "Koyu Gri",
            v if v < 0.65 => "Gri",
            v if v < 0.9 => "Acik Gri",
            _ => "Beyaz",
        };
    }

    // Hues at or past the last bound wrap around to red.
    let family = HUE_FAMILIES
        .iter()
        .find(|(upper, _)| hue < *upper)
        .map_or(HUE_FAMILIES[0].1, |(_, names)| *names);

    if value < 0.5 {
        family[0]
    } else if saturation < 0.5 {
        family[2]
    } else {
        family[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_unique() {
        let mut names: Vec<&str> = NAMED_COLORS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), NAMED_COLORS.len());
    }

    #[test]
    fn test_exact_table_entries_name_themselves() {
        let namer = ColorNamer::default();
        for entry in &NAMED_COLORS {
            assert_eq!(namer.classify(entry.srgb()), entry.name);
            assert_eq!(find_nearest(entry.srgb()).1, 0.0);
        }
    }

    #[test]
    fn test_classify_is_deterministic() {
        let namer = ColorNamer::default();
        let c = Srgb::new(93, 140, 61);
        assert_eq!(namer.classify(c), namer.classify(c));
    }

    #[test]
    fn test_nearest_lab_primaries() {
        let namer = ColorNamer::new(NamingPolicy::NearestLab);
        assert_eq!(namer.classify(Srgb::new(255, 0, 0)), "Kirmizi");
        assert_eq!(namer.classify(Srgb::new(0, 255, 0)), "Yesil");
        // Pure sRGB blue sits closest to the blue-violet entry in Lab.
        assert_eq!(namer.classify(Srgb::new(0, 0, 255)), "Mor");
        assert_eq!(namer.classify(Srgb::new(10, 10, 10)), "Siyah");
        assert_eq!(namer.classify(Srgb::new(250, 250, 250)), "Beyaz");
    }

    #[test]
    fn test_classify_components_rejects_out_of_range() {
        let namer = ColorNamer::default();
        assert_eq!(namer.classify_components(255, 0, 0).unwrap(), "Kirmizi");
        assert!(matches!(
            namer.classify_components(0, 0, 300),
            Err(PaletteError::InvalidInput(_))
        ));
        assert!(matches!(
            namer.classify_components(-5, 0, 0),
            Err(PaletteError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_classify_all_keeps_ids() {
        let namer = ColorNamer::default();
        let result = namer
            .classify_all(&[[255.4, 0.0, 0.0], [128.9, 128.2, 128.0]])
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].color_id, 0);
        assert_eq!(result[0].rgb, Srgb::new(255, 0, 0));
        assert_eq!(result[0].name, "Kirmizi");
        assert_eq!(result[1].color_id, 1);
        assert_eq!(result[1].rgb, Srgb::new(128, 128, 128));
        assert_eq!(result[1].name, "Gri");
    }

    #[test]
    fn test_classify_all_rejects_bad_centroids() {
        let namer = ColorNamer::default();
        assert!(matches!(
            namer.classify_all(&[[256.0, 0.0, 0.0]]),
            Err(PaletteError::InvalidInput(_))
        ));
        assert!(matches!(
            namer.classify_all(&[[f64::NAN, 0.0, 0.0]]),
            Err(PaletteError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_hsv_policy() {
        let namer = ColorNamer::new(NamingPolicy::HsvThreshold);
        assert_eq!(namer.classify(Srgb::new(255, 0, 0)), "Kirmizi");
        assert_eq!(namer.classify(Srgb::new(0, 0, 255)), "Mavi");
        assert_eq!(namer.classify(Srgb::new(0, 0, 100)), "Koyu Mavi");
        assert_eq!(namer.classify(Srgb::new(255, 200, 200)), "Acik Kirmizi");
        assert_eq!(namer.classify(Srgb::new(255, 0, 20)), "Kirmizi");
        assert_eq!(namer.classify(Srgb::new(5, 5, 5)), "Siyah");
        assert_eq!(namer.classify(Srgb::new(128, 128, 128)), "Gri");
        assert_eq!(namer.classify(Srgb::new(250, 250, 250)), "Beyaz");
    }

    #[test]
    fn test_hsv_names_come_from_table() {
        let namer = ColorNamer::new(NamingPolicy::HsvThreshold);
        for r in (0..=255).step_by(51) {
            for g in (0..=255).step_by(51) {
                for b in (0..=255).step_by(51) {
                    let name = namer.classify(Srgb::new(r as u8, g as u8, b as u8));
                    assert!(
                        NAMED_COLORS.iter().any(|c| c.name == name),
                        "{name} is not a table entry"
                    );
                }
            }
        }
    }
}
