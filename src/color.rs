//! Color space conversion.
//!
//! Cluster centroids live in device sRGB. Naming compares colors in CIE
//! L\*a\*b\* (D65 white point) where Euclidean distance tracks perceived
//! difference: sRGB is gamma-decoded to linear light first, then mapped
//! through XYZ into Lab by the `palette` crate.

use palette::{Hsv, IntoColor, Lab, LinSrgb, Srgb};

use crate::error::{PaletteError, Result};

/// Convert an 8-bit sRGB color to CIE L\*a\*b\*.
///
/// The result is true CIE Lab with `l` in `0.0..=100.0` and unscaled `a` and
/// `b`. This is not the 8-bit Lab some imaging libraries produce, which
/// stretches L to `0..=255` and offsets a and b by 128. Stretching L alone
/// changes relative distances, so nearest-name lookups can disagree with
/// such libraries for colors close to a boundary between two names. Pure
/// blue lands on the same name under both.
pub fn to_perceptual(rgb: Srgb<u8>) -> Lab {
    let linear: LinSrgb<f32> = rgb.into_linear();
    linear.into_color()
}

/// Euclidean distance between two Lab colors (CIE76 delta E).
#[inline]
pub fn perceptual_distance(a: Lab, b: Lab) -> f32 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// Build an 8-bit color from wide integer components.
///
/// # Errors
///
/// Returns [`PaletteError::InvalidInput`] if any component is outside `0..=255`.
/// Values are never clamped.
pub fn rgb_from_components(r: i64, g: i64, b: i64) -> Result<Srgb<u8>> {
    let check = |name: &str, v: i64| -> Result<u8> {
        u8::try_from(v).map_err(|_| {
            PaletteError::InvalidInput(format!("{name} component {v} is outside 0..=255"))
        })
    };
    Ok(Srgb::new(check("red", r)?, check("green", g)?, check("blue", b)?))
}

/// Truncate a floating-point centroid to 8-bit channels.
///
/// Fractions are dropped toward zero; values beyond the channel range
/// saturate at 0 or 255.
pub fn truncate_centroid(centroid: [f64; 3]) -> Srgb<u8> {
    Srgb::new(centroid[0] as u8, centroid[1] as u8, centroid[2] as u8)
}

/// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
pub fn to_hsv(rgb: Srgb<u8>) -> (f32, f32, f32) {
    let hsv: Hsv = rgb.into_format::<f32>().into_color();
    (hsv.hue.into_positive_degrees(), hsv.saturation, hsv.value)
}

/// Uppercase `RRGGBB` without a leading `#`.
pub fn to_hex(rgb: Srgb<u8>) -> String {
    format!("{:02X}{:02X}{:02X}", rgb.red, rgb.green, rgb.blue)
}
