//! Dominant color extraction and naming.
//!
//! Reduces an RGB image to `k` representative colors with k-means,
//! reports how much of the image each color covers, repaints the image
//! with those colors and gives each one a human-readable name.
//!
//! ```
//! use image::{Rgb, RgbImage};
//! use image_to_palette_wasm::{analyze, AnalysisConfig};
//!
//! let image = RgbImage::from_fn(2, 2, |_, y| {
//!     if y == 0 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
//! });
//! let config = AnalysisConfig { k: 2, ..AnalysisConfig::default() };
//! let analysis = analyze(&image, &config).unwrap();
//!
//! assert_eq!(analysis.dominant_colors.len(), 2);
//! assert_eq!(analysis.dominant_colors[0].percentage, 50.0);
//! ```
//!
//! The same pipeline is exported to JavaScript as [`extract_palette`].

pub mod color;
pub mod error;
pub mod kmeans;
pub mod names;
pub mod pixels;
pub mod reconstruct;
pub mod summary;

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use js_sys::{Array, Object, Reflect, Uint8Array};
use tracing::info;
use wasm_bindgen::prelude::*;

pub use color::{to_hex, to_perceptual};
pub use error::{PaletteError, Result};
pub use kmeans::{cluster, Centroid, Clustering, ConvergenceStatus, KMeans};
pub use names::{ColorClassification, ColorNamer, NamedColor, NamingPolicy, NAMED_COLORS};
pub use pixels::{channel_histograms, ImageInfo, PixelSet, Shape};
pub use reconstruct::{reconstruct, LabelMap};
pub use summary::{summarize, DominantColor};

/// Settings for one [`analyze`] run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    /// Number of palette colors.
    pub k: usize,
    pub seed: u64,
    /// Independent k-means seedings; the tightest one is kept.
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence tolerance relative to the image's color variance.
    pub tol: f64,
    pub policy: NamingPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            k: 8,
            seed: KMeans::DEFAULT_SEED,
            n_init: KMeans::DEFAULT_N_INIT,
            max_iter: KMeans::DEFAULT_MAX_ITER,
            tol: KMeans::DEFAULT_TOL,
            policy: NamingPolicy::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn kmeans(&self) -> KMeans {
        KMeans::new(self.k)
            .with_seed(self.seed)
            .with_n_init(self.n_init)
            .with_max_iter(self.max_iter)
            .with_tol(self.tol)
    }
}

/// Everything [`analyze`] derives from one image.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub info: ImageInfo,
    pub histograms: [[u32; 256]; 3],
    pub clustering: Clustering,
    /// Populated clusters, most common first.
    pub dominant_colors: Vec<DominantColor>,
    /// One entry per centroid, in centroid order.
    pub classifications: Vec<ColorClassification>,
    pub quantized: RgbImage,
    pub label_map: LabelMap,
}

impl Analysis {
    /// Name given to cluster `color_id`.
    pub fn name_of(&self, color_id: usize) -> Option<&'static str> {
        self.classifications.get(color_id).map(|c| c.name)
    }
}

/// Run the whole pipeline on a decoded RGB image.
///
/// # Errors
///
/// - [`PaletteError::InvalidInput`] if the image has no pixels
/// - [`PaletteError::InvalidConfiguration`] for an unusable `k` or k-means setting
pub fn analyze(image: &RgbImage, config: &AnalysisConfig) -> Result<Analysis> {
    let info = ImageInfo::from_image(image)?;
    let histograms = channel_histograms(image);

    let pixels = PixelSet::from_image(image);
    let clustering = config.kmeans().fit(&pixels)?;

    let dominant_colors = summarize(&clustering.centroids, &clustering.labels)?;
    let (quantized, label_map) =
        reconstruct(&clustering.labels, &clustering.centroids, Shape::of(image))?;
    let classifications = ColorNamer::new(config.policy).classify_all(&clustering.centroids)?;

    let dominant = dominant_colors
        .first()
        .map(|c| to_hex(c.rgb))
        .unwrap_or_default();
    info!(
        k = config.k,
        pixels = pixels.len(),
        iterations = clustering.iterations,
        converged = clustering.converged(),
        %dominant,
        "palette analysis finished"
    );

    Ok(Analysis {
        info,
        histograms,
        clustering,
        dominant_colors,
        classifications,
        quantized,
        label_map,
    })
}

/// Decode an encoded image (PNG, JPEG, ...) and [`analyze`] it.
pub fn analyze_bytes(input: &[u8], config: &AnalysisConfig) -> Result<Analysis> {
    let img = image::load_from_memory(input)?;
    analyze(&img.to_rgb8(), config)
}

/// Palette of an encoded image as `RRGGBB` strings, most common first.
pub fn extract_palette_bytes(input: &[u8], n_colors: usize, seed: u64) -> Result<Vec<String>> {
    let config = AnalysisConfig {
        k: n_colors,
        seed,
        ..AnalysisConfig::default()
    };
    let analysis = analyze_bytes(input, &config)?;
    Ok(analysis
        .dominant_colors
        .iter()
        .map(|c| to_hex(c.rgb))
        .collect())
}

/// PNG-encode an RGB raster.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buf);
        image.write_to(&mut cursor, ImageFormat::Png)?;
    }
    Ok(buf)
}

/// Extract and name the dominant colors of an encoded image.
///
/// Returns `{ image, palette, converged }` where `image` is the PNG-encoded
/// quantized image and `palette` lists `{ colorId, hex, rgb, percentage, name }`
/// objects, most common first.
#[wasm_bindgen]
pub fn extract_palette(
    input: Vec<u8>,
    n_colors: usize,
    seed: u32,
) -> std::result::Result<Object, JsValue> {
    let config = AnalysisConfig {
        k: n_colors,
        seed: seed as u64,
        ..AnalysisConfig::default()
    };
    let analysis =
        analyze_bytes(&input, &config).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let encoded = encode_png(&analysis.quantized)
        .map_err(|e| JsValue::from_str(&format!("PNG encode error: {e}")))?;

    let palette_js = Array::new();
    for color in &analysis.dominant_colors {
        let entry = Object::new();
        let rgb = Array::new();
        for channel in [color.rgb.red, color.rgb.green, color.rgb.blue] {
            rgb.push(&JsValue::from(channel as u32));
        }
        let name = analysis.name_of(color.color_id).unwrap_or("?");

        Reflect::set(
            &entry,
            &JsValue::from_str("colorId"),
            &JsValue::from(color.color_id as u32),
        )?;
        Reflect::set(
            &entry,
            &JsValue::from_str("hex"),
            &JsValue::from_str(&to_hex(color.rgb)),
        )?;
        Reflect::set(&entry, &JsValue::from_str("rgb"), &rgb)?;
        Reflect::set(
            &entry,
            &JsValue::from_str("percentage"),
            &JsValue::from(color.percentage),
        )?;
        Reflect::set(&entry, &JsValue::from_str("name"), &JsValue::from_str(name))?;
        palette_js.push(&entry);
    }

    let result = Object::new();
    Reflect::set(
        &result,
        &JsValue::from_str("image"),
        &Uint8Array::from(encoded.as_slice()),
    )?;
    Reflect::set(&result, &JsValue::from_str("palette"), &palette_js)?;
    Reflect::set(
        &result,
        &JsValue::from_str("converged"),
        &JsValue::from_bool(analysis.clustering.converged()),
    )?;

    Ok(result)
}
