use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_to_palette_wasm::{analyze, to_hex, Analysis, AnalysisConfig, NamingPolicy};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    /// Nearest named color in CIE Lab
    Lab,
    /// Hue/saturation/value buckets
    Hsv,
}

impl From<Policy> for NamingPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Lab => NamingPolicy::NearestLab,
            Policy::Hsv => NamingPolicy::HsvThreshold,
        }
    }
}

/// Extract, quantize and name the dominant colors of images.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of palette colors (k-means clusters)
    #[arg(short = 'k', long, default_value_t = 8)]
    n_colors: usize,

    /// Seed for k-means initialization
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Number of k-means restarts
    #[arg(long, default_value_t = 10)]
    n_init: usize,

    /// Iteration cap per restart
    #[arg(long, default_value_t = 300)]
    max_iter: usize,

    /// How palette colors are named
    #[arg(long, value_enum, default_value_t = Policy::Lab)]
    policy: Policy,

    /// Output directory
    #[arg(short = 'd', long, default_value = "outputs")]
    out_dir: PathBuf,

    /// Also write a JSON report next to the segmented image
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_to_palette_wasm=info,palette_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let args = Args::parse();
    let config = AnalysisConfig {
        k: args.n_colors,
        seed: args.seed,
        n_init: args.n_init,
        max_iter: args.max_iter,
        policy: args.policy.into(),
        ..AnalysisConfig::default()
    };

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    for input in &args.inputs {
        tracing::info!(path = %input.display(), "loading image");
        let image = image::open(input)
            .with_context(|| format!("unable to decode {}", input.display()))?
            .to_rgb8();

        let analysis = analyze(&image, &config)
            .with_context(|| format!("palette analysis failed for {}", input.display()))?;
        if !analysis.clustering.converged() {
            tracing::warn!(
                path = %input.display(),
                "k-means hit the iteration cap; palette may be unstable"
            );
        }

        print_report(input, &analysis);

        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let segmented = args.out_dir.join(format!("{stem}_segmented.png"));
        analysis
            .quantized
            .save(&segmented)
            .with_context(|| format!("writing {}", segmented.display()))?;
        println!("Saved → {}", segmented.display());

        if args.json {
            let report_path = args.out_dir.join(format!("{stem}_report.json"));
            let report = serde_json::to_string_pretty(&report_json(input, &config, &analysis))?;
            fs::write(&report_path, report)
                .with_context(|| format!("writing {}", report_path.display()))?;
            println!("Saved → {}", report_path.display());
        }
    }

    Ok(())
}

fn print_report(input: &Path, analysis: &Analysis) {
    let info = &analysis.info;
    println!("{}", input.display());
    println!(
        "  {}x{} px, {} channels, values [{}, {}], mean {}",
        info.width, info.height, info.channels, info.min_value, info.max_value, info.mean_value
    );
    for (rank, color) in analysis.dominant_colors.iter().enumerate() {
        let rgb = color.rgb;
        println!(
            "  #{:<2} RGB({:3}, {:3}, {:3})  #{}  {:6.2}%  {}",
            rank + 1,
            rgb.red,
            rgb.green,
            rgb.blue,
            to_hex(rgb),
            color.percentage,
            analysis.name_of(color.color_id).unwrap_or("?")
        );
    }
}

fn report_json(input: &Path, config: &AnalysisConfig, analysis: &Analysis) -> serde_json::Value {
    let info = &analysis.info;
    let dominant: Vec<_> = analysis
        .dominant_colors
        .iter()
        .map(|c| {
            json!({
                "color_id": c.color_id,
                "rgb": [c.rgb.red, c.rgb.green, c.rgb.blue],
                "hex": to_hex(c.rgb),
                "percentage": c.percentage,
                "name": analysis.name_of(c.color_id),
            })
        })
        .collect();
    let names: Vec<_> = analysis
        .classifications
        .iter()
        .map(|c| {
            json!({
                "color_id": c.color_id,
                "rgb": [c.rgb.red, c.rgb.green, c.rgb.blue],
                "name": c.name,
            })
        })
        .collect();

    json!({
        "image": input.display().to_string(),
        "info": {
            "height": info.height,
            "width": info.width,
            "channels": info.channels,
            "total_pixels": info.total_pixels,
            "min_value": info.min_value,
            "max_value": info.max_value,
            "mean_value": info.mean_value,
        },
        "kmeans": {
            "k": config.k,
            "seed": config.seed,
            "n_init": config.n_init,
            "iterations": analysis.clustering.iterations,
            "inertia": analysis.clustering.inertia,
            "converged": analysis.clustering.converged(),
        },
        "histograms": {
            "red": analysis.histograms[0].to_vec(),
            "green": analysis.histograms[1].to_vec(),
            "blue": analysis.histograms[2].to_vec(),
        },
        "dominant_colors": dominant,
        "color_names": names,
    })
}
