use anyhow::{Context, Result};
use clap::Parser;
use nutrivision::output::{JsonReport, ReportSink, TableReport};
use nutrivision::{DetectionSource, EstimatorConfig, JsonDetections, Pipeline};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Estimate food calories from a photo with a thumb for scale", long_about = None)]
struct Args {
    /// Input image file
    #[arg(short, long)]
    image: PathBuf,

    /// Detector output (JSON list of labelled boxes)
    #[arg(short, long)]
    detections: PathBuf,

    /// Estimator configuration (TOML); defaults to $NUTRIVISION_CONFIG or built-in tables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "table")]
    format: FormatArg,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Json,
    Table,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    tracing::info!("NutriVision starting");
    tracing::info!("Image: {}", args.image.display());
    tracing::info!("Detections: {}", args.detections.display());

    let config = EstimatorConfig::load(args.config.as_deref())
        .context("Failed to load estimator configuration")?;
    let pipeline = Pipeline::new(config);
    tracing::info!(
        "Reference '{}', {} food profile(s), margin {}px",
        pipeline.config().reference_label,
        pipeline.config().foods.len(),
        pipeline.config().margin_px
    );

    let image = image::open(&args.image)
        .with_context(|| format!("Failed to open image {}", args.image.display()))?
        .to_rgb8();
    tracing::info!("Image size: {}x{}", image.width(), image.height());

    let detections = JsonDetections::new(&args.detections)
        .detections()
        .context("Failed to load detections")?;

    let start = Instant::now();
    let report = pipeline.process(&image, &detections);
    tracing::debug!("Pipeline took {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let mut sink: Box<dyn ReportSink> = match args.format {
        FormatArg::Json => Box::new(JsonReport::new(writer)),
        FormatArg::Table => Box::new(TableReport::new(writer)),
    };
    sink.write_report(&report)?;

    Ok(())
}
