//! Sheet Overlay CLI
//!
//! Offline calibration extraction, single-rectangle conversion and a
//! headless viewer simulation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sheet_overlay::calibration::{io, CalibrationExtractor, CalibrationReference, OverlayDataset};
use sheet_overlay::geometry::{CalibrationOffset, ConversionParameters, NativeRect, PixelTransformer};
use sheet_overlay::host::memory::{ControlSpec, MemoryContainer, MemoryDocument, MemoryEngineFactory};
use sheet_overlay::host::ControlKind;
use sheet_overlay::sync::FieldValueMap;
use sheet_overlay::viewer::{ViewerEvent, ViewerLifecycleController, ViewerProps, ViewerState};
use sheet_overlay::Config;

/// Locator the simulated engine serves the overlay under
const SIMULATED_DOCUMENT: &str = "overlay://sheet";

#[derive(Parser)]
#[command(name = "sheet-overlay")]
#[command(about = "Aligned form-field overlays for fixed-layout character sheets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Conversion parameters overriding the environment
#[derive(clap::Args)]
struct ConversionArgs {
    /// Rendering scale factor
    #[arg(long)]
    scale: Option<f64>,

    /// Rendering resolution in dots per inch
    #[arg(long)]
    dpi: Option<f64>,

    /// Page height in points
    #[arg(long)]
    page_height: Option<f64>,
}

impl ConversionArgs {
    fn resolve(&self, defaults: &ConversionParameters) -> Result<ConversionParameters> {
        let params = ConversionParameters::new(
            self.scale.unwrap_or(defaults.scale),
            self.dpi.unwrap_or(defaults.dpi),
            self.page_height.unwrap_or(defaults.page_height_pt),
        )?;
        Ok(params)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the overlay position dataset from a coordinate dataset
    Extract {
        /// Coordinate dataset (native rectangles)
        #[arg(short, long)]
        input: PathBuf,

        /// Overlay dataset to write
        #[arg(short, long)]
        output: PathBuf,

        /// Previous overlay dataset for pass-through entries (defaults to the existing output)
        #[arg(long)]
        prior: Option<PathBuf>,

        /// Reference field with a known on-screen position
        #[arg(long)]
        reference: Option<String>,

        #[command(flatten)]
        conversion: ConversionArgs,
    },

    /// Convert one native rectangle to pixel space
    Convert {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,

        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        offset_x: f64,

        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        offset_y: f64,

        #[command(flatten)]
        conversion: ConversionArgs,
    },

    /// Run a viewer lifecycle against the in-memory host
    Simulate {
        /// Overlay dataset providing the controls
        #[arg(short, long)]
        overlay: PathBuf,

        /// JSON object of initial field values
        #[arg(long)]
        values: Option<PathBuf>,

        /// Mark every control read-only
        #[arg(long)]
        read_only: bool,
    },
}

// The viewer controller checks liveness and then touches the container
// without holding a lock, so it runs on a single-threaded runtime.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheet_overlay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract {
            input,
            output,
            prior,
            reference,
            conversion,
        } => {
            cmd_extract(&config, &input, &output, prior.as_deref(), reference, &conversion).await?;
        }
        Commands::Convert {
            x1,
            y1,
            x2,
            y2,
            offset_x,
            offset_y,
            conversion,
        } => {
            let params = conversion.resolve(&config.conversion)?;
            cmd_convert(params, NativeRect::new(x1, y1, x2, y2), CalibrationOffset::new(offset_x, offset_y))?;
        }
        Commands::Simulate {
            overlay,
            values,
            read_only,
        } => {
            cmd_simulate(&config, &overlay, values.as_deref(), read_only).await?;
        }
    }

    Ok(())
}

async fn cmd_extract(
    config: &Config,
    input: &Path,
    output: &Path,
    prior: Option<&Path>,
    reference: Option<String>,
    conversion: &ConversionArgs,
) -> Result<()> {
    let params = conversion.resolve(&config.conversion)?;
    let reference = CalibrationReference::new(
        reference.unwrap_or_else(|| config.calibration.reference_field.clone()),
        config.calibration.reference_position,
    );
    let extractor = CalibrationExtractor::new(params, reference, config.calibration.manual_correction)
        .context("Invalid calibration reference")?;

    let coordinates = io::load_coordinates(input)
        .await
        .with_context(|| format!("Failed to read coordinate dataset {}", input.display()))?;
    let prior = match prior {
        Some(path) => Some(
            io::load_overlay(path)
                .await
                .with_context(|| format!("Failed to read prior overlay {}", path.display()))?,
        ),
        None => io::load_overlay_if_exists(output).await?,
    };

    let dataset = extractor
        .extract(&coordinates, prior.as_ref())
        .context("Extraction failed")?;
    io::write_overlay(output, &dataset)
        .await
        .with_context(|| format!("Failed to write overlay dataset {}", output.display()))?;

    let metadata = &dataset.metadata;
    println!("Wrote {} ({} fields)", output.display(), metadata.field_count);
    println!("Offset: x={} y={}", metadata.offset_x, metadata.offset_y);
    if !metadata.pass_through_fields.is_empty() {
        println!("Passed through: {}", metadata.pass_through_fields.join(", "));
    }
    if !metadata.degenerate_fields.is_empty() {
        println!("Degenerate: {}", metadata.degenerate_fields.join(", "));
    }
    Ok(())
}

fn cmd_convert(params: ConversionParameters, rect: NativeRect, offset: CalibrationOffset) -> Result<()> {
    let transformer = PixelTransformer::new(params);
    let position = transformer.to_corrected_rect(&rect, &offset).rounded();
    println!("{}", serde_json::to_string_pretty(&position)?);
    Ok(())
}

/// Lay positioned fields out on pages by their top edge
fn simulated_document(dataset: &OverlayDataset, page_height_px: f64) -> MemoryDocument {
    let mut pages: BTreeMap<usize, Vec<ControlSpec>> = BTreeMap::new();
    for (name, field) in dataset.positioned() {
        let page = if page_height_px > 0.0 {
            (field.position.top.max(0.0) / page_height_px) as usize
        } else {
            0
        };
        let kind = ControlKind::from(field.attributes.kind());
        pages
            .entry(page)
            .or_default()
            .push(ControlSpec::with_kind(name, kind));
    }

    let page_count = pages.keys().next_back().map_or(1, |last| last + 1);
    let mut laid_out = vec![Vec::new(); page_count];
    for (index, controls) in pages {
        laid_out[index] = controls;
    }
    MemoryDocument::new(laid_out).with_page_height(page_height_px)
}

async fn cmd_simulate(
    config: &Config,
    overlay: &Path,
    values: Option<&Path>,
    read_only: bool,
) -> Result<()> {
    let dataset = io::load_overlay(overlay)
        .await
        .with_context(|| format!("Failed to read overlay dataset {}", overlay.display()))?;
    let initial_values: FieldValueMap = match values {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read values {}", path.display()))?;
            serde_json::from_str(&raw).context("Values must be a JSON object of strings")?
        }
        None => FieldValueMap::new(),
    };

    let metadata = &dataset.metadata;
    let page_height_px = metadata.page_height_pt * metadata.points_to_pixels;
    let container = Arc::new(MemoryContainer::new(1024.0, 768.0));
    let factory = MemoryEngineFactory::new(container.clone())
        .with_document(SIMULATED_DOCUMENT, simulated_document(&dataset, page_height_px));

    let props = ViewerProps::new(SIMULATED_DOCUMENT)
        .with_initial_values(initial_values)
        .read_only(read_only);
    let (mut controller, mut events) = ViewerLifecycleController::new(
        config.viewer.clone(),
        container,
        Arc::new(factory),
        props,
    );
    controller.set_visible(true);

    let deadline = Duration::from_secs(30);
    loop {
        let event = tokio::time::timeout(deadline, events.recv())
            .await
            .context("Viewer did not become ready")?;
        match event {
            Some(ViewerEvent::StateChanged { state, .. }) => {
                println!("state: {}", serde_json::to_string(&state)?.trim_matches('"'));
            }
            Some(ViewerEvent::Values(values)) if controller.state() == ViewerState::Ready => {
                println!("{}", serde_json::to_string_pretty(&values)?);
                break;
            }
            Some(ViewerEvent::Values(_)) => {}
            Some(ViewerEvent::LoadFailed { message, .. }) => bail!(message),
            None => bail!("Viewer event stream closed"),
        }
    }

    controller.unmount();
    Ok(())
}
