// Identity-card extraction CLI
//
// Decodes the QR symbol on the back photo, reads recognized text for both
// sides and prints the fused record as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use idfusion::{
    utils::{write_atomically, DocumentImages},
    DocumentPipeline, ExtractionError, PipelineConfig, Result, SummaryView,
};
use log::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Complete report with breakdown and raw sources
    Full,
    /// Compact view with masked identifiers only
    Summary,
}

/// Extract identity fields from a front/back card photo pair
#[derive(Parser, Debug)]
#[command(name = "idfusion")]
#[command(version, about, long_about = None)]
struct Args {
    /// Front side photo
    #[arg(long)]
    front: Option<PathBuf>,

    /// Back side photo (carries the QR symbol)
    #[arg(long)]
    back: Option<PathBuf>,

    /// Folder to search for front/back photos when they are not given
    #[arg(long, default_value = "images")]
    images_dir: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the JSON here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Full)]
    format: OutputFormat,

    /// Disable translation of non-English text
    #[arg(long)]
    no_translate: bool,
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if args.no_translate {
        config.translation.enabled = false;
    }

    let pipeline = DocumentPipeline::new(config);
    let report = if args.front.is_some() || args.back.is_some() {
        pipeline.process(&DocumentImages {
            front: args.front.clone(),
            back: args.back.clone(),
        })
    } else {
        pipeline.process_directory(&args.images_dir)?
    };

    let json = match args.format {
        OutputFormat::Full => serde_json::to_string_pretty(&report),
        OutputFormat::Summary => serde_json::to_string_pretty(&SummaryView::from_report(&report)),
    }
    .map_err(|e| ExtractionError::Encoding(format!("Failed to serialize report: {}", e)))?;

    match &args.output {
        Some(path) => {
            write_atomically(path, json.as_bytes())?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
