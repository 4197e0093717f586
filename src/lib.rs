pub mod config;
pub mod fusion;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod services;
pub mod utils;
pub mod validation;

pub use config::PipelineConfig;
pub use fusion::{FusionEngine, SummaryView};
pub use pipeline::DocumentPipeline;
pub use processing::{BarcodeDecoder, TextFieldExtractor};
pub use utils::{ExtractionError, Result};
pub use validation::Gazetteer;
