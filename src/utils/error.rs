use thiserror::Error;

/// Failures at the collaborator boundaries of the pipeline.
///
/// Core components (barcode decoding, text heuristics, fusion, gazetteer)
/// never return this type; they report misses as absent values.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Image loading error: {0}")]
    ImageLoad(String),

    #[error("Text recognition error: {0}")]
    Recognition(String),

    #[error("Structured record parsing error: {0}")]
    RecordParse(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractionError>;
