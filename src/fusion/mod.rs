pub mod engine;
pub mod summary;

pub use engine::FusionEngine;
pub use summary::{Confidence, SummaryView};
