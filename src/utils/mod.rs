pub mod error;
pub mod files;
pub mod masking;

pub use error::{ExtractionError, Result};
pub use files::{find_document_images, write_atomically, DocumentImages};
pub use masking::{mask_identifier, mask_payload, redact_identifiers_in_text};
