pub mod barcode;
pub mod decoders;
pub mod extractors;
pub mod image_processor;
pub mod ocr;
pub mod structured_record;
pub mod text_cleaner;

pub use barcode::{BarcodeDecoder, DecodeOutcome, DecodeStrategy};
pub use decoders::{RqrrDecoder, RxingDecoder, SymbolDecoder};
pub use extractors::{AddressParts, TextFieldExtractor};
pub use image_processor::{ImageProcessor, QuarterTurn};
pub use ocr::{SidecarTextRecognizer, TextRecognizer};
#[cfg(feature = "tesseract")]
pub use ocr::TesseractRecognizer;
pub use structured_record::parse_structured_record;
pub use text_cleaner::TextCleaner;
