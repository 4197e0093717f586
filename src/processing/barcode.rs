use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage};
use log::{debug, info, warn};
use serde::Serialize;

use super::decoders::{RqrrDecoder, RxingDecoder, SymbolDecoder};
use super::image_processor::{ImageProcessor, PreparedVariants, QuarterTurn};
use crate::config::BarcodeSettings;

/// Locate-and-decode stages, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStrategy {
    /// General-purpose decoder on the untouched image.
    Direct,
    /// QR detector on the untouched image.
    DirectDetector,
    /// Perspective-corrected crop of the largest quadrilateral, at several scales.
    Rectified,
    /// Adaptive threshold of three variants, each in four orientations.
    ThresholdSweep,
}

impl DecodeStrategy {
    pub const ORDER: [DecodeStrategy; 4] = [
        DecodeStrategy::Direct,
        DecodeStrategy::DirectDetector,
        DecodeStrategy::Rectified,
        DecodeStrategy::ThresholdSweep,
    ];
}

/// What the chain produced and how much work it took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeOutcome {
    pub payload: Option<String>,
    pub strategy: Option<DecodeStrategy>,
    pub attempts: usize,
}

/// Runs the fallback chain over one image. Stages run strictly in order and
/// the first decoded payload ends the search; every internal failure counts
/// as "nothing found".
pub struct BarcodeDecoder {
    general: Box<dyn SymbolDecoder>,
    detector: Box<dyn SymbolDecoder>,
    settings: BarcodeSettings,
}

struct Attempts {
    count: usize,
}

impl BarcodeDecoder {
    pub fn new(settings: BarcodeSettings) -> Self {
        Self::with_decoders(Box::new(RxingDecoder), Box::new(RqrrDecoder), settings)
    }

    pub fn with_decoders(
        general: Box<dyn SymbolDecoder>,
        detector: Box<dyn SymbolDecoder>,
        settings: BarcodeSettings,
    ) -> Self {
        BarcodeDecoder {
            general,
            detector,
            settings,
        }
    }

    /// Upper bound on decoder invocations for one image.
    pub fn max_attempts(&self) -> usize {
        2 + 2 * self.settings.rectified_scales.len() + 2 * 3 * QuarterTurn::ALL.len()
    }

    pub fn decode(&self, image: &DynamicImage) -> Option<String> {
        self.decode_detailed(image).payload
    }

    /// Loads `path` and decodes it; an unreadable file is a miss.
    pub fn decode_file(&self, path: &Path) -> Option<String> {
        match ImageProcessor::load(path) {
            Ok(image) => self.decode(&image),
            Err(e) => {
                warn!("Barcode decode skipped: {}", e);
                None
            }
        }
    }

    pub fn decode_detailed(&self, image: &DynamicImage) -> DecodeOutcome {
        let mut attempts = Attempts { count: 0 };
        if image.width() == 0 || image.height() == 0 {
            debug!("Empty image, nothing to decode");
            return DecodeOutcome {
                payload: None,
                strategy: None,
                attempts: attempts.count,
            };
        }

        let rgb = image.to_rgb8();
        let gray = DynamicImage::ImageRgb8(rgb.clone()).to_luma8();
        let mut variants: Option<Option<PreparedVariants>> = None;

        for strategy in DecodeStrategy::ORDER {
            let found = match strategy {
                DecodeStrategy::Direct => self.attempt(&*self.general, &gray, &mut attempts),
                DecodeStrategy::DirectDetector => {
                    self.attempt(&*self.detector, &gray, &mut attempts)
                }
                DecodeStrategy::Rectified => self
                    .prepared(&mut variants, &gray)
                    .and_then(|prepared| self.try_rectified(&rgb, prepared, &mut attempts)),
                DecodeStrategy::ThresholdSweep => self
                    .prepared(&mut variants, &gray)
                    .and_then(|prepared| self.try_threshold_sweep(prepared, &mut attempts)),
            };

            match found {
                Some(payload) => {
                    info!(
                        "Barcode decoded by {:?} after {} attempts",
                        strategy, attempts.count
                    );
                    return DecodeOutcome {
                        payload: Some(payload),
                        strategy: Some(strategy),
                        attempts: attempts.count,
                    };
                }
                None => debug!("Barcode strategy {:?} found nothing", strategy),
            }
        }

        info!("No barcode found after {} attempts", attempts.count);
        DecodeOutcome {
            payload: None,
            strategy: None,
            attempts: attempts.count,
        }
    }

    /// Builds the shared variants on first use. A failed build is remembered
    /// so later stages skip instead of retrying it.
    fn prepared<'a>(
        &self,
        variants: &'a mut Option<Option<PreparedVariants>>,
        gray: &GrayImage,
    ) -> Option<&'a PreparedVariants> {
        variants
            .get_or_insert_with(|| {
                contained("preprocessing", || {
                    ImageProcessor::prepare_variants(gray, &self.settings)
                })
            })
            .as_ref()
    }

    fn try_rectified(
        &self,
        rgb: &RgbImage,
        prepared: &PreparedVariants,
        attempts: &mut Attempts,
    ) -> Option<String> {
        let crop = contained("rectification", || {
            ImageProcessor::rectify(rgb, &prepared.equalized, &self.settings)
        })
        .flatten()?;
        debug!("Rectified crop {}x{}", crop.width(), crop.height());

        self.settings.rectified_scales.iter().find_map(|&factor| {
            let scaled = contained("scaling", || ImageProcessor::scale(&crop, factor))?;
            let scaled_gray = DynamicImage::ImageRgb8(scaled).to_luma8();
            self.attempt_both(&scaled_gray, attempts)
        })
    }

    fn try_threshold_sweep(
        &self,
        prepared: &PreparedVariants,
        attempts: &mut Attempts,
    ) -> Option<String> {
        let sources = [&prepared.equalized, &prepared.denoised, &prepared.gray];
        for source in sources {
            let Some(binary) = contained("thresholding", || {
                ImageProcessor::binarize(source, self.settings.threshold_block_radius)
            }) else {
                continue;
            };
            for turn in QuarterTurn::ALL {
                let rotated = ImageProcessor::rotate(&binary, turn);
                if let Some(payload) = self.attempt_both(&rotated, attempts) {
                    debug!("Threshold sweep hit at {} degrees", turn.degrees());
                    return Some(payload);
                }
            }
        }
        None
    }

    fn attempt_both(&self, image: &GrayImage, attempts: &mut Attempts) -> Option<String> {
        self.attempt(&*self.general, image, attempts)
            .or_else(|| self.attempt(&*self.detector, image, attempts))
    }

    fn attempt(
        &self,
        decoder: &dyn SymbolDecoder,
        image: &GrayImage,
        attempts: &mut Attempts,
    ) -> Option<String> {
        attempts.count += 1;
        contained(decoder.name(), || decoder.decode(image)).flatten()
    }
}

/// Runs one stage, turning a panic inside it into "nothing found".
fn contained<T>(stage: &str, run: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Barcode stage {} panicked; treating as no result", stage);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::decoders::test_symbols::render_qr;
    use image::Luma;
    use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Never finds anything; counts how often it was asked.
    struct CountingMiss {
        calls: Arc<AtomicUsize>,
    }

    impl SymbolDecoder for CountingMiss {
        fn name(&self) -> &'static str {
            "counting-miss"
        }

        fn decode(&self, _image: &GrayImage) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    /// Only "reads" images that are purely black and white.
    struct BinaryOnly;

    impl SymbolDecoder for BinaryOnly {
        fn name(&self) -> &'static str {
            "binary-only"
        }

        fn decode(&self, image: &GrayImage) -> Option<String> {
            if image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255) {
                Some("from-threshold".to_string())
            } else {
                None
            }
        }
    }

    struct Panicking;

    impl SymbolDecoder for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn decode(&self, _image: &GrayImage) -> Option<String> {
            panic!("decoder bug");
        }
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let gray = GrayImage::from_fn(width, height, |x, y| Luma([(20 + x * 3 + y * 2) as u8]));
        DynamicImage::ImageLuma8(gray)
    }

    #[test]
    fn test_upright_symbol_decoded_directly() {
        let payload = r#"<PrintLetterBarcodeData uid="123456789012" name="Asha Devi"/>"#;
        let image = DynamicImage::ImageLuma8(render_qr(payload, 5));
        let outcome = BarcodeDecoder::new(BarcodeSettings::default()).decode_detailed(&image);
        assert_eq!(outcome.payload.as_deref(), Some(payload));
        assert_eq!(outcome.strategy, Some(DecodeStrategy::Direct));
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn test_rotated_symbols_decoded() {
        let payload = "ROTATED-PAYLOAD-42";
        let decoder = BarcodeDecoder::new(BarcodeSettings::default());
        let upright = render_qr(payload, 5);
        for turn in [QuarterTurn::Cw90, QuarterTurn::Cw180, QuarterTurn::Cw270] {
            let rotated = DynamicImage::ImageLuma8(ImageProcessor::rotate(&upright, turn));
            assert_eq!(decoder.decode(&rotated).as_deref(), Some(payload), "{:?}", turn);
        }
    }

    #[test]
    fn test_blank_image_not_found_within_bound() {
        let calls = Arc::new(AtomicUsize::new(0));
        let decoder = BarcodeDecoder::with_decoders(
            Box::new(CountingMiss { calls: calls.clone() }),
            Box::new(CountingMiss { calls: calls.clone() }),
            BarcodeSettings::default(),
        );
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 48, Luma([255])));
        let outcome = decoder.decode_detailed(&blank);

        assert_eq!(outcome.payload, None);
        assert_eq!(outcome.strategy, None);
        assert_eq!(outcome.attempts, calls.load(Ordering::SeqCst));
        assert!(outcome.attempts <= decoder.max_attempts());
        // Direct stages plus the full 3 x 4 sweep with both decoders.
        assert!(outcome.attempts >= 2 + 24);
    }

    #[test]
    fn test_threshold_sweep_reached_after_direct_misses() {
        let decoder = BarcodeDecoder::with_decoders(
            Box::new(BinaryOnly),
            Box::new(BinaryOnly),
            BarcodeSettings::default(),
        );
        let outcome = decoder.decode_detailed(&gradient(40, 30));
        assert_eq!(outcome.payload.as_deref(), Some("from-threshold"));
        assert_eq!(outcome.strategy, Some(DecodeStrategy::ThresholdSweep));
    }

    #[test]
    fn test_decoder_panic_is_contained() {
        let decoder = BarcodeDecoder::with_decoders(
            Box::new(Panicking),
            Box::new(Panicking),
            BarcodeSettings::default(),
        );
        let outcome = decoder.decode_detailed(&gradient(32, 24));
        assert_eq!(outcome.payload, None);
    }

    /// Misses the first `skip` calls, then delegates to the real reader.
    struct MissFirst {
        skip: usize,
        calls: AtomicUsize,
    }

    impl SymbolDecoder for MissFirst {
        fn name(&self) -> &'static str {
            "miss-first"
        }

        fn decode(&self, image: &GrayImage) -> Option<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.skip {
                return None;
            }
            RxingDecoder.decode(image)
        }
    }

    /// Records the dimensions of every image it is handed.
    struct Recording {
        seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl SymbolDecoder for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn decode(&self, image: &GrayImage) -> Option<String> {
            self.seen.lock().unwrap().push(image.dimensions());
            None
        }
    }

    const CARD_CORNERS: [(f32, f32); 4] =
        [(70.0, 60.0), (330.0, 80.0), (320.0, 340.0), (60.0, 320.0)];

    /// A white card carrying a QR symbol, perspective-skewed onto a dark
    /// 400x400 background.
    fn skewed_card(payload: &str) -> DynamicImage {
        let symbol = render_qr(payload, 5);
        let side = 240;
        let mut card = GrayImage::from_pixel(side, side, Luma([255]));
        let offset = ((side - symbol.width()) / 2) as i64;
        image::imageops::overlay(&mut card, &symbol, offset, offset);

        let edge = (side - 1) as f32;
        let projection = Projection::from_control_points(
            [(0.0, 0.0), (edge, 0.0), (edge, edge), (0.0, edge)],
            CARD_CORNERS,
        )
        .unwrap();
        let mut canvas = GrayImage::new(400, 400);
        warp_into(&card, &projection, Interpolation::Bilinear, Luma([30]), &mut canvas);
        DynamicImage::ImageLuma8(canvas)
    }

    #[test]
    fn test_skewed_card_located_on_equalized_variant() {
        let settings = BarcodeSettings::default();
        let gray = skewed_card("SKEWED-CARD-PAYLOAD").to_luma8();
        let prepared = ImageProcessor::prepare_variants(&gray, &settings);
        let corners = ImageProcessor::find_quadrilateral(&prepared.equalized, &settings).unwrap();

        for (found, expected) in corners.iter().zip(CARD_CORNERS.iter()) {
            assert!(
                (found.0 - expected.0).abs() <= 6.0 && (found.1 - expected.1).abs() <= 6.0,
                "corner {:?} too far from {:?}",
                found,
                expected
            );
        }
    }

    #[test]
    fn test_skewed_symbol_decoded_after_rectification() {
        let payload = "SKEWED-CARD-PAYLOAD";
        let decoder = BarcodeDecoder::with_decoders(
            Box::new(MissFirst {
                skip: 1,
                calls: AtomicUsize::new(0),
            }),
            Box::new(CountingMiss {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            BarcodeSettings::default(),
        );

        let outcome = decoder.decode_detailed(&skewed_card(payload));
        assert_eq!(outcome.payload.as_deref(), Some(payload));
        assert_eq!(outcome.strategy, Some(DecodeStrategy::Rectified));
    }

    #[test]
    fn test_sweep_visits_rotations_inside_each_variant() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let decoder = BarcodeDecoder::with_decoders(
            Box::new(Recording { seen: seen.clone() }),
            Box::new(CountingMiss {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            BarcodeSettings::default(),
        );
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 30, Luma([255])));
        decoder.decode_detailed(&blank);

        let seen = seen.lock().unwrap();
        // Direct stage first, then 3 variants x 4 quarter turns.
        assert_eq!(seen.len(), 1 + 12);
        let turns = [(40, 30), (30, 40), (40, 30), (30, 40)];
        let expected: Vec<(u32, u32)> = std::iter::once((40, 30))
            .chain(turns.iter().copied().cycle().take(12))
            .collect();
        assert_eq!(*seen, expected);
    }

    #[test]
    fn test_empty_image_is_a_miss() {
        let decoder = BarcodeDecoder::new(BarcodeSettings::default());
        let outcome = decoder.decode_detailed(&DynamicImage::ImageLuma8(GrayImage::new(0, 0)));
        assert_eq!(outcome.payload, None);
        assert_eq!(outcome.strategy, None);
        assert_eq!(outcome.attempts, 0);

        let narrow = DynamicImage::ImageLuma8(GrayImage::new(0, 12));
        assert_eq!(decoder.decode(&narrow), None);
    }

    #[test]
    fn test_panicking_stage_reported_as_nothing_found() {
        let value: Option<u32> = contained("test-stage", || panic!("stage bug"));
        assert_eq!(value, None);
        assert_eq!(contained("test-stage", || 7), Some(7));
    }

    #[test]
    fn test_unreadable_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        let decoder = BarcodeDecoder::new(BarcodeSettings::default());
        assert_eq!(decoder.decode_file(&path), None);
    }
}
