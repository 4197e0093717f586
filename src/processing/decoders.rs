use image::GrayImage;
use log::debug;

/// A single-image symbol reader. Implementations return the first decoded
/// payload as text, or `None` when nothing readable is found.
pub trait SymbolDecoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, image: &GrayImage) -> Option<String>;
}

/// General-purpose multi-format reader backed by `rxing`.
pub struct RxingDecoder;

impl SymbolDecoder for RxingDecoder {
    fn name(&self) -> &'static str {
        "rxing"
    }

    fn decode(&self, image: &GrayImage) -> Option<String> {
        let (width, height) = image.dimensions();
        match rxing::helpers::detect_in_luma(image.as_raw().clone(), width, height, None) {
            Ok(result) => {
                let text = result.getText();
                if text.is_empty() {
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                debug!("rxing found nothing: {}", e);
                None
            }
        }
    }
}

/// QR finder-pattern detector and decoder backed by `rqrr`.
pub struct RqrrDecoder;

impl SymbolDecoder for RqrrDecoder {
    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn decode(&self, image: &GrayImage) -> Option<String> {
        let (width, height) = image.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                image.get_pixel(x as u32, y as u32).0[0]
            });

        prepared
            .detect_grids()
            .iter()
            .find_map(|grid| match grid.decode() {
                Ok((_, content)) if !content.is_empty() => Some(content),
                Ok(_) => None,
                Err(e) => {
                    debug!("rqrr grid failed to decode: {}", e);
                    None
                }
            })
    }
}
