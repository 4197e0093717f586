use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::contrast::{adaptive_threshold, equalize_histogram};
use imageproc::edges::canny;
use imageproc::filter::bilateral_filter;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use log::debug;

use crate::config::BarcodeSettings;
use crate::utils::{ExtractionError, Result};

/// Corner points ordered top-left, top-right, bottom-right, bottom-left.
pub type Quad = [(f32, f32); 4];

/// Axis-aligned rotations tried by the threshold sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarterTurn {
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl QuarterTurn {
    pub const ALL: [QuarterTurn; 4] = [
        QuarterTurn::None,
        QuarterTurn::Cw90,
        QuarterTurn::Cw180,
        QuarterTurn::Cw270,
    ];

    pub fn degrees(self) -> u32 {
        match self {
            QuarterTurn::None => 0,
            QuarterTurn::Cw90 => 90,
            QuarterTurn::Cw180 => 180,
            QuarterTurn::Cw270 => 270,
        }
    }
}

/// Greyscale variants shared by the rectification and threshold stages.
pub struct PreparedVariants {
    pub gray: GrayImage,
    pub denoised: GrayImage,
    pub equalized: GrayImage,
}

/// ImageProcessor holds the preprocessing and geometry steps used to find
/// a barcode on a card photo. Everything here is pure: inputs are never
/// modified and failures come back as `None`.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Opens an image file and normalizes it to 8-bit RGB.
    pub fn load(path: &Path) -> Result<DynamicImage> {
        let img = image::open(path).map_err(|e| {
            ExtractionError::ImageLoad(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
    }

    /// Bilateral denoise followed by histogram equalization.
    pub fn prepare_variants(gray: &GrayImage, settings: &BarcodeSettings) -> PreparedVariants {
        let denoised = bilateral_filter(
            gray,
            settings.bilateral_window,
            settings.bilateral_sigma_color,
            settings.bilateral_sigma_spatial,
        );
        let equalized = equalize_histogram(&denoised);
        PreparedVariants {
            gray: gray.clone(),
            denoised,
            equalized,
        }
    }

    pub fn binarize(gray: &GrayImage, block_radius: u32) -> GrayImage {
        adaptive_threshold(gray, block_radius)
    }

    pub fn rotate(gray: &GrayImage, turn: QuarterTurn) -> GrayImage {
        match turn {
            QuarterTurn::None => gray.clone(),
            QuarterTurn::Cw90 => imageops::rotate90(gray),
            QuarterTurn::Cw180 => imageops::rotate180(gray),
            QuarterTurn::Cw270 => imageops::rotate270(gray),
        }
    }

    pub fn scale(img: &RgbImage, factor: f32) -> RgbImage {
        if (factor - 1.0).abs() < f32::EPSILON {
            return img.clone();
        }
        let width = ((img.width() as f32) * factor).round().max(1.0) as u32;
        let height = ((img.height() as f32) * factor).round().max(1.0) as u32;
        imageops::resize(img, width, height, FilterType::Triangle)
    }

    /// Edge map -> largest contours -> first one that simplifies to four
    /// vertices. Returns its corners in top-left, top-right, bottom-right,
    /// bottom-left order.
    pub fn find_quadrilateral(equalized: &GrayImage, settings: &BarcodeSettings) -> Option<Quad> {
        let edges = canny(equalized, settings.canny_low, settings.canny_high);
        let mut contours: Vec<(f64, Vec<Point<i32>>)> = find_contours::<i32>(&edges)
            .into_iter()
            .filter(|contour| contour.points.len() >= 4)
            .map(|contour| (polygon_area(&contour.points), contour.points))
            .collect();
        contours.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (_, points) in contours.iter().take(settings.max_contours) {
            let perimeter = arc_length(points, true);
            if perimeter <= 0.0 {
                continue;
            }
            let approx = dedup_vertices(approximate_polygon_dp(
                points,
                settings.polygon_tolerance * perimeter,
                true,
            ));
            if approx.len() == 4 {
                let corners = [
                    (approx[0].x as f32, approx[0].y as f32),
                    (approx[1].x as f32, approx[1].y as f32),
                    (approx[2].x as f32, approx[2].y as f32),
                    (approx[3].x as f32, approx[3].y as f32),
                ];
                debug!("Quadrilateral candidate found: {:?}", corners);
                return Some(Self::order_corners(corners));
            }
        }
        None
    }

    /// Orders four points by the sum/difference rule: smallest x+y is
    /// top-left, largest is bottom-right, smallest y-x is top-right,
    /// largest is bottom-left.
    pub fn order_corners(points: Quad) -> Quad {
        let by = |key: fn(&(f32, f32)) -> f32, largest: bool| {
            let mut best = points[0];
            for p in points.iter().skip(1) {
                let better = if largest { key(p) > key(&best) } else { key(p) < key(&best) };
                if better {
                    best = *p;
                }
            }
            best
        };
        let sum = |p: &(f32, f32)| p.0 + p.1;
        let diff = |p: &(f32, f32)| p.1 - p.0;

        [
            by(sum, false),
            by(diff, false),
            by(sum, true),
            by(diff, true),
        ]
    }

    /// Size of the rectified crop: the longer of each pair of opposite sides.
    pub fn rectified_size(corners: &Quad) -> (u32, u32) {
        let [tl, tr, br, bl] = *corners;
        let width = distance(br, bl).max(distance(tr, tl));
        let height = distance(tr, br).max(distance(tl, bl));
        (width as u32, height as u32)
    }

    /// Perspective-warps the quadrilateral onto an upright rectangle.
    pub fn warp_quadrilateral(image: &RgbImage, corners: &Quad) -> Option<RgbImage> {
        let (width, height) = Self::rectified_size(corners);
        if width < 2 || height < 2 {
            return None;
        }

        let right = (width - 1) as f32;
        let bottom = (height - 1) as f32;
        let dest: Quad = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];
        let projection = Projection::from_control_points(*corners, dest)?;

        let mut output = RgbImage::new(width, height);
        warp_into(
            image,
            &projection,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
            &mut output,
        );
        Some(output)
    }

    /// Locates a quadrilateral on the equalized copy and warps the matching
    /// region of the colour image.
    pub fn rectify(
        image: &RgbImage,
        equalized: &GrayImage,
        settings: &BarcodeSettings,
    ) -> Option<RgbImage> {
        let corners = Self::find_quadrilateral(equalized, settings)?;
        Self::warp_quadrilateral(image, &corners)
    }

    /// Encodes an image as base64 PNG.
    pub fn encode_png_base64(img: &DynamicImage) -> Result<String> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| ExtractionError::Encoding(format!("Failed to encode PNG: {}", e)))?;
        Ok(general_purpose::STANDARD.encode(buffer))
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Shoelace area of a closed point sequence.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0f64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice_area += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    twice_area.abs() / 2.0
}

fn dedup_vertices(mut points: Vec<Point<i32>>) -> Vec<Point<i32>> {
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_polygon_mut;

    #[test]
    fn test_corners_ordered_from_any_input_order() {
        let shuffled: Quad = [(90.0, 80.0), (10.0, 12.0), (12.0, 85.0), (95.0, 8.0)];
        let ordered = ImageProcessor::order_corners(shuffled);
        assert_eq!(ordered, [(10.0, 12.0), (95.0, 8.0), (90.0, 80.0), (12.0, 85.0)]);
    }

    #[test]
    fn test_rectified_size_uses_longer_sides() {
        let corners: Quad = [(0.0, 0.0), (100.0, 0.0), (90.0, 50.0), (10.0, 40.0)];
        let (w, h) = ImageProcessor::rectified_size(&corners);
        assert_eq!(w, 100);
        assert_eq!(h, 50);
    }

    #[test]
    fn test_warp_produces_rectified_crop() {
        let mut img = RgbImage::from_pixel(60, 60, Rgb([255, 255, 255]));
        for y in 20..40 {
            for x in 10..50 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let corners: Quad = [(10.0, 20.0), (49.0, 20.0), (49.0, 39.0), (10.0, 39.0)];
        let warped = ImageProcessor::warp_quadrilateral(&img, &corners).unwrap();
        assert_eq!(warped.dimensions(), (39, 19));
        assert_eq!(warped.get_pixel(19, 9), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_degenerate_quad_rejected() {
        let img = RgbImage::new(10, 10);
        let corners: Quad = [(1.0, 1.0), (1.0, 1.0), (1.0, 1.0), (1.0, 1.0)];
        assert!(ImageProcessor::warp_quadrilateral(&img, &corners).is_none());
    }

    #[test]
    fn test_quarter_turns_swap_dimensions() {
        let gray = GrayImage::from_pixel(30, 10, Luma([7]));
        assert_eq!(ImageProcessor::rotate(&gray, QuarterTurn::Cw90).dimensions(), (10, 30));
        assert_eq!(ImageProcessor::rotate(&gray, QuarterTurn::Cw180).dimensions(), (30, 10));
        assert_eq!(QuarterTurn::ALL.map(QuarterTurn::degrees), [0, 90, 180, 270]);
    }

    #[test]
    fn test_skewed_quad_found_and_ordered() {
        let mut gray = GrayImage::from_pixel(200, 160, Luma([20]));
        let drawn = [
            Point::new(150, 30),
            Point::new(160, 130),
            Point::new(30, 120),
            Point::new(40, 20),
        ];
        draw_polygon_mut(&mut gray, &drawn, Luma([235]));

        let corners =
            ImageProcessor::find_quadrilateral(&gray, &BarcodeSettings::default()).unwrap();
        let expected: Quad = [(40.0, 20.0), (150.0, 30.0), (160.0, 130.0), (30.0, 120.0)];
        for (found, want) in corners.iter().zip(expected.iter()) {
            assert!(
                (found.0 - want.0).abs() <= 4.0 && (found.1 - want.1).abs() <= 4.0,
                "corner {:?} too far from {:?}",
                found,
                want
            );
        }
    }

    #[test]
    fn test_flat_image_has_no_quad() {
        let gray = GrayImage::from_pixel(80, 60, Luma([128]));
        assert!(ImageProcessor::find_quadrilateral(&gray, &BarcodeSettings::default()).is_none());
    }

    #[test]
    fn test_polygon_area_of_square() {
        let square = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(polygon_area(&square), 100.0);
        assert_eq!(polygon_area(&square[..2]), 0.0);
    }

    #[test]
    fn test_scale_changes_size() {
        let img = RgbImage::new(20, 10);
        assert_eq!(ImageProcessor::scale(&img, 1.5).dimensions(), (30, 15));
        assert_eq!(ImageProcessor::scale(&img, 1.0).dimensions(), (20, 10));
    }

    #[test]
    fn test_png_base64_round_trips_header() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let encoded = ImageProcessor::encode_png_base64(&img).unwrap();
        let bytes = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
