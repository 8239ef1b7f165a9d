use crate::cleanup::params::ThresholdPlan;
use image::{Rgb, RgbaImage};

use super::analyze::luminance;

/// Luminance at which ink strength saturates
const INK_FLOOR: f64 = 40.0;
/// Minimum alpha of a faint ink pixel
const FAINT_ALPHA: f64 = 180.0;
/// Pixels with alpha above this count as ink
pub const INK_ALPHA: u8 = 50;

/// Binarize into a transparent-background ink mask
///
/// Pixels darker than the threshold become `ink` with an alpha derived from their darkness;
/// everything else becomes transparent. With a saturation filter, dark but neutral pixels
/// (gray stamp ink, shadows) are dropped and only saturated ink survives.
pub fn apply(mut image: RgbaImage, plan: &ThresholdPlan, ink: Rgb<u8>) -> RgbaImage {
    let [ink_r, ink_g, ink_b] = ink.0;

    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let lum = luminance(r, g, b);

        if lum >= plan.threshold {
            pixel.0[3] = 0;
            continue;
        }

        if let Some(saturation_min) = plan.saturation_min {
            if saturation(r, g, b) < saturation_min {
                pixel.0[3] = 0;
                continue;
            }
        }

        pixel.0 = [ink_r, ink_g, ink_b, ink_alpha(lum)];
    }

    image
}

/// HSV saturation, 0 for black
#[inline]
pub fn saturation(r: u8, g: u8, b: u8) -> f64 {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == 0 {
        0.0
    } else {
        f64::from(max - min) / f64::from(max)
    }
}

fn ink_alpha(lum: f64) -> u8 {
    let strength = ((255.0 - lum) / (255.0 - INK_FLOOR) * 4.0).clamp(0.0, 1.0);
    if strength > 0.25 {
        255
    } else {
        FAINT_ALPHA.max((strength * 255.0).round()) as u8
    }
}

/// Number of ink pixels (alpha above 50)
pub fn count_ink(image: &RgbaImage) -> usize {
    image.pixels().filter(|p| p.0[3] > INK_ALPHA).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn plan(threshold: f64, saturation_min: Option<f64>) -> ThresholdPlan {
        ThresholdPlan {
            threshold,
            saturation_min,
        }
    }

    #[test]
    fn test_threshold_splits_ink_and_background() {
        let mut img = RgbaImage::from_pixel(20, 10, Rgba([240, 240, 240, 255]));
        for x in 5..15 {
            img.put_pixel(x, 5, Rgba([20, 20, 20, 255]));
        }

        let result = apply(img, &plan(128.0, None), BLACK);

        assert_eq!(result.get_pixel(10, 5), &Rgba([0, 0, 0, 255]));
        assert_eq!(result.get_pixel(10, 2).0[3], 0);
        assert_eq!(count_ink(&result), 10);
    }

    #[test]
    fn test_luminance_equal_to_threshold_is_background() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([100, 100, 100, 255]));
        let result = apply(img, &plan(100.0, None), BLACK);
        assert_eq!(count_ink(&result), 0);
    }

    #[test]
    fn test_saturation_filter_drops_gray_keeps_colored() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([90, 90, 90, 255]));
        img.put_pixel(1, 0, Rgba([20, 40, 140, 255]));

        let result = apply(img.clone(), &plan(200.0, Some(0.08)), Rgb([0, 51, 102]));
        assert_eq!(result.get_pixel(0, 0).0[3], 0);
        assert_eq!(result.get_pixel(1, 0), &Rgba([0, 51, 102, 255]));

        let unfiltered = apply(img, &plan(200.0, None), BLACK);
        assert_eq!(count_ink(&unfiltered), 2);
    }

    #[test]
    fn test_faint_ink_gets_reduced_alpha() {
        // luminance 210: strength = 45/215*4 = 0.837 -> opaque
        // luminance 230: strength = 25/215*4 = 0.465 -> opaque
        // luminance 245: strength = 10/215*4 = 0.186 -> max(180, 47) = 180
        assert_eq!(ink_alpha(210.0), 255);
        assert_eq!(ink_alpha(230.0), 255);
        assert_eq!(ink_alpha(245.0), 180);
        assert_eq!(ink_alpha(0.0), 255);
    }

    #[test]
    fn test_saturation_of_black_is_zero() {
        assert_eq!(saturation(0, 0, 0), 0.0);
        assert_eq!(saturation(200, 100, 0), 1.0);
        assert!((saturation(100, 50, 50) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_source_alpha_is_ignored() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([10, 10, 10, 0]));
        let result = apply(img, &plan(128.0, None), BLACK);
        assert_eq!(result.get_pixel(0, 0).0[3], 255);
    }
}
