use image::{GrayImage, Luma, RgbaImage};
use imageproc::stats::histogram;
use serde::Serialize;

/// Pixels darker than this count as ink candidates for blue detection
const DARK_LUMINANCE: f64 = 200.0;
/// Blue must exceed both other channels by more than this
const BLUE_MARGIN: i32 = 20;
/// Share of dark pixels that must be blue
const BLUE_RATIO: f64 = 0.4;

/// Image statistics that drive threshold selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub otsu_threshold: u8,
    pub is_blue_ink: bool,
}

/// Rec. 601 luma
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

pub fn analyze(image: &RgbaImage) -> Analysis {
    Analysis {
        otsu_threshold: otsu_threshold(&luminance_histogram(image)),
        is_blue_ink: is_blue_ink(image),
    }
}

/// Luminance per pixel, floored into 0-255
pub fn luminance_plane(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        Luma([luminance(r, g, b).floor().clamp(0.0, 255.0) as u8])
    })
}

pub fn luminance_histogram(image: &RgbaImage) -> [u32; 256] {
    histogram(&luminance_plane(image)).channels[0]
}

/// Otsu's method over a 256-bin histogram
///
/// Returns the `t` maximizing `wB * wF * (mB - mF)^2` where the background class holds bins
/// `0..=t`. The first maximum wins, and the scan stops once the foreground class is empty.
/// A histogram with a single populated bin has no split and yields 0.
pub fn otsu_threshold(hist: &[u32; 256]) -> u8 {
    let total: f64 = hist.iter().map(|&c| f64::from(c)).sum();
    let sum: f64 = hist
        .iter()
        .enumerate()
        .map(|(t, &c)| t as f64 * f64::from(c))
        .sum();

    let mut sum_b = 0.0;
    let mut w_b = 0.0;
    let mut max_variance = 0.0;
    let mut threshold = 0u8;

    for (t, &count) in hist.iter().enumerate() {
        w_b += f64::from(count);
        if w_b == 0.0 {
            continue;
        }

        let w_f = total - w_b;
        if w_f == 0.0 {
            break;
        }

        sum_b += t as f64 * f64::from(count);
        let m_b = sum_b / w_b;
        let m_f = (sum - sum_b) / w_f;
        let variance = w_b * w_f * (m_b - m_f) * (m_b - m_f);

        if variance > max_variance {
            max_variance = variance;
            threshold = t as u8;
        }
    }

    threshold
}

/// Whether the dark pixels are predominantly blue ballpoint ink
pub fn is_blue_ink(image: &RgbaImage) -> bool {
    let mut dark = 0u64;
    let mut blue = 0u64;

    for pixel in image.pixels() {
        let [r, g, b, _] = pixel.0;
        if luminance(r, g, b) >= DARK_LUMINANCE {
            continue;
        }
        dark += 1;

        let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
        if b > r + BLUE_MARGIN && b > g + BLUE_MARGIN {
            blue += 1;
        }
    }

    dark > 0 && blue as f64 / dark as f64 > BLUE_RATIO
}
