use image::{Rgb, RgbaImage};

use super::threshold::INK_ALPHA;

/// Recolor a stamp/seal mask to a single solid color
/// Partial-alpha ink is flattened to fully opaque; near-transparent pixels are left alone.
pub fn apply(mut image: RgbaImage, color: Rgb<u8>) -> RgbaImage {
    let [r, g, b] = color.0;
    for pixel in image.pixels_mut() {
        if pixel.0[3] > INK_ALPHA {
            pixel.0 = [r, g, b, 255];
        }
    }
    image
}

/// Parse `#rrggbb` / `rrggbb`
pub fn parse_hex_color(value: &str) -> Option<Rgb<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn seal() -> RgbaImage {
        RgbaImage::from_fn(6, 6, |x, y| match (x + y) % 3 {
            0 => Rgba([10, 10, 10, 255]),
            1 => Rgba([120, 30, 30, 120]),
            _ => Rgba([200, 200, 200, 30]),
        })
    }

    #[test]
    fn test_recolor_flattens_ink() {
        let result = apply(seal(), Rgb([180, 0, 0]));

        assert_eq!(result.get_pixel(0, 0).0, [180, 0, 0, 255]);
        assert_eq!(result.get_pixel(1, 0).0, [180, 0, 0, 255]);
        assert_eq!(result.get_pixel(2, 0).0, [200, 200, 200, 30]);
    }

    #[test]
    fn test_recolor_is_idempotent() {
        let color = Rgb([0, 51, 102]);
        let once = apply(seal(), color);
        let twice = apply(once.clone(), color);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#003366"), Some(Rgb([0, 51, 102])));
        assert_eq!(parse_hex_color("B40000"), Some(Rgb([180, 0, 0])));
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }
}
