use image::RgbaImage;

/// Alpha above which a pixel counts as solid for neighbor counting
const SOLID_ALPHA: u8 = 80;

/// Remove isolated specks from a binarized mask
///
/// A solid pixel with fewer solid 8-neighbors than required (2 above strength 70, else 1)
/// is cleared. Works in place in scan order; the outermost rows and columns are skipped.
pub fn apply(mut image: RgbaImage, strength: f64) -> RgbaImage {
    if strength < 5.0 {
        return image;
    }
    let min_neighbors = if strength > 70.0 { 2 } else { 1 };

    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return image;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if image.get_pixel(x, y).0[3] <= SOLID_ALPHA {
                continue;
            }

            if solid_neighbors(&image, x, y) < min_neighbors {
                image.get_pixel_mut(x, y).0[3] = 0;
            }
        }
    }

    image
}

fn solid_neighbors(image: &RgbaImage, x: u32, y: u32) -> u32 {
    let mut count = 0;
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            if (nx, ny) != (x, y) && image.get_pixel(nx, ny).0[3] > SOLID_ALPHA {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn blank(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]))
    }

    #[test]
    fn test_isolated_pixel_removed() {
        let mut img = blank(9, 9);
        img.put_pixel(2, 2, INK);
        for x in 4..8 {
            img.put_pixel(x, 6, INK);
        }

        let result = apply(img, 50.0);
        assert_eq!(result.get_pixel(2, 2).0[3], 0);
        assert_eq!(result.get_pixel(5, 6).0[3], 255);
    }

    #[test]
    fn test_strong_removal_needs_two_neighbors() {
        let mut img = blank(9, 9);
        // a two-pixel speck survives at 50 but not above 70
        img.put_pixel(3, 3, INK);
        img.put_pixel(4, 3, INK);

        assert_eq!(count(&apply(img.clone(), 50.0)), 2);
        assert_eq!(count(&apply(img, 80.0)), 0);
    }

    #[test]
    fn test_border_pixels_are_kept() {
        let mut img = blank(5, 5);
        img.put_pixel(0, 0, INK);
        img.put_pixel(4, 2, INK);

        let result = apply(img, 100.0);
        assert_eq!(count(&result), 2);
    }

    #[test]
    fn test_weak_strength_is_noop() {
        let mut img = blank(5, 5);
        img.put_pixel(2, 2, INK);
        assert_eq!(count(&apply(img, 4.0)), 1);
    }

    fn count(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| p.0[3] > SOLID_ALPHA).count()
    }
}
