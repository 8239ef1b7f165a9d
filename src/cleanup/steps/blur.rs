use image::RgbaImage;

/// Box-blur RGB to soften jagged stroke edges before binarization
///
/// Strength below 5 is a no-op; up to 60 uses radius 1, above uses radius 2. Reads from a
/// snapshot so a pass never sees its own output. Alpha and the radius-wide border are left as is.
pub fn apply(image: RgbaImage, strength: f64) -> RgbaImage {
    if strength < 5.0 {
        return image;
    }
    let radius: u32 = if strength > 60.0 { 2 } else { 1 };
    box_blur(image, radius)
}

fn box_blur(mut image: RgbaImage, radius: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width <= 2 * radius || height <= 2 * radius {
        return image;
    }

    let source = image.clone();
    let window = f64::from((2 * radius + 1) * (2 * radius + 1));

    for y in radius..height - radius {
        for x in radius..width - radius {
            let mut sums = [0u32; 3];
            for ny in y - radius..=y + radius {
                for nx in x - radius..=x + radius {
                    let p = source.get_pixel(nx, ny).0;
                    sums[0] += u32::from(p[0]);
                    sums[1] += u32::from(p[1]);
                    sums[2] += u32::from(p[2]);
                }
            }

            let pixel = image.get_pixel_mut(x, y);
            for (channel, sum) in pixel.0.iter_mut().zip(sums) {
                *channel = (f64::from(sum) / window).round() as u8;
            }
        }
    }

    image
}
