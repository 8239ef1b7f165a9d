use image::{Rgb, RgbaImage};

/// Never more than this many passes, whatever the requested stroke thickness
pub const MAX_PASSES: u32 = 2;

/// Pixels below this alpha are candidates for filling
const EMPTY_ALPHA: u8 = 50;
/// Neighbors above this alpha spread ink
const SOURCE_ALPHA: u8 = 100;

/// Thicken strokes by one pixel per pass
///
/// Each pass fills every transparent interior pixel that touches an opaque 8-neighbor in the
/// snapshot taken at the start of the pass. Existing ink is never altered.
pub fn apply(mut image: RgbaImage, passes: u32, ink: Rgb<u8>) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return image;
    }
    let [r, g, b] = ink.0;

    for _ in 0..passes.min(MAX_PASSES) {
        let snapshot = image.clone();

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                if snapshot.get_pixel(x, y).0[3] >= EMPTY_ALPHA {
                    continue;
                }
                if touches_ink(&snapshot, x, y) {
                    image.get_pixel_mut(x, y).0 = [r, g, b, 255];
                }
            }
        }
    }

    image
}

fn touches_ink(image: &RgbaImage, x: u32, y: u32) -> bool {
    (y - 1..=y + 1).any(|ny| {
        (x - 1..=x + 1)
            .any(|nx| (nx, ny) != (x, y) && image.get_pixel(nx, ny).0[3] > SOURCE_ALPHA)
    })
}
