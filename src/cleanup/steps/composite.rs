use crate::error::SignatureError;
use image::{
    imageops::{self, FilterType},
    RgbaImage,
};

/// Widest the stamp is drawn
pub const MAX_SEAL_WIDTH: u32 = 300;
/// Signature may use this share of the stamp width
const SIGNATURE_WIDTH_RATIO: f64 = 0.8;
/// Tallest the signature is drawn
pub const MAX_SIGNATURE_HEIGHT: f64 = 80.0;
/// Vertical gap between stamp and signature
pub const GAP: u32 = 12;

/// Stack a stamp over a signature on one transparent canvas
///
/// The stamp is scaled to at most 300px wide and drawn at the origin. The signature is fitted
/// into 80% of the stamp width and 80px height, keeping its aspect ratio, and centered
/// horizontally 12px below the stamp.
pub fn apply(seal: &RgbaImage, signature: &RgbaImage) -> Result<RgbaImage, SignatureError> {
    let (seal_w, seal_h) = seal_size(seal.width(), seal.height())?;
    let (sig_w, sig_h) = signature_size(signature.width(), signature.height(), seal_w)?;

    let canvas_h = seal_h
        .checked_add(GAP)
        .and_then(|h| h.checked_add(sig_h))
        .ok_or_else(|| SignatureError::ContextError("Composite canvas too tall".to_string()))?;
    let mut canvas = allocate(seal_w, canvas_h)?;

    let seal = scaled(seal, seal_w, seal_h);
    let signature = scaled(signature, sig_w, sig_h);

    let sig_x = ((f64::from(seal_w) - f64::from(sig_w)) / 2.0).round() as i64;
    imageops::overlay(&mut canvas, &seal, 0, 0);
    imageops::overlay(&mut canvas, &signature, sig_x, i64::from(seal_h + GAP));

    tracing::debug!(
        "Composited seal {}x{} with signature {}x{} into {}x{}",
        seal_w,
        seal_h,
        sig_w,
        sig_h,
        canvas.width(),
        canvas.height()
    );

    Ok(canvas)
}

/// Stamp size after capping the width at 300px
pub fn seal_size(width: u32, height: u32) -> Result<(u32, u32), SignatureError> {
    ensure_not_empty(width, height)?;
    let seal_w = width.min(MAX_SEAL_WIDTH);
    let seal_h = (f64::from(height) * f64::from(seal_w) / f64::from(width)).round() as u32;
    Ok((seal_w, seal_h.max(1)))
}

/// Signature size fitted into the slot under a stamp of width `seal_w`
pub fn signature_size(
    width: u32,
    height: u32,
    seal_w: u32,
) -> Result<(u32, u32), SignatureError> {
    ensure_not_empty(width, height)?;
    let max_w = f64::from(seal_w) * SIGNATURE_WIDTH_RATIO;
    let scale = (max_w / f64::from(width)).min(MAX_SIGNATURE_HEIGHT / f64::from(height));

    let sig_w = (f64::from(width) * scale).round() as u32;
    let sig_h = (f64::from(height) * scale).round() as u32;
    Ok((sig_w.max(1), sig_h.max(1)))
}

fn ensure_not_empty(width: u32, height: u32) -> Result<(), SignatureError> {
    if width == 0 || height == 0 {
        return Err(SignatureError::ContextError(format!(
            "Cannot scale an empty {}x{} image",
            width, height
        )));
    }
    Ok(())
}

fn allocate(width: u32, height: u32) -> Result<RgbaImage, SignatureError> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| {
            SignatureError::ContextError(format!("Cannot allocate {}x{} canvas", width, height))
        })?;
    RgbaImage::from_raw(width, height, vec![0; len]).ok_or_else(|| {
        SignatureError::ContextError(format!("Cannot allocate {}x{} canvas", width, height))
    })
}

fn scaled(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, width, height, FilterType::Lanczos3)
    }
}
