//! Signature and stamp cleanup
//!
//! Turns a photographed or scanned signature into a transparent-background, single-color ink
//! mask: decode, analyze (Otsu threshold, blue-ink detection), binarize, then a fixed filter
//! stack (pre-blur, noise removal, dilation). Stamps can be recolored and composited over a
//! signature.

pub mod params;
pub mod pipeline;
pub mod presets;
pub mod steps;

pub use params::{AdjustParams, InkColor, Mode, ProcessedImageOptions, ProcessingParams};
pub use pipeline::{
    apply_seal_color, composite_seal_with_signature, encode_png, load_for_adjustment,
    process_one_shot, process_with_params, process_with_sensitivity, LoadResult, Pipeline,
    ProcessedSignature, SensitivityOptions, StepTiming,
};
pub use presets::SIGNATURE_PRESETS;
pub use steps::load::ImageSource;
