use crate::error::SignatureError;
use image::{ImageFormat, Rgb, RgbaImage};
use serde::Serialize;
use std::io::Cursor;
use std::time::Instant;

use super::params::{
    InkColor, Plan, ProcessedImageOptions, ProcessingParams, ThresholdPlan,
    SPARSE_INK_RATIO, SPARSE_RETRY_MIN_THRESHOLD, SPARSE_RETRY_STEP,
};
use super::steps::{
    self,
    analyze::Analysis,
    load::ImageSource,
    threshold::count_ink,
};

/// Timing information for a single cleanup step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Decoded source plus its statistics, computed once for interactive adjustment
///
/// The pixels are never mutated; every processing call works on its own copy.
#[derive(Debug, Clone)]
pub struct LoadResult {
    raw_pixels: RgbaImage,
    analysis: Analysis,
}

impl LoadResult {
    pub fn new(raw_pixels: RgbaImage) -> Self {
        let analysis = steps::analyze::analyze(&raw_pixels);
        Self {
            raw_pixels,
            analysis,
        }
    }

    pub fn raw_pixels(&self) -> &RgbaImage {
        &self.raw_pixels
    }

    pub fn analysis(&self) -> Analysis {
        self.analysis
    }

    pub fn otsu_threshold(&self) -> u8 {
        self.analysis.otsu_threshold
    }

    pub fn is_blue_ink(&self) -> bool {
        self.analysis.is_blue_ink
    }
}

/// Options for the sensitivity slider path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitivityOptions {
    pub ink_color: InkColor,
    pub stroke_thickness: i32,
}

impl Default for SensitivityOptions {
    fn default() -> Self {
        Self {
            ink_color: InkColor::Black,
            stroke_thickness: 1,
        }
    }
}

/// Cleaned signature with the statistics that produced it
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedSignature {
    /// Transparent-background ink mask (not serialized)
    #[serde(skip)]
    pub image: RgbaImage,
    /// Luminance threshold actually applied
    pub threshold: f64,
    pub otsu_threshold: u8,
    pub is_blue_ink: bool,
    /// Pixels with alpha above 50 in the final mask
    pub ink_pixels: usize,
    /// Whether the sparse-result retry replaced the first binarization
    pub fallback_used: bool,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Outcome of binarization, possibly after sparse-result retries
struct Binarized {
    image: RgbaImage,
    threshold: f64,
    fallback_used: bool,
}

/// Cleanup pipeline: blur, binarize, denoise, dilate, in that order
pub struct Pipeline {
    params: ProcessingParams,
    ink: Rgb<u8>,
    sparse_fallback: bool,
}

impl Pipeline {
    pub fn new(params: ProcessingParams, ink_color: InkColor) -> Self {
        Self {
            params,
            ink: ink_color.rgb(),
            sparse_fallback: false,
        }
    }

    /// Retry automatic thresholds that leave almost no ink
    pub fn with_sparse_fallback(mut self, enabled: bool) -> Self {
        self.sparse_fallback = enabled;
        self
    }

    /// Run the filter stack over an owned copy of the source pixels
    pub fn process(&self, image: RgbaImage, analysis: Analysis) -> ProcessedSignature {
        let start = Instant::now();
        let mut timings = Vec::new();
        let plan = self.params.plan(&analysis);

        tracing::debug!(
            "Cleanup plan: threshold {:.1}, saturation filter {:?}, blur {}, noise {}, passes {}",
            plan.threshold.threshold,
            plan.threshold.saturation_min,
            plan.edge_smoothness,
            plan.noise_removal,
            plan.dilation_passes
        );

        // Blur works on continuous tone, so it has to precede binarization
        let blurred = self.run_step("blur", &mut timings, || {
            steps::blur::apply(image, plan.edge_smoothness)
        });

        let binarized = self.run_step("threshold", &mut timings, || self.binarize(&blurred, &plan));

        let img = self.run_step("denoise", &mut timings, || {
            steps::denoise::apply(binarized.image, plan.noise_removal)
        });
        let img = self.run_step("dilate", &mut timings, || {
            steps::dilate::apply(img, plan.dilation_passes, self.ink)
        });

        let ink_pixels = count_ink(&img);

        ProcessedSignature {
            image: img,
            threshold: binarized.threshold,
            otsu_threshold: analysis.otsu_threshold,
            is_blue_ink: analysis.is_blue_ink,
            ink_pixels,
            fallback_used: binarized.fallback_used,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        }
    }

    fn binarize(&self, source: &RgbaImage, plan: &Plan) -> Binarized {
        let first = steps::threshold::apply(source.clone(), &plan.threshold, self.ink);
        let first_count = count_ink(&first);
        let total = f64::from(source.width()) * f64::from(source.height());
        let threshold = plan.threshold.threshold;

        let sparse = (first_count as f64) < total * SPARSE_INK_RATIO;
        if !(self.sparse_fallback && plan.automatic && sparse)
            || threshold <= SPARSE_RETRY_MIN_THRESHOLD
        {
            return Binarized {
                image: first,
                threshold,
                fallback_used: false,
            };
        }

        let lowered = ThresholdPlan {
            threshold: threshold - SPARSE_RETRY_STEP,
            saturation_min: None,
        };
        let second = steps::threshold::apply(source.clone(), &lowered, self.ink);
        let second_count = count_ink(&second);

        tracing::debug!(
            "Sparse result ({} ink pixels at {:.1}); retry at {:.1} found {}",
            first_count,
            threshold,
            lowered.threshold,
            second_count
        );

        if second_count > first_count {
            return Binarized {
                image: second,
                threshold: lowered.threshold,
                fallback_used: true,
            };
        }

        let midpoint = ThresholdPlan {
            threshold: (threshold + lowered.threshold) / 2.0,
            saturation_min: None,
        };
        tracing::debug!("Retrying at midpoint threshold {:.1}", midpoint.threshold);

        Binarized {
            image: steps::threshold::apply(source.clone(), &midpoint, self.ink),
            threshold: midpoint.threshold,
            fallback_used: true,
        }
    }

    fn run_step<T, F>(&self, name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> T
    where
        F: FnOnce() -> T,
    {
        run_timed(name, timings, step_fn)
    }
}

fn run_timed<T, F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> T
where
    F: FnOnce() -> T,
{
    let step_start = Instant::now();
    let result = step_fn();
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    result
}

/// Decode and analyze a source once, for repeated cheap re-processing
pub fn load_for_adjustment(source: ImageSource) -> Result<LoadResult, SignatureError> {
    let raw = steps::load::apply(source)?;
    let loaded = LoadResult::new(raw);

    tracing::debug!(
        "Loaded {}x{} for adjustment: otsu {}, blue ink {}",
        loaded.raw_pixels.width(),
        loaded.raw_pixels.height(),
        loaded.analysis.otsu_threshold,
        loaded.analysis.is_blue_ink
    );

    Ok(loaded)
}

/// Re-process a loaded image with a sensitivity slider value (0-100)
pub fn process_with_sensitivity(
    loaded: &LoadResult,
    sensitivity: f64,
    options: SensitivityOptions,
) -> ProcessedSignature {
    let params = ProcessingParams::Simple(ProcessedImageOptions {
        sensitivity: Some(sensitivity),
        ink_color: options.ink_color,
        stroke_thickness: f64::from(options.stroke_thickness),
        ..Default::default()
    });

    Pipeline::new(params, options.ink_color).process(loaded.raw_pixels.clone(), loaded.analysis)
}

/// Re-process a loaded image with either parameter shape
///
/// Never retries sparse results, so the same parameters always give the same output.
pub fn process_with_params(
    loaded: &LoadResult,
    params: &ProcessingParams,
    ink_color: InkColor,
) -> ProcessedSignature {
    Pipeline::new(params.clone(), ink_color).process(loaded.raw_pixels.clone(), loaded.analysis)
}

/// Load, analyze and clean a source in one call, with the sparse-result retry enabled
pub fn process_one_shot(
    source: ImageSource,
    options: &ProcessedImageOptions,
) -> Result<ProcessedSignature, SignatureError> {
    let start = Instant::now();
    let mut timings = Vec::new();

    let raw = run_timed("load", &mut timings, || steps::load::apply(source))?;
    let analysis = run_timed("analyze", &mut timings, || steps::analyze::analyze(&raw));

    let mut result = Pipeline::new(ProcessingParams::Simple(options.clone()), options.ink_color)
        .with_sparse_fallback(true)
        .process(raw, analysis);

    timings.append(&mut result.steps);
    result.steps = timings;
    result.total_time_ms = start.elapsed().as_millis() as u64;

    tracing::debug!(
        "One-shot cleanup: threshold {:.1}, {} ink pixels, fallback {}, {}ms",
        result.threshold,
        result.ink_pixels,
        result.fallback_used,
        result.total_time_ms
    );

    Ok(result)
}

/// Recolor every ink pixel of a stamp to a solid color
pub fn apply_seal_color(image: RgbaImage, color: Rgb<u8>) -> RgbaImage {
    steps::recolor::apply(image, color)
}

/// Merge a stamp and a signature into one transparent image
pub fn composite_seal_with_signature(
    seal: &RgbaImage,
    signature: &RgbaImage,
) -> Result<RgbaImage, SignatureError> {
    steps::composite::apply(seal, signature)
}

/// Encode as PNG with alpha
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, SignatureError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| SignatureError::ContextError(format!("Failed to encode PNG: {}", e)))?;
    Ok(out.into_inner())
}
