//! Processing parameters and threshold resolution
//!
//! Two parameter shapes exist: the simple shape (fixed threshold, sensitivity or a named mode)
//! and the multi-dimensional shape driven by independent sliders. Both are resolved here into
//! a [`Plan`] once, so the binarizer and filters never branch on the shape themselves.

use image::Rgb;
use serde::{Deserialize, Serialize};

use super::steps::analyze::Analysis;

/// Share of pixels below which an automatic threshold is considered to have erased the ink
pub const SPARSE_INK_RATIO: f64 = 0.001;
/// Automatic thresholds at or below this value never trigger the sparse-result retry
pub const SPARSE_RETRY_MIN_THRESHOLD: f64 = 150.0;
/// How far the first sparse-result retry lowers the threshold
pub const SPARSE_RETRY_STEP: f64 = 25.0;

/// Target ink color of the cleaned mask
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum InkColor {
    #[default]
    Black,
    #[value(name = "dark_blue", alias = "dark-blue")]
    DarkBlue,
}

impl InkColor {
    pub fn rgb(self) -> Rgb<u8> {
        match self {
            Self::Black => Rgb([0, 0, 0]),
            Self::DarkBlue => Rgb([0, 51, 102]),
        }
    }

    /// Parse from a form field value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "black" => Some(Self::Black),
            "dark_blue" | "dark-blue" | "darkblue" => Some(Self::DarkBlue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::DarkBlue => "dark_blue",
        }
    }
}

/// Named threshold strategy for the simple parameter shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Auto,
    Conservative,
    Aggressive,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Self::Auto, Self::Conservative, Self::Aggressive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Conservative => "conservative",
            Self::Aggressive => "aggressive",
        }
    }
}

/// Simple parameter shape, also the option set of the one-shot pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessedImageOptions {
    /// Fixed luminance threshold (0-255); bypasses Otsu and the saturation filter
    #[serde(alias = "fixed_threshold")]
    pub white_threshold: Option<f64>,
    pub mode: Mode,
    /// 0-100, takes precedence over `mode`
    pub sensitivity: Option<f64>,
    pub ink_color: InkColor,
    /// Dilation passes, rounded and clamped to 0-3 (at most two are applied)
    pub stroke_thickness: f64,
    /// Pre-blur strength, 0-100
    pub edge_smoothness: f64,
    /// Isolated-pixel removal strength, 0-100
    pub noise_removal: f64,
}

impl Default for ProcessedImageOptions {
    fn default() -> Self {
        Self {
            white_threshold: None,
            mode: Mode::Auto,
            sensitivity: None,
            ink_color: InkColor::Black,
            stroke_thickness: 1.0,
            edge_smoothness: 0.0,
            noise_removal: 50.0,
        }
    }
}

/// Multi-dimensional parameter shape, every axis 0-100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustParams {
    pub threshold: f64,
    pub stroke_strength: f64,
    pub edge_smoothness: f64,
    pub noise_removal: f64,
    pub saturation_filter: f64,
}

impl Default for AdjustParams {
    fn default() -> Self {
        super::presets::PERSONALIZADO
    }
}

impl AdjustParams {
    /// Copy with every axis clamped into 0-100
    pub fn clamped(&self) -> Self {
        Self {
            threshold: clamp(self.threshold, 0.0, 100.0),
            stroke_strength: clamp(self.stroke_strength, 0.0, 100.0),
            edge_smoothness: clamp(self.edge_smoothness, 0.0, 100.0),
            noise_removal: clamp(self.noise_removal, 0.0, 100.0),
            saturation_filter: clamp(self.saturation_filter, 0.0, 100.0),
        }
    }

    pub fn dilation_passes(&self) -> u32 {
        let strength = clamp(self.stroke_strength, 0.0, 100.0);
        if strength >= 75.0 {
            2
        } else if strength >= 35.0 {
            1
        } else {
            0
        }
    }
}

/// Either parameter shape
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingParams {
    Simple(ProcessedImageOptions),
    Adjust(AdjustParams),
}

/// Resolved binarization threshold and optional saturation filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPlan {
    pub threshold: f64,
    /// Minimum saturation an ink pixel needs when the filter is active
    pub saturation_min: Option<f64>,
}

/// Everything a pipeline run needs, resolved from either parameter shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub threshold: ThresholdPlan,
    pub edge_smoothness: f64,
    pub noise_removal: f64,
    pub dilation_passes: u32,
    /// Whether the threshold came from image statistics (and may be retried when sparse)
    pub automatic: bool,
}

impl ProcessingParams {
    pub fn plan(&self, analysis: &Analysis) -> Plan {
        match self {
            Self::Simple(options) => Plan {
                threshold: simple_threshold(options, analysis),
                edge_smoothness: clamp(options.edge_smoothness, 0.0, 100.0),
                noise_removal: clamp(options.noise_removal, 0.0, 100.0),
                dilation_passes: clamp(options.stroke_thickness.round(), 0.0, 3.0) as u32,
                automatic: options.white_threshold.is_none(),
            },
            Self::Adjust(params) => {
                let params = params.clamped();
                Plan {
                    threshold: adjust_threshold(&params, analysis),
                    edge_smoothness: params.edge_smoothness,
                    noise_removal: params.noise_removal,
                    dilation_passes: params.dilation_passes(),
                    automatic: true,
                }
            }
        }
    }
}

/// Otsu threshold, raised for blue ink which reads lighter than black
pub fn base_threshold(analysis: &Analysis) -> f64 {
    let otsu = f64::from(analysis.otsu_threshold);
    if analysis.is_blue_ink {
        (otsu + 15.0).min(220.0)
    } else {
        otsu
    }
}

/// Threshold for a sensitivity slider value; monotonic in `sensitivity`
pub fn sensitivity_threshold(base: f64, sensitivity: f64) -> f64 {
    let sensitivity = clamp(sensitivity, 0.0, 100.0);
    (base + (sensitivity - 50.0) * 1.5).clamp(50.0, 250.0)
}

fn simple_threshold(options: &ProcessedImageOptions, analysis: &Analysis) -> ThresholdPlan {
    if let Some(fixed) = options.white_threshold {
        return ThresholdPlan {
            threshold: clamp(fixed, 0.0, 255.0),
            saturation_min: None,
        };
    }

    let base = base_threshold(analysis);
    if let Some(sensitivity) = options.sensitivity {
        return ThresholdPlan {
            threshold: sensitivity_threshold(base, sensitivity),
            saturation_min: Some(0.08),
        };
    }

    let otsu = f64::from(analysis.otsu_threshold);
    match options.mode {
        Mode::Auto => ThresholdPlan {
            threshold: base,
            saturation_min: Some(0.08),
        },
        Mode::Conservative => ThresholdPlan {
            threshold: (otsu + 25.0).min(200.0),
            saturation_min: Some(0.05),
        },
        Mode::Aggressive => ThresholdPlan {
            threshold: (otsu - 10.0).max(200.0),
            saturation_min: Some(0.12),
        },
    }
}

fn adjust_threshold(params: &AdjustParams, analysis: &Analysis) -> ThresholdPlan {
    let base = base_threshold(analysis);
    let threshold = (base + (params.threshold - 50.0) * 2.2).clamp(40.0, 245.0);
    let saturation_min = if params.saturation_filter >= 5.0 {
        Some(params.saturation_filter / 100.0 * 0.18)
    } else {
        None
    };

    ThresholdPlan {
        threshold,
        saturation_min,
    }
}

/// Clamp that maps NaN to the lower bound
pub(crate) fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(otsu: u8, blue: bool) -> Analysis {
        Analysis {
            otsu_threshold: otsu,
            is_blue_ink: blue,
        }
    }

    fn simple(options: ProcessedImageOptions) -> ProcessingParams {
        ProcessingParams::Simple(options)
    }

    #[test]
    fn test_fixed_threshold_wins_and_disables_saturation_filter() {
        let params = simple(ProcessedImageOptions {
            white_threshold: Some(128.0),
            sensitivity: Some(90.0),
            mode: Mode::Aggressive,
            ..Default::default()
        });

        let plan = params.plan(&analysis(100, true));
        assert_eq!(plan.threshold.threshold, 128.0);
        assert_eq!(plan.threshold.saturation_min, None);
        assert!(!plan.automatic);
    }

    #[test]
    fn test_sensitivity_beats_mode() {
        let params = simple(ProcessedImageOptions {
            sensitivity: Some(70.0),
            mode: Mode::Conservative,
            ..Default::default()
        });

        let plan = params.plan(&analysis(120, false));
        assert_eq!(plan.threshold.threshold, 150.0);
        assert_eq!(plan.threshold.saturation_min, Some(0.08));
    }

    #[test]
    fn test_sensitivity_threshold_is_monotonic_and_bounded() {
        for base in [0.0, 40.0, 128.0, 220.0] {
            let mut previous = f64::MIN;
            for sensitivity in 0..=100 {
                let threshold = sensitivity_threshold(base, f64::from(sensitivity));
                assert!(threshold >= previous);
                assert!((50.0..=250.0).contains(&threshold));
                previous = threshold;
            }
        }
    }

    #[test]
    fn test_mode_thresholds() {
        let a = analysis(180, false);
        let plan = |mode| simple(ProcessedImageOptions { mode, ..Default::default() }).plan(&a);

        assert_eq!(plan(Mode::Auto).threshold.threshold, 180.0);
        assert_eq!(plan(Mode::Conservative).threshold.threshold, 200.0);
        assert_eq!(plan(Mode::Conservative).threshold.saturation_min, Some(0.05));
        assert_eq!(plan(Mode::Aggressive).threshold.threshold, 200.0);
        assert_eq!(plan(Mode::Aggressive).threshold.saturation_min, Some(0.12));

        let low = analysis(60, false);
        let aggressive = simple(ProcessedImageOptions {
            mode: Mode::Aggressive,
            ..Default::default()
        })
        .plan(&low);
        assert_eq!(aggressive.threshold.threshold, 200.0);
    }

    #[test]
    fn test_blue_ink_raises_base_up_to_cap() {
        assert_eq!(base_threshold(&analysis(100, true)), 115.0);
        assert_eq!(base_threshold(&analysis(210, true)), 220.0);
        assert_eq!(base_threshold(&analysis(210, false)), 210.0);
    }

    #[test]
    fn test_adjust_params_mapping() {
        let params = ProcessingParams::Adjust(AdjustParams {
            threshold: 60.0,
            stroke_strength: 75.0,
            edge_smoothness: 10.0,
            noise_removal: 20.0,
            saturation_filter: 50.0,
        });

        let plan = params.plan(&analysis(100, false));
        assert!((plan.threshold.threshold - 122.0).abs() < 1e-9);
        assert!((plan.threshold.saturation_min.unwrap() - 0.09).abs() < 1e-9);
        assert_eq!(plan.dilation_passes, 2);
    }

    #[test]
    fn test_adjust_saturation_filter_off_below_five() {
        let params = ProcessingParams::Adjust(AdjustParams {
            saturation_filter: 4.9,
            ..Default::default()
        });
        assert_eq!(params.plan(&analysis(100, false)).threshold.saturation_min, None);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let params = ProcessingParams::Adjust(AdjustParams {
            threshold: 1000.0,
            stroke_strength: -20.0,
            edge_smoothness: f64::NAN,
            noise_removal: 400.0,
            saturation_filter: -1.0,
        });
        let plan = params.plan(&analysis(200, false));
        assert_eq!(plan.threshold.threshold, 245.0);
        assert_eq!(plan.dilation_passes, 0);
        assert_eq!(plan.edge_smoothness, 0.0);
        assert_eq!(plan.noise_removal, 100.0);

        let fixed = simple(ProcessedImageOptions {
            white_threshold: Some(-5.0),
            stroke_thickness: 9.0,
            ..Default::default()
        })
        .plan(&analysis(200, false));
        assert_eq!(fixed.threshold.threshold, 0.0);
        assert_eq!(fixed.dilation_passes, 3);
    }

    #[test]
    fn test_stroke_thickness_is_rounded_and_clamped() {
        let passes = |json: &str| {
            let options: ProcessedImageOptions = serde_json::from_str(json).unwrap();
            simple(options).plan(&analysis(120, false)).dilation_passes
        };
        assert_eq!(passes(r#"{"stroke_thickness": 1.5}"#), 2);
        assert_eq!(passes(r#"{"stroke_thickness": 1.2}"#), 1);
        assert_eq!(passes(r#"{"stroke_thickness": 5000000000}"#), 3);
        assert_eq!(passes(r#"{"stroke_thickness": -7}"#), 0);
        assert_eq!(passes("{}"), 1);
    }

    #[test]
    fn test_mode_names() {
        let names: Vec<&str> = Mode::ALL.iter().map(Mode::as_str).collect();
        assert_eq!(names, ["auto", "conservative", "aggressive"]);
    }

    #[test]
    fn test_dilation_passes_from_stroke_strength() {
        let passes = |stroke_strength| {
            AdjustParams {
                stroke_strength,
                ..Default::default()
            }
            .dilation_passes()
        };
        assert_eq!(passes(0.0), 0);
        assert_eq!(passes(34.9), 0);
        assert_eq!(passes(35.0), 1);
        assert_eq!(passes(74.0), 1);
        assert_eq!(passes(75.0), 2);
    }

    #[test]
    fn test_ink_color_parsing() {
        assert_eq!(InkColor::from_str("dark_blue"), Some(InkColor::DarkBlue));
        assert_eq!(InkColor::from_str(" Black "), Some(InkColor::Black));
        assert_eq!(InkColor::from_str("red"), None);
        assert_eq!(InkColor::DarkBlue.rgb(), Rgb([0, 51, 102]));
    }
}
