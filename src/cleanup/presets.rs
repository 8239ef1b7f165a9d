//! Named slider presets for the multi-dimensional parameter shape

use super::params::AdjustParams;

/// Light or faint signatures: higher threshold, thicker strokes
pub const CLARA: AdjustParams = AdjustParams {
    threshold: 65.0,
    stroke_strength: 55.0,
    edge_smoothness: 20.0,
    noise_removal: 30.0,
    saturation_filter: 0.0,
};

/// Heavy, dark ink: lower threshold, no thickening
pub const OSCURA: AdjustParams = AdjustParams {
    threshold: 40.0,
    stroke_strength: 20.0,
    edge_smoothness: 15.0,
    noise_removal: 50.0,
    saturation_filter: 30.0,
};

/// Scanned paper with texture and stamp residue
pub const ESCANEADA: AdjustParams = AdjustParams {
    threshold: 50.0,
    stroke_strength: 35.0,
    edge_smoothness: 30.0,
    noise_removal: 75.0,
    saturation_filter: 40.0,
};

/// Signatures drawn on a tablet: already clean
pub const DIGITAL: AdjustParams = AdjustParams {
    threshold: 50.0,
    stroke_strength: 0.0,
    edge_smoothness: 0.0,
    noise_removal: 0.0,
    saturation_filter: 0.0,
};

/// Starting point for manual adjustment
pub const PERSONALIZADO: AdjustParams = AdjustParams {
    threshold: 50.0,
    stroke_strength: 35.0,
    edge_smoothness: 20.0,
    noise_removal: 40.0,
    saturation_filter: 20.0,
};

pub static SIGNATURE_PRESETS: &[(&str, AdjustParams)] = &[
    ("clara", CLARA),
    ("oscura", OSCURA),
    ("escaneada", ESCANEADA),
    ("digital", DIGITAL),
    ("personalizado", PERSONALIZADO),
];

/// Look up a preset by name (case-insensitive)
pub fn preset(name: &str) -> Option<AdjustParams> {
    let name = name.trim().to_lowercase();
    SIGNATURE_PRESETS
        .iter()
        .find(|(preset_name, _)| *preset_name == name)
        .map(|(_, params)| *params)
}

/// All preset names in table order
pub fn names() -> Vec<&'static str> {
    SIGNATURE_PRESETS.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_lookup_is_case_insensitive() {
        assert_eq!(preset("Escaneada"), Some(ESCANEADA));
        assert_eq!(preset(" DIGITAL "), Some(DIGITAL));
        assert_eq!(preset("vintage"), None);
    }

    #[test]
    fn test_presets_are_within_range() {
        for (name, params) in SIGNATURE_PRESETS {
            assert_eq!(*params, params.clamped(), "preset {} out of range", name);
        }
    }

    #[test]
    fn test_default_params_are_personalizado() {
        assert_eq!(AdjustParams::default(), PERSONALIZADO);
        assert_eq!(names().len(), 5);
    }
}
