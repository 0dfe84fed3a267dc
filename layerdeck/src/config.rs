//! Extraction configuration.
//!
//! Every value has a default, so an empty (or missing) config file yields
//! 16:9 slides on black with the stock classifier and matte thresholds.

mod loader;

use serde::Deserialize;

pub use loader::load_config;

/// Tunables for the extraction pipeline, injected at pipeline construction.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_classifier")]
    pub classifier: ClassifierConfig,

    #[serde(default = "default_matte")]
    pub matte: MatteConfig,

    #[serde(default = "default_slides")]
    pub slides: SlideConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default = "default_output")]
    pub output: OutputConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            classifier: default_classifier(),
            matte: default_matte(),
            slides: default_slides(),
            scan: ScanConfig::default(),
            output: default_output(),
        }
    }
}

/// Overlay classifier heuristic parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Maximum number of pixels sampled per image
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// A channel below this value counts as near-black
    #[serde(default = "default_dark_threshold")]
    pub dark_threshold: u8,

    /// A channel above this value counts as near-white
    #[serde(default = "default_light_threshold")]
    pub light_threshold: u8,

    /// Fraction of extreme pixels above which an image is an overlay
    #[serde(default = "default_extreme_fraction")]
    pub extreme_fraction: f64,
}

/// Black matte removal parameters
#[derive(Debug, Clone, Deserialize)]
pub struct MatteConfig {
    /// Pixels with all color channels below this value become transparent
    #[serde(default = "default_matte_threshold")]
    pub threshold: u8,
}

/// Slide deck geometry, in inches
#[derive(Debug, Clone, Deserialize)]
pub struct SlideConfig {
    #[serde(default = "default_slide_width")]
    pub width_in: f64,

    #[serde(default = "default_slide_height")]
    pub height_in: f64,

    #[serde(default = "default_max_width")]
    pub max_width_in: f64,

    #[serde(default = "default_max_height")]
    pub max_height_in: f64,

    /// Hex RGB background fill, e.g. "000000"
    #[serde(default = "default_background")]
    pub background: String,
}

/// Page scanning options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanConfig {
    /// Images narrower or shorter than this many pixels are ignored (0 keeps all)
    #[serde(default)]
    pub min_image_dimension: u32,
}

/// Output handling options
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Ask the host to open finished slide decks with their default application
    #[serde(default = "default_open_artifacts")]
    pub open_artifacts: bool,
}

// ==================== Default Value Functions ====================

pub(crate) fn default_classifier() -> ClassifierConfig {
    ClassifierConfig {
        sample_limit: default_sample_limit(),
        dark_threshold: default_dark_threshold(),
        light_threshold: default_light_threshold(),
        extreme_fraction: default_extreme_fraction(),
    }
}

pub(crate) fn default_sample_limit() -> usize {
    1000
}

pub(crate) fn default_dark_threshold() -> u8 {
    30
}

pub(crate) fn default_light_threshold() -> u8 {
    225
}

pub(crate) fn default_extreme_fraction() -> f64 {
    0.8
}

pub(crate) fn default_matte() -> MatteConfig {
    MatteConfig {
        threshold: default_matte_threshold(),
    }
}

pub(crate) fn default_matte_threshold() -> u8 {
    50
}

pub(crate) fn default_slides() -> SlideConfig {
    SlideConfig {
        width_in: default_slide_width(),
        height_in: default_slide_height(),
        max_width_in: default_max_width(),
        max_height_in: default_max_height(),
        background: default_background(),
    }
}

pub(crate) fn default_slide_width() -> f64 {
    13.333
}

pub(crate) fn default_slide_height() -> f64 {
    7.5
}

pub(crate) fn default_max_width() -> f64 {
    12.0
}

pub(crate) fn default_max_height() -> f64 {
    6.5
}

pub(crate) fn default_background() -> String {
    "000000".to_string()
}

pub(crate) fn default_output() -> OutputConfig {
    OutputConfig {
        open_artifacts: default_open_artifacts(),
    }
}

pub(crate) fn default_open_artifacts() -> bool {
    true
}
