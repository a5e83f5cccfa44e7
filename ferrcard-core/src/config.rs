use std::path::Path;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};

use crate::{consts::*, error::*};

/// Recognized options of the detection-to-properties pipeline.
///
/// Every section has defaults. Inside a section given in a config file all
/// fields are required, a missing threshold constant fails at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum detection score, inclusive.
    pub proba_threshold: f32,
    /// Name of the font property strategy, see [`crate::font::STRATEGY_REGISTRY`].
    pub font_strategy: String,
    /// Run the heuristic image-region finder and merge its regions.
    pub image_pipeline: bool,
    pub font_size: FontSizeBands,
    pub font_weight_bbox: BboxWeightConfig,
    pub font_weight_morph: MorphWeightConfig,
    pub image_region: ContourRegionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            proba_threshold: PROBA_THRESHOLD,
            font_strategy: DEFAULT_FONT_STRATEGY.to_string(),
            image_pipeline: false,
            font_size: FontSizeBands::default(),
            font_weight_bbox: BboxWeightConfig::default(),
            font_weight_morph: MorphWeightConfig::default(),
            image_region: ContourRegionConfig::default(),
        }
    }
}

/// Ratio boundaries of the five font size bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontSizeBands {
    pub small: f64,
    pub default: f64,
    pub medium: f64,
    pub large: f64,
    pub extralarge: f64,
}

impl Default for FontSizeBands {
    fn default() -> Self {
        Self {
            small: FONT_SIZE_SMALL,
            default: FONT_SIZE_DEFAULT,
            medium: FONT_SIZE_MEDIUM,
            large: FONT_SIZE_LARGE,
            extralarge: FONT_SIZE_EXTRALARGE,
        }
    }
}

impl FontSizeBands {
    fn as_array(&self) -> [f64; 5] {
        [
            self.small,
            self.default,
            self.medium,
            self.large,
            self.extralarge,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BboxWeightConfig {
    /// Signal used when the OCR frame has no usable rows.
    pub default_ratio: f64,
    pub lighter: f64,
    pub bolder: f64,
}

impl Default for BboxWeightConfig {
    fn default() -> Self {
        Self {
            default_ratio: FONT_WEIGHT_BBOX_DEFAULT,
            lighter: FONT_WEIGHT_BBOX_LIGHTER,
            bolder: FONT_WEIGHT_BBOX_BOLDER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MorphWeightConfig {
    pub lighter: f64,
    pub bolder: f64,
    #[serde(default = "default_binary_threshold")]
    pub binary_threshold: u8,
    /// Erosion ceiling, `None` bounds the loop by the crop size.
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

fn default_binary_threshold() -> u8 {
    BINARY_THRESHOLD
}

impl Default for MorphWeightConfig {
    fn default() -> Self {
        Self {
            lighter: FONT_WEIGHT_MORPH_LIGHTER,
            bolder: FONT_WEIGHT_MORPH_BOLDER,
            binary_threshold: BINARY_THRESHOLD,
            max_iterations: None,
        }
    }
}

/// Tuning of the contour based image-region finder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContourRegionConfig {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Edge dilation radius closing gaps at corners.
    pub dilate_radius: u8,
    /// Smallest region area as a fraction of the image area.
    pub min_area_ratio: f32,
    /// Largest region area as a fraction of the image area.
    pub max_area_ratio: f32,
    /// Shortest accepted side in pixels.
    pub min_side: f32,
    /// Regions overlapping an existing detection above this ratio are skipped.
    pub overlap_threshold: f32,
}

impl Default for ContourRegionConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            canny_low: 30.0,
            canny_high: 90.0,
            dilate_radius: 2,
            min_area_ratio: 0.005,
            max_area_ratio: 0.9,
            min_side: 16.0,
            overlap_threshold: 0.5,
        }
    }
}

impl PipelineConfig {
    /// Loads a JSON config file and validates it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FerrcardError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).context(ConfigReadSnafu {
            path: path.to_string_lossy(),
        })?;

        let config: Self = serde_json::from_str(&data).context(ConfigParseSnafu {
            path: path.to_string_lossy(),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FerrcardError> {
        ensure!(
            (0.0..=1.0).contains(&self.proba_threshold),
            InvalidConfigSnafu {
                field: "proba_threshold",
                message: format!("{} is outside [0, 1]", self.proba_threshold),
            }
        );

        let bands = self.font_size.as_array();
        ensure!(
            bands.iter().all(|band| band.is_finite() && *band >= 0.0),
            InvalidConfigSnafu {
                field: "font_size",
                message: format!("bands must be finite and non negative, got {bands:?}"),
            }
        );
        ensure!(
            bands.windows(2).all(|pair| pair[0] < pair[1]),
            InvalidConfigSnafu {
                field: "font_size",
                message: format!("bands must be strictly increasing, got {bands:?}"),
            }
        );

        let bbox = &self.font_weight_bbox;
        ensure!(
            bbox.lighter <= bbox.bolder && bbox.default_ratio.is_finite(),
            InvalidConfigSnafu {
                field: "font_weight_bbox",
                message: format!("lighter {} exceeds bolder {}", bbox.lighter, bbox.bolder),
            }
        );

        let morph = &self.font_weight_morph;
        ensure!(
            morph.lighter <= morph.bolder,
            InvalidConfigSnafu {
                field: "font_weight_morph",
                message: format!("lighter {} exceeds bolder {}", morph.lighter, morph.bolder),
            }
        );
        ensure!(
            morph.max_iterations != Some(0),
            InvalidConfigSnafu {
                field: "font_weight_morph.max_iterations",
                message: "must allow at least one iteration",
            }
        );

        let region = &self.image_region;
        ensure!(
            region.min_area_ratio < region.max_area_ratio && region.canny_low <= region.canny_high,
            InvalidConfigSnafu {
                field: "image_region",
                message: format!("inconsistent thresholds {region:?}"),
            }
        );

        Ok(())
    }
}
