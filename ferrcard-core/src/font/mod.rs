//! Font property extraction for text-bearing design objects.
//!
//! Two interchangeable strategies compute a continuous weight signal per
//! textbox; the size band is derived the same way by both. The signal is
//! turned into a label later, in one batch over all textboxes of an image
//! (see [`classify::classify_weights`]).

pub mod bbox;
pub mod classify;
pub mod morph;
pub mod ocr;

use image::DynamicImage;

use crate::{
    analysis::bbox::Bbox,
    config::{FontSizeBands, PipelineConfig},
    consts::RATIO_DECIMALS,
    error::*,
    layout::element::FontSize,
};

pub use self::{
    bbox::BboxFontProperty,
    classify::{WeightLimits, classify_size, classify_weights},
    morph::MorphFontProperty,
    ocr::{OcrFrame, OcrReader, OcrRow, PageOcr},
};

pub trait FontPropertyStrategy {
    /// Continuous weight signal of the text in `coords`, `None` when the
    /// region cannot be measured.
    fn get_weight(&self, image: &DynamicImage, coords: &Bbox, frame: &OcrFrame) -> Option<f64>;

    /// Limits used when the signals of an image do not spread.
    fn default_limits(&self) -> WeightLimits;

    fn size_bands(&self) -> &FontSizeBands;

    /// Size band from the mean character height relative to the image
    /// height. Shared by every strategy.
    fn get_size(&self, image: &DynamicImage, _coords: &Bbox, frame: &OcrFrame) -> FontSize {
        let bands = self.size_bands();
        let ratio = mean_ratio(
            frame.character_rows().map(|row| row.height as f64),
            image.height(),
        )
        .unwrap_or(bands.default);

        classify_size(ratio, bands)
    }
}

/// `trunc(mean(values)) / extent`, rounded to the ratio precision. `None`
/// for an empty input or a zero extent.
pub(crate) fn mean_ratio(values: impl Iterator<Item = f64>, extent: u32) -> Option<f64> {
    let (sum, count) = values.fold((0.0_f64, 0_usize), |(sum, count), value| {
        (sum + value, count + 1)
    });

    if count == 0 || extent == 0 {
        return None;
    }

    let mean = (sum / count as f64).trunc();
    Some(round_to(mean / extent as f64, RATIO_DECIMALS))
}

/// Rounds half to even, so `0.125` becomes `0.12`.
pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

/// Strategies selectable by name in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStrategyKind {
    BoundingBox,
    Morphological,
}

/// Configuration names of every strategy.
pub const STRATEGY_REGISTRY: &[(&str, FontStrategyKind)] = &[
    ("bbox", FontStrategyKind::BoundingBox),
    ("bounding_box", FontStrategyKind::BoundingBox),
    ("morph", FontStrategyKind::Morphological),
    ("morphological", FontStrategyKind::Morphological),
];

impl FontStrategyKind {
    pub fn from_name(name: &str) -> Result<Self, FerrcardError> {
        let normalized = name.trim().to_ascii_lowercase();

        STRATEGY_REGISTRY
            .iter()
            .find(|(key, _)| *key == normalized)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| FerrcardError::UnknownStrategy {
                name: name.to_string(),
                known: STRATEGY_REGISTRY.iter().map(|(key, _)| *key).collect(),
            })
    }
}

/// The active strategy, resolved once at startup.
#[derive(Debug, Clone)]
pub enum FontStrategy {
    BoundingBox(BboxFontProperty),
    Morphological(MorphFontProperty),
}

impl FontStrategy {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, FerrcardError> {
        let strategy = match FontStrategyKind::from_name(&config.font_strategy)? {
            FontStrategyKind::BoundingBox => FontStrategy::BoundingBox(BboxFontProperty::new(
                config.font_size,
                config.font_weight_bbox,
            )),
            FontStrategyKind::Morphological => FontStrategy::Morphological(
                MorphFontProperty::new(config.font_size, config.font_weight_morph),
            ),
        };

        Ok(strategy)
    }

    pub fn kind(&self) -> FontStrategyKind {
        match self {
            FontStrategy::BoundingBox(_) => FontStrategyKind::BoundingBox,
            FontStrategy::Morphological(_) => FontStrategyKind::Morphological,
        }
    }

    fn inner(&self) -> &dyn FontPropertyStrategy {
        match self {
            FontStrategy::BoundingBox(strategy) => strategy as &dyn FontPropertyStrategy,
            FontStrategy::Morphological(strategy) => strategy as &dyn FontPropertyStrategy,
        }
    }
}

impl FontPropertyStrategy for FontStrategy {
    fn get_weight(&self, image: &DynamicImage, coords: &Bbox, frame: &OcrFrame) -> Option<f64> {
        self.inner().get_weight(image, coords, frame)
    }

    fn default_limits(&self) -> WeightLimits {
        self.inner().default_limits()
    }

    fn size_bands(&self) -> &FontSizeBands {
        self.inner().size_bands()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_names() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(FontStrategyKind::from_name("bbox")?, FontStrategyKind::BoundingBox);
        assert_eq!(
            FontStrategyKind::from_name(" Morphological ")?,
            FontStrategyKind::Morphological
        );

        let err = FontStrategyKind::from_name("mystery").unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("mystery"));
        Ok(())
    }

    #[test]
    fn test_strategy_from_config() -> Result<(), Box<dyn std::error::Error>> {
        let mut config = PipelineConfig::default();
        let strategy = FontStrategy::from_config(&config)?;
        assert_eq!(strategy.kind(), FontStrategyKind::BoundingBox);
        assert_eq!(
            strategy.default_limits(),
            WeightLimits::new(config.font_weight_bbox.lighter, config.font_weight_bbox.bolder)
        );

        config.font_strategy = "morph".to_string();
        let strategy = FontStrategy::from_config(&config)?;
        assert_eq!(strategy.kind(), FontStrategyKind::Morphological);
        assert_eq!(strategy.default_limits().bold, config.font_weight_morph.bolder);
        Ok(())
    }

    #[test]
    fn test_mean_ratio() {
        // mean 15.5 is truncated to 15 before the ratio
        assert_eq!(mean_ratio([15.0, 16.0].into_iter(), 1000), Some(0.015));
        assert_eq!(mean_ratio(std::iter::empty(), 1000), None);
        assert_eq!(mean_ratio([10.0].into_iter(), 0), None);
        assert_eq!(mean_ratio([1.0].into_iter(), 3), Some(0.3333));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.42739, 2), 0.43);
        assert_eq!(round_to(0.05927, 2), 0.06);
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(2.5, 0), 2.0);
    }
}
