use image::DynamicImage;

use crate::{
    analysis::bbox::Bbox,
    config::{BboxWeightConfig, FontSizeBands},
    font::{FontPropertyStrategy, WeightLimits, mean_ratio, ocr::OcrFrame},
};

/// Weight from OCR box geometry.
///
/// The signal is the mean per-character width of the recognised words,
/// relative to the image width. Wider glyphs read as bolder.
#[derive(Debug, Clone)]
pub struct BboxFontProperty {
    bands: FontSizeBands,
    weight: BboxWeightConfig,
}

impl BboxFontProperty {
    pub fn new(bands: FontSizeBands, weight: BboxWeightConfig) -> Self {
        Self { bands, weight }
    }

    /// Character width ratio of `frame`, the configured default when no row
    /// has more than one character.
    pub fn width_ratio(&self, image: &DynamicImage, frame: &OcrFrame) -> f64 {
        mean_ratio(
            frame
                .character_rows()
                .map(|row| row.width as f64 / row.char_count() as f64),
            image.width(),
        )
        .unwrap_or(self.weight.default_ratio)
    }
}

impl FontPropertyStrategy for BboxFontProperty {
    fn get_weight(&self, image: &DynamicImage, _coords: &Bbox, frame: &OcrFrame) -> Option<f64> {
        Some(self.width_ratio(image, frame))
    }

    fn default_limits(&self) -> WeightLimits {
        WeightLimits::new(self.weight.lighter, self.weight.bolder)
    }

    fn size_bands(&self) -> &FontSizeBands {
        &self.bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::element::FontSize;

    fn strategy() -> BboxFontProperty {
        BboxFontProperty::new(FontSizeBands::default(), BboxWeightConfig::default())
    }

    #[test]
    fn test_width_ratio_and_size() {
        let image = DynamicImage::new_rgb8(1000, 1000);
        let coords = Bbox::from_xyxy([0.0, 0.0, 400.0, 40.0]);

        let mut frame = OcrFrame::empty();
        // 10 and 20 px per character, mean 15
        frame.push("Login", 0, 0, 50, 25);
        frame.push("Now", 60, 0, 60, 26);

        let strategy = strategy();
        assert_eq!(strategy.get_weight(&image, &coords, &frame), Some(0.015));
        // mean height 25.5 truncated to 25
        assert_eq!(strategy.get_size(&image, &coords, &frame), FontSize::Default);
    }

    #[test]
    fn test_single_character_rows_fall_back_to_defaults() {
        let image = DynamicImage::new_rgb8(800, 600);
        let coords = Bbox::from_xyxy([0.0, 0.0, 100.0, 30.0]);

        let mut frame = OcrFrame::empty();
        frame.push("x", 0, 0, 300, 300);
        frame.push("", 10, 0, 300, 300);

        let strategy = strategy();
        assert_eq!(
            strategy.get_weight(&image, &coords, &frame),
            Some(BboxWeightConfig::default().default_ratio)
        );
        assert_eq!(strategy.get_size(&image, &coords, &frame), FontSize::Default);
        assert_eq!(
            strategy.get_size(&image, &coords, &OcrFrame::empty()),
            FontSize::Default
        );
    }

    #[test]
    fn test_large_text_is_extra_large() {
        let image = DynamicImage::new_rgb8(500, 500);
        let coords = Bbox::from_xyxy([0.0, 0.0, 500.0, 80.0]);

        let mut frame = OcrFrame::empty();
        frame.push("Welcome", 0, 0, 280, 60);

        let strategy = strategy();
        assert_eq!(strategy.get_size(&image, &coords, &frame), FontSize::ExtraLarge);
        assert_eq!(strategy.get_weight(&image, &coords, &frame), Some(0.08));
    }
}
