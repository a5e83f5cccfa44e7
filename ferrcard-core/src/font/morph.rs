use image::{DynamicImage, GrayImage};
use imageproc::{
    contrast::{ThresholdType, threshold},
    distance_transform::Norm,
    morphology::{dilate, erode},
};
use tracing::*;

use crate::{
    analysis::bbox::Bbox,
    config::{FontSizeBands, MorphWeightConfig},
    consts::LIMIT_DECIMALS,
    font::{FontPropertyStrategy, WeightLimits, ocr::OcrFrame, round_to},
};

/// Weight from stroke thickness.
///
/// The crop is binarized and thinned to a skeleton with repeated cross
/// erosions. Foreground area over skeleton length approximates the average
/// stroke width in pixels.
#[derive(Debug, Clone)]
pub struct MorphFontProperty {
    bands: FontSizeBands,
    weight: MorphWeightConfig,
}

impl MorphFontProperty {
    pub fn new(bands: FontSizeBands, weight: MorphWeightConfig) -> Self {
        Self { bands, weight }
    }

    /// Dark pixels of the crop become foreground.
    fn binarize(&self, image: &DynamicImage, coords: &Bbox) -> Option<GrayImage> {
        let (x, y, width, height) = coords.crop_rect(image.width(), image.height())?;
        let gray = image.crop_imm(x, y, width, height).to_luma8();

        Some(threshold(
            &gray,
            self.weight.binary_threshold,
            ThresholdType::BinaryInverted,
        ))
    }

    /// Stroke thickness of a binary image, `None` without foreground or
    /// skeleton.
    pub fn stroke_thickness(&self, binary: &GrayImage) -> Option<f64> {
        let area = count_foreground(binary);
        if area == 0 {
            return None;
        }

        let max_iterations = self
            .weight
            .max_iterations
            .unwrap_or((binary.width() + binary.height() + 1) as usize);

        let (skeleton, erosion) = skeletonize(binary, max_iterations);
        match erosion {
            Erosion::Converged(_) => {}
            Erosion::Stalled(iterations) => warn!(
                iterations,
                width = binary.width(),
                height = binary.height(),
                "erosion stalled, crop has a solid region without background"
            ),
            Erosion::Capped => warn!(
                max_iterations,
                width = binary.width(),
                height = binary.height(),
                "erosion did not converge, using partial skeleton"
            ),
        }

        let skeleton_len = count_foreground(&skeleton);
        if skeleton_len == 0 {
            return None;
        }

        Some(round_to(
            area as f64 / skeleton_len as f64,
            LIMIT_DECIMALS,
        ))
    }
}

/// How the thinning loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Erosion {
    /// No foreground left after this many erosions.
    Converged(usize),
    /// An erosion left the image unchanged after this many productive ones.
    Stalled(usize),
    /// The iteration ceiling was reached with foreground left.
    Capped,
}

/// Morphological skeleton with a 3x3 cross kernel.
///
/// Once an erosion changes nothing, the opening equals the image and no
/// later iteration can add to the skeleton, so the loop stops there.
fn skeletonize(binary: &GrayImage, max_iterations: usize) -> (GrayImage, Erosion) {
    let mut img = binary.clone();
    let mut skeleton = GrayImage::new(binary.width(), binary.height());

    for iteration in 0..max_iterations {
        let eroded = erode(&img, Norm::L1, 1);
        if eroded.as_raw() == img.as_raw() {
            return (skeleton, Erosion::Stalled(iteration));
        }

        let opened = dilate(&eroded, Norm::L1, 1);
        for ((skel, current), open) in skeleton
            .pixels_mut()
            .zip(img.pixels())
            .zip(opened.pixels())
        {
            skel[0] |= current[0].saturating_sub(open[0]);
        }

        img = eroded;
        if count_foreground(&img) == 0 {
            return (skeleton, Erosion::Converged(iteration + 1));
        }
    }

    (skeleton, Erosion::Capped)
}

fn count_foreground(image: &GrayImage) -> usize {
    image.pixels().filter(|pixel| pixel[0] > 0).count()
}

impl FontPropertyStrategy for MorphFontProperty {
    fn get_weight(&self, image: &DynamicImage, coords: &Bbox, _frame: &OcrFrame) -> Option<f64> {
        let binary = self.binarize(image, coords)?;
        let thickness = self.stroke_thickness(&binary);
        trace!(?coords, ?thickness, "stroke thickness");
        thickness
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
    use image::{Rgb, RgbImage};

    use super::*;

    fn strategy() -> MorphFontProperty {
        MorphFontProperty::new(FontSizeBands::default(), MorphWeightConfig::default())
    }

    /// White canvas with a black filled rectangle.
    fn canvas(width: u32, height: u32, stroke: [u32; 4]) -> DynamicImage {
        let [x0, y0, x1, y1] = stroke;
        let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_one_pixel_line_has_unit_thickness() {
        let image = canvas(30, 10, [5, 4, 25, 5]);
        let coords = Bbox::from_xyxy([0.0, 0.0, 30.0, 10.0]);

        let signal = strategy().get_weight(&image, &coords, &OcrFrame::empty());
        assert_eq!(signal, Some(1.0));
    }

    #[test]
    fn test_thick_stroke_is_heavier() {
        let coords = Bbox::from_xyxy([0.0, 0.0, 40.0, 20.0]);
        let strategy = strategy();

        let thin = strategy.get_weight(&canvas(40, 20, [10, 9, 30, 10]), &coords, &OcrFrame::empty());
        let thick = strategy.get_weight(&canvas(40, 20, [10, 7, 30, 12]), &coords, &OcrFrame::empty());

        let (thin, thick) = (thin.unwrap_or(0.0), thick.unwrap_or(0.0));
        assert!(thick > thin, "thick {thick} should exceed thin {thin}");
        assert!(thick > 2.0);
    }

    #[test]
    fn test_blank_or_empty_crop_is_unmeasured() {
        let strategy = strategy();
        let blank = canvas(20, 20, [0, 0, 0, 0]);

        let full = Bbox::from_xyxy([0.0, 0.0, 20.0, 20.0]);
        assert_eq!(strategy.get_weight(&blank, &full, &OcrFrame::empty()), None);

        let outside = Bbox::from_xyxy([50.0, 50.0, 60.0, 60.0]);
        assert_eq!(strategy.get_weight(&blank, &outside, &OcrFrame::empty()), None);
    }

    fn binary(width: u32, height: u32, stroke: [u32; 4]) -> GrayImage {
        strategy()
            .binarize(
                &canvas(width, height, stroke),
                &Bbox::from_xyxy([0.0, 0.0, width as f32, height as f32]),
            )
            .unwrap_or_default()
    }

    #[test]
    fn test_iteration_cap_limits_skeleton() {
        // 30x9 stroke needs five erosions to vanish
        let stroke = binary(50, 29, [10, 10, 40, 19]);

        let (_, erosion) = skeletonize(&stroke, 100);
        assert_eq!(erosion, Erosion::Converged(5));
        let (_, erosion) = skeletonize(&stroke, 1);
        assert_eq!(erosion, Erosion::Capped);

        let capped = MorphFontProperty::new(
            FontSizeBands::default(),
            MorphWeightConfig {
                max_iterations: Some(1),
                ..MorphWeightConfig::default()
            },
        );
        let uncapped = strategy();

        // One iteration only collects the four corners: 270 / 4
        assert_eq!(capped.stroke_thickness(&stroke), Some(67.5));
        let full = uncapped.stroke_thickness(&stroke);
        assert!(full.is_some_and(|value| value < 67.5), "{full:?}");
    }

    #[test]
    fn test_solid_crop_stops_at_first_stalled_erosion() {
        let solid = binary(1200, 120, [0, 0, 1200, 120]);
        assert_eq!(solid.as_raw().iter().filter(|pixel| **pixel > 0).count(), 1200 * 120);

        let (skeleton, erosion) = skeletonize(&solid, 1321);
        assert_eq!(erosion, Erosion::Stalled(0));
        assert_eq!(count_foreground(&skeleton), 0);

        assert_eq!(strategy().stroke_thickness(&solid), None);
    }
}
