//! Image-region detection outside the object detector.
//!
//! Picture-like blocks are often missed by the detector. A finder proposes
//! extra regions which are merged in front of the detections with label
//! `image` (see [`crate::layout::detection::DetectionSet::prepend_image_regions`]).

use std::collections::HashMap;

use glam::Vec2;
use image::{DynamicImage, Luma};
use imageproc::{
    distance_transform::Norm,
    edges::canny,
    filter::gaussian_blur_f32,
    morphology::dilate,
    region_labelling::{Connectivity, connected_components},
};
use tracing::*;

use crate::{analysis::bbox::Bbox, config::ContourRegionConfig, error::*};

pub trait ImageRegionFinder {
    /// Regions of `image` in pixel coordinates. `existing` holds the
    /// accepted detections so the finder can skip what is already covered.
    fn find_image_regions(
        &self,
        image: &DynamicImage,
        existing: &[Bbox],
    ) -> Result<Vec<Bbox>, FerrcardError>;
}

/// Heuristic finder over edge components.
#[derive(Debug, Clone, Default)]
pub struct ContourRegionFinder {
    config: ContourRegionConfig,
}

impl ContourRegionFinder {
    pub fn new(config: ContourRegionConfig) -> Self {
        Self { config }
    }

    fn candidates(&self, image: &DynamicImage) -> Vec<Bbox> {
        let config = &self.config;
        let gray = image.to_luma8();
        let blurred = gaussian_blur_f32(&gray, config.blur_sigma);
        let mut edges = canny(&blurred, config.canny_low, config.canny_high);
        if config.dilate_radius > 0 {
            edges = dilate(&edges, Norm::LInf, config.dilate_radius);
        }

        let labeled = connected_components(&edges, Connectivity::Eight, Luma([0]));

        let mut extents: HashMap<u32, (u32, u32, u32, u32)> = HashMap::new();
        for (x, y, label) in labeled.enumerate_pixels() {
            if label[0] == 0 {
                continue;
            }
            extents
                .entry(label[0])
                .and_modify(|(min_x, min_y, max_x, max_y)| {
                    *min_x = (*min_x).min(x);
                    *min_y = (*min_y).min(y);
                    *max_x = (*max_x).max(x);
                    *max_y = (*max_y).max(y);
                })
                .or_insert((x, y, x, y));
        }

        extents
            .into_values()
            .map(|(min_x, min_y, max_x, max_y)| {
                Bbox::new(
                    Vec2::new(min_x as f32, min_y as f32),
                    Vec2::new((max_x + 1) as f32, (max_y + 1) as f32),
                )
            })
            .collect()
    }

    fn accepts(&self, candidate: &Bbox, image_area: f32, existing: &[Bbox]) -> bool {
        let config = &self.config;
        let ratio = candidate.area() / image_area;

        (config.min_area_ratio..=config.max_area_ratio).contains(&ratio)
            && candidate.width() > config.min_side
            && candidate.height() > config.min_side
            && existing
                .iter()
                .all(|bbox| candidate.overlap_ratio(bbox) <= config.overlap_threshold)
    }
}

impl ImageRegionFinder for ContourRegionFinder {
    #[instrument(skip_all, fields(existing = existing.len()))]
    fn find_image_regions(
        &self,
        image: &DynamicImage,
        existing: &[Bbox],
    ) -> Result<Vec<Bbox>, FerrcardError> {
        let image_area = (image.width() as f32) * (image.height() as f32);
        if image_area == 0.0 {
            return Ok(Vec::new());
        }

        let candidates: Vec<Bbox> = self
            .candidates(image)
            .into_iter()
            .filter(|candidate| self.accepts(candidate, image_area, existing))
            .collect();

        // Nested candidates collapse into the outermost one
        let mut regions: Vec<Bbox> = candidates
            .iter()
            .enumerate()
            .filter(|(idx, candidate)| {
                !candidates.iter().enumerate().any(|(other_idx, other)| {
                    other_idx != *idx
                        && other.contains(candidate)
                        && (other != *candidate || other_idx < *idx)
                })
            })
            .map(|(_, candidate)| *candidate)
            .collect();

        regions.sort_by(|a, b| {
            a.min
                .y
                .total_cmp(&b.min.y)
                .then_with(|| a.min.x.total_cmp(&b.min.x))
        });

        debug!(regions = regions.len(), "image regions found");
        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    fn draw(img: &mut RgbImage, [x0, y0, x1, y1]: [u32; 4], value: u8) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Rgb([value, value, value]));
            }
        }
    }

    fn near(bbox: &Bbox, expected: [f32; 4], tolerance: f32) -> bool {
        bbox.to_xyxy()
            .iter()
            .zip(expected)
            .all(|(got, want)| (got - want).abs() <= tolerance)
    }

    #[test]
    fn test_finds_dark_block() -> Result<(), FerrcardError> {
        let mut img = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        draw(&mut img, [50, 60, 150, 140], 0);

        let finder = ContourRegionFinder::default();
        let regions = finder.find_image_regions(&DynamicImage::ImageRgb8(img), &[])?;

        assert_eq!(regions.len(), 1);
        assert!(near(&regions[0], [50.0, 60.0, 150.0, 140.0], 6.0), "{:?}", regions[0]);
        Ok(())
    }

    #[test]
    fn test_nested_and_covered_regions() -> Result<(), FerrcardError> {
        let mut img = RgbImage::from_pixel(300, 300, Rgb([255, 255, 255]));
        draw(&mut img, [20, 20, 180, 180], 40);
        draw(&mut img, [60, 60, 120, 120], 220);
        draw(&mut img, [200, 220, 280, 280], 0);
        let image = DynamicImage::ImageRgb8(img);

        let finder = ContourRegionFinder::default();
        let regions = finder.find_image_regions(&image, &[])?;
        assert_eq!(regions.len(), 2);
        assert!(near(&regions[0], [20.0, 20.0, 180.0, 180.0], 6.0));
        assert!(near(&regions[1], [200.0, 220.0, 280.0, 280.0], 6.0));

        // A detection covering the lower block suppresses it
        let existing = [Bbox::from_xyxy([195.0, 215.0, 285.0, 285.0])];
        let regions = finder.find_image_regions(&image, &existing)?;
        assert_eq!(regions.len(), 1);
        assert!(near(&regions[0], [20.0, 20.0, 180.0, 180.0], 6.0));
        Ok(())
    }

    #[test]
    fn test_blank_and_tiny_images() -> Result<(), FerrcardError> {
        let finder = ContourRegionFinder::default();
        let blank = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([255, 255, 255])));
        assert!(finder.find_image_regions(&blank, &[])?.is_empty());

        let mut img = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        draw(&mut img, [10, 10, 14, 14], 0);
        let speck = DynamicImage::ImageRgb8(img);
        assert!(finder.find_image_regions(&speck, &[])?.is_empty());
        Ok(())
    }
}
