use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{
    analysis::{bbox::Bbox, labels::Label},
    consts::IMAGE_REGION_SCORE,
    error::*,
};

/// Detector output as it comes off the model or the serving endpoint.
///
/// Boxes are fractional `[ymin, xmin, ymax, xmax]`, classes are raw ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetections {
    pub boxes: Vec<[f32; 4]>,
    pub classes: Vec<u32>,
    pub scores: Vec<f32>,
}

impl RawDetections {
    pub fn new(
        boxes: Vec<[f32; 4]>,
        classes: Vec<u32>,
        scores: Vec<f32>,
    ) -> Result<Self, FerrcardError> {
        let raw = Self {
            boxes,
            classes,
            scores,
        };
        raw.check_aligned()?;
        Ok(raw)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn check_aligned(&self) -> Result<(), FerrcardError> {
        ensure_aligned(self.boxes.len(), self.classes.len(), self.scores.len())
    }
}

/// One inference pass in pixel space: parallel boxes, labels and scores.
///
/// Index `i` in the three sequences always describes the same detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
    boxes: Vec<Bbox>,
    labels: Vec<Label>,
    scores: Vec<f32>,
}

/// Borrowed view of one detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection<'a> {
    pub index: usize,
    pub bbox: &'a Bbox,
    pub label: Label,
    pub score: f32,
}

impl DetectionSet {
    pub fn new(
        boxes: Vec<Bbox>,
        labels: Vec<Label>,
        scores: Vec<f32>,
    ) -> Result<Self, FerrcardError> {
        ensure_aligned(boxes.len(), labels.len(), scores.len())?;
        Ok(Self {
            boxes,
            labels,
            scores,
        })
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[Bbox] {
        &self.boxes
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn get(&self, index: usize) -> Option<Detection<'_>> {
        Some(Detection {
            index,
            bbox: self.boxes.get(index)?,
            label: *self.labels.get(index)?,
            score: *self.scores.get(index)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Detection<'_>> {
        self.boxes
            .iter()
            .zip(self.labels.iter().zip(self.scores.iter()))
            .enumerate()
            .map(|(index, (bbox, (label, score)))| Detection {
                index,
                bbox,
                label: *label,
                score: *score,
            })
    }

    /// Merges image regions in front of the primary detections.
    ///
    /// Every region becomes an `image` detection scored [`IMAGE_REGION_SCORE`];
    /// prepending gives them priority over the primary detector in any later
    /// overlap resolution.
    pub fn prepend_image_regions(self, regions: Vec<Bbox>) -> Self {
        let count = regions.len();

        let mut boxes = regions;
        boxes.extend(self.boxes);

        let mut labels = vec![Label::Image; count];
        labels.extend(self.labels);

        let mut scores = vec![IMAGE_REGION_SCORE; count];
        scores.extend(self.scores);

        Self {
            boxes,
            labels,
            scores,
        }
    }

    /// Keeps the detections scoring at least `threshold`, in their original
    /// order. An empty result is valid.
    pub fn filter_by_confidence(&self, threshold: f32) -> Self {
        let mut filtered = Self::default();

        for detection in self.iter().filter(|det| det.score >= threshold) {
            filtered.boxes.push(*detection.bbox);
            filtered.labels.push(detection.label);
            filtered.scores.push(detection.score);
        }

        filtered
    }

    /// Indices into `self` kept by [`DetectionSet::filter_by_confidence`].
    pub fn confident_indices(&self, threshold: f32) -> Vec<usize> {
        self.iter()
            .filter(|det| det.score >= threshold)
            .map(|det| det.index)
            .collect()
    }
}

fn ensure_aligned(boxes: usize, classes: usize, scores: usize) -> Result<(), FerrcardError> {
    ensure!(
        boxes == classes && classes == scores,
        MalformedDetectionsSnafu {
            message: format!("{boxes} boxes, {classes} classes, {scores} scores"),
        }
    );
    Ok(())
}
