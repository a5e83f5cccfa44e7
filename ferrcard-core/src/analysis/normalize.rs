use tracing::*;

use crate::{
    analysis::{bbox::Bbox, labels::Label},
    error::FerrcardError,
    layout::detection::{DetectionSet, RawDetections},
};

/// Converts detector output into a pixel-space [`DetectionSet`].
///
/// Boxes go from fractional `[ymin, xmin, ymax, xmax]` to pixel
/// `[xmin, ymin, xmax, ymax]` (scale, then reorder). Class ids are resolved
/// through the label table; detections with the background id or an unknown
/// id are dropped together with their box and score.
pub fn normalize(raw: RawDetections, width: u32, height: u32) -> Result<DetectionSet, FerrcardError> {
    raw.check_aligned()?;

    let (width, height) = (width as f32, height as f32);
    let mut boxes = Vec::with_capacity(raw.len());
    let mut labels = Vec::with_capacity(raw.len());
    let mut scores = Vec::with_capacity(raw.len());

    for ((yxyx, class_id), score) in raw
        .boxes
        .into_iter()
        .zip(raw.classes)
        .zip(raw.scores)
    {
        let Some(label) = Label::from_class_id(class_id) else {
            warn!(class_id, score, "dropping detection without label");
            continue;
        };

        boxes.push(Bbox::from_normalized_yxyx(yxyx, width, height));
        labels.push(label);
        scores.push(score);
    }

    DetectionSet::new(boxes, labels, scores)
}
