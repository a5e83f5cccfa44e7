use image::DynamicImage;
use ndarray::prelude::*;
use ort::{
    session::{Session, builder::SessionBuilder},
    value::TensorRef,
};
use snafu::{OptionExt, ResultExt, ensure};
use tracing::*;

use crate::{
    error::*,
    inference::{
        model::{Model, OnnxSession},
        rcnn::model::{FasterRcnn, RcnnOutput},
    },
    layout::detection::RawDetections,
};

pub struct RcnnSession<M: Model> {
    session: Session,
    model: M,
}

impl RcnnSession<FasterRcnn> {
    pub fn new(session: SessionBuilder, model: FasterRcnn) -> Result<Self, FerrcardError> {
        let session = session
            .commit_from_memory(model.load())
            .context(OrtInitSnafu { stage: "commit" })?;

        Ok(Self { session, model })
    }
}

impl OnnxSession<FasterRcnn> for RcnnSession<FasterRcnn> {
    type Output = RawDetections;
    type Extra = ();

    fn preprocess(&self, image: &DynamicImage) -> Result<<FasterRcnn as Model>::Input, FerrcardError> {
        let config = self.model.config();
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        // The exported graph takes raw HWC bytes and resizes internally
        Array4::from_shape_vec(
            (
                config.batch_size,
                height as usize,
                width as usize,
                config.input_channels,
            ),
            rgb.into_raw(),
        )
        .context(ShapeSnafu { stage: "input" })
    }

    fn postprocess(
        &self,
        output: <FasterRcnn as Model>::Output,
        _extra: Self::Extra,
    ) -> Result<Self::Output, FerrcardError> {
        decode_output(output, self.model.config().box_size)
    }

    fn infer(
        &mut self,
        input: <FasterRcnn as Model>::Input,
        input_name: &str,
        output_names: &[&str],
    ) -> Result<<FasterRcnn as Model>::Output, FerrcardError> {
        let outputs = self
            .session
            .run(ort::inputs![
                input_name => TensorRef::from_array_view(&input).context(TensorSnafu{stage: "input"})?
            ])
            .context(InferenceSnafu {})?;

        let mut tensors = Vec::with_capacity(output_names.len());
        for output_name in output_names {
            let tensor = outputs
                .get(*output_name)
                .context(NotFoundOutputSnafu {
                    output_name: *output_name,
                })?
                .try_extract_array::<f32>()
                .context(TensorSnafu { stage: "extract" })?;
            tensors.push(tensor.to_owned());
        }

        let [boxes, classes, scores, num_detections]: [ArrayD<f32>; 4] =
            tensors
                .try_into()
                .map_err(|tensors: Vec<ArrayD<f32>>| FerrcardError::MalformedDetections {
                    message: format!("expected 4 output tensors, got {}", tensors.len()),
                })?;

        Ok(RcnnOutput {
            boxes: boxes
                .into_dimensionality::<Ix3>()
                .context(ShapeSnafu { stage: "detection_boxes" })?,
            classes: classes
                .into_dimensionality::<Ix2>()
                .context(ShapeSnafu {
                    stage: "detection_classes",
                })?,
            scores: scores
                .into_dimensionality::<Ix2>()
                .context(ShapeSnafu {
                    stage: "detection_scores",
                })?,
            num_detections: num_detections
                .into_dimensionality::<Ix1>()
                .context(ShapeSnafu {
                    stage: "num_detections",
                })?,
        })
    }
}

/// Valid rows of the first batch entry as [`RawDetections`].
fn decode_output(output: RcnnOutput, box_size: usize) -> Result<RawDetections, FerrcardError> {
    let RcnnOutput {
        boxes,
        classes,
        scores,
        num_detections,
    } = output;

    ensure!(
        boxes.shape()[0] > 0 && boxes.shape()[2] >= box_size && box_size >= 4,
        MalformedDetectionsSnafu {
            message: format!("unexpected detection_boxes shape {:?}", boxes.shape()),
        }
    );
    ensure!(
        classes.shape()[0] > 0 && scores.shape()[0] > 0,
        MalformedDetectionsSnafu {
            message: "empty class or score batch",
        }
    );

    let available = boxes.shape()[1].min(classes.shape()[1]).min(scores.shape()[1]);
    let reported = num_detections.get(0).copied().unwrap_or(0.0).max(0.0) as usize;
    let count = reported.min(available);
    if reported > available {
        warn!(reported, available, "num_detections exceeds output rows");
    }

    let raw_boxes = boxes
        .slice(s![0, ..count, ..box_size])
        .axis_iter(Axis(0))
        .map(|row| [row[0usize], row[1usize], row[2usize], row[3usize]])
        .collect();
    let raw_classes = classes
        .slice(s![0, ..count])
        .iter()
        .map(|class| class.round().max(0.0) as u32)
        .collect();
    let raw_scores = scores.slice(s![0, ..count]).to_vec();

    debug!(detections = count, "faster rcnn output");
    RawDetections::new(raw_boxes, raw_classes, raw_scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded_output(num_detections: f32) -> RcnnOutput {
        RcnnOutput {
            boxes: array![[
                [0.1, 0.2, 0.3, 0.4],
                [0.5, 0.5, 1.0, 1.0],
                [0.0, 0.0, 0.0, 0.0]
            ]],
            classes: array![[1.0, 5.0, 0.0]],
            scores: array![[0.97, 0.83, 0.0]],
            num_detections: array![num_detections],
        }
    }

    #[test]
    fn test_decode_truncates_to_num_detections() -> Result<(), FerrcardError> {
        let raw = decode_output(padded_output(2.0), 4)?;
        assert_eq!(raw.boxes, vec![[0.1, 0.2, 0.3, 0.4], [0.5, 0.5, 1.0, 1.0]]);
        assert_eq!(raw.classes, vec![1, 5]);
        assert_eq!(raw.scores, vec![0.97, 0.83]);
        Ok(())
    }

    #[test]
    fn test_decode_clamps_overreported_count() -> Result<(), FerrcardError> {
        let raw = decode_output(padded_output(10.0), 4)?;
        assert_eq!(raw.len(), 3);

        let raw = decode_output(padded_output(0.0), 4)?;
        assert!(raw.is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_rejects_short_boxes() {
        let mut output = padded_output(1.0);
        output.boxes = Array3::zeros((1, 3, 2));
        assert!(matches!(
            decode_output(output, 4),
            Err(FerrcardError::MalformedDetections { .. })
        ));
    }

    #[test]
    fn test_output_tensor_layout() {
        assert_eq!(<FasterRcnn as Model>::OUTPUT_NAMES.len(), 4);
        assert_eq!(<FasterRcnn as Model>::INPUT_NAME, "input_tensor");
    }
}
