use std::path::Path;

use ndarray::{Array1, Array2, Array3, Array4};
use snafu::ResultExt;

use crate::{
    consts::BOX_SIZE,
    error::*,
    inference::model::Model,
};

/// Faster R-CNN object detector exported to ONNX from the TensorFlow object
/// detection API.
pub struct FasterRcnn {
    config: RcnnConfig,
    bytes: Vec<u8>,
}

/// `uint8` image batch, `[batch, height, width, channels]`.
pub type RcnnInput = Array4<u8>;

/// Raw output tensors, one image per batch row.
#[derive(Debug, Clone)]
pub struct RcnnOutput {
    /// `[batch, N, 4]` fractional `[ymin, xmin, ymax, xmax]`.
    pub boxes: Array3<f32>,
    /// `[batch, N]` class ids as floats.
    pub classes: Array2<f32>,
    /// `[batch, N]`
    pub scores: Array2<f32>,
    /// `[batch]` count of valid rows in the padded outputs.
    pub num_detections: Array1<f32>,
}

#[derive(Debug, Clone)]
pub struct RcnnConfig {
    pub batch_size: usize,
    pub input_channels: usize,
    pub box_size: usize,
}

impl Default for RcnnConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            input_channels: 3,
            box_size: BOX_SIZE,
        }
    }
}

impl FasterRcnn {
    /// Reads the exported model once, sessions are built from these bytes.
    pub fn from_file<P: AsRef<Path>>(path: P, config: RcnnConfig) -> Result<Self, FerrcardError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).context(ModelReadSnafu {
            path: path.to_string_lossy(),
        })?;

        Ok(Self { config, bytes })
    }
}

impl Model for FasterRcnn {
    type Input = RcnnInput;

    type Output = RcnnOutput;
    type Config = RcnnConfig;

    const INPUT_NAME: &'static str = "input_tensor";

    const OUTPUT_NAMES: &'static [&'static str] = &[
        "detection_boxes",
        "detection_classes",
        "detection_scores",
        "num_detections",
    ];

    const MODEL_NAME: &'static str = "faster-rcnn-pic2card";

    fn load(&self) -> &[u8] {
        &self.bytes
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
