use std::{path::Path, sync::Mutex};

use image::DynamicImage;
use snafu::ResultExt;
use tracing::*;

use crate::{
    error::*,
    inference::{
        model::{Model, OnnxSession, session_builder},
        rcnn::{FasterRcnn, RcnnConfig, RcnnSession},
    },
    layout::detection::RawDetections,
};

/// Object detection collaborator producing raw boxes, class ids and scores.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<RawDetections, FerrcardError>;
}

/// In-process detector over the ONNX export.
///
/// The model is loaded once, every inference call takes the session lock.
pub struct LocalDetector {
    session: Mutex<RcnnSession<FasterRcnn>>,
}

impl LocalDetector {
    pub fn new(session: RcnnSession<FasterRcnn>) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FerrcardError> {
        let model = FasterRcnn::from_file(path, RcnnConfig::default())?;
        let session = RcnnSession::new(session_builder()?, model)?;
        info!(model = <FasterRcnn as Model>::MODEL_NAME, "loaded detector");
        Ok(Self::new(session))
    }
}

impl ObjectDetector for LocalDetector {
    #[instrument(skip_all)]
    fn detect(&self, image: &DynamicImage) -> Result<RawDetections, FerrcardError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| FerrcardError::LockPoisoned {
                model: <FasterRcnn as Model>::MODEL_NAME.to_string(),
            })?;

        session.run(image, ())
    }
}

/// Replays precomputed detector output.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    raw: RawDetections,
}

impl StaticDetector {
    pub fn new(raw: RawDetections) -> Result<Self, FerrcardError> {
        raw.check_aligned()?;
        Ok(Self { raw })
    }

    /// Reads a JSON file holding `boxes`, `classes` and `scores`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FerrcardError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).context(DetectionsReadSnafu {
            path: path.to_string_lossy(),
        })?;
        let raw: RawDetections = serde_json::from_str(&data).context(DetectionsParseSnafu {
            path: path.to_string_lossy(),
        })?;

        Self::new(raw)
    }
}

impl ObjectDetector for StaticDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<RawDetections, FerrcardError> {
        Ok(self.raw.clone())
    }
}
