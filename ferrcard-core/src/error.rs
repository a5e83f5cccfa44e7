use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FerrcardError {
    #[snafu(display("Ort Session init stage `{}` error: {}", stage, source))]
    OrtInit {
        source: ort::error::Error,
        stage: String,
    },
    #[snafu(display("Build Tensor for `{}` error: {}", stage, source))]
    Tensor {
        source: ort::error::Error,
        stage: String,
    },
    #[snafu(display("Onnx Inference error: {}", source))]
    Inference { source: ort::error::Error },
    #[snafu(display("Onnx Output can not found {}", output_name))]
    NotFoundOutput { output_name: String },
    #[snafu(display("Ndarray Shape error at stage `{}`: {}", stage, source))]
    Shape {
        source: ndarray::ShapeError,
        stage: String,
    },
    #[snafu(display("Inference session lock poisoned for model `{}`", model))]
    LockPoisoned { model: String },
    #[snafu(display("Read image `{}` error: {}", path, source))]
    ImageRead {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Encode image for `{}` error: {}", stage, source))]
    ImageEncode {
        source: image::ImageError,
        stage: String,
    },
    #[snafu(display("Serving request to `{}` error: {}", url, source))]
    Http { source: reqwest::Error, url: String },
    #[snafu(display("Serving endpoint `{}` answered with status {}", url, status))]
    ServingStatus { url: String, status: u16 },
    #[snafu(display("Serving payload from `{}` is malformed: {}", url, message))]
    ServingPayload { url: String, message: String },
    #[snafu(display("Malformed detections: {}", message))]
    MalformedDetections { message: String },
    #[snafu(display("Malformed ocr frame: {}", message))]
    MalformedOcr { message: String },
    #[snafu(display("Unknown font property strategy `{}`, expected one of {:?}", name, known))]
    UnknownStrategy {
        name: String,
        known: Vec<&'static str>,
    },
    #[snafu(display("Invalid config `{}`: {}", field, message))]
    InvalidConfig { field: String, message: String },
    #[snafu(display("Read config `{}` error: {}", path, source))]
    ConfigRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Parse config `{}` error: {}", path, source))]
    ConfigParse {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Read detections `{}` error: {}", path, source))]
    DetectionsRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Parse detections `{}` error: {}", path, source))]
    DetectionsParse {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Read model `{}` error: {}", path, source))]
    ModelRead {
        source: std::io::Error,
        path: String,
    },
}

impl FerrcardError {
    /// Startup errors: bad configuration, an unloadable model or an
    /// unreadable detections file.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            FerrcardError::UnknownStrategy { .. }
                | FerrcardError::InvalidConfig { .. }
                | FerrcardError::ConfigRead { .. }
                | FerrcardError::ConfigParse { .. }
                | FerrcardError::DetectionsRead { .. }
                | FerrcardError::DetectionsParse { .. }
                | FerrcardError::ModelRead { .. }
                | FerrcardError::OrtInit { .. }
        )
    }
}
