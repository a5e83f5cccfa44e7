use std::{io::Cursor, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};
use tracing::*;

use crate::{
    consts::{SERVING_MODEL_NAME, SERVING_TIMEOUT_SECS},
    error::*,
    inference::detector::ObjectDetector,
    layout::detection::RawDetections,
};

const SIGNATURE_NAME: &str = "serving_default";

#[derive(Debug, Serialize)]
struct PredictRequest {
    signature_name: &'static str,
    instances: Vec<EncodedImage>,
}

#[derive(Debug, Serialize)]
struct EncodedImage {
    b64: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    detection_boxes: Vec<[f32; 4]>,
    detection_classes: Vec<f32>,
    detection_scores: Vec<f32>,
    num_detections: f32,
}

/// Detector behind a TensorFlow Serving style REST endpoint.
#[derive(Debug, Clone)]
pub struct ServingDetector {
    client: Client,
    url: String,
    model_name: String,
}

impl ServingDetector {
    pub fn new(url: impl Into<String>, model_name: Option<String>) -> Result<Self, FerrcardError> {
        let url = url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(SERVING_TIMEOUT_SECS))
            .build()
            .context(HttpSnafu { url: url.clone() })?;

        Ok(Self {
            client,
            url,
            model_name: model_name.unwrap_or_else(|| SERVING_MODEL_NAME.to_string()),
        })
    }

    pub fn predict_url(&self) -> String {
        format!("{}/v1/models/{}:predict", self.url, self.model_name)
    }
}

fn request_body(image: &DynamicImage) -> Result<PredictRequest, FerrcardError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .context(ImageEncodeSnafu { stage: "serving" })?;

    Ok(PredictRequest {
        signature_name: SIGNATURE_NAME,
        instances: vec![EncodedImage {
            b64: STANDARD.encode(png),
        }],
    })
}

fn decode_response(url: &str, response: PredictResponse) -> Result<RawDetections, FerrcardError> {
    let prediction = response
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| FerrcardError::ServingPayload {
            url: url.to_string(),
            message: "empty predictions".to_string(),
        })?;

    let count = (prediction.num_detections.max(0.0) as usize)
        .min(prediction.detection_boxes.len())
        .min(prediction.detection_classes.len())
        .min(prediction.detection_scores.len());

    let mut boxes = prediction.detection_boxes;
    boxes.truncate(count);
    let classes = prediction.detection_classes[..count]
        .iter()
        .map(|class| class.round().max(0.0) as u32)
        .collect();
    let mut scores = prediction.detection_scores;
    scores.truncate(count);

    RawDetections::new(boxes, classes, scores)
}

impl ObjectDetector for ServingDetector {
    #[instrument(skip_all, fields(model = %self.model_name))]
    fn detect(&self, image: &DynamicImage) -> Result<RawDetections, FerrcardError> {
        let url = self.predict_url();
        let body = request_body(image)?;

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .context(HttpSnafu { url: url.clone() })?;

        let status = response.status();
        ensure!(
            status.is_success(),
            ServingStatusSnafu {
                url: url.clone(),
                status: status.as_u16(),
            }
        );

        let payload: PredictResponse = response.json().map_err(|err| FerrcardError::ServingPayload {
            url: url.clone(),
            message: err.to_string(),
        })?;

        let raw = decode_response(&url, payload)?;
        debug!(detections = raw.len(), "serving response");
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::TcpListener,
        thread::{self, JoinHandle},
    };

    use super::*;

    /// Answers a single request with a canned HTTP response.
    fn serve_once(response: &'static str) -> std::io::Result<(String, JoinHandle<()>)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let url = format!("http://{}", listener.local_addr()?);

        let handle = thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream);

            let mut content_length = 0;
            let mut line = String::new();
            while reader.read_line(&mut line).is_ok_and(|read| read > 0) {
                if line == "\r\n" {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
                line.clear();
            }
            let mut body = vec![0; content_length];
            let _ = reader.read_exact(&mut body);

            let _ = reader.get_mut().write_all(response.as_bytes());
        });

        Ok((url, handle))
    }

    #[test]
    fn test_error_status_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let (url, handle) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )?;

        let detector = ServingDetector::new(url, None)?;
        let result = detector.detect(&DynamicImage::new_rgb8(8, 8));
        assert!(
            matches!(result, Err(FerrcardError::ServingStatus { status: 500, .. })),
            "{result:?}"
        );
        assert!(handle.join().is_ok());
        Ok(())
    }

    #[test]
    fn test_non_json_body_is_malformed_payload() -> Result<(), Box<dyn std::error::Error>> {
        let (url, handle) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json",
        )?;

        let detector = ServingDetector::new(url, None)?;
        let result = detector.detect(&DynamicImage::new_rgb8(8, 8));
        assert!(
            matches!(result, Err(FerrcardError::ServingPayload { .. })),
            "{result:?}"
        );
        assert!(handle.join().is_ok());
        Ok(())
    }

    #[test]
    fn test_predict_url() -> Result<(), FerrcardError> {
        let detector = ServingDetector::new("http://localhost:8501/", None)?;
        assert_eq!(
            detector.predict_url(),
            "http://localhost:8501/v1/models/card-detector:predict"
        );

        let detector = ServingDetector::new("http://serving", Some("mystique".to_string()))?;
        assert_eq!(detector.predict_url(), "http://serving/v1/models/mystique:predict");
        Ok(())
    }

    #[test]
    fn test_request_body_is_base64_png() -> Result<(), Box<dyn std::error::Error>> {
        let body = request_body(&DynamicImage::new_rgb8(4, 3))?;
        let value = serde_json::to_value(&body)?;
        assert_eq!(value["signature_name"], "serving_default");

        let encoded = value["instances"][0]["b64"].as_str().unwrap_or_default();
        let png = STANDARD.decode(encoded)?;
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)?;
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
        Ok(())
    }

    #[test]
    fn test_decode_response() -> Result<(), Box<dyn std::error::Error>> {
        let payload: PredictResponse = serde_json::from_str(
            r#"{"predictions": [{
                "detection_boxes": [[0.1, 0.1, 0.2, 0.4], [0.5, 0.5, 0.6, 0.9], [0, 0, 0, 0]],
                "detection_classes": [1.0, 3.0, 0.0],
                "detection_scores": [0.99, 0.7, 0.0],
                "num_detections": 2.0
            }]}"#,
        )?;

        let raw = decode_response("http://serving", payload)?;
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.classes, vec![1, 3]);
        assert_eq!(raw.scores, vec![0.99, 0.7]);

        let empty: PredictResponse = serde_json::from_str(r#"{"predictions": []}"#)?;
        assert!(matches!(
            decode_response("http://serving", empty),
            Err(FerrcardError::ServingPayload { .. })
        ));
        Ok(())
    }
}
