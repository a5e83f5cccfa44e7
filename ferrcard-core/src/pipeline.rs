use std::collections::HashMap;

use image::DynamicImage;
use tracing::*;

use crate::{
    analysis::{bbox::Bbox, normalize},
    config::PipelineConfig,
    error::*,
    font::{FontPropertyStrategy, FontStrategy, OcrFrame, OcrReader, WeightLimits, classify},
    inference::ObjectDetector,
    layout::{detection::DetectionSet, element::DesignObject},
    region::ImageRegionFinder,
};

/// Turns detections of one mockup image into design objects with font
/// properties.
///
/// Holds only read-only configuration, one instance serves any number of
/// images.
#[derive(Debug, Clone)]
pub struct PropertyPipeline {
    config: PipelineConfig,
    strategy: FontStrategy,
}

impl PropertyPipeline {
    /// Validates `config` and resolves the font strategy.
    pub fn new(config: PipelineConfig) -> Result<Self, FerrcardError> {
        config.validate()?;
        let strategy = FontStrategy::from_config(&config)?;
        info!(
            strategy = ?strategy.kind(),
            threshold = config.proba_threshold,
            image_pipeline = config.image_pipeline,
            "pipeline ready"
        );

        Ok(Self { config, strategy })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn strategy(&self) -> &FontStrategy {
        &self.strategy
    }

    /// One design object per detection passing the confidence threshold.
    ///
    /// `ocr_frames` is keyed by the index in `detections`, a textbox without
    /// a frame is measured on an empty one. Weight labels are left unset,
    /// see [`PropertyPipeline::classify_weights`].
    pub fn infer_properties(
        &self,
        detections: &DetectionSet,
        image: &DynamicImage,
        ocr_frames: &HashMap<usize, OcrFrame>,
    ) -> Vec<DesignObject> {
        let empty = OcrFrame::empty();

        detections
            .confident_indices(self.config.proba_threshold)
            .into_iter()
            .filter_map(|index| detections.get(index))
            .map(|detection| {
                let index = detection.index;
                let mut object = DesignObject::from(detection);

                if object.is_textbox() {
                    let frame = ocr_frames.get(&index).unwrap_or(&empty);
                    let coords = object.bounding_box;

                    let text = frame.text();
                    object.data = (!text.is_empty()).then_some(text);
                    object.weight_signal = self.strategy.get_weight(image, &coords, frame);
                    object.size = Some(self.strategy.get_size(image, &coords, frame));

                    debug!(
                        index,
                        rows = frame.len(),
                        signal = ?object.weight_signal,
                        size = ?object.size,
                        "textbox properties"
                    );
                }

                object
            })
            .collect()
    }

    /// Assigns weight labels to all textboxes of one image.
    pub fn classify_weights(&self, objects: &mut [DesignObject]) -> WeightLimits {
        classify::classify_weights(objects, self.strategy.default_limits())
    }

    /// Runs the whole pipeline on one image.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn process(
        &self,
        image: &DynamicImage,
        detector: &dyn ObjectDetector,
        ocr: &dyn OcrReader,
        regions: Option<&dyn ImageRegionFinder>,
    ) -> Result<Vec<DesignObject>, FerrcardError> {
        let threshold = self.config.proba_threshold;

        let raw = detector.detect(image)?;
        let raw_count = raw.len();
        let mut detections = normalize(raw, image.width(), image.height())?;
        info!(raw = raw_count, labelled = detections.len(), "detections normalized");

        if let Some(finder) = regions.filter(|_| self.config.image_pipeline) {
            let existing: Vec<Bbox> = detections.filter_by_confidence(threshold).boxes().to_vec();
            let found = finder.find_image_regions(image, &existing)?;
            info!(regions = found.len(), "image regions merged");
            detections = detections.prepend_image_regions(found);
        }

        let mut ocr_frames = HashMap::new();
        for detection in detections
            .confident_indices(threshold)
            .into_iter()
            .filter_map(|index| detections.get(index))
            .filter(|detection| detection.label.is_text())
        {
            ocr_frames.insert(detection.index, ocr.read(image, detection.bbox)?);
        }

        let mut objects = self.infer_properties(&detections, image, &ocr_frames);
        let limits = self.classify_weights(&mut objects);
        info!(
            objects = objects.len(),
            textboxes = ocr_frames.len(),
            light = limits.light,
            bold = limits.bold,
            "design objects ready"
        );

        Ok(objects)
    }
}
