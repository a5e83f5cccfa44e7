use ferrcard_core::{
    ContourRegionFinder, FontSize, FontWeight, OcrFrame, PageOcr, PipelineConfig,
    PropertyPipeline, RawDetections, StaticDetector, analysis::labels::Label,
    region::ImageRegionFinder,
};
use image::{DynamicImage, Rgb, RgbImage};

/// 400x400 white mockup with a dark picture block in the lower half.
fn mockup() -> DynamicImage {
    let mut img = RgbImage::from_pixel(400, 400, Rgb([255, 255, 255]));
    for y in 250..350 {
        for x in 100..300 {
            img.put_pixel(x, y, Rgb([30, 30, 30]));
        }
    }
    DynamicImage::ImageRgb8(img)
}

fn detections() -> RawDetections {
    RawDetections {
        boxes: vec![
            [0.05, 0.05, 0.10, 0.50],
            [0.15, 0.05, 0.20, 0.50],
            [0.25, 0.05, 0.30, 0.50],
            [0.35, 0.05, 0.40, 0.20],
            [0.45, 0.05, 0.50, 0.20],
        ],
        classes: vec![1, 1, 1, 3, 0],
        scores: vec![0.99, 0.9, 0.85, 0.6, 0.95],
    }
}

/// Page OCR with one word per textbox, glyph widths 4, 5 and 20 px.
fn page_ocr() -> PageOcr {
    let mut frame = OcrFrame::empty();
    frame.push("Title", 25, 22, 100, 24);
    frame.push("name", 25, 62, 16, 10);
    frame.push("email", 25, 102, 25, 10);
    PageOcr::new(frame)
}

#[test]
fn test_process_labels_fonts() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = PropertyPipeline::new(PipelineConfig::default())?;
    let detector = StaticDetector::new(detections())?;

    let objects = pipeline.process(&mockup(), &detector, &page_ocr(), None)?;

    // checkbox below threshold, background id dropped
    assert_eq!(objects.len(), 3);
    assert!(objects.iter().all(|o| o.object_type == Label::Textbox));
    assert!(objects.iter().all(|o| o.confidence >= 0.8));

    let data: Vec<_> = objects.iter().map(|o| o.data.as_deref()).collect();
    assert_eq!(data, vec![Some("Title"), Some("name"), Some("email")]);

    // signals 0.05, 0.01, 0.0125
    let weights: Vec<_> = objects.iter().map(|o| o.weight).collect();
    assert_eq!(
        weights,
        vec![
            Some(FontWeight::Bolder),
            Some(FontWeight::Default),
            Some(FontWeight::Default)
        ]
    );
    assert_eq!(objects[0].size, Some(FontSize::ExtraLarge));
    assert_eq!(objects[1].size, Some(FontSize::Default));
    Ok(())
}

#[test]
fn test_image_regions_are_prepended() -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig {
        image_pipeline: true,
        ..PipelineConfig::default()
    };
    let finder = ContourRegionFinder::new(config.image_region);
    let pipeline = PropertyPipeline::new(config)?;
    let detector = StaticDetector::new(detections())?;

    let objects = pipeline.process(
        &mockup(),
        &detector,
        &page_ocr(),
        Some(&finder as &dyn ImageRegionFinder),
    )?;

    assert!(objects.len() <= detections().len() + 1);
    assert_eq!(objects.len(), 4);
    assert_eq!(objects[0].object_type, Label::Image);
    assert_eq!(objects[0].confidence, 1.0);
    assert!(objects[0].weight.is_none() && objects[0].size.is_none());
    assert!(objects[1..].iter().all(|o| o.object_type == Label::Textbox));
    Ok(())
}

#[test]
fn test_image_regions_disabled_by_config() -> Result<(), Box<dyn std::error::Error>> {
    let finder = ContourRegionFinder::default();
    let pipeline = PropertyPipeline::new(PipelineConfig::default())?;
    let detector = StaticDetector::new(detections())?;

    let objects = pipeline.process(
        &mockup(),
        &detector,
        &page_ocr(),
        Some(&finder as &dyn ImageRegionFinder),
    )?;
    assert!(objects.iter().all(|o| o.object_type != Label::Image));
    Ok(())
}

#[test]
fn test_output_serializes() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = PropertyPipeline::new(PipelineConfig::default())?;
    let detector = StaticDetector::new(detections())?;
    let objects = pipeline.process(&mockup(), &detector, &page_ocr(), None)?;

    let value = serde_json::to_value(&objects)?;
    assert_eq!(value[0]["object"], "textbox");
    assert_eq!(value[0]["weight"], "Bolder");
    assert!(value[0]["uuid"].is_string());
    Ok(())
}
