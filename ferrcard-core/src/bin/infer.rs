use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ferrcard_core::{
    ContourRegionFinder, LocalDetector, ObjectDetector, OcrFrame, PageOcr, PipelineConfig,
    PropertyPipeline, ServingDetector, StaticDetector, region::ImageRegionFinder,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "infer")]
#[command(about = "Detect design objects and font properties in a UI mockup")]
struct Args {
    #[arg(help = "Input mockup image")]
    image: PathBuf,

    #[arg(short, long, help = "Pipeline config JSON")]
    config: Option<PathBuf>,

    #[arg(
        long,
        conflicts_with_all = ["model", "serving"],
        help = "Precomputed detector output JSON"
    )]
    detections: Option<PathBuf>,

    #[arg(long, conflicts_with = "serving", help = "Faster R-CNN ONNX model")]
    model: Option<PathBuf>,

    #[arg(long, help = "Serving endpoint base url")]
    serving: Option<String>,

    #[arg(long, requires = "serving", help = "Model name on the serving endpoint")]
    serving_model: Option<String>,

    #[arg(long, help = "Full image OCR frame JSON")]
    ocr: Option<PathBuf>,

    #[arg(long, help = "Merge heuristic image regions")]
    image_regions: bool,

    #[arg(short, long, help = "Output JSON file, stdout when absent")]
    output: Option<PathBuf>,
}

impl Args {
    fn detector(&self) -> Result<Box<dyn ObjectDetector>> {
        if let Some(path) = &self.detections {
            return Ok(Box::new(StaticDetector::from_file(path)?));
        }
        if let Some(path) = &self.model {
            return Ok(Box::new(LocalDetector::from_file(path)?));
        }
        if let Some(url) = &self.serving {
            return Ok(Box::new(ServingDetector::new(
                url.as_str(),
                self.serving_model.clone(),
            )?));
        }
        anyhow::bail!("one of --detections, --model or --serving is required")
    }

    fn ocr(&self) -> Result<PageOcr> {
        let Some(path) = &self.ocr else {
            return Ok(PageOcr::default());
        };
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading ocr frame {}", path.display()))?;
        let frame: OcrFrame = serde_json::from_str(&data)
            .with_context(|| format!("parsing ocr frame {}", path.display()))?;
        Ok(PageOcr::new(frame))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Input image: {}", args.image.display());

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if args.image_regions {
        config.image_pipeline = true;
    }
    let finder = ContourRegionFinder::new(config.image_region);
    let pipeline = PropertyPipeline::new(config)?;

    let image = image::open(&args.image)
        .with_context(|| format!("opening image {}", args.image.display()))?;
    let detector = args.detector()?;
    let ocr = args.ocr()?;

    let objects = pipeline.process(
        &image,
        detector.as_ref(),
        &ocr,
        Some(&finder as &dyn ImageRegionFinder),
    )?;
    info!("Found {} design objects", objects.len());

    let json = serde_json::to_string_pretty(&objects)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}
