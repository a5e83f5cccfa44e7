pub mod analysis;
pub mod config;
pub mod consts;
pub mod error;
pub mod font;
pub mod inference;
pub mod layout;
pub mod pipeline;
pub mod region;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::FerrcardError;
pub use font::{FontStrategy, OcrFrame, OcrReader, PageOcr};
pub use inference::{LocalDetector, ObjectDetector, ServingDetector, StaticDetector};
pub use layout::{
    detection::{DetectionSet, RawDetections},
    element::{DesignObject, FontSize, FontWeight},
};
pub use pipeline::PropertyPipeline;
pub use region::{ContourRegionFinder, ImageRegionFinder};
