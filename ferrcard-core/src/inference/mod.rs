pub mod detector;
pub mod model;
pub mod rcnn;
pub mod serving;

pub use detector::{LocalDetector, ObjectDetector, StaticDetector};
pub use serving::ServingDetector;
