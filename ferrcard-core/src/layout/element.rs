use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    analysis::{bbox::Bbox, labels::Label},
    layout::detection::Detection,
};

/// Discrete font weight of a textbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontWeight {
    Lighter,
    Default,
    Bolder,
}

/// Discrete font size band of a textbox, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FontSize {
    Small,
    Default,
    Medium,
    Large,
    ExtraLarge,
}

/// One classified visual element of the mockup.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DesignObject {
    #[serde(rename = "object")]
    pub object_type: Label,
    #[serde(rename = "coords")]
    pub bounding_box: Bbox,
    #[serde(rename = "score")]
    pub confidence: f32,
    pub uuid: Uuid,
    /// Recognised text, textboxes only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<String>,
    /// Continuous boldness proxy before classification, `None` when the
    /// region could not be measured.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight_signal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<FontWeight>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<FontSize>,
}

impl DesignObject {
    pub fn new(object_type: Label, bounding_box: Bbox, confidence: f32) -> Self {
        Self {
            object_type,
            bounding_box,
            confidence,
            uuid: Uuid::new_v4(),
            data: None,
            weight_signal: None,
            weight: None,
            size: None,
        }
    }

    pub fn is_textbox(&self) -> bool {
        self.object_type.is_text()
    }
}

impl From<Detection<'_>> for DesignObject {
    fn from(detection: Detection<'_>) -> Self {
        Self::new(detection.label, *detection.bbox, detection.score)
    }
}
