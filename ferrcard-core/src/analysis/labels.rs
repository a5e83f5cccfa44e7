use std::fmt;

use serde::{Deserialize, Serialize};

/// Design object classes known to the card detector.
///
/// Class id `0` is the detector's background class and has no label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Textbox,
    RadioButton,
    Checkbox,
    ActionSet,
    Image,
    Rating,
}

impl Label {
    pub const fn name(&self) -> &'static str {
        match self {
            Label::Textbox => "textbox",
            Label::RadioButton => "radiobutton",
            Label::Checkbox => "checkbox",
            Label::ActionSet => "actionset",
            Label::Image => "image",
            Label::Rating => "rating",
        }
    }

    /// Resolves a detector class id through the fixed lookup table.
    ///
    /// Background (`0`) and ids outside the table have no label.
    pub const fn from_class_id(idx: u32) -> Option<Self> {
        match idx {
            1 => Some(Label::Textbox),
            2 => Some(Label::RadioButton),
            3 => Some(Label::Checkbox),
            4 => Some(Label::ActionSet),
            5 => Some(Label::Image),
            6 => Some(Label::Rating),
            _ => None,
        }
    }

    /// Whether the object carries text and gets font properties.
    pub const fn is_text(&self) -> bool {
        matches!(self, Label::Textbox)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
