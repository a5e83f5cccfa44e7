use glam::Vec2;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{analysis::bbox::Bbox, error::*};

/// Per-word geometry from the OCR engine.
///
/// Parallel sequences indexed identically, coordinates in pixels relative
/// to the image the engine was given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedFrame")]
pub struct OcrFrame {
    text: Vec<String>,
    left: Vec<u32>,
    top: Vec<u32>,
    width: Vec<u32>,
    height: Vec<u32>,
}

#[derive(Deserialize)]
struct UncheckedFrame {
    text: Vec<String>,
    left: Vec<u32>,
    top: Vec<u32>,
    width: Vec<u32>,
    height: Vec<u32>,
}

impl TryFrom<UncheckedFrame> for OcrFrame {
    type Error = FerrcardError;

    fn try_from(frame: UncheckedFrame) -> Result<Self, Self::Error> {
        OcrFrame::new(frame.text, frame.left, frame.top, frame.width, frame.height)
    }
}

/// Borrowed view of one OCR row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcrRow<'a> {
    pub text: &'a str,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl OcrRow<'_> {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Pixel box of the row, edges past `u32::MAX` are clamped to it.
    pub fn bbox(&self) -> Bbox {
        let right = self.left.saturating_add(self.width);
        let bottom = self.top.saturating_add(self.height);
        Bbox::new(
            Vec2::new(self.left as f32, self.top as f32),
            Vec2::new(right as f32, bottom as f32),
        )
    }
}

impl OcrFrame {
    pub fn new(
        text: Vec<String>,
        left: Vec<u32>,
        top: Vec<u32>,
        width: Vec<u32>,
        height: Vec<u32>,
    ) -> Result<Self, FerrcardError> {
        let len = text.len();
        ensure!(
            [left.len(), top.len(), width.len(), height.len()]
                .iter()
                .all(|other| *other == len),
            MalformedOcrSnafu {
                message: format!(
                    "{} texts, {} left, {} top, {} width, {} height",
                    len,
                    left.len(),
                    top.len(),
                    width.len(),
                    height.len()
                ),
            }
        );

        Ok(Self {
            text,
            left,
            top,
            width,
            height,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn push(&mut self, text: impl Into<String>, left: u32, top: u32, width: u32, height: u32) {
        self.text.push(text.into());
        self.left.push(left);
        self.top.push(top);
        self.width.push(width);
        self.height.push(height);
    }

    pub fn rows(&self) -> impl Iterator<Item = OcrRow<'_>> {
        (0..self.len()).map(|idx| OcrRow {
            text: &self.text[idx],
            left: self.left[idx],
            top: self.top[idx],
            width: self.width[idx],
            height: self.height[idx],
        })
    }

    /// Rows with more than one character; single characters are mostly
    /// garbage boxes.
    pub fn character_rows(&self) -> impl Iterator<Item = OcrRow<'_>> {
        self.rows().filter(|row| row.char_count() > 1)
    }

    /// Recognised words joined by single spaces.
    pub fn text(&self) -> String {
        self.text
            .iter()
            .map(|word| word.trim())
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Rows whose centre falls inside `region`, with coordinates relative to
    /// the region origin.
    pub fn within(&self, region: &Bbox) -> Self {
        let mut frame = Self::empty();
        let origin = region.min.max(Vec2::ZERO);

        for row in self.rows().filter(|row| region.contains_point(row.bbox().center())) {
            frame.push(
                row.text,
                (row.left as f32 - origin.x).max(0.0) as u32,
                (row.top as f32 - origin.y).max(0.0) as u32,
                row.width,
                row.height,
            );
        }

        frame
    }
}

/// The OCR collaborator.
pub trait OcrReader {
    /// Reads the text of `region` inside `image`.
    fn read(&self, image: &DynamicImage, region: &Bbox) -> Result<OcrFrame, FerrcardError>;
}

/// Reader answering from one precomputed full-image frame.
#[derive(Debug, Clone, Default)]
pub struct PageOcr {
    frame: OcrFrame,
}

impl PageOcr {
    pub fn new(frame: OcrFrame) -> Self {
        Self { frame }
    }
}

impl OcrReader for PageOcr {
    fn read(&self, _image: &DynamicImage, region: &Bbox) -> Result<OcrFrame, FerrcardError> {
        Ok(self.frame.within(region))
    }
}
