use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box in pixel space.
///
/// The origin is the top-left corner of the image, `min` holds
/// `(xmin, ymin)` and `max` holds `(xmax, ymax)`. Serialized as the flat
/// array `[xmin, ymin, xmax, ymax]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Bbox {
    /// The minimum point of the bounding box (top-left corner).
    pub min: Vec2,
    /// The maximum point of the bounding box (bottom-right corner).
    pub max: Vec2,
}

impl Bbox {
    /// Creates a new bounding box from minimum and maximum points.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use ferrcard_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0));
    /// assert_eq!(bbox.width(), 10.0);
    /// ```
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from `[xmin, ymin, xmax, ymax]`.
    pub fn from_xyxy([xmin, ymin, xmax, ymax]: [f32; 4]) -> Self {
        Self::new(Vec2::new(xmin, ymin), Vec2::new(xmax, ymax))
    }

    /// Creates a pixel-space box from a detector box in fractional
    /// `[ymin, xmin, ymax, xmax]` form.
    ///
    /// The scale factors `[height, width, height, width]` are applied to the
    /// fractional box element-wise first, then the axes are reordered to
    /// `[xmin, ymin, xmax, ymax]`. Values outside `[0, 1]` are not checked.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use ferrcard_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_normalized_yxyx([0.25, 0.5, 0.75, 1.0], 200.0, 100.0);
    /// assert_eq!(bbox.min, Vec2::new(100.0, 25.0));
    /// assert_eq!(bbox.max, Vec2::new(200.0, 75.0));
    /// ```
    pub fn from_normalized_yxyx(yxyx: [f32; 4], width: f32, height: f32) -> Self {
        let scale = [height, width, height, width];
        let scaled: [f32; 4] = std::array::from_fn(|idx| yxyx[idx] * scale[idx]);

        Self::from_xyxy([scaled[1], scaled[0], scaled[3], scaled[2]])
    }

    /// Inverse of [`Bbox::from_normalized_yxyx`].
    pub fn to_normalized_yxyx(&self, width: f32, height: f32) -> [f32; 4] {
        [
            self.min.y / height,
            self.min.x / width,
            self.max.y / height,
            self.max.x / width,
        ]
    }

    pub fn to_xyxy(&self) -> [f32; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Calculates the area of the bounding box.
    ///
    /// Degenerate boxes (min beyond max on either axis) have zero area.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Calculates the area of intersection between this bounding box and another.
    ///
    /// Returns 0.0 when the boxes only touch or do not overlap.
    pub fn intersection(&self, other: &Self) -> f32 {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);

        if max.x > min.x && max.y > min.y {
            (max.x - min.x) * (max.y - min.y)
        } else {
            0.
        }
    }

    /// Overlap ratio using the smaller area as denominator.
    ///
    /// A small box fully inside a large one scores 1.0.
    ///
    /// # Formula
    /// overlap_ratio = intersection_area / min(area1, area2)
    pub fn overlap_ratio(&self, other: &Self) -> f32 {
        let intersection_area = self.intersection(other);
        let min_area = self.area().min(other.area());

        if min_area > 0.0 {
            intersection_area / min_area
        } else {
            0.0
        }
    }

    /// Clamps the bounding box coordinates to stay within the specified bounds.
    pub fn clamp(&self, min_bounds: Vec2, max_bounds: Vec2) -> Self {
        Self {
            min: self.min.max(min_bounds).min(max_bounds),
            max: self.max.min(max_bounds).max(min_bounds),
        }
    }

    /// Checks if this bounding box completely contains another bounding box.
    /// Shared edges count as contained.
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Integer crop rectangle `(x, y, width, height)` of this box inside an
    /// image of the given size, or `None` when nothing of it is left after
    /// clamping.
    pub fn crop_rect(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let clamped = self.clamp(
            Vec2::ZERO,
            Vec2::new(image_width as f32, image_height as f32),
        );

        let x = clamped.min.x.floor() as u32;
        let y = clamped.min.y.floor() as u32;
        let width = (clamped.max.x.ceil() as u32).saturating_sub(x);
        let height = (clamped.max.y.ceil() as u32).saturating_sub(y);

        if width == 0 || height == 0 {
            None
        } else {
            Some((x, y, width, height))
        }
    }
}

impl From<[f32; 4]> for Bbox {
    fn from(xyxy: [f32; 4]) -> Self {
        Self::from_xyxy(xyxy)
    }
}

impl From<Bbox> for [f32; 4] {
    fn from(bbox: Bbox) -> Self {
        bbox.to_xyxy()
    }
}
