/// Number of values describing one detector box.
///
/// The detector emits `[ymin, xmin, ymax, xmax]` in fractional coordinates,
/// the pipeline works on `[xmin, ymin, xmax, ymax]` in pixels.
pub const BOX_SIZE: usize = 4;

/// Minimum confidence for accepting a detection.
///
/// Detections scoring below this value never become design objects. The
/// filter is uniform over every class, there is no per-class override.
/// Image regions found by the heuristic finder carry [`IMAGE_REGION_SCORE`]
/// and therefore always pass.
pub const PROBA_THRESHOLD: f32 = 0.8;

/// Confidence assigned to image regions merged from the region finder.
pub const IMAGE_REGION_SCORE: f32 = 1.0;

/// Font size band boundaries, as a ratio of mean character height to image
/// height.
///
/// The bands are open intervals between consecutive constants:
/// - (SMALL, DEFAULT): `Small`
/// - (DEFAULT, MEDIUM): `Default`
/// - (MEDIUM, LARGE): `Medium`
/// - (LARGE, EXTRALARGE): `Large`
/// - above EXTRALARGE: `ExtraLarge`
///
/// Everything else, including a ratio sitting exactly on a boundary, maps to
/// `Default`.
pub const FONT_SIZE_SMALL: f64 = 0.01;
pub const FONT_SIZE_DEFAULT: f64 = 0.02;
pub const FONT_SIZE_MEDIUM: f64 = 0.03;
pub const FONT_SIZE_LARGE: f64 = 0.04;
pub const FONT_SIZE_EXTRALARGE: f64 = 0.05;

/// Character width ratio used by the bounding box strategy when an OCR frame
/// has no usable rows.
pub const FONT_WEIGHT_BBOX_DEFAULT: f64 = 0.01;

/// Fallback weight limits of the bounding box strategy.
///
/// Only used when every textbox of an image yields the same signal.
pub const FONT_WEIGHT_BBOX_LIGHTER: f64 = 0.01;
pub const FONT_WEIGHT_BBOX_BOLDER: f64 = 0.02;

/// Fallback weight limits of the morphological strategy, in pixels of
/// average stroke thickness.
pub const FONT_WEIGHT_MORPH_LIGHTER: f64 = 2.0;
pub const FONT_WEIGHT_MORPH_BOLDER: f64 = 3.0;

/// Luminance above which a pixel is background when binarizing a text crop.
pub const BINARY_THRESHOLD: u8 = 200;

/// Decimal places of the size ratio and the bounding box weight ratio.
pub const RATIO_DECIMALS: u32 = 4;

/// Decimal places of the stroke thickness signal and of computed limits.
pub const LIMIT_DECIMALS: u32 = 2;

/// Name of the strategy used when the configuration does not pick one.
pub const DEFAULT_FONT_STRATEGY: &str = "bbox";

/// Default model name on a remote serving endpoint.
pub const SERVING_MODEL_NAME: &str = "card-detector";

/// Timeout of one remote inference call, in seconds.
pub const SERVING_TIMEOUT_SECS: u64 = 60;
