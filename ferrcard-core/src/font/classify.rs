use tracing::*;

use crate::{
    config::FontSizeBands,
    consts::LIMIT_DECIMALS,
    font::round_to,
    layout::element::{DesignObject, FontSize, FontWeight},
};

/// Decision boundaries of the weight classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightLimits {
    /// Signals strictly below are `Lighter`.
    pub light: f64,
    /// Signals at or above are `Bolder`.
    pub bold: f64,
}

impl WeightLimits {
    pub fn new(light: f64, bold: f64) -> Self {
        Self { light, bold }
    }

    /// Adaptive limits one population standard deviation around the mean.
    ///
    /// Falls back to `defaults` when the signals hold fewer than two distinct
    /// values, a zero-width band would leave nothing labelled `Default`.
    pub fn from_signals(signals: &[f64], defaults: WeightLimits) -> Self {
        if distinct_count(signals) <= 1 {
            return defaults;
        }

        let count = signals.len() as f64;
        let mean = signals.iter().sum::<f64>() / count;
        let variance = signals
            .iter()
            .map(|signal| (signal - mean).powi(2))
            .sum::<f64>()
            / count;
        let std = variance.sqrt();

        Self {
            light: round_to(mean - std, LIMIT_DECIMALS),
            bold: round_to(mean + std, LIMIT_DECIMALS),
        }
    }

    pub fn label(&self, signal: f64) -> FontWeight {
        if signal < self.light {
            FontWeight::Lighter
        } else if signal >= self.bold {
            FontWeight::Bolder
        } else {
            FontWeight::Default
        }
    }
}

fn distinct_count(signals: &[f64]) -> usize {
    let mut sorted = signals.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// Labels the weight of every textbox in one batch.
///
/// The limits depend on all textbox signals of this image. Textboxes without
/// a signal are labelled `Default`, other objects are left untouched.
/// Returns the limits that were applied.
pub fn classify_weights(objects: &mut [DesignObject], defaults: WeightLimits) -> WeightLimits {
    let measured: Vec<(usize, f64)> = objects
        .iter()
        .enumerate()
        .filter(|(_, object)| object.is_textbox())
        .filter_map(|(idx, object)| object.weight_signal.map(|signal| (idx, signal)))
        .collect();

    let signals: Vec<f64> = measured.iter().map(|(_, signal)| *signal).collect();
    let limits = WeightLimits::from_signals(&signals, defaults);
    debug!(
        textboxes = signals.len(),
        light = limits.light,
        bold = limits.bold,
        "weight limits"
    );

    for object in objects.iter_mut().filter(|object| object.is_textbox()) {
        object.weight = Some(FontWeight::Default);
    }
    for (idx, signal) in measured {
        objects[idx].weight = Some(limits.label(signal));
    }

    limits
}

/// Maps a height ratio onto the five size bands.
///
/// Each band is an open interval, a ratio on a boundary or not above
/// `small` is `Default`.
pub fn classify_size(ratio: f64, bands: &FontSizeBands) -> FontSize {
    if bands.small < ratio && ratio < bands.default {
        FontSize::Small
    } else if bands.default < ratio && ratio < bands.medium {
        FontSize::Default
    } else if bands.medium < ratio && ratio < bands.large {
        FontSize::Medium
    } else if bands.large < ratio && ratio < bands.extralarge {
        FontSize::Large
    } else if bands.extralarge < ratio {
        FontSize::ExtraLarge
    } else {
        FontSize::Default
    }
}
