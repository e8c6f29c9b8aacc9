//! Deterministic per-date color assignment
//!
//! Every date bucket in the schedule gets its own badge color so adjacent
//! days are easy to tell apart in the panel and in the 3D view. The mapping
//! is a pure function of the distinct date set: the dates are sorted, then a
//! hue accumulator is advanced by the fractional part of the golden ratio
//! per date. The low-discrepancy stepping keeps hues spread out no matter
//! how many dates are in view.
//!
//! Adding a date may recolor dates that sort after it; the palette is
//! recomputed from scratch on every call rather than kept incrementally.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Fractional part of the golden ratio, the per-date hue step
const GOLDEN_RATIO_FRACT: f64 = 0.618_033_988_749_895;

/// Badge saturation, fixed across the palette
const SATURATION: f64 = 0.70;

/// Badge lightness, fixed across the palette
const LIGHTNESS: f64 = 0.50;

/// One RGB color, channels 0-255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    /// CSS `rgb(...)` representation
    pub fn css(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Assign a color to every distinct date
///
/// The result depends only on the distinct-value set of the input; duplicate
/// dates and input ordering have no effect.
pub fn date_palette<I>(dates: I) -> BTreeMap<NaiveDate, Rgb>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let distinct: BTreeSet<NaiveDate> = dates.into_iter().collect();

    let mut hue_acc = 0.0_f64;
    let mut palette = BTreeMap::new();
    for date in distinct {
        hue_acc = (hue_acc + GOLDEN_RATIO_FRACT).fract();
        let color = hsl_to_rgb(hue_acc * 360.0, SATURATION, LIGHTNESS);
        palette.insert(date, color);
    }
    palette
}

/// Text color legible against the given background
///
/// Perceptual luminance `(0.299 R + 0.587 G + 0.114 B) / 255`: black text on
/// light backgrounds, white on dark.
pub fn contrast_text(background: Rgb) -> Rgb {
    let luminance = (0.299 * background.r as f64
        + 0.587 * background.g as f64
        + 0.114 * background.b as f64)
        / 255.0;
    if luminance > 0.5 {
        Rgb::BLACK
    } else {
        Rgb::WHITE
    }
}

/// Standard six-sector HSL to RGB conversion
///
/// `hue` in degrees, `saturation` and `lightness` in [0, 1].
fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgb {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = chroma * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - chroma / 2.0;

    let (r1, g1, b1) = match hue {
        h if h < 60.0 => (chroma, x, 0.0),
        h if h < 120.0 => (x, chroma, 0.0),
        h if h < 180.0 => (0.0, chroma, x),
        h if h < 240.0 => (0.0, x, chroma),
        h if h < 300.0 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    Rgb {
        r: ((r1 + m) * 255.0).round() as u8,
        g: ((g1 + m) * 255.0).round() as u8,
        b: ((b1 + m) * 255.0).round() as u8,
    }
}
