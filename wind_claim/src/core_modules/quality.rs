// THEORY:
// The quality assessor is the first gate of the claim pipeline. It looks at a
// single decoded photo in isolation and answers two questions: is it sharp
// enough, and is it bright enough, to be worth sending to the vision service?
//
// 1.  **Blur proxy**: the variance of the edge-filtered grayscale frame. Sharp
//     photos have strong, varied edges and therefore a high variance.
// 2.  **Brightness proxy**: the mean grayscale intensity.
// 3.  **Score**: a [0, 1] weight that blends both proxies (60% sharpness, 40%
//     brightness). The score is computed for every photo but is only consumed
//     for photos that pass both checks.
//
// Assessment is a pure function of the pixel data.

use crate::core_modules::gray_frame::GrayFrame;
use crate::core_modules::utils::numeric::round_to;
use image::RgbImage;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;
pub const STRICT_BRIGHTNESS_THRESHOLD: f64 = 30.0;
pub const LENIENT_BRIGHTNESS_THRESHOLD: f64 = 5.0;

const BLUR_WEIGHT: f64 = 0.6;
const BRIGHTNESS_WEIGHT: f64 = 0.4;
const BLUR_SATURATION_FACTOR: f64 = 4.0;

/// Tunable cut-offs for the two quality checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Minimum edge-map variance for a photo to count as sharp.
    pub blur: f64,
    /// Minimum mean intensity (0-255) for a photo to count as exposed.
    pub brightness: f64,
}

impl QualityThresholds {
    /// Profile for daylight exterior photos.
    pub fn strict() -> Self {
        Self {
            blur: DEFAULT_BLUR_THRESHOLD,
            brightness: STRICT_BRIGHTNESS_THRESHOLD,
        }
    }

    /// Profile that tolerates dusk and interior shots.
    pub fn lenient() -> Self {
        Self {
            blur: DEFAULT_BLUR_THRESHOLD,
            brightness: LENIENT_BRIGHTNESS_THRESHOLD,
        }
    }
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self::strict()
    }
}

/// The measurements behind a single keep/discard decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityReport {
    /// Variance of the edge-filtered frame. Higher is sharper.
    pub blur: f64,
    /// Mean grayscale intensity.
    pub brightness: f64,
    pub blur_ok: bool,
    pub brightness_ok: bool,
    /// Quality weight in [0, 1], rounded to 3 decimals.
    pub score: f64,
}

impl QualityReport {
    pub fn keep(&self) -> bool {
        self.blur_ok && self.brightness_ok
    }

    /// The `(keep, score)` pair consumed by the pipeline.
    pub fn verdict(&self) -> (bool, f64) {
        (self.keep(), self.score)
    }

    /// Short human-readable reason for a failed check, if any.
    pub fn failure_reason(&self) -> Option<&'static str> {
        match (self.blur_ok, self.brightness_ok) {
            (true, true) => None,
            (false, true) => Some("too blurry"),
            (true, false) => Some("too dark"),
            (false, false) => Some("too blurry and too dark"),
        }
    }
}

/// Scores a decoded photo against the given thresholds.
pub fn assess(image: &RgbImage, thresholds: &QualityThresholds) -> QualityReport {
    let gray = GrayFrame::from_rgb(image);
    let blur = gray.find_edges().variance();
    let brightness = gray.mean();

    let blur_score = if thresholds.blur > 0.0 {
        (blur / (BLUR_SATURATION_FACTOR * thresholds.blur)).min(1.0)
    } else {
        1.0
    };
    let brightness_score = (brightness / 255.0).min(1.0);
    let score = round_to(BLUR_WEIGHT * blur_score + BRIGHTNESS_WEIGHT * brightness_score, 3);

    QualityReport {
        blur,
        brightness,
        blur_ok: blur >= thresholds.blur,
        brightness_ok: brightness >= thresholds.brightness,
        score,
    }
}
