// THEORY:
// An `ImageRecord` is one submitted photo as it travels through the claim
// pipeline. It is created when a fetched photo decodes successfully and then
// picks up state stage by stage:
//
// 1.  **Quality**: the assessor's score is assigned once, at construction,
//     and never changes afterwards. A photo that fails either check starts
//     life with `kept == false`.
// 2.  **Fingerprint**: computed for kept photos, ahead of clustering.
// 3.  **Elimination**: a photo that loses its cluster to a sharper twin is
//     dropped by the clusterer; only its `ClusterMember` summary survives.
// 4.  **Label**: cluster representatives receive a `DamageLabel`; attaching
//     it releases the pixel buffer, since nothing downstream reads pixels.

use crate::core_modules::damage_label::DamageLabel;
use crate::core_modules::fingerprint::{self, Fingerprint};
use crate::core_modules::quality::{self, QualityReport, QualityThresholds};
use image::RgbImage;

#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Unique key of the photo within its claim.
    pub source_url: String,
    pixels: Option<RgbImage>,
    quality_score: f64,
    kept: bool,
    fingerprint: Option<Fingerprint>,
    damage_label: Option<DamageLabel>,
}

/// A labeled photo as seen by the area aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation<'a> {
    pub source_url: &'a str,
    pub quality_score: f64,
    pub label: DamageLabel,
}

impl ImageRecord {
    /// Creates a record from a decoded photo and scores it.
    pub fn assessed(
        source_url: impl Into<String>,
        pixels: RgbImage,
        thresholds: &QualityThresholds,
    ) -> (Self, QualityReport) {
        let report = quality::assess(&pixels, thresholds);
        let record = Self {
            source_url: source_url.into(),
            pixels: Some(pixels),
            quality_score: report.score,
            kept: report.keep(),
            fingerprint: None,
            damage_label: None,
        };
        (record, report)
    }

    /// A kept record whose pixels have already been reduced to a score and a
    /// fingerprint.
    pub fn summarised(source_url: impl Into<String>, quality_score: f64, fingerprint: Fingerprint) -> Self {
        Self {
            source_url: source_url.into(),
            pixels: None,
            quality_score,
            kept: true,
            fingerprint: Some(fingerprint),
            damage_label: None,
        }
    }

    pub fn quality_score(&self) -> f64 {
        self.quality_score
    }

    pub fn is_kept(&self) -> bool {
        self.kept
    }

    pub fn pixels(&self) -> Option<&RgbImage> {
        self.pixels.as_ref()
    }

    pub fn damage_label(&self) -> Option<&DamageLabel> {
        self.damage_label.as_ref()
    }

    /// Returns the cached fingerprint, computing it from the pixels on first use.
    pub fn fingerprint(&mut self) -> Fingerprint {
        if let Some(fp) = self.fingerprint {
            return fp;
        }
        let fp = self
            .pixels
            .as_ref()
            .map(fingerprint::compute)
            .unwrap_or_default();
        self.fingerprint = Some(fp);
        fp
    }

    /// Attaches the vision verdict and releases the pixel buffer.
    pub fn attach_label(&mut self, label: DamageLabel) {
        self.damage_label = Some(label);
        self.pixels = None;
    }

    /// The aggregator's view of this record; `None` until it is labeled, and
    /// always `None` for a record that failed quality assessment.
    pub fn observation(&self) -> Option<Observation<'_>> {
        if !self.kept {
            return None;
        }
        self.damage_label.map(|label| Observation {
            source_url: &self.source_url,
            quality_score: self.quality_score,
            label,
        })
    }
}
