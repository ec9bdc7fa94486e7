// THEORY:
// The vision service answers with an open-ended list of `(name, confidence)`
// labels. The rest of the pipeline only ever needs three facts about a photo:
// is there damage, where on the building is it, and how bad is it. This module
// pins those three facts down in the fixed `DamageLabel` record.
//
// Derivation rules:
// - **damage**: the highest confidence among labels whose name matches the
//   damage vocabulary must reach `DAMAGE_CONFIDENCE_THRESHOLD`.
// - **area**: the first label (in service order) whose exact name appears in
//   the area lookup table; `Area::Unknown` otherwise. Resolved whether or not
//   damage was found.
// - **severity**: `min(4, floor(damage_confidence / 20))` when damage is
//   present, 0 otherwise.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub const DAMAGE_CONFIDENCE_THRESHOLD: f64 = 40.0;
pub const MAX_SEVERITY: u8 = 4;
const SEVERITY_BAND_WIDTH: f64 = 20.0;

static DAMAGE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn damage_pattern() -> &'static Regex {
    DAMAGE_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(damage|crack|broken|missing|tear|dent|roof damage|home damage)")
            .expect("damage vocabulary is a valid regex")
    })
}

/// One label as returned by the vision service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionLabel {
    pub name: String,
    /// Service confidence in percent (0-100).
    pub confidence: f64,
}

impl VisionLabel {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Canonical damage location on the insured building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Roof,
    Siding,
    Garage,
    Unknown,
}

impl Area {
    /// Maps a vision label name onto an area, if it names one.
    pub fn from_label_name(name: &str) -> Option<Area> {
        match name {
            "Roof" | "Shingle" => Some(Area::Roof),
            "Siding" | "Wall" => Some(Area::Siding),
            "Garage" | "Door" => Some(Area::Garage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Roof => "roof",
            Area::Siding => "siding",
            Area::Garage => "garage",
            Area::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three facts the aggregator needs about a labeled photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageLabel {
    pub damage: bool,
    pub area: Area,
    /// Heuristic severity band, 0..=4.
    pub severity: u8,
}

impl DamageLabel {
    pub fn from_labels(labels: &[VisionLabel]) -> Self {
        let pattern = damage_pattern();
        let damage_confidence = labels
            .iter()
            .filter(|l| pattern.is_match(&l.name))
            .map(|l| l.confidence)
            .fold(0.0_f64, f64::max);

        let damage = damage_confidence >= DAMAGE_CONFIDENCE_THRESHOLD;
        let area = labels
            .iter()
            .find_map(|l| Area::from_label_name(&l.name))
            .unwrap_or(Area::Unknown);
        let severity = if damage {
            severity_from_confidence(damage_confidence)
        } else {
            0
        };

        Self {
            damage,
            area,
            severity,
        }
    }
}

/// Maps a 0-100 confidence onto the 0..=4 severity band.
pub fn severity_from_confidence(confidence: f64) -> u8 {
    let band = (confidence.max(0.0) / SEVERITY_BAND_WIDTH).floor();
    band.min(MAX_SEVERITY as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roof_damage_is_detected() {
        let labels = vec![
            VisionLabel::new("House", 99.0),
            VisionLabel::new("Shingle", 91.0),
            VisionLabel::new("Roof Damage", 72.5),
        ];
        let label = DamageLabel::from_labels(&labels);
        assert_eq!(
            label,
            DamageLabel {
                damage: true,
                area: Area::Roof,
                severity: 3,
            }
        );
    }

    #[test]
    fn weak_damage_signal_is_ignored() {
        let labels = vec![VisionLabel::new("Crack", 39.9), VisionLabel::new("Wall", 80.0)];
        let label = DamageLabel::from_labels(&labels);
        assert!(!label.damage);
        assert_eq!(label.severity, 0);
        // Area is still resolved without damage.
        assert_eq!(label.area, Area::Siding);
    }

    #[test]
    fn damage_match_is_case_insensitive_and_takes_the_max() {
        let labels = vec![
            VisionLabel::new("broken glass", 45.0),
            VisionLabel::new("DENT", 88.0),
        ];
        let label = DamageLabel::from_labels(&labels);
        assert!(label.damage);
        assert_eq!(label.severity, 4);
        assert_eq!(label.area, Area::Unknown);
    }

    #[test]
    fn first_area_label_wins() {
        let labels = vec![
            VisionLabel::new("Door", 60.0),
            VisionLabel::new("Roof", 95.0),
        ];
        assert_eq!(DamageLabel::from_labels(&labels).area, Area::Garage);
    }

    #[test]
    fn area_lookup_is_exact() {
        assert_eq!(Area::from_label_name("roof"), None);
        assert_eq!(Area::from_label_name("Shingle"), Some(Area::Roof));
    }

    #[test]
    fn severity_bands() {
        assert_eq!(severity_from_confidence(40.0), 2);
        assert_eq!(severity_from_confidence(59.99), 2);
        assert_eq!(severity_from_confidence(60.0), 3);
        assert_eq!(severity_from_confidence(99.0), 4);
        assert_eq!(severity_from_confidence(100.0), 4);
    }

    #[test]
    fn no_labels_means_no_damage() {
        let label = DamageLabel::from_labels(&[]);
        assert_eq!(
            label,
            DamageLabel {
                damage: false,
                area: Area::Unknown,
                severity: 0,
            }
        );
    }
}
