// THEORY:
// The area aggregator is the final analytical layer. It takes the labeled
// representatives of every cluster and summarises them per damage location.
//
// 1.  **Bucketing**: only photos whose label reports damage contribute to an
//     area. Buckets are keyed by `Area` and appear in the order their first
//     contributing photo appears. A bucket exists only if it has at least one
//     contributor; every such bucket is reported, confirmed or not.
// 2.  **Per-area statistics**: damage is *confirmed* when any contributor has
//     severity 2 or more. The average severity is the plain mean (2 decimals)
//     and the representative is the sharpest contributor.
// 3.  **Overall severity**: the quality-weighted mean severity over every
//     labeled photo, including the undamaged ones, which add their weight to
//     the denominator with a zero severity.
// 4.  **Confidence**: `0.5` plus half the share of confirmed areas, capped at 1.

use crate::core_modules::damage_label::Area;
use crate::core_modules::image_record::Observation;
use crate::core_modules::utils::numeric::round_to;

pub const CONFIRMATION_SEVERITY: u8 = 2;
const CONFIDENCE_FLOOR: f64 = 0.5;

/// One damaged photo counted towards an area.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub severity: u8,
    pub quality_score: f64,
    pub source_url: String,
}

/// Aggregated outcome for one damage area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaResult {
    pub area: Area,
    /// Contributing photos in input order; never empty.
    pub contributing: Vec<Contribution>,
    pub damage_confirmed: bool,
    pub avg_severity: f64,
    pub representative_image: String,
}

impl AreaResult {
    fn from_contributions(area: Area, contributing: Vec<Contribution>) -> Self {
        let damage_confirmed = contributing
            .iter()
            .any(|c| c.severity >= CONFIRMATION_SEVERITY);
        let total: u32 = contributing.iter().map(|c| c.severity as u32).sum();
        let avg_severity = round_to(total as f64 / contributing.len() as f64, 2);
        let representative_image = sharpest(&contributing)
            .map(|c| c.source_url.clone())
            .unwrap_or_default();

        Self {
            area,
            contributing,
            damage_confirmed,
            avg_severity,
            representative_image,
        }
    }

    pub fn count(&self) -> usize {
        self.contributing.len()
    }
}

/// Highest quality wins; equal quality falls back to the greater URL.
fn sharpest(contributing: &[Contribution]) -> Option<&Contribution> {
    contributing.iter().max_by(|a, b| {
        a.quality_score
            .total_cmp(&b.quality_score)
            .then_with(|| a.source_url.cmp(&b.source_url))
    })
}

/// Output of the aggregator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AreaAggregate {
    pub areas: Vec<AreaResult>,
    /// Quality-weighted mean severity in [0, 4], 2 decimals.
    pub overall_severity: f64,
}

/// Summarises labeled photos per area.
pub fn aggregate(observations: &[Observation<'_>]) -> AreaAggregate {
    // --- 1. Bucketing ---
    let mut buckets: Vec<(Area, Vec<Contribution>)> = Vec::new();
    for obs in observations.iter().filter(|o| o.label.damage) {
        let contribution = Contribution {
            severity: obs.label.severity,
            quality_score: obs.quality_score,
            source_url: obs.source_url.to_string(),
        };
        match buckets.iter_mut().find(|(area, _)| *area == obs.label.area) {
            Some((_, bucket)) => bucket.push(contribution),
            None => buckets.push((obs.label.area, vec![contribution])),
        }
    }

    // --- 2. Per-area statistics ---
    let areas = buckets
        .into_iter()
        .map(|(area, contributing)| AreaResult::from_contributions(area, contributing))
        .collect();

    // --- 3. Overall severity ---
    let (weighted, weight) = observations.iter().fold((0.0, 0.0), |(num, den), obs| {
        (
            num + obs.label.severity as f64 * obs.quality_score,
            den + obs.quality_score,
        )
    });
    let overall_severity = if weight > 0.0 {
        round_to(weighted / weight, 2)
    } else {
        0.0
    };

    AreaAggregate {
        areas,
        overall_severity,
    }
}

/// Claim-level confidence in [0, 1], 2 decimals.
pub fn confidence(areas: &[AreaResult]) -> f64 {
    let confirmed = areas.iter().filter(|a| a.damage_confirmed).count();
    let share = confirmed as f64 / areas.len().max(1) as f64;
    round_to((CONFIDENCE_FLOOR + share * 0.5).min(1.0), 2)
}
