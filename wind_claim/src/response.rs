// THEORY:
// Wire shapes consumed and produced around the pipeline. `ClaimRequest` is
// validated before any photo is fetched. `ClaimResponse` is the public view
// of a `ClaimSummary`: per-photo lists and the discard ledger stay internal.
// `ErrorEnvelope` is the single structured error a caller sees.

use crate::core_modules::area::AreaResult;
use crate::core_modules::damage_label::Area;
use crate::error::{ClaimError, RequestError};
use crate::pipeline::{ClaimSummary, SourceImages};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// The only peril this engine assesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossType {
    #[default]
    Wind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub claim_id: String,
    pub loss_type: LossType,
    pub images: Vec<String>,
}

impl ClaimRequest {
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.claim_id.trim().is_empty() {
            return Err(RequestError::BlankClaimId);
        }
        if self.images.is_empty() {
            return Err(RequestError::NoImages);
        }
        Ok(())
    }
}

/// Public view of one `AreaResult`; the per-photo contribution list stays internal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaReport {
    pub area: Area,
    pub damage_confirmed: bool,
    pub primary_peril: LossType,
    pub count: usize,
    pub avg_severity: f64,
    pub representative_image: String,
}

impl From<&AreaResult> for AreaReport {
    fn from(result: &AreaResult) -> Self {
        Self {
            area: result.area,
            damage_confirmed: result.damage_confirmed,
            primary_peril: LossType::Wind,
            count: result.count(),
            avg_severity: result.avg_severity,
            representative_image: result.representative_image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub claim_id: String,
    pub source_images: SourceImages,
    pub overall_damage_severity: f64,
    pub areas: Vec<AreaReport>,
    pub data_gaps: Vec<String>,
    pub confidence: f64,
    pub generated_at: String,
}

impl ClaimResponse {
    pub fn from_summary(summary: &ClaimSummary, data_gaps: Vec<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            claim_id: summary.claim_id.clone(),
            source_images: summary.source_images,
            overall_damage_severity: summary.overall_damage_severity,
            areas: summary.areas.iter().map(AreaReport::from).collect(),
            data_gaps,
            confidence: summary.confidence,
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// The single structured error a caller sees for a failed claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub detail: String,
    pub code: String,
    pub correlation_id: String,
}

impl ErrorEnvelope {
    pub fn new(detail: impl Into<String>, code: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: code.into(),
            correlation_id: correlation_id.into(),
        }
    }

    /// Internal failures are reported without their details.
    pub fn from_claim_error(err: &ClaimError, correlation_id: impl Into<String>) -> Self {
        let detail = match err.class() {
            crate::error::ErrorClass::ClientInput => err.to_string(),
            crate::error::ErrorClass::Internal => "internal error".to_string(),
        };
        Self::new(detail, err.code(), correlation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::area::Contribution;
    use crate::error::LabelError;
    use chrono::TimeZone;

    fn summary() -> ClaimSummary {
        ClaimSummary {
            claim_id: "C-42".into(),
            source_images: SourceImages {
                total: 5,
                analyzed: 3,
                discarded_low_quality: 1,
                clusters: 3,
            },
            areas: vec![AreaResult {
                area: Area::Roof,
                contributing: vec![
                    Contribution {
                        severity: 3,
                        quality_score: 0.9,
                        source_url: "https://img/a.jpg".into(),
                    },
                    Contribution {
                        severity: 1,
                        quality_score: 0.4,
                        source_url: "https://img/b.jpg".into(),
                    },
                ],
                damage_confirmed: true,
                avg_severity: 2.0,
                representative_image: "https://img/a.jpg".into(),
            }],
            overall_damage_severity: 1.55,
            confidence: 1.0,
            clusters: Vec::new(),
            discards: Vec::new(),
            label_failures: 0,
        }
    }

    #[test]
    fn response_hides_per_photo_lists() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).single().expect("valid time");
        let response = ClaimResponse::from_summary(&summary(), vec!["No attic photos".into()], at);
        let json = serde_json::to_value(&response).expect("serializable");

        assert_eq!(json["generated_at"], "2025-03-14T09:26:53.000000Z");
        assert_eq!(json["source_images"]["discarded_low_quality"], 1);
        let area = &json["areas"][0];
        assert_eq!(area["area"], "roof");
        assert_eq!(area["count"], 2);
        assert_eq!(area["primary_peril"], "wind");
        assert_eq!(area["representative_image"], "https://img/a.jpg");
        assert!(area.get("contributing").is_none());
    }

    #[test]
    fn request_requires_wind_and_images() {
        let ok: ClaimRequest =
            serde_json::from_str(r#"{"claim_id":"C-1","loss_type":"wind","images":["https://img/a.jpg"]}"#)
                .expect("valid request");
        assert_eq!(ok.validate(), Ok(()));

        let hail = serde_json::from_str::<ClaimRequest>(r#"{"claim_id":"C-1","loss_type":"hail","images":["a"]}"#);
        assert!(hail.is_err());

        let empty: ClaimRequest =
            serde_json::from_str(r#"{"claim_id":"C-1","loss_type":"wind","images":[]}"#).expect("parses");
        assert_eq!(empty.validate(), Err(RequestError::NoImages));

        let blank = ClaimRequest {
            claim_id: "  ".into(),
            ..ok
        };
        assert_eq!(blank.validate(), Err(RequestError::BlankClaimId));
    }

    #[test]
    fn envelope_hides_internal_details() {
        let internal = ClaimError::LabelService(LabelError::Service {
            url: "a.jpg".into(),
            reason: "secret upstream trace".into(),
        });
        let envelope = ErrorEnvelope::from_claim_error(&internal, "corr-1");
        assert_eq!(envelope.detail, "internal error");
        assert_eq!(envelope.code, "label_service_error");

        let client = ClaimError::AllImagesDiscarded {
            claim_id: "C-1".into(),
            total: 2,
        };
        let envelope = ErrorEnvelope::from_claim_error(&client, "corr-2");
        assert!(envelope.detail.contains("discarded"));
        assert_eq!(envelope.correlation_id, "corr-2");
    }
}
