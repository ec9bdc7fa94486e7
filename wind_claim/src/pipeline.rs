// THEORY:
// The `pipeline` module is the top-level API of the claim engine. It wires
// the stage algorithms in `core_modules` to the injected collaborators and
// turns a list of photo URLs into a `ClaimSummary`.
//
// Stages:
// 1.  **Fetch & score**: every URL is fetched (bounded, order-preserving
//     concurrency) and scored by the `ScoringPool`. Fetch failures and failed
//     quality checks are recorded in the discard ledger and both count as
//     `discarded_low_quality`.
// 2.  **Barrier**: if nothing survived, the claim fails with
//     `ClaimError::AllImagesDiscarded` and nothing else is produced.
// 3.  **Dedup**: survivors are clustered; one representative per cluster
//     moves on. Every representative counts as `analyzed`.
// 4.  **Label**: each representative is sent to the `LabelSource`. A label
//     failure either fails the claim or drops that photo, per
//     `LabelFailurePolicy`.
// 5.  **Aggregate**: labeled photos are summarised per area, and the overall
//     severity and confidence are derived.

use crate::collaborators::{ImageFetcher, LabelSource};
use crate::core_modules::area::{self, AreaResult};
use crate::core_modules::cluster::{self, Cluster, ClusterMode};
use crate::core_modules::damage_label::DamageLabel;
use crate::core_modules::image_record::ImageRecord;
use crate::core_modules::quality::{QualityReport, QualityThresholds};
use crate::error::{ClaimError, LabelError};
use crate::parallel_pipeline::{ScoreOutcome, ScoringPool};
use crate::response::{ClaimRequest, ClaimResponse};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// What to do when the vision service fails for one photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelFailurePolicy {
    /// Abort the claim with `ClaimError::LabelService`.
    #[default]
    FailClaim,
    /// Drop the photo from aggregation and carry on.
    DiscardImage,
}

/// Configuration for the ClaimPipeline, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub quality: QualityThresholds,
    pub cluster_mode: ClusterMode,
    pub label_failure_policy: LabelFailurePolicy,
    /// Maximum number of fetches (and label calls) in flight per claim.
    pub fetch_concurrency: usize,
    /// Number of scoring workers per claim.
    pub scoring_workers: usize,
    /// Static list of known gaps reported with every assessment.
    pub data_gaps: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            quality: QualityThresholds::default(),
            cluster_mode: ClusterMode::default(),
            label_failure_policy: LabelFailurePolicy::default(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            scoring_workers: num_cpus::get(),
            data_gaps: vec!["No attic photos".to_string()],
        }
    }
}

/// Why a submitted photo did not reach aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscardReason {
    /// Could not be fetched or decoded.
    Fetch(String),
    /// Failed a quality check.
    LowQuality(QualityReport),
    /// The vision service failed under `LabelFailurePolicy::DiscardImage`.
    LabelFailure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Discard {
    pub source_url: String,
    pub reason: DiscardReason,
}

/// Photo accounting for one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceImages {
    pub total: usize,
    /// Photos that survived quality filtering and deduplication.
    pub analyzed: usize,
    /// Photos dropped by fetch, decode, or quality failure.
    pub discarded_low_quality: usize,
    pub clusters: usize,
}

/// The output of one pipeline run.
#[derive(Debug, Clone)]
pub struct ClaimSummary {
    pub claim_id: String,
    pub source_images: SourceImages,
    pub areas: Vec<AreaResult>,
    /// Quality-weighted mean severity in [0, 4].
    pub overall_damage_severity: f64,
    /// Claim-level confidence in [0, 1].
    pub confidence: f64,
    pub clusters: Vec<Cluster>,
    /// Every photo that did not reach aggregation, in submission order per stage.
    pub discards: Vec<Discard>,
    /// Representatives dropped by a label failure.
    pub label_failures: usize,
}

/// Per-image result of the fetch-and-score stage.
enum ImageOutcome {
    Kept(ImageRecord),
    Discarded(Discard),
}

/// The main, top-level struct for the claim engine.
///
/// The fetcher and label source are shared handles; one pipeline can serve
/// any number of claims, concurrently or in sequence.
pub struct ClaimPipeline<F, L> {
    fetcher: Arc<F>,
    labels: Arc<L>,
    config: PipelineConfig,
}

impl<F, L> Clone for ClaimPipeline<F, L> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            labels: Arc::clone(&self.labels),
            config: self.config.clone(),
        }
    }
}

impl<F: ImageFetcher, L: LabelSource> ClaimPipeline<F, L> {
    pub fn new(fetcher: Arc<F>, labels: Arc<L>, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            labels,
            config,
        }
    }

    /// Validates a request, runs the pipeline, and assembles the response.
    pub async fn process(&self, request: &ClaimRequest) -> Result<ClaimResponse, ClaimError> {
        request.validate()?;
        let summary = self.run(&request.claim_id, &request.images).await?;
        Ok(ClaimResponse::from_summary(
            &summary,
            self.config.data_gaps.clone(),
            chrono::Utc::now(),
        ))
    }

    /// Runs every stage for one claim.
    #[instrument(skip(self, image_urls), fields(total = image_urls.len()))]
    pub async fn run(&self, claim_id: &str, image_urls: &[String]) -> Result<ClaimSummary, ClaimError> {
        let total = image_urls.len();

        // --- 1. Fetch & score ---
        let pool = ScoringPool::new(self.config.scoring_workers, self.config.quality);
        let outcomes = self.fetch_and_score(&pool, image_urls).await;
        pool.shutdown().await;

        let mut kept = Vec::new();
        let mut discards = Vec::new();
        for outcome in outcomes? {
            match outcome {
                ImageOutcome::Kept(record) => kept.push(record),
                ImageOutcome::Discarded(discard) => discards.push(discard),
            }
        }
        let discarded_low_quality = discards.len();
        info!(kept = kept.len(), discarded = discarded_low_quality, "quality stage complete");

        // --- 2. Barrier ---
        if kept.is_empty() {
            warn!("every image was discarded");
            return Err(ClaimError::AllImagesDiscarded {
                claim_id: claim_id.to_string(),
                total,
            });
        }

        // --- 3. Dedup ---
        let deduplicated = cluster::cluster(kept, self.config.cluster_mode);
        let analyzed = deduplicated.representatives.len();
        info!(
            clusters = deduplicated.clusters.len(),
            analyzed, "dedup stage complete"
        );

        // --- 4. Label ---
        let (labeled, label_discards) = self.label_all(deduplicated.representatives).await?;
        let label_failures = label_discards.len();
        discards.extend(label_discards);
        info!(labeled = labeled.len(), label_failures, "label stage complete");

        // --- 5. Aggregate ---
        let observations: Vec<_> = labeled.iter().filter_map(ImageRecord::observation).collect();
        let aggregate = area::aggregate(&observations);
        let confidence = area::confidence(&aggregate.areas);
        info!(
            areas = aggregate.areas.len(),
            overall_severity = aggregate.overall_severity,
            confidence,
            "aggregation complete"
        );

        Ok(ClaimSummary {
            claim_id: claim_id.to_string(),
            source_images: SourceImages {
                total,
                analyzed,
                discarded_low_quality,
                clusters: deduplicated.clusters.len(),
            },
            areas: aggregate.areas,
            overall_damage_severity: aggregate.overall_severity,
            confidence,
            clusters: deduplicated.clusters,
            discards,
            label_failures,
        })
    }

    async fn fetch_and_score(
        &self,
        pool: &ScoringPool,
        image_urls: &[String],
    ) -> Result<Vec<ImageOutcome>, ClaimError> {
        stream::iter(image_urls.iter().cloned())
            .map(|url| self.fetch_one(pool, url))
            .buffered(self.config.fetch_concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect()
    }

    async fn fetch_one(&self, pool: &ScoringPool, url: String) -> Result<ImageOutcome, ClaimError> {
        let pixels = match self.fetcher.fetch(&url).await {
            Ok(pixels) => pixels,
            Err(err) => {
                warn!(url = %url, error = %err, "discarding image: fetch failed");
                return Ok(ImageOutcome::Discarded(Discard {
                    source_url: url,
                    reason: DiscardReason::Fetch(err.to_string()),
                }));
            }
        };

        let outcome = match pool.score(url, pixels).await? {
            ScoreOutcome::Kept(record) => ImageOutcome::Kept(record),
            ScoreOutcome::Rejected { source_url, report } => {
                warn!(
                    url = %source_url,
                    blur = report.blur,
                    brightness = report.brightness,
                    reason = report.failure_reason().unwrap_or_default(),
                    "discarding image: low quality"
                );
                ImageOutcome::Discarded(Discard {
                    source_url,
                    reason: DiscardReason::LowQuality(report),
                })
            }
        };
        Ok(outcome)
    }

    async fn label_all(&self, representatives: Vec<ImageRecord>) -> Result<(Vec<ImageRecord>, Vec<Discard>), ClaimError> {
        let results: Vec<_> = stream::iter(representatives)
            .map(|record| self.label_one(record))
            .buffered(self.config.fetch_concurrency.max(1))
            .collect()
            .await;

        let mut labeled = Vec::with_capacity(results.len());
        let mut discards = Vec::new();
        for result in results {
            match result? {
                Labeled::Done(record) => labeled.push(record),
                Labeled::Failed(record, err) => match self.config.label_failure_policy {
                    LabelFailurePolicy::FailClaim => return Err(err.into()),
                    LabelFailurePolicy::DiscardImage => {
                        warn!(url = %record.source_url, error = %err, "discarding image: label service failed");
                        discards.push(Discard {
                            source_url: record.source_url,
                            reason: DiscardReason::LabelFailure(err.to_string()),
                        });
                    }
                },
            }
        }

        Ok((labeled, discards))
    }

    async fn label_one(&self, mut record: ImageRecord) -> Result<Labeled, ClaimError> {
        let Some(pixels) = record.pixels() else {
            return Err(ClaimError::PixelsReleased {
                source_url: record.source_url,
            });
        };
        let answer = self.labels.detect_labels(&record.source_url, pixels).await;
        match answer {
            Ok(vision_labels) => {
                debug!(url = %record.source_url, labels = ?vision_labels, "vision labels");
                record.attach_label(DamageLabel::from_labels(&vision_labels));
                Ok(Labeled::Done(record))
            }
            Err(err) => Ok(Labeled::Failed(record, err)),
        }
    }
}

/// Outcome of asking the label service about one representative.
enum Labeled {
    Done(ImageRecord),
    Failed(ImageRecord, LabelError),
}
