use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use wind_claim::core_modules::cluster::{self, ClusterMode};
use wind_claim::core_modules::damage_label::{Area, VisionLabel};
use wind_claim::core_modules::fingerprint::Fingerprint;
use wind_claim::core_modules::image_record::ImageRecord;
use wind_claim::core_modules::utils::image_helper::{encode_png, uniform};
use wind_claim::core_modules::utils::numeric::round_to;
use wind_claim::response::LossType;
use wind_claim::{
    ClaimError, ClaimPipeline, ClaimRequest, ErrorClass, ErrorEnvelope, FileFetcher, HttpFetcher, PipelineConfig,
    RequestError, RoutingFetcher, StaticLabelSource,
};

/// Deterministic noise frame: sharp, mid-bright, and with a fingerprint of its own per seed.
fn noise(seed: u64, width: u32, height: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    RgbImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let v = (state >> 56) as u8;
        image::Rgb([v, v, v])
    })
}

fn write(dir: &Path, name: &str, frame: &RgbImage) {
    let bytes = encode_png(frame).expect("Error encoding PNG.");
    std::fs::write(dir.join(name), bytes).expect("Error writing PNG.");
}

fn pipeline(dir: &Path, labels: StaticLabelSource) -> ClaimPipeline<RoutingFetcher, StaticLabelSource> {
    let http = HttpFetcher::with_default_timeout().expect("Error building HTTP client.");
    let fetcher = RoutingFetcher::new(http, FileFetcher::with_root(dir));
    let config = PipelineConfig {
        scoring_workers: 2,
        ..PipelineConfig::default()
    };
    ClaimPipeline::new(Arc::new(fetcher), Arc::new(labels), config)
}

fn request(claim_id: &str, images: &[&str]) -> ClaimRequest {
    ClaimRequest {
        claim_id: claim_id.to_string(),
        loss_type: LossType::Wind,
        images: images.iter().map(|s| s.to_string()).collect(),
    }
}

fn claim_labels() -> StaticLabelSource {
    let mut labels = StaticLabelSource::default();
    labels.insert(
        "roof_a.png",
        vec![VisionLabel::new("Roof", 95.0), VisionLabel::new("Roof Damage", 85.0)],
    );
    labels.insert(
        "roof_b.png",
        vec![VisionLabel::new("Shingle", 80.0), VisionLabel::new("Damage", 45.0)],
    );
    labels.insert("siding.png", vec![VisionLabel::new("Wall", 70.0)]);
    labels
}

fn write_claim_photos(dir: &Path) {
    let roof_a = noise(1, 48, 48);
    write(dir, "roof_a.png", &roof_a);
    write(dir, "roof_a_copy.png", &roof_a);
    write(dir, "roof_b.png", &noise(2, 48, 48));
    write(dir, "siding.png", &noise(3, 48, 48));
    write(dir, "dark.png", &uniform(48, 48, 10));
}

const CLAIM_IMAGES: [&str; 7] = [
    "roof_a.png",
    "roof_b.png",
    "dark.png",
    "roof_a_copy.png",
    "siding.png",
    "missing.png",
    "ftp://example.com/x.jpg",
];

#[tokio::test]
async fn claim_from_local_photos() {
    let dir = tempfile::tempdir().expect("Error creating temp dir.");
    write_claim_photos(dir.path());
    let pipeline = pipeline(dir.path(), claim_labels());

    let summary = pipeline
        .run("CLM-1001", &CLAIM_IMAGES.map(String::from))
        .await
        .expect("claim succeeds");

    // --- Counts ---
    let counts = summary.source_images;
    assert_eq!(counts.total, 7);
    assert_eq!(counts.discarded_low_quality, 3);
    assert_eq!(counts.clusters, 3);
    assert_eq!(counts.analyzed, 3);
    assert!(counts.analyzed + counts.discarded_low_quality <= counts.total);

    // --- Dedup ---
    let twins = summary
        .clusters
        .iter()
        .find(|c| c.len() == 2)
        .expect("the copied photo shares a cluster with its source");
    assert_eq!(twins.representative().source_url, "roof_a.png");

    // --- Areas ---
    assert_eq!(summary.areas.len(), 1);
    let roof = &summary.areas[0];
    assert_eq!(roof.area, Area::Roof);
    assert_eq!(roof.count(), 2);
    assert_eq!(roof.avg_severity, 3.0);
    assert!(roof.damage_confirmed);
    let sharpest = roof
        .contributing
        .iter()
        .max_by(|a, b| a.quality_score.total_cmp(&b.quality_score).then_with(|| a.source_url.cmp(&b.source_url)))
        .expect("roof has contributors");
    assert_eq!(roof.representative_image, sharpest.source_url);

    // --- Overall severity includes the undamaged siding photo ---
    let quality_of = |url: &str| {
        summary
            .clusters
            .iter()
            .map(|c| c.representative())
            .find(|m| m.source_url == url)
            .map(|m| m.quality_score)
            .expect("representative present")
    };
    let (qa, qb, qs) = (quality_of("roof_a.png"), quality_of("roof_b.png"), quality_of("siding.png"));
    let expected = round_to((4.0 * qa + 2.0 * qb) / (qa + qb + qs), 2);
    assert_eq!(summary.overall_damage_severity, expected);
    assert_eq!(summary.confidence, 1.0);
}

#[tokio::test]
async fn response_document_shape() {
    let dir = tempfile::tempdir().expect("Error creating temp dir.");
    write_claim_photos(dir.path());
    let pipeline = pipeline(dir.path(), claim_labels());

    let response = pipeline
        .process(&request("CLM-1002", &CLAIM_IMAGES))
        .await
        .expect("claim succeeds");
    let json = serde_json::to_value(&response).expect("serializable");

    assert_eq!(json["claim_id"], "CLM-1002");
    assert_eq!(json["source_images"]["total"], 7);
    assert_eq!(json["source_images"]["clusters"], 3);
    assert_eq!(json["areas"][0]["area"], "roof");
    assert_eq!(json["areas"][0]["primary_peril"], "wind");
    assert_eq!(json["areas"][0]["count"], 2);
    assert_eq!(json["data_gaps"], serde_json::json!(["No attic photos"]));
    assert_eq!(json["confidence"], 1.0);
    let generated_at = json["generated_at"].as_str().expect("timestamp string");
    assert!(generated_at.ends_with('Z'));
    assert!(chrono::DateTime::parse_from_rfc3339(generated_at).is_ok());
}

#[tokio::test]
async fn every_photo_rejected() {
    let dir = tempfile::tempdir().expect("Error creating temp dir.");
    write(dir.path(), "dark.png", &uniform(32, 32, 5));
    write(dir.path(), "flat.png", &uniform(32, 32, 128));
    let pipeline = pipeline(dir.path(), StaticLabelSource::default());

    let err = pipeline
        .process(&request("CLM-1003", &["dark.png", "flat.png", "nowhere.png"]))
        .await
        .expect_err("claim must fail");
    assert!(matches!(err, ClaimError::AllImagesDiscarded { total: 3, .. }));
    assert_eq!(err.class(), ErrorClass::ClientInput);

    let envelope = ErrorEnvelope::from_claim_error(&err, "corr-1003");
    assert_eq!(envelope.code, "all_images_discarded");
}

#[tokio::test]
async fn invalid_requests_are_refused_before_fetching() {
    let dir = tempfile::tempdir().expect("Error creating temp dir.");
    let pipeline = pipeline(dir.path(), StaticLabelSource::default());

    let err = pipeline
        .process(&request("CLM-1004", &[]))
        .await
        .expect_err("empty image list is invalid");
    assert!(matches!(err, ClaimError::InvalidRequest(RequestError::NoImages)));
    assert_eq!(err.class(), ErrorClass::ClientInput);

    let err = pipeline
        .process(&request("", &["a.png"]))
        .await
        .expect_err("blank claim id is invalid");
    assert!(matches!(err, ClaimError::InvalidRequest(RequestError::BlankClaimId)));
}

#[test]
fn identical_fingerprints_keep_the_sharper_photo() {
    let fingerprint = Fingerprint::from_words([7, 0, 0, 1]);
    let records = vec![
        ImageRecord::summarised("soft.jpg", 0.3, fingerprint),
        ImageRecord::summarised("sharp.jpg", 0.8, fingerprint),
    ];

    let out = cluster::cluster(records, ClusterMode::Exact);
    assert_eq!(out.clusters.len(), 1);
    assert_eq!(out.representatives.len(), 1);
    assert_eq!(out.representatives[0].source_url, "sharp.jpg");
    assert_eq!(out.clusters[0].representative().quality_score, 0.8);
}
