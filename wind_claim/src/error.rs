// THEORY:
// Error types for the claim pipeline, split by how far they travel:
//
// 1.  **Per-photo**: `FetchError`, a failed quality check, and `LabelError`
//     under the discard policy are absorbed into the discard ledger and never
//     leave the pipeline.
// 2.  **Per-claim**: only `ClaimError` crosses the public API. Each variant
//     has an `ErrorClass` and a stable code for the error envelope.

use thiserror::Error;

/// Failure to obtain decoded pixels for one photo.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported image location: {0}")]
    UnsupportedLocation(String),
}

/// Failure of the vision-label service for one photo.
#[derive(Error, Debug)]
pub enum LabelError {
    #[error("label service failed for {url}: {reason}")]
    Service { url: String, reason: String },
}

/// A claim request that cannot be processed as submitted.
#[derive(Error, Debug, PartialEq)]
pub enum RequestError {
    #[error("claim_id must not be blank")]
    BlankClaimId,

    #[error("a claim needs at least one image")]
    NoImages,
}

/// Who is at fault for a failed claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The submitted photos or request cannot produce an assessment.
    ClientInput,
    /// A collaborator or the pipeline itself failed.
    Internal,
}

/// Claim-fatal failures.
#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("all {total} images for claim {claim_id} were discarded as low quality")]
    AllImagesDiscarded { claim_id: String, total: usize },

    #[error("invalid claim request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error(transparent)]
    LabelService(#[from] LabelError),

    #[error("scoring pool failure: {0}")]
    WorkerPool(String),

    #[error("pixels for {source_url} were released before labeling")]
    PixelsReleased { source_url: String },
}

impl ClaimError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ClaimError::AllImagesDiscarded { .. } | ClaimError::InvalidRequest(_) => ErrorClass::ClientInput,
            ClaimError::LabelService(_) | ClaimError::WorkerPool(_) | ClaimError::PixelsReleased { .. } => {
                ErrorClass::Internal
            }
        }
    }

    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ClaimError::AllImagesDiscarded { .. } => "all_images_discarded",
            ClaimError::InvalidRequest(_) => "invalid_request",
            ClaimError::LabelService(_) => "label_service_error",
            ClaimError::WorkerPool(_) | ClaimError::PixelsReleased { .. } => "internal_error",
        }
    }
}
