// THEORY:
// This file is the main entry point for the `wind_claim` library crate.
// It exposes the `ClaimPipeline` and its associated data structures
// (`PipelineConfig`, `ClaimSummary`, `ClaimResponse`, etc.) as the high-level
// interface for turning a set of claim photos into a per-area damage assessment.
//
// The stage algorithms live in `core_modules`:
// 1.  `quality` scores a single decoded photo for sharpness and brightness.
// 2.  `fingerprint` and `cluster` collapse near-identical photos into clusters.
// 3.  `damage_label` turns raw vision labels into a fixed `DamageLabel` record.
// 4.  `area` aggregates labeled photos into per-area statistics.
//
// The pipeline talks to the outside world only through the `collaborators`
// traits (`ImageFetcher`, `LabelSource`), which are injected at construction.

pub mod collaborators;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod response;

pub use collaborators::{FileFetcher, HttpFetcher, ImageFetcher, LabelSource, RoutingFetcher, StaticLabelSource};
pub use error::{ClaimError, ErrorClass, FetchError, LabelError, RequestError};
pub use pipeline::{ClaimPipeline, ClaimSummary, LabelFailurePolicy, PipelineConfig};
pub use response::{ClaimRequest, ClaimResponse, ErrorEnvelope};
