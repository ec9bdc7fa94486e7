use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};
use tracing_subscriber::EnvFilter;
use wind_claim::{
    ClaimPipeline, ClaimRequest, ErrorClass, ErrorEnvelope, FileFetcher, HttpFetcher, PipelineConfig,
    RoutingFetcher, StaticLabelSource,
};

struct Args {
    request: PathBuf,
    labels: Option<PathBuf>,
    config: Option<PathBuf>,
    json_logs: bool,
}

const USAGE: &str = "Usage: claim_runner <request.json> [--labels <labels.json>] [--config <config.json>] [--json-logs]";

fn parse_args() -> Option<Args> {
    let mut args = env::args().skip(1);
    let mut request = None;
    let mut labels = None;
    let mut config = None;
    let mut json_logs = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--labels" => labels = Some(PathBuf::from(args.next()?)),
            "--config" => config = Some(PathBuf::from(args.next()?)),
            "--json-logs" => json_logs = true,
            _ if request.is_none() && !arg.starts_with("--") => request = Some(PathBuf::from(arg)),
            _ => return None,
        }
    }
    Some(Args {
        request: request?,
        labels,
        config,
        json_logs,
    })
}

fn init_logging(json: bool) {
    // Logs go to stderr so stdout carries only the response document.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // --- 1. Argument Parsing & Setup ---
    let Some(args) = parse_args() else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(64));
    };
    init_logging(args.json_logs);

    let correlation_id = uuid::Uuid::new_v4().to_string();
    let text = std::fs::read_to_string(&args.request).with_context(|| format!("reading {}", args.request.display()))?;
    let request: ClaimRequest = match serde_json::from_str(&text) {
        Ok(request) => request,
        Err(err) => {
            error!(correlation_id = %correlation_id, error = %err, "malformed claim request");
            let envelope = ErrorEnvelope::new(format!("malformed claim request: {err}"), "invalid_request", correlation_id);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            return Ok(ExitCode::from(2));
        }
    };
    let config: PipelineConfig = match &args.config {
        Some(path) => read_json(path)?,
        None => PipelineConfig::default(),
    };
    let labels: StaticLabelSource = match &args.labels {
        Some(path) => read_json(path)?,
        None => StaticLabelSource::default(),
    };

    // --- 2. Collaborators ---
    // Relative image paths resolve against the request file's directory.
    let root = args
        .request
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let fetcher = RoutingFetcher::new(HttpFetcher::with_default_timeout()?, FileFetcher::with_root(root));
    let pipeline = ClaimPipeline::new(Arc::new(fetcher), Arc::new(labels), config);

    // --- 3. Run ---
    let span = info_span!("claim", claim_id = %request.claim_id, correlation_id = %correlation_id);
    let outcome = pipeline.process(&request).instrument(span).await;

    // --- 4. Report ---
    match outcome {
        Ok(response) => {
            info!(claim_id = %response.claim_id, areas = response.areas.len(), "claim assessed");
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(correlation_id = %correlation_id, error = %err, "claim failed");
            let envelope = ErrorEnvelope::from_claim_error(&err, correlation_id);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            let code = match err.class() {
                ErrorClass::ClientInput => 2,
                ErrorClass::Internal => 1,
            };
            Ok(ExitCode::from(code))
        }
    }
}
