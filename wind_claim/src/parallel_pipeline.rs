use crate::core_modules::image_record::ImageRecord;
use crate::core_modules::quality::{QualityReport, QualityThresholds};
use crate::error::ClaimError;
use image::RgbImage;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Result of scoring one decoded photo.
#[derive(Debug)]
pub enum ScoreOutcome {
    /// Passed both quality checks; the fingerprint is already cached.
    Kept(ImageRecord),
    /// Failed at least one quality check.
    Rejected { source_url: String, report: QualityReport },
}

pub struct ScoreTask {
    pub source_url: String,
    pub pixels: RgbImage,
    pub result_sender: oneshot::Sender<ScoreOutcome>,
}

/// A fixed set of scoring workers fed round-robin by a dispatcher task.
///
/// Each worker hands the CPU-bound part (quality assessment and
/// fingerprinting) to the blocking thread pool, so at most `worker_count`
/// photos are being scored at once. Dropping the pool closes the task
/// channel, which winds down the dispatcher and then every worker.
pub struct ScoringPool {
    task_sender: mpsc::UnboundedSender<ScoreTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl ScoringPool {
    /// Must be called from within a tokio runtime.
    pub fn new(worker_count: usize, thresholds: QualityThresholds) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<ScoreTask>();
        let mut workers = Vec::with_capacity(worker_count + 1);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<ScoreTask>())
            .unzip();

        // Dispatcher
        workers.push(tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                // A worker only disappears if it panicked; the caller sees the
                // dropped oneshot as a pool failure.
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_count;
            }
        }));

        for (worker_id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let ScoreTask {
                        source_url,
                        pixels,
                        result_sender,
                    } = task;
                    debug!(worker_id, url = %source_url, "scoring image");

                    let scored = tokio::task::spawn_blocking(move || score_image(source_url, pixels, &thresholds)).await;
                    if let Ok(outcome) = scored {
                        let _ = result_sender.send(outcome);
                    }
                }
            }));
        }

        Self { task_sender, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len() - 1
    }

    /// Queues one photo and waits for its outcome.
    pub async fn score(&self, source_url: String, pixels: RgbImage) -> Result<ScoreOutcome, ClaimError> {
        let (result_sender, result_receiver) = oneshot::channel();
        let task = ScoreTask {
            source_url,
            pixels,
            result_sender,
        };

        self.task_sender
            .send(task)
            .map_err(|_| ClaimError::WorkerPool("failed to send task to scoring pool".into()))?;

        result_receiver
            .await
            .map_err(|_| ClaimError::WorkerPool("scoring worker dropped its task".into()))
    }

    /// Closes the pool and waits for every worker to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Assesses one photo and, when it is kept, caches its fingerprint.
pub fn score_image(source_url: String, pixels: RgbImage, thresholds: &QualityThresholds) -> ScoreOutcome {
    let (mut record, report) = ImageRecord::assessed(source_url, pixels, thresholds);
    if record.is_kept() {
        record.fingerprint();
        ScoreOutcome::Kept(record)
    } else {
        ScoreOutcome::Rejected {
            source_url: record.source_url,
            report,
        }
    }
}
