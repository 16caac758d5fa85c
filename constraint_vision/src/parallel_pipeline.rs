// THEORY:
// The `DetectionPool` runs many independent detection calls at once, e.g. when a whole
// catalogue of product templates is (re)uploaded. It is a small tokio worker pool:
//
// 1.  **Dispatcher**: One task receives jobs from callers and hands them to workers in
//     round-robin order.
// 2.  **Workers**: Each worker owns a queue. Detection is CPU-bound, so a worker moves the
//     job onto the blocking thread pool and waits for it before taking the next one.
// 3.  **Replies**: Every job carries a oneshot sender; the caller awaits the receiver.
//
// Jobs never share mutable state. The pool's settings live behind an `RwLock` and each
// job takes a copy of them when it is submitted, so replacing the settings never affects
// a job that is already queued or running.

use crate::config::{DetectionSettings, SettingsPatch};
use crate::error::{DetectionError, Result};
use crate::pipeline::{self, DetectionResult};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, warn};

struct DetectionTask {
    image_bytes: Vec<u8>,
    settings: DetectionSettings,
    result_sender: oneshot::Sender<Result<DetectionResult>>,
}

struct WorkerPool {
    task_sender: mpsc::UnboundedSender<DetectionTask>,
    worker_count: usize,
}

impl WorkerPool {
    fn new(worker_count: usize) -> Self {
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<DetectionTask>();

        // Create a single dispatcher that distributes tasks to workers
        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<DetectionTask>())
            .unzip();

        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    let _ = task.result_sender.send(Err(DetectionError::WorkerUnavailable(
                        format!("worker {worker_idx} has stopped"),
                    )));
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        for (worker_id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let DetectionTask {
                        image_bytes,
                        settings,
                        result_sender,
                    } = task;
                    let outcome = tokio::task::spawn_blocking(move || {
                        pipeline::detect_bytes(&image_bytes, &settings)
                    })
                    .await
                    .unwrap_or_else(|join_error| {
                        warn!(worker_id, %join_error, "detection job failed");
                        Err(DetectionError::WorkerUnavailable(join_error.to_string()))
                    });
                    // The caller may have given up waiting; nothing to do then.
                    let _ = result_sender.send(outcome);
                }
            });
        }

        Self {
            task_sender,
            worker_count,
        }
    }

    async fn run(&self, image_bytes: Vec<u8>, settings: DetectionSettings) -> Result<DetectionResult> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = DetectionTask {
            image_bytes,
            settings,
            result_sender,
        };

        self.task_sender.send(task).map_err(|_| {
            DetectionError::WorkerUnavailable("dispatcher has stopped".to_string())
        })?;

        result_receiver.await.map_err(|_| {
            DetectionError::WorkerUnavailable("worker dropped the job".to_string())
        })?
    }
}

/// Concurrent front end over [`pipeline::detect_bytes`].
///
/// Must be created inside a tokio runtime.
pub struct DetectionPool {
    worker_pool: WorkerPool,
    settings: Arc<RwLock<DetectionSettings>>,
}

impl DetectionPool {
    /// A pool with one worker per CPU.
    pub fn new(settings: DetectionSettings) -> Result<Self> {
        Self::with_workers(settings, num_cpus::get())
    }

    pub fn with_workers(settings: DetectionSettings, worker_count: usize) -> Result<Self> {
        settings.validate()?;
        let worker_count = worker_count.max(1);
        debug!(worker_count, "starting detection pool");
        Ok(Self {
            worker_pool: WorkerPool::new(worker_count),
            settings: Arc::new(RwLock::new(settings)),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count
    }

    /// A copy of the settings new jobs will run with.
    pub async fn settings(&self) -> DetectionSettings {
        *self.settings.read().await
    }

    /// Merges `patch` into the pool's settings. Jobs already submitted keep the settings
    /// they were submitted with.
    pub async fn replace_settings(&self, patch: &SettingsPatch) -> Result<()> {
        let mut current = self.settings.write().await;
        let updated = current.merged(patch);
        updated.validate()?;
        *current = updated;
        debug!(?patch, "detection pool settings replaced");
        Ok(())
    }

    /// Detects constraint regions in one encoded image.
    pub async fn detect(&self, image_bytes: Vec<u8>) -> Result<DetectionResult> {
        let settings = self.settings().await;
        self.worker_pool.run(image_bytes, settings).await
    }

    /// Detects every image concurrently. Results come back in input order, one per image;
    /// a failure in one image does not affect the others.
    pub async fn detect_batch(&self, images: Vec<Vec<u8>>) -> Vec<Result<DetectionResult>> {
        let settings = self.settings().await;
        debug!(images = images.len(), "submitting detection batch");
        join_all(
            images
                .into_iter()
                .map(|image_bytes| self.worker_pool.run(image_bytes, settings)),
        )
        .await
    }
}
