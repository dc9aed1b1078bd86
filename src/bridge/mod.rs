
use std::{
    fmt::Display,
    sync::{Mutex, MutexGuard, mpsc as std_mpsc},
    thread,
    time::Duration,
};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors surfaced to callers of the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// `start` was called while the worker is already running.
    #[error("task loop is already running")]
    AlreadyRunning,
    /// `submit` was called before `start` or after `stop`.
    #[error("task loop is not running")]
    NotRunning,
    /// The worker thread or its runtime could not be created.
    #[error("failed to start task loop worker: {0}")]
    Spawn(#[from] std::io::Error),
    /// The submitted job completed with an error.
    #[error("job failed: {0}")]
    Job(String),
    /// The submitted job was dropped before producing a result.
    #[error("job was dropped before producing a result")]
    JobAborted,
}

type Job = BoxFuture<'static, ()>;

struct Worker {
    jobs: mpsc::UnboundedSender<Job>,
    thread: thread::JoinHandle<()>,
    done: std_mpsc::Receiver<()>,
}

/// Owns a single event-processing loop on a dedicated worker thread and
/// lets any other thread enqueue a job and block until it completes.
///
/// The worker runs a current-thread tokio runtime driving a [`LocalSet`];
/// every submitted job becomes a local task, so jobs interleave at their
/// await points while all of them stay on one logical thread of control.
/// `submit` is the only crossing point between the synchronous
/// request-handling threads and that loop.
///
/// [`LocalSet`]: tokio::task::LocalSet
pub struct TaskLoopBridge {
    worker: Mutex<Option<Worker>>,
    stop_timeout: Duration,
}

impl TaskLoopBridge {
    /// Creates a stopped bridge. `stop_timeout` bounds how long [`stop`]
    /// waits for the worker to drain.
    ///
    /// [`stop`]: Self::stop
    pub fn new(stop_timeout: Duration) -> Self {
        Self { worker: Mutex::new(None), stop_timeout }
    }

    /// Spins up the worker thread and its loop. Idempotent in the sense
    /// that a second call while running changes nothing and reports
    /// [`BridgeError::AlreadyRunning`].
    pub fn start(&self) -> Result<(), BridgeError> {
        let mut worker = self.lock();
        if worker.is_some() {
            return Err(BridgeError::AlreadyRunning);
        }

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let (jobs_tx, mut jobs_rx) = mpsc::unbounded_channel::<Job>();
        let (done_tx, done_rx) = std_mpsc::channel();

        let thread = thread::Builder::new().name("task-loop".into()).spawn(move || {
            let local = tokio::task::LocalSet::new();
            runtime.block_on(async {
                local
                    .run_until(async {
                        while let Some(job) = jobs_rx.recv().await {
                            tokio::task::spawn_local(job);
                        }
                    })
                    .await;
                // Queue closed; let jobs already in flight finish.
                local.await;
            });
            tracing::debug!("task loop drained and exiting");
            let _ = done_tx.send(());
        })?;

        *worker = Some(Worker { jobs: jobs_tx, thread, done: done_rx });
        tracing::debug!("task loop started");
        Ok(())
    }

    /// Schedules `job` on the worker loop and blocks the calling thread
    /// until it completes, returning its result. A failure inside the job
    /// is captured and handed back as [`BridgeError::Job`]; it never tears
    /// down the loop.
    ///
    /// Must be called from a thread that is neither the worker itself nor
    /// inside an async runtime (use `spawn_blocking` there).
    pub fn submit<F, T, E>(&self, job: F) -> Result<T, BridgeError>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let jobs = self
            .lock()
            .as_ref()
            .map(|worker| worker.jobs.clone())
            .ok_or(BridgeError::NotRunning)?;

        let (result_tx, result_rx) = oneshot::channel();
        let wrapped: Job = Box::pin(async move {
            let result = job.await.map_err(|e| BridgeError::Job(e.to_string()));
            // The submitter may have given up waiting; nothing left to do.
            let _ = result_tx.send(result);
        });

        jobs.send(wrapped).map_err(|_| BridgeError::NotRunning)?;
        // Drop the sender clone before parking, so a concurrent stop() can
        // close the queue without waiting on blocked submitters.
        drop(jobs);
        result_rx.blocking_recv().unwrap_or_else(|_| Err(BridgeError::JobAborted))
    }

    /// Signals the worker to drain and exit, then waits for the thread to
    /// terminate. Returns `false` when the timeout elapsed and the worker
    /// was left behind (logged, non-fatal).
    pub fn stop(&self) -> bool {
        let Some(worker) = self.lock().take() else {
            tracing::debug!("task loop is not running; nothing to stop");
            return true;
        };

        // Closing the queue ends the accept loop; queued jobs still run.
        drop(worker.jobs);

        match worker.done.recv_timeout(self.stop_timeout) {
            Ok(()) => {
                let _ = worker.thread.join();
                tracing::debug!("task loop stopped");
                true
            }
            Err(_) => {
                tracing::warn!(
                    "task loop did not drain within {:?}; leaving worker thread detached",
                    self.stop_timeout
                );
                false
            }
        }
    }

    /// Whether the worker loop is currently running.
    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    // A poisoned lock here means a panic while swapping the worker handle;
    // the Option itself is still coherent.
    fn lock(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
