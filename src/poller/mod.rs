
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use teloxide::types::ChatId;
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    messaging::MessagingService,
    tracker::DeploymentTracker,
    vercel::{VercelClient, VercelError},
};

/// Name of the repeating deployment-check job controlled by
/// `/start_monitor` and `/stop_monitor`.
pub const CHECK_DEPLOYMENT_JOB: &str = "check_deployment";

/// Errors from a single poll tick.
#[derive(Debug, Error)]
pub enum PollerError {
    /// The deployment listing could not be fetched.
    #[error("Failed to fetch deployments")]
    Vercel(#[from] VercelError),
}

type Result<T> = std::result::Result<T, PollerError>;

/// Reported by [`DeploymentPoller::start`] so callers can tell a fresh
/// start from a cancel-and-restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    /// No job with that name existed before.
    Started,
    /// An existing job was cancelled and replaced.
    Restarted,
}

struct MonitorJob {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodically re-queries the deployment listing as a fallback to
/// push-based webhooks and announces state changes the webhook path may
/// have missed.
///
/// Repeating jobs are registered by name; at most one job per name is
/// active at a time. The registry lock is never held across an await.
#[derive(Clone)]
pub struct DeploymentPoller {
    vercel_client: Arc<dyn VercelClient>,
    tracker: Arc<DeploymentTracker>,
    messaging_service: Arc<dyn MessagingService>,
    notify_chat_id: Option<ChatId>,
    // The interval in seconds between deployment checks.
    poll_interval: u64,
    // How many recent deployments each tick looks at.
    page_size: usize,
    jobs: Arc<Mutex<HashMap<String, MonitorJob>>>,
}

impl DeploymentPoller {
    /// Create a new DeploymentPoller.
    pub fn new(
        vercel_client: Arc<dyn VercelClient>,
        tracker: Arc<DeploymentTracker>,
        messaging_service: Arc<dyn MessagingService>,
        notify_chat_id: Option<ChatId>,
        poll_interval: u64,
        page_size: usize,
    ) -> Self {
        Self {
            vercel_client,
            tracker,
            messaging_service,
            notify_chat_id,
            poll_interval,
            page_size,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts the repeating job registered under `name`, cancelling any
    /// job already running under that name first.
    ///
    /// Must be called from the task loop so the repeating task lands there
    /// with every other job.
    pub async fn start(&self, name: &str) -> MonitorStatus {
        let previous = self.lock().remove(name);
        let restarted = previous.is_some();
        if let Some(job) = previous {
            Self::cancel(job).await;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let poller = self.clone();
        let job_name = name.to_string();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(poller.poll_interval));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match poller.tick().await {
                            Ok(sent) if sent > 0 => tracing::debug!(
                                "job {job_name}: sent {sent} deployment notification(s), last notified {:?}",
                                poller.tracker.last_notified()
                            ),
                            Ok(_) => {}
                            // A failed tick never stops the next one.
                            Err(e) => tracing::warn!("job {job_name}: poll tick failed: {e}"),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("job {job_name} stopped");
        });

        self.lock().insert(name.to_string(), MonitorJob { shutdown, handle });
        tracing::debug!("job {name} {}", if restarted { "restarted" } else { "started" });

        if restarted { MonitorStatus::Restarted } else { MonitorStatus::Started }
    }

    /// Stops the job registered under `name`. Returns whether one was
    /// running.
    pub async fn stop(&self, name: &str) -> bool {
        let removed = self.lock().remove(name);
        match removed {
            Some(job) => {
                Self::cancel(job).await;
                true
            }
            None => false,
        }
    }

    /// Stops every registered job. Used at process shutdown.
    pub async fn stop_all(&self) {
        let jobs: Vec<_> = self.lock().drain().collect();
        for (name, job) in jobs {
            tracing::debug!("stopping job {name}");
            Self::cancel(job).await;
        }
    }

    /// Whether a job with this name is currently registered.
    pub fn is_running(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Number of registered repeating jobs.
    pub fn active_jobs(&self) -> usize {
        self.lock().len()
    }

    // An in-flight tick runs to completion; the signal is observed before
    // the next tick fires.
    async fn cancel(job: MonitorJob) {
        let _ = job.shutdown.send(true);
        if let Err(e) = job.handle.await {
            tracing::warn!("monitor job did not shut down cleanly: {e}");
        }
    }

    /// One poll pass: fetch recent deployments, claim the ones not yet
    /// announced, send a message per claim. Returns how many were sent.
    pub(crate) async fn tick(&self) -> Result<usize> {
        let Some(chat_id) = self.notify_chat_id else {
            tracing::error!("TELEGRAM_CHAT_ID is not configured; skipping deployment check");
            return Ok(0);
        };

        let deployments = self.vercel_client.recent_deployments(self.page_size).await?;
        tracing::debug!("poll tick fetched {} deployment(s)", deployments.len());

        let mut sent = 0;
        for record in deployments {
            if !self.tracker.claim(&record) {
                continue;
            }
            match self.messaging_service.send_deployment_msg(chat_id, &record).await {
                Ok(()) => sent += 1,
                // One failed send must not abort the rest of the page.
                Err(e) => tracing::error!(
                    "failed to send notification for deployment {}: {e:?}",
                    record.id
                ),
            }
        }

        Ok(sent)
    }

    // The registry lock guards plain map operations only; a poisoning
    // panic cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, MonitorJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
