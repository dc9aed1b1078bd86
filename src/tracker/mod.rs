#[cfg(test)]
mod tests;

use std::{
    collections::HashMap,
    str::FromStr,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use crate::deployment::{DeployState, DeploymentRecord};

/// Which deployment states produce an outbound notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotifyPolicy {
    /// Only terminal states (Ready, Error).
    #[default]
    Terminal,
    /// Terminal states plus informational Building/Canceled messages.
    Verbose,
}

impl NotifyPolicy {
    /// Whether a deployment in `state` is worth announcing under this policy.
    pub fn covers(&self, state: DeployState) -> bool {
        match self {
            Self::Terminal => matches!(state, DeployState::Ready | DeployState::Error),
            Self::Verbose => matches!(
                state,
                DeployState::Ready | DeployState::Error | DeployState::Building | DeployState::Canceled
            ),
        }
    }
}

impl FromStr for NotifyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terminal" => Ok(Self::Terminal),
            "verbose" => Ok(Self::Verbose),
            other => Err(format!("unknown notify policy: {other}")),
        }
    }
}

#[derive(Default)]
struct Notified {
    ids: HashMap<String, Instant>,
    last_id: Option<String>,
}

/// Decides whether a deployment state change deserves a new notification.
///
/// Shared between the webhook path and the poller; all bookkeeping happens
/// under one mutex so that check-and-mark is a single critical section and
/// two racing observers of the same deployment cannot both claim it.
pub struct DeploymentTracker {
    policy: NotifyPolicy,
    retention: Duration,
    notified: Mutex<Notified>,
}

impl DeploymentTracker {
    /// Creates a tracker. Ids older than `retention` are evicted, which
    /// bounds memory for long-lived processes.
    pub fn new(policy: NotifyPolicy, retention: Duration) -> Self {
        Self { policy, retention, notified: Mutex::new(Notified::default()) }
    }

    /// Atomically checks whether `record` should be announced and, if so,
    /// marks it notified. Returns `true` exactly once per deployment id
    /// within the retention window.
    pub fn claim(&self, record: &DeploymentRecord) -> bool {
        if !self.policy.covers(record.state) {
            return false;
        }

        let mut notified = self.lock();
        let retention = self.retention;
        notified.ids.retain(|_, marked_at| marked_at.elapsed() < retention);

        if notified.ids.contains_key(&record.id) {
            return false;
        }
        notified.ids.insert(record.id.clone(), Instant::now());
        notified.last_id = Some(record.id.clone());
        true
    }

    /// Read-only variant of [`claim`](Self::claim); never marks.
    pub fn should_notify(&self, record: &DeploymentRecord) -> bool {
        self.policy.covers(record.state) && !self.lock().ids.contains_key(&record.id)
    }

    /// Marks a deployment id as already notified. Idempotent.
    pub fn mark_notified(&self, id: &str) {
        let mut notified = self.lock();
        notified.ids.entry(id.to_string()).or_insert_with(Instant::now);
        notified.last_id = Some(id.to_string());
    }

    /// Id of the most recently notified deployment, if any.
    pub fn last_notified(&self) -> Option<String> {
        self.lock().last_id.clone()
    }

    // A poisoned lock only means another thread panicked mid-update of a
    // plain map; the data is still usable.
    fn lock(&self) -> MutexGuard<'_, Notified> {
        self.notified.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
