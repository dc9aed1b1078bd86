use std::{
    sync::{Arc, Barrier},
    thread,
};

use super::*;

const RETENTION: Duration = Duration::from_secs(3600);

fn ready_record(id: &str) -> DeploymentRecord {
    DeploymentRecord { id: id.to_string(), state: DeployState::Ready, ..Default::default() }
}

#[test]
fn test_claim_returns_true_exactly_once() {
    let tracker = DeploymentTracker::new(NotifyPolicy::Terminal, RETENTION);
    let record = ready_record("dpl_1");

    assert!(tracker.claim(&record));
    assert!(!tracker.claim(&record));
    assert!(!tracker.should_notify(&record));
}

#[test]
fn test_mark_notified_is_idempotent() {
    let tracker = DeploymentTracker::new(NotifyPolicy::Terminal, RETENTION);
    let record = ready_record("dpl_2");

    tracker.mark_notified(&record.id);
    tracker.mark_notified(&record.id);

    assert!(!tracker.should_notify(&record));
    assert!(!tracker.claim(&record));
}

#[test]
fn test_should_notify_does_not_mark() {
    let tracker = DeploymentTracker::new(NotifyPolicy::Terminal, RETENTION);
    let record = ready_record("dpl_3");

    assert!(tracker.should_notify(&record));
    assert!(tracker.should_notify(&record));
    assert!(tracker.claim(&record));
}

#[test]
fn test_terminal_policy_filters_informational_states() {
    let tracker = DeploymentTracker::new(NotifyPolicy::Terminal, RETENTION);

    for state in [DeployState::Queued, DeployState::Building, DeployState::Canceled, DeployState::Unknown] {
        let record = DeploymentRecord {
            id: format!("dpl_{state:?}"),
            state,
            ..Default::default()
        };
        assert!(!tracker.claim(&record), "{state:?} should be filtered");
    }

    let error = DeploymentRecord { id: "dpl_err".into(), state: DeployState::Error, ..Default::default() };
    assert!(tracker.claim(&error));
}

#[test]
fn test_verbose_policy_surfaces_building_and_canceled() {
    let tracker = DeploymentTracker::new(NotifyPolicy::Verbose, RETENTION);

    let building =
        DeploymentRecord { id: "dpl_b".into(), state: DeployState::Building, ..Default::default() };
    let canceled =
        DeploymentRecord { id: "dpl_c".into(), state: DeployState::Canceled, ..Default::default() };
    let queued =
        DeploymentRecord { id: "dpl_q".into(), state: DeployState::Queued, ..Default::default() };

    assert!(tracker.claim(&building));
    assert!(tracker.claim(&canceled));
    assert!(!tracker.claim(&queued));
}

// Two observers (webhook path and poller) racing on the same deployment id
// must produce exactly one notification.
#[test]
fn test_concurrent_claims_have_a_single_winner() {
    let tracker = Arc::new(DeploymentTracker::new(NotifyPolicy::Terminal, RETENTION));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let record = ready_record("dpl_contended");
                barrier.wait();
                tracker.claim(&record)
            })
        })
        .collect();

    let wins: usize =
        handles.into_iter().map(|h| h.join().unwrap()).filter(|won| *won).count();

    assert_eq!(wins, 1);
}

#[test]
fn test_expired_ids_are_evicted() {
    let tracker = DeploymentTracker::new(NotifyPolicy::Terminal, Duration::from_millis(0));
    let record = ready_record("dpl_old");

    assert!(tracker.claim(&record));
    thread::sleep(Duration::from_millis(5));
    // The earlier claim has aged out, so the id is considered new again.
    assert!(tracker.claim(&record));
}

#[test]
fn test_last_notified_tracks_most_recent_claim() {
    let tracker = DeploymentTracker::new(NotifyPolicy::Terminal, RETENTION);

    assert_eq!(tracker.last_notified(), None);
    tracker.claim(&ready_record("dpl_first"));
    tracker.claim(&ready_record("dpl_second"));

    assert_eq!(tracker.last_notified(), Some("dpl_second".to_string()));
}
