use sync_fifo::Backoff;

// Snoozing escalates through the spin range, then the yield range, and only
// then reports that blocking is worthwhile. The threshold sits exactly at
// eleven snoozes from a fresh state.
#[test]
fn test_snooze_escalation() {
    let backoff = Backoff::new();

    for _ in 0..10 {
        backoff.snooze();
        assert!(!backoff.is_completed());
    }

    backoff.snooze();
    assert!(backoff.is_completed());

    // Further snoozes keep reporting completion.
    backoff.snooze();
    assert!(backoff.is_completed());
}

// Spinning alone never recommends blocking: a thread that retries its own
// operation has no one to wait for.
#[test]
fn test_spin_never_completes() {
    let backoff = Backoff::new();

    for _ in 0..100 {
        backoff.spin();
    }

    assert!(!backoff.is_completed());
}

#[test]
fn test_reset_restarts_escalation() {
    let backoff = Backoff::new();

    for _ in 0..11 {
        backoff.snooze();
    }
    assert!(backoff.is_completed());

    backoff.reset();
    assert!(!backoff.is_completed());

    for _ in 0..10 {
        backoff.snooze();
        assert!(!backoff.is_completed());
    }
    backoff.snooze();
    assert!(backoff.is_completed());
}
