use metrics::{describe_counter, describe_histogram, describe_gauge, Unit};

/// Optional but adds description/help message to the metrics emitted to the
/// metric sink. Names match the bare `counter!`/`histogram!`/`gauge!` call
/// sites in `checker` and `notifier` — see SPEC_FULL.md's observability
/// section for the full list.
pub(crate) fn install_metrics() {
    // checker
    describe_counter!(
        "checker.checks_performed_total",
        Unit::Count,
        "Triggers successfully evaluated"
    );
    describe_counter!(
        "checker.checks_failed_total",
        Unit::Count,
        "Trigger evaluations that errored and will retry next tick"
    );
    describe_histogram!(
        "checker.check_duration_seconds",
        Unit::Seconds,
        "Wall time spent evaluating a single trigger"
    );
    describe_gauge!(
        "checker.known_triggers_total",
        Unit::Count,
        "Triggers the planner saw due on its last pass"
    );
    describe_counter!(
        "checker.triggers_enqueued_total",
        Unit::Count,
        "Triggers handed to the check worker pool this tick"
    );

    // notifier
    describe_counter!(
        "notifier.events_received_total",
        Unit::Count,
        "Events pulled off the event-fetch queue"
    );
    describe_counter!(
        "notifier.events_malformed_total",
        Unit::Count,
        "Events dropped for missing tags or an unresolvable trigger"
    );
    describe_counter!(
        "notifier.events_processing_failed_total",
        Unit::Count,
        "Events that errored while scheduling notifications and will be retried"
    );
    describe_counter!(
        "notifier.send_attempts_total",
        Unit::Count,
        "Packages handed to a sender"
    );
    describe_counter!(
        "notifier.sends_succeeded_total",
        Unit::Count,
        "Packages a sender delivered successfully"
    );
    describe_counter!(
        "notifier.sends_failed_total",
        Unit::Count,
        "Packages a sender failed to deliver, queued for resend"
    );
}
