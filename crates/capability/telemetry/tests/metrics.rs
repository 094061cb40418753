use pyro_telemetry::{
    TelemetryMetrics, init_tracing, metrics, record_poll_cycle, record_snapshot_dropped,
};

#[test]
fn counters_are_monotonic() {
    let before = metrics().snapshot();
    record_poll_cycle();
    record_snapshot_dropped();
    let after = metrics().snapshot();

    assert!(after.poll_cycles > before.poll_cycles);
    assert!(after.snapshots_dropped > before.snapshots_dropped);
}

#[test]
fn fresh_metrics_start_at_zero() {
    let snapshot = TelemetryMetrics::new().snapshot();
    assert_eq!(snapshot, Default::default());
}

#[test]
fn init_tracing_twice_is_harmless() {
    init_tracing();
    init_tracing();
}
