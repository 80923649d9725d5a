//! End-to-end scenarios for the telemetry node.

use vitals_core::{
    AlertLevel, Error, MockPublisher, NodeOptions, Sample, TelemetryNode, TickOutcome,
};
use vitals_store::{DurableJournal, MemoryMedium};

const PACING_MS: u64 = 2_000;

fn sample(ts: u64) -> Sample {
    Sample::new(36.5, 45.0, 72, ts)
}

fn boot(journal: DurableJournal) -> TelemetryNode<MockPublisher> {
    TelemetryNode::boot(NodeOptions::new("wearable-001"), journal, MockPublisher::new()).unwrap()
}

fn alldata_timestamps(node: &TelemetryNode<MockPublisher>) -> Vec<u64> {
    node.publisher()
        .published_on("alldata")
        .iter()
        .map(|m| {
            let doc: serde_json::Value = serde_json::from_slice(&m.payload).unwrap();
            doc["timestamp"].as_u64().unwrap()
        })
        .collect()
}

#[test]
fn three_samples_buffered_offline_then_drained() {
    let medium = MemoryMedium::new();
    let mut node = boot(DurableJournal::new(medium.clone()));

    for ts in [100, 200, 300] {
        let admission = node.ingest(Some(sample(ts)), ts).unwrap();
        assert_eq!(admission.sync, TickOutcome::Offline);
    }
    assert_eq!(node.status().pending, 3);
    assert_eq!(medium.line_count(), 3);

    node.observe_network(true);
    let mut now = 1_000;
    let mut outcomes = Vec::new();
    for _ in 0..3 {
        outcomes.push(node.tick(now));
        now += PACING_MS;
    }

    assert!(matches!(outcomes[0], TickOutcome::Sent { purged: false, .. }));
    assert!(matches!(outcomes[1], TickOutcome::Sent { purged: false, .. }));
    assert!(matches!(outcomes[2], TickOutcome::Sent { purged: true, .. }));

    assert_eq!(alldata_timestamps(&node), vec![100, 200, 300]);
    assert_eq!(node.status().pending, 0);
    assert_eq!(node.status().stored, 0);
    assert_eq!(medium.line_count(), 0, "journal truncated after purge");
}

#[test]
fn unavailable_journal_behaves_like_memory_only() {
    let medium = MemoryMedium::new();
    medium.set_unavailable(true);
    let mut node = boot(DurableJournal::new(medium));
    assert!(!node.status().journal_available);

    for ts in [100, 200, 300] {
        node.ingest(Some(sample(ts)), ts).unwrap();
    }
    assert_eq!(node.status().pending, 3);

    node.observe_network(true);
    for i in 0..3 {
        node.tick(1_000 + i * PACING_MS);
    }
    assert_eq!(alldata_timestamps(&node), vec![100, 200, 300]);
    assert_eq!(node.status().stored, 0);
}

#[test]
fn journal_failing_mid_run_keeps_buffering() {
    let medium = MemoryMedium::new();
    let mut node = boot(DurableJournal::new(medium.clone()));

    node.ingest(Some(sample(1)), 1).unwrap();
    medium.set_unavailable(true);
    node.ingest(Some(sample(2)), 2).unwrap();

    assert!(!node.status().journal_available);
    assert_eq!(node.status().pending, 2);
}

#[test]
fn failing_broker_retries_oldest_without_skipping() {
    let mut node = boot(DurableJournal::disabled());
    for ts in [10, 20] {
        node.ingest(Some(sample(ts)), ts).unwrap();
    }

    node.observe_network(true);
    node.publisher_mut().fail_next(3);

    let mut now = 1_000;
    let mut failed_slots = Vec::new();
    loop {
        match node.tick(now) {
            TickOutcome::Failed { slot } => failed_slots.push(slot),
            TickOutcome::Sent { .. } => break,
            other => panic!("unexpected outcome {:?}", other),
        }
        now += PACING_MS;
    }

    // The online status publish consumed one injected failure.
    assert_eq!(failed_slots.len(), 2);
    assert_eq!(failed_slots[0], failed_slots[1]);
    assert_eq!(alldata_timestamps(&node), vec![10]);
    assert_eq!(node.status().pending, 1);
}

#[test]
fn restart_mid_drain_replays_whole_journal() {
    let medium = MemoryMedium::new();
    let mut node = boot(DurableJournal::new(medium.clone()));
    for ts in [10, 20, 30] {
        node.ingest(Some(sample(ts)), ts).unwrap();
    }
    node.observe_network(true);
    node.tick(1_000);
    assert_eq!(node.status().pending, 2);
    drop(node);

    // Sent flags are not journaled, so all three come back.
    let mut rebooted = boot(DurableJournal::new(medium.clone()));
    assert_eq!(rebooted.status().pending, 3);

    rebooted.observe_network(true);
    for i in 0..3 {
        rebooted.tick(i * PACING_MS);
    }
    assert_eq!(alldata_timestamps(&rebooted), vec![10, 20, 30]);
    assert_eq!(medium.line_count(), 0);
}

#[test]
fn overflow_while_offline_evicts_oldest() {
    let mut node = TelemetryNode::boot(
        NodeOptions::new("wearable-001").capacity(3),
        DurableJournal::disabled(),
        MockPublisher::new(),
    )
    .unwrap();

    for ts in 1..=5 {
        node.ingest(Some(sample(ts)), ts).unwrap();
    }
    let status = node.status();
    assert_eq!(status.pending, 3);
    assert_eq!(status.evicted_unsent, 2);

    node.observe_network(true);
    for i in 0..3 {
        node.tick(100 + i * PACING_MS);
    }
    assert_eq!(alldata_timestamps(&node), vec![3, 4, 5]);
}

#[test]
fn sync_pauses_across_disconnect_and_resumes() {
    let mut node = boot(DurableJournal::disabled());
    for ts in [10, 20, 30] {
        node.ingest(Some(sample(ts)), ts).unwrap();
    }

    node.observe_network(true);
    node.tick(0);
    node.observe_network(false);
    assert_eq!(node.tick(PACING_MS), TickOutcome::Offline);
    assert_eq!(node.status().pending, 2);

    node.observe_network(true);
    node.tick(2 * PACING_MS);
    node.tick(3 * PACING_MS);
    assert_eq!(alldata_timestamps(&node), vec![10, 20, 30]);
    assert_eq!(node.publisher().published_on("status").len(), 2);
}

#[test]
fn alerts_follow_threshold_examples() {
    let mut node = boot(DurableJournal::disabled());
    node.observe_network(true);
    node.tick(0);

    let critical = node
        .ingest(Some(Sample::new(38.5, 45.0, 90, 10)), 10)
        .unwrap()
        .alert
        .unwrap();
    assert_eq!(critical.level, AlertLevel::Critical);
    assert!(critical.reason.contains("temperature"));
    assert!(!critical.reason.contains("heart rate"));

    let warning = node
        .ingest(Some(Sample::new(36.0, 45.0, 110, 20)), 20)
        .unwrap()
        .alert
        .unwrap();
    assert_eq!(warning.level, AlertLevel::Warning);
    assert!(warning.reason.contains("heart rate"));
    assert!(!warning.reason.contains("temperature"));

    let calm = node
        .ingest(Some(Sample::new(36.0, 45.0, 90, 30)), 30)
        .unwrap();
    assert!(calm.alert.is_none());

    let alerts = node.publisher().published_on("alert");
    assert_eq!(alerts.len(), 2);
    assert!(alerts[0].text().contains(r#""alert_level":"CRITICAL""#));
}

#[test]
fn critical_sample_buffered_offline_alerts_when_synced() {
    let mut node = boot(DurableJournal::disabled());
    node.ingest(Some(sample(10)), 10).unwrap();
    let critical = node
        .ingest(Some(Sample::new(38.6, 45.0, 125, 20)), 20)
        .unwrap();
    assert_eq!(critical.alert.map(|a| a.level), Some(AlertLevel::Critical));
    assert!(node.publisher().published_on("alert").is_empty());

    node.observe_network(true);
    node.tick(1_000);
    assert!(node.publisher().published_on("alert").is_empty());

    node.tick(1_000 + PACING_MS);
    let alerts = node.publisher().published_on("alert");
    assert_eq!(alerts.len(), 1);
    let doc: serde_json::Value = serde_json::from_slice(&alerts[0].payload).unwrap();
    assert_eq!(doc["alert_level"], "CRITICAL");
    assert_eq!(doc["timestamp"], 20);
    assert_eq!(node.status().stored, 0);
}

#[test]
fn alert_publish_failure_is_not_retried() {
    let mut node = boot(DurableJournal::disabled());
    node.observe_network(true);
    node.tick(0);

    node.publisher_mut().fail_next(1);
    let admission = node
        .ingest(Some(Sample::new(39.0, 45.0, 80, 10)), 10)
        .unwrap();
    assert!(admission.alert.is_some());
    assert!(matches!(admission.sync, TickOutcome::Sent { .. }));
    assert!(node.publisher().published_on("alert").is_empty());
}

#[test]
fn rejected_inputs_never_reach_the_store() {
    let mut node = boot(DurableJournal::disabled());
    assert!(matches!(node.ingest(None, 0), Err(Error::AcquisitionFailed)));
    assert!(node.ingest(Some(Sample::new(36.0, f32::NAN, 70, 1)), 1).is_err());
    assert!(node.ingest(Some(Sample::new(36.0, 45.0, 400, 2)), 2).is_err());

    let status = node.status();
    assert_eq!(status.rejected, 3);
    assert_eq!(status.stored, 0);
}
