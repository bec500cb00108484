//! End-to-end pipeline tests against mocked coordinator and broker seams.
//!
//! Classification thresholds themselves are covered in vigil-hrv; these
//! tests exercise the message-driven pipeline: ride bootstrap, buffering,
//! publishing, event logging, flush retention and the timeout sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;
use vigil_common::rpc::{
    CrashAlertRequest, CrashReport, DrowsinessEventRequest, TelemetryPoint,
};
use vigil_common::wire::TelemetryMessage;
use vigil_config::StreamConfig;
use vigil_hrv::{analyze_ppg, BaselineMetrics};
use vigil_stream::{CoordinatorApi, FeedbackPublisher, StreamProcessor};

#[derive(Default)]
struct MockCoordinator {
    ride_id: Mutex<Option<Uuid>>,
    start_calls: Mutex<u32>,
    end_calls: Mutex<Vec<Uuid>>,
    batches: Mutex<Vec<(String, Option<Uuid>, Vec<TelemetryPoint>)>>,
    events: Mutex<Vec<DrowsinessEventRequest>>,
    crashes: Mutex<Vec<CrashAlertRequest>>,
    fail_batches: AtomicBool,
}

impl MockCoordinator {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn start_calls(&self) -> u32 {
        *self.start_calls.lock().unwrap()
    }

    fn ended_rides(&self) -> Vec<Uuid> {
        self.end_calls.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<DrowsinessEventRequest> {
        self.events.lock().unwrap().clone()
    }

    fn crashes(&self) -> Vec<CrashAlertRequest> {
        self.crashes.lock().unwrap().clone()
    }

    fn batches(&self) -> Vec<(String, Option<Uuid>, Vec<TelemetryPoint>)> {
        self.batches.lock().unwrap().clone()
    }

    fn set_fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CoordinatorApi for MockCoordinator {
    async fn start_ride(&self, _device_code: &str) -> anyhow::Result<Uuid> {
        *self.start_calls.lock().unwrap() += 1;
        let mut ride_id = self.ride_id.lock().unwrap();
        let id = ride_id.get_or_insert_with(Uuid::new_v4);
        Ok(*id)
    }

    async fn end_ride(&self, ride_id: Uuid) -> anyhow::Result<()> {
        self.end_calls.lock().unwrap().push(ride_id);
        Ok(())
    }

    async fn save_telemetry_batch(
        &self,
        device_code: &str,
        ride_id: Option<Uuid>,
        points: &[TelemetryPoint],
    ) -> anyhow::Result<usize> {
        if self.fail_batches.load(Ordering::SeqCst) {
            anyhow::bail!("coordinator unavailable");
        }
        self.batches
            .lock()
            .unwrap()
            .push((device_code.to_string(), ride_id, points.to_vec()));
        Ok(points.len())
    }

    async fn log_drowsiness_event(&self, event: &DrowsinessEventRequest) -> anyhow::Result<Uuid> {
        self.events.lock().unwrap().push(event.clone());
        Ok(Uuid::new_v4())
    }

    async fn report_crash(&self, alert: &CrashAlertRequest) -> anyhow::Result<CrashReport> {
        self.crashes.lock().unwrap().push(alert.clone());
        Ok(CrashReport {
            success: true,
            crash_id: Uuid::new_v4(),
            severity: alert.severity,
            responder_notified: true,
            responder_name: Some("North General".to_string()),
            distance_km: Some(3.2),
            rider: None,
        })
    }
}

#[derive(Default)]
struct CapturePublisher {
    messages: Mutex<Vec<(String, Value)>>,
}

impl CapturePublisher {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn on_topic(&self, topic: &str) -> Vec<Value> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl FeedbackPublisher for CapturePublisher {
    async fn publish_json(&self, topic: &str, payload: Vec<u8>) -> anyhow::Result<()> {
        let value: Value = serde_json::from_slice(&payload)?;
        self.messages.lock().unwrap().push((topic.to_string(), value));
        Ok(())
    }
}

fn relaxed_config() -> StreamConfig {
    StreamConfig::new(
        Duration::from_secs(3600),
        Duration::from_secs(3600),
        4.0,
        6.0,
    )
}

/// Clean 72 bpm pulse train; regular enough to classify reproducibly.
fn synthetic_ppg() -> Vec<f64> {
    let sample_rate = 50.0;
    (0..500)
        .map(|i| {
            let t = i as f64 / sample_rate;
            100.0 + (2.0 * std::f64::consts::PI * 1.2 * t).sin()
        })
        .collect()
}

fn telemetry_payload(ppg: Vec<f64>, lat: Option<f64>, lon: Option<f64>) -> Vec<u8> {
    serde_json::to_vec(&TelemetryMessage {
        ppg,
        sample_rate: 50,
        lat,
        lon,
    })
    .unwrap()
}

/// Baseline matching the synthetic signal's own metrics, so every factor
/// ratio is ~1 and the classification comes out awake.
fn matching_baseline() -> BaselineMetrics {
    let metrics = analyze_ppg(&synthetic_ppg(), 50).unwrap();
    BaselineMetrics {
        mean_hr: metrics.hr,
        sdnn: metrics.sdnn,
        rmssd: metrics.rmssd,
        pnn50: metrics.pnn50,
        lf_hf_ratio: metrics.lf_hf_ratio,
        sd1_sd2_ratio: metrics.sd1_sd2_ratio,
    }
}

/// Baseline far above the signal's variability: SDNN and RMSSD land in
/// their strongest bands and pNN50 in its strong band, totalling exactly 8.
fn inflated_baseline() -> BaselineMetrics {
    let metrics = analyze_ppg(&synthetic_ppg(), 50).unwrap();
    BaselineMetrics {
        mean_hr: metrics.hr,
        sdnn: metrics.sdnn * 3.0,
        rmssd: metrics.rmssd * 3.0,
        pnn50: 20.0,
        lf_hf_ratio: metrics.lf_hf_ratio,
        sd1_sd2_ratio: metrics.sd1_sd2_ratio,
    }
}

#[tokio::test]
async fn baseline_then_awake_telemetry_publishes_feedback() {
    let coordinator = MockCoordinator::new();
    let publisher = CapturePublisher::new();
    let mut processor =
        StreamProcessor::new(coordinator.clone(), publisher.clone(), relaxed_config());

    let baseline_payload = serde_json::to_vec(&matching_baseline()).unwrap();
    processor
        .handle_publish("helmet/H1/baseline", &baseline_payload)
        .await;

    processor
        .handle_publish(
            "helmet/H1/telemetry",
            &telemetry_payload(synthetic_ppg(), Some(51.5), Some(-0.1)),
        )
        .await;

    assert_eq!(coordinator.start_calls(), 1);
    assert_eq!(processor.buffered_points("H1"), 1);
    assert!(coordinator.events().is_empty());

    let analyses = publisher.on_topic("helmet/H1/live-analysis");
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0]["status"], "AWAKE");
    assert_eq!(analyses[0]["device_id"], "H1");
    assert_eq!(analyses[0]["location"]["lat"], 51.5);

    let commands = publisher.on_topic("helmet/H1/command");
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0]["vibrate"], false);
    assert_eq!(commands[0]["crash_detected"], false);
}

#[tokio::test]
async fn second_telemetry_reuses_the_open_ride() {
    let coordinator = MockCoordinator::new();
    let publisher = CapturePublisher::new();
    let mut processor =
        StreamProcessor::new(coordinator.clone(), publisher.clone(), relaxed_config());

    for _ in 0..2 {
        processor
            .handle_publish(
                "helmet/H1/telemetry",
                &telemetry_payload(synthetic_ppg(), None, None),
            )
            .await;
    }

    // The ride id is cached after the first message.
    assert_eq!(coordinator.start_calls(), 1);
    assert_eq!(processor.buffered_points("H1"), 2);
}

#[tokio::test]
async fn collapsed_variability_logs_a_drowsiness_event() {
    let coordinator = MockCoordinator::new();
    let publisher = CapturePublisher::new();
    let mut processor =
        StreamProcessor::new(coordinator.clone(), publisher.clone(), relaxed_config());

    let baseline_payload = serde_json::to_vec(&inflated_baseline()).unwrap();
    processor
        .handle_publish("helmet/H1/baseline", &baseline_payload)
        .await;
    processor
        .handle_publish(
            "helmet/H1/telemetry",
            &telemetry_payload(synthetic_ppg(), None, None),
        )
        .await;

    let events = coordinator.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity_score, 8);
    assert_eq!(events[0].status.label(), "DROWSY");
    assert_eq!(events[0].device_id, "H1");

    let commands = publisher.on_topic("helmet/H1/command");
    assert_eq!(commands[0]["vibrate"], true);
}

#[tokio::test]
async fn short_ppg_window_is_dropped_without_side_effects() {
    let coordinator = MockCoordinator::new();
    let publisher = CapturePublisher::new();
    let mut processor =
        StreamProcessor::new(coordinator.clone(), publisher.clone(), relaxed_config());

    processor
        .handle_publish(
            "helmet/H1/telemetry",
            &telemetry_payload(vec![100.0; 10], None, None),
        )
        .await;

    assert_eq!(processor.buffered_points("H1"), 0);
    assert_eq!(publisher.count(), 0);
    assert!(coordinator.events().is_empty());
    assert!(coordinator.batches().is_empty());
}

#[tokio::test]
async fn failed_flush_retains_the_buffer_for_the_next_attempt() {
    let coordinator = MockCoordinator::new();
    let publisher = CapturePublisher::new();
    // Zero flush interval: every telemetry message triggers a flush.
    let config = StreamConfig::new(Duration::ZERO, Duration::from_secs(3600), 4.0, 6.0);
    let mut processor = StreamProcessor::new(coordinator.clone(), publisher.clone(), config);

    coordinator.set_fail_batches(true);
    for _ in 0..2 {
        processor
            .handle_publish(
                "helmet/H1/telemetry",
                &telemetry_payload(synthetic_ppg(), None, None),
            )
            .await;
    }
    assert_eq!(processor.buffered_points("H1"), 2);
    assert!(coordinator.batches().is_empty());

    coordinator.set_fail_batches(false);
    processor
        .handle_publish(
            "helmet/H1/telemetry",
            &telemetry_payload(synthetic_ppg(), None, None),
        )
        .await;

    // All three retained points went out in a single batch.
    let batches = coordinator.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, "H1");
    assert_eq!(batches[0].2.len(), 3);
    assert_eq!(processor.buffered_points("H1"), 0);
}

#[tokio::test]
async fn idle_ride_is_flushed_ended_and_evicted() {
    let coordinator = MockCoordinator::new();
    let publisher = CapturePublisher::new();
    // Zero ride timeout: the next sweep considers every ride idle.
    let config = StreamConfig::new(Duration::from_secs(3600), Duration::ZERO, 4.0, 6.0);
    let mut processor = StreamProcessor::new(coordinator.clone(), publisher.clone(), config);

    processor
        .handle_publish(
            "helmet/H1/telemetry",
            &telemetry_payload(synthetic_ppg(), None, None),
        )
        .await;
    assert!(processor.is_tracking("H1"));

    processor.sweep_idle_rides().await;

    assert!(!processor.is_tracking("H1"));
    let batches = coordinator.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].2.len(), 1);
    assert_eq!(coordinator.ended_rides().len(), 1);
    assert_eq!(Some(coordinator.ended_rides()[0]), batches[0].1);
}

#[tokio::test]
async fn sweep_leaves_rideless_devices_alone() {
    let coordinator = MockCoordinator::new();
    let publisher = CapturePublisher::new();
    let config = StreamConfig::new(Duration::from_secs(3600), Duration::ZERO, 4.0, 6.0);
    let mut processor = StreamProcessor::new(coordinator.clone(), publisher.clone(), config);

    // A baseline-only device has no ride to end.
    let baseline_payload = serde_json::to_vec(&matching_baseline()).unwrap();
    processor
        .handle_publish("helmet/H2/baseline", &baseline_payload)
        .await;

    processor.sweep_idle_rides().await;

    assert!(processor.is_tracking("H2"));
    assert!(coordinator.ended_rides().is_empty());
}

#[tokio::test]
async fn vertical_slam_raises_crash_alert_and_notifications() {
    let coordinator = MockCoordinator::new();
    let publisher = CapturePublisher::new();
    let mut processor =
        StreamProcessor::new(coordinator.clone(), publisher.clone(), relaxed_config());

    let payload =
        br#"{"accel_x":0.0,"accel_y":0.0,"accel_z":25.0,"lat":51.5,"lon":-0.1}"#.to_vec();
    processor.handle_publish("helmet/H1/accel", &payload).await;

    let crashes = coordinator.crashes();
    assert_eq!(crashes.len(), 1);
    assert_eq!(crashes[0].severity.as_str(), "severe");
    assert_eq!(crashes[0].lat, Some(51.5));

    let commands = publisher.on_topic("helmet/H1/command");
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0]["crash_detected"], true);
    assert_eq!(commands[0]["severity"], "severe");
    assert_eq!(commands[0]["vibrate"], true);

    let crash_messages = publisher.on_topic("helmet/H1/crash");
    assert_eq!(crash_messages.len(), 1);
    assert_eq!(crash_messages[0]["severity"], "severe");
    assert_eq!(crash_messages[0]["accel"]["magnitude"], 25.0);
    assert_eq!(crash_messages[0]["hospital"]["responder_name"], "North General");
}

#[tokio::test]
async fn gentle_accel_sample_is_ignored() {
    let coordinator = MockCoordinator::new();
    let publisher = CapturePublisher::new();
    let mut processor =
        StreamProcessor::new(coordinator.clone(), publisher.clone(), relaxed_config());

    let payload = br#"{"accel_x":0.5,"accel_y":0.2,"accel_z":9.9}"#.to_vec();
    processor.handle_publish("helmet/H1/accel", &payload).await;

    assert!(coordinator.crashes().is_empty());
    assert_eq!(publisher.count(), 0);
}

#[tokio::test]
async fn malformed_payloads_are_dropped_silently() {
    let coordinator = MockCoordinator::new();
    let publisher = CapturePublisher::new();
    let mut processor =
        StreamProcessor::new(coordinator.clone(), publisher.clone(), relaxed_config());

    processor.handle_publish("helmet/H1/baseline", b"not json").await;
    processor.handle_publish("helmet/H1/telemetry", b"{}").await;
    processor.handle_publish("helmet/H1/accel", b"[1,2]").await;
    processor.handle_publish("elevator/H1/telemetry", b"{}").await;

    assert_eq!(coordinator.start_calls(), 0);
    assert_eq!(publisher.count(), 0);
    assert!(!processor.is_tracking("H1"));
}
