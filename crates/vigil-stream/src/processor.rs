//! The per-device processing pipeline.
//!
//! One instance owns every device's state and is driven from a single loop:
//! broker messages route through [`StreamProcessor::handle_publish`], a 1 s
//! timer drives [`StreamProcessor::sweep_idle_rides`]. Message handling is
//! deliberately drop-happy at the edge: one telemetry sample is cheap, so a
//! malformed payload or failed analysis is logged and discarded rather than
//! retried.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use vigil_common::topics::{parse_device_topic, DeviceChannel};
use vigil_common::wire::{
    AccelMessage, AccelSnapshot, CommandMessage, CrashMessage, GeoPoint, LiveAnalysis,
    LiveMetrics, TelemetryMessage,
};
use vigil_common::rpc::{CrashAlertRequest, DrowsinessEventRequest};
use vigil_common::{device_topic, TelemetryPoint};
use vigil_config::StreamConfig;
use vigil_hrv::{
    analyze_ppg, assess_drowsiness, detect_crash, BaselineMetrics, CrashThresholds,
};

use crate::coordinator::CoordinatorApi;
use crate::metrics::StreamMetrics;
use crate::mqtt::FeedbackPublisher;
use crate::state::DeviceState;

pub struct StreamProcessor<C, P> {
    coordinator: C,
    publisher: P,
    config: StreamConfig,
    thresholds: CrashThresholds,
    devices: HashMap<String, DeviceState>,
}

impl<C, P> StreamProcessor<C, P>
where
    C: CoordinatorApi,
    P: FeedbackPublisher,
{
    pub fn new(coordinator: C, publisher: P, config: StreamConfig) -> Self {
        let thresholds = CrashThresholds {
            max_axis_g: config.crash_g_threshold(),
            vector_excess_g: config.crash_vector_threshold(),
        };
        Self {
            coordinator,
            publisher,
            config,
            thresholds,
            devices: HashMap::new(),
        }
    }

    /// Number of points currently buffered for a device. Zero when the
    /// device is untracked.
    pub fn buffered_points(&self, device_code: &str) -> usize {
        self.devices
            .get(device_code)
            .map(|state| state.buffer.len())
            .unwrap_or(0)
    }

    /// Whether any in-memory state exists for the device.
    pub fn is_tracking(&self, device_code: &str) -> bool {
        self.devices.contains_key(device_code)
    }

    /// Route one broker message by topic. Messages outside the helmet
    /// namespace, or on channels we publish rather than consume, are
    /// ignored.
    pub async fn handle_publish(&mut self, topic: &str, payload: &[u8]) {
        let Some((device_code, channel)) = parse_device_topic(topic) else {
            debug!(topic, "ignoring message on foreign topic");
            return;
        };
        let device_code = device_code.to_string();

        match channel {
            DeviceChannel::Baseline => self.handle_baseline(&device_code, payload),
            DeviceChannel::Telemetry => self.handle_telemetry(&device_code, payload).await,
            DeviceChannel::Accel => self.handle_accel(&device_code, payload).await,
            _ => {}
        }
    }

    /// Overwrite the cached baseline for a device. Idempotent, no
    /// persistence side effect.
    fn handle_baseline(&mut self, device_code: &str, payload: &[u8]) {
        let baseline: BaselineMetrics = match serde_json::from_slice(payload) {
            Ok(baseline) => baseline,
            Err(error) => {
                warn!(device = device_code, %error, "malformed baseline payload; dropping");
                return;
            }
        };

        info!(
            device = device_code,
            sdnn = baseline.sdnn,
            rmssd = baseline.rmssd,
            "baseline cached"
        );
        self.devices
            .entry(device_code.to_string())
            .or_default()
            .baseline = Some(baseline);
    }

    /// Full telemetry cycle: ride, analysis, classification, buffering,
    /// live feedback, event logging, flush bookkeeping.
    async fn handle_telemetry(&mut self, device_code: &str, payload: &[u8]) {
        let message: TelemetryMessage = match serde_json::from_slice(payload) {
            Ok(message) => message,
            Err(error) => {
                warn!(device = device_code, %error, "malformed telemetry payload; dropping");
                StreamMetrics::inc_dropped();
                return;
            }
        };

        let state = self.devices.entry(device_code.to_string()).or_default();

        // Telemetry implies a ride; open one if this device has none.
        if state.ride_id.is_none() {
            match self.coordinator.start_ride(device_code).await {
                Ok(ride_id) => {
                    info!(device = device_code, %ride_id, "ride started");
                    state.ride_id = Some(ride_id);
                }
                Err(error) => {
                    // Points are still buffered and persisted unattached.
                    warn!(device = device_code, %error, "could not start ride");
                }
            }
        }

        let metrics = match analyze_ppg(&message.ppg, message.sample_rate) {
            Ok(metrics) => metrics,
            Err(reason) => {
                debug!(device = device_code, %reason, "PPG analysis failed; dropping message");
                StreamMetrics::inc_dropped();
                return;
            }
        };

        let baseline = state.baseline.unwrap_or_else(BaselineMetrics::general);
        if state.baseline.is_none() {
            debug!(device = device_code, "no cached baseline; using general baseline");
        }

        let assessment = assess_drowsiness(&metrics, &baseline);

        state.buffer.push(TelemetryPoint {
            timestamp: Utc::now(),
            hr: metrics.hr,
            ibi_ms: metrics.ibi_ms(),
            sdnn: metrics.sdnn,
            rmssd: metrics.rmssd,
            pnn50: metrics.pnn50,
            lf_hf_ratio: metrics.lf_hf_ratio,
            accel_x: None,
            accel_y: None,
            accel_z: None,
            lat: message.lat,
            lon: message.lon,
        });
        let ride_id = state.ride_id;
        StreamMetrics::inc_processed();

        info!(
            device = device_code,
            hr = metrics.hr,
            score = assessment.score,
            status = %assessment.status,
            "telemetry processed"
        );

        let analysis = LiveAnalysis {
            device_id: device_code.to_string(),
            timestamp: Utc::now(),
            status: assessment.status,
            metrics: LiveMetrics {
                hr: metrics.hr,
                sdnn: metrics.sdnn,
                rmssd: metrics.rmssd,
                pnn50: metrics.pnn50,
                lf_hf_ratio: metrics.lf_hf_ratio,
                drowsiness_score: assessment.score,
            },
            location: GeoPoint {
                lat: message.lat,
                lon: message.lon,
            },
        };
        self.publish(
            &device_topic(device_code, DeviceChannel::LiveAnalysis),
            &analysis,
        )
        .await;
        self.publish(
            &device_topic(device_code, DeviceChannel::Command),
            &CommandMessage::feedback(assessment.alert),
        )
        .await;

        if assessment.status.is_alert() {
            if let Some(ride_id) = ride_id {
                let event = DrowsinessEventRequest {
                    device_id: device_code.to_string(),
                    ride_id,
                    severity_score: assessment.score as i32,
                    status: assessment.status,
                    hr_at_event: metrics.hr,
                    sdnn: metrics.sdnn,
                    rmssd: metrics.rmssd,
                    pnn50: metrics.pnn50,
                    lf_hf_ratio: metrics.lf_hf_ratio,
                    lat: message.lat,
                    lon: message.lon,
                };
                match self.coordinator.log_drowsiness_event(&event).await {
                    Ok(event_id) => {
                        StreamMetrics::inc_event_logged();
                        info!(
                            device = device_code,
                            %event_id,
                            status = %assessment.status,
                            alerts = ?assessment.alerts,
                            "drowsiness event logged"
                        );
                    }
                    Err(error) => {
                        warn!(device = device_code, %error, "failed to log drowsiness event");
                    }
                }
            }
        }

        let state = self
            .devices
            .get_mut(device_code)
            .expect("device state inserted above");
        state.last_activity = Instant::now();

        if state.last_flush.elapsed() >= self.config.flush_interval() {
            flush_buffer(&self.coordinator, device_code, state).await;
        }
    }

    /// Crash detection path: evaluate the sample, and on detection report
    /// to the coordinator and notify device and app.
    async fn handle_accel(&mut self, device_code: &str, payload: &[u8]) {
        let message: AccelMessage = match serde_json::from_slice(payload) {
            Ok(message) => message,
            Err(error) => {
                warn!(device = device_code, %error, "malformed accel payload; dropping");
                return;
            }
        };

        let Some(detection) = detect_crash(
            message.accel_x,
            message.accel_y,
            message.accel_z,
            &self.thresholds,
        ) else {
            return;
        };

        StreamMetrics::inc_crash_detected();
        warn!(
            device = device_code,
            severity = %detection.severity,
            magnitude = detection.magnitude,
            "crash detected"
        );

        let alert = CrashAlertRequest {
            device_id: device_code.to_string(),
            lat: message.lat,
            lon: message.lon,
            severity: detection.severity,
            accel_magnitude: Some(detection.magnitude),
            accel_x: Some(message.accel_x),
            accel_y: Some(message.accel_y),
            accel_z: Some(message.accel_z),
        };
        let report = match self.coordinator.report_crash(&alert).await {
            Ok(report) => {
                info!(
                    device = device_code,
                    responder = report.responder_name.as_deref().unwrap_or("none"),
                    "crash reported"
                );
                Some(report)
            }
            Err(error) => {
                warn!(device = device_code, %error, "failed to report crash");
                None
            }
        };

        self.publish(
            &device_topic(device_code, DeviceChannel::Command),
            &CommandMessage::crash(detection.severity),
        )
        .await;

        let crash = CrashMessage {
            device_id: device_code.to_string(),
            timestamp: Utc::now(),
            severity: detection.severity,
            location: GeoPoint {
                lat: message.lat,
                lon: message.lon,
            },
            accel: AccelSnapshot {
                accel_x: message.accel_x,
                accel_y: message.accel_y,
                accel_z: message.accel_z,
                magnitude: detection.magnitude,
                max_axis_deviation: detection.max_axis_deviation,
            },
            hospital: report,
        };
        self.publish(&device_topic(device_code, DeviceChannel::Crash), &crash)
            .await;
    }

    /// Auto-end rides whose devices have gone quiet.
    ///
    /// Called on a fixed cadence from the main loop. Devices past the
    /// activity timeout get a final flush, an `end_ride` call, and a full
    /// state eviction.
    pub async fn sweep_idle_rides(&mut self) {
        let expired: Vec<String> = self
            .devices
            .iter()
            .filter(|(_, state)| state.ride_id.is_some())
            .filter(|(_, state)| state.last_activity.elapsed() >= self.config.ride_timeout())
            .map(|(device_code, _)| device_code.clone())
            .collect();

        for device_code in expired {
            let Some(mut state) = self.devices.remove(&device_code) else {
                continue;
            };
            info!(device = %device_code, "activity timeout; auto-ending ride");

            flush_buffer(&self.coordinator, &device_code, &mut state).await;

            if let Some(ride_id) = state.ride_id {
                if let Err(error) = self.coordinator.end_ride(ride_id).await {
                    warn!(device = %device_code, %ride_id, %error, "failed to auto-end ride");
                }
            }
            // State is dropped here: baseline cache, buffer and ride map
            // entries all go with it.
        }
    }

    async fn publish<T: serde::Serialize>(&self, topic: &str, payload: &T) {
        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(topic, %error, "failed to serialize outbound payload");
                return;
            }
        };
        if let Err(error) = self.publisher.publish_json(topic, bytes).await {
            warn!(topic, %error, "failed to publish");
        }
    }
}

/// Flush a device's buffer to the coordinator.
///
/// On success the buffer is cleared and the flush clock reset; on failure
/// the buffer is retained for the next attempt.
async fn flush_buffer<C: CoordinatorApi>(
    coordinator: &C,
    device_code: &str,
    state: &mut DeviceState,
) -> bool {
    if state.buffer.is_empty() {
        state.last_flush = Instant::now();
        return true;
    }

    match coordinator
        .save_telemetry_batch(device_code, state.ride_id, &state.buffer)
        .await
    {
        Ok(records_inserted) => {
            info!(device = device_code, records_inserted, "telemetry batch flushed");
            StreamMetrics::inc_flush();
            state.buffer.clear();
            state.last_flush = Instant::now();
            true
        }
        Err(error) => {
            warn!(device = device_code, %error, "batch flush failed; retaining buffer");
            false
        }
    }
}
