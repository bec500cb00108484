//! RPC seam to the ride coordinator.
//!
//! The processor only talks to the trait; the HTTP implementation carries
//! the bounded timeouts (5 s for short RPCs, 10 s for batch flush and crash
//! reporting).

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use vigil_common::rpc::{
    CrashAlertRequest, CrashReport, DrowsinessEventRequest, DrowsinessEventResponse,
    StartRideRequest, StartRideResponse, TelemetryBatchRequest, TelemetryBatchResponse,
    TelemetryPoint,
};
use vigil_config::CoordinatorConfig;

/// Operations the stream processor needs from the coordinator.
#[async_trait]
pub trait CoordinatorApi: Send + Sync {
    /// Ensure an active ride exists for the device; returns its id.
    async fn start_ride(&self, device_code: &str) -> anyhow::Result<Uuid>;

    /// End a ride (used by the activity-timeout sweep).
    async fn end_ride(&self, ride_id: Uuid) -> anyhow::Result<()>;

    /// Persist a buffered batch; returns the number of rows inserted.
    async fn save_telemetry_batch(
        &self,
        device_code: &str,
        ride_id: Option<Uuid>,
        points: &[TelemetryPoint],
    ) -> anyhow::Result<usize>;

    /// Record one non-awake classification.
    async fn log_drowsiness_event(&self, event: &DrowsinessEventRequest) -> anyhow::Result<Uuid>;

    /// Report a detected impact; the coordinator routes the responder.
    async fn report_crash(&self, alert: &CrashAlertRequest) -> anyhow::Result<CrashReport>;
}

#[async_trait]
impl<T: CoordinatorApi + ?Sized> CoordinatorApi for Arc<T> {
    async fn start_ride(&self, device_code: &str) -> anyhow::Result<Uuid> {
        T::start_ride(self, device_code).await
    }

    async fn end_ride(&self, ride_id: Uuid) -> anyhow::Result<()> {
        T::end_ride(self, ride_id).await
    }

    async fn save_telemetry_batch(
        &self,
        device_code: &str,
        ride_id: Option<Uuid>,
        points: &[TelemetryPoint],
    ) -> anyhow::Result<usize> {
        T::save_telemetry_batch(self, device_code, ride_id, points).await
    }

    async fn log_drowsiness_event(&self, event: &DrowsinessEventRequest) -> anyhow::Result<Uuid> {
        T::log_drowsiness_event(self, event).await
    }

    async fn report_crash(&self, alert: &CrashAlertRequest) -> anyhow::Result<CrashReport> {
        T::report_crash(self, alert).await
    }
}

/// reqwest-backed coordinator client.
pub struct HttpCoordinator {
    base_url: String,
    /// 5 s timeout: ride lifecycle and event logging.
    short: reqwest::Client,
    /// 10 s timeout: batch flush and crash reporting.
    long: reqwest::Client,
}

impl HttpCoordinator {
    pub fn new(config: &CoordinatorConfig) -> anyhow::Result<Self> {
        let short = reqwest::Client::builder()
            .timeout(config.rpc_timeout())
            .build()?;
        let long = reqwest::Client::builder()
            .timeout(config.batch_timeout())
            .build()?;

        Ok(Self {
            base_url: config.base_url().trim_end_matches('/').to_string(),
            short,
            long,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl CoordinatorApi for HttpCoordinator {
    async fn start_ride(&self, device_code: &str) -> anyhow::Result<Uuid> {
        let response: StartRideResponse = self
            .short
            .post(self.url("/rides/start"))
            .json(&StartRideRequest {
                device_id: device_code.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.ride_id)
    }

    async fn end_ride(&self, ride_id: Uuid) -> anyhow::Result<()> {
        self.short
            .post(self.url(&format!("/rides/{ride_id}/end")))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn save_telemetry_batch(
        &self,
        device_code: &str,
        ride_id: Option<Uuid>,
        points: &[TelemetryPoint],
    ) -> anyhow::Result<usize> {
        let response: TelemetryBatchResponse = self
            .long
            .post(self.url("/telemetry/batch"))
            .json(&TelemetryBatchRequest {
                device_id: device_code.to_string(),
                ride_id: ride_id.map(|id| id.to_string()),
                telemetry: points.to_vec(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.records_inserted)
    }

    async fn log_drowsiness_event(&self, event: &DrowsinessEventRequest) -> anyhow::Result<Uuid> {
        let response: DrowsinessEventResponse = self
            .short
            .post(self.url("/drowsiness-events"))
            .json(event)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.event_id)
    }

    async fn report_crash(&self, alert: &CrashAlertRequest) -> anyhow::Result<CrashReport> {
        let report: CrashReport = self
            .long
            .post(self.url("/crash"))
            .json(alert)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(report)
    }
}
