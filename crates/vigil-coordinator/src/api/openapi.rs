//! OpenAPI document aggregating every coordinator endpoint.

use utoipa::OpenApi;
use vigil_common::rpc::{
    BaselineRequest, BaselineResponse, CrashAlertRequest, CrashReport, DrowsinessEventRequest,
    DrowsinessEventResponse, EndRideResponse, StartRideRequest, StartRideResponse,
    TelemetryBatchRequest, TelemetryBatchResponse, TelemetryPoint,
};
use vigil_common::wire::RiderContact;
use vigil_common::{CrashSeverity, DrowsinessStatus};

use super::routes;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vigil Coordinator API",
        description = "Ride lifecycle, telemetry persistence and crash handling for the Vigil platform"
    ),
    paths(
        routes::health::health_check,
        routes::health::liveness_check,
        routes::rides::start_ride,
        routes::rides::end_ride,
        routes::telemetry::save_telemetry_batch,
        routes::telemetry::log_drowsiness_event,
        routes::crash::crash_alert,
        routes::baseline::compute_baseline,
    ),
    components(schemas(
        routes::health::HealthResponse,
        StartRideRequest,
        StartRideResponse,
        EndRideResponse,
        TelemetryBatchRequest,
        TelemetryBatchResponse,
        TelemetryPoint,
        DrowsinessEventRequest,
        DrowsinessEventResponse,
        CrashAlertRequest,
        CrashReport,
        RiderContact,
        DrowsinessStatus,
        CrashSeverity,
        BaselineRequest,
        BaselineResponse,
    ))
)]
pub struct ApiDoc;
