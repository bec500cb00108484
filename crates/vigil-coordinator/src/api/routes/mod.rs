pub mod baseline;
pub mod crash;
pub mod health;
pub mod rides;
pub mod telemetry;
