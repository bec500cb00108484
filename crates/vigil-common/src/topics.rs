//! Broker topic naming
//!
//! Device traffic uses `helmet/<device_code>/<channel>`. Inbound channels are
//! subscribed with a single-level wildcard; outbound channels are built per
//! device.

/// Wildcard filter for raw PPG telemetry.
pub const TELEMETRY_FILTER: &str = "helmet/+/telemetry";
/// Wildcard filter for per-device calibration baselines.
pub const BASELINE_FILTER: &str = "helmet/+/baseline";
/// Wildcard filter for accelerometer samples.
pub const ACCEL_FILTER: &str = "helmet/+/accel";

/// A channel on the device broker, inbound or outbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChannel {
    Telemetry,
    Baseline,
    Accel,
    LiveAnalysis,
    Command,
    Crash,
}

impl DeviceChannel {
    /// Topic leaf segment.
    pub fn leaf(&self) -> &'static str {
        match self {
            DeviceChannel::Telemetry => "telemetry",
            DeviceChannel::Baseline => "baseline",
            DeviceChannel::Accel => "accel",
            DeviceChannel::LiveAnalysis => "live-analysis",
            DeviceChannel::Command => "command",
            DeviceChannel::Crash => "crash",
        }
    }

    fn from_leaf(leaf: &str) -> Option<Self> {
        match leaf {
            "telemetry" => Some(DeviceChannel::Telemetry),
            "baseline" => Some(DeviceChannel::Baseline),
            "accel" => Some(DeviceChannel::Accel),
            "live-analysis" => Some(DeviceChannel::LiveAnalysis),
            "command" => Some(DeviceChannel::Command),
            "crash" => Some(DeviceChannel::Crash),
            _ => None,
        }
    }
}

/// Build the concrete topic for one device and channel.
pub fn device_topic(device_code: &str, channel: DeviceChannel) -> String {
    format!("helmet/{}/{}", device_code, channel.leaf())
}

/// Extract `(device_code, channel)` from a concrete topic.
///
/// Returns `None` for topics outside the `helmet/` namespace, unknown
/// channel leaves, or empty device codes.
pub fn parse_device_topic(topic: &str) -> Option<(&str, DeviceChannel)> {
    let mut parts = topic.split('/');
    if parts.next()? != "helmet" {
        return None;
    }
    let device_code = parts.next()?;
    let channel = DeviceChannel::from_leaf(parts.next()?)?;
    if parts.next().is_some() || device_code.is_empty() {
        return None;
    }
    Some((device_code, channel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inbound_topics() {
        assert_eq!(
            parse_device_topic("helmet/H1/telemetry"),
            Some(("H1", DeviceChannel::Telemetry))
        );
        assert_eq!(
            parse_device_topic("helmet/abc-42/baseline"),
            Some(("abc-42", DeviceChannel::Baseline))
        );
        assert_eq!(
            parse_device_topic("helmet/H1/accel"),
            Some(("H1", DeviceChannel::Accel))
        );
    }

    #[test]
    fn rejects_foreign_and_malformed_topics() {
        assert_eq!(parse_device_topic("bike/H1/telemetry"), None);
        assert_eq!(parse_device_topic("helmet/H1/unknown"), None);
        assert_eq!(parse_device_topic("helmet//telemetry"), None);
        assert_eq!(parse_device_topic("helmet/H1/telemetry/extra"), None);
        assert_eq!(parse_device_topic("helmet/H1"), None);
    }

    #[test]
    fn builds_outbound_topics() {
        assert_eq!(
            device_topic("H1", DeviceChannel::LiveAnalysis),
            "helmet/H1/live-analysis"
        );
        assert_eq!(device_topic("H1", DeviceChannel::Command), "helmet/H1/command");
        assert_eq!(device_topic("H1", DeviceChannel::Crash), "helmet/H1/crash");
    }
}
