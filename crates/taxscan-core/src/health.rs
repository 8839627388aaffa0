//! Reachability of the recognition service and the fiscal registry.
//!
//! Each provider answers a cheap probe request (a model lookup, a `HEAD` on
//! the search page) and reports the outcome here. The `health` command prints
//! both reports and fails when either collaborator is unusable.

use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Whether a collaborator can take work.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceStatus {
    /// Answered the probe.
    #[default]
    Healthy,
    /// Reachable, but answered with an unexpected status.
    Degraded,
    /// Unreachable or rejected the credentials.
    Unhealthy,
}

/// Outcome of one health probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    /// Round trip of the probe, when one was sent.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "latency_ms")]
    pub latency: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: Timestamp,
}

impl ServiceHealth {
    fn new(status: ServiceStatus, message: Option<String>) -> Self {
        Self {
            status,
            latency: None,
            message,
            checked_at: Timestamp::now(),
        }
    }

    /// The probe succeeded.
    pub fn healthy() -> Self {
        Self::new(ServiceStatus::Healthy, None)
    }

    /// The collaborator answered, but not as expected.
    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ServiceStatus::Degraded, Some(message.into()))
    }

    /// The probe failed.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ServiceStatus::Unhealthy, Some(message.into()))
    }

    /// Records how long the probe took.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns true unless the collaborator is unhealthy.
    ///
    /// A degraded registry still serves lookups, so it does not block a batch.
    pub fn is_operational(&self) -> bool {
        self.status != ServiceStatus::Unhealthy
    }
}

/// Serializes the probe latency as whole milliseconds.
mod latency_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        latency: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match latency {
            Some(latency) => {
                serializer.serialize_u64(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operational_statuses() {
        assert!(ServiceHealth::healthy().is_operational());
        assert!(ServiceHealth::degraded("status 503").is_operational());
        assert!(!ServiceHealth::unhealthy("connection refused").is_operational());
        assert_eq!(ServiceStatus::Degraded.to_string(), "degraded");
    }

    #[test]
    fn test_latency_serialized_as_millis() {
        let health = ServiceHealth::healthy().with_latency(Duration::from_millis(1250));
        let json = serde_json::to_value(&health).unwrap();

        assert_eq!(json["status"], "healthy");
        assert_eq!(json["latency"], 1250);
        assert!(json.get("message").is_none());

        let back: ServiceHealth = serde_json::from_value(json).unwrap();
        assert_eq!(back.latency, Some(Duration::from_millis(1250)));
    }
}
