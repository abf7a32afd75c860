//! Trust store configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for CRL refresh scheduling and overdue reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustStoreConfig {
    /// Period between automatic CRL refresh ticks
    #[serde(with = "duration_secs")]
    pub refresh_period: Duration,

    /// Age after which a refreshable CRL counts as overdue
    #[serde(with = "duration_secs")]
    pub overdue_after: Duration,

    /// Per-request timeout for CRL downloads; `None` uses the client default
    #[serde(default, with = "opt_duration_secs")]
    pub http_timeout: Option<Duration>,
}

impl Default for TrustStoreConfig {
    fn default() -> Self {
        Self {
            refresh_period: Duration::from_secs(86_400),
            overdue_after: Duration::from_secs(864_000), // 10 days
            http_timeout: None,
        }
    }
}

/// Serialize a `Duration` as whole seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// Serialize an `Option<Duration>` as whole seconds
mod opt_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
