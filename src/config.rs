// config.rs

use crc::{Crc, CRC_32_ISCSI};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::*;

pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");

const CONFIG_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);
const DEFAULT_SERVER_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("config blob rejected: {0}")]
    Encoding(#[from] postcard::Error),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// How the camera node ships a frame to the collector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageUpload {
    /// `multipart/form-data` with a single `image` field
    #[default]
    Multipart,
    /// the JPEG bytes are the whole request body
    Raw,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub wifi_attempts: u32,
    pub wifi_retry_ms: u64,

    pub server_host: String,
    pub server_port: u16,
    pub telemetry_path: String,
    pub time_path: String,
    pub health_path: String,
    pub image_path: String,
    pub raw_image_path: String,

    pub image_name: String,
    pub image_upload: ImageUpload,

    pub telemetry_interval_secs: u64,
    pub capture_interval_secs: u64,
    /// re-run time sync every n telemetry cycles, 0 = only at boot
    pub resync_cycles: u32,

    pub connect_timeout_ms: u64,
    pub exchange_timeout_ms: u64,
    pub max_response_bytes: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: option_env!("WIFI_SSID").unwrap_or_default().into(),
            wifi_pass: option_env!("WIFI_PASS").unwrap_or_default().into(),
            wifi_attempts: 30,
            wifi_retry_ms: 500,

            server_host: option_env!("SERVER_HOST").unwrap_or("127.0.0.1").into(),
            server_port: option_env!("SERVER_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            telemetry_path: "/api/data/".into(),
            time_path: "/api/time/".into(),
            health_path: "/api/health".into(),
            image_path: "/api/uploadImage".into(),
            raw_image_path: "/api/uploadRawImage".into(),

            image_name: "esp32cam".into(),
            image_upload: ImageUpload::Multipart,

            telemetry_interval_secs: 60,
            capture_interval_secs: 5,
            resync_cycles: 0,

            connect_timeout_ms: 5000,
            exchange_timeout_ms: 10_000,
            max_response_bytes: 8192,
        }
    }
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_host.trim().is_empty() {
            return Err(ConfigError::invalid("server_host", "empty"));
        }
        if self.server_port == 0 {
            return Err(ConfigError::invalid("server_port", "port 0"));
        }

        for (field, path) in [
            ("telemetry_path", &self.telemetry_path),
            ("time_path", &self.time_path),
            ("health_path", &self.health_path),
            ("image_path", &self.image_path),
            ("raw_image_path", &self.raw_image_path),
        ] {
            if !path.starts_with('/') || path.contains(char::is_whitespace) {
                return Err(ConfigError::invalid(
                    field,
                    format!("{path:?} is not an absolute request path"),
                ));
            }
        }

        // the name is quoted inside the Content-Disposition header
        if self.image_name.is_empty() || self.image_name.contains(['"', '\r', '\n']) {
            return Err(ConfigError::invalid(
                "image_name",
                format!("{:?} cannot be used as a filename", self.image_name),
            ));
        }

        for (field, v) in [
            ("telemetry_interval_secs", self.telemetry_interval_secs),
            ("capture_interval_secs", self.capture_interval_secs),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("exchange_timeout_ms", self.exchange_timeout_ms),
        ] {
            if v == 0 {
                return Err(ConfigError::invalid(field, "must be non-zero"));
            }
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::invalid("max_response_bytes", "must be non-zero"));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_interval_secs)
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs(self.capture_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }

    pub fn wifi_retry(&self) -> Duration {
        Duration::from_millis(self.wifi_retry_ms)
    }

    /// Serialize into the blob we keep in nvs, crc32 appended.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(postcard::to_allocvec_crc32(self, CONFIG_CRC.digest())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes_crc32(bytes, CONFIG_CRC.digest())?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> NodeConfig {
        NodeConfig {
            server_host: "10.0.0.2".into(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_point_at_collector_routes() {
        let c = NodeConfig::default();
        assert_eq!(c.server_port, 3000);
        assert_eq!(c.telemetry_path, "/api/data/");
        assert_eq!(c.time_path, "/api/time/");
        assert_eq!(c.image_path, "/api/uploadImage");
        assert_eq!(c.telemetry_interval(), Duration::from_secs(60));
        assert_eq!(c.capture_interval(), Duration::from_secs(5));
        assert_eq!(c.resync_cycles, 0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_relative_path() {
        let c = NodeConfig {
            time_path: "api/time".into(),
            ..valid()
        };
        match c.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "time_path"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_quote_in_image_name() {
        let c = NodeConfig {
            image_name: "cam\"1".into(),
            ..valid()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_zero_interval_and_empty_host() {
        let c = NodeConfig {
            capture_interval_secs: 0,
            ..valid()
        };
        assert!(c.validate().is_err());

        let c = NodeConfig {
            server_host: " ".into(),
            ..valid()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn blob_survives_storage() {
        let c = NodeConfig {
            image_upload: ImageUpload::Raw,
            resync_cycles: 10,
            ..valid()
        };
        let blob = c.to_bytes().unwrap();
        assert_eq!(NodeConfig::from_bytes(&blob).unwrap(), c);
    }

    #[test]
    fn corrupted_blob_is_rejected() {
        let mut blob = valid().to_bytes().unwrap();
        let mid = blob.len() / 2;
        blob[mid] ^= 0x55;
        assert!(matches!(
            NodeConfig::from_bytes(&blob),
            Err(ConfigError::Encoding(_))
        ));
    }
}

// EOF
