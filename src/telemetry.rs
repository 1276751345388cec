// telemetry.rs

use crate::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// the exchange completed, whatever status came back
    Delivered(Option<u16>),
    Failed,
}

/// Posts telemetry records as JSON. The reply is logged and otherwise ignored.
pub struct TelemetryUploader<'a, C> {
    transport: &'a Transport<C>,
    path: &'a str,
}

impl<'a, C: Connector> TelemetryUploader<'a, C> {
    pub fn new(transport: &'a Transport<C>, config: &'a NodeConfig) -> Self {
        Self {
            transport,
            path: &config.telemetry_path,
        }
    }

    pub fn request(&self, record: &TelemetryRecord) -> anyhow::Result<UploadRequest> {
        let json = record.to_json()?;
        Ok(UploadRequest::post(self.path).body("application/json", json))
    }

    /// One attempt; a failure waits for the next cycle.
    pub async fn upload(&self, record: &TelemetryRecord) -> UploadOutcome {
        let request = match self.request(record) {
            Ok(r) => r,
            Err(e) => {
                error!("Telemetry encoding failed: {e}");
                return UploadOutcome::Failed;
            }
        };
        info!(
            "Sending telemetry: {}",
            String::from_utf8_lossy(request.body_bytes())
        );

        match self.transport.perform_exchange(request).await {
            Ok(res) => {
                match res.status() {
                    Some(status) if !res.is_success() => {
                        warn!("Collector answered {status}: {}", res.body_text())
                    }
                    _ => info!("Collector answered: {}", res.body_text()),
                }
                UploadOutcome::Delivered(res.status())
            }
            Err(e) => {
                error!("Telemetry upload failed: {e}");
                UploadOutcome::Failed
            }
        }
    }
}


// EOF
