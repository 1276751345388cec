// timesync.rs

use serde::Deserialize;

use crate::*;

#[derive(Debug, Deserialize)]
struct TimeReply {
    unix: i64,
}

/// Pull the `unix` field out of a raw time response.
///
/// Everything before the first `{` is skipped (status line, headers, stray
/// bytes), the first JSON value from there on is decoded and anything after
/// it is ignored.
pub fn parse_unix(raw: &[u8]) -> Option<i64> {
    let start = raw.iter().position(|&b| b == b'{')?;
    let mut docs = serde_json::Deserializer::from_slice(&raw[start..]).into_iter::<TimeReply>();
    match docs.next()? {
        Ok(reply) => Some(reply.unix),
        Err(e) => {
            debug!("time reply rejected: {e}");
            None
        }
    }
}

/// Asks the collector what time it is. The value is milliseconds since the
/// Unix epoch and is stored as-is.
pub struct TimeSync<'a, C> {
    transport: &'a Transport<C>,
    time_path: &'a str,
    health_path: &'a str,
}

impl<'a, C: Connector> TimeSync<'a, C> {
    pub fn new(transport: &'a Transport<C>, config: &'a NodeConfig) -> Self {
        Self {
            transport,
            time_path: &config.time_path,
            health_path: &config.health_path,
        }
    }

    /// Never fatal: on any failure the clock keeps its value and is flagged unsynced.
    pub async fn sync(&self, clock: &mut SyncedClock) -> bool {
        info!("Fetching time from {}{}", self.transport.host(), self.time_path);

        let res = match self
            .transport
            .perform_exchange(UploadRequest::get(self.time_path))
            .await
        {
            Ok(res) => res,
            Err(e) => {
                error!("Time sync failed: {e}");
                clock.record_failure();
                return false;
            }
        };

        match parse_unix(&res.raw) {
            Some(unix_ms) => {
                clock.record_success(unix_ms);
                info!("Time synchronized: {unix_ms}");
                true
            }
            None => {
                error!(
                    "Time sync: no usable `unix` field in response: {}",
                    String::from_utf8_lossy(&res.raw)
                );
                clock.record_failure();
                false
            }
        }
    }

    /// One GET to the health route, true on 2xx. Only used for diagnostics.
    pub async fn probe_health(&self) -> bool {
        match self
            .transport
            .perform_exchange(UploadRequest::get(self.health_path))
            .await
        {
            Ok(res) if res.is_success() => {
                info!("Collector healthy: {}", res.body_text());
                true
            }
            Ok(res) => {
                warn!("Collector health status {:?}", res.status());
                false
            }
            Err(e) => {
                warn!("Collector health probe failed: {e}");
                false
            }
        }
    }
}


// EOF
