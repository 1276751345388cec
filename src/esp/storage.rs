// esp/storage.rs

use esp_idf_svc::nvs::{EspNvs, NvsDefault};

use crate::*;

const CONFIG_KEY: &str = "cfg";
const CONFIG_BUF_SIZE: usize = 1024;

impl NodeConfig {
    /// Load the config blob, None if missing or rejected.
    pub fn from_nvs(nvs: &mut EspNvs<NvsDefault>) -> Option<Self> {
        let mut buf = vec![0u8; CONFIG_BUF_SIZE];
        let bytes = match nvs.get_raw(CONFIG_KEY, &mut buf) {
            Ok(Some(b)) => b,
            Ok(None) => {
                info!("No config in nvs");
                return None;
            }
            Err(e) => {
                error!("Nvs read error: {e:?}");
                return None;
            }
        };

        match Self::from_bytes(bytes) {
            Ok(c) => Some(c),
            Err(e) => {
                error!("Nvs config rejected: {e}");
                None
            }
        }
    }

    pub fn to_nvs(&self, nvs: &mut EspNvs<NvsDefault>) -> anyhow::Result<()> {
        let bytes = self.to_bytes()?;
        if bytes.len() > CONFIG_BUF_SIZE {
            bail!("config blob too large: {} bytes", bytes.len());
        }
        nvs.set_raw(CONFIG_KEY, &bytes)?;
        Ok(())
    }
}

// EOF
