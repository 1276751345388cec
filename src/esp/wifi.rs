// esp/wifi.rs

use anyhow::anyhow;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    timer::EspTaskTimerService,
    wifi::{AsyncWifi, AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

use crate::*;

/// Station mode client on the builtin radio.
pub struct EspLink {
    wifi: AsyncWifi<EspWifi<'static>>,
}

impl EspLink {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        timer: EspTaskTimerService,
        nvs: Option<EspDefaultNvsPartition>,
        config: &NodeConfig,
    ) -> anyhow::Result<Self> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let mut wifi = AsyncWifi::wrap(esp_wifi, sysloop, timer)?;

        let auth_method = if config.wifi_pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: config
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("wifi ssid too long"))?,
            password: config
                .wifi_pass
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("wifi password too long"))?,
            auth_method,
            ..Default::default()
        }))?;

        Ok(Self { wifi })
    }
}

impl Link for EspLink {
    fn is_up(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    async fn associate(&mut self) -> anyhow::Result<()> {
        if !self.wifi.is_started()? {
            info!("WiFi start");
            self.wifi.start().await?;
        }
        if self.wifi.is_connected()? {
            // associated but no address, start over
            let _ = self.wifi.disconnect().await;
        }

        self.wifi.connect().await?;
        self.wifi.wait_netif_up().await?;

        let ip_info = self.wifi.wifi().sta_netif().get_ip_info()?;
        info!("WiFi up, got ip {}", ip_info.ip);
        Ok(())
    }
}

// EOF
