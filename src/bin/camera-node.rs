// bin/camera-node.rs

#![warn(clippy::large_futures)]

use esp_idf_hal::{delay::FreeRtos, prelude::Peripherals};
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs, timer::EspTaskTimerService};
use esp_idf_sys::esp;

use growhub_node::{esp::*, *};

fn main() -> anyhow::Result<()> {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    // eventfd is needed by our mio poll implementation
    #[allow(clippy::needless_update)]
    let config = esp_idf_sys::esp_vfs_eventfd_config_t {
        max_fds: 1,
        ..Default::default()
    };
    esp! { unsafe { esp_idf_sys::esp_vfs_eventfd_register(&config) } }?;

    info!("Hello.");
    info!("Starting up, firmware version {FW_VERSION}");

    // no camera, no point in doing anything else
    let camera = match EspCamera::init() {
        Ok(c) => c,
        Err(e) => {
            error!("Camera init failed: {e:#}");
            loop {
                FreeRtos::delay_ms(60_000);
            }
        }
    };

    let sysloop = EspSystemEventLoop::take()?;
    let timer = EspTaskTimerService::new()?;
    let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

    let ns = env!("CARGO_BIN_NAME");
    let mut nvs = nvs::EspNvs::new(nvs_default_partition.clone(), ns, true)?;

    let config = match NodeConfig::from_nvs(&mut nvs) {
        None => {
            error!("Could not read nvs config, using defaults");
            let c = NodeConfig::default();
            c.validate()?;
            c.to_nvs(&mut nvs)?;
            c
        }
        Some(c) => c,
    };
    info!("My config:\n{config:#?}");

    let peripherals = Peripherals::take()?;
    let link = EspLink::new(
        peripherals.modem,
        sysloop,
        timer,
        Some(nvs_default_partition),
        &config,
    )?;
    let connector = TcpConnector::from_config(&config);
    let node = CameraNode::new(config, link, camera, connector);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(Box::pin(async move {
            info!("Entering capture loop...");
            if let Err(e) = node.run().await {
                error!("Capture loop ended: {e:#}");
            }
        }));

    info!("main() finished, reboot.");
    FreeRtos::delay_ms(3000);
    esp_idf_hal::reset::restart();
}

// EOF
