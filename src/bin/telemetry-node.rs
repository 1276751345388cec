// bin/telemetry-node.rs

#![warn(clippy::large_futures)]

use std::rc::Rc;

use esp_idf_hal::{
    adc::oneshot::AdcDriver,
    gpio::{IOPin, InputPin, OutputPin},
    prelude::Peripherals,
};
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs, timer::EspTaskTimerService};
use esp_idf_sys::esp;

use growhub_node::{esp::*, *};

#[cfg(all(feature = "esp32c3", feature = "esp-wroom-32"))]
compile_error!("Select only one hardware feature: `esp32c3` or `esp-wroom-32`");
#[cfg(not(any(feature = "esp32c3", feature = "esp-wroom-32")))]
compile_error!("Select a hardware feature: `esp32c3` or `esp-wroom-32`");

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

    let sysloop = EspSystemEventLoop::take()?;
    let timer = EspTaskTimerService::new()?;
    let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

    let ns = env!("CARGO_BIN_NAME");
    let mut nvs = nvs::EspNvs::new(nvs_default_partition.clone(), ns, true)?;
    info!("Got namespace {ns:?} from default partition");

    let config = match NodeConfig::from_nvs(&mut nvs) {
        None => {
            error!("Could not read nvs config, using defaults");
            let c = NodeConfig::default();
            c.validate()?;
            c.to_nvs(&mut nvs)?;
            info!("Successfully saved default config to nvs.");
            c
        }

        // using settings saved on nvs if we could find them
        Some(c) => c,
    };
    info!("My config:\n{config:#?}");

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;
    let adc = Rc::new(AdcDriver::new(peripherals.adc1)?);

    #[cfg(feature = "esp32c3")]
    let (dht, trig, echo, light, moisture) = (
        pins.gpio5.downgrade(),
        pins.gpio6.downgrade_output(),
        pins.gpio7.downgrade_input(),
        pins.gpio10.downgrade_input(),
        [
            moisture_channel(adc.clone(), pins.gpio0)?,
            moisture_channel(adc.clone(), pins.gpio1)?,
            moisture_channel(adc.clone(), pins.gpio2)?,
        ],
    );

    #[cfg(feature = "esp-wroom-32")]
    let (dht, trig, echo, light, moisture) = (
        pins.gpio4.downgrade(),
        pins.gpio5.downgrade_output(),
        pins.gpio18.downgrade_input(),
        pins.gpio19.downgrade_input(),
        [
            moisture_channel(adc.clone(), pins.gpio32)?,
            moisture_channel(adc.clone(), pins.gpio33)?,
            moisture_channel(adc.clone(), pins.gpio34)?,
        ],
    );

    let sensors = EspSensors::new(dht, trig, echo, light, moisture)?;
    let link = EspLink::new(
        peripherals.modem,
        sysloop,
        timer,
        Some(nvs_default_partition),
        &config,
    )?;
    let connector = TcpConnector::from_config(&config);
    let node = TelemetryNode::new(config, link, sensors, connector);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(Box::pin(async move {
            info!("Entering main loop...");
            if let Err(e) = node.run().await {
                error!("Telemetry loop ended: {e:#}");
            }
        }));

    // not actually returning from main() but we reboot instead!
    info!("main() finished, reboot.");
    esp_idf_hal::delay::FreeRtos::delay_ms(3000);
    esp_idf_hal::reset::restart();
}

// EOF
