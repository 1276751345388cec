// esp/sensors.rs

use std::rc::Rc;

use esp_idf_hal::{
    adc::{
        attenuation::DB_11,
        oneshot::{config::AdcChannelConfig, AdcChannelDriver, AdcDriver},
        ADCPin,
    },
    delay::Ets,
    gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, Input, InputOutput, Output, PinDriver},
    peripheral::Peripheral,
};

use crate::*;

/// One soil moisture probe, raw ADC counts.
pub type MoistureRead<'d> = Box<dyn FnMut() -> anyhow::Result<u16> + 'd>;

/// One-shot ADC channel at 11 dB, full 0..3.3V range.
pub fn moisture_channel<'d, T>(
    adc: Rc<AdcDriver<'d, T::Adc>>,
    pin: impl Peripheral<P = T> + 'd,
) -> anyhow::Result<MoistureRead<'d>>
where
    T: ADCPin + 'd,
{
    let config = AdcChannelConfig {
        attenuation: DB_11,
        ..Default::default()
    };
    let mut channel = AdcChannelDriver::new(adc.clone(), pin, &config)?;
    Ok(Box::new(move || Ok(adc.read(&mut channel)?)))
}

pub struct EspSensors<'d> {
    dht: Dht22<PinDriver<'d, AnyIOPin, InputOutput>, Ets>,
    ranger: Hcsr04<PinDriver<'d, AnyOutputPin, Output>, PinDriver<'d, AnyInputPin, Input>, Ets>,
    moisture: [MoistureRead<'d>; MOISTURE_CHANNELS],
    light: PinDriver<'d, AnyInputPin, Input>,
}

impl<'d> EspSensors<'d> {
    pub fn new(
        dht: AnyIOPin,
        trig: AnyOutputPin,
        echo: AnyInputPin,
        light: AnyInputPin,
        moisture: [MoistureRead<'d>; MOISTURE_CHANNELS],
    ) -> anyhow::Result<Self> {
        Ok(Self {
            dht: Dht22::new(PinDriver::input_output_od(dht)?, Ets),
            ranger: Hcsr04::new(PinDriver::output(trig)?, PinDriver::input(echo)?, Ets),
            moisture,
            light: PinDriver::input(light)?,
        })
    }
}

impl Sensors for EspSensors<'_> {
    fn climate(&mut self) -> Climate {
        match self.dht.read() {
            Ok(r) => Climate {
                humidity: Some(r.humidity),
                temperature: Some(r.temperature),
            },
            Err(e) => {
                debug!("DHT22: {e}");
                Climate::default()
            }
        }
    }

    fn moisture(&mut self) -> [Option<u16>; MOISTURE_CHANNELS] {
        let mut values = [None; MOISTURE_CHANNELS];
        for (i, (read, value)) in self.moisture.iter_mut().zip(values.iter_mut()).enumerate() {
            match read() {
                Ok(v) => *value = Some(v),
                Err(e) => debug!("moisture #{i}: {e}"),
            }
        }
        values
    }

    fn distance_cm(&mut self) -> Option<u32> {
        self.ranger
            .measure_cm()
            .map_err(|e| debug!("HC-SR04: {e}"))
            .ok()
    }

    fn light(&mut self) -> Option<bool> {
        // module output is high when it sees light
        Some(self.light.is_high())
    }
}

// EOF
