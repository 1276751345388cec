// drivers.rs

use std::{fmt::Debug, time::Instant};

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use thiserror::Error;

use crate::*;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriverError<E: Debug> {
    #[error("pin error: {0:?}")]
    Pin(E),

    #[error("timed out waiting for sensor")]
    Timeout,

    #[error("checksum mismatch")]
    Checksum,
}

/// Busy-wait while the pin stays at `level`, return how long that took.
fn wait_while<P: InputPin>(
    pin: &mut P,
    level: bool,
    timeout: Duration,
) -> Result<Duration, DriverError<P::Error>> {
    let start = Instant::now();
    while pin.is_high().map_err(DriverError::Pin)? == level {
        if start.elapsed() > timeout {
            return Err(DriverError::Timeout);
        }
    }
    Ok(start.elapsed())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dht22Reading {
    pub humidity: f32,
    pub temperature: f32,
}

/// Decode the 5 data bytes of a DHT22 / AM2302 frame.
pub fn decode_dht22<E: Debug>(data: &[u8; 5]) -> Result<Dht22Reading, DriverError<E>> {
    let sum = data[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != data[4] {
        return Err(DriverError::Checksum);
    }

    let humidity = u16::from_be_bytes([data[0], data[1]]) as f32 / 10.0;
    let magnitude = u16::from_be_bytes([data[2] & 0x7f, data[3]]) as f32 / 10.0;
    let temperature = if data[2] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };
    Ok(Dht22Reading {
        humidity,
        temperature,
    })
}

/// DHT22 on a single open-drain data line.
pub struct Dht22<P, D> {
    pin: P,
    delay: D,
}

// a data bit is 26-28us high for 0 and 70us high for 1
const DHT_BIT_THRESHOLD: Duration = Duration::from_micros(48);
const DHT_EDGE_TIMEOUT: Duration = Duration::from_micros(200);

impl<P, D> Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(mut pin: P, delay: D) -> Self {
        // idle high, the sensor needs that before the first start pulse
        let _ = pin.set_high();
        Self { pin, delay }
    }

    pub fn read(&mut self) -> Result<Dht22Reading, DriverError<P::Error>> {
        let pin = &mut self.pin;
        pin.set_low().map_err(DriverError::Pin)?;
        self.delay.delay_us(1100);
        pin.set_high().map_err(DriverError::Pin)?;

        // response: sensor pulls low 80us, then high 80us
        wait_while(pin, true, DHT_EDGE_TIMEOUT)?;
        wait_while(pin, false, DHT_EDGE_TIMEOUT)?;
        wait_while(pin, true, DHT_EDGE_TIMEOUT)?;

        let mut data = [0u8; 5];
        for i in 0..40 {
            wait_while(pin, false, DHT_EDGE_TIMEOUT)?;
            let high = wait_while(pin, true, DHT_EDGE_TIMEOUT)?;
            if high > DHT_BIT_THRESHOLD {
                data[i / 8] |= 0x80 >> (i % 8);
            }
        }
        decode_dht22(&data)
    }
}

/// Centimeters from an HC-SR04 echo: speed of sound 0.034 cm/us, there and back.
pub fn echo_to_cm(echo: Duration) -> u32 {
    (echo.as_micros() as f64 * 0.034 / 2.0) as u32
}

/// HC-SR04 ultrasonic ranger.
pub struct Hcsr04<T, E, D> {
    trig: T,
    echo: E,
    delay: D,
    timeout: Duration,
}

impl<T, E, D> Hcsr04<T, E, D>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
{
    pub fn new(trig: T, echo: E, delay: D) -> Self {
        Self {
            trig,
            echo,
            delay,
            // no obstacle gives a ~38ms pulse
            timeout: Duration::from_millis(40),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn measure_cm(&mut self) -> Result<u32, DriverError<E::Error>> {
        // trigger errors are folded into a timeout, the echo never comes
        let _ = self.trig.set_low();
        self.delay.delay_us(2);
        let _ = self.trig.set_high();
        self.delay.delay_us(10);
        let _ = self.trig.set_low();

        wait_while(&mut self.echo, false, self.timeout)?;
        let echo = wait_while(&mut self.echo, true, self.timeout)?;
        Ok(echo_to_cm(echo))
    }
}


// EOF
