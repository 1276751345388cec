// record.rs

use serde::{Serialize, Serializer};

use crate::*;

pub const MOISTURE_CHANNELS: usize = 3;

const MOISTURE_NAMES: [&str; MOISTURE_CHANNELS] =
    ["plant1_moisture", "plant2_moisture", "plant3_moisture"];

/// One DHT-style climate read. Either half may fail on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Climate {
    pub humidity: Option<f32>,
    pub temperature: Option<f32>,
}

/// The sensor hardware as the node sees it: plain synchronous reads,
/// `None` meaning the read failed.
pub trait Sensors {
    fn climate(&mut self) -> Climate;
    fn moisture(&mut self) -> [Option<u16>; MOISTURE_CHANNELS];
    fn distance_cm(&mut self) -> Option<u32>;
    fn light(&mut self) -> Option<bool>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReadingValue {
    Float(f32),
    Int(i64),
}

impl Serialize for ReadingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            ReadingValue::Float(v) => serializer.serialize_f32(v),
            ReadingValue::Int(v) => serializer.serialize_i64(v),
        }
    }
}

fn is_true(v: &bool) -> bool {
    *v
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SensorReading {
    #[serde(rename = "sensor_name")]
    pub name: &'static str,
    pub value: ReadingValue,
    /// Failed reads go out as 0 with `"valid": false` attached.
    #[serde(skip_serializing_if = "is_true")]
    pub valid: bool,
}

impl SensorReading {
    pub fn float(name: &'static str, value: Option<f32>) -> Self {
        match value.filter(|v| v.is_finite()) {
            Some(v) => Self::ok(name, ReadingValue::Float(v)),
            None => Self::failed(name),
        }
    }

    pub fn int(name: &'static str, value: Option<i64>) -> Self {
        match value {
            Some(v) => Self::ok(name, ReadingValue::Int(v)),
            None => Self::failed(name),
        }
    }

    fn ok(name: &'static str, value: ReadingValue) -> Self {
        Self {
            name,
            value,
            valid: true,
        }
    }

    pub fn failed(name: &'static str) -> Self {
        Self {
            name,
            value: ReadingValue::Int(0),
            valid: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetryRecord {
    timestamp: i64,
    #[serde(rename = "sensors")]
    readings: Vec<SensorReading>,
}

impl TelemetryRecord {
    pub fn new(timestamp: i64, readings: Vec<SensorReading>) -> Self {
        Self {
            timestamp,
            readings,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn failed_reads(&self) -> usize {
        self.readings.iter().filter(|r| !r.valid).count()
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Read every sensor once, in wire order. Failures never short-circuit.
pub fn acquire<S: Sensors + ?Sized>(sensors: &mut S) -> Vec<SensorReading> {
    let climate = sensors.climate();
    let moisture = sensors.moisture();
    let distance = sensors.distance_cm();
    let light = sensors.light();

    let mut readings = Vec::with_capacity(4 + MOISTURE_CHANNELS);
    readings.push(SensorReading::float("humidity", climate.humidity));
    readings.push(SensorReading::float("temperature", climate.temperature));
    for (name, value) in MOISTURE_NAMES.into_iter().zip(moisture) {
        readings.push(SensorReading::int(name, value.map(i64::from)));
    }
    readings.push(SensorReading::int(
        "distance_sensor",
        distance.map(i64::from),
    ));
    readings.push(SensorReading::int("light_sensor", light.map(i64::from)));

    for r in readings.iter().filter(|r| !r.valid) {
        warn!("{}: read failed, sending 0", r.name);
    }
    readings
}

/// Sample the sensors and stamp the result with the last synced time.
pub fn build_record<S: Sensors + ?Sized>(sensors: &mut S, clock: &SyncedClock) -> TelemetryRecord {
    TelemetryRecord::new(clock.value(), acquire(sensors))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Clone)]
    pub(crate) struct FixedSensors {
        pub climate: Climate,
        pub moisture: [Option<u16>; MOISTURE_CHANNELS],
        pub distance: Option<u32>,
        pub light: Option<bool>,
    }

    impl FixedSensors {
        pub(crate) fn scenario_a() -> Self {
            Self {
                climate: Climate {
                    humidity: Some(55.2),
                    temperature: Some(21.0),
                },
                moisture: [Some(300), Some(310), Some(320)],
                distance: Some(42),
                light: Some(true),
            }
        }
    }

    impl Sensors for FixedSensors {
        fn climate(&mut self) -> Climate {
            self.climate
        }
        fn moisture(&mut self) -> [Option<u16>; MOISTURE_CHANNELS] {
            self.moisture
        }
        fn distance_cm(&mut self) -> Option<u32> {
            self.distance
        }
        fn light(&mut self) -> Option<bool> {
            self.light
        }
    }

    pub(crate) const SCENARIO_A: &str = r#"{"timestamp":1700000000,"sensors":[{"sensor_name":"humidity","value":55.2},{"sensor_name":"temperature","value":21.0},{"sensor_name":"plant1_moisture","value":300},{"sensor_name":"plant2_moisture","value":310},{"sensor_name":"plant3_moisture","value":320},{"sensor_name":"distance_sensor","value":42},{"sensor_name":"light_sensor","value":1}]}"#;

    fn clock_at(v: i64) -> SyncedClock {
        let mut clock = SyncedClock::new();
        clock.record_success(v);
        clock
    }

    #[test]
    fn scenario_a_wire_format() {
        let record = build_record(&mut FixedSensors::scenario_a(), &clock_at(1_700_000_000));
        let json = String::from_utf8(record.to_json().unwrap()).unwrap();
        assert_eq!(json, SCENARIO_A);
    }

    #[test]
    fn same_inputs_same_bytes() {
        let clock = clock_at(1_700_000_000_123);
        let mut sensors = FixedSensors::scenario_a();
        let a = build_record(&mut sensors, &clock).to_json().unwrap();
        let b = build_record(&mut sensors, &clock).to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn nan_temperature_becomes_flagged_zero() {
        let mut sensors = FixedSensors::scenario_a();
        sensors.climate.temperature = Some(f32::NAN);
        let record = build_record(&mut sensors, &SyncedClock::new());

        assert_eq!(record.timestamp(), 0);
        assert_eq!(record.readings().len(), 7);
        assert_eq!(record.failed_reads(), 1);
        assert_eq!(record.readings()[0].value, ReadingValue::Float(55.2));
        assert!(record.readings()[0].valid);
        assert_eq!(record.readings()[1], SensorReading::failed("temperature"));

        let json = String::from_utf8(record.to_json().unwrap()).unwrap();
        assert!(json.contains(r#"{"sensor_name":"humidity","value":55.2}"#));
        assert!(json.contains(r#"{"sensor_name":"temperature","value":0,"valid":false}"#));
    }

    #[test]
    fn every_failure_still_yields_full_record() {
        let mut sensors = FixedSensors {
            climate: Climate::default(),
            moisture: [None, Some(0), None],
            distance: None,
            light: None,
        };
        let record = build_record(&mut sensors, &clock_at(5));
        let names: Vec<_> = record.readings().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            [
                "humidity",
                "temperature",
                "plant1_moisture",
                "plant2_moisture",
                "plant3_moisture",
                "distance_sensor",
                "light_sensor"
            ]
        );
        assert_eq!(record.failed_reads(), 6);
        // a real zero stays valid
        assert_eq!(record.readings()[3].value, ReadingValue::Int(0));
        assert!(record.readings()[3].valid);
        assert!(record
            .readings()
            .iter()
            .filter(|r| !r.valid)
            .all(|r| r.value == ReadingValue::Int(0)));
    }

    #[test]
    fn dark_is_zero() {
        let mut sensors = FixedSensors::scenario_a();
        sensors.light = Some(false);
        let record = build_record(&mut sensors, &clock_at(1));
        assert_eq!(record.readings()[6].value, ReadingValue::Int(0));
        assert!(record.readings()[6].valid);
    }
}

// EOF
