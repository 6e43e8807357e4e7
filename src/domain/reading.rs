// Reading domain model - one timestamped multi-channel sample
use serde::Serialize;

/// The fixed set of channels a device reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Temp,
    Voltage,
    Current,
    Frequency,
    Power,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Temp,
        Channel::Voltage,
        Channel::Current,
        Channel::Frequency,
        Channel::Power,
    ];
}

/// Channel values of a reading. A channel the device did not report is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Registers {
    pub temp: Option<f64>,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub frequency: Option<f64>,
    pub power: Option<f64>,
}

impl Registers {
    pub fn get(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Temp => self.temp,
            Channel::Voltage => self.voltage,
            Channel::Current => self.current,
            Channel::Frequency => self.frequency,
            Channel::Power => self.power,
        }
    }

    pub fn set(&mut self, channel: Channel, value: Option<f64>) {
        let slot = match channel {
            Channel::Temp => &mut self.temp,
            Channel::Voltage => &mut self.voltage,
            Channel::Current => &mut self.current,
            Channel::Frequency => &mut self.frequency,
            Channel::Power => &mut self.power,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub device: String,
    /// Unix seconds; together with `device` identifies the sample.
    pub timestamp: i64,
    pub registers: Registers,
}

impl Reading {
    pub fn new(device: impl Into<String>, timestamp: i64, registers: Registers) -> Self {
        Self {
            device: device.into(),
            timestamp,
            registers,
        }
    }
}

/// Health label derived from the latest reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Unknown,
    Online,
    Alert,
}

impl DeviceStatus {
    pub fn evaluate(latest: Option<&Reading>, alert_temperature: f64) -> Self {
        match latest {
            None => DeviceStatus::Unknown,
            Some(reading) => match reading.registers.get(Channel::Temp) {
                Some(temp) if temp >= alert_temperature => DeviceStatus::Alert,
                _ => DeviceStatus::Online,
            },
        }
    }
}
