// Reading source trait - remote access to device readings
use crate::domain::error::DashboardError;
use crate::domain::reading::{Channel, Reading, Registers};
use async_trait::async_trait;
use serde::Deserialize;

/// Register values as delivered by the source; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRegisters {
    #[serde(rename = "TEMP", default)]
    pub temp: Option<f64>,
    #[serde(rename = "VOLTAGE", default)]
    pub voltage: Option<f64>,
    #[serde(rename = "CURRENT", default)]
    pub current: Option<f64>,
    #[serde(rename = "FREQUENCY", default)]
    pub frequency: Option<f64>,
    #[serde(rename = "POWER", default)]
    pub power: Option<f64>,
}

impl RawRegisters {
    fn get(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Temp => self.temp,
            Channel::Voltage => self.voltage,
            Channel::Current => self.current,
            Channel::Frequency => self.frequency,
            Channel::Power => self.power,
        }
    }
}

/// An item of a range page before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub registers: Option<RawRegisters>,
}

impl RawReading {
    /// Items without a timestamp, or tagged with another device, are dropped.
    pub fn normalize(self, device: &str) -> Option<Reading> {
        let timestamp = self.timestamp?;
        if self.device.as_deref().is_some_and(|own| own != device) {
            tracing::debug!(
                "Dropping reading of {:?} returned for {}",
                self.device,
                device
            );
            return None;
        }

        let raw = self.registers.unwrap_or_default();
        let mut registers = Registers::default();
        for channel in Channel::ALL {
            registers.set(channel, raw.get(channel));
        }
        Some(Reading::new(device, timestamp, registers))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangePage {
    pub items: Vec<RawReading>,
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Most recent reading of a device, if it ever reported one
    async fn get_latest(&self, device: &str) -> Result<Option<Reading>, DashboardError>;

    /// One page of readings between `from` and `to` (inclusive, Unix seconds)
    async fn get_range(
        &self,
        device: &str,
        from: i64,
        to: i64,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<RangePage, DashboardError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_absent_channels_absent() {
        let raw: RawReading = serde_json::from_str(
            r#"{"timestamp": 1700000000, "registers": {"TEMP": 24.5, "VOLTAGE": null}}"#,
        )
        .unwrap();

        let reading = raw.normalize("B1").unwrap();
        assert_eq!(reading.device, "B1");
        assert_eq!(reading.timestamp, 1_700_000_000);
        assert_eq!(reading.registers.temp, Some(24.5));
        assert_eq!(reading.registers.voltage, None);
        assert_eq!(reading.registers.power, None);
    }

    #[test]
    fn test_normalize_without_registers() {
        let raw = RawReading {
            timestamp: Some(5),
            ..Default::default()
        };
        assert_eq!(raw.normalize("B3").unwrap().registers, Registers::default());
    }

    #[test]
    fn test_normalize_drops_items_of_other_devices() {
        let raw: RawReading =
            serde_json::from_str(r#"{"device": "B1", "timestamp": 10, "registers": {"TEMP": 1.0}}"#)
                .unwrap();
        assert!(raw.clone().normalize("B2").is_none());
        assert_eq!(raw.normalize("B1").unwrap().device, "B1");
    }

    #[test]
    fn test_normalize_drops_items_without_timestamp() {
        let raw: RawReading = serde_json::from_str(r#"{"registers": {"TEMP": 1.0}}"#).unwrap();
        assert!(raw.normalize("B1").is_none());
    }
}
