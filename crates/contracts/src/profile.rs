//! Device profiles
//!
//! Each supported sensor model is a variant of `DeviceProfile`; the
//! variant supplies its stream defaults and the control command sequence
//! sent before the first notification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MeasurementKind;

const OP_GET_SETTINGS: u8 = 0x01;
const OP_START_MEASUREMENT: u8 = 0x02;

const SETTING_SAMPLE_RATE: u8 = 0x00;
const SETTING_RESOLUTION: u8 = 0x01;
const SETTING_RANGE: u8 = 0x02;

/// Supported sensor models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProfile {
    /// Optical heart-rate armband: PPG + ACC
    #[default]
    Oh1,
    /// Chest strap: ECG + ACC
    H10,
}

/// Stream parameters for one measurement kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSetting {
    pub kind: MeasurementKind,
    pub sample_rate_hz: u16,
    pub resolution_bits: u16,
    /// Full-scale range in g (acceleration only)
    pub range_g: Option<u16>,
}

impl StreamSetting {
    /// Nominal interval between samples in microseconds
    pub fn interval_micros(&self) -> u64 {
        1_000_000 / u64::from(self.sample_rate_hz.max(1))
    }
}

/// Stream defaults of a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    pub streams: Vec<StreamSetting>,
}

impl StreamSettings {
    /// Setting for `kind`, if the profile streams it
    pub fn get(&self, kind: MeasurementKind) -> Option<&StreamSetting> {
        self.streams.iter().find(|s| s.kind == kind)
    }
}

/// Opaque named byte sequence written to the control characteristic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ControlCommand {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Query the settings a stream supports
    pub fn get_settings(kind: MeasurementKind) -> Self {
        Self::new(
            format!("get_{}_settings", kind.as_str()),
            vec![OP_GET_SETTINGS, kind.tag()],
        )
    }

    /// Start streaming with the given parameters
    pub fn start_stream(setting: &StreamSetting) -> Self {
        let mut bytes = vec![OP_START_MEASUREMENT, setting.kind.tag()];
        bytes.extend_from_slice(&[SETTING_SAMPLE_RATE, 0x01]);
        bytes.extend_from_slice(&setting.sample_rate_hz.to_le_bytes());
        bytes.extend_from_slice(&[SETTING_RESOLUTION, 0x01]);
        bytes.extend_from_slice(&setting.resolution_bits.to_le_bytes());
        if let Some(range) = setting.range_g {
            bytes.extend_from_slice(&[SETTING_RANGE, 0x01]);
            bytes.extend_from_slice(&range.to_le_bytes());
        }
        Self::new(format!("start_{}", setting.kind.as_str()), bytes)
    }
}

impl DeviceProfile {
    /// Sample-rate defaults of the model
    pub fn stream_settings(self) -> StreamSettings {
        let streams = match self {
            DeviceProfile::Oh1 => vec![
                StreamSetting {
                    kind: MeasurementKind::Acceleration,
                    sample_rate_hz: 50,
                    resolution_bits: 16,
                    range_g: Some(8),
                },
                StreamSetting {
                    kind: MeasurementKind::PulseChannels,
                    sample_rate_hz: 135,
                    resolution_bits: 22,
                    range_g: None,
                },
            ],
            DeviceProfile::H10 => vec![
                StreamSetting {
                    kind: MeasurementKind::Acceleration,
                    sample_rate_hz: 200,
                    resolution_bits: 16,
                    range_g: Some(8),
                },
                StreamSetting {
                    kind: MeasurementKind::Ecg,
                    sample_rate_hz: 200,
                    resolution_bits: 14,
                    range_g: None,
                },
            ],
        };
        StreamSettings { streams }
    }

    /// Commands sent after connecting: settings queries first, then starts
    ///
    /// The primary stream is started before acceleration.
    pub fn command_sequence(self) -> Vec<ControlCommand> {
        let settings = self.stream_settings();
        let primary = self.primary_kind();

        let mut commands = vec![
            ControlCommand::get_settings(MeasurementKind::Acceleration),
            ControlCommand::get_settings(primary),
        ];
        if let Some(setting) = settings.get(primary) {
            commands.push(ControlCommand::start_stream(setting));
        }
        if let Some(setting) = settings.get(MeasurementKind::Acceleration) {
            commands.push(ControlCommand::start_stream(setting));
        }
        commands
    }

    /// Physiological stream of the model
    pub fn primary_kind(self) -> MeasurementKind {
        match self {
            DeviceProfile::Oh1 => MeasurementKind::PulseChannels,
            DeviceProfile::H10 => MeasurementKind::Ecg,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceProfile::Oh1 => "oh1",
            DeviceProfile::H10 => "h10",
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oh1_defaults() {
        let settings = DeviceProfile::Oh1.stream_settings();
        assert_eq!(
            settings.get(MeasurementKind::Acceleration).unwrap().sample_rate_hz,
            50
        );
        assert_eq!(
            settings.get(MeasurementKind::PulseChannels).unwrap().sample_rate_hz,
            135
        );
        assert!(settings.get(MeasurementKind::Ecg).is_none());
    }

    #[test]
    fn test_oh1_command_order() {
        let names: Vec<_> = DeviceProfile::Oh1
            .command_sequence()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec!["get_acc_settings", "get_ppg_settings", "start_ppg", "start_acc"]
        );
    }

    #[test]
    fn test_start_command_bytes() {
        let setting = StreamSetting {
            kind: MeasurementKind::Acceleration,
            sample_rate_hz: 50,
            resolution_bits: 16,
            range_g: Some(8),
        };
        let cmd = ControlCommand::start_stream(&setting);
        assert_eq!(
            cmd.bytes,
            vec![0x02, 0x02, 0x00, 0x01, 50, 0x00, 0x01, 0x01, 16, 0x00, 0x02, 0x01, 8, 0x00]
        );
    }

    #[test]
    fn test_h10_starts_ecg() {
        let commands = DeviceProfile::H10.command_sequence();
        assert_eq!(commands[1].bytes, vec![0x01, 0x00]);
        assert_eq!(commands[2].name, "start_ecg");
    }
}
