//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{MeasurementKind, SessionBlueprint, StreamSetting};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    device: DeviceInfo,
    streams: Vec<StreamInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    commands: Vec<CommandInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
    sync_settings: SyncInfo,
}

#[derive(Serialize)]
struct DeviceInfo {
    name: String,
    profile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

#[derive(Serialize)]
struct StreamInfo {
    kind: String,
    sample_rate_hz: u16,
    resolution_bits: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    range_g: Option<u16>,
    /// Expected notification length in bytes
    frame_len: usize,
}

#[derive(Serialize)]
struct CommandInfo {
    name: String,
    bytes: String,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

#[derive(Serialize)]
struct SyncInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pulse_high_water_mark: Option<usize>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn stream_info(blueprint: &SessionBlueprint, setting: &StreamSetting) -> StreamInfo {
    StreamInfo {
        kind: setting.kind.as_str().to_string(),
        sample_rate_hz: setting.sample_rate_hz,
        resolution_bits: setting.resolution_bits,
        range_g: setting.range_g,
        frame_len: blueprint.frame.frame_len(setting.kind),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_config_info(blueprint: &SessionBlueprint, args: &InfoArgs) -> ConfigInfo {
    let profile = blueprint.device.profile;

    let streams = profile
        .stream_settings()
        .streams
        .iter()
        .map(|s| stream_info(blueprint, s))
        .collect();

    let commands = if args.commands {
        profile
            .command_sequence()
            .into_iter()
            .map(|c| CommandInfo {
                bytes: hex(&c.bytes),
                name: c.name,
            })
            .collect()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        device: DeviceInfo {
            name: blueprint.device.name.clone(),
            profile: profile.to_string(),
            address: blueprint.device.address.clone(),
        },
        streams,
        commands,
        sinks,
        sync_settings: SyncInfo {
            pulse_high_water_mark: blueprint.sync.pulse_high_water_mark,
        },
    }
}

fn print_config_info(blueprint: &SessionBlueprint, args: &InfoArgs) {
    let info = build_config_info(blueprint, args);

    println!("=== pulsefuse Configuration ===\n");

    println!("Device");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Name: {}", info.device.name);
    match &info.device.address {
        Some(address) => {
            println!("   ├─ Profile: {}", info.device.profile);
            println!("   └─ Address: {}", address);
        }
        None => println!("   └─ Profile: {}", info.device.profile),
    }

    println!("\nStreams ({})", info.streams.len());
    for (i, stream) in info.streams.iter().enumerate() {
        let prefix = if i == info.streams.len() - 1 { "└─" } else { "├─" };
        let range = stream
            .range_g
            .map(|g| format!(", ±{g} g"))
            .unwrap_or_default();
        println!(
            "   {} {} {} Hz, {} bit{} ({} byte frames)",
            prefix,
            stream.kind,
            stream.sample_rate_hz,
            stream.resolution_bits,
            range,
            stream.frame_len
        );
    }

    if !info.commands.is_empty() {
        println!("\nControl Commands ({})", info.commands.len());
        for (i, command) in info.commands.iter().enumerate() {
            let prefix = if i == info.commands.len() - 1 { "└─" } else { "├─" };
            println!("   {} {}: {}", prefix, command.name, command.bytes);
        }
    }

    println!("\nSync Settings");
    match info.sync_settings.pulse_high_water_mark {
        Some(mark) => println!("   └─ Pulse high-water mark: {}", mark),
        None => println!("   └─ Pulse queue: unbounded"),
    }

    if args.sinks {
        println!("\nSinks ({})", blueprint.sinks.len());
        for (i, sink) in info.sinks.iter().enumerate() {
            let prefix = if i == info.sinks.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} ({}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    if profile_fuses(blueprint) {
        println!("\nFused records: pulse channels + held acceleration");
    }

    println!();
}

fn profile_fuses(blueprint: &SessionBlueprint) -> bool {
    blueprint.device.profile.primary_kind() == MeasurementKind::PulseChannels
}
