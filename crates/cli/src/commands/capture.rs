//! `capture` command implementation.

use anyhow::{Context, Result};
use session::{write_capture, MockDevice, MockDeviceConfig};
use tracing::info;

use crate::cli::CaptureArgs;

/// Execute the `capture` command
///
/// Records a synthetic session of the chosen profile; the file replays
/// through `run --capture`.
pub fn run_capture(args: &CaptureArgs) -> Result<()> {
    let duration = super::positive_seconds("seconds", args.seconds)?;
    let mut device = MockDevice::new(MockDeviceConfig {
        profile: args.profile.into(),
        duration,
        corrupt_every: (args.corrupt_every > 0).then_some(args.corrupt_every),
        ..Default::default()
    });

    let frames = device
        .collect_frames()
        .context("Failed to generate notifications")?;
    write_capture(&args.output, &frames)
        .with_context(|| format!("Failed to write capture {}", args.output.display()))?;

    info!(
        output = %args.output.display(),
        notifications = frames.len(),
        "Capture written"
    );
    println!(
        "Wrote {} notifications to {}",
        frames.len(),
        args.output.display()
    );
    Ok(())
}
