//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::SessionBlueprint;
use std::time::Duration;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{InputSource, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let blueprint = load_blueprint(&args.config)?;
    let input = input_source(args)?;

    info!(
        device = %blueprint.device.name,
        profile = %blueprint.device.profile,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint, &input);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        input,
        max_records: (args.max_records > 0).then_some(args.max_records),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let shutdown = async move {
        match timeout {
            Some(limit) => tokio::select! {
                _ = shutdown_signal() => {}
                _ = tokio::time::sleep(limit) => {
                    warn!(timeout_secs = limit.as_secs(), "Pipeline timed out");
                }
            },
            None => shutdown_signal().await,
        }
    };

    info!("Starting pipeline...");
    let stats = Pipeline::new(pipeline_config)
        .run(shutdown)
        .await
        .context("Pipeline execution failed")?;

    info!(
        stop_reason = ?stats.report.stop_reason,
        fused = stats.report.fused,
        rejected = stats.report.rejected,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );

    if args.json {
        let json =
            serde_json::to_string_pretty(&stats).context("Failed to serialize run report")?;
        println!("{}", json);
    } else {
        stats.print_summary();
    }

    if stats.report.notifications > 0 && stats.report.decoded == 0 {
        return Err(CliError::pipeline_execution("no notification could be decoded").into());
    }

    info!("pulsefuse finished");
    Ok(())
}

fn input_source(args: &RunArgs) -> Result<InputSource, CliError> {
    if args.speed < 0.0 || !args.speed.is_finite() {
        return Err(CliError::invalid_argument("speed", "must be a finite value >= 0"));
    }

    if let Some(path) = &args.capture {
        return Ok(InputSource::Capture {
            path: path.clone(),
            speed: (args.speed > 0.0).then_some(args.speed),
        });
    }

    Ok(InputSource::Mock {
        duration: super::positive_seconds("mock-seconds", args.mock_seconds)?,
        pace: args.realtime.then_some(1.0),
    })
}

/// Resolves on Ctrl+C or SIGTERM; never resolves if no handler could be
/// installed
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping pipeline...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &SessionBlueprint, input: &InputSource) {
    println!("\n=== Configuration Summary ===\n");
    println!("Device:");
    println!("  Name: {}", blueprint.device.name);
    println!("  Profile: {}", blueprint.device.profile);
    if let Some(ref address) = blueprint.device.address {
        println!("  Address: {}", address);
    }

    println!("\nInput:");
    match input {
        InputSource::Mock { duration, pace } => {
            println!("  Synthetic device, {:.1}s", duration.as_secs_f64());
            if pace.is_some() {
                println!("  Paced in real time");
            }
        }
        InputSource::Capture { path, speed } => {
            println!("  Capture: {}", path.display());
            if let Some(speed) = speed {
                println!("  Speed: {}x", speed);
            }
        }
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!("\nSync Settings:");
    match blueprint.sync.pulse_high_water_mark {
        Some(mark) => println!("  Pulse high-water mark: {}", mark),
        None => println!("  Pulse queue unbounded"),
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["pulsefuse", "run"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_default_input_is_mock() {
        let input = input_source(&run_args(&[])).unwrap();
        assert!(matches!(
            input,
            InputSource::Mock { duration, pace: None } if duration == Duration::from_secs(10)
        ));
    }

    #[test]
    fn test_capture_speed_zero_is_unpaced() {
        let input = input_source(&run_args(&["--capture", "a.cap"])).unwrap();
        assert!(matches!(input, InputSource::Capture { speed: None, .. }));
    }

    #[test]
    fn test_rejects_non_positive_mock_seconds() {
        let err = input_source(&run_args(&["--mock-seconds", "0"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { arg: "mock-seconds", .. }));
    }

    #[test]
    fn test_rejects_unrepresentable_mock_seconds() {
        let err = input_source(&run_args(&["--mock-seconds", "1e20"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { arg: "mock-seconds", .. }));
    }

    #[tokio::test]
    async fn test_missing_config_is_reported() {
        let args = run_args(&["--config", "/nonexistent/pulsefuse.toml"]);
        let err = run_pipeline(&args).await.unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }
}
