use std::process::ExitCode;

use anyhow::Result;
use clcc::cli::{execute, print_error, ClccCli, RunStatus, SeverityFormat};
use clcc::config::DriverConfig;
use tracing::debug;

fn main() -> ExitCode {
    let cli = ClccCli::parse_args();

    // Initialize tracing
    let level = match cli.verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .event_format(SeverityFormat)
        .init();

    match run(&cli) {
        Ok(RunStatus::Success) => ExitCode::SUCCESS,
        Ok(RunStatus::BuildFailed) => ExitCode::FAILURE,
        Err(err) => {
            print_error(err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &ClccCli) -> Result<RunStatus> {
    let config = DriverConfig::with_library(cli.opencl_library.as_deref());
    let library = config.load()?;
    debug!("Loaded OpenCL library {}", library.path());

    Ok(execute(&library, cli)?)
}
