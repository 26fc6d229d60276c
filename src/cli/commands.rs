use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::build::{BuildOrchestrator, BuildOutcome, BuildRequest, Command};
use crate::cli::listing::collect_listing;
use crate::cli::options::{ClccCli, Mode, OutputFormat};
use crate::cli::output::{print_build_outcome, print_listing, print_listing_json};
use crate::opencl::{ClccError, Driver, Result};

/// How a completed invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// The driver rejected the program; its log has been printed
    BuildFailed,
}

/// Execute the mode selected on the command line
pub fn execute(driver: &dyn Driver, cli: &ClccCli) -> Result<RunStatus> {
    match cli.mode() {
        Mode::List => {
            list_devices(driver, cli)?;
            Ok(RunStatus::Success)
        }
        Mode::Compile(command) => {
            let input = cli
                .input
                .as_deref()
                .ok_or_else(|| ClccError::Usage("no input file specified".to_string()))?;
            let outcome = compile_file(driver, cli, command, input)?;
            Ok(if outcome.succeeded() {
                RunStatus::Success
            } else {
                RunStatus::BuildFailed
            })
        }
    }
}

fn list_devices(driver: &dyn Driver, cli: &ClccCli) -> Result<()> {
    let listing = collect_listing(driver, cli.standard, cli.online_only)?;
    let written = match cli.format {
        OutputFormat::Text => print_listing(&listing),
        OutputFormat::Json => print_listing_json(&listing).map_err(std::io::Error::from),
    };
    written.map_err(|source| ClccError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    })
}

/// Read `input`, run the build, report diagnostics and write the binary
pub fn compile_file(
    driver: &dyn Driver,
    cli: &ClccCli,
    command: Command,
    input: &Path,
) -> Result<BuildOutcome> {
    let source = fs::read_to_string(input).map_err(|source| ClccError::Io {
        path: input.to_path_buf(),
        source,
    })?;

    let request = BuildRequest {
        command,
        source,
        platform: cli.platform.clone(),
        device: cli.device,
        standard: cli.standard,
        include_paths: cli.include.clone(),
        debug: cli.debug,
        output: cli.output.clone(),
        online_only: cli.online_only,
    };

    let outcome = BuildOrchestrator::new(driver).run(&request)?;
    print_build_outcome(&outcome);

    if let Some(binary) = &outcome.binary {
        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(input, command));
        fs::write(&output, binary).map_err(|source| ClccError::Io {
            path: output.clone(),
            source,
        })?;
        info!("Wrote {} bytes to {}", binary.len(), output.display());
    }

    Ok(outcome)
}

/// `kernel.cl` becomes `kernel.o` for objects and `kernel.bin` otherwise
pub fn default_output_path(input: &Path, command: Command) -> PathBuf {
    let extension = match command {
        Command::CompileOnly => "o",
        _ => "bin",
    };
    input.with_extension(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_paths() {
        assert_eq!(
            default_output_path(Path::new("src/kernel.cl"), Command::CompileOnly),
            PathBuf::from("src/kernel.o")
        );
        assert_eq!(
            default_output_path(Path::new("kernel.cl"), Command::Build),
            PathBuf::from("kernel.bin")
        );
        assert_eq!(
            default_output_path(Path::new("kernel"), Command::Build),
            PathBuf::from("kernel.bin")
        );
    }
}
