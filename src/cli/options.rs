use clap::{ArgGroup, Parser, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::build::{ClStandard, Command};
use crate::config::LIBRARY_ENV;

/// Main clcc CLI interface, GCC-flavoured
#[derive(Parser, Debug)]
#[command(name = "clcc")]
#[command(about = "OpenCL offline compiler")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(group(
    ArgGroup::new("mode")
        .args(["list", "compile", "syntax_only", "assemble"])
        .multiple(false)
))]
pub struct ClccCli {
    /// List OpenCL platforms and devices
    #[arg(short = 'l')]
    pub list: bool,

    /// Compile source code to binary object (OpenCL 1.2+)
    #[arg(short = 'c')]
    pub compile: bool,

    /// Build program and discard produced object
    #[arg(long = "fsyntax-only")]
    pub syntax_only: bool,

    /// Build program and produce assembly listing (AMD platform only)
    #[arg(short = 'S')]
    pub assemble: bool,

    /// Target OpenCL standard version (1.0, 1.1, 1.2, 2.0, 2.1)
    #[arg(long = "std", value_name = "VERSION")]
    pub standard: Option<ClStandard>,

    /// Generate debug info (where applicable)
    #[arg(short = 'g')]
    pub debug: bool,

    /// Target OpenCL platform: 1-based number or vendor name
    #[arg(short = 'p', long = "platform", allow_negative_numbers = true)]
    pub platform: Option<String>,

    /// Target OpenCL device (1-based)
    #[arg(short = 'd', long = "device", default_value_t = 1)]
    pub device: usize,

    /// Include directory paths
    #[arg(short = 'I', value_name = "DIR")]
    pub include: Vec<PathBuf>,

    /// Output file name (object file)
    #[arg(short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Input file name (source file)
    #[arg(required_unless_present = "list")]
    pub input: Option<PathBuf>,

    /// Only consider devices physically present in the system
    #[arg(long)]
    pub online_only: bool,

    /// OpenCL library to load instead of the system default
    #[arg(long = "opencl-library", value_name = "PATH", env = LIBRARY_ENV)]
    pub opencl_library: Option<PathBuf>,

    /// Output format for the device listing
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// What one invocation does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    List,
    Compile(Command),
}

impl ClccCli {
    /// Parse process arguments after rewriting GCC-style flags
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    pub fn mode(&self) -> Mode {
        if self.list {
            Mode::List
        } else if self.compile {
            Mode::Compile(Command::CompileOnly)
        } else if self.syntax_only {
            Mode::Compile(Command::CheckOnly)
        } else if self.assemble {
            Mode::Compile(Command::Assemble)
        } else {
            Mode::Compile(Command::Build)
        }
    }
}

/// Rewrite single-dash long flags (`-std=1.2`, `-fsyntax-only`) into the
/// double-dash form clap understands. Arguments after `--` are untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            match arg.to_str() {
                Some("--") => {
                    passthrough = true;
                    arg
                }
                Some("-fsyntax-only") => OsString::from("--fsyntax-only"),
                Some("-std") => OsString::from("--std"),
                Some(flag) if flag.starts_with("-std=") => OsString::from(format!("-{flag}")),
                _ => arg,
            }
        })
        .collect()
}
