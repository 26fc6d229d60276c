use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info};

use super::options::{ClStandard, CompilerOptions};
use super::platform::{platform_name, select_platform, vendor};
use crate::opencl::query::query_string;
use crate::opencl::types::device_info;
use crate::opencl::{
    platform_devices, platforms, select_device, BuildMode, ClStatus, ClccError, Context, Driver,
    InfoTarget, OptionalEntryPoint, Program, Result,
};

/// What the driver is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Compile and link into a loadable binary
    #[default]
    Build,
    /// Compile into an unlinked object (OpenCL 1.2+)
    CompileOnly,
    /// Full build, result discarded
    CheckOnly,
    /// Build and have the driver write its ISA listing (AMD only)
    Assemble,
}

impl Command {
    fn build_mode(self) -> BuildMode {
        match self {
            Command::CompileOnly => BuildMode::CompileOnly,
            Command::Build | Command::CheckOnly | Command::Assemble => BuildMode::Link,
        }
    }

    /// Whether a successful run hands back the driver's binary
    pub fn emits_binary(self) -> bool {
        matches!(self, Command::Build | Command::CompileOnly)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Build => "build",
            Command::CompileOnly => "compile",
            Command::CheckOnly => "check",
            Command::Assemble => "assemble",
        };
        f.write_str(name)
    }
}

/// Progress through one orchestration, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    Idle,
    PlatformSelected,
    DeviceSelected,
    ContextCreated,
    ProgramCreated,
    Built,
    Succeeded,
    Failed,
    TornDown,
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub command: Command,
    pub source: String,
    /// `-p` value: ordinal or vendor alias
    pub platform: Option<String>,
    /// 1-based device index
    pub device: usize,
    pub standard: Option<ClStandard>,
    pub include_paths: Vec<PathBuf>,
    pub debug: bool,
    pub output: Option<PathBuf>,
    /// Skip the offline-devices enumeration path
    pub online_only: bool,
}

impl BuildRequest {
    pub fn new(command: Command, source: impl Into<String>) -> Self {
        Self {
            command,
            source: source.into(),
            platform: None,
            device: 1,
            standard: None,
            include_paths: Vec::new(),
            debug: false,
            output: None,
            online_only: false,
        }
    }
}

/// Result of a build that reached the driver
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub command: Command,
    pub platform_name: String,
    pub device_name: String,
    pub options: String,
    pub status: ClStatus,
    pub log: String,
    /// Present only for successful build and compile-only runs
    pub binary: Option<Vec<u8>>,
    pub warnings: Vec<String>,
    pub stage: BuildStage,
}

impl BuildOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == 0
    }

    /// Text to show the user: the driver log, or a generic failure line
    pub fn diagnostics(&self) -> Option<String> {
        if !self.log.is_empty() {
            Some(self.log.clone())
        } else if !self.succeeded() {
            Some("Program build failed".to_string())
        } else {
            None
        }
    }
}

/// Drives one build from platform selection through teardown
pub struct BuildOrchestrator<'d> {
    driver: &'d dyn Driver,
    stage: BuildStage,
}

impl<'d> BuildOrchestrator<'d> {
    pub fn new(driver: &'d dyn Driver) -> Self {
        Self {
            driver,
            stage: BuildStage::Idle,
        }
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    fn advance(&mut self, stage: BuildStage) {
        debug!("Build stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    pub fn run(&mut self, request: &BuildRequest) -> Result<BuildOutcome> {
        self.stage = BuildStage::Idle;
        let result = self.run_stages(request);
        self.advance(BuildStage::TornDown);
        result.map(|mut outcome| {
            outcome.stage = BuildStage::TornDown;
            outcome
        })
    }

    fn run_stages(&mut self, request: &BuildRequest) -> Result<BuildOutcome> {
        let driver = self.driver;
        if request.command == Command::CompileOnly
            && !driver.supports(OptionalEntryPoint::CompileProgram)
        {
            return Err(ClccError::unsupported(
                "clCompileProgram",
                "separate compilation requires an OpenCL 1.2 driver",
            ));
        }

        let available = platforms(driver)?;
        let platform = select_platform(driver, &available, request.platform.as_deref())?;
        let platform_name = platform_name(driver, platform)?;
        self.advance(BuildStage::PlatformSelected);
        info!("Selected platform {}", platform_name);

        if request.command == Command::Assemble && platform_name != vendor::AMD {
            return Err(ClccError::unsupported(
                "clBuildProgram",
                format!("assembly listings are only produced by the {} platform", vendor::AMD),
            ));
        }

        let devices = platform_devices(driver, platform, request.online_only)?;
        let device = select_device(devices, request.device)?;
        let device_name = query_string(driver, InfoTarget::Device(device.id()), device_info::NAME)?;
        self.advance(BuildStage::DeviceSelected);
        info!("Selected device {} ({})", request.device, device_name);

        let compiler_options = CompilerOptions {
            standard: request.standard,
            include_paths: request.include_paths.clone(),
            debug: request.debug,
            save_temps: (request.command == Command::Assemble).then(|| {
                request
                    .output
                    .as_ref()
                    .map(|output| output.with_extension(""))
            }),
        };
        let options = compiler_options.render(&platform_name);

        let context = Context::create(driver, platform, &[device.id()])?;
        self.advance(BuildStage::ContextCreated);

        let program = Program::with_source(driver, &context, &request.source)?;
        self.advance(BuildStage::ProgramCreated);

        let built = program.build(&device, &options, request.command.build_mode())?;
        self.advance(BuildStage::Built);

        let log = built.build_log()?;
        let status = built.status();
        if built.succeeded() {
            self.advance(BuildStage::Succeeded);
        } else {
            self.advance(BuildStage::Failed);
            debug!("{} returned status {}", request.command, status);
        }

        let mut warnings = Vec::new();
        if request.command == Command::CheckOnly && request.output.is_some() {
            warnings.push("option -o is ignored due to -fsyntax-only".to_string());
        }
        let binary = if request.command.emits_binary() && built.succeeded() {
            Some(built.binary()?)
        } else {
            None
        };

        // Guards release program, context and device in reverse order here
        drop(built);
        drop(context);
        drop(device);

        Ok(BuildOutcome {
            command: request.command,
            platform_name,
            device_name,
            options,
            status,
            log,
            binary,
            warnings,
            stage: self.stage,
        })
    }
}
