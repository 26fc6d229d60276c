//! Source-to-binary orchestration on top of the OpenCL layer

pub mod options;
pub mod orchestrator;
pub mod platform;

pub use options::{ClStandard, CompilerOptions};
pub use orchestrator::{BuildOrchestrator, BuildOutcome, BuildRequest, BuildStage, Command};
pub use platform::{driver_name_for_alias, select_platform, PlatformSelector};
