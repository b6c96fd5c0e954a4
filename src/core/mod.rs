//! Core types shared by the engines.
//!
//! This module contains the error taxonomy, configuration loading and the
//! external process runner.

mod config;
mod error;
mod process;

pub use config::{CaptureConfig, Config, GeneralConfig, HealthConfig, TemplateConfig};
pub use error::{EngineError, EngineResult};
pub use process::{ExitState, Invocation, ProcessOutput, ProcessRunner, SystemRunner};
