#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::ref_option)]

//! # Kaskflow
//!
//! Workflow execution and health assessment for software projects.
//!
//! Kaskflow runs named workflows against registered projects and scores a
//! project's health by probing it with the tools of its own ecosystem.
//!
//! ## Features
//!
//! - **Health Assessment**: Build, test, lint, security and deployment probes for
//!   Node, Go, Python, Rust, Maven and Gradle projects, reduced to a 0-100 score
//! - **Recommendations**: Ordered next steps, errors, warnings and suggestions
//! - **Workflows**: Asset generation, state checks, full analysis and git sync with
//!   a tracked execution lifecycle
//! - **Templates**: Built-in and user-defined workflow presets
//! - **Deadlines**: Every external tool runs with a timeout
//!
//! ## Quick Start
//!
//! ```bash
//! # Register a project
//! kaskflow project add ~/src/my-app
//!
//! # Assess it
//! kaskflow check <project-id>
//!
//! # Run a workflow
//! kaskflow run --template quick_health_check --project <project-id>
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::redundant_clone)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::use_self)]

pub mod core;
pub mod health;
pub mod media;
pub mod storage;
pub mod workflow;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use core::{Config, EngineError, EngineResult, ProcessRunner, SystemRunner};
pub use health::{CategorySelection, CategoryStatus, HealthChecker, HealthSnapshot, ProjectState};
pub use media::{Artifact, CaptureKind, MediaCapture, ToolCapture};
pub use storage::{JsonStore, MemoryStore, Project};
pub use workflow::{
    ExecutionStatus, HandlerRegistry, TemplateCatalog, TriggerRequest, TriggerType, WorkflowConfig,
    WorkflowEngine, WorkflowExecution, WorkflowResult, WorkflowTrigger, WorkflowType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "kaskflow";
