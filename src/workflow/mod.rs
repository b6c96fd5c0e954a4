//! Workflow execution.
//!
//! A workflow run goes through three stages:
//!
//! - A [`TriggerRequest`] is validated into a [`WorkflowTrigger`] with a typed
//!   [`WorkflowConfig`]
//! - The [`WorkflowEngine`] records a [`WorkflowExecution`] and dispatches to
//!   the handler for the config variant
//! - The record is finalized and a [`WorkflowResult`] is returned
//!
//! ## Workflow types
//!
//! - `asset_generation` - screenshots and videos
//! - `state_check` - health assessment
//! - `full_analysis` - health assessment plus best-effort screenshot
//! - `git_sync` - sync timestamp

mod engine;
mod handlers;
mod templates;
mod types;

pub use engine::WorkflowEngine;
pub use handlers::{
    AssetGenerationHandler, FullAnalysisHandler, GitSyncHandler, HandlerContext, HandlerOutput,
    HandlerRegistry, StateCheckHandler, WorkflowHandler,
};
pub use templates::{TemplateCatalog, WorkflowTemplate};
pub use types::{
    AssetGenerationConfig, ExecutionStatus, FullAnalysisConfig, GitSyncConfig, StateCheckConfig,
    TriggerRequest, TriggerType, WorkflowConfig, WorkflowExecution, WorkflowResult,
    WorkflowTrigger, WorkflowType, CANCELLED_MESSAGE, MAX_VIDEO_DURATION,
};
