//! Persistence collaborators.
//!
//! The engines only need simple create/read/update-by-id operations, so each
//! entity gets a small store trait. Two backends implement all of them:
//!
//! - [`MemoryStore`] for tests and embedding
//! - [`JsonStore`] for the CLI, one JSON file per collection

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{EngineError, EngineResult};
use crate::health::ProjectState;
use crate::media::Artifact;
use crate::workflow::WorkflowExecution;

/// A registered project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Free-form metadata; the working directory lives under `"path"`
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// When the project was registered
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a project rooted at `path`.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            metadata: serde_json::json!({ "path": path.to_string_lossy() }),
            created_at: Utc::now(),
        }
    }

    /// Resolve the project's working directory from its metadata.
    ///
    /// Fails with `NotFound` when no path is recorded or it is not a directory.
    pub fn resolve_path(&self) -> EngineResult<PathBuf> {
        let raw = self
            .metadata
            .get("path")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| EngineError::not_found("project path", self.id))?;

        let path = PathBuf::from(shellexpand::tilde(raw).into_owned());
        if !path.is_dir() {
            return Err(EngineError::not_found("project path", path.display()));
        }
        Ok(path)
    }
}

/// Project lookup and registration.
pub trait ProjectStore: Send + Sync {
    /// Store a new project.
    fn create_project(&self, project: &Project) -> EngineResult<()>;

    /// Fetch a project by ID.
    fn get_project(&self, id: Uuid) -> EngineResult<Project>;

    /// All registered projects, oldest first.
    fn list_projects(&self) -> EngineResult<Vec<Project>>;
}

/// Workflow execution records.
pub trait ExecutionStore: Send + Sync {
    /// Store a new execution record.
    fn create_execution(&self, execution: &WorkflowExecution) -> EngineResult<()>;

    /// Overwrite an existing execution record.
    fn update_execution(&self, execution: &WorkflowExecution) -> EngineResult<()>;

    /// Fetch an execution by ID.
    fn get_execution(&self, id: Uuid) -> EngineResult<WorkflowExecution>;

    /// All executions of a project, oldest first.
    fn list_executions(&self, project_id: Uuid) -> EngineResult<Vec<WorkflowExecution>>;
}

/// Latest health state per project.
pub trait StateStore: Send + Sync {
    /// Fetch the state of a project, if it was ever assessed.
    fn get_state(&self, project_id: Uuid) -> EngineResult<Option<ProjectState>>;

    /// Store a new state record.
    fn create_state(&self, state: &ProjectState) -> EngineResult<()>;

    /// Overwrite an existing state record.
    fn update_state(&self, state: &ProjectState) -> EngineResult<()>;
}

/// Captured media artifacts.
pub trait AssetStore: Send + Sync {
    /// Record a new artifact.
    fn record_asset(&self, artifact: &Artifact) -> EngineResult<()>;

    /// All artifacts of a project, oldest first.
    fn list_assets(&self, project_id: Uuid) -> EngineResult<Vec<Artifact>>;
}
