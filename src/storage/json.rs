//! JSON-file store.
//!
//! Each collection lives in its own pretty-printed JSON array under the data
//! directory. Every operation loads the collection, mutates it and writes it
//! back while holding the store lock, so a single process never interleaves
//! two writes to the same file.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::{AssetStore, ExecutionStore, Project, ProjectStore, StateStore};
use crate::core::{EngineError, EngineResult};
use crate::health::ProjectState;
use crate::media::Artifact;
use crate::workflow::WorkflowExecution;

const PROJECTS_FILE: &str = "projects.json";
const EXECUTIONS_FILE: &str = "executions.json";
const STATES_FILE: &str = "states.json";
const ASSETS_FILE: &str = "assets.json";

/// Store persisting every collection as JSON files in a directory.
#[derive(Debug)]
pub struct JsonStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> EngineResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, lock: Mutex::new(()) })
    }

    /// Directory holding the collection files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> EngineResult<Vec<T>> {
        let path = self.root.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save<T: Serialize>(&self, file: &str, records: &[T]) -> EngineResult<()> {
        let path = self.root.join(file);
        let tmp = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(records)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Load a collection, let `f` mutate it, and write it back.
    fn modify<T, R, F>(&self, file: &str, f: F) -> EngineResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> EngineResult<R>,
    {
        let _guard = self.lock.lock();
        let mut records = self.load(file)?;
        let out = f(&mut records)?;
        self.save(file, &records)?;
        Ok(out)
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> EngineResult<Vec<T>> {
        let _guard = self.lock.lock();
        self.load(file)
    }
}

impl ProjectStore for JsonStore {
    fn create_project(&self, project: &Project) -> EngineResult<()> {
        self.modify(PROJECTS_FILE, |projects: &mut Vec<Project>| {
            if projects.iter().any(|p| p.id == project.id) {
                return Err(EngineError::Storage(format!("project {} already exists", project.id)));
            }
            projects.push(project.clone());
            Ok(())
        })
    }

    fn get_project(&self, id: Uuid) -> EngineResult<Project> {
        self.read::<Project>(PROJECTS_FILE)?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| EngineError::not_found("project", id))
    }

    fn list_projects(&self) -> EngineResult<Vec<Project>> {
        self.read(PROJECTS_FILE)
    }
}

impl ExecutionStore for JsonStore {
    fn create_execution(&self, execution: &WorkflowExecution) -> EngineResult<()> {
        self.modify(EXECUTIONS_FILE, |executions: &mut Vec<WorkflowExecution>| {
            if executions.iter().any(|e| e.id == execution.id) {
                return Err(EngineError::Storage(format!(
                    "workflow execution {} already exists",
                    execution.id
                )));
            }
            executions.push(execution.clone());
            Ok(())
        })
    }

    fn update_execution(&self, execution: &WorkflowExecution) -> EngineResult<()> {
        self.modify(EXECUTIONS_FILE, |executions: &mut Vec<WorkflowExecution>| {
            let slot = executions
                .iter_mut()
                .find(|e| e.id == execution.id)
                .ok_or_else(|| EngineError::not_found("workflow execution", execution.id))?;
            *slot = execution.clone();
            Ok(())
        })
    }

    fn get_execution(&self, id: Uuid) -> EngineResult<WorkflowExecution> {
        self.read::<WorkflowExecution>(EXECUTIONS_FILE)?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| EngineError::not_found("workflow execution", id))
    }

    fn list_executions(&self, project_id: Uuid) -> EngineResult<Vec<WorkflowExecution>> {
        Ok(self
            .read::<WorkflowExecution>(EXECUTIONS_FILE)?
            .into_iter()
            .filter(|e| e.project_id == project_id)
            .collect())
    }
}

impl StateStore for JsonStore {
    fn get_state(&self, project_id: Uuid) -> EngineResult<Option<ProjectState>> {
        Ok(self
            .read::<ProjectState>(STATES_FILE)?
            .into_iter()
            .find(|s| s.project_id == project_id))
    }

    fn create_state(&self, state: &ProjectState) -> EngineResult<()> {
        self.modify(STATES_FILE, |states: &mut Vec<ProjectState>| {
            if states.iter().any(|s| s.project_id == state.project_id) {
                return Err(EngineError::Storage(format!(
                    "project state for {} already exists",
                    state.project_id
                )));
            }
            states.push(state.clone());
            Ok(())
        })
    }

    fn update_state(&self, state: &ProjectState) -> EngineResult<()> {
        self.modify(STATES_FILE, |states: &mut Vec<ProjectState>| {
            let slot = states
                .iter_mut()
                .find(|s| s.id == state.id)
                .ok_or_else(|| EngineError::not_found("project state", state.id))?;
            *slot = state.clone();
            Ok(())
        })
    }
}

impl AssetStore for JsonStore {
    fn record_asset(&self, artifact: &Artifact) -> EngineResult<()> {
        self.modify(ASSETS_FILE, |assets: &mut Vec<Artifact>| {
            assets.push(artifact.clone());
            Ok(())
        })
    }

    fn list_assets(&self, project_id: Uuid) -> EngineResult<Vec<Artifact>> {
        Ok(self
            .read::<Artifact>(ASSETS_FILE)?
            .into_iter()
            .filter(|a| a.project_id == project_id)
            .collect())
    }
}
