//! In-memory store.

use parking_lot::Mutex;
use uuid::Uuid;

use super::{AssetStore, ExecutionStore, Project, ProjectStore, StateStore};
use crate::core::{EngineError, EngineResult};
use crate::health::ProjectState;
use crate::media::Artifact;
use crate::workflow::WorkflowExecution;

/// Store that keeps every collection in memory.
///
/// Collections are insertion-ordered vectors; lookups are linear, which is
/// fine for the handful of records a test or a single process holds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: Mutex<Vec<Project>>,
    executions: Mutex<Vec<WorkflowExecution>>,
    states: Mutex<Vec<ProjectState>>,
    assets: Mutex<Vec<Artifact>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryStore {
    fn create_project(&self, project: &Project) -> EngineResult<()> {
        let mut projects = self.projects.lock();
        if projects.iter().any(|p| p.id == project.id) {
            return Err(EngineError::Storage(format!("project {} already exists", project.id)));
        }
        projects.push(project.clone());
        Ok(())
    }

    fn get_project(&self, id: Uuid) -> EngineResult<Project> {
        self.projects
            .lock()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("project", id))
    }

    fn list_projects(&self) -> EngineResult<Vec<Project>> {
        Ok(self.projects.lock().clone())
    }
}

impl ExecutionStore for MemoryStore {
    fn create_execution(&self, execution: &WorkflowExecution) -> EngineResult<()> {
        let mut executions = self.executions.lock();
        if executions.iter().any(|e| e.id == execution.id) {
            return Err(EngineError::Storage(format!(
                "workflow execution {} already exists",
                execution.id
            )));
        }
        executions.push(execution.clone());
        Ok(())
    }

    fn update_execution(&self, execution: &WorkflowExecution) -> EngineResult<()> {
        let mut executions = self.executions.lock();
        let slot = executions
            .iter_mut()
            .find(|e| e.id == execution.id)
            .ok_or_else(|| EngineError::not_found("workflow execution", execution.id))?;
        *slot = execution.clone();
        Ok(())
    }

    fn get_execution(&self, id: Uuid) -> EngineResult<WorkflowExecution> {
        self.executions
            .lock()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("workflow execution", id))
    }

    fn list_executions(&self, project_id: Uuid) -> EngineResult<Vec<WorkflowExecution>> {
        Ok(self.executions.lock().iter().filter(|e| e.project_id == project_id).cloned().collect())
    }
}

impl StateStore for MemoryStore {
    fn get_state(&self, project_id: Uuid) -> EngineResult<Option<ProjectState>> {
        Ok(self.states.lock().iter().find(|s| s.project_id == project_id).cloned())
    }

    fn create_state(&self, state: &ProjectState) -> EngineResult<()> {
        let mut states = self.states.lock();
        if states.iter().any(|s| s.project_id == state.project_id) {
            return Err(EngineError::Storage(format!(
                "project state for {} already exists",
                state.project_id
            )));
        }
        states.push(state.clone());
        Ok(())
    }

    fn update_state(&self, state: &ProjectState) -> EngineResult<()> {
        let mut states = self.states.lock();
        let slot = states
            .iter_mut()
            .find(|s| s.id == state.id)
            .ok_or_else(|| EngineError::not_found("project state", state.id))?;
        *slot = state.clone();
        Ok(())
    }
}

impl AssetStore for MemoryStore {
    fn record_asset(&self, artifact: &Artifact) -> EngineResult<()> {
        self.assets.lock().push(artifact.clone());
        Ok(())
    }

    fn list_assets(&self, project_id: Uuid) -> EngineResult<Vec<Artifact>> {
        Ok(self.assets.lock().iter().filter(|a| a.project_id == project_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_roundtrip() {
        let store = MemoryStore::new();
        let project = Project::new("demo", "/tmp");

        store.create_project(&project).unwrap();
        assert_eq!(store.get_project(project.id).unwrap(), project);
        assert_eq!(store.list_projects().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_project_rejected() {
        let store = MemoryStore::new();
        let project = Project::new("demo", "/tmp");

        store.create_project(&project).unwrap();
        assert!(matches!(store.create_project(&project), Err(EngineError::Storage(_))));
    }

    #[test]
    fn test_missing_project_is_not_found() {
        let store = MemoryStore::new();
        assert!(store.get_project(Uuid::new_v4()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_state_update_requires_existing_record() {
        let store = MemoryStore::new();
        let state = ProjectState::new(Uuid::new_v4());

        assert!(store.update_state(&state).unwrap_err().is_not_found());

        store.create_state(&state).unwrap();
        store.update_state(&state).unwrap();
        assert!(store.get_state(state.project_id).unwrap().is_some());
    }
}
