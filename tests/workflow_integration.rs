//! Workflow Integration Tests
//!
//! Drives the workflow engine end-to-end against a JSON store on disk, with
//! external tools answered by a fake runner.

use std::fs;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;

use kaskflow::storage::{ExecutionStore, ProjectStore, StateStore};
use kaskflow::{
    CategoryStatus, EngineError, EngineResult, ExecutionStatus, HandlerRegistry, HealthChecker,
    JsonStore, Project, ProcessRunner, ToolCapture, TriggerRequest, WorkflowConfig,
    WorkflowEngine, WorkflowTrigger,
};
use kaskflow::core::{Invocation, ProcessOutput};

const JEST_SUMMARY: &str = "Statements   : 92% ( 184/200 )";

/// Answers every command with success, except those starting with a failing prefix.
#[derive(Default)]
struct FakeTools {
    failing: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl FakeTools {
    fn failing(prefixes: &[&'static str]) -> Self {
        Self { failing: prefixes.to_vec(), calls: Mutex::new(Vec::new()) }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl ProcessRunner for FakeTools {
    fn run(&self, invocation: &Invocation) -> EngineResult<ProcessOutput> {
        let line = invocation.display();
        self.calls.lock().push(line.clone());

        if self.failing.iter().any(|prefix| line.starts_with(prefix)) {
            return Ok(ProcessOutput::exited(1, ""));
        }
        Ok(ProcessOutput::exited(0, JEST_SUMMARY))
    }
}

struct Fixture {
    data: TempDir,
    project_dir: TempDir,
    store: Arc<JsonStore>,
    tools: Arc<FakeTools>,
    engine: WorkflowEngine,
}

impl Fixture {
    fn new(tools: FakeTools) -> Self {
        let data = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();
        fs::write(project_dir.path().join("package.json"), "{}").unwrap();

        let store = Arc::new(JsonStore::open(data.path()).unwrap());
        let tools = Arc::new(tools);

        let checker = Arc::new(HealthChecker::new(store.clone(), store.clone(), tools.clone()));
        let media = Arc::new(ToolCapture::new(tools.clone(), store.clone(), data.path()));
        let engine = WorkflowEngine::new(store.clone(), HandlerRegistry::new(checker, media));

        Self { data, project_dir, store, tools, engine }
    }

    fn register(&self) -> Project {
        let project = Project::new("web", self.project_dir.path());
        self.store.create_project(&project).unwrap();
        project
    }
}

fn request(project: &Project, workflow_type: &str, configuration: Value) -> TriggerRequest {
    TriggerRequest {
        project_id: project.id,
        workflow_type: workflow_type.to_string(),
        trigger_type: "manual".to_string(),
        configuration,
        triggered_by: "alice".to_string(),
    }
}

// ============================================================================
// State Check
// ============================================================================

#[test]
fn test_state_check_scores_and_persists() {
    let fixture = Fixture::new(FakeTools::default());
    let project = fixture.register();

    let result = fixture.engine.execute_request(request(&project, "state_check", json!({}))).unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert!(result.errors.is_empty());
    // build 25 + test 20 + security 15 + coverage 15; no linter or deployment markers
    assert_eq!(result.result["health_score"], json!(75));
    assert_eq!(result.result["build_status"], json!("success"));
    assert_eq!(result.result["lint_status"], json!("unknown"));
    assert_eq!(result.result["coverage"], json!(92.0));
    assert_eq!(
        result.result["suggestions"],
        json!(["Consider adding deployment configuration"])
    );

    assert_eq!(
        fixture.tools.calls(),
        vec!["npm run build", "npm test -- --coverage", "npm audit"]
    );

    // A fresh store over the same directory sees the persisted state.
    let reopened = JsonStore::open(fixture.data.path()).unwrap();
    let state = reopened.get_state(project.id).unwrap().unwrap();
    assert_eq!(state.health_score, 75);
    assert_eq!(state.statuses.test, CategoryStatus::Success);

    let executions = reopened.list_executions(project.id).unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, ExecutionStatus::Completed);
    assert!(executions[0].completed_at.is_some());
}

#[test]
fn test_state_check_reports_failing_build() {
    let fixture = Fixture::new(FakeTools::failing(&["npm run build"]));
    let project = fixture.register();

    let result = fixture.engine.execute_request(request(&project, "state_check", json!({}))).unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.result["build_status"], json!("failure"));
    assert_eq!(result.result["health_score"], json!(40));
    assert_eq!(result.result["errors"], json!(["Build is failing"]));
    assert_eq!(result.result["next_steps"], json!(["Fix build errors"]));
}

#[test]
fn test_repeated_checks_update_one_state_record() {
    let fixture = Fixture::new(FakeTools::default());
    let project = fixture.register();

    fixture.engine.execute_request(request(&project, "state_check", json!({}))).unwrap();
    let first = fixture.store.get_state(project.id).unwrap().unwrap();

    fixture
        .engine
        .execute_request(request(&project, "state_check", json!({"check_security": false})))
        .unwrap();
    let second = fixture.store.get_state(project.id).unwrap().unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.statuses.security, CategoryStatus::Unknown);
    assert_eq!(second.health_score, 60);
}

#[test]
fn test_state_check_on_unregistered_project_fails() {
    let fixture = Fixture::new(FakeTools::default());
    let ghost = Project::new("ghost", fixture.project_dir.path());

    let result = fixture.engine.execute_request(request(&ghost, "state_check", json!({}))).unwrap();

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("failed to check project state"));

    let stored = fixture.engine.execution(result.execution_id).unwrap();
    assert_eq!(stored.status, ExecutionStatus::Failed);
    assert!(fixture.tools.calls().is_empty());
}

// ============================================================================
// Full Analysis
// ============================================================================

#[test]
fn test_full_analysis_survives_screenshot_failure() {
    // The fake browser "succeeds" but never writes the screenshot file.
    let fixture = Fixture::new(FakeTools::default());
    let project = fixture.register();

    let result = fixture
        .engine
        .execute_request(request(
            &project,
            "full_analysis",
            json!({"analysis_url": "http://localhost:3000"}),
        ))
        .unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert!(result.artifacts.is_empty());
    assert!(!result.result.contains_key("analysis_screenshot_id"));
    assert_eq!(result.result["asset_summary"], json!({"total_assets": 0, "asset_types": {}}));
    assert!(fixture.tools.calls().iter().any(|c| c.contains("--screenshot=")));
}

// ============================================================================
// Rejected Triggers
// ============================================================================

#[test]
fn test_unknown_workflow_type_is_recorded_as_failed() {
    let fixture = Fixture::new(FakeTools::default());
    let project = fixture.register();

    let result = fixture.engine.execute_request(request(&project, "deploy", json!({}))).unwrap();

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.errors, vec!["unknown workflow type: deploy"]);

    let stored = fixture.engine.executions_for_project(project.id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].workflow_type, "deploy");
    assert!(stored[0].configuration.is_none());
}

#[test]
fn test_unknown_trigger_type_persists_nothing() {
    let fixture = Fixture::new(FakeTools::default());
    let project = fixture.register();

    let mut bad = request(&project, "git_sync", json!({}));
    bad.trigger_type = "cron".to_string();

    let err = fixture.engine.execute_request(bad).unwrap_err();
    assert!(matches!(err, EngineError::UnknownTriggerType(_)));
    assert!(fixture.engine.executions_for_project(project.id).unwrap().is_empty());
}

// ============================================================================
// Scheduling & Cancellation
// ============================================================================

#[test]
fn test_scheduled_execution_dispatches_once() {
    let fixture = Fixture::new(FakeTools::default());
    let project = fixture.register();

    let trigger = WorkflowTrigger::manual(
        project.id,
        WorkflowConfig::from_parts("git_sync".parse().unwrap(), json!({})).unwrap(),
        "cron",
    );
    let pending = fixture.engine.schedule(&trigger, Utc::now() + ChronoDuration::hours(1)).unwrap();
    assert_eq!(pending.status, ExecutionStatus::Pending);
    assert!(pending.started_at.is_none());

    let result = fixture.engine.dispatch_scheduled(pending.id).unwrap();
    assert_eq!(result.execution_id, pending.id);
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.result["sync_completed"], json!(true));

    let err = fixture.engine.dispatch_scheduled(pending.id).unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}

#[test]
fn test_cancelled_schedule_cannot_be_dispatched() {
    let fixture = Fixture::new(FakeTools::default());
    let project = fixture.register();

    let trigger = WorkflowTrigger::manual(
        project.id,
        WorkflowConfig::from_parts("state_check".parse().unwrap(), json!({})).unwrap(),
        "cron",
    );
    let pending = fixture.engine.schedule(&trigger, Utc::now()).unwrap();

    let cancelled = fixture.engine.cancel(pending.id).unwrap();
    assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
    assert_eq!(cancelled.error_message.as_deref(), Some(kaskflow::workflow::CANCELLED_MESSAGE));

    let err = fixture.engine.dispatch_scheduled(pending.id).unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
    assert!(fixture.tools.calls().is_empty());
}

#[test]
fn test_cancel_completed_execution_is_rejected() {
    let fixture = Fixture::new(FakeTools::default());
    let project = fixture.register();

    let result = fixture.engine.execute_request(request(&project, "git_sync", json!({}))).unwrap();
    let err = fixture.engine.cancel(result.execution_id).unwrap_err();

    assert_eq!(
        err.to_string(),
        "cannot cancel workflow execution with status: completed"
    );
}
