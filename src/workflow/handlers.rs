//! Workflow handlers.
//!
//! Each workflow type has one handler taking its own typed configuration.
//! [`HandlerRegistry`] owns one handler per type and dispatches on the
//! [`WorkflowConfig`] variant.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::types::{
    AssetGenerationConfig, FullAnalysisConfig, GitSyncConfig, StateCheckConfig, WorkflowConfig,
};
use crate::core::EngineResult;
use crate::health::HealthChecker;
use crate::media::{asset_type_counts, Artifact, CaptureRequest, MediaCapture};

/// Facts about the running execution available to handlers.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub execution_id: Uuid,
    pub project_id: Uuid,
    pub triggered_by: String,
}

/// Outputs a handler accumulates while it runs.
///
/// Whatever was recorded before an error is kept on the execution.
#[derive(Debug, Clone, Default)]
pub struct HandlerOutput {
    pub result: Map<String, Value>,
    pub artifacts: Vec<String>,
}

impl HandlerOutput {
    /// Set a result key.
    pub fn insert(&mut self, key: &str, value: Value) {
        self.result.insert(key.to_string(), value);
    }

    /// Append an artifact's file path.
    pub fn push_artifact(&mut self, artifact: &Artifact) {
        self.artifacts.push(artifact.file_path.to_string_lossy().into_owned());
    }
}

/// Runs one workflow type.
pub trait WorkflowHandler {
    /// Typed configuration of the workflow.
    type Config;

    /// Run the workflow, recording results into `output`.
    fn run(
        &self,
        ctx: &HandlerContext,
        config: &Self::Config,
        output: &mut HandlerOutput,
    ) -> EngineResult<()>;
}

/// `asset_generation`: capture the requested media, then summarize assets.
pub struct AssetGenerationHandler {
    media: Arc<dyn MediaCapture>,
}

impl AssetGenerationHandler {
    pub fn new(media: Arc<dyn MediaCapture>) -> Self {
        Self { media }
    }
}

impl WorkflowHandler for AssetGenerationHandler {
    type Config = AssetGenerationConfig;

    fn run(
        &self,
        ctx: &HandlerContext,
        config: &Self::Config,
        output: &mut HandlerOutput,
    ) -> EngineResult<()> {
        if let Some(url) = config.screenshot_url.as_deref().filter(|_| config.generate_screenshots) {
            let request = CaptureRequest::screenshot(ctx.project_id, url, &ctx.triggered_by);
            let artifact = self
                .media
                .capture(&request)
                .map_err(|e| e.context("failed to generate screenshot"))?;
            output.push_artifact(&artifact);
            output.insert("screenshot_id", json!(artifact.id));
        }

        if let Some(url) = config.video_url.as_deref().filter(|_| config.generate_videos) {
            let request =
                CaptureRequest::video(ctx.project_id, url, config.video_duration, &ctx.triggered_by);
            let artifact =
                self.media.capture(&request).map_err(|e| e.context("failed to generate video"))?;
            output.push_artifact(&artifact);
            output.insert("video_id", json!(artifact.id));
        }

        let assets = self
            .media
            .project_assets(ctx.project_id)
            .map_err(|e| e.context("failed to get project assets"))?;
        output.insert("total_assets", json!(assets.len()));
        output.insert("asset_types", json!(asset_type_counts(&assets)));

        Ok(())
    }
}

/// `state_check`: assess the project and record the snapshot fields.
pub struct StateCheckHandler {
    checker: Arc<HealthChecker>,
}

impl StateCheckHandler {
    pub fn new(checker: Arc<HealthChecker>) -> Self {
        Self { checker }
    }
}

impl WorkflowHandler for StateCheckHandler {
    type Config = StateCheckConfig;

    fn run(
        &self,
        ctx: &HandlerContext,
        config: &Self::Config,
        output: &mut HandlerOutput,
    ) -> EngineResult<()> {
        let snapshot = self
            .checker
            .check_project_state_with(ctx.project_id, config.into())
            .map_err(|e| e.context("failed to check project state"))?;

        output.insert("health_score", json!(snapshot.health_score));
        output.insert("build_status", json!(snapshot.statuses.build));
        output.insert("test_status", json!(snapshot.statuses.test));
        output.insert("lint_status", json!(snapshot.statuses.lint));
        output.insert("security_status", json!(snapshot.statuses.security));
        output.insert("deployment_status", json!(snapshot.statuses.deployment));
        output.insert("coverage", json!(snapshot.coverage));
        output.insert("coverage_reported", json!(snapshot.coverage_reported));
        output.insert("next_steps", json!(snapshot.next_steps));
        output.insert("errors", json!(snapshot.errors));
        output.insert("warnings", json!(snapshot.warnings));
        output.insert("suggestions", json!(snapshot.suggestions));

        Ok(())
    }
}

/// `full_analysis`: state check, then best-effort screenshot and summary.
///
/// Only the state check can fail the workflow.
pub struct FullAnalysisHandler {
    state_check: StateCheckHandler,
    media: Arc<dyn MediaCapture>,
}

impl FullAnalysisHandler {
    pub fn new(checker: Arc<HealthChecker>, media: Arc<dyn MediaCapture>) -> Self {
        Self { state_check: StateCheckHandler::new(checker), media }
    }
}

impl WorkflowHandler for FullAnalysisHandler {
    type Config = FullAnalysisConfig;

    fn run(
        &self,
        ctx: &HandlerContext,
        config: &Self::Config,
        output: &mut HandlerOutput,
    ) -> EngineResult<()> {
        self.state_check
            .run(ctx, &config.state_check, output)
            .map_err(|e| e.context("state check failed"))?;

        if let Some(url) = config.analysis_url.as_deref() {
            let request = CaptureRequest::screenshot(ctx.project_id, url, &ctx.triggered_by);
            match self.media.capture(&request) {
                Ok(artifact) => {
                    output.push_artifact(&artifact);
                    output.insert("analysis_screenshot_id", json!(artifact.id));
                }
                Err(e) => tracing::warn!(
                    execution_id = %ctx.execution_id,
                    error = %e,
                    "Failed to generate screenshot during full analysis"
                ),
            }
        }

        if config.include_asset_summary {
            match self.media.project_assets(ctx.project_id) {
                Ok(assets) => output.insert(
                    "asset_summary",
                    json!({
                        "total_assets": assets.len(),
                        "asset_types": asset_type_counts(&assets),
                    }),
                ),
                Err(e) => tracing::warn!(
                    execution_id = %ctx.execution_id,
                    error = %e,
                    "Failed to get project assets during full analysis"
                ),
            }
        }

        Ok(())
    }
}

/// `git_sync`: records the sync time.
#[derive(Debug, Default)]
pub struct GitSyncHandler;

impl WorkflowHandler for GitSyncHandler {
    type Config = GitSyncConfig;

    fn run(
        &self,
        ctx: &HandlerContext,
        _config: &Self::Config,
        output: &mut HandlerOutput,
    ) -> EngineResult<()> {
        tracing::debug!(project_id = %ctx.project_id, "Recording git sync");
        output.insert("sync_completed", json!(true));
        output.insert("sync_timestamp", json!(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)));
        Ok(())
    }
}

/// One handler per workflow type.
pub struct HandlerRegistry {
    asset_generation: AssetGenerationHandler,
    state_check: StateCheckHandler,
    full_analysis: FullAnalysisHandler,
    git_sync: GitSyncHandler,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry").finish_non_exhaustive()
    }
}

impl HandlerRegistry {
    /// Wire every handler to the shared collaborators.
    pub fn new(checker: Arc<HealthChecker>, media: Arc<dyn MediaCapture>) -> Self {
        Self {
            asset_generation: AssetGenerationHandler::new(media.clone()),
            state_check: StateCheckHandler::new(checker.clone()),
            full_analysis: FullAnalysisHandler::new(checker, media),
            git_sync: GitSyncHandler,
        }
    }

    /// Run the handler matching `config`.
    pub fn dispatch(
        &self,
        ctx: &HandlerContext,
        config: &WorkflowConfig,
        output: &mut HandlerOutput,
    ) -> EngineResult<()> {
        match config {
            WorkflowConfig::AssetGeneration(c) => self.asset_generation.run(ctx, c, output),
            WorkflowConfig::StateCheck(c) => self.state_check.run(ctx, c, output),
            WorkflowConfig::FullAnalysis(c) => self.full_analysis.run(ctx, c, output),
            WorkflowConfig::GitSync(c) => self.git_sync.run(ctx, c, output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineError, ProcessOutput};
    use crate::media::ToolCapture;
    use crate::storage::{MemoryStore, Project, ProjectStore, StateStore};
    use crate::testing::{project_dir, ScriptedRunner};
    use tempfile::TempDir;

    struct Fixture {
        _data: TempDir,
        _project: TempDir,
        store: Arc<MemoryStore>,
        registry: HandlerRegistry,
        ctx: HandlerContext,
    }

    fn fixture(runner: ScriptedRunner) -> Fixture {
        let data = TempDir::new().unwrap();
        let project_dir = project_dir(&["Cargo.toml"]);
        let store = Arc::new(MemoryStore::new());
        let project = Project::new("demo", project_dir.path());
        store.create_project(&project).unwrap();

        let runner = Arc::new(runner.touch_outputs());
        let checker = Arc::new(HealthChecker::new(store.clone(), store.clone(), runner.clone()));
        let media = Arc::new(ToolCapture::new(runner, store.clone(), data.path()));

        let ctx = HandlerContext {
            execution_id: Uuid::new_v4(),
            project_id: project.id,
            triggered_by: "alice".to_string(),
        };
        Fixture { _data: data, _project: project_dir, store, registry: HandlerRegistry::new(checker, media), ctx }
    }

    fn cargo_ok() -> ScriptedRunner {
        ScriptedRunner::new()
            .on("cargo build", ProcessOutput::exited(0, ""))
            .on("cargo test", ProcessOutput::exited(0, ""))
            .on("cargo audit", ProcessOutput::exited(0, ""))
    }

    #[test]
    fn test_asset_generation_records_ids_and_summary() {
        let f = fixture(ScriptedRunner::new().on("chrome", ProcessOutput::exited(0, "")));
        let config = WorkflowConfig::AssetGeneration(AssetGenerationConfig {
            generate_screenshots: true,
            screenshot_url: Some("http://localhost:3000".to_string()),
            ..Default::default()
        });
        let mut output = HandlerOutput::default();

        f.registry.dispatch(&f.ctx, &config, &mut output).unwrap();

        assert!(output.result.contains_key("screenshot_id"));
        assert!(!output.result.contains_key("video_id"));
        assert_eq!(output.result["total_assets"], json!(1));
        assert_eq!(output.result["asset_types"], json!({"screenshot": 1}));
        assert_eq!(output.artifacts.len(), 1);
    }

    #[test]
    fn test_asset_generation_screenshot_failure_propagates() {
        let f = fixture(ScriptedRunner::new());
        let config = WorkflowConfig::AssetGeneration(AssetGenerationConfig {
            generate_screenshots: true,
            screenshot_url: Some("http://localhost:3000".to_string()),
            ..Default::default()
        });
        let mut output = HandlerOutput::default();

        let err = f.registry.dispatch(&f.ctx, &config, &mut output).unwrap_err();

        assert!(err.to_string().starts_with("failed to generate screenshot: "));
        assert!(matches!(err, EngineError::Handler { .. }));
        assert!(f.store.get_state(f.ctx.project_id).unwrap().is_none());
    }

    #[test]
    fn test_state_check_records_snapshot_fields() {
        let f = fixture(cargo_ok());
        let config = WorkflowConfig::StateCheck(StateCheckConfig::default());
        let mut output = HandlerOutput::default();

        f.registry.dispatch(&f.ctx, &config, &mut output).unwrap();

        let keys: Vec<&str> = output.result.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "health_score",
                "build_status",
                "test_status",
                "lint_status",
                "security_status",
                "deployment_status",
                "coverage",
                "coverage_reported",
                "next_steps",
                "errors",
                "warnings",
                "suggestions",
            ]
        );
        assert_eq!(output.result["build_status"], json!("success"));
        assert_eq!(output.result["lint_status"], json!("unknown"));
        assert!(f.store.get_state(f.ctx.project_id).unwrap().is_some());
    }

    #[test]
    fn test_state_check_unknown_project_fails() {
        let mut f = fixture(cargo_ok());
        f.ctx.project_id = Uuid::new_v4();
        let config = WorkflowConfig::StateCheck(StateCheckConfig::default());

        let err = f.registry.dispatch(&f.ctx, &config, &mut HandlerOutput::default()).unwrap_err();

        assert!(err.to_string().starts_with("failed to check project state: "));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_full_analysis_swallows_screenshot_failure() {
        let f = fixture(cargo_ok());
        let config = WorkflowConfig::FullAnalysis(FullAnalysisConfig {
            analysis_url: Some("http://localhost:3000".to_string()),
            ..Default::default()
        });
        let mut output = HandlerOutput::default();

        f.registry.dispatch(&f.ctx, &config, &mut output).unwrap();

        assert!(output.result.contains_key("health_score"));
        assert!(!output.result.contains_key("analysis_screenshot_id"));
        assert_eq!(output.result["asset_summary"]["total_assets"], json!(0));
        assert!(output.artifacts.is_empty());
    }

    #[test]
    fn test_full_analysis_state_check_failure_is_wrapped() {
        let mut f = fixture(cargo_ok());
        f.ctx.project_id = Uuid::new_v4();
        let config = WorkflowConfig::FullAnalysis(FullAnalysisConfig::default());

        let err = f.registry.dispatch(&f.ctx, &config, &mut HandlerOutput::default()).unwrap_err();

        assert!(err
            .to_string()
            .starts_with("state check failed: failed to check project state: "));
    }

    #[test]
    fn test_git_sync_records_timestamp() {
        let f = fixture(ScriptedRunner::new());
        let mut output = HandlerOutput::default();

        f.registry
            .dispatch(&f.ctx, &WorkflowConfig::GitSync(GitSyncConfig::default()), &mut output)
            .unwrap();

        assert_eq!(output.result["sync_completed"], json!(true));
        let stamp = output.result["sync_timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
