//! Workflow triggers, typed configuration and execution records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::{EngineError, EngineResult};
use crate::health::CategorySelection;

/// Message stored on executions cancelled through the engine.
pub const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Longest video an asset generation workflow may request, in seconds.
pub const MAX_VIDEO_DURATION: u32 = 3600;

/// Kind of workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    /// Capture screenshots and/or videos
    AssetGeneration,
    /// Run a health assessment
    StateCheck,
    /// Health assessment plus an optional screenshot and asset summary
    FullAnalysis,
    /// Record a repository sync
    GitSync,
}

impl WorkflowType {
    pub const ALL: [Self; 4] =
        [Self::AssetGeneration, Self::StateCheck, Self::FullAnalysis, Self::GitSync];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssetGeneration => "asset_generation",
            Self::StateCheck => "state_check",
            Self::FullAnalysis => "full_analysis",
            Self::GitSync => "git_sync",
        }
    }

    /// One-line description for listings.
    pub fn description(&self) -> &'static str {
        match self {
            Self::AssetGeneration => "Capture screenshots and videos of a running project",
            Self::StateCheck => "Assess build, test, lint, security and deployment health",
            Self::FullAnalysis => "Health assessment plus screenshot and asset summary",
            Self::GitSync => "Synchronize repository information",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EngineError::UnknownWorkflowType(s.to_string()))
    }
}

/// What started an execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    #[default]
    Manual,
    Scheduled,
    Webhook,
    GitPush,
}

impl TriggerType {
    pub const ALL: [Self; 4] = [Self::Manual, Self::Scheduled, Self::Webhook, Self::GitPush];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Webhook => "webhook",
            Self::GitPush => "git_push",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EngineError::UnknownTriggerType(s.to_string()))
    }
}

/// Execution lifecycle status.
///
/// ```text
/// pending  --dispatch--> running
/// running  --ok-------> completed
/// running  --error----> failed
/// pending|running --cancel--> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub const ALL: [Self; 5] =
        [Self::Pending, Self::Running, Self::Completed, Self::Failed, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Verb used in `InvalidState` errors for a move into this status.
    fn action(&self) -> &'static str {
        match self {
            Self::Pending => "reset",
            Self::Running => "dispatch",
            Self::Completed => "complete",
            Self::Failed => "fail",
            Self::Cancelled => "cancel",
        }
    }

    /// Validate a move to `next`, returning `next` when allowed.
    pub fn transition(self, next: Self) -> EngineResult<Self> {
        use ExecutionStatus::*;

        match (self, next) {
            (Pending, Running)
            | (Running, Completed)
            | (Running, Failed)
            | (Pending, Cancelled)
            | (Running, Cancelled) => Ok(next),
            _ => Err(EngineError::InvalidState { action: next.action(), status: self.to_string() }),
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

fn default_video_duration() -> u32 {
    30
}

/// Settings for `asset_generation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetGenerationConfig {
    #[serde(default)]
    pub generate_screenshots: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,

    #[serde(default)]
    pub generate_videos: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Video length in seconds
    #[serde(default = "default_video_duration")]
    pub video_duration: u32,
}

impl Default for AssetGenerationConfig {
    fn default() -> Self {
        Self {
            generate_screenshots: false,
            screenshot_url: None,
            generate_videos: false,
            video_url: None,
            video_duration: default_video_duration(),
        }
    }
}

impl AssetGenerationConfig {
    fn validate(&self) -> Result<(), String> {
        if self.generate_screenshots && blank(&self.screenshot_url) {
            return Err("screenshot_url is required when generate_screenshots is set".into());
        }
        if self.generate_videos && blank(&self.video_url) {
            return Err("video_url is required when generate_videos is set".into());
        }
        if !(1..=MAX_VIDEO_DURATION).contains(&self.video_duration) {
            return Err(format!(
                "video_duration must be between 1 and {} seconds, got {}",
                MAX_VIDEO_DURATION, self.video_duration
            ));
        }
        Ok(())
    }
}

/// Settings for `state_check`: which categories to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateCheckConfig {
    #[serde(default = "default_true")]
    pub check_build: bool,

    #[serde(default = "default_true")]
    pub check_tests: bool,

    #[serde(default = "default_true")]
    pub check_lint: bool,

    #[serde(default = "default_true")]
    pub check_security: bool,

    #[serde(default = "default_true")]
    pub check_deployment: bool,
}

impl Default for StateCheckConfig {
    fn default() -> Self {
        Self {
            check_build: true,
            check_tests: true,
            check_lint: true,
            check_security: true,
            check_deployment: true,
        }
    }
}

impl From<&StateCheckConfig> for CategorySelection {
    fn from(config: &StateCheckConfig) -> Self {
        Self {
            build: config.check_build,
            test: config.check_tests,
            lint: config.check_lint,
            security: config.check_security,
            deployment: config.check_deployment,
        }
    }
}

/// Settings for `full_analysis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FullAnalysisConfig {
    /// Page to screenshot after the assessment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_url: Option<String>,

    #[serde(default)]
    pub state_check: StateCheckConfig,

    #[serde(default = "default_true")]
    pub include_asset_summary: bool,
}

impl Default for FullAnalysisConfig {
    fn default() -> Self {
        Self { analysis_url: None, state_check: StateCheckConfig::default(), include_asset_summary: true }
    }
}

/// Settings for `git_sync` (none yet).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSyncConfig {}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Validated configuration, one variant per workflow type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "workflow_type", content = "settings", rename_all = "snake_case")]
pub enum WorkflowConfig {
    AssetGeneration(AssetGenerationConfig),
    StateCheck(StateCheckConfig),
    FullAnalysis(FullAnalysisConfig),
    GitSync(GitSyncConfig),
}

impl WorkflowConfig {
    /// Parse and validate the untyped configuration of a trigger.
    ///
    /// `null` is treated as an empty object.
    pub fn from_parts(workflow_type: WorkflowType, configuration: Value) -> EngineResult<Self> {
        let config = Self::parse(workflow_type, configuration)?;
        config.validate()?;
        Ok(config)
    }

    /// Deserialize without the cross-field checks (e.g. a capture flag
    /// without its URL). Unknown keys and wrong value types still fail.
    pub fn parse(workflow_type: WorkflowType, configuration: Value) -> EngineResult<Self> {
        let configuration = match configuration {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        Ok(match workflow_type {
            WorkflowType::AssetGeneration => {
                Self::AssetGeneration(deserialize(workflow_type, configuration)?)
            }
            WorkflowType::StateCheck => Self::StateCheck(deserialize(workflow_type, configuration)?),
            WorkflowType::FullAnalysis => {
                Self::FullAnalysis(deserialize(workflow_type, configuration)?)
            }
            WorkflowType::GitSync => Self::GitSync(deserialize(workflow_type, configuration)?),
        })
    }

    /// Cross-field checks.
    pub fn validate(&self) -> EngineResult<()> {
        let outcome = match self {
            Self::AssetGeneration(config) => config.validate(),
            Self::FullAnalysis(config)
                if config.analysis_url.as_deref().is_some_and(|u| u.trim().is_empty()) =>
            {
                Err("analysis_url must not be empty".to_string())
            }
            _ => Ok(()),
        };
        outcome.map_err(|reason| invalid(self.workflow_type(), reason))
    }

    /// The workflow type this configuration belongs to.
    pub fn workflow_type(&self) -> WorkflowType {
        match self {
            Self::AssetGeneration(_) => WorkflowType::AssetGeneration,
            Self::StateCheck(_) => WorkflowType::StateCheck,
            Self::FullAnalysis(_) => WorkflowType::FullAnalysis,
            Self::GitSync(_) => WorkflowType::GitSync,
        }
    }
}

fn deserialize<T: DeserializeOwned>(
    workflow_type: WorkflowType,
    configuration: Value,
) -> EngineResult<T> {
    serde_json::from_value(configuration).map_err(|e| invalid(workflow_type, e.to_string()))
}

fn invalid(workflow_type: WorkflowType, reason: String) -> EngineError {
    EngineError::InvalidConfiguration { workflow: workflow_type.to_string(), reason }
}

/// Trigger descriptor as received from callers (CLI, webhooks, JSON files).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRequest {
    #[serde(alias = "projectId")]
    pub project_id: Uuid,

    #[serde(alias = "workflowType")]
    pub workflow_type: String,

    #[serde(alias = "triggerType", default = "default_trigger_type")]
    pub trigger_type: String,

    #[serde(default)]
    pub configuration: Value,

    #[serde(alias = "triggeredBy", default)]
    pub triggered_by: String,
}

fn default_trigger_type() -> String {
    TriggerType::Manual.to_string()
}

/// A validated request to run a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTrigger {
    pub project_id: Uuid,
    pub trigger_type: TriggerType,
    pub config: WorkflowConfig,
    pub triggered_by: String,
}

impl WorkflowTrigger {
    /// Create a manual trigger.
    pub fn manual(project_id: Uuid, config: WorkflowConfig, triggered_by: impl Into<String>) -> Self {
        Self { project_id, trigger_type: TriggerType::Manual, config, triggered_by: triggered_by.into() }
    }

    /// Set the trigger type.
    #[must_use]
    pub fn with_trigger_type(mut self, trigger_type: TriggerType) -> Self {
        self.trigger_type = trigger_type;
        self
    }

    pub fn workflow_type(&self) -> WorkflowType {
        self.config.workflow_type()
    }
}

impl TryFrom<TriggerRequest> for WorkflowTrigger {
    type Error = EngineError;

    fn try_from(request: TriggerRequest) -> Result<Self, Self::Error> {
        let trigger_type: TriggerType = request.trigger_type.parse()?;
        let workflow_type: WorkflowType = request.workflow_type.parse()?;
        let config = WorkflowConfig::from_parts(workflow_type, request.configuration)?;

        Ok(Self {
            project_id: request.project_id,
            trigger_type,
            config,
            triggered_by: request.triggered_by,
        })
    }
}

/// Persisted record of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub project_id: Uuid,

    /// Requested workflow label; only failed records carry unrecognized ones
    pub workflow_type: String,

    pub trigger_type: TriggerType,
    pub status: ExecutionStatus,

    /// Typed configuration; absent when the trigger was rejected
    pub configuration: Option<WorkflowConfig>,

    /// Handler outputs in insertion order
    #[serde(default)]
    pub result: Map<String, Value>,

    /// Produced file paths; append-only
    #[serde(default)]
    pub artifacts: Vec<String>,

    /// First error of the run
    pub error_message: Option<String>,

    pub triggered_by: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    fn from_trigger(trigger: &WorkflowTrigger, status: ExecutionStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: trigger.project_id,
            workflow_type: trigger.workflow_type().to_string(),
            trigger_type: trigger.trigger_type,
            status,
            configuration: Some(trigger.config.clone()),
            result: Map::new(),
            artifacts: Vec::new(),
            error_message: None,
            triggered_by: trigger.triggered_by.clone(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            duration_ms: None,
            scheduled_for: None,
        }
    }

    /// A record that starts running now.
    pub fn running(trigger: &WorkflowTrigger) -> Self {
        let mut execution = Self::from_trigger(trigger, ExecutionStatus::Running);
        execution.started_at = Some(execution.created_at);
        execution
    }

    /// A scheduled record waiting for dispatch.
    pub fn pending(trigger: &WorkflowTrigger, scheduled_for: DateTime<Utc>) -> Self {
        let mut execution = Self::from_trigger(trigger, ExecutionStatus::Pending);
        execution.trigger_type = TriggerType::Scheduled;
        execution.scheduled_for = Some(scheduled_for);
        execution
    }

    /// A terminal record for a trigger that failed validation.
    pub fn rejected(request: &TriggerRequest, trigger_type: TriggerType, error: &EngineError) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id: request.project_id,
            workflow_type: request.workflow_type.clone(),
            trigger_type,
            status: ExecutionStatus::Failed,
            configuration: None,
            result: Map::new(),
            artifacts: Vec::new(),
            error_message: Some(error.to_string()),
            triggered_by: request.triggered_by.clone(),
            created_at: now,
            started_at: Some(now),
            completed_at: Some(now),
            duration_ms: Some(0),
            scheduled_for: None,
        }
    }

    /// The recognized workflow type, if any.
    pub fn kind(&self) -> Option<WorkflowType> {
        self.workflow_type.parse().ok()
    }

    /// Move to `next`, validating the transition.
    pub fn transition(&mut self, next: ExecutionStatus) -> EngineResult<()> {
        self.status = self.status.transition(next)?;
        Ok(())
    }

    /// Move a running record to `completed` or `failed` and stamp its end.
    pub fn finish(&mut self, error: Option<String>) -> EngineResult<()> {
        let next = if error.is_some() { ExecutionStatus::Failed } else { ExecutionStatus::Completed };
        self.transition(next)?;
        if self.error_message.is_none() {
            self.error_message = error;
        }
        self.stamp_completion();
        Ok(())
    }

    /// Set `completed_at` and the duration since `started_at`.
    pub fn stamp_completion(&mut self) {
        let now = Utc::now();
        self.completed_at = Some(now);
        self.duration_ms =
            self.started_at.map(|start| (now - start).num_milliseconds().max(0) as u64);
    }

    /// Summary returned to the caller.
    pub fn to_result(&self) -> WorkflowResult {
        WorkflowResult {
            execution_id: self.id,
            status: self.status,
            duration_ms: self.duration_ms.unwrap_or(0),
            result: self.result.clone(),
            artifacts: self.artifacts.clone(),
            errors: self.error_message.iter().cloned().collect(),
        }
    }
}

/// Outcome of a workflow invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub execution_id: Uuid,
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    pub result: Map<String, Value>,
    pub artifacts: Vec<String>,
    pub errors: Vec<String>,
}
