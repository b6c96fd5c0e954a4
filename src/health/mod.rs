//! Health assessment engine.
//!
//! A project is assessed in five categories (build, test, lint, security,
//! deployment). For each one the engine:
//!
//! 1. Detects the ecosystem from marker files in the project root
//! 2. Runs the matching external tool with a deadline
//! 3. Maps the exit status to a [`CategoryStatus`]
//!
//! The test run is also scraped for a coverage percentage. Statuses and
//! coverage feed the score and the recommendation rules, and the result is
//! upserted as the project's [`ProjectState`].
//!
//! Tool problems never abort an assessment; they only mark their category as
//! `failure` (or `timeout`). Only project resolution and store errors surface.

mod category;
mod coverage;
mod ecosystem;
mod probes;
mod score;
mod state;

pub use category::{Category, CategorySelection, CategoryStatus, CategoryStatuses};
pub use coverage::CoverageFormat;
pub use ecosystem::{Detected, DeploymentTarget, EcosystemDetector, Linter, Toolchain};
pub use probes::{plan, Probe, ProbePlan, ToolSpec, BUILD_OUTPUT_DIRS};
pub use score::{health_score, recommend, Recommendations, LOW_COVERAGE_THRESHOLD};
pub use state::ProjectState;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::core::{EngineResult, HealthConfig, Invocation, ProcessRunner};
use crate::storage::{ProjectStore, StateStore};

/// What ran for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRecord {
    pub category: Category,

    /// Command line, or `None` when nothing ran
    pub tool: Option<String>,

    /// Marker file that selected the tool
    pub marker: Option<String>,

    pub status: CategoryStatus,
    pub duration_ms: u64,
}

impl ProbeRecord {
    fn skipped(category: Category) -> Self {
        Self {
            category,
            tool: None,
            marker: None,
            status: CategoryStatus::Unknown,
            duration_ms: 0,
        }
    }
}

/// Result of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub project_id: Uuid,

    #[serde(flatten)]
    pub statuses: CategoryStatuses,

    /// Coverage percentage; 0.0 when unavailable
    pub coverage: f64,

    /// Whether `coverage` was parsed from test output
    pub coverage_reported: bool,

    pub health_score: u8,
    pub next_steps: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,

    /// Per-category probe details, in category order
    pub probes: Vec<ProbeRecord>,

    pub checked_at: DateTime<Utc>,
}

impl HealthSnapshot {
    /// Score and recommend from raw probe results.
    pub fn evaluate(
        project_id: Uuid,
        statuses: CategoryStatuses,
        coverage: Option<f64>,
        probes: Vec<ProbeRecord>,
    ) -> Self {
        let coverage_reported = coverage.is_some();
        let coverage = coverage.unwrap_or(0.0);
        let Recommendations { next_steps, errors, warnings, suggestions } =
            recommend(&statuses, coverage);

        Self {
            project_id,
            statuses,
            coverage,
            coverage_reported,
            health_score: health_score(&statuses, coverage),
            next_steps,
            errors,
            warnings,
            suggestions,
            probes,
            checked_at: Utc::now(),
        }
    }
}

/// Runs assessments and keeps each project's [`ProjectState`] current.
pub struct HealthChecker {
    projects: Arc<dyn ProjectStore>,
    states: Arc<dyn StateStore>,
    runner: Arc<dyn ProcessRunner>,
    settings: HealthConfig,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthChecker").field("settings", &self.settings).finish_non_exhaustive()
    }
}

impl HealthChecker {
    /// Create a checker with default settings.
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        states: Arc<dyn StateStore>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self { projects, states, runner, settings: HealthConfig::default(), locks: Mutex::default() }
    }

    /// Replace the tool settings.
    #[must_use]
    pub fn with_settings(mut self, settings: HealthConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Assess every category of a project and persist the result.
    pub fn check_project_state(&self, project_id: Uuid) -> EngineResult<HealthSnapshot> {
        self.check_project_state_with(project_id, CategorySelection::all())
    }

    /// Assess the selected categories of a project and persist the result.
    ///
    /// Fails with `NotFound` when the project or its directory cannot be
    /// resolved, or with the store's error when persisting fails.
    pub fn check_project_state_with(
        &self,
        project_id: Uuid,
        selection: CategorySelection,
    ) -> EngineResult<HealthSnapshot> {
        let project = self.projects.get_project(project_id)?;
        let root = project.resolve_path()?;

        let lock = self.project_lock(project_id);
        let outcome = {
            let _guard = lock.lock();
            let mut snapshot = self.assess(&root, selection);
            snapshot.project_id = project_id;
            self.persist(&snapshot).map(|()| snapshot)
        };
        self.release_project_lock(project_id, lock);
        let snapshot = outcome?;

        tracing::info!(
            project_id = %project_id,
            score = snapshot.health_score,
            build = %snapshot.statuses.build,
            test = %snapshot.statuses.test,
            lint = %snapshot.statuses.lint,
            security = %snapshot.statuses.security,
            deployment = %snapshot.statuses.deployment,
            "Project health assessed"
        );

        Ok(snapshot)
    }

    /// Assess a directory without touching any store.
    ///
    /// The returned snapshot carries a nil project ID.
    pub fn assess(&self, root: &Path, selection: CategorySelection) -> HealthSnapshot {
        let mut statuses = CategoryStatuses::default();
        let mut coverage = None;
        let mut records = Vec::with_capacity(Category::ALL.len());

        for category in Category::ALL {
            if !selection.includes(category) {
                records.push(ProbeRecord::skipped(category));
                continue;
            }

            let (record, parsed) = self.probe(category, root);
            statuses.set(category, record.status);
            if category == Category::Test {
                coverage = parsed;
            }
            records.push(record);
        }

        HealthSnapshot::evaluate(Uuid::nil(), statuses, coverage, records)
    }

    fn probe(&self, category: Category, root: &Path) -> (ProbeRecord, Option<f64>) {
        let Some(plan) = plan(category, root, &self.settings.docker_tag) else {
            tracing::debug!(category = %category, "No ecosystem detected");
            return (ProbeRecord::skipped(category), None);
        };

        let marker = Some(plan.marker.to_string());

        match plan.probe {
            Probe::BuildOutput => {
                let found = BUILD_OUTPUT_DIRS.iter().any(|dir| root.join(dir).is_dir());
                let status = if found { CategoryStatus::Success } else { CategoryStatus::Unknown };
                let record = ProbeRecord { category, tool: None, marker, status, duration_ms: 0 };
                (record, None)
            }
            Probe::Tool(spec) => {
                let (status, duration, coverage) = self.run_tool(category, &spec, root);
                let record = ProbeRecord {
                    category,
                    tool: Some(spec.display()),
                    marker,
                    status,
                    duration_ms: duration.as_millis() as u64,
                };
                (record, coverage)
            }
        }
    }

    fn run_tool(
        &self,
        category: Category,
        spec: &ToolSpec,
        root: &Path,
    ) -> (CategoryStatus, Duration, Option<f64>) {
        let invocation = Invocation::new(spec.program, root)
            .args(spec.args.iter().cloned())
            .timeout(self.settings.tool_timeout());

        tracing::debug!(category = %category, command = %invocation.display(), "Running probe");
        let start = Instant::now();

        let output = match self.runner.run(&invocation) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(category = %category, error = %e, "Probe tool could not run");
                return (CategoryStatus::Failure, start.elapsed(), None);
            }
        };

        if output.timed_out_state() {
            tracing::warn!(
                category = %category,
                command = %invocation.display(),
                "Probe timed out"
            );
            return (CategoryStatus::Timeout, output.duration, None);
        }

        if !output.success() {
            tracing::debug!(
                category = %category,
                reason = %output.failure_reason(),
                "Probe failed"
            );
            return (CategoryStatus::Failure, output.duration, None);
        }

        let coverage = spec
            .coverage
            .and_then(|format| format.parse(&output.stdout).or_else(|| format.parse(&output.stderr)));

        (CategoryStatus::Success, output.duration, coverage)
    }

    fn project_lock(&self, project_id: Uuid) -> Arc<Mutex<()>> {
        self.locks.lock().entry(project_id).or_default().clone()
    }

    /// Drop the project's lock entry once no other assessment holds or awaits it.
    fn release_project_lock(&self, project_id: Uuid, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        drop(lock);
        if locks.get(&project_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&project_id);
        }
    }

    fn persist(&self, snapshot: &HealthSnapshot) -> EngineResult<()> {
        match self.states.get_state(snapshot.project_id)? {
            Some(mut state) => {
                state.apply(snapshot);
                self.states.update_state(&state)
            }
            None => {
                let mut state = ProjectState::new(snapshot.project_id);
                state.apply(snapshot);
                self.states.create_state(&state)
            }
        }
    }
}
