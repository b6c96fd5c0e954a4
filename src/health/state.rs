//! Persisted per-project health state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CategoryStatuses;
use super::HealthSnapshot;

/// Latest assessment of a project, overwritten in place on every check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    /// Record ID, stable across assessments
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Category statuses
    #[serde(flatten)]
    pub statuses: CategoryStatuses,

    /// Coverage percentage (0.0 when unavailable)
    pub coverage: f64,

    /// Whether a coverage percentage was actually parsed
    #[serde(default)]
    pub coverage_reported: bool,

    /// Health score 0-100
    pub health_score: u8,

    #[serde(default)]
    pub next_steps: Vec<String>,

    #[serde(default)]
    pub check_errors: Vec<String>,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub suggestions: Vec<String>,

    /// When the last assessment finished
    pub last_check_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectState {
    /// Empty state for a project that was never assessed.
    pub fn new(project_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            statuses: CategoryStatuses::default(),
            coverage: 0.0,
            coverage_reported: false,
            health_score: 0,
            next_steps: Vec::new(),
            check_errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
            last_check_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite every snapshot field, keeping `id` and `created_at`.
    pub fn apply(&mut self, snapshot: &HealthSnapshot) {
        self.statuses = snapshot.statuses;
        self.coverage = snapshot.coverage;
        self.coverage_reported = snapshot.coverage_reported;
        self.health_score = snapshot.health_score;
        self.next_steps = snapshot.next_steps.clone();
        self.check_errors = snapshot.errors.clone();
        self.warnings = snapshot.warnings.clone();
        self.suggestions = snapshot.suggestions.clone();
        self.last_check_at = Some(snapshot.checked_at);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::category::CategoryStatus;

    #[test]
    fn test_apply_keeps_identity() {
        let project_id = Uuid::new_v4();
        let mut state = ProjectState::new(project_id);
        let (id, created_at) = (state.id, state.created_at);

        let statuses =
            CategoryStatuses { build: CategoryStatus::Failure, ..CategoryStatuses::default() };
        let snapshot = HealthSnapshot::evaluate(project_id, statuses, Some(55.0), Vec::new());

        state.apply(&snapshot);

        assert_eq!(state.id, id);
        assert_eq!(state.created_at, created_at);
        assert_eq!(state.statuses.build, CategoryStatus::Failure);
        assert_eq!(state.health_score, 0);
        assert_eq!(state.coverage, 55.0);
        assert!(state.coverage_reported);
        assert_eq!(state.check_errors, vec!["Build is failing"]);
        assert_eq!(state.last_check_at, Some(snapshot.checked_at));
    }

    #[test]
    fn test_statuses_flatten_into_record() {
        let state = ProjectState::new(Uuid::new_v4());
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["build"], "unknown");
        assert_eq!(json["deployment"], "unknown");
    }
}
