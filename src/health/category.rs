//! Health categories and their statuses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One dimension of project health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Does the project compile/build
    Build,
    /// Do the tests pass
    Test,
    /// Is static analysis clean
    Lint,
    /// Are dependencies free of known vulnerabilities
    Security,
    /// Is the deployment descriptor valid
    Deployment,
}

impl Category {
    /// All categories, in assessment order.
    pub const ALL: [Self; 5] =
        [Self::Build, Self::Test, Self::Lint, Self::Security, Self::Deployment];

    /// Machine name (`build`, `test`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Test => "test",
            Self::Lint => "lint",
            Self::Security => "security",
            Self::Deployment => "deployment",
        }
    }

    /// Capitalized name for messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Build => "Build",
            Self::Test => "Test",
            Self::Lint => "Lint",
            Self::Security => "Security",
            Self::Deployment => "Deployment",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one category check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    /// The tool ran and exited 0
    Success,
    /// The tool failed, exited non-zero, or could not be started
    Failure,
    /// No applicable ecosystem was detected (or the category was skipped)
    #[default]
    Unknown,
    /// The tool exceeded its deadline and was killed
    Timeout,
}

impl CategoryStatus {
    /// Machine name (`success`, `failure`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Unknown => "unknown",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of every category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStatuses {
    pub build: CategoryStatus,
    pub test: CategoryStatus,
    pub lint: CategoryStatus,
    pub security: CategoryStatus,
    pub deployment: CategoryStatus,
}

impl CategoryStatuses {
    /// Every category set to `status`.
    pub fn uniform(status: CategoryStatus) -> Self {
        Self { build: status, test: status, lint: status, security: status, deployment: status }
    }

    /// Status of one category.
    pub fn get(&self, category: Category) -> CategoryStatus {
        match category {
            Category::Build => self.build,
            Category::Test => self.test,
            Category::Lint => self.lint,
            Category::Security => self.security,
            Category::Deployment => self.deployment,
        }
    }

    /// Set the status of one category.
    pub fn set(&mut self, category: Category, status: CategoryStatus) {
        match category {
            Category::Build => self.build = status,
            Category::Test => self.test = status,
            Category::Lint => self.lint = status,
            Category::Security => self.security = status,
            Category::Deployment => self.deployment = status,
        }
    }
}

/// Which categories an assessment should probe.
///
/// Deselected categories are reported as `unknown` and no tool is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySelection {
    pub build: bool,
    pub test: bool,
    pub lint: bool,
    pub security: bool,
    pub deployment: bool,
}

impl Default for CategorySelection {
    fn default() -> Self {
        Self::all()
    }
}

impl CategorySelection {
    /// Probe every category.
    pub fn all() -> Self {
        Self { build: true, test: true, lint: true, security: true, deployment: true }
    }

    /// Whether `category` is selected.
    pub fn includes(&self, category: Category) -> bool {
        match category {
            Category::Build => self.build,
            Category::Test => self.test,
            Category::Lint => self.lint,
            Category::Security => self.security,
            Category::Deployment => self.deployment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_get_set() {
        let mut statuses = CategoryStatuses::default();
        assert_eq!(statuses.get(Category::Lint), CategoryStatus::Unknown);

        statuses.set(Category::Lint, CategoryStatus::Failure);
        assert_eq!(statuses.lint, CategoryStatus::Failure);
        assert_eq!(statuses.get(Category::Build), CategoryStatus::Unknown);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&CategoryStatus::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
        assert_eq!(CategoryStatus::Success.to_string(), "success");
    }

    #[test]
    fn test_selection_defaults_to_all() {
        let selection = CategorySelection::default();
        assert!(Category::ALL.iter().all(|c| selection.includes(*c)));

        let selection = CategorySelection { deployment: false, ..CategorySelection::all() };
        assert!(!selection.includes(Category::Deployment));
        assert!(selection.includes(Category::Build));
    }
}
