//! Health score and recommendations.
//!
//! Both are pure functions of the five category statuses and the coverage
//! percentage, so a stored score can always be recomputed.

use serde::{Deserialize, Serialize};

use super::category::{Category, CategoryStatus, CategoryStatuses};

/// Points a category contributes on success and on failure.
#[derive(Debug, Clone, Copy)]
struct Weight {
    success: i32,
    failure: i32,
}

impl Weight {
    fn term(self, status: CategoryStatus) -> i32 {
        let raw = match status {
            CategoryStatus::Success => self.success,
            CategoryStatus::Failure => self.failure,
            CategoryStatus::Unknown | CategoryStatus::Timeout => 0,
        };
        raw.clamp(self.failure.min(0), self.success.max(0))
    }
}

const fn weight(category: Category) -> Weight {
    match category {
        Category::Build => Weight { success: 25, failure: -10 },
        Category::Test => Weight { success: 20, failure: -5 },
        Category::Lint => Weight { success: 15, failure: -5 },
        Category::Security => Weight { success: 15, failure: -10 },
        Category::Deployment => Weight { success: 10, failure: 0 },
    }
}

/// Maximum points awarded for coverage.
const COVERAGE_MAX: i32 = 15;

/// Coverage below this percentage triggers a recommendation.
pub const LOW_COVERAGE_THRESHOLD: f64 = 50.0;

/// Tiered coverage points: ≥90 → 15, ≥70 → 10, ≥50 → 5, else 0.
fn coverage_term(coverage: f64) -> i32 {
    let coverage = if coverage.is_finite() { coverage.clamp(0.0, 100.0) } else { 0.0 };

    let raw = if coverage >= 90.0 {
        15
    } else if coverage >= 70.0 {
        10
    } else if coverage >= LOW_COVERAGE_THRESHOLD {
        5
    } else {
        0
    };
    raw.clamp(0, COVERAGE_MAX)
}

/// Compute the 0-100 health score.
pub fn health_score(statuses: &CategoryStatuses, coverage: f64) -> u8 {
    let categories: i32 =
        Category::ALL.iter().map(|c| weight(*c).term(statuses.get(*c))).sum();
    let total = categories + coverage_term(coverage);

    total.clamp(0, 100) as u8
}

/// Recommendation lists produced by an assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    pub next_steps: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Evaluate the recommendation rules in their fixed order.
///
/// Several rules may fire; the firing order is preserved.
pub fn recommend(statuses: &CategoryStatuses, coverage: f64) -> Recommendations {
    let mut rec = Recommendations::default();

    if statuses.build == CategoryStatus::Failure {
        rec.next_steps.push("Fix build errors".to_string());
        rec.errors.push("Build is failing".to_string());
    }

    if statuses.test == CategoryStatus::Failure {
        rec.next_steps.push("Fix failing tests".to_string());
        rec.errors.push("Tests are failing".to_string());
    }

    if !(coverage >= LOW_COVERAGE_THRESHOLD) {
        rec.next_steps.push("Increase test coverage".to_string());
        rec.warnings.push("Low test coverage".to_string());
    }

    if statuses.lint == CategoryStatus::Failure {
        rec.next_steps.push("Fix linting errors".to_string());
        rec.warnings.push("Linting issues detected".to_string());
    }

    if statuses.security == CategoryStatus::Failure {
        rec.next_steps.push("Address security vulnerabilities".to_string());
        rec.errors.push("Security vulnerabilities found".to_string());
    }

    if statuses.deployment == CategoryStatus::Unknown {
        rec.suggestions.push("Consider adding deployment configuration".to_string());
    }

    for category in Category::ALL {
        if statuses.get(category) == CategoryStatus::Timeout {
            rec.warnings.push(format!("{} check timed out", category.display_name()));
        }
    }

    rec
}
