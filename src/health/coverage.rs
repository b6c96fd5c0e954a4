//! Coverage percentage scraping from test runner output.

use once_cell::sync::Lazy;
use regex::Regex;

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)%").unwrap());

static GO_COVERAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"coverage:\s+(\d+(?:\.\d+)?)%").unwrap());

/// The textual coverage report a test runner prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageFormat {
    /// istanbul/jest text summary: `Statements   : 85.5% ( 171/200 )`
    Istanbul,
    /// `go test -cover`: `ok  pkg  0.01s  coverage: 75.0% of statements`
    GoCover,
    /// pytest-cov: `TOTAL   200   16   92%`
    PytestCov,
}

impl CoverageFormat {
    /// Find the first coverage percentage in `output`.
    ///
    /// Returns `None` when no line carries the format's marker with a
    /// readable percentage in [0, 100].
    pub fn parse(&self, output: &str) -> Option<f64> {
        output.lines().find_map(|line| self.parse_line(line))
    }

    fn parse_line(&self, line: &str) -> Option<f64> {
        let captured = match self {
            Self::Istanbul if line.contains("Statements") => PERCENT.captures(line),
            Self::PytestCov if line.contains("TOTAL") => PERCENT.captures(line),
            Self::GoCover => GO_COVERAGE.captures(line),
            _ => None,
        }?;

        captured[1].parse::<f64>().ok().filter(|v| (0.0..=100.0).contains(v))
    }
}
