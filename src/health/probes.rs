//! Per-category tool table.
//!
//! Maps a detected ecosystem to the external command that checks it.

use std::path::Path;

use super::category::Category;
use super::coverage::CoverageFormat;
use super::ecosystem::{DeploymentTarget, EcosystemDetector, Linter, Toolchain};

/// An external command to run for a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    /// Program to execute
    pub program: &'static str,

    /// Arguments
    pub args: Vec<String>,

    /// Coverage report printed by the tool, if any
    pub coverage: Option<CoverageFormat>,
}

impl ToolSpec {
    fn new(program: &'static str, args: &[&str]) -> Self {
        Self { program, args: args.iter().map(|a| (*a).to_string()).collect(), coverage: None }
    }

    fn with_coverage(mut self, format: CoverageFormat) -> Self {
        self.coverage = Some(format);
        self
    }

    /// Human readable command line.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.to_string()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// How a detected category is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Run a tool and judge it by exit status
    Tool(ToolSpec),
    /// Static hosting: success when a build output directory exists, else unknown
    BuildOutput,
}

/// A planned probe with the marker that selected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePlan {
    pub probe: Probe,
    pub marker: &'static str,
}

/// Directories accepted as static build output.
pub const BUILD_OUTPUT_DIRS: [&str; 2] = ["dist", "build"];

/// Decide how to probe `category` in the project at `root`.
///
/// Returns `None` when no ecosystem for the category is detected.
pub fn plan(category: Category, root: &Path, docker_tag: &str) -> Option<ProbePlan> {
    let detector = EcosystemDetector::new(root);

    match category {
        Category::Build => detector.toolchain().map(|d| ProbePlan {
            probe: Probe::Tool(build_tool(d.kind)),
            marker: d.marker,
        }),
        Category::Test => detector.toolchain().map(|d| ProbePlan {
            probe: Probe::Tool(test_tool(d.kind)),
            marker: d.marker,
        }),
        Category::Lint => detector
            .linter()
            .map(|d| ProbePlan { probe: Probe::Tool(lint_tool(d.kind)), marker: d.marker }),
        Category::Security => detector.auditor().and_then(|d| {
            audit_tool(d.kind).map(|tool| ProbePlan { probe: Probe::Tool(tool), marker: d.marker })
        }),
        Category::Deployment => detector.deployment().map(|d| ProbePlan {
            probe: deployment_probe(d.kind, d.marker, docker_tag),
            marker: d.marker,
        }),
    }
}

/// Build/compile command.
pub fn build_tool(toolchain: Toolchain) -> ToolSpec {
    match toolchain {
        Toolchain::Node => ToolSpec::new("npm", &["run", "build"]),
        Toolchain::Go => ToolSpec::new("go", &["build", "./..."]),
        Toolchain::Python => ToolSpec::new("python", &["-m", "compileall", "-q", "."]),
        Toolchain::Rust => ToolSpec::new("cargo", &["build"]),
        Toolchain::Maven => ToolSpec::new("mvn", &["compile"]),
        Toolchain::Gradle => ToolSpec::new("gradle", &["build"]),
    }
}

/// Test command, with coverage reporting where the runner supports it.
pub fn test_tool(toolchain: Toolchain) -> ToolSpec {
    match toolchain {
        Toolchain::Node => ToolSpec::new("npm", &["test", "--", "--coverage"])
            .with_coverage(CoverageFormat::Istanbul),
        Toolchain::Go => {
            ToolSpec::new("go", &["test", "-cover", "./..."]).with_coverage(CoverageFormat::GoCover)
        }
        Toolchain::Python => ToolSpec::new("python", &["-m", "pytest", "--cov", "."])
            .with_coverage(CoverageFormat::PytestCov),
        Toolchain::Rust => ToolSpec::new("cargo", &["test"]),
        Toolchain::Maven => ToolSpec::new("mvn", &["test"]),
        Toolchain::Gradle => ToolSpec::new("gradle", &["test"]),
    }
}

/// Static analysis command.
pub fn lint_tool(linter: Linter) -> ToolSpec {
    match linter {
        Linter::Eslint => ToolSpec::new("npx", &["eslint", "."]),
        Linter::GolangciLint => ToolSpec::new("golangci-lint", &["run"]),
        Linter::Flake8 => ToolSpec::new("flake8", &["."]),
        Linter::Rustfmt => ToolSpec::new("cargo", &["fmt", "--check"]),
    }
}

/// Vulnerability audit command.
pub fn audit_tool(toolchain: Toolchain) -> Option<ToolSpec> {
    match toolchain {
        Toolchain::Node => Some(ToolSpec::new("npm", &["audit"])),
        Toolchain::Go => Some(ToolSpec::new("gosec", &["./..."])),
        Toolchain::Python => Some(ToolSpec::new("bandit", &["-r", "."])),
        Toolchain::Rust => Some(ToolSpec::new("cargo", &["audit"])),
        Toolchain::Maven | Toolchain::Gradle => None,
    }
}

/// Deployment validation.
pub fn deployment_probe(target: DeploymentTarget, marker: &str, docker_tag: &str) -> Probe {
    match target {
        DeploymentTarget::Docker => {
            Probe::Tool(ToolSpec::new("docker", &["build", "-t", docker_tag, "."]))
        }
        DeploymentTarget::StaticHost => Probe::BuildOutput,
        DeploymentTarget::Kubernetes => {
            let manifests = format!("{}/", marker);
            Probe::Tool(ToolSpec::new(
                "kubectl",
                &["apply", "--dry-run=client", "-f", manifests.as_str()],
            ))
        }
    }
}
