//! Ecosystem detection.
//!
//! Each category has its own ordered list of marker files. The first marker
//! present in the project root decides which tool runs for that category.

use std::path::Path;

/// Language toolchain used for build, test and security probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toolchain {
    /// Node.js/NPM project
    Node,
    /// Go module
    Go,
    /// Python project
    Python,
    /// Rust/Cargo project
    Rust,
    /// Maven project
    Maven,
    /// Gradle project
    Gradle,
}

impl Toolchain {
    /// Detection order for build and test probes.
    pub const PRIORITY: [Self; 6] =
        [Self::Node, Self::Go, Self::Python, Self::Rust, Self::Maven, Self::Gradle];

    /// Detection order for security probes.
    pub const AUDIT_PRIORITY: [Self; 4] = [Self::Node, Self::Go, Self::Python, Self::Rust];

    /// Get display name for the toolchain.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Node => "Node.js/NPM",
            Self::Go => "Go",
            Self::Python => "Python",
            Self::Rust => "Rust/Cargo",
            Self::Maven => "Maven",
            Self::Gradle => "Gradle",
        }
    }

    /// Files identifying a buildable/testable project.
    pub fn markers(&self) -> &'static [&'static str] {
        match self {
            Self::Node => &["package.json"],
            Self::Go => &["go.mod"],
            Self::Python => &["requirements.txt", "pyproject.toml"],
            Self::Rust => &["Cargo.toml"],
            Self::Maven => &["pom.xml"],
            Self::Gradle => &["build.gradle", "build.gradle.kts"],
        }
    }

    /// Files identifying a project the toolchain's auditor understands.
    ///
    /// `bandit` is only run for `requirements.txt` projects.
    pub fn audit_markers(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["requirements.txt"],
            Self::Maven | Self::Gradle => &[],
            _ => self.markers(),
        }
    }
}

/// Static analysis tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Linter {
    Eslint,
    GolangciLint,
    Flake8,
    Rustfmt,
}

impl Linter {
    /// Detection order.
    pub const PRIORITY: [Self; 4] = [Self::Eslint, Self::GolangciLint, Self::Flake8, Self::Rustfmt];

    /// Configuration files that enable the linter.
    pub fn markers(&self) -> &'static [&'static str] {
        match self {
            Self::Eslint => &[".eslintrc.json", ".eslintrc.js", "eslint.config.js"],
            Self::GolangciLint => &[".golangci.yml", ".golangci.yaml"],
            Self::Flake8 => &[".flake8", ".pylintrc"],
            Self::Rustfmt => &["rustfmt.toml", ".rustfmt.toml"],
        }
    }
}

/// Deployment descriptor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentTarget {
    /// Container image build
    Docker,
    /// Static hosting (Vercel, Netlify)
    StaticHost,
    /// Kubernetes manifests directory
    Kubernetes,
}

impl DeploymentTarget {
    /// Detection order.
    pub const PRIORITY: [Self; 3] = [Self::Docker, Self::StaticHost, Self::Kubernetes];

    /// Files or directories identifying the target.
    pub fn markers(&self) -> &'static [&'static str] {
        match self {
            Self::Docker => &["Dockerfile"],
            Self::StaticHost => &["vercel.json", "netlify.toml"],
            Self::Kubernetes => &["kubernetes", "k8s"],
        }
    }
}

/// A detection hit: what was found and which marker matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detected<T> {
    pub kind: T,
    pub marker: &'static str,
}

/// Marker-file detector rooted at a project directory.
pub struct EcosystemDetector<'a> {
    path: &'a Path,
}

impl<'a> EcosystemDetector<'a> {
    /// Create a new detector.
    pub fn new(path: &'a Path) -> Self {
        Self { path }
    }

    /// Toolchain for build and test probes.
    pub fn toolchain(&self) -> Option<Detected<Toolchain>> {
        self.first_match(&Toolchain::PRIORITY, Toolchain::markers)
    }

    /// Toolchain for the security probe.
    pub fn auditor(&self) -> Option<Detected<Toolchain>> {
        self.first_match(&Toolchain::AUDIT_PRIORITY, Toolchain::audit_markers)
    }

    /// Linter for the lint probe.
    pub fn linter(&self) -> Option<Detected<Linter>> {
        self.first_match(&Linter::PRIORITY, Linter::markers)
    }

    /// Deployment target for the deployment probe.
    pub fn deployment(&self) -> Option<Detected<DeploymentTarget>> {
        self.first_match(&DeploymentTarget::PRIORITY, DeploymentTarget::markers)
    }

    /// Whether `name` exists in the project root.
    pub fn has(&self, name: &str) -> bool {
        self.path.join(name).exists()
    }

    fn first_match<T: Copy>(
        &self,
        candidates: &[T],
        markers: impl Fn(&T) -> &'static [&'static str],
    ) -> Option<Detected<T>> {
        candidates.iter().find_map(|kind| {
            markers(kind)
                .iter()
                .find(|marker| self.has(marker))
                .map(|marker| Detected { kind: *kind, marker: *marker })
        })
    }
}
