//! Media capture.
//!
//! Screenshots are taken with headless Chrome and videos are recorded with
//! ffmpeg's x11grab input. Every capture lands under
//! `<data_dir>/projects/<project_id>/assets/` and is recorded in an
//! [`AssetStore`].

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{CaptureConfig, EngineError, EngineResult, Invocation, ProcessRunner};
use crate::storage::AssetStore;

/// Kind of captured media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Screenshot,
    Video,
}

impl CaptureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screenshot => "screenshot",
            Self::Video => "video",
        }
    }

    /// File extension of the produced artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Screenshot => "png",
            Self::Video => "mp4",
        }
    }
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to capture a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub kind: CaptureKind,
    pub project_id: Uuid,
    pub url: String,

    /// Video length in seconds; ignored for screenshots
    pub duration_secs: Option<u32>,

    pub requested_by: String,
}

impl CaptureRequest {
    /// Screenshot of `url`.
    pub fn screenshot(project_id: Uuid, url: impl Into<String>, requested_by: &str) -> Self {
        Self {
            kind: CaptureKind::Screenshot,
            project_id,
            url: url.into(),
            duration_secs: None,
            requested_by: requested_by.to_string(),
        }
    }

    /// Video of `url` lasting `duration_secs`.
    pub fn video(
        project_id: Uuid,
        url: impl Into<String>,
        duration_secs: u32,
        requested_by: &str,
    ) -> Self {
        Self {
            kind: CaptureKind::Video,
            project_id,
            url: url.into(),
            duration_secs: Some(duration_secs),
            requested_by: requested_by.to_string(),
        }
    }
}

/// A captured media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub project_id: Uuid,
    pub kind: CaptureKind,
    pub title: String,
    pub file_path: PathBuf,
    pub source_url: String,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
}

/// Produces and lists media artifacts.
pub trait MediaCapture: Send + Sync {
    /// Capture `request`, returning the recorded artifact.
    fn capture(&self, request: &CaptureRequest) -> EngineResult<Artifact>;

    /// All artifacts of a project, oldest first.
    fn project_assets(&self, project_id: Uuid) -> EngineResult<Vec<Artifact>>;
}

/// Count artifacts per kind (`{"screenshot": 2, "video": 1}`).
pub fn asset_type_counts(artifacts: &[Artifact]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for artifact in artifacts {
        *counts.entry(artifact.kind.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

/// [`MediaCapture`] that shells out to Chrome and ffmpeg.
pub struct ToolCapture {
    runner: Arc<dyn ProcessRunner>,
    assets: Arc<dyn AssetStore>,
    data_dir: PathBuf,
    settings: CaptureConfig,
}

impl fmt::Debug for ToolCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolCapture")
            .field("data_dir", &self.data_dir)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ToolCapture {
    /// Create a capturer writing under `data_dir`.
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        assets: Arc<dyn AssetStore>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { runner, assets, data_dir: data_dir.into(), settings: CaptureConfig::default() }
    }

    /// Replace the tool settings.
    #[must_use]
    pub fn with_settings(mut self, settings: CaptureConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Directory holding a project's artifacts.
    pub fn asset_dir(&self, project_id: Uuid) -> PathBuf {
        self.data_dir.join("projects").join(project_id.to_string()).join("assets")
    }

    fn invocation(&self, request: &CaptureRequest, dir: &Path, file: &Path) -> Invocation {
        let file = file.to_string_lossy().into_owned();

        let invocation = match request.kind {
            CaptureKind::Screenshot => Invocation::new(&self.settings.chrome_binary, dir).args([
                "--headless".to_string(),
                "--no-sandbox".to_string(),
                "--disable-gpu".to_string(),
                format!("--window-size={}", self.settings.window_size),
                format!("--screenshot={}", file),
                request.url.clone(),
            ]),
            CaptureKind::Video => {
                let secs = request.duration_secs.unwrap_or(self.settings.default_video_duration);
                Invocation::new(&self.settings.ffmpeg_binary, dir).args([
                    "-f".to_string(),
                    "x11grab".to_string(),
                    "-video_size".to_string(),
                    self.settings.video_size.clone(),
                    "-i".to_string(),
                    self.settings.display.clone(),
                    "-t".to_string(),
                    secs.to_string(),
                    "-c:v".to_string(),
                    "libx264".to_string(),
                    "-preset".to_string(),
                    "ultrafast".to_string(),
                    "-y".to_string(),
                    file,
                ])
            }
        };
        invocation.timeout(self.settings.timeout())
    }
}

impl MediaCapture for ToolCapture {
    fn capture(&self, request: &CaptureRequest) -> EngineResult<Artifact> {
        let id = Uuid::new_v4();
        let dir = self.asset_dir(request.project_id);
        fs::create_dir_all(&dir)?;
        let file = dir.join(format!("{}.{}", id, request.kind.extension()));

        let invocation = self.invocation(request, &dir, &file);
        tracing::debug!(
            kind = %request.kind,
            url = %request.url,
            command = %invocation.display(),
            "Capturing"
        );

        let output = self.runner.run(&invocation)?;
        if !output.success() {
            return Err(EngineError::ExternalTool {
                program: invocation.program,
                reason: output.failure_reason(),
            });
        }
        if !file.is_file() {
            return Err(EngineError::ExternalTool {
                program: invocation.program,
                reason: format!("no output written to {}", file.display()),
            });
        }

        let title = match request.kind {
            CaptureKind::Screenshot => format!("Screenshot of {}", request.url),
            CaptureKind::Video => format!("Video of {}", request.url),
        };
        let artifact = Artifact {
            id,
            project_id: request.project_id,
            kind: request.kind,
            title,
            file_path: file,
            source_url: request.url.clone(),
            requested_by: request.requested_by.clone(),
            created_at: Utc::now(),
        };
        self.assets.record_asset(&artifact)?;

        tracing::info!(
            project_id = %artifact.project_id,
            artifact_id = %artifact.id,
            kind = %artifact.kind,
            "Artifact captured"
        );
        Ok(artifact)
    }

    fn project_assets(&self, project_id: Uuid) -> EngineResult<Vec<Artifact>> {
        self.assets.list_assets(project_id)
    }
}
