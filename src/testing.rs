//! Test doubles shared by the unit tests.

use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::core::{EngineError, EngineResult, Invocation, ProcessOutput, ProcessRunner};

/// [`ProcessRunner`] answering from a script instead of spawning processes.
///
/// Entries match when the command line starts with the scripted prefix; the
/// first matching entry wins. Unscripted commands fail to spawn, like a tool
/// missing from `PATH`.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    script: Vec<(String, ProcessOutput)>,
    touch_outputs: bool,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `output`.
    pub fn on(mut self, prefix: &str, output: ProcessOutput) -> Self {
        self.script.push((prefix.to_string(), output));
        self
    }

    /// On success, create the file a capture tool would have written.
    pub fn touch_outputs(mut self) -> Self {
        self.touch_outputs = true;
        self
    }

    /// Command lines run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(Invocation::display).collect()
    }

    /// Invocations run so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    fn touch(invocation: &Invocation) {
        let target = invocation
            .args
            .iter()
            .find_map(|a| a.strip_prefix("--screenshot="))
            .or_else(|| invocation.args.last().map(String::as_str).filter(|a| a.ends_with(".mp4")));

        if let Some(path) = target {
            let path = Path::new(path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, b"fake").unwrap();
        }
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> EngineResult<ProcessOutput> {
        self.calls.lock().push(invocation.clone());

        let display = invocation.display();
        let output = self
            .script
            .iter()
            .find(|(prefix, _)| display.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .ok_or_else(|| EngineError::ExternalTool {
                program: invocation.program.clone(),
                reason: "No such file or directory (os error 2)".to_string(),
            })?;

        if self.touch_outputs && output.success() {
            Self::touch(invocation);
        }
        Ok(output)
    }
}

/// Temporary project directory containing the given (empty) files.
pub fn project_dir(files: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for file in files {
        fs::write(dir.path().join(file), "").unwrap();
    }
    dir
}
