//! External process invocation.
//!
//! Health probes and media capture run third-party tools (`npm`, `cargo`,
//! `docker`, headless Chrome, ...). Everything goes through the
//! [`ProcessRunner`] trait so the engines can be driven by a scripted runner in
//! tests and by [`SystemRunner`] in production.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use super::error::{EngineError, EngineResult};

/// A single external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path
    pub program: String,

    /// Arguments passed verbatim (no shell interpretation)
    pub args: Vec<String>,

    /// Working directory for the process
    pub working_dir: PathBuf,

    /// Deadline after which the process is killed
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Create an invocation of `program` inside `working_dir`.
    pub fn new(program: impl Into<String>, working_dir: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.as_ref().to_path_buf(),
            timeout: None,
        }
    }

    /// Append a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set (or clear) the execution deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Human readable command line, e.g. `npm run build`.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// The process exited on its own (code is `None` when killed by a signal)
    Exited(Option<i32>),
    /// The deadline passed and the process was killed
    TimedOut,
}

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit state
    pub state: ExitState,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Wall-clock time the process ran
    pub duration: Duration,
}

impl ProcessOutput {
    /// Build an output for a process that exited with `code`.
    pub fn exited(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            state: ExitState::Exited(Some(code)),
            stdout: stdout.into(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    /// Build an output for a process that hit its deadline.
    pub fn timed_out(duration: Duration) -> Self {
        Self { state: ExitState::TimedOut, stdout: String::new(), stderr: String::new(), duration }
    }

    /// Check if the process exited with code 0.
    pub fn success(&self) -> bool {
        self.state == ExitState::Exited(Some(0))
    }

    /// Check if the process was killed at its deadline.
    pub fn timed_out_state(&self) -> bool {
        self.state == ExitState::TimedOut
    }

    /// Get the exit code.
    pub fn code(&self) -> Option<i32> {
        match self.state {
            ExitState::Exited(code) => code,
            ExitState::TimedOut => None,
        }
    }

    /// Describe a non-successful exit, for error messages.
    pub fn failure_reason(&self) -> String {
        match self.state {
            ExitState::Exited(Some(code)) => format!("exit status {}", code),
            ExitState::Exited(None) => "terminated by signal".to_string(),
            ExitState::TimedOut => format!("timed out after {:.1?}", self.duration),
        }
    }
}

/// Runs external commands synchronously.
pub trait ProcessRunner: Send + Sync {
    /// Run `invocation` to completion (or to its deadline).
    ///
    /// Returns `Err` only when the process could not be started at all; a
    /// non-zero exit is reported through [`ProcessOutput::state`].
    fn run(&self, invocation: &Invocation) -> EngineResult<ProcessOutput>;
}

/// [`ProcessRunner`] backed by `std::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    /// How often to check whether the child has exited
    poll_interval: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(50) }
    }
}

impl SystemRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exit polling interval.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> EngineResult<ProcessOutput> {
        let start = Instant::now();

        let mut cmd = ProcessCommand::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so a deadline takes down everything the tool spawned.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| EngineError::ExternalTool {
            program: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        let (tx, rx) = mpsc::channel();
        drain(child.stdout.take(), Stream::Stdout, tx.clone());
        drain(child.stderr.take(), Stream::Stderr, tx);

        let deadline = invocation.timeout.map(|t| start + t);

        loop {
            if let Some(status) = child.try_wait()? {
                // Background grandchildren can keep the pipes open past exit.
                return match collect(&rx, deadline) {
                    Some((stdout, stderr)) => Ok(ProcessOutput {
                        state: ExitState::Exited(status.code()),
                        stdout,
                        stderr,
                        duration: start.elapsed(),
                    }),
                    None => {
                        tracing::warn!(
                            tool = %invocation.display(),
                            timeout = ?invocation.timeout,
                            "Output still open at deadline, killing process group"
                        );
                        kill_tree(&mut child);
                        Ok(ProcessOutput::timed_out(start.elapsed()))
                    }
                };
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(
                    tool = %invocation.display(),
                    timeout = ?invocation.timeout,
                    "Killing process after deadline"
                );
                kill_tree(&mut child);
                return Ok(ProcessOutput::timed_out(start.elapsed()));
            }

            thread::sleep(self.poll_interval);
        }
    }
}

/// Which pipe a reader thread drained.
#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Read a pipe to the end on a background thread and send the text to `tx`.
fn drain<R>(pipe: Option<R>, stream: Stream, tx: Sender<(Stream, String)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}

/// Wait for both pipes to close. `None` when the deadline passes first.
fn collect(
    rx: &Receiver<(Stream, String)>,
    deadline: Option<Instant>,
) -> Option<(String, String)> {
    let mut stdout = None;
    let mut stderr = None;

    while stdout.is_none() || stderr.is_none() {
        let received = match deadline {
            Some(d) => match rx.recv_timeout(d.saturating_duration_since(Instant::now())) {
                Ok(received) => received,
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(received) => received,
                Err(_) => break,
            },
        };
        match received {
            (Stream::Stdout, text) => stdout = Some(text),
            (Stream::Stderr, text) => stderr = Some(text),
        }
    }

    Some((stdout.unwrap_or_default(), stderr.unwrap_or_default()))
}

/// Kill the child together with its process group, then reap it.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Ok(pgid) = i32::try_from(child.id()) {
            if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                tracing::debug!(pgid, error = %e, "Process group already gone");
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
