use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{debug, trace, warn};
use snafu::IntoError;
use wait_timeout::ChildExt;

use crate::adapter::SolverAdapter;
use crate::error::*;
use crate::outcome::{Answer, Outcome};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum State {
    NotStarted,
    Running,
    Parsed,
}

/// One run of one solver executable against one formula.
#[derive(Debug)]
pub struct SolverInvocation {
    adapter: SolverAdapter,
    executable: String,
    input: PathBuf,
    time_limit: u64,
    kill_grace: Option<Duration>,
    state: State,
    child: Option<Child>,
    capture: Option<File>,
    time_start: Option<Instant>,
    exit_code: Option<i32>,
    stderr: String,
    outcome: Outcome,
    time: f64,
    error: Option<InvocationError>,
}

impl SolverInvocation {
    /// `time_limit` is in whole seconds, 0 meaning unbounded.
    ///
    /// With a `kill_grace`, a bounded run still alive after `time_limit + kill_grace`
    /// is killed and recorded as `TIMEOUT`.
    pub fn new<P: AsRef<Path>>(
        adapter: SolverAdapter,
        executable: Option<&str>,
        input: P,
        time_limit: u64,
        kill_grace: Option<Duration>,
    ) -> Self {
        Self {
            adapter,
            executable: executable.unwrap_or(adapter.executable).to_string(),
            input: input.as_ref().to_path_buf(),
            time_limit,
            kill_grace,
            state: State::NotStarted,
            child: None,
            capture: None,
            time_start: None,
            exit_code: None,
            stderr: String::new(),
            outcome: Outcome::Error,
            time: 0.0,
            error: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.adapter.name
    }
    pub fn adapter(&self) -> &SolverAdapter {
        &self.adapter
    }
    pub fn executable(&self) -> &str {
        &self.executable
    }
    pub fn input(&self) -> &Path {
        &self.input
    }
    pub fn time_limit(&self) -> u64 {
        self.time_limit
    }
    pub fn state(&self) -> State {
        self.state
    }
    pub fn is_parsed(&self) -> bool {
        self.state == State::Parsed
    }
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
    pub fn stderr(&self) -> &str {
        &self.stderr
    }
    pub fn error(&self) -> Option<&InvocationError> {
        self.error.as_ref()
    }

    /// Meaningful once parsed; `ERROR` before that.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Seconds: solver-reported if the adapter extracts a time, measured otherwise.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_good(&self) -> bool {
        self.is_parsed() && self.outcome.is_good()
    }

    pub fn answer(&self) -> Option<Answer> {
        self.is_parsed().then(|| Answer::new(self.outcome, self.time))
    }

    /// Executable followed by the substituted argument template.
    pub fn build_command(&self) -> Vec<String> {
        let mut command = vec![self.executable.clone()];
        command.extend(self.adapter.build_args(&self.input, self.time_limit));
        command
    }

    fn deadline(&self) -> Option<Duration> {
        match (self.time_limit, self.kill_grace) {
            (0, _) | (_, None) => None,
            (limit, Some(grace)) => Some(Duration::from_secs(limit) + grace),
        }
    }

    fn elapsed(&self) -> f64 {
        self.time_start.map(|t| t.elapsed().as_secs_f64()).unwrap_or_default()
    }
}

impl SolverInvocation {
    /// Spawns the solver. A failed spawn goes straight to the parsed state with `ERROR`.
    pub fn load(&mut self) {
        if self.state != State::NotStarted {
            return;
        }
        let command = self.build_command();
        debug!("Starting: {}", command.iter().join(" "));

        let stderr = if self.adapter.capture_stderr {
            match tempfile::tempfile().and_then(|f| Ok((f.try_clone()?, f))) {
                Ok((capture, stderr)) => {
                    self.capture = Some(capture);
                    Stdio::from(stderr)
                }
                Err(e) => {
                    let executable = self.executable.clone();
                    return self.fail(CaptureSnafu { executable }.into_error(e));
                }
            }
        } else {
            Stdio::null()
        };

        let spawned = Command::new(&command[0])
            .args(&command[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn();
        self.time_start = Some(Instant::now());
        match spawned {
            Ok(child) => {
                trace!("Spawned pid {} for '{}'", child.id(), self.input.display());
                self.child = Some(child);
                self.state = State::Running;
            }
            Err(e) => {
                let executable = self.executable.clone();
                self.fail(SpawnSnafu { executable }.into_error(e));
            }
        }
    }

    /// Waits at most `window` for the process to exit; returns whether the invocation is parsed.
    ///
    /// Starts the process first if it was not started yet.
    pub fn poll(&mut self, window: Duration) -> bool {
        if self.state == State::NotStarted {
            self.load();
        }
        let Some(child) = self.child.as_mut() else {
            return self.is_parsed();
        };
        match child.wait_timeout(window) {
            Ok(Some(status)) => self.complete(status),
            Ok(None) => {
                if self.deadline().is_some_and(|d| self.elapsed() >= d.as_secs_f64()) {
                    self.kill();
                }
            }
            Err(e) => {
                let executable = self.executable.clone();
                self.abort();
                self.fail(WaitSnafu { executable }.into_error(e));
            }
        }
        self.is_parsed()
    }

    /// Blocks until the process exits (or is killed at its deadline).
    pub fn wait(&mut self) -> Outcome {
        if self.state == State::NotStarted {
            self.load();
        }
        let deadline = self.deadline();
        let elapsed = Duration::from_secs_f64(self.elapsed());
        if let Some(child) = self.child.as_mut() {
            let status = match deadline {
                Some(deadline) => child.wait_timeout(deadline.saturating_sub(elapsed)),
                None => child.wait().map(Some),
            };
            match status {
                Ok(Some(status)) => self.complete(status),
                Ok(None) => self.kill(),
                Err(e) => {
                    let executable = self.executable.clone();
                    self.abort();
                    self.fail(WaitSnafu { executable }.into_error(e));
                }
            }
        }
        self.outcome
    }

    fn complete(&mut self, status: ExitStatus) {
        self.child = None;
        self.time = self.elapsed();
        self.exit_code = status.code();
        trace!("'{}' exited with {} after {:.3}s", self.executable, status, self.time);

        if let Some(mut capture) = self.capture.take() {
            let mut stderr = Vec::new();
            let read = capture
                .seek(SeekFrom::Start(0))
                .and_then(|_| capture.read_to_end(&mut stderr));
            if let Err(e) = read {
                let executable = self.executable.clone();
                return self.fail(CaptureSnafu { executable }.into_error(e));
            }
            self.stderr = String::from_utf8_lossy(&stderr).into_owned();
        }
        self.parse();
    }

    fn parse(&mut self) {
        match self.adapter.decode(self.exit_code, &self.stderr) {
            Ok(decoded) => {
                self.outcome = decoded.outcome;
                if let Some(time) = decoded.time {
                    self.time = time;
                }
            }
            Err(e) => {
                let error = DecodeSnafu {
                    executable: self.executable.clone(),
                }
                .into_error(e);
                warn!("{}", error);
                self.outcome = Outcome::Error;
                self.error = Some(error);
            }
        }
        self.state = State::Parsed;
    }

    fn kill(&mut self) {
        self.abort();
        self.time = self.elapsed();
        self.outcome = Outcome::Timeout;
        self.error = Some(InvocationError::Killed {
            executable: self.executable.clone(),
            elapsed: self.time,
        });
        self.state = State::Parsed;
        warn!("Killed '{}' on '{}' after {:.3}s", self.executable, self.input.display(), self.time);
    }

    /// Kills and reaps the child, if any.
    fn abort(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.capture = None;
    }

    fn fail(&mut self, error: InvocationError) {
        warn!("{}", error);
        self.error = Some(error);
        self.time = self.elapsed();
        self.outcome = Outcome::Error;
        self.state = State::Parsed;
    }
}

impl Drop for SolverInvocation {
    fn drop(&mut self) {
        if self.child.is_some() {
            debug!("Dropping running '{}' on '{}'", self.executable, self.input.display());
            self.abort();
        }
    }
}

impl Display for SolverInvocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} = {} ({}, {}s)",
            self.name(),
            self.outcome.symbol(),
            self.exit_code.unwrap_or(-1),
            self.time
        )
    }
}
