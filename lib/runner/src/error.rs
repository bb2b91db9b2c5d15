use std::io;

use snafu::Snafu;

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Why an invocation ended without a decoded answer.
///
/// Stored on the invocation, never propagated: the outcome becomes `ERROR`
/// (or `TIMEOUT` for [`InvocationError::Killed`]).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InvocationError {
    #[snafu(display("Could not start '{}': {}", executable, source))]
    Spawn { executable: String, source: io::Error },

    #[snafu(display("Could not wait for '{}': {}", executable, source))]
    Wait { executable: String, source: io::Error },

    #[snafu(display("Could not capture the output of '{}': {}", executable, source))]
    Capture { executable: String, source: io::Error },

    #[snafu(display("Could not decode the output of '{}': {}", executable, source))]
    Decode { executable: String, source: DecodeError },

    #[snafu(display("Killed '{}' after {:.3}s", executable, elapsed))]
    Killed { executable: String, elapsed: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    #[snafu(display("unexpected exit code {:?}", code))]
    ExitCode { code: Option<i32> },

    #[snafu(display("no solver report in '{}'", excerpt))]
    MissingReport { excerpt: String },

    #[snafu(display("bad time '{}' in solver report", text))]
    BadTime { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("Concurrency bound must be at least 1"))]
    ZeroConcurrency,

    #[snafu(display("No solver configured"))]
    NoSolver,
}
