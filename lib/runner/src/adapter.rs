use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use snafu::OptionExt;
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::error::{BadTimeSnafu, DecodeError, ExitCodeSnafu, MissingReportSnafu};
use crate::outcome::Outcome;

/// Decoded result of a finished solver process.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Decoded {
    pub outcome: Outcome,
    /// Solver-reported time in seconds, if the solver reports one.
    pub time: Option<f64>,
}

pub type Decoder = fn(exit_code: Option<i32>, stderr: &str) -> Result<Decoded, DecodeError>;

/// How to run one solver family and read its answer.
///
/// `args` may contain the `{input}` and `{timelimit}` placeholders.
#[derive(Debug, Copy, Clone)]
pub struct SolverAdapter {
    pub name: &'static str,
    pub executable: &'static str,
    pub args: &'static [&'static str],
    pub capture_stderr: bool,
    pub decoder: Decoder,
}

impl SolverAdapter {
    pub fn build_args(&self, input: &Path, time_limit: u64) -> Vec<String> {
        let input = input.to_string_lossy();
        let time_limit = time_limit.to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{timelimit}", &time_limit))
            .collect()
    }

    pub fn decode(&self, exit_code: Option<i32>, stderr: &str) -> Result<Decoded, DecodeError> {
        (self.decoder)(exit_code, stderr)
    }
}

pub const UKSAT: SolverAdapter = SolverAdapter {
    name: "uksat",
    executable: "uksat",
    args: &["-t", "{timelimit}", "{input}"],
    capture_stderr: true,
    decoder: decode_uksat,
};

pub const UKSAT_NOWATCH: SolverAdapter = SolverAdapter {
    name: "nowatch",
    executable: "uksat",
    args: &["-W", "-t", "{timelimit}", "{input}"],
    capture_stderr: true,
    decoder: decode_uksat,
};

pub const MINISAT: SolverAdapter = SolverAdapter {
    name: "minisat",
    executable: "minisat",
    args: &["-verb=0", "-cpu-lim={timelimit}", "{input}"],
    capture_stderr: false,
    decoder: decode_minisat,
};

static UKSAT_REPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(SATISFIABLE|UNSATISFIABLE|TIMEOUT|UNDEFINED)\s+([\w.\-]+)\s+(-?\d+)").unwrap());

/// `uksat` prints `<STATUS> <seconds> <int>` first thing on stderr; the exit code carries the answer.
pub fn decode_uksat(exit_code: Option<i32>, stderr: &str) -> Result<Decoded, DecodeError> {
    let report = stderr.trim();
    let caps = UKSAT_REPORT.captures(report).context(MissingReportSnafu {
        excerpt: report.lines().next().unwrap_or_default(),
    })?;
    let time = caps[2].parse::<f64>().ok().context(BadTimeSnafu { text: &caps[2] })?;
    let outcome = match exit_code {
        Some(10) => Outcome::Sat,
        Some(20) => Outcome::Unsat,
        Some(30) => Outcome::Undefined,
        Some(40) => Outcome::Timeout,
        code => return ExitCodeSnafu { code }.fail(),
    };
    Ok(Decoded { outcome, time: Some(time) })
}

/// MiniSat exits with 0 when interrupted by its own CPU limit.
pub fn decode_minisat(exit_code: Option<i32>, _stderr: &str) -> Result<Decoded, DecodeError> {
    let outcome = match exit_code {
        Some(10) => Outcome::Sat,
        Some(20) => Outcome::Unsat,
        Some(0) => Outcome::Timeout,
        code => return ExitCodeSnafu { code }.fail(),
    };
    Ok(Decoded { outcome, time: None })
}

/// Built-in solver families, selectable by name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SolverKind {
    Uksat,
    UksatNowatch,
    Minisat,
}

impl SolverKind {
    pub const fn adapter(self) -> SolverAdapter {
        match self {
            SolverKind::Uksat => UKSAT,
            SolverKind::UksatNowatch => UKSAT_NOWATCH,
            SolverKind::Minisat => MINISAT,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_build_args() {
        let input = PathBuf::from("/data/f.cnf");
        assert_eq!(UKSAT.build_args(&input, 5), ["-t", "5", "/data/f.cnf"]);
        assert_eq!(UKSAT_NOWATCH.build_args(&input, 5), ["-W", "-t", "5", "/data/f.cnf"]);
        assert_eq!(MINISAT.build_args(&input, 0), ["-verb=0", "-cpu-lim=0", "/data/f.cnf"]);
    }

    #[test]
    fn test_decode_uksat() {
        let decoded = decode_uksat(Some(10), "  SATISFIABLE 1.25 1\nextra noise").unwrap();
        assert_eq!(decoded, Decoded { outcome: Outcome::Sat, time: Some(1.25) });
        let decoded = decode_uksat(Some(20), "UNSATISFIABLE 3 0\n").unwrap();
        assert_eq!(decoded.outcome, Outcome::Unsat);
        assert_eq!(decode_uksat(Some(30), "UNDEFINED 0.1 -1").unwrap().outcome, Outcome::Undefined);
        assert_eq!(decode_uksat(Some(40), "TIMEOUT 10.0 0").unwrap().outcome, Outcome::Timeout);
    }

    #[test]
    fn test_decode_uksat_failures() {
        assert!(matches!(
            decode_uksat(Some(10), "segfault\nSATISFIABLE 1 1"),
            Err(DecodeError::MissingReport { .. })
        ));
        assert!(matches!(
            decode_uksat(Some(10), "SATISFIABLE 1.2.3 1"),
            Err(DecodeError::BadTime { .. })
        ));
        assert_eq!(
            decode_uksat(Some(1), "SATISFIABLE 1 1"),
            Err(DecodeError::ExitCode { code: Some(1) })
        );
        assert_eq!(decode_uksat(None, "SATISFIABLE 1 1"), Err(DecodeError::ExitCode { code: None }));
    }

    #[test]
    fn test_decode_minisat() {
        assert_eq!(decode_minisat(Some(10), "").unwrap().outcome, Outcome::Sat);
        assert_eq!(decode_minisat(Some(20), "").unwrap().outcome, Outcome::Unsat);
        assert_eq!(decode_minisat(Some(0), "").unwrap().outcome, Outcome::Timeout);
        assert_eq!(decode_minisat(Some(0), "").unwrap().time, None);
        assert!(decode_minisat(Some(3), "").is_err());
    }

    #[test]
    fn test_kind_by_name() {
        assert_eq!("uksat".parse::<SolverKind>().unwrap(), SolverKind::Uksat);
        assert_eq!("UKSAT-NOWATCH".parse::<SolverKind>().unwrap(), SolverKind::UksatNowatch);
        assert_eq!("MiniSat".parse::<SolverKind>().unwrap(), SolverKind::Minisat);
        assert!("cadical".parse::<SolverKind>().is_err());
        for kind in SolverKind::iter() {
            let name: &'static str = kind.into();
            assert_eq!(name.parse::<SolverKind>().unwrap(), kind);
        }
    }
}
