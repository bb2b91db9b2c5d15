use std::fmt::{Display, Formatter};

use serde::Serialize;
use strum::IntoStaticStr;

/// Canonical result of one solver run.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, IntoStaticStr, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Sat,
    Unsat,
    Undefined,
    Timeout,
    Error,
}

impl Outcome {
    pub const fn symbol(self) -> char {
        match self {
            Outcome::Sat => 'T',
            Outcome::Unsat => 'F',
            Outcome::Undefined => '?',
            Outcome::Timeout => '*',
            Outcome::Error => '!',
        }
    }

    /// A definite answer: SAT or UNSAT.
    pub const fn is_good(self) -> bool {
        matches!(self, Outcome::Sat | Outcome::Unsat)
    }

    pub const fn is_timeout(self) -> bool {
        matches!(self, Outcome::Timeout)
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// What classification needs to know about a finished invocation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Answer {
    pub outcome: Outcome,
    /// Seconds.
    pub time: f64,
}

impl Answer {
    pub const fn new(outcome: Outcome, time: f64) -> Self {
        Self { outcome, time }
    }
}
