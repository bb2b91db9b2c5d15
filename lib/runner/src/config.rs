use std::time::Duration;

use snafu::ensure;
use strum::IntoStaticStr;

use crate::adapter::SolverAdapter;
use crate::error::*;

pub const DEFAULT_POLL_WINDOW: Duration = Duration::from_millis(10);
pub const DEFAULT_SWEEP: Duration = Duration::from_millis(100);
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Optimized,
    Baseline,
    Validator,
}

/// A solver family plus an optional executable overriding the adapter's default.
#[derive(Debug, Clone)]
pub struct SolverSlot {
    pub adapter: SolverAdapter,
    pub executable: Option<String>,
}

/// How the scheduler drives in-flight comparisons.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Drive {
    /// Block on the oldest comparison until it finishes.
    #[default]
    Blocking,
    /// Poll all comparisons, sleeping `sweep` between fruitless sweeps.
    Polling { sweep: Duration },
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Whole seconds handed to the solvers, 0 meaning unbounded.
    pub time_limit: u64,
    pub optimized: Option<SolverSlot>,
    pub baseline: Option<SolverSlot>,
    pub validator: Option<SolverSlot>,
    pub max_concurrency: usize,
    pub drive: Drive,
    pub poll_window: Duration,
    /// Kill bounded runs still alive this long after their time limit. `None` trusts the solver.
    pub kill_grace: Option<Duration>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            time_limit: 0,
            optimized: None,
            baseline: None,
            validator: None,
            max_concurrency: 1,
            drive: Drive::default(),
            poll_window: DEFAULT_POLL_WINDOW,
            kill_grace: Some(DEFAULT_KILL_GRACE),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(mut self, role: Role, adapter: SolverAdapter, executable: Option<String>) -> Self {
        *self.slot_mut(role) = Some(SolverSlot { adapter, executable });
        self
    }

    pub fn with_time_limit(mut self, time_limit: u64) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_drive(mut self, drive: Drive) -> Self {
        self.drive = drive;
        self
    }

    pub fn with_poll_window(mut self, poll_window: Duration) -> Self {
        self.poll_window = poll_window;
        self
    }

    pub fn with_kill_grace(mut self, kill_grace: Option<Duration>) -> Self {
        self.kill_grace = kill_grace;
        self
    }

    pub fn solver(&self, role: Role) -> Option<&SolverSlot> {
        match role {
            Role::Optimized => self.optimized.as_ref(),
            Role::Baseline => self.baseline.as_ref(),
            Role::Validator => self.validator.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<SolverSlot> {
        match role {
            Role::Optimized => &mut self.optimized,
            Role::Baseline => &mut self.baseline,
            Role::Validator => &mut self.validator,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_concurrency >= 1, ZeroConcurrencySnafu);
        ensure!(
            self.optimized.is_some() || self.baseline.is_some() || self.validator.is_some(),
            NoSolverSnafu
        );
        Ok(())
    }
}
