use std::fmt::{Display, Formatter};
use std::time::Duration;

use itertools::Itertools;
use log::debug;
use serde::Serialize;
use strum::IntoStaticStr;

use sat_arena_core::cnf::Formula;

use crate::config::{BenchConfig, Role};
use crate::invocation::SolverInvocation;
use crate::outcome::{Answer, Outcome};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, IntoStaticStr, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Win,
    Pass,
    Fail,
    Timeout,
    Error,
}

impl Verdict {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// WIN or PASS.
    pub fn is_good(self) -> bool {
        matches!(self, Verdict::Win | Verdict::Pass)
    }
}

/// How the optimized run relates to the baseline run.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, IntoStaticStr, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Relation {
    Consistent,
    Fast,
    Faster,
    Slower,
    Slow,
    Odd,
    Inconsistent,
}

/// Who vouches for the verdict.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, IntoStaticStr, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Certification {
    /// No usable validator answer; the runners judged themselves.
    #[strum(serialize = "SELF")]
    #[serde(rename = "SELF")]
    SelfCheck,
    Validated,
    /// The validator gave a definite answer the runner contradicts.
    Refuted,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Classification {
    pub verdict: Verdict,
    pub consistent: bool,
    /// Baseline time minus optimized time, when both ran.
    pub delta: Option<f64>,
    pub relation: Option<Relation>,
    pub certification: Option<Certification>,
}

impl Classification {
    fn new(verdict: Verdict, consistent: bool, relation: Option<Relation>) -> Self {
        Self {
            verdict,
            consistent,
            delta: None,
            relation,
            certification: None,
        }
    }

    /// Judges a formula from the answers of whichever roles ran.
    pub fn classify(optimized: Option<Answer>, baseline: Option<Answer>, validator: Option<Answer>) -> Self {
        let (mut result, runner) = match (optimized, baseline) {
            (Some(opt), Some(base)) => (Self::pair(opt, base), Some(opt)),
            (Some(single), None) | (None, Some(single)) => (Self::new(single_verdict(single), true, None), Some(single)),
            (None, None) => (Self::new(Verdict::Error, true, None), None),
        };

        match (runner, validator) {
            (Some(runner), Some(val)) if val.outcome.is_good() => {
                if runner.outcome.is_good() && runner.outcome != val.outcome {
                    result.verdict = Verdict::Fail;
                    result.certification = Some(Certification::Refuted);
                } else {
                    result.certification = Some(Certification::Validated);
                }
            }
            (Some(_), _) => result.certification = Some(Certification::SelfCheck),
            (None, Some(val)) => {
                result.verdict = single_verdict(val);
                result.certification = Some(Certification::Validated);
            }
            (None, None) => {}
        }
        result
    }

    fn pair(opt: Answer, base: Answer) -> Self {
        use Outcome::*;
        let delta = base.time - opt.time;
        let (verdict, consistent, relation) = match (opt.outcome, base.outcome) {
            (Timeout, Timeout) => (Verdict::Timeout, true, Relation::Consistent),
            (_, Timeout) => (Verdict::Win, true, Relation::Fast),
            (Undefined, Undefined) => (Verdict::Fail, true, Relation::Consistent),
            (o, Undefined) if o.is_good() => (Verdict::Pass, false, Relation::Odd),
            (_, Undefined) => (Verdict::Fail, false, Relation::Inconsistent),
            (o, b) if o == b && o.is_good() => {
                if delta >= 0.0 {
                    (Verdict::Win, true, Relation::Faster)
                } else {
                    (Verdict::Pass, true, Relation::Slower)
                }
            }
            (Error, Error) => (Verdict::Fail, true, Relation::Consistent),
            (Timeout, b) if b.is_good() => (Verdict::Timeout, false, Relation::Slow),
            _ => (Verdict::Fail, false, Relation::Inconsistent),
        };
        Self {
            verdict,
            consistent,
            delta: Some(delta),
            relation: Some(relation),
            certification: None,
        }
    }

    /// `"<prefix>[, <relation>]"`, prefix right-aligned to 9 columns.
    pub fn label(&self) -> String {
        let prefix = match (self.certification, self.verdict) {
            (Some(Certification::Refuted), _) => "REFUTED",
            (Some(Certification::SelfCheck), Verdict::Win) => "SELF WIN",
            (Some(Certification::SelfCheck), Verdict::Pass) => "SELF PASS",
            (Some(Certification::SelfCheck), Verdict::Timeout) => "SELF TIMEOUT",
            (Some(Certification::SelfCheck), _) => "SELF FAIL",
            (_, verdict) => verdict.name(),
        };
        match self.relation {
            Some(relation) => format!("{:>9}, {}", prefix, <&str>::from(relation)),
            None => format!("{:>9}", prefix),
        }
    }
}

fn single_verdict(answer: Answer) -> Verdict {
    if answer.outcome.is_good() {
        Verdict::Win
    } else if answer.outcome.is_timeout() {
        Verdict::Timeout
    } else {
        Verdict::Fail
    }
}

/// Runs the configured solvers on one formula and classifies the result.
#[derive(Debug)]
pub struct ComparisonEngine {
    formula: Formula,
    index: usize,
    total: usize,
    time_limit: u64,
    poll_window: Duration,
    optimized: Option<SolverInvocation>,
    baseline: Option<SolverInvocation>,
    validator: Option<SolverInvocation>,
}

impl ComparisonEngine {
    /// `index` is 1-based within a batch of `total` formulas.
    pub fn new(formula: Formula, index: usize, total: usize, config: &BenchConfig) -> Self {
        let invocation = |role: Role| {
            config.solver(role).map(|slot| {
                SolverInvocation::new(
                    slot.adapter,
                    slot.executable.as_deref(),
                    formula.abs_path(),
                    config.time_limit,
                    config.kill_grace,
                )
            })
        };
        let optimized = invocation(Role::Optimized);
        let baseline = invocation(Role::Baseline);
        let validator = invocation(Role::Validator);
        Self {
            formula,
            index,
            total,
            time_limit: config.time_limit,
            poll_window: config.poll_window,
            optimized,
            baseline,
            validator,
        }
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    fn invocations_mut(&mut self) -> impl Iterator<Item = &mut SolverInvocation> {
        [&mut self.optimized, &mut self.baseline, &mut self.validator]
            .into_iter()
            .flatten()
    }

    pub fn load(&mut self) {
        debug!("[{}/{}] Starting on {}", self.index, self.total, self.formula.abs_path().display());
        for invocation in self.invocations_mut() {
            invocation.load();
        }
    }

    /// Gives every unfinished invocation up to `window`; returns whether all are parsed.
    pub fn poll(&mut self, window: Duration) -> bool {
        let mut done = true;
        for invocation in self.invocations_mut() {
            if !invocation.is_parsed() {
                done &= invocation.poll(window);
            }
        }
        done
    }

    /// Blocks until every invocation is parsed, then classifies.
    pub fn wait(self) -> ComparisonRecord {
        self.finish()
    }

    /// Classifies the formula, first sweeping any invocation still running.
    ///
    /// Invocations are swept together rather than waited on one by one,
    /// so each measured time ends when its own process exits.
    pub fn finish(mut self) -> ComparisonRecord {
        let window = self.poll_window;
        while !self.poll(window) {}
        let answer = |inv: &Option<SolverInvocation>| inv.as_ref().and_then(SolverInvocation::answer);
        let classification = Classification::classify(
            answer(&self.optimized),
            answer(&self.baseline),
            answer(&self.validator),
        );
        let record = ComparisonRecord {
            formula: self.formula,
            index: self.index,
            total: self.total,
            time_limit: self.time_limit,
            optimized: self.optimized,
            baseline: self.baseline,
            validator: self.validator,
            classification,
        };
        debug!("[{}/{}] {}", record.index, record.total, record);
        record
    }
}

/// The classified, immutable result for one formula.
#[derive(Debug)]
pub struct ComparisonRecord {
    formula: Formula,
    index: usize,
    total: usize,
    time_limit: u64,
    optimized: Option<SolverInvocation>,
    baseline: Option<SolverInvocation>,
    validator: Option<SolverInvocation>,
    classification: Classification,
}

impl ComparisonRecord {
    pub fn formula(&self) -> &Formula {
        &self.formula
    }
    pub fn index(&self) -> usize {
        self.index
    }
    pub fn total(&self) -> usize {
        self.total
    }
    pub fn time_limit(&self) -> u64 {
        self.time_limit
    }
    pub fn optimized(&self) -> Option<&SolverInvocation> {
        self.optimized.as_ref()
    }
    pub fn baseline(&self) -> Option<&SolverInvocation> {
        self.baseline.as_ref()
    }
    pub fn validator(&self) -> Option<&SolverInvocation> {
        self.validator.as_ref()
    }
    pub fn classification(&self) -> &Classification {
        &self.classification
    }
    pub fn verdict(&self) -> Verdict {
        self.classification.verdict
    }
    pub fn delta(&self) -> Option<f64> {
        self.classification.delta
    }
    pub fn is_consistent(&self) -> bool {
        self.classification.consistent
    }
    pub fn label(&self) -> String {
        self.classification.label()
    }

    pub fn invocations(&self) -> impl Iterator<Item = &SolverInvocation> {
        [&self.optimized, &self.baseline, &self.validator].into_iter().flatten()
    }
}

impl Display for ComparisonRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} delta = {:.6}, [{}]",
            self.label(),
            self.delta().unwrap_or_default(),
            self.invocations().join(", ")
        )
    }
}
