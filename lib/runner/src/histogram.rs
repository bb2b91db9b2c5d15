use std::collections::BTreeMap;
use std::ops::AddAssign;

use serde::Serialize;

use crate::comparison::Verdict;

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize)]
pub struct Counts {
    pub wins: usize,
    pub passes: usize,
    pub fails: usize,
    pub timeouts: usize,
    pub errors: usize,
}

impl Counts {
    pub fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Win => self.wins += 1,
            Verdict::Pass => self.passes += 1,
            Verdict::Fail => self.fails += 1,
            Verdict::Timeout => self.timeouts += 1,
            Verdict::Error => self.errors += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.wins + self.passes + self.fails + self.timeouts + self.errors
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, other: Self) {
        self.wins += other.wins;
        self.passes += other.passes;
        self.fails += other.fails;
        self.timeouts += other.timeouts;
        self.errors += other.errors;
    }
}

/// Verdict counts, in total and per requested time limit.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Histogram {
    pub totals: Counts,
    pub by_time_limit: BTreeMap<u64, Counts>,
}

impl Histogram {
    pub fn record(&mut self, time_limit: u64, verdict: Verdict) {
        self.totals.add(verdict);
        self.by_time_limit.entry(time_limit).or_default().add(verdict);
    }

    pub fn merge(&mut self, other: &Histogram) {
        self.totals += other.totals;
        for (&time_limit, &counts) in other.by_time_limit.iter() {
            *self.by_time_limit.entry(time_limit).or_default() += counts;
        }
    }

    pub fn total(&self) -> usize {
        self.totals.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        let mut hist = Histogram::default();
        hist.record(5, Verdict::Win);
        hist.record(5, Verdict::Fail);
        hist.record(10, Verdict::Win);
        assert_eq!(hist.totals.wins, 2);
        assert_eq!(hist.totals.fails, 1);
        assert_eq!(hist.by_time_limit[&5].total(), 2);
        assert_eq!(hist.by_time_limit[&10].wins, 1);
        assert_eq!(hist.total(), 3);
    }

    #[test]
    fn test_merge() {
        let mut a = Histogram::default();
        a.record(5, Verdict::Timeout);
        let mut b = Histogram::default();
        b.record(5, Verdict::Pass);
        b.record(20, Verdict::Error);
        a.merge(&b);
        assert_eq!(a.total(), 3);
        assert_eq!(a.by_time_limit[&5], Counts { timeouts: 1, passes: 1, ..Default::default() });
        assert_eq!(a.by_time_limit[&20].errors, 1);
    }
}
