use std::collections::{BTreeMap, BTreeSet};

use super::clause::Clause;

/// Clause-level statistics collected by [`ParseMode::Stats`](super::ParseMode::Stats).
///
/// Clause lists (`tautologies`, `contradictions`, `invalids`) hold indices into `clauses`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaStats {
    pub clauses: Vec<Clause>,
    pub true_vars: BTreeSet<u32>,
    pub false_vars: BTreeSet<u32>,
    pub pure_vars: BTreeSet<u32>,
    pub tautologies: Vec<usize>,
    pub contradictions: Vec<usize>,
    pub invalids: Vec<usize>,
    /// Clause size -> number of valid clauses of that size.
    pub sizes: BTreeMap<usize, usize>,
}

impl FormulaStats {
    pub(crate) fn add(&mut self, clause: Clause) {
        let index = self.clauses.len();
        if clause.valid {
            self.true_vars.extend(clause.positive.iter().copied());
            self.false_vars.extend(clause.negative.iter().copied());
            *self.sizes.entry(clause.size).or_default() += 1;
            if clause.tautology {
                self.tautologies.push(index);
            }
            if clause.contradiction {
                self.contradictions.push(index);
            }
        } else {
            self.invalids.push(index);
        }
        self.clauses.push(clause);
    }

    pub(crate) fn finish(&mut self) {
        self.pure_vars = self.true_vars.symmetric_difference(&self.false_vars).copied().collect();
    }

    /// Every clause is a tautology (vacuously false for an empty formula).
    pub fn is_tautology(&self) -> bool {
        !self.clauses.is_empty() && self.tautologies.len() == self.clauses.len()
    }

    pub fn clauses_of_size(&self, size: usize) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(move |c| c.valid && c.size == size)
    }
}
