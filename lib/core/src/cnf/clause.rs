use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::lit::{Lit, Token};

/// A clause line retained by the statistics parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub index: usize,
    pub line: String,
    pub line_no: usize,
    /// Variables asserted positively.
    pub positive: BTreeSet<u32>,
    /// Variables asserted negatively.
    pub negative: BTreeSet<u32>,
    /// Number of distinct literals.
    pub size: usize,
    pub tautology: bool,
    pub contradiction: bool,
    pub valid: bool,
}

impl Clause {
    /// Parses one clause line. Malformed lines (unparsable tokens, missing or
    /// misplaced terminating `0`) and variables outside `1..=num_vars` produce
    /// an invalid clause instead of an error.
    pub fn from_line(index: usize, line: &str, line_no: usize, num_vars: usize) -> Self {
        let mut clause = Clause {
            index,
            line: line.trim().to_string(),
            line_no,
            positive: BTreeSet::new(),
            negative: BTreeSet::new(),
            size: 0,
            tautology: false,
            contradiction: false,
            valid: true,
        };

        let mut terminated = false;
        for token in line.split_whitespace() {
            if terminated {
                // Anything after the terminator.
                clause.valid = false;
                break;
            }
            match token.parse::<Token>() {
                Ok(Token::End) => terminated = true,
                Ok(Token::Lit(lit)) => clause.add_lit(lit, num_vars),
                Err(_) => {
                    clause.valid = false;
                    break;
                }
            }
        }
        if !terminated {
            clause.valid = false;
        }

        clause.size = clause.positive.len() + clause.negative.len();
        clause.contradiction = clause.valid && clause.size == 0;
        clause
    }

    fn add_lit(&mut self, lit: Lit, num_vars: usize) {
        let var = lit.var();
        if var as usize > num_vars {
            self.valid = false;
        }
        let (same, opposite) = if lit.is_negated() {
            (&mut self.negative, &self.positive)
        } else {
            (&mut self.positive, &self.negative)
        };
        same.insert(var);
        if opposite.contains(&var) {
            self.tautology = true;
        }
    }

    pub fn lits(&self) -> impl Iterator<Item = Lit> + '_ {
        let pos = self.positive.iter().map(|&v| Lit::new(v as i32));
        let neg = self.negative.iter().map(|&v| Lit::new(-(v as i32)));
        pos.merge_by(neg, |a, b| a.var() <= b.var())
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.index, self.line_no)
    }
}
