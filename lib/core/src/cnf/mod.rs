use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, warn};
use snafu::ensure;

use crate::error::*;
use crate::utils::{read_maybe_gzip, resolve_path};

pub use clause::Clause;
pub use stats::FormulaStats;

pub mod clause;
mod parsing;
pub mod stats;

/// How much of a CNF file is retained while parsing.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ParseMode {
    /// Count clauses and track min/max clause size only.
    #[default]
    Fast,
    /// Keep every clause and derive [`FormulaStats`].
    Stats,
}

/// A parsed DIMACS CNF file.
///
/// Formulas are ordered by `(num_clauses, num_vars)`, see [`Formula::size_key`].
#[derive(Debug, Clone)]
pub struct Formula {
    path: PathBuf,
    abs_path: PathBuf,
    readable: bool,
    header_line: Option<usize>,
    num_vars: usize,
    num_clauses: usize,
    parsed_clauses: usize,
    min_clause_size: usize,
    max_clause_size: usize,
    invalid_clauses: usize,
    first_invalid_line: Option<usize>,
    stats: Option<FormulaStats>,
}

impl Formula {
    /// Parses the file at `path`.
    ///
    /// An unreadable file yields an empty, invalid formula; see [`Formula::validate`].
    pub fn parse<P: AsRef<Path>>(path: P, mode: ParseMode) -> Self {
        let path = path.as_ref();
        let abs_path = resolve_path(path);
        let parsed = read_maybe_gzip(&abs_path).and_then(|reader| parsing::parse_lines(reader, mode));
        match parsed {
            Ok(parsed) => {
                let formula = Self::from_parsed(path.to_path_buf(), abs_path, parsed);
                debug!("Parsed {}", formula);
                formula
            }
            Err(e) => {
                warn!("Could not read '{}': {}", abs_path.display(), e);
                Self::empty(path.to_path_buf(), abs_path)
            }
        }
    }

    /// Parses in-memory DIMACS `text`; `label` stands in for the file path.
    pub fn parse_str<P: AsRef<Path>>(label: P, text: &str, mode: ParseMode) -> Self {
        let path = label.as_ref().to_path_buf();
        let abs_path = resolve_path(&path);
        match parsing::parse_lines(text.as_bytes(), mode) {
            Ok(parsed) => Self::from_parsed(path, abs_path, parsed),
            Err(_) => Self::empty(path, abs_path),
        }
    }

    fn from_parsed(path: PathBuf, abs_path: PathBuf, parsed: parsing::Parsed) -> Self {
        Self {
            path,
            abs_path,
            readable: true,
            header_line: parsed.header_line,
            num_vars: parsed.num_vars,
            num_clauses: parsed.num_clauses,
            parsed_clauses: parsed.parsed_clauses,
            min_clause_size: parsed.min_clause_size,
            max_clause_size: parsed.max_clause_size,
            invalid_clauses: parsed.invalid_clauses,
            first_invalid_line: parsed.first_invalid_line,
            stats: parsed.stats,
        }
    }

    fn empty(path: PathBuf, abs_path: PathBuf) -> Self {
        Self {
            path,
            abs_path,
            readable: false,
            header_line: None,
            num_vars: 0,
            num_clauses: 0,
            parsed_clauses: 0,
            min_clause_size: 0,
            max_clause_size: 0,
            invalid_clauses: 0,
            first_invalid_line: None,
            stats: None,
        }
    }
}

impl Formula {
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn abs_path(&self) -> &Path {
        &self.abs_path
    }
    pub fn name(&self) -> String {
        self.abs_path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
    }
    pub fn header_line(&self) -> Option<usize> {
        self.header_line
    }
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }
    pub fn num_clauses(&self) -> usize {
        self.num_clauses
    }
    pub fn parsed_clauses(&self) -> usize {
        self.parsed_clauses
    }
    pub fn min_clause_size(&self) -> usize {
        self.min_clause_size
    }
    pub fn max_clause_size(&self) -> usize {
        self.max_clause_size
    }
    pub fn invalid_clauses(&self) -> usize {
        self.invalid_clauses
    }
    pub fn stats(&self) -> Option<&FormulaStats> {
        self.stats.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Checks the validity invariant: a header was found, the declared clause
    /// count matches the parsed one, and no clause is invalid.
    pub fn validate(&self) -> Result<()> {
        let path = &self.abs_path;
        ensure!(self.readable, UnreadableSnafu { path });
        ensure!(self.header_line.is_some(), MissingHeaderSnafu { path });
        ensure!(
            self.invalid_clauses == 0,
            InvalidClausesSnafu {
                path,
                count: self.invalid_clauses,
                first_line: self.first_invalid_line.unwrap_or_default(),
            }
        );
        ensure!(
            self.num_clauses == self.parsed_clauses,
            ClauseCountMismatchSnafu {
                path,
                declared: self.num_clauses,
                parsed: self.parsed_clauses,
            }
        );
        Ok(())
    }

    pub fn size_key(&self) -> (usize, usize) {
        (self.num_clauses, self.num_vars)
    }

    pub fn cmp_by_size(&self, other: &Self) -> Ordering {
        self.size_key().cmp(&other.size_key())
    }

    /// Multi-line report with everything known about the formula.
    pub fn report(&self) -> String {
        let mut lines = vec![
            format!("{}:", self.abs_path.display()),
            format!("\tnvars = {},", self.num_vars),
            format!("\tnclauses = {},", self.num_clauses),
            format!("\tparsed = {},", self.parsed_clauses),
            format!("\tvalid = {},", self.is_valid()),
            format!("\tminclausesize = {},", self.min_clause_size),
            format!("\tmaxclausesize = {},", self.max_clause_size),
        ];
        if let Err(e) = self.validate() {
            lines.push(format!("\tproblem = {},", e));
        }
        if let Some(stats) = &self.stats {
            let clauses = |indices: &[usize]| indices.iter().map(|&i| &stats.clauses[i]).join(", ");
            lines.push(format!("\ttautology = {},", stats.is_tautology()));
            lines.push(format!(
                "\tclausesizes = {{{}}},",
                stats.sizes.iter().map(|(size, count)| format!("{}: {}", size, count)).join(", ")
            ));
            lines.push(format!("\tinvalids = [{}],", clauses(&stats.invalids)));
            lines.push(format!("\ttautologies = [{}],", clauses(&stats.tautologies)));
            lines.push(format!("\tcontradictions = [{}],", clauses(&stats.contradictions)));
            lines.push(format!("\ttruevars = {{{}}},", stats.true_vars.iter().join(", ")));
            lines.push(format!("\tfalsevars = {{{}}},", stats.false_vars.iter().join(", ")));
            lines.push(format!("\tpurevars = {{{}}}", stats.pure_vars.iter().join(", ")));
        }
        lines.join("\n")
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: nv={}, nc={}, cs={}..{}",
            self.abs_path.display(),
            self.num_vars,
            self.num_clauses,
            self.min_clause_size,
            self.max_clause_size
        )
    }
}
