use std::path::PathBuf;

use snafu::Snafu;

pub type Result<T, E = FormatError> = std::result::Result<T, E>;

/// Reason a parsed formula is not valid.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FormatError {
    #[snafu(display("Could not read '{}'", path.display()))]
    Unreadable { path: PathBuf },

    #[snafu(display("No 'p cnf <vars> <clauses>' header in '{}'", path.display()))]
    MissingHeader { path: PathBuf },

    #[snafu(display("Header of '{}' declares {} clauses, but {} were parsed", path.display(), declared, parsed))]
    ClauseCountMismatch { path: PathBuf, declared: usize, parsed: usize },

    #[snafu(display("'{}' contains {} invalid clauses (first at line {})", path.display(), count, first_line))]
    InvalidClauses { path: PathBuf, count: usize, first_line: usize },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DiscoveryError {
    #[snafu(display("Bad search pattern '{}'", pattern))]
    Pattern { pattern: String, source: glob::PatternError },

    #[snafu(display("Could not access a match of '{}'", pattern))]
    Entry { pattern: String, source: glob::GlobError },
}
