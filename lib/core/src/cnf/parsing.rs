use std::io;
use std::io::BufRead;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lit::Token;

use super::clause::Clause;
use super::stats::FormulaStats;
use super::ParseMode;

static PROBLEM_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*p\s+cnf\s+(\d+)\s+(\d+)").unwrap());

/// Accumulated state of a single pass over a DIMACS file.
#[derive(Debug, Default)]
pub(crate) struct Parsed {
    pub header_line: Option<usize>,
    pub num_vars: usize,
    pub num_clauses: usize,
    pub parsed_clauses: usize,
    pub min_clause_size: usize,
    pub max_clause_size: usize,
    pub invalid_clauses: usize,
    pub first_invalid_line: Option<usize>,
    pub stats: Option<FormulaStats>,
}

impl Parsed {
    fn new(mode: ParseMode) -> Self {
        Self {
            stats: match mode {
                ParseMode::Fast => None,
                ParseMode::Stats => Some(FormulaStats::default()),
            },
            ..Default::default()
        }
    }

    fn mark_invalid(&mut self, line_no: usize) {
        self.invalid_clauses += 1;
        self.first_invalid_line.get_or_insert(line_no);
    }

    fn observe_size(&mut self, size: usize) {
        if size == 0 {
            return;
        }
        if self.min_clause_size == 0 || size < self.min_clause_size {
            self.min_clause_size = size;
        }
        if size > self.max_clause_size {
            self.max_clause_size = size;
        }
    }

    fn header(&mut self, line: &str, line_no: usize) -> bool {
        let Some(caps) = PROBLEM_LINE.captures(line) else {
            return false;
        };
        match (caps[1].parse(), caps[2].parse()) {
            (Ok(num_vars), Ok(num_clauses)) => {
                self.header_line = Some(line_no);
                self.num_vars = num_vars;
                self.num_clauses = num_clauses;
                true
            }
            _ => false,
        }
    }

    fn fast_clause(&mut self, line: &str, line_no: usize) {
        self.parsed_clauses += 1;
        let mut tokens = 0;
        let mut terminated = false;
        let mut valid = true;
        for token in line.split_whitespace() {
            tokens += 1;
            match token.parse::<Token>() {
                Ok(Token::End) if !terminated => terminated = true,
                Ok(Token::Lit(lit)) if !terminated && lit.var() as usize <= self.num_vars => {}
                _ => valid = false,
            }
        }
        if valid && terminated {
            self.observe_size(tokens - 1);
        } else {
            self.mark_invalid(line_no);
        }
    }

    fn stats_clause(&mut self, line: &str, line_no: usize) {
        let stats = self.stats.get_or_insert_with(FormulaStats::default);
        let clause = Clause::from_line(stats.clauses.len(), line, line_no, self.num_vars);
        let (valid, size) = (clause.valid, clause.size);
        stats.add(clause);
        self.parsed_clauses += 1;
        if valid {
            self.observe_size(size);
        } else {
            self.mark_invalid(line_no);
        }
    }
}

/// Single pass over DIMACS lines.
///
/// Comments and blank lines are skipped, a lone `%` ends the formula, and any
/// other line that is neither the first header nor a clause counts as invalid.
pub(crate) fn parse_lines<R: BufRead>(reader: R, mode: ParseMode) -> io::Result<Parsed> {
    let mut parsed = Parsed::new(mode);

    // Raw lines decoded lossily: a stray byte only spoils the line it is on.
    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let line = String::from_utf8_lossy(line.strip_suffix(b"\r").unwrap_or(&line));
        let line_no = index + 1;
        let trimmed = line.trim_start();

        if trimmed.is_empty() || trimmed.starts_with('c') {
            continue;
        }
        if trimmed.trim_end() == "%" {
            break;
        }

        if parsed.header_line.is_none() {
            if !parsed.header(trimmed, line_no) {
                parsed.mark_invalid(line_no);
            }
            continue;
        }

        match mode {
            ParseMode::Fast => parsed.fast_clause(trimmed, line_no),
            ParseMode::Stats => parsed.stats_clause(trimmed, line_no),
        }
    }

    if let Some(stats) = parsed.stats.as_mut() {
        stats.finish();
    }
    Ok(parsed)
}
