use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use snafu::ResultExt;

use crate::cnf::{Formula, ParseMode};
use crate::error::{DiscoveryError, EntrySnafu, PatternSnafu};
use crate::utils::{measure_time, resolve_path};

pub const DEFAULT_EXTENSIONS: &[&str] = &["dimacs", "cnf"];

/// What to do with formulas that fail [`Formula::validate`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum InvalidPolicy {
    /// Move them to [`Corpus::rejected`].
    #[default]
    Exclude,
    /// Keep them in the corpus, flagged as invalid.
    Flag,
}

pub type FormulaFilter = Box<dyn Fn(&Formula) -> bool + Send + Sync>;

/// Loads formulas from files and directories into a sorted [`Corpus`].
pub struct FormulaRepository {
    pub mode: ParseMode,
    pub recursive: bool,
    pub extensions: Vec<String>,
    pub invalid_policy: InvalidPolicy,
    filter: Option<FormulaFilter>,
}

impl Debug for FormulaRepository {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaRepository")
            .field("mode", &self.mode)
            .field("recursive", &self.recursive)
            .field("extensions", &self.extensions)
            .field("invalid_policy", &self.invalid_policy)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl Default for FormulaRepository {
    fn default() -> Self {
        Self::new(ParseMode::Fast)
    }
}

impl FormulaRepository {
    pub fn new(mode: ParseMode) -> Self {
        Self {
            mode,
            recursive: true,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            invalid_policy: InvalidPolicy::default(),
            filter: None,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn extensions<I>(mut self, extensions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.extensions = extensions.into_iter().map_into().collect();
        self
    }

    pub fn invalid_policy(mut self, policy: InvalidPolicy) -> Self {
        self.invalid_policy = policy;
        self
    }

    /// Only formulas for which `filter` returns `true` enter the corpus.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Formula) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }
}

impl FormulaRepository {
    /// Files under `dir` with one of the configured extensions, in path order.
    pub fn discover<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>, DiscoveryError> {
        let base = Pattern::escape(&dir.as_ref().to_string_lossy());
        let depth = if self.recursive { "**/" } else { "" };
        let mut found = Vec::new();
        for ext in self.extensions.iter() {
            let pattern = format!("{}/{}*.{}", base, depth, ext);
            for entry in glob(&pattern).context(PatternSnafu { pattern: &pattern })? {
                let path = entry.context(EntrySnafu { pattern: &pattern })?;
                if path.is_file() {
                    found.push(path);
                }
            }
        }
        found.sort();
        found.dedup();
        Ok(found)
    }

    /// Parses every file (directories are searched via [`discover`](Self::discover)).
    pub fn load<I>(&self, paths: I) -> Corpus
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        let mut corpus = Corpus::default();

        for path in paths {
            let path = path.as_ref();
            let resolved = resolve_path(path);
            let files = if resolved.is_dir() {
                match self.discover(&resolved) {
                    Ok(files) => {
                        debug!("Found {} files in '{}'", files.len(), resolved.display());
                        files
                    }
                    Err(e) => {
                        warn!("Skipping '{}': {}", resolved.display(), e);
                        continue;
                    }
                }
            } else {
                vec![path.to_path_buf()]
            };

            for file in files {
                let (elapsed, formula) = measure_time(|| Formula::parse(&file, self.mode));
                trace!("Parsed '{}' in {:.3}s", file.display(), elapsed.as_secs_f64());
                if let Some(filter) = &self.filter {
                    if !filter(&formula) {
                        debug!("Filtered out {}", formula);
                        corpus.filtered += 1;
                        continue;
                    }
                }
                match (formula.validate(), self.invalid_policy) {
                    (Ok(()), _) => corpus.formulas.push(formula),
                    (Err(e), InvalidPolicy::Flag) => {
                        warn!("Keeping invalid formula: {}", e);
                        corpus.formulas.push(formula);
                    }
                    (Err(e), InvalidPolicy::Exclude) => {
                        warn!("Rejecting formula: {}", e);
                        corpus.rejected.push(formula);
                    }
                }
            }
        }

        corpus.sort();
        info!(
            "Loaded {} formulas ({} rejected, {} filtered out)",
            corpus.formulas.len(),
            corpus.rejected.len(),
            corpus.filtered
        );
        corpus
    }
}

/// Formulas ready for benchmarking, sorted by [`Formula::size_key`].
#[derive(Debug, Default)]
pub struct Corpus {
    pub formulas: Vec<Formula>,
    pub rejected: Vec<Formula>,
    pub filtered: usize,
}

impl Corpus {
    pub fn from_formulas(formulas: Vec<Formula>) -> Self {
        let mut corpus = Self {
            formulas,
            ..Default::default()
        };
        corpus.sort();
        corpus
    }

    /// Stable: formulas of equal size keep their discovery order.
    fn sort(&mut self) {
        self.formulas.sort_by(Formula::cmp_by_size);
        self.rejected.sort_by(Formula::cmp_by_size);
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Formula> {
        self.formulas.iter()
    }
}

impl IntoIterator for Corpus {
    type Item = Formula;
    type IntoIter = std::vec::IntoIter<Formula>;

    fn into_iter(self) -> Self::IntoIter {
        self.formulas.into_iter()
    }
}
