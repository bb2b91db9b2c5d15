use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::comparison::{Certification, ComparisonRecord, Relation, Verdict};
use crate::invocation::SolverInvocation;
use crate::outcome::Outcome;

/// `(baseline time, optimized time)` for every formula where both ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingPairs {
    pairs: Vec<(f64, f64)>,
}

impl TimingPairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: &ComparisonRecord) {
        if let (Some(base), Some(opt)) = (record.baseline(), record.optimized()) {
            self.pairs.push((base.time(), opt.time()));
        }
    }

    pub fn pairs(&self) -> &[(f64, f64)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of pairs where the optimized run was faster, and where the baseline was.
    pub fn wins(&self) -> (usize, usize) {
        let optimized = self.pairs.iter().filter(|(base, opt)| opt < base).count();
        let baseline = self.pairs.iter().filter(|(base, opt)| base < opt).count();
        (optimized, baseline)
    }

    /// One space-separated pair per line, no header.
    pub fn write<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wrt = csv::WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_writer(writer);
        for pair in self.pairs.iter() {
            wrt.serialize(pair)?;
        }
        wrt.flush()?;
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> csv::Result<()> {
        self.write(File::create(path)?)
    }
}

/// One CSV line per comparison record.
#[derive(Debug, Serialize)]
pub struct ResultRow {
    pub index: usize,
    pub total: usize,
    pub path: PathBuf,
    pub num_vars: usize,
    pub num_clauses: usize,
    pub time_limit: u64,
    pub verdict: Verdict,
    pub relation: Option<Relation>,
    pub certification: Option<Certification>,
    pub consistent: bool,
    pub delta: Option<f64>,
    pub optimized: Option<Outcome>,
    pub optimized_time: Option<f64>,
    pub baseline: Option<Outcome>,
    pub baseline_time: Option<f64>,
    pub validator: Option<Outcome>,
    pub validator_time: Option<f64>,
}

impl From<&ComparisonRecord> for ResultRow {
    fn from(record: &ComparisonRecord) -> Self {
        let classification = record.classification();
        let outcome = |inv: Option<&SolverInvocation>| inv.map(SolverInvocation::outcome);
        let time = |inv: Option<&SolverInvocation>| inv.map(SolverInvocation::time);
        Self {
            index: record.index(),
            total: record.total(),
            path: record.formula().abs_path().to_path_buf(),
            num_vars: record.formula().num_vars(),
            num_clauses: record.formula().num_clauses(),
            time_limit: record.time_limit(),
            verdict: classification.verdict,
            relation: classification.relation,
            certification: classification.certification,
            consistent: classification.consistent,
            delta: classification.delta,
            optimized: outcome(record.optimized()),
            optimized_time: time(record.optimized()),
            baseline: outcome(record.baseline()),
            baseline_time: time(record.baseline()),
            validator: outcome(record.validator()),
            validator_time: time(record.validator()),
        }
    }
}

/// Streams [`ResultRow`]s to a CSV file as records complete.
pub struct ResultsWriter<W: Write> {
    wrt: csv::Writer<W>,
}

impl ResultsWriter<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> csv::Result<Self> {
        Ok(Self {
            wrt: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: Write> ResultsWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            wrt: csv::Writer::from_writer(writer),
        }
    }

    pub fn write(&mut self, record: &ComparisonRecord) -> csv::Result<()> {
        self.wrt.serialize(ResultRow::from(record))
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.wrt.flush()
    }

    pub fn into_inner(self) -> Option<W> {
        self.wrt.into_inner().ok()
    }
}
