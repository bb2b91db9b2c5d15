#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use test_log::test;

use sat_arena::core::repository::FormulaRepository;
use sat_arena::runner::adapter::SolverAdapter;
use sat_arena::runner::batch::{BatchScheduler, BatchSummary};
use sat_arena::runner::comparison::{Certification, Relation, Verdict};
use sat_arena::runner::config::{BenchConfig, Drive, Role};
use sat_arena::runner::outcome::Outcome;
use sat_arena::runner::report::{ResultsWriter, TimingPairs};
use sat_arena_test_utils::{write_cnf, Script, FAKE_BASELINE, FAKE_OPTIMIZED, FAKE_VALIDATOR};

struct Outcomes {
    label: String,
    line: String,
    verdict: Verdict,
    relation: Option<Relation>,
    certification: Option<Certification>,
    delta: Option<f64>,
}

fn formula(dir: &Path) -> color_eyre::Result<PathBuf> {
    write_cnf(dir, "f.cnf", 3, &[&[1, 2], &[-1, 3], &[-2, -3]])
}

fn config(solvers: &[(Role, SolverAdapter)]) -> BenchConfig {
    solvers
        .iter()
        .fold(BenchConfig::new().with_time_limit(5), |config, &(role, adapter)| {
            config.with_solver(role, adapter, None)
        })
}

fn run_single(
    opt: Option<Script>,
    base: Option<Script>,
    val: Option<Script>,
) -> color_eyre::Result<Outcomes> {
    let dir = tempfile::tempdir()?;
    let cnf = formula(dir.path())?;
    let mut solvers = Vec::new();
    for (script, suffix, role, adapter) in [
        (opt, "opt", Role::Optimized, FAKE_OPTIMIZED),
        (base, "base", Role::Baseline, FAKE_BASELINE),
        (val, "val", Role::Validator, FAKE_VALIDATOR),
    ] {
        if let Some(script) = script {
            script.install(&cnf, suffix)?;
            solvers.push((role, adapter));
        }
    }

    let corpus = FormulaRepository::default().load([dir.path()]);
    assert_eq!(corpus.len(), 1);
    let scheduler = BatchScheduler::new(corpus, config(&solvers))?;
    let mut outcomes = None;
    scheduler.run(|record| {
        let c = record.classification();
        outcomes = Some(Outcomes {
            label: record.label(),
            line: record.to_string(),
            verdict: c.verdict,
            relation: c.relation,
            certification: c.certification,
            delta: c.delta,
        });
    });
    Ok(outcomes.expect("one record"))
}

#[test]
fn scenario_a_faster_wins() -> color_eyre::Result<()> {
    let r = run_single(Some(Script::sat(1.0)), Some(Script::sat(2.0)), None)?;
    assert_eq!(r.verdict, Verdict::Win);
    assert_eq!(r.delta, Some(1.0));
    assert_eq!(r.relation, Some(Relation::Faster));
    assert_eq!(r.line, " SELF WIN, FASTER delta = 1.000000, [opt = T (10, 1s), base = T (10, 2s)]");
    Ok(())
}

#[test]
fn scenario_b_slower_passes() -> color_eyre::Result<()> {
    let r = run_single(Some(Script::sat(3.0)), Some(Script::sat(1.0)), None)?;
    assert_eq!(r.verdict, Verdict::Pass);
    assert_eq!(r.delta, Some(-2.0));
    Ok(())
}

#[test]
fn scenario_c_disagreement_fails() -> color_eyre::Result<()> {
    let r = run_single(Some(Script::unsat(1.0)), Some(Script::sat(1.0)), None)?;
    assert_eq!(r.verdict, Verdict::Fail);
    assert!(r.label.contains("INCONSISTENT"));
    Ok(())
}

#[test]
fn scenario_d_baseline_timeout_is_fast() -> color_eyre::Result<()> {
    let r = run_single(Some(Script::sat(1.0)), Some(Script::timeout(5.0)), None)?;
    assert_eq!(r.verdict, Verdict::Win);
    assert!(r.label.contains("FAST"));
    Ok(())
}

#[test]
fn scenario_e_validator_overrules() -> color_eyre::Result<()> {
    let r = run_single(Some(Script::sat(1.0)), Some(Script::sat(2.0)), Some(Script::unsat(0.1)))?;
    assert_eq!(r.verdict, Verdict::Fail);
    assert_eq!(r.certification, Some(Certification::Refuted));
    assert!(r.label.trim_start().starts_with("REFUTED"));
    Ok(())
}

#[test]
fn crashed_baseline_is_inconsistent() -> color_eyre::Result<()> {
    let r = run_single(Some(Script::sat(1.0)), Some(Script::crash()), Some(Script::sat(0.5)))?;
    assert_eq!(r.verdict, Verdict::Fail);
    assert_eq!(r.relation, Some(Relation::Inconsistent));
    assert_eq!(r.certification, Some(Certification::Validated));
    Ok(())
}

#[test]
fn validator_alone() -> color_eyre::Result<()> {
    let r = run_single(None, None, Some(Script::undefined(0.1)))?;
    assert_eq!(r.verdict, Verdict::Fail);
    assert_eq!(r.delta, None);
    Ok(())
}

#[test]
fn hung_solver_is_killed() -> color_eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let cnf = formula(dir.path())?;
    Script::sat(1.0).install(&cnf, "opt")?;
    Script::sat(1.0).after(30.0).install(&cnf, "base")?;

    let corpus = FormulaRepository::default().load([dir.path()]);
    let config = config(&[(Role::Optimized, FAKE_OPTIMIZED), (Role::Baseline, FAKE_BASELINE)])
        .with_time_limit(1)
        .with_kill_grace(Some(Duration::from_millis(200)));
    let mut seen = Vec::new();
    BatchScheduler::new(corpus, config)?.run(|record| {
        let base = record.baseline().unwrap();
        seen.push((record.verdict(), base.outcome()));
    });
    assert_eq!(seen, [(Verdict::Win, Outcome::Timeout)]);
    Ok(())
}

fn bench_corpus(dir: &Path, n: usize) -> color_eyre::Result<()> {
    for i in 0..n {
        let clause: &[i32] = &[1, -2];
        let clauses = vec![clause; i + 1];
        let cnf = write_cnf(dir, &format!("f{}.cnf", i), 2, &clauses)?;
        Script::sat(1.0).after(0.1).install(&cnf, "opt")?;
        Script::sat(1.5).after(0.1).install(&cnf, "base")?;
    }
    Ok(())
}

fn run_bench(drive: Drive, n: usize) -> color_eyre::Result<(BatchSummary, TimingPairs, String)> {
    let dir = tempfile::tempdir()?;
    bench_corpus(dir.path(), n)?;
    let corpus = FormulaRepository::default().load([dir.path()]);
    assert_eq!(corpus.len(), n);
    let config = config(&[(Role::Optimized, FAKE_OPTIMIZED), (Role::Baseline, FAKE_BASELINE)])
        .with_max_concurrency(2)
        .with_drive(drive);

    let mut timings = TimingPairs::new();
    let mut results = ResultsWriter::from_writer(Vec::new());
    let summary = BatchScheduler::new(corpus, config)?.run(|record| {
        timings.record(record);
        results.write(record).unwrap();
    });
    let csv = String::from_utf8(results.into_inner().unwrap())?;
    Ok((summary, timings, csv))
}

#[test]
fn bounded_concurrency_polling() -> color_eyre::Result<()> {
    let (summary, timings, csv) = run_bench(
        Drive::Polling {
            sweep: Duration::from_millis(20),
        },
        5,
    )?;
    assert_eq!(summary.completed, 5);
    assert!(summary.peak_in_flight <= 2);
    assert_eq!(summary.histogram.totals.wins, 5);
    assert_eq!(timings.pairs(), [(1.5, 1.0); 5]);
    assert_eq!(timings.wins(), (5, 0));
    assert_eq!(csv.lines().count(), 6);
    assert!(csv.lines().next().unwrap().starts_with("index,total,path,"));
    Ok(())
}

#[test]
fn bounded_concurrency_blocking() -> color_eyre::Result<()> {
    let (summary, _, csv) = run_bench(Drive::Blocking, 5)?;
    assert_eq!(summary.completed, 5);
    assert_eq!(summary.peak_in_flight, 2);
    // Blocking completes in corpus order: by clause count.
    let clauses = csv
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(4).unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(clauses, ["1", "2", "3", "4", "5"]);
    Ok(())
}
