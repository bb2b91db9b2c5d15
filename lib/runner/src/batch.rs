use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::{debug, info};

use sat_arena_core::cnf::Formula;
use sat_arena_core::repository::Corpus;

use crate::comparison::{ComparisonEngine, ComparisonRecord};
use crate::config::{BenchConfig, Drive};
use crate::error::*;
use crate::histogram::Histogram;

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub histogram: Histogram,
    pub completed: usize,
    pub peak_in_flight: usize,
    pub elapsed: Duration,
}

/// Runs a [`ComparisonEngine`] per formula, at most `max_concurrency` at a time.
///
/// Formulas are started in corpus order, each exactly once.
#[derive(Debug)]
pub struct BatchScheduler {
    queue: VecDeque<Formula>,
    total: usize,
    started: usize,
    config: BenchConfig,
    in_flight: VecDeque<ComparisonEngine>,
    histogram: Histogram,
    completed: usize,
    peak_in_flight: usize,
}

impl BatchScheduler {
    pub fn new(corpus: Corpus, config: BenchConfig) -> Result<Self> {
        config.validate()?;
        let queue: VecDeque<Formula> = corpus.into_iter().collect();
        Ok(Self {
            total: queue.len(),
            queue,
            started: 0,
            config,
            in_flight: VecDeque::new(),
            histogram: Histogram::default(),
            completed: 0,
            peak_in_flight: 0,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn run<F>(mut self, mut on_complete: F) -> BatchSummary
    where
        F: FnMut(&ComparisonRecord),
    {
        let time_start = Instant::now();
        info!(
            "Running {} formulas with time limit {}s, {} at a time",
            self.total, self.config.time_limit, self.config.max_concurrency
        );

        loop {
            self.refill();
            if self.in_flight.is_empty() {
                break;
            }
            match self.config.drive {
                Drive::Blocking => {
                    if self.reap() {
                        if let Some(engine) = self.in_flight.pop_front() {
                            self.complete(engine.finish(), &mut on_complete);
                        }
                    }
                }
                Drive::Polling { sweep } => {
                    if self.sweep(&mut on_complete) == 0 {
                        std::thread::sleep(sweep);
                    }
                }
            }
        }

        let elapsed = time_start.elapsed();
        info!(
            "Finished {} formulas in {:.3}s (peak {} in flight)",
            self.completed,
            elapsed.as_secs_f64(),
            self.peak_in_flight
        );
        BatchSummary {
            histogram: self.histogram,
            completed: self.completed,
            peak_in_flight: self.peak_in_flight,
            elapsed,
        }
    }

    fn refill(&mut self) {
        while self.in_flight.len() < self.config.max_concurrency {
            let Some(formula) = self.queue.pop_front() else {
                break;
            };
            self.started += 1;
            let mut engine = ComparisonEngine::new(formula, self.started, self.total, &self.config);
            engine.load();
            self.in_flight.push_back(engine);
        }
        self.peak_in_flight = self.peak_in_flight.max(self.in_flight.len());
    }

    /// Polls every in-flight engine once, keeping finished ones in place; returns whether the oldest is done.
    ///
    /// Engines behind the oldest are reaped too, so their measured times do not wait on it.
    fn reap(&mut self) -> bool {
        let window = self.config.poll_window;
        let mut oldest_done = false;
        for (i, engine) in self.in_flight.iter_mut().enumerate() {
            let done = engine.poll(window);
            if i == 0 {
                oldest_done = done;
            }
        }
        oldest_done
    }

    /// Polls every in-flight engine once; returns how many finished.
    fn sweep<F>(&mut self, on_complete: &mut F) -> usize
    where
        F: FnMut(&ComparisonRecord),
    {
        let window = self.config.poll_window;
        let mut finished = 0;
        let mut pending = VecDeque::with_capacity(self.in_flight.len());
        while let Some(mut engine) = self.in_flight.pop_front() {
            if engine.poll(window) {
                finished += 1;
                self.complete(engine.finish(), on_complete);
            } else {
                pending.push_back(engine);
            }
        }
        self.in_flight = pending;
        finished
    }

    fn complete<F>(&mut self, record: ComparisonRecord, on_complete: &mut F)
    where
        F: FnMut(&ComparisonRecord),
    {
        self.completed += 1;
        self.histogram.record(record.time_limit(), record.verdict());
        debug!("Completed {}/{}: {}", self.completed, self.total, record.verdict().name());
        on_complete(&record);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use test_log::test;

    use sat_arena_core::cnf::ParseMode;

    use super::*;
    use crate::adapter::{decode_minisat, decode_uksat, SolverAdapter};
    use crate::comparison::Verdict;
    use crate::config::Role;

    const FAST_SAT: SolverAdapter = SolverAdapter {
        name: "fast",
        executable: "sh",
        args: &["-c", "sleep 0.2; echo 'SATISFIABLE 1.0 1' >&2; exit 10"],
        capture_stderr: true,
        decoder: decode_uksat,
    };

    const SLOW_SAT: SolverAdapter = SolverAdapter {
        name: "slow",
        executable: "sh",
        args: &["-c", "sleep 0.2; echo 'SATISFIABLE 2.0 1' >&2; exit 10"],
        capture_stderr: true,
        decoder: decode_uksat,
    };

    fn corpus(n: usize) -> Corpus {
        let formulas = (0..n)
            .map(|i| {
                let text = format!("p cnf {} 1\n1 0\n", i + 1);
                Formula::parse_str(format!("f{}.cnf", i), &text, ParseMode::Fast)
            })
            .collect();
        Corpus::from_formulas(formulas)
    }

    fn config(drive: Drive) -> BenchConfig {
        BenchConfig::new()
            .with_solver(Role::Optimized, FAST_SAT, None)
            .with_solver(Role::Baseline, SLOW_SAT, None)
            .with_time_limit(5)
            .with_max_concurrency(2)
            .with_drive(drive)
    }

    fn check(drive: Drive) {
        let scheduler = BatchScheduler::new(corpus(5), config(drive)).unwrap();
        let mut indices = Vec::new();
        let summary = scheduler.run(|record| {
            assert_eq!(record.total(), 5);
            assert_eq!(record.verdict(), Verdict::Win);
            assert_eq!(record.delta(), Some(1.0));
            indices.push(record.index());
        });
        assert_eq!(summary.completed, 5);
        assert!(summary.peak_in_flight <= 2);
        assert_eq!(summary.histogram.totals.wins, 5);
        assert_eq!(summary.histogram.by_time_limit[&5].wins, 5);
        indices.sort();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_blocking_respects_bound() {
        check(Drive::Blocking);
    }

    #[test]
    fn test_polling_respects_bound() {
        check(Drive::Polling {
            sweep: Duration::from_millis(20),
        });
    }

    #[test]
    fn test_blocking_completes_in_corpus_order() {
        let scheduler = BatchScheduler::new(corpus(3), config(Drive::Blocking)).unwrap();
        let mut names = Vec::new();
        scheduler.run(|record| names.push(record.formula().name()));
        assert_eq!(names, ["f0.cnf", "f1.cnf", "f2.cnf"]);
    }

    /// Solver that sleeps 1.5s on `f0.cnf` and 0.1s elsewhere, reporting no time of its own.
    const SLOW_ON_F0: SolverAdapter = SolverAdapter {
        name: "slow-on-f0",
        executable: "sh",
        args: &[
            "-c",
            "case \"$1\" in *f0.cnf) sleep 1.5;; *) sleep 0.1;; esac; exit 10",
            "sh",
            "{input}",
        ],
        capture_stderr: false,
        decoder: decode_minisat,
    };

    const QUICK: SolverAdapter = SolverAdapter {
        name: "quick",
        args: &["-c", "sleep 0.1; exit 10"],
        ..SLOW_ON_F0
    };

    fn check_measured_times(drive: Drive) {
        let config = BenchConfig::new()
            .with_solver(Role::Optimized, SLOW_ON_F0, None)
            .with_solver(Role::Baseline, QUICK, None)
            .with_time_limit(5)
            .with_max_concurrency(2)
            .with_drive(drive);
        let mut times = Vec::new();
        BatchScheduler::new(corpus(2), config).unwrap().run(|record| {
            let opt = record.optimized().unwrap().time();
            let base = record.baseline().unwrap().time();
            times.push((record.formula().name(), opt, base, record.delta().unwrap()));
        });
        times.sort_by(|a, b| a.0.cmp(&b.0));
        let (name, opt, base, delta) = &times[0];
        assert_eq!(name, "f0.cnf");
        assert!(*opt >= 1.5, "f0 optimized took {}", opt);
        assert!(*base < 1.0, "f0 baseline took {}", base);
        assert!(*delta < -0.5, "f0 delta {}", delta);
        let (_, opt, base, _) = &times[1];
        assert!(*opt < 1.0, "f1 optimized took {}", opt);
        assert!(*base < 1.0, "f1 baseline took {}", base);
    }

    #[test]
    fn test_blocking_measures_each_process() {
        check_measured_times(Drive::Blocking);
    }

    #[test]
    fn test_polling_measures_each_process() {
        check_measured_times(Drive::Polling {
            sweep: Duration::from_millis(20),
        });
    }

    #[test]
    fn test_empty_corpus() {
        let scheduler = BatchScheduler::new(Corpus::default(), config(Drive::Blocking)).unwrap();
        let summary = scheduler.run(|_| panic!("nothing to complete"));
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.peak_in_flight, 0);
    }

    #[test]
    fn test_invalid_config() {
        let config = BenchConfig::new().with_max_concurrency(2);
        assert_eq!(
            BatchScheduler::new(corpus(1), config).unwrap_err(),
            ConfigError::NoSolver
        );
    }
}
