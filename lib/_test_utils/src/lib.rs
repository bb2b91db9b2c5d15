use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sat_arena::runner::adapter::{decode_uksat, SolverAdapter};

/// Writes a DIMACS file with a correct header for `clauses` and returns its path.
pub fn write_cnf(dir: &Path, name: &str, num_vars: usize, clauses: &[&[i32]]) -> color_eyre::Result<PathBuf> {
    let mut text = format!("c {}\np cnf {} {}\n", name, num_vars, clauses.len());
    for clause in clauses {
        text += &format!("{} 0\n", clause.iter().join(" "));
    }
    let path = dir.join(name);
    fs::write(&path, text)?;
    Ok(path)
}

/// Uniform random 3-SAT text, reproducible for a given `seed`.
pub fn random_3sat(seed: u64, num_vars: i32, num_clauses: usize) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut text = format!("p cnf {} {}\n", num_vars, num_clauses);
    for _ in 0..num_clauses {
        let clause = (0..3)
            .map(|_| {
                let v = rng.gen_range(1..=num_vars);
                if rng.gen_bool(0.5) {
                    v
                } else {
                    -v
                }
            })
            .join(" ");
        text += &format!("{} 0\n", clause);
    }
    text
}

/// Scripted answer of a fake solver: what it prints on stderr, its exit code, and how long it sleeps first.
#[derive(Debug, Clone)]
pub struct Script {
    pub report: String,
    pub exit_code: i32,
    pub delay: Option<f64>,
}

impl Script {
    pub fn sat(time: f64) -> Self {
        Self {
            report: format!("SATISFIABLE {} 1", time),
            exit_code: 10,
            delay: None,
        }
    }

    pub fn unsat(time: f64) -> Self {
        Self {
            report: format!("UNSATISFIABLE {} 0", time),
            exit_code: 20,
            delay: None,
        }
    }

    pub fn timeout(time: f64) -> Self {
        Self {
            report: format!("TIMEOUT {} 0", time),
            exit_code: 40,
            delay: None,
        }
    }

    pub fn undefined(time: f64) -> Self {
        Self {
            report: format!("UNDEFINED {} -1", time),
            exit_code: 30,
            delay: None,
        }
    }

    pub fn crash() -> Self {
        Self {
            report: "Segmentation fault".to_string(),
            exit_code: 139,
            delay: None,
        }
    }

    pub fn after(mut self, seconds: f64) -> Self {
        self.delay = Some(seconds);
        self
    }

    /// Stores the script next to `cnf` for the fake solver with the given `suffix`.
    pub fn install(&self, cnf: &Path, suffix: &str) -> color_eyre::Result<()> {
        let delay = self.delay.map(|d| d.to_string()).unwrap_or_default();
        let path = PathBuf::from(format!("{}.{}", cnf.display(), suffix));
        fs::write(path, format!("{}\n{}\n{}\n", self.report, self.exit_code, delay))?;
        Ok(())
    }
}

macro_rules! fake_solver {
    ($name:literal, $suffix:literal) => {
        SolverAdapter {
            name: $name,
            executable: "sh",
            args: &[
                "-c",
                concat!(
                    "f=\"$1.",
                    $suffix,
                    "\"; d=$(sed -n 3p \"$f\"); [ -n \"$d\" ] && sleep \"$d\"; ",
                    "sed -n 1p \"$f\" >&2; exit \"$(sed -n 2p \"$f\")\""
                ),
                "sh",
                "{input}",
            ],
            capture_stderr: true,
            decoder: decode_uksat,
        }
    };
}

/// Fake solvers replaying a [`Script`] installed next to the formula (unix `sh` only).
pub const FAKE_OPTIMIZED: SolverAdapter = fake_solver!("opt", "opt");
pub const FAKE_BASELINE: SolverAdapter = fake_solver!("base", "base");
pub const FAKE_VALIDATOR: SolverAdapter = fake_solver!("val", "val");
