use crate::mutation::{Mutant, MutantId, RunResult};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Name of the environment variable selecting the active mutant inside a
/// mutation-test super-binary.
pub const MUTANT_ENV: &str = "MEOW_MUTANT";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Executes mutation tests by running a pre-built super-binary once per
/// mutant with `MEOW_MUTANT` naming the active mutant.
///
/// Runs are sequential: one fresh process per mutant, each bounded by a
/// wall-clock timeout. Exit code 0 means the mutant survived; a non-zero
/// exit, a spawn failure, or a timeout kills it.
#[derive(Debug, Clone)]
pub struct Runner {
    pub binary_path: PathBuf,
    pub timeout: Duration,
}

impl Runner {
    pub fn new(binary_path: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    /// Runs the test binary once per mutant.
    pub fn run_all(&self, mutants: &[Mutant]) -> Vec<RunResult> {
        mutants
            .iter()
            .map(|m| RunResult {
                id: m.id,
                killed: self.run_one(m.id),
            })
            .collect()
    }

    /// Returns true when the mutant was killed (the test run failed).
    fn run_one(&self, id: MutantId) -> bool {
        let mut command = Command::new(&self.binary_path);
        command
            .env(MUTANT_ENV, id.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = match command.spawn() {
            Ok(child) => child,
            // A binary that cannot start counts as killed.
            Err(_) => return true,
        };

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return !status.success(),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return true;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => return true,
            }
        }
    }
}
