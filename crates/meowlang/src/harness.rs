//! Interpreter-backed test, fuzz, and mutation harnesses.
//!
//! Test files call `run("name", paw() { … })` with `judge`/`expect`/`refuse`
//! assertions inside; the harness prints one `PASS:`/`FAIL:` line per test
//! and a summary, and reports failure through its outcome. The fuzz driver
//! feeds deterministic pseudo-random inputs to a top-level `fuzz` function
//! until a deadline. The mutation driver applies enumerated mutants one at
//! a time and re-runs the paired tests in-process.

use crate::compiler::{Checked, Pipeline};
use crate::coverage::Coverage;
use crate::diagnostics::{CompileErrors, Failure};
use crate::lexer::Lexer;
use crate::mutation::{self, RunResult};
use crate::parser;
use crate::runtime::{Interpreter, TestRecord, Value};
use crate::tokens::{Token, TokenKind};
use crate::types::Type;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Environment variable: when set during a harness run, a Go-compatible
/// coverage profile is appended to the named file.
pub const COVERPROFILE_ENV: &str = "MEOW_COVERPROFILE";

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{0}")]
    Compile(#[from] CompileErrors),
    #[error("Hiss! tests fail without mutations, nya~\n{0}")]
    Baseline(String),
    #[error("Hiss! no meow fuzz(...) function found in {0}, nya~")]
    NoFuzzTarget(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Runtime(#[from] Failure),
}

/// The result of one harness run over a test file.
#[derive(Debug, Clone)]
pub struct HarnessOutcome {
    /// Everything the program printed, including PASS/FAIL lines and the
    /// summary.
    pub output: String,
    pub records: Vec<TestRecord>,
    pub passed: usize,
    pub failed: usize,
    /// A runtime failure that escaped every test, if any.
    pub error: Option<String>,
}

impl HarnessOutcome {
    pub fn success(&self) -> bool {
        self.failed == 0 && self.error.is_none()
    }
}

/// Compiles and runs a test file.
pub fn run_test_source(source: &str, file: &str) -> Result<HarnessOutcome, CompileErrors> {
    let checked = Pipeline::new().compile(source, file)?;
    Ok(run_test_checked(&checked, None))
}

/// Runs an already-checked program under the harness, optionally recording
/// statement coverage. `MEOW_COVERPROFILE` is honored here.
pub fn run_test_checked(
    checked: &Checked,
    coverage: Option<Rc<RefCell<Coverage>>>,
) -> HarnessOutcome {
    let profile_path = std::env::var(COVERPROFILE_ENV).ok();
    let coverage = match (coverage, &profile_path) {
        (Some(cov), _) => Some(cov),
        (None, Some(_)) => {
            let mut cov = Coverage::new();
            cov.register_program(&checked.program);
            Some(Rc::new(RefCell::new(cov)))
        }
        (None, None) => None,
    };

    let outcome = execute_tests(checked, coverage.clone());

    if let (Some(path), Some(cov)) = (profile_path, coverage) {
        let path = std::path::PathBuf::from(path);
        if !path.exists() {
            let _ = std::fs::write(&path, "mode: set\n");
        }
        let _ = cov.borrow().write_profile(&path);
    }
    outcome
}

fn execute_tests(checked: &Checked, coverage: Option<Rc<RefCell<Coverage>>>) -> HarnessOutcome {
    let (mut interp, buffer) = Interpreter::with_capture();
    interp.set_type_info(checked.info.clone());
    if let Some(cov) = coverage {
        interp.set_coverage(cov);
    }
    let records_handle = interp.enable_test_builtins();

    let error = interp.run(&checked.program).err().map(|e| e.to_string());

    let records = records_handle.borrow().clone();
    let passed = records.iter().filter(|r| r.passed).count();
    let failed = records.len() - passed;

    let mut output = buffer.borrow().clone();
    if let Some(message) = &error {
        output.push_str(message);
        output.push('\n');
    }
    output.push('\n');
    if failed == 0 && error.is_none() {
        output.push_str(&format!("All {passed} tests passed, nya~!\n"));
    } else {
        output.push_str(&format!("{passed} passed, {failed} failed, nya~\n"));
    }

    HarnessOutcome {
        output,
        records,
        passed,
        failed,
        error,
    }
}

// --- Fuzzing ---

/// Runs the `fuzz` function of a fuzz file with pseudo-random inputs until
/// the deadline. Returns false when a failing input was found.
pub fn run_fuzz_source(
    source: &str,
    file: &str,
    duration: Duration,
    out: &mut dyn Write,
) -> Result<bool, HarnessError> {
    let checked = Pipeline::new().compile(source, file)?;
    let (mut interp, _buffer) = Interpreter::with_capture();
    interp.set_type_info(checked.info.clone());
    interp.run(&checked.program)?;

    let Some(target) = interp.global("fuzz") else {
        return Err(HarnessError::NoFuzzTarget(file.to_owned()));
    };
    let param_types: Vec<Type> = checked
        .info
        .func_sigs
        .get("fuzz")
        .map(|sig| sig.params.clone())
        .unwrap_or_default();

    let mut rng = SplitMix64::new(0x6d656f77); // "meow"
    let deadline = Instant::now() + duration;
    let mut runs: u64 = 0;
    while Instant::now() < deadline {
        runs += 1;
        interp.reset_steps();
        let args: Vec<Value> = param_types.iter().map(|ty| rng.value_for(ty)).collect();
        match interp.call(target.clone(), args.clone()) {
            Ok(_) => {}
            Err(failure) => {
                let rendered = args
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(out, "fuzz: failing input found after {runs} runs: fuzz({rendered})")?;
                writeln!(out, "{failure}")?;
                return Ok(false);
            }
        }
    }
    writeln!(out, "fuzz: {runs} runs, no failures, nya~")?;
    Ok(true)
}

/// Deterministic 64-bit generator (SplitMix64) for fuzz inputs.
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    fn value_for(&mut self, ty: &Type) -> Value {
        match ty.unwrap() {
            Type::Float => {
                let raw = self.next() as f64 / u64::MAX as f64;
                Value::Float(raw * 2000.0 - 1000.0)
            }
            Type::Bool => Value::Bool(self.next() % 2 == 0),
            Type::String => {
                const POOL: [&str; 6] = ["", "meow", "nyan", "hiss", "a b c", "カリカリ"];
                Value::Str(POOL[(self.next() % POOL.len() as u64) as usize].to_owned())
            }
            Type::List(_) => {
                let len = (self.next() % 5) as usize;
                Value::list(
                    (0..len)
                        .map(|_| Value::Int((self.next() % 201) as i64 - 100))
                        .collect(),
                )
            }
            // Ints, and anything without a better shape.
            _ => Value::Int((self.next() % 2001) as i64 - 1000),
        }
    }
}

// --- Mutation testing over the interpreter ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationStats {
    pub total: usize,
    pub killed: usize,
    pub survived: usize,
}

/// Runs mutation testing for one source file and its paired test files,
/// entirely in-process: every enumerated mutant is applied, the tests are
/// re-run through the harness, and the mutant is undone. A mutant is
/// killed when the mutated test run fails.
pub fn run_mutation(
    source: &str,
    source_file: &str,
    tests: &[(String, String)],
    out: &mut dyn Write,
) -> Result<MutationStats, HarnessError> {
    let mut files: Vec<(String, String)> = Vec::with_capacity(tests.len() + 1);
    files.push((source_file.to_owned(), source.to_owned()));
    files.extend(tests.iter().cloned());

    let tokens = combined_tokens(&files);
    let (program, parse_errors) = parser::parse(tokens.into_iter());
    if !parse_errors.is_empty() {
        return Err(CompileErrors::Parse(parse_errors).into());
    }
    let (info, type_errors) = crate::typeck::check(&program);
    if !type_errors.is_empty() {
        return Err(CompileErrors::Type(type_errors).into());
    }
    let mut checked = Checked { program, info };

    // Only the source file's statements are mutated, never the tests.
    let prefix = checked
        .program
        .stmts
        .iter()
        .take_while(|s| s.pos().file == source_file)
        .count();
    let mutants = mutation::enumerate_prefix(&checked.program, prefix);

    // The suite must pass unmutated, or kills mean nothing.
    let baseline = execute_tests(&checked, None);
    if !baseline.success() {
        return Err(HarnessError::Baseline(baseline.output));
    }

    let mut results = Vec::with_capacity(mutants.len());
    for mutant in &mutants {
        mutant.apply(&mut checked.program)?;
        let outcome = execute_tests(&checked, None);
        mutant.undo(&mut checked.program)?;
        results.push(RunResult {
            id: mutant.id,
            killed: !outcome.success(),
        });
    }

    mutation::report(out, &mutants, &results)?;
    let killed = results.iter().filter(|r| r.killed).count();
    Ok(MutationStats {
        total: results.len(),
        killed,
        survived: results.len() - killed,
    })
}

/// Re-lexes several files into one token stream (per-file positions
/// preserved) so a single parse assigns globally unique expression ids.
fn combined_tokens(files: &[(String, String)]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut last_pos = crate::position::Position::default();
    for (file, text) in files {
        for token in Lexer::new(text, file.as_str()) {
            if token.kind == TokenKind::Eof {
                last_pos = token.pos.clone();
                tokens.push(Token::new(TokenKind::Newline, "\n", token.pos));
                break;
            }
            tokens.push(token);
        }
    }
    tokens.push(Token::eof(last_pos));
    tokens
}
