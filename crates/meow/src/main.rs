use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use meowlang::coverage::Coverage;
use meowlang::harness::{self, HarnessError};
use meowlang::lexer::Lexer;
use meowlang::lint::Linter;
use meowlang::runtime::Interpreter;
use meowlang::{fmt as meowfmt, parser as meowparser, Compiler, Pipeline};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

const COMMIT: &str = match option_env!("MEOW_COMMIT") {
    Some(commit) => commit,
    None => "none",
};
const BUILD_DATE: &str = match option_env!("MEOW_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

/// Meow language compiler 🐱
#[derive(Parser, Debug)]
#[command(name = "meow", version, about = "Meow language compiler 🐱")]
struct Cli {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a .nyan file
    #[command(long_about = "Run a .nyan program through the interpreter.\n\n\
Examples:\n  meow run hello.nyan\n  meow hello.nyan")]
    Run {
        /// The .nyan file to run
        file: PathBuf,
    },

    /// Build a binary
    #[command(long_about = "Compile a .nyan file into a standalone binary \
via the configured host back-end.\n\nFlags:\n  -o <name>  Set the output \
binary name (default: basename of the file)")]
    Build {
        file: PathBuf,
        /// Output binary name
        #[arg(short = 'o')]
        output: Option<String>,
    },

    /// Show generated host source
    #[command(long_about = "Emit the host-language source for a .nyan file \
on stdout without compiling or running it.")]
    Transpile { file: PathBuf },

    /// Run _test.nyan files
    #[command(long_about = "Run test files. Without arguments, discovers and \
runs all *_test.nyan files in the current directory.\n\n\
Patterns:\n  ./...                  Recursively find all *_test.nyan\n  \
dir/...                Recursively find all *_test.nyan under dir/\n  \
dir/                   Find *_test.nyan in dir/ (non-recursive)\n  \
file_test.nyan         Run a specific test file\n\n\
Flags:\n  -fuzz                  Run fuzz tests\n  \
-fuzztime <duration>   Fuzz test duration (default: 10s)\n  \
-mutate                Run mutation tests (explicit or auto-discover pairs)\n  \
-cover                 Enable statement coverage\n  \
-coverprofile=<file>   Write coverage profile to file (Go-compatible format)")]
    Test {
        /// Flags and file patterns (Go-style single-dash flags)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Format .nyan source files
    #[command(long_about = "Format .nyan source files. By default the \
formatted output goes to stdout.\n\nFlags:\n  -w  Write the formatted output \
back to the file")]
    Fmt {
        /// Write result back to the file instead of stdout
        #[arg(short = 'w')]
        write: bool,
        files: Vec<PathBuf>,
    },

    /// Run static analysis
    #[command(long_about = "Run static analysis on .nyan files. Without \
arguments, checks all *.nyan files in the current directory.\n\n\
Rules:\n  snake-case             Identifiers must use snake_case\n  \
unused-var             Declared variables must be used\n  \
unreachable-code       Code after bring is unreachable\n  \
empty-block            Function/if/loop bodies must not be empty")]
    Lint { paths: Vec<String> },

    /// Show version info
    Version,
}

fn main() -> ExitCode {
    // `meow FILE` is shorthand for `meow run FILE`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first) = args.get(1) {
        const COMMANDS: [&str; 8] = [
            "run", "build", "transpile", "test", "fmt", "lint", "version", "help",
        ];
        if !first.starts_with('-') && !COMMANDS.contains(&first.as_str()) {
            args.insert(1, "run".to_owned());
        }
    }
    // Exit codes are 0 on success and 1 on failure; clap's usage-error
    // default of 2 is not part of the surface.
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let is_failure = err.use_stderr();
            let _ = err.print();
            return if is_failure {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Run { file } => run_file(&file, cli.verbose),
        Command::Build { file, output } => build_file(&file, output.as_deref(), cli.verbose),
        Command::Transpile { file } => transpile_file(&file, cli.verbose),
        Command::Test { args } => run_test_command(&args),
        Command::Fmt { write, files } => run_fmt_command(write, &files),
        Command::Lint { paths } => run_lint_command(&paths),
        Command::Version => {
            println!(
                "meow version {} (commit: {}, built: {})",
                meowlang::VERSION, COMMIT, BUILD_DATE
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Hiss! Cannot read {}, nya~", path.display()))
}

fn run_file(path: &Path, verbose: bool) -> Result<ExitCode> {
    let source = read_source(path)?;
    let file = path.to_string_lossy();
    let checked = match Pipeline::with_verbose(verbose).compile(&source, &file) {
        Ok(checked) => checked,
        Err(errors) => {
            eprintln!("{errors}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let mut interp = Interpreter::new();
    interp.set_type_info(checked.info);
    if let Err(failure) = interp.run(&checked.program) {
        eprintln!("{failure}");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn transpile_file(path: &Path, verbose: bool) -> Result<ExitCode> {
    let source = read_source(path)?;
    let file = path.to_string_lossy();
    let compiler = Compiler::new(Pipeline::with_verbose(verbose));
    match compiler.transpile(&source, &file, None) {
        Ok(code) => {
            print!("{code}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn build_file(path: &Path, _output: Option<&str>, verbose: bool) -> Result<ExitCode> {
    // Building needs a host back-end; until one is installed, the driver
    // reports the same build error as transpile.
    let source = read_source(path)?;
    let file = path.to_string_lossy();
    let compiler = Compiler::new(Pipeline::with_verbose(verbose));
    match compiler.transpile(&source, &file, None) {
        Ok(_code) => {
            println!("Build complete, nya~!");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

// --- test ---

#[derive(Debug, Default)]
struct TestFlags {
    files: Vec<String>,
    fuzz: bool,
    fuzz_time: Option<Duration>,
    mutate: bool,
    cover: bool,
    cover_profile: Option<PathBuf>,
}

fn parse_test_flags(args: &[String]) -> Result<TestFlags> {
    let mut flags = TestFlags::default();
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-fuzz" => flags.fuzz = true,
            "-fuzztime" => {
                let value = iter
                    .next()
                    .context("Hiss! -fuzztime needs a duration, nya~")?;
                flags.fuzz_time = Some(parse_duration(value)?);
            }
            "-mutate" => flags.mutate = true,
            "-cover" => flags.cover = true,
            arg if arg.starts_with("-coverprofile=") => {
                flags.cover = true;
                flags.cover_profile =
                    Some(PathBuf::from(arg.trim_start_matches("-coverprofile=")));
            }
            "-coverprofile" => {
                let value = iter
                    .next()
                    .context("Hiss! -coverprofile needs a file, nya~")?;
                flags.cover = true;
                flags.cover_profile = Some(PathBuf::from(value));
            }
            arg if arg.starts_with('-') => {
                bail!("Hiss! Unknown flag for test: {arg}, nya~");
            }
            arg => flags.files.push(arg.to_owned()),
        }
    }
    Ok(flags)
}

fn parse_duration(text: &str) -> Result<Duration> {
    let (number, unit) = match text.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => text.split_at(idx),
        None => (text, "s"),
    };
    let value: f64 = number
        .parse()
        .with_context(|| format!("Hiss! Invalid duration {text:?}, nya~"))?;
    let secs = match unit {
        "ms" => value / 1000.0,
        "s" | "" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        _ => bail!("Hiss! Invalid duration {text:?}, nya~"),
    };
    Ok(Duration::from_secs_f64(secs))
}

fn run_test_command(args: &[String]) -> Result<ExitCode> {
    let flags = parse_test_flags(args)?;

    if flags.fuzz {
        return run_fuzz_mode(&flags);
    }
    if flags.mutate {
        return run_mutate_mode(&flags);
    }

    let files = if flags.files.is_empty() {
        discover_files(Path::new("."), is_test_file)?
    } else {
        resolve_paths(&flags.files, is_test_file)?
    };
    if files.is_empty() {
        bail!("Hiss! No test files found, nya~");
    }

    if let Some(profile) = &flags.cover_profile {
        std::fs::write(profile, "mode: set\n")
            .context("Hiss! Cannot write coverage profile header, nya~")?;
    }

    let mut has_failure = false;
    for file in &files {
        println!("=== Testing {} ===", file.display());
        let source = read_source(file)?;
        let name = file.to_string_lossy();
        let checked = match Pipeline::new().compile(&source, &name) {
            Ok(checked) => checked,
            Err(errors) => {
                eprintln!("{errors}");
                has_failure = true;
                continue;
            }
        };

        let coverage = if flags.cover {
            let mut cov = Coverage::new();
            cov.register_program(&checked.program);
            Some(Rc::new(RefCell::new(cov)))
        } else {
            None
        };

        let outcome = harness::run_test_checked(&checked, coverage.clone());
        print!("{}", outcome.output);
        if !outcome.success() {
            has_failure = true;
        }

        if let Some(cov) = coverage {
            cov.borrow().report(&mut std::io::stdout())?;
            if let Some(profile) = &flags.cover_profile {
                cov.borrow().write_profile(profile)?;
            }
        }
    }

    Ok(exit_for(!has_failure))
}

fn run_fuzz_mode(flags: &TestFlags) -> Result<ExitCode> {
    let files = if flags.files.is_empty() {
        discover_files(Path::new("."), is_fuzz_file)?
    } else {
        resolve_paths(&flags.files, is_fuzz_file)?
    };
    if files.is_empty() {
        bail!("Hiss! No fuzz files found, nya~");
    }
    let duration = flags.fuzz_time.unwrap_or(Duration::from_secs(10));

    let mut ok = true;
    for file in &files {
        println!("=== Fuzzing {} ===", file.display());
        let source = read_source(file)?;
        let mut stdout = std::io::stdout();
        match harness::run_fuzz_source(&source, &file.to_string_lossy(), duration, &mut stdout) {
            Ok(clean) => ok &= clean,
            Err(HarnessError::Compile(errors)) => {
                eprintln!("{errors}");
                ok = false;
            }
            Err(err) => {
                eprintln!("{err}");
                ok = false;
            }
        }
    }
    Ok(exit_for(ok))
}

fn run_mutate_mode(flags: &TestFlags) -> Result<ExitCode> {
    // Explicit mode: first file is the source, the rest are test files.
    if flags.files.len() >= 2 && !is_pattern(&flags.files[0]) {
        let source_path = PathBuf::from(&flags.files[0]);
        let tests: Vec<PathBuf> = flags.files[1..].iter().map(PathBuf::from).collect();
        let ok = mutate_pair(&source_path, &tests)?;
        return Ok(exit_for(ok));
    }

    // Auto-discovery: resolve test files and pair each foo_test.nyan with
    // its foo.nyan source.
    let test_files = if flags.files.is_empty() {
        discover_files(Path::new("."), is_test_file)?
    } else {
        resolve_paths(&flags.files, is_test_file)?
    };
    if test_files.is_empty() {
        bail!("Hiss! No test files found, nya~");
    }

    let mut pairs: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    let mut skipped = 0usize;
    for test_file in &test_files {
        let source = infer_source_file(test_file);
        if source.exists() {
            pairs.entry(source).or_default().push(test_file.clone());
        } else {
            skipped += 1;
        }
    }

    if pairs.is_empty() {
        eprintln!("Hiss! No source files found for mutation testing, nya~");
        eprintln!("  Each foo_test.nyan needs a matching foo.nyan source file.");
        if skipped > 0 {
            eprintln!("  Skipped {skipped} test file(s) with no matching source.");
        }
        return Ok(ExitCode::FAILURE);
    }

    let mut ok = true;
    for (source, tests) in &pairs {
        println!("=== Mutating {} ===", source.display());
        ok &= mutate_pair(source, tests)?;
    }
    Ok(exit_for(ok))
}

fn mutate_pair(source_path: &Path, test_paths: &[PathBuf]) -> Result<bool> {
    let source = read_source(source_path)?;
    let mut tests = Vec::with_capacity(test_paths.len());
    for path in test_paths {
        tests.push((path.to_string_lossy().into_owned(), read_source(path)?));
    }
    let mut stdout = std::io::stdout();
    match harness::run_mutation(
        &source,
        &source_path.to_string_lossy(),
        &tests,
        &mut stdout,
    ) {
        Ok(_stats) => Ok(true),
        Err(HarnessError::Compile(errors)) => {
            eprintln!("{errors}");
            Ok(false)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(false)
        }
    }
}

/// `testdata/math_test.nyan` → `testdata/math.nyan`.
fn infer_source_file(test_file: &Path) -> PathBuf {
    let dir = test_file.parent().unwrap_or(Path::new("."));
    let base = test_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = base.trim_end_matches("_test.nyan");
    dir.join(format!("{name}.nyan"))
}

fn is_pattern(path: &str) -> bool {
    path.ends_with("/...")
}

// --- fmt / lint ---

fn run_fmt_command(write: bool, files: &[PathBuf]) -> Result<ExitCode> {
    if files.is_empty() {
        bail!("Hiss! Please specify .nyan files to format, nya~");
    }
    for file in files {
        let source = read_source(file)?;
        let formatted = meowfmt::format_source(&source, &file.to_string_lossy());
        if write {
            std::fs::write(file, formatted)
                .with_context(|| format!("Hiss! Cannot write {}, nya~", file.display()))?;
        } else {
            print!("{formatted}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_lint_command(paths: &[String]) -> Result<ExitCode> {
    for path in paths {
        if path.starts_with('-') {
            bail!("Hiss! Unknown flag for lint: {path}, nya~");
        }
    }
    let files = if paths.is_empty() {
        discover_files(Path::new("."), is_nyan_file)?
    } else {
        resolve_paths(paths, is_nyan_file)?
    };
    if files.is_empty() {
        bail!("Hiss! No .nyan files found, nya~");
    }

    let linter = Linter::new();
    let mut has_issues = false;
    for file in &files {
        let source = read_source(file)?;
        let (program, parse_errors) =
            meowparser::parse(Lexer::new(&source, file.to_string_lossy().as_ref()));
        if !parse_errors.is_empty() {
            for error in &parse_errors {
                eprintln!("{error}");
            }
            has_issues = true;
            continue;
        }
        for diagnostic in linter.lint(&program) {
            eprintln!("{diagnostic}");
            has_issues = true;
        }
    }
    Ok(exit_for(!has_issues))
}

// --- discovery ---

fn is_test_file(name: &str) -> bool {
    name.ends_with("_test.nyan")
}

fn is_fuzz_file(name: &str) -> bool {
    name.starts_with("fuzz_") && name.ends_with(".nyan")
}

fn is_nyan_file(name: &str) -> bool {
    name.ends_with(".nyan")
}

/// Non-recursive directory listing, lexicographic.
fn discover_files(dir: &Path, matches: fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Hiss! Cannot search for files in {}, nya~", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && matches(&entry.file_name().to_string_lossy()) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Recursive walk, lexicographic at every level.
fn discover_files_recursive(root: &Path, matches: fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let mut entries: Vec<_> = std::fs::read_dir(&dir)
            .with_context(|| format!("Hiss! Cannot search for files in {}, nya~", dir.display()))?
            .collect::<std::io::Result<_>>()?;
        entries.sort_by_key(|e| e.path());
        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                dirs.push(path);
            } else if matches(&entry.file_name().to_string_lossy()) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Resolves path patterns: `dir/...` walks recursively, a bare directory
/// globs non-recursively, anything else is taken as a file. Duplicates are
/// dropped, discovery order is deterministic.
fn resolve_paths(patterns: &[String], matches: fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut add = |paths: Vec<PathBuf>, result: &mut Vec<PathBuf>| {
        for path in paths {
            if seen.insert(path.clone()) {
                result.push(path);
            }
        }
    };
    for pattern in patterns {
        if let Some(root) = pattern.strip_suffix("/...") {
            let root = if root.is_empty() { "." } else { root };
            add(discover_files_recursive(Path::new(root), matches)?, &mut result);
        } else {
            let path = PathBuf::from(pattern);
            if path.is_dir() {
                add(discover_files(&path, matches)?, &mut result);
            } else {
                add(vec![path], &mut result);
            }
        }
    }
    Ok(result)
}

fn exit_for(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args_run_mode() {
        let cli = Cli::try_parse_from(["meow", "run", "hello.nyan"]).unwrap();
        assert!(matches!(cli.command, Command::Run { .. }));
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_args_build_output() {
        let cli = Cli::try_parse_from(["meow", "build", "hello.nyan", "-o", "hello"]).unwrap();
        let Command::Build { file, output } = cli.command else {
            panic!("expected build");
        };
        assert_eq!(file, PathBuf::from("hello.nyan"));
        assert_eq!(output.as_deref(), Some("hello"));
    }

    #[test]
    fn parse_args_verbose_is_global() {
        let cli = Cli::try_parse_from(["meow", "lint", "-v", "x.nyan"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_args_fmt_write() {
        let cli = Cli::try_parse_from(["meow", "fmt", "-w", "a.nyan", "b.nyan"]).unwrap();
        let Command::Fmt { write, files } = cli.command else {
            panic!("expected fmt");
        };
        assert!(write);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_flags_go_style() {
        let flags = parse_test_flags(&[
            "-fuzz".into(),
            "-fuzztime".into(),
            "30s".into(),
            "math_test.nyan".into(),
        ])
        .unwrap();
        assert!(flags.fuzz);
        assert_eq!(flags.fuzz_time, Some(Duration::from_secs(30)));
        assert_eq!(flags.files, vec!["math_test.nyan".to_owned()]);

        let flags = parse_test_flags(&["-coverprofile=cov.out".into()]).unwrap();
        assert!(flags.cover);
        assert_eq!(flags.cover_profile, Some(PathBuf::from("cov.out")));
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert!(parse_duration("fast").is_err());
    }

    #[test]
    fn source_inference() {
        assert_eq!(
            infer_source_file(Path::new("testdata/math_test.nyan")),
            PathBuf::from("testdata/math.nyan")
        );
    }

    #[test]
    fn pattern_detection() {
        assert!(is_pattern("./..."));
        assert!(is_pattern("testdata/..."));
        assert!(!is_pattern("math_test.nyan"));
    }
}
