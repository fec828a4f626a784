use crate::helper::{compile, parse};
use meowlang::coverage::Coverage;
use meowlang::harness;
use meowlang::lint::Linter;
use meowlang::playground;
use meowlang::runtime::Interpreter;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn playground_runs_the_factorial_scenario() {
    let got = playground::run_source(
        "meow factorial(n int) int {\n  sniff (n <= 1) {\n    bring 1\n  } scratch {\n    bring n * factorial(n - 1)\n  }\n}\nnya(factorial(5))",
    );
    assert_eq!(got, r#"{"output":"120\n"}"#);
}

#[test]
fn playground_error_envelope_is_json() {
    let got = playground::run_source("hiss(\"boom\")");
    assert!(got.starts_with('{') && got.ends_with('}'), "{got}");
    assert!(got.contains(r#""error":"Hiss! boom, nya~""#), "{got}");
}

#[test]
fn harness_output_matches_the_test_format() {
    let source = "meow add(a int, b int) int {\n  bring a + b\n}\nrun(\"adds small numbers\", paw() { expect(add(1, 2), 3) })\nrun(\"rejects drift\", paw() { judge(add(1, 2) == 3) })";
    let outcome = harness::run_test_source(source, "add_test.nyan").unwrap();
    assert!(outcome.success());
    let lines: Vec<&str> = outcome.output.lines().collect();
    assert_eq!(lines[0], "PASS: adds small numbers");
    assert_eq!(lines[1], "PASS: rejects drift");
    assert_eq!(lines.last().unwrap(), &"All 2 tests passed, nya~!");
}

#[test]
fn harness_failure_summary_counts() {
    let source = "run(\"ok\", paw() { judge(yarn) })\nrun(\"bad\", paw() { expect(1, 2) })\nrun(\"worse\", paw() { refuse(yarn) })";
    let outcome = harness::run_test_source(source, "mixed_test.nyan").unwrap();
    assert_eq!(outcome.passed, 1);
    assert_eq!(outcome.failed, 2);
    assert!(outcome.output.contains("1 passed, 2 failed, nya~"));
    assert!(outcome.output.contains("FAIL: bad - expected 2, got 1"));
}

#[test]
fn tests_run_in_source_order() {
    let source = "run(\"first\", paw() { judge(yarn) })\nrun(\"second\", paw() { judge(yarn) })\nrun(\"third\", paw() { judge(yarn) })";
    let outcome = harness::run_test_source(source, "order_test.nyan").unwrap();
    let names: Vec<&str> = outcome.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["first", "second", "third"]);
}

#[test]
fn lint_reports_multiple_rules_sorted_by_position() {
    let program = parse(
        "messy.nyan",
        "nyan BadName = 1\nmeow f() int {\n  bring 1\n  nya(\"later\")\n}\nsniff (yarn) {\n}",
    );
    let diagnostics = Linter::new().lint(&program);
    let rules: Vec<&str> = diagnostics.iter().map(|d| d.rule).collect();
    assert!(rules.contains(&"snake-case"));
    assert!(rules.contains(&"unused-var"));
    assert!(rules.contains(&"unreachable-code"));
    assert!(rules.contains(&"empty-block"));
    let mut sorted = diagnostics.clone();
    sorted.sort_by(|a, b| {
        (a.pos.line, a.pos.column, a.rule).cmp(&(b.pos.line, b.pos.column, b.rule))
    });
    assert_eq!(diagnostics, sorted);
}

#[test]
fn coverage_tracks_executed_statements() {
    let checked = compile(
        "cov.nyan",
        "nyan hot = 1\nsniff (hot == 0) {\n  nya(\"cold branch\")\n}\nnya(hot)",
    );
    let coverage = Rc::new(RefCell::new(Coverage::new()));
    coverage.borrow_mut().register_program(&checked.program);

    let (mut interp, _buffer) = Interpreter::with_capture();
    interp.set_type_info(checked.info);
    interp.set_coverage(coverage.clone());
    interp.run(&checked.program).unwrap();

    let percent = coverage.borrow().percent();
    // The cold branch statement never runs: 3 of 4 statements covered.
    assert!((percent - 75.0).abs() < 0.01, "percent = {percent}");
}

#[test]
fn coverage_profile_is_go_compatible() {
    let checked = compile("covp.nyan", "nyan x = 1\nnya(x)");
    let coverage = Rc::new(RefCell::new(Coverage::new()));
    coverage.borrow_mut().register_program(&checked.program);
    let (mut interp, _buffer) = Interpreter::with_capture();
    interp.set_type_info(checked.info);
    interp.set_coverage(coverage.clone());
    interp.run(&checked.program).unwrap();

    let dir = std::env::temp_dir().join(format!("meow-cov-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("cover.out");
    std::fs::write(&path, "mode: set\n").unwrap();
    coverage.borrow().write_profile(&path).unwrap();

    let profile = std::fs::read_to_string(&path).unwrap();
    let mut lines = profile.lines();
    assert_eq!(lines.next(), Some("mode: set"));
    for line in lines {
        // file:startLine.col,endLine.col numStmt count
        assert!(line.starts_with("covp.nyan:"), "{line}");
        let rest = line.strip_prefix("covp.nyan:").unwrap();
        let mut parts = rest.split(' ');
        let span = parts.next().unwrap();
        assert!(span.contains(',') && span.contains('.'), "{line}");
        assert_eq!(parts.next(), Some("1"));
        assert_eq!(parts.next(), Some("1"));
    }
    std::fs::remove_dir_all(&dir).ok();
}
