use crate::helper::parse;
use meowlang::ast::Expr;
use meowlang::harness;
use meowlang::mutation::{build_schema, enumerate, MutantKind, Runner};
use std::path::Path;
use std::time::Duration;

const FACTORIAL: &str = "meow factorial(n int) int {\n  sniff (n <= 1) {\n    bring 1\n  }\n  bring n * factorial(n - 1)\n}\n";

#[test]
fn enumerates_the_expected_kinds_for_factorial() {
    let program = parse("factorial.nyan", FACTORIAL);
    let mutants = enumerate(&program);
    let kinds: Vec<MutantKind> = mutants.iter().map(|m| m.kind).collect();
    assert!(kinds.contains(&MutantKind::ComparisonSwap)); // <= ↔ <
    assert!(kinds.contains(&MutantKind::ConditionNegate));
    assert!(kinds.contains(&MutantKind::ReturnNil));
    assert!(kinds.contains(&MutantKind::ArithmeticSwap)); // * ↔ / and - ↔ +
    assert!(kinds.contains(&MutantKind::IntBoundary));
    // Dense ids, every mutant carries a position.
    for (i, mutant) in mutants.iter().enumerate() {
        assert_eq!(mutant.id, i);
        assert_eq!(mutant.pos.file.as_str(), "factorial.nyan");
    }
}

#[test]
fn int_boundary_directions() {
    let program = parse("b.nyan", "nyan zero = 0\nnyan seven = 7");
    let mutants = enumerate(&program);
    assert_eq!(mutants.len(), 2);
    assert!(mutants[0].description.contains("int 0→1"));
    assert!(mutants[1].description.contains("int 7→0"));
}

#[test]
fn apply_and_undo_restore_the_enumeration() {
    let mut program = parse("inv.nyan", FACTORIAL);
    let mutants = enumerate(&program);
    let descriptions: Vec<String> = mutants.iter().map(|m| m.description.clone()).collect();
    for mutant in &mutants {
        mutant.apply(&mut program).unwrap();
        mutant.undo(&mut program).unwrap();
    }
    let after: Vec<String> = enumerate(&program)
        .iter()
        .map(|m| m.description.clone())
        .collect();
    assert_eq!(descriptions, after);
}

#[test]
fn schema_records_negated_conditions() {
    let mut program = parse("neg.nyan", "sniff (yarn) {\n  nya(1)\n}");
    let mutants = enumerate(&program);
    let negate = mutants
        .iter()
        .find(|m| m.kind == MutantKind::ConditionNegate)
        .expect("condition negate mutant");
    let schema = build_schema(&mut program, &mutants).unwrap();
    let entry = schema[&negate.target()]
        .iter()
        .find(|e| e.id == negate.id)
        .unwrap();
    assert!(matches!(entry.expr, Expr::Unary(_)));
}

#[test]
fn interpreter_driven_mutation_kills_tested_behavior() {
    let tests = vec![(
        "factorial_test.nyan".to_owned(),
        "run(\"fact5\", paw() { expect(factorial(5), 120) })\nrun(\"fact1\", paw() { expect(factorial(1), 1) })"
            .to_owned(),
    )];
    let mut out = Vec::new();
    let stats = harness::run_mutation(FACTORIAL, "factorial.nyan", &tests, &mut out).unwrap();
    assert!(stats.total > 0);
    // factorial(5) pins the arithmetic, the comparison, the condition, and
    // both returns; everything enumerated here is observable.
    assert!(
        stats.killed > stats.survived,
        "suite should kill most mutants: {stats:?}\n{}",
        String::from_utf8_lossy(&out)
    );
}

#[test]
fn runner_kills_on_nonzero_exit_and_spares_on_zero() {
    // Uses tiny system binaries as stand-ins for a super-binary.
    let (truthy, falsy) = (Path::new("/bin/true"), Path::new("/bin/false"));
    if !truthy.exists() || !falsy.exists() {
        return;
    }
    let program = parse("r.nyan", "nyan x = 1");
    let mutants = enumerate(&program);

    let survivor = Runner::new(truthy, Some(Duration::from_secs(5)));
    let results = survivor.run_all(&mutants);
    assert!(results.iter().all(|r| !r.killed));

    let killer = Runner::new(falsy, Some(Duration::from_secs(5)));
    let results = killer.run_all(&mutants);
    assert!(results.iter().all(|r| r.killed));
}
