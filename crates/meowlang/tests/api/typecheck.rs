use crate::helper::{check_errors, compile, parse};
use meowlang::ast::{preorder, Node};
use meowlang::typeck;

fn assert_fails(source: &str) {
    let errors = check_errors(source);
    assert!(!errors.is_empty(), "expected type errors for {source:?}");
    for error in &errors {
        let rendered = error.to_string();
        assert!(rendered.starts_with("Hiss!"), "{rendered}");
        assert!(rendered.ends_with("nya~"), "{rendered}");
        assert!(rendered.contains(':'), "position missing: {rendered}");
    }
}

// The six canonical must-fail programs.

#[test]
fn rejects_annotation_mismatch() {
    assert_fails(r#"nyan x int = "hello""#);
}

#[test]
fn rejects_mixed_addition() {
    assert_fails(r#"nyan r = 1 + "hello""#);
}

#[test]
fn rejects_unannotated_parameters() {
    assert_fails("meow greet(name) string {\n  bring \"hi \" + name\n}");
}

#[test]
fn rejects_missing_return_paths() {
    assert_fails("meow sign(n int) int {\n  sniff (n > 0) {\n    bring 1\n  }\n}");
}

#[test]
fn rejects_same_scope_redeclaration() {
    assert_fails("nyan x = 1\nnyan x = 2");
}

#[test]
fn rejects_mixed_primitive_lists() {
    assert_fails("nyan xs = [1, \"x\"]");
}

// Acceptance around the same rules.

#[test]
fn accepts_shadowing_in_nested_scopes() {
    assert!(check_errors(
        "nyan x = 1\nsniff (x == 1) {\n  nyan x = 2\n  nya(x)\n}"
    )
    .is_empty());
}

#[test]
fn accepts_return_on_every_path() {
    assert!(check_errors(
        "meow sign(n int) int {\n  sniff (n > 0) {\n    bring 1\n  } scratch {\n    bring 0 - 1\n  }\n}"
    )
    .is_empty());
}

#[test]
fn accepts_untyped_function_without_bring() {
    assert!(check_errors("meow shout() {\n  nya(\"meow!\")\n}").is_empty());
}

#[test]
fn rejects_bring_without_declared_return_type() {
    assert_fails("meow f(n int) {\n  bring n\n}");
}

#[test]
fn rejects_return_type_mismatch() {
    assert_fails("meow f(n int) int {\n  bring \"no\"\n}");
}

#[test]
fn rejects_wrong_arity_and_argument_types() {
    assert_fails("meow add(a int, b int) int {\n  bring a + b\n}\nnyan r = add(1)");
    assert_fails("meow add(a int, b int) int {\n  bring a + b\n}\nnyan r = add(1, \"two\")");
}

#[test]
fn rejects_kitty_field_count_mismatch() {
    assert_fails("kitty Cat {\n  name: string\n  age: int\n}\nnyan c = Cat(\"Tama\")");
}

#[test]
fn rejects_unknown_types() {
    assert_fails("nyan x Ghost = 1");
}

#[test]
fn modulo_requires_ints() {
    assert_fails("nyan r = 1.5 % 2.5");
    assert!(check_errors("nyan r = 7 % 2").is_empty());
}

#[test]
fn every_expression_is_annotated() {
    let sources = [
        "nyan x = 1 + 2 * 3\nnya(x)",
        "meow add(a int, b int) int {\n  bring a + b\n}\nnyan r = add(1, 2) ~> 0\nnya(r)",
        "nyan xs = [1, 2, 3]\nnyan r = xs |=| lick(paw(x int) { x * 10 })\nnya(r[0])",
        "nyan r = peek(5) {\n  1..3 => \"low\"\n  5 => \"five\"\n  _ => \"other\"\n}\nnya(r)",
        "kitty Cat {\n  name: string\n}\nlearn Cat {\n  meow greet() string {\n    bring \"hi \" + self.name\n  }\n}\nnyan c = Cat(\"Tama\")\nnya(c.greet())\nnya(c.name)",
        "nyan m = {\"a\": 1}\nnya(m[\"a\"])",
    ];
    for source in sources {
        let program = parse("totality.nyan", source);
        let (info, errors) = typeck::check(&program);
        assert!(errors.is_empty(), "{source:?}: {errors:?}");
        for node in preorder(&program) {
            if let Node::Expr(expr) = node {
                assert!(
                    info.expr_types.contains_key(&expr.id()),
                    "missing type for expression at {} in {source:?}",
                    expr.pos()
                );
            }
        }
    }
}

#[test]
fn alias_chains_unwrap_through_forward_references() {
    let checked = compile(
        "breeds.nyan",
        "breed Score = Points\nbreed Points = int\nmeow double(s Score) Score {\n  bring s + s\n}\nnya(double(21))",
    );
    let sig = &checked.info.func_sigs["double"];
    assert!(sig.ret.equals(&meowlang::types::Type::Int));
}

#[test]
fn trick_declarations_register_their_signatures() {
    let checked = compile(
        "tricks.nyan",
        "trick Noisy {\n  meow speak(volume int) string\n}\nnya(\"ok\")",
    );
    let trick = &checked.info.trick_types["Noisy"];
    assert_eq!(trick.methods.len(), 1);
    assert_eq!(trick.methods[0].name, "speak");
}
