use crate::helper::{compile, run_source, run_source_error, run_unchecked};
use meowlang::runtime::Interpreter;

#[test]
fn hello_world() {
    let got = run_source("hello.nyan", r#"nya("Hello, World!")"#);
    assert_eq!(got, "Hello, World!\n");
}

#[test]
fn nya_joins_arguments_with_spaces() {
    let got = run_source("t.nyan", r#"nya("hello", "world")"#);
    assert_eq!(got, "hello world\n");
}

#[test]
fn literal_display() {
    let got = run_source("t.nyan", "nya(42)\nnya(3.14)\nnya(yarn)\nnya(hairball)\nnya(catnap)");
    assert_eq!(got, "42\n3.14\ntrue\nfalse\ncatnap\n");
}

#[test]
fn arithmetic() {
    let got = run_source(
        "t.nyan",
        "nyan a = 10\nnyan b = 3\nnya(a + b)\nnya(a - b)\nnya(a * b)\nnya(a / b)\nnya(a % b)",
    );
    assert_eq!(got, "13\n7\n30\n3\n1\n");
}

#[test]
fn recursion_factorial() {
    let got = run_source(
        "factorial.nyan",
        "meow factorial(n int) int {\n  sniff (n <= 1) {\n    bring 1\n  } scratch {\n    bring n * factorial(n - 1)\n  }\n}\nnya(factorial(5))",
    );
    assert_eq!(got, "120\n");
}

#[test]
fn recursion_fib() {
    let got = run_source(
        "fib.nyan",
        "meow fib(n int) int {\n  sniff (n <= 1) {\n    bring n\n  }\n  bring fib(n - 1) + fib(n - 2)\n}\nnya(fib(10))",
    );
    assert_eq!(got, "55\n");
}

#[test]
fn pipe_chain() {
    let got = run_source(
        "pipe.nyan",
        "nyan xs = [1, 2, 3, 4, 5]\nnyan r = xs |=| picky(paw(x int) { x > 2 }) |=| lick(paw(x int) { x * 10 })\nnya(r)",
    );
    assert_eq!(got, "[30, 40, 50]\n");
}

#[test]
fn pipe_bare_name_and_function_value() {
    let got = run_source(
        "pipe2.nyan",
        "nyan double = paw(x int) { x * 2 }\nnya([9] |=| head)\nnya(5 |=| double)",
    );
    assert_eq!(got, "9\n10\n");
}

#[test]
fn catch_with_value_fallback() {
    let got = run_source("catch.nyan", "nyan r = hiss(\"boom\") ~> 42\nnya(r)");
    assert_eq!(got, "42\n");
}

#[test]
fn catch_with_function_handler() {
    let got = run_source(
        "catch2.nyan",
        "nyan r = hiss(\"error\") ~> paw(err string) { \"caught\" }\nnya(r)",
    );
    assert_eq!(got, "caught\n");
}

#[test]
fn catch_passes_the_furball_to_the_handler() {
    let got = run_source(
        "catch3.nyan",
        "nyan r = hiss(\"lost yarn\") ~> paw(err furball) { to_string(err) }\nnya(r)",
    );
    assert_eq!(got, "Hiss! lost yarn, nya~\n");
}

#[test]
fn catch_leaves_successful_values_alone() {
    let got = run_source("catch4.nyan", "nyan r = 7 ~> 42\nnya(r)");
    assert_eq!(got, "7\n");
}

#[test]
fn match_ranges() {
    let got = run_source(
        "match.nyan",
        "nyan x = 15\nnyan r = peek(x) {\n  1..10 => \"small\"\n  11..20 => \"medium\"\n  _ => \"large\"\n}\nnya(r)",
    );
    assert_eq!(got, "medium\n");
}

#[test]
fn match_literals_and_wildcard() {
    let got = run_source(
        "match2.nyan",
        "nyan r = peek(3) {\n  1 => \"one\"\n  2 => \"two\"\n  3 => \"three\"\n  _ => \"other\"\n}\nnya(r)",
    );
    assert_eq!(got, "three\n");
}

#[test]
fn match_without_covering_arm_is_nil() {
    let got = run_source(
        "match3.nyan",
        "nyan r = peek(99) {\n  1 => \"one\"\n}\nnya(r)",
    );
    assert_eq!(got, "catnap\n");
}

#[test]
fn match_floats_fall_in_int_ranges() {
    let got = run_source(
        "match4.nyan",
        "nyan r = peek(2.5) {\n  1..3 => \"near\"\n  _ => \"far\"\n}\nnya(r)",
    );
    assert_eq!(got, "near\n");
}

#[test]
fn fizzbuzz() {
    let got = run_source(
        "fizzbuzz.nyan",
        "purr i (1..15) {\n  sniff (i % 15 == 0) {\n    nya(\"FizzBuzz\")\n  } scratch sniff (i % 3 == 0) {\n    nya(\"Fizz\")\n  } scratch sniff (i % 5 == 0) {\n    nya(\"Buzz\")\n  } scratch {\n    nya(i)\n  }\n}",
    );
    let lines: Vec<&str> = got.trim_end().split('\n').collect();
    assert_eq!(lines.len(), 15);
    assert_eq!(lines[0], "1");
    assert_eq!(lines[2], "Fizz");
    assert_eq!(lines[4], "Buzz");
    assert_eq!(lines[14], "FizzBuzz");
}

#[test]
fn purr_count_form_is_exclusive() {
    let got = run_source("purr.nyan", "purr i (5) {\n  nya(i)\n}");
    assert_eq!(got, "0\n1\n2\n3\n4\n");
}

#[test]
fn purr_range_form_is_inclusive() {
    let got = run_source("purr2.nyan", "purr i (1..3) {\n  nya(i)\n}");
    assert_eq!(got, "1\n2\n3\n");
}

#[test]
fn purr_zero_or_negative_count_runs_zero_times() {
    let got = run_source(
        "purr3.nyan",
        "purr i (0) {\n  nya(\"never\")\n}\nnyan n = 0 - 3\npurr j (n) {\n  nya(\"never\")\n}\nnya(\"done\")",
    );
    assert_eq!(got, "done\n");
}

#[test]
fn loop_variable_does_not_leak() {
    let got = run_source(
        "purr4.nyan",
        "purr i (2) {\n  nya(i)\n}\nnyan i = 100\nnya(i)",
    );
    assert_eq!(got, "0\n1\n100\n");
}

#[test]
fn list_operations() {
    let got = run_source(
        "lists.nyan",
        "nyan xs = [1, 2, 3, 4, 5]\nnya(lick(xs, paw(x int) { x * 2 }))\nnya(picky(xs, paw(x int) { x % 2 == 0 }))\nnya(curl(xs, 0, paw(acc int, x int) { acc + x }))\nnya(head(xs))\nnya(tail(xs))\nnya(append([1, 2], 3))\nnya(len(xs))\nnya(xs[0])",
    );
    assert_eq!(
        got,
        "[2, 4, 6, 8, 10]\n[2, 4]\n15\n1\n[2, 3, 4, 5]\n[1, 2, 3]\n5\n1\n"
    );
}

#[test]
fn string_concat_and_conversions() {
    let got = run_source(
        "strings.nyan",
        "nyan a = \"hello\"\nnya(a + \" world\")\nnya(to_int(3.14))\nnya(to_float(42))\nnya(to_string(123))",
    );
    assert_eq!(got, "hello world\n3\n42\n123\n");
}

#[test]
fn closures_see_their_defining_scope() {
    let got = run_source(
        "closure.nyan",
        "nyan count = 41\nnyan bump = paw() { count + 1 }\nnya(bump())",
    );
    assert_eq!(got, "42\n");
}

#[test]
fn nested_functions_capture_parameters() {
    let got = run_source(
        "nested.nyan",
        "meow outer(x int) int {\n  meow inner(y int) int {\n    bring x + y\n  }\n  bring inner(10)\n}\nnya(outer(5))",
    );
    assert_eq!(got, "15\n");
}

#[test]
fn kitty_fields_and_display() {
    let got = run_source(
        "kitty.nyan",
        "kitty Nyantyu {\n  name: string\n  age: int\n}\nnyan c = Nyantyu(\"Tama\", 3)\nnya(c.name)\nnya(c.age)\nnya(c)",
    );
    assert_eq!(got, "Tama\n3\nNyantyu{name: Tama, age: 3}\n");
}

#[test]
fn collar_constructor_and_value_field() {
    let got = run_source(
        "collar.nyan",
        "collar UserId = int\nnyan id = UserId(42)\nnya(id.value)",
    );
    assert_eq!(got, "42\n");
}

#[test]
fn learn_methods_dispatch_with_self() {
    let got = run_source(
        "learn.nyan",
        "kitty Nyantyu {\n  name: string\n  age: int\n}\nlearn Nyantyu {\n  meow greet() string {\n    bring \"I am \" + self.name\n  }\n}\nnyan c = Nyantyu(\"Tama\", 3)\nnya(c.greet())",
    );
    assert_eq!(got, "I am Tama\n");
}

#[test]
fn learn_methods_take_parameters() {
    let got = run_source(
        "learn2.nyan",
        "kitty Counter {\n  val: int\n}\nlearn Counter {\n  meow add(n int) int {\n    bring self.val + n\n  }\n}\nnyan c = Counter(10)\nnya(c.add(5))",
    );
    assert_eq!(got, "15\n");
}

#[test]
fn method_dispatch_through_a_pipe() {
    let got = run_source(
        "learn3.nyan",
        "kitty Counter {\n  val: int\n}\nlearn Counter {\n  meow add(n int) int {\n    bring self.val + n\n  }\n}\nnyan c = Counter(10)\nnya(7 |=| c.add())",
    );
    assert_eq!(got, "17\n");
}

#[test]
fn map_literals_preserve_insertion_order() {
    let got = run_source(
        "maps.nyan",
        "nyan m = {\"zebra\": 1, \"alpha\": 2}\nnya(m)\nnya(m[\"alpha\"])\nnya(m[\"missing\"])",
    );
    assert_eq!(got, "{zebra: 1, alpha: 2}\n2\ncatnap\n");
}

#[test]
fn gag_wraps_failures_as_furballs() {
    let got = run_source(
        "gag.nyan",
        "nyan r = gag(paw() { hiss(\"oops\") })\nnya(is_furball(r))\nnyan ok = gag(paw() { 5 })\nnya(is_furball(ok))\nnya(ok)",
    );
    assert_eq!(got, "true\nfalse\n5\n");
}

#[test]
fn logical_operators_return_their_operands() {
    let got = run_unchecked(
        "law.nyan",
        "nya(0 && 5)\nnya(1 && 5)\nnya(0 || 2)\nnya(2 || 0)\nnya(\"\" || \"cat\")",
    )
    .unwrap();
    assert_eq!(got, "0\n5\n2\n2\ncat\n");
}

#[test]
fn short_circuit_skips_the_right_operand() {
    let got = run_source(
        "law2.nyan",
        "meow loud() bool {\n  nya(\"evaluated\")\n  bring yarn\n}\nnyan a = hairball && loud()\nnyan b = yarn || loud()\nnya(a)\nnya(b)",
    );
    assert_eq!(got, "false\ntrue\n");
}

#[test]
fn hiss_terminates_evaluation() {
    let failure = run_source_error("hiss.nyan", "hiss(\"something went wrong\")");
    let message = failure.to_string();
    assert!(message.starts_with("Hiss!"), "{message}");
    assert!(message.ends_with("nya~"), "{message}");
    assert!(message.contains("something went wrong"));
}

#[test]
fn division_by_zero_fails_with_the_distinguished_message() {
    let failure = run_source_error("div.nyan", "nyan zero = 0\nnya(1 / zero)");
    assert_eq!(failure.to_string(), "Hiss! Division by zero, nya~");
}

#[test]
fn nab_is_rejected_at_evaluation_time() {
    let failure = run_source_error("nab.nyan", "nab \"file\"");
    assert!(failure.to_string().contains("not supported"));
}

#[test]
fn undefined_variable_fails() {
    let err = run_unchecked("undef.nyan", "nya(ghost)").unwrap_err();
    assert!(err.to_string().contains("undefined variable ghost"));
}

#[test]
fn index_out_of_range_fails() {
    let failure = run_source_error("idx.nyan", "nyan xs = [1]\nnya(xs[3])");
    assert!(failure.to_string().contains("out of range"));
}

#[test]
fn step_limit_bounds_runaway_recursion() {
    let checked = compile(
        "spin.nyan",
        "meow spin(n int) int {\n  bring spin(n)\n}\nnya(spin(1))",
    );
    let (mut interp, _buffer) = Interpreter::with_capture();
    interp.set_type_info(checked.info);
    interp.set_step_limit(1000);
    let failure = interp.run(&checked.program).unwrap_err();
    assert!(failure.to_string().contains("step limit exceeded"));
}

#[test]
fn step_limit_is_not_catchable() {
    let checked = compile(
        "spin2.nyan",
        "meow spin(n int) int {\n  bring spin(n)\n}\nnyan r = spin(1) ~> 0\nnya(r)",
    );
    let (mut interp, _buffer) = Interpreter::with_capture();
    interp.set_type_info(checked.info);
    interp.set_step_limit(1000);
    let failure = interp.run(&checked.program).unwrap_err();
    assert!(failure.to_string().contains("step limit exceeded"));
}

#[test]
fn equality_is_structural_on_lists_and_records() {
    let got = run_source(
        "eq.nyan",
        "kitty Cat {\n  name: string\n}\nnya([1, 2] == [1, 2])\nnya([1, 2] == [1, 3])\nnya(Cat(\"Tama\") == Cat(\"Tama\"))\nnya(Cat(\"Tama\") != Cat(\"Mike\"))",
    );
    assert_eq!(got, "true\nfalse\ntrue\ntrue\n");
}

#[test]
fn collars_of_different_types_are_never_equal() {
    let got = run_source(
        "collareq.nyan",
        "collar A = int\ncollar B = int\nnya(A(1) == B(1))\nnya(A(1) == A(1))",
    );
    assert_eq!(got, "false\ntrue\n");
}

#[test]
fn implicit_declaration_binds_like_nyan() {
    let got = run_source("implicit.nyan", "x = 42\nnya(x)");
    assert_eq!(got, "42\n");
}
