use meowlang::ast::Program;
use meowlang::compiler::Checked;
use meowlang::diagnostics::{Failure, TypeError};
use meowlang::lexer::Lexer;
use meowlang::runtime::Interpreter;
use meowlang::{parser, typeck, Pipeline};

/// Compiles and interprets a source string, returning captured output.
/// Panics on any front-end error or runtime failure.
pub fn run_source(name: &str, source: &str) -> String {
    let checked = compile(name, source);
    let (mut interp, buffer) = Interpreter::with_capture();
    interp.set_type_info(checked.info);
    if let Err(failure) = interp.run(&checked.program) {
        panic!("runtime failure: {failure}");
    }
    let output = buffer.borrow().clone();
    output
}

/// Compiles and interprets, expecting a runtime failure.
pub fn run_source_error(name: &str, source: &str) -> Failure {
    let checked = compile(name, source);
    let (mut interp, _buffer) = Interpreter::with_capture();
    interp.set_type_info(checked.info);
    interp
        .run(&checked.program)
        .expect_err("expected a runtime failure")
}

/// Parses and interprets without the checker (for interpreter-level laws
/// the checker would reject).
pub fn run_unchecked(name: &str, source: &str) -> Result<String, Failure> {
    let program = parse(name, source);
    let (mut interp, buffer) = Interpreter::with_capture();
    interp.run(&program)?;
    let output = buffer.borrow().clone();
    Ok(output)
}

pub fn compile(name: &str, source: &str) -> Checked {
    Pipeline::new()
        .compile(source, name)
        .unwrap_or_else(|errors| panic!("compile failed:\n{errors}"))
}

pub fn parse(name: &str, source: &str) -> Program {
    let (program, errors) = parser::parse(Lexer::new(source, name));
    assert!(errors.is_empty(), "parse errors: {errors:?}");
    program
}

/// Runs the checker and returns its error batch (possibly empty).
pub fn check_errors(source: &str) -> Vec<TypeError> {
    let program = parse("check.nyan", source);
    let (_, errors) = typeck::check(&program);
    errors
}
