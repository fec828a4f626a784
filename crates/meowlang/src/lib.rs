//! meowlang core library.
//!
//! This crate implements the Meow programming language toolchain frontend
//! (lexer, Pratt parser, three-pass type checker), the tree-walking
//! evaluation substrate used by the playground and the test harness, the
//! mutation-testing engine, and the shared utilities behind the `meow`
//! command: formatter, linter, coverage tracker, and the compile pipeline.
//!
//! Meow is a small, cat-themed, statically typed, expression-oriented
//! scripting language; `.nyan` sources flow through
//! source text → tokens → AST + parse errors → type info + type errors →
//! either direct interpretation or host-language emission via a pluggable
//! [`compiler::Backend`].

pub mod position;
pub mod tokens;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod types;
pub mod typeck;
pub mod diagnostics;
pub mod runtime;
pub mod mutation;
pub mod coverage;
pub mod harness;
pub mod fmt;
pub mod lint;
pub mod playground;
pub mod compiler;

pub use compiler::{Backend, Checked, Compiler, Pipeline};
pub use diagnostics::{BuildError, CompileErrors, Failure, ParseError, TypeError};
pub use position::Position;
pub use runtime::{Interpreter, Value};
pub use tokens::{Token, TokenKind};

/// Version of the Meow toolchain crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
