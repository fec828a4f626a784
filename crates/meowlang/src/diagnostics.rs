use crate::position::Position;
use std::fmt;
use thiserror::Error;

/// A parser diagnostic. The parser accumulates these and keeps going, so
/// users can fix several issues in one pass.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{pos}: Hiss! {message}, nya~")]
pub struct ParseError {
    pub pos: Position,
    pub message: String,
}

impl ParseError {
    pub fn new(pos: Position, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }
}

/// A type-checking diagnostic, accumulated across all three checker passes.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Hiss! {message} at {pos}, nya~")]
pub struct TypeError {
    pub pos: Position,
    pub message: String,
}

impl TypeError {
    pub fn new(pos: Position, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }
}

/// A runtime termination cause.
///
/// `Hiss` failures are user-visible and catchable with `~>` or `gag`;
/// `Assert` failures are raised by the test builtins and caught by the
/// harness `run` wrapper (and, like any caught failure, by `gag`);
/// `StepLimit` and `Internal` always escape to the top level.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    #[error("{message}")]
    Hiss { message: String },
    #[error("{message}")]
    Assert { message: String },
    #[error("Hiss! step limit exceeded ({limit} steps), nya~")]
    StepLimit { limit: u64 },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Failure {
    /// Builds a user failure with the cat frame applied.
    pub fn hiss(message: impl fmt::Display) -> Self {
        Failure::Hiss {
            message: format!("Hiss! {message}, nya~"),
        }
    }

    pub fn assert(message: impl Into<String>) -> Self {
        Failure::Assert {
            message: message.into(),
        }
    }

    pub fn internal(message: impl fmt::Display) -> Self {
        Failure::Internal {
            message: message.to_string(),
        }
    }

    /// Reports whether this failure is catchable by user code (`~>`, `gag`).
    pub fn is_catchable(&self) -> bool {
        matches!(self, Failure::Hiss { .. } | Failure::Assert { .. })
    }

    /// The message carried into a `Furball` when the failure is caught.
    pub fn furball_message(&self) -> &str {
        match self {
            Failure::Hiss { message } | Failure::Assert { message } => message,
            Failure::StepLimit { .. } => "step limit exceeded",
            Failure::Internal { message } => message,
        }
    }
}

/// An error from the transpile/build driver.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Hiss! no host back-end is configured for `{0}`, nya~")]
    NoBackend(&'static str),
    #[error("Hiss! {0}, nya~")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Batched front-end errors from the compile pipeline: either the parser's
/// batch or the checker's batch, never both (checking only runs on a clean
/// parse).
#[derive(Debug, Clone, PartialEq)]
pub enum CompileErrors {
    Parse(Vec<ParseError>),
    Type(Vec<TypeError>),
}

impl CompileErrors {
    pub fn len(&self) -> usize {
        match self {
            CompileErrors::Parse(errs) => errs.len(),
            CompileErrors::Type(errs) => errs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileErrors::Parse(errs) => {
                for (i, e) in errs.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{e}")?;
                }
            }
            CompileErrors::Type(errs) => {
                for (i, e) in errs.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{e}")?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}
