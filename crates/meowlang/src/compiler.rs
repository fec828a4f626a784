use crate::ast::Program;
use crate::diagnostics::{BuildError, CompileErrors};
use crate::lexer::Lexer;
use crate::mutation::MutationSchema;
use crate::parser;
use crate::typeck::{self, TypeInfo};
use thiserror::Error;

/// A parsed and type-checked program, ready for evaluation or emission.
#[derive(Debug, Clone)]
pub struct Checked {
    pub program: Program,
    pub info: TypeInfo,
}

/// The front-end pipeline: lex → parse (error batch) → check (error batch).
///
/// The presence of any parse or type error means the program is not run;
/// both stages report everything they found in one pass.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub verbose: bool,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbose(verbose: bool) -> Self {
        Self { verbose }
    }

    fn debug(&self, phase: &str, file: &str) {
        if self.verbose {
            eprintln!("meow: {phase} {file}");
        }
    }

    pub fn compile(&self, source: &str, file: &str) -> Result<Checked, CompileErrors> {
        self.debug("lexing", file);
        let tokens = Lexer::new(source, file);

        self.debug("parsing", file);
        let (program, parse_errors) = parser::parse(tokens);
        if !parse_errors.is_empty() {
            return Err(CompileErrors::Parse(parse_errors));
        }

        self.debug("checking", file);
        let (info, type_errors) = typeck::check(&program);
        if !type_errors.is_empty() {
            return Err(CompileErrors::Type(type_errors));
        }

        Ok(Checked { program, info })
    }
}

/// A host-language code generator.
///
/// The back-end walks the typed AST and emits host source; when a mutation
/// schema is supplied, every instrumented expression site must consult
/// `MEOW_MUTANT` and select the recorded alternative form.
pub trait Backend {
    /// Name of the emission target, used in diagnostics.
    fn target(&self) -> &'static str;

    fn generate(
        &self,
        checked: &Checked,
        schema: Option<&MutationSchema>,
    ) -> Result<String, BuildError>;
}

/// An error from the transpile pipeline: front-end batches or back-end
/// failures.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Compile(#[from] CompileErrors),
    #[error("{0}")]
    Build(#[from] BuildError),
}

/// The transpile/build driver. The host back-end is a plug-in; without one
/// configured, `transpile` reports a build error (exit code 1 at the CLI).
#[derive(Default)]
pub struct Compiler {
    pipeline: Pipeline,
    backend: Option<Box<dyn Backend>>,
}

impl Compiler {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            backend: None,
        }
    }

    pub fn with_backend(pipeline: Pipeline, backend: Box<dyn Backend>) -> Self {
        Self {
            pipeline,
            backend: Some(backend),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Compiles a source file and emits host-language source text.
    pub fn transpile(
        &self,
        source: &str,
        file: &str,
        schema: Option<&MutationSchema>,
    ) -> Result<String, ToolError> {
        let checked = self.pipeline.compile(source, file)?;
        let backend = self
            .backend
            .as_ref()
            .ok_or(BuildError::NoBackend("transpile"))?;
        Ok(backend.generate(&checked, schema)?)
    }
}
