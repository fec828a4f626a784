use crate::compiler::Pipeline;
use crate::diagnostics::CompileErrors;
use crate::runtime::{Interpreter, DEFAULT_STEP_LIMIT};
use serde::Serialize;

/// The playground's JSON envelope.
#[derive(Debug, Serialize)]
struct PlaygroundResult {
    output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Evaluates a source string for the embedded playground and returns the
/// result as a JSON string: `{"output": …}` or `{"output": …, "error": …}`.
///
/// No file I/O is permitted in this mode; `nab` imports fail at evaluation
/// time, and a step limit bounds untrusted programs.
pub fn run_source(source: &str) -> String {
    let checked = match Pipeline::new().compile(source, "playground.nyan") {
        Ok(checked) => checked,
        Err(CompileErrors::Parse(errors)) => {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            return render(PlaygroundResult {
                output: String::new(),
                error: Some(format!("Parse error:\n{joined}")),
            });
        }
        Err(CompileErrors::Type(errors)) => {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            return render(PlaygroundResult {
                output: String::new(),
                error: Some(format!("Type error:\n{joined}")),
            });
        }
    };

    let (mut interp, buffer) = Interpreter::with_capture();
    interp.set_type_info(checked.info);
    interp.set_step_limit(DEFAULT_STEP_LIMIT);
    let error = interp.run(&checked.program).err().map(|e| e.to_string());
    let output = buffer.borrow().clone();
    render(PlaygroundResult { output, error })
}

fn render(result: PlaygroundResult) -> String {
    serde_json::to_string(&result)
        .unwrap_or_else(|_| r#"{"output":"","error":"internal error: cannot encode result"}"#.into())
}
