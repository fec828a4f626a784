mod helper;

mod eval;
mod formatting;
mod mutation;
mod tooling;
mod typecheck;
