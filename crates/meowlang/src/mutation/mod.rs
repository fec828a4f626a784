//! Mutation-testing engine: mutant enumeration over the AST, an indexed
//! schema for back-end super-binaries, and runners that kill mutants by
//! observing test exit status.

mod enumerate;
mod report;
mod runner;
mod schema;

pub use enumerate::{enumerate, enumerate_prefix};
pub use report::report;
pub use runner::Runner;
pub use schema::{build_schema, MutationEntry, MutationSchema};

use crate::ast::*;
use crate::diagnostics::Failure;
use crate::position::Position;
use crate::tokens::{Token, TokenKind};

/// Dense mutant identifier, also the value of `MEOW_MUTANT` selecting the
/// mutant inside a super-binary.
pub type MutantId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutantKind {
    ArithmeticSwap,
    ComparisonSwap,
    LogicalSwap,
    NegationRemoval,
    BoolFlip,
    IntBoundary,
    StringEmpty,
    ConditionNegate,
    ReturnNil,
    CatchRemove,
    PipeRemove,
}

/// A single, reversible AST edit.
///
/// Apply and undo locate their target by expression id and restore captured
/// originals, so `apply` followed by `undo` is an involution. The engine
/// never invokes apply and undo concurrently.
#[derive(Debug, Clone)]
pub struct Mutant {
    pub id: MutantId,
    pub description: String,
    pub pos: Position,
    pub kind: MutantKind,
    patch: Patch,
}

#[derive(Debug, Clone)]
enum Patch {
    OpSwap {
        target: ExprId,
        from: BinOp,
        to: BinOp,
    },
    BoolFlip {
        target: ExprId,
    },
    IntSet {
        target: ExprId,
        from: i64,
        to: i64,
    },
    StrSet {
        target: ExprId,
        from: String,
        to: String,
    },
    /// Drop a unary operator, leaving its operand in place.
    DropUnary {
        target: ExprId,
        operand: ExprId,
        original: Box<Expr>,
    },
    /// Wrap an if condition in `!`.
    NegateCondition {
        target: ExprId,
        wrapper: ExprId,
    },
    /// Replace a `bring` value with `catnap`.
    NilReturn {
        target: ExprId,
        nil_id: ExprId,
        original: Box<Expr>,
    },
    /// Replace a pipe/catch expression with its left child.
    KeepLeft {
        target: ExprId,
        left: ExprId,
        original: Box<Expr>,
    },
}

impl Mutant {
    /// The expression site this mutant edits (the key used by the schema).
    pub fn target(&self) -> ExprId {
        match &self.patch {
            Patch::OpSwap { target, .. }
            | Patch::BoolFlip { target }
            | Patch::IntSet { target, .. }
            | Patch::StrSet { target, .. }
            | Patch::DropUnary { target, .. }
            | Patch::NegateCondition { target, .. }
            | Patch::NilReturn { target, .. }
            | Patch::KeepLeft { target, .. } => *target,
        }
    }

    /// The expression id occupying the site while the mutant is applied.
    pub(crate) fn applied_site(&self) -> ExprId {
        match &self.patch {
            Patch::OpSwap { target, .. }
            | Patch::BoolFlip { target }
            | Patch::IntSet { target, .. }
            | Patch::StrSet { target, .. } => *target,
            Patch::DropUnary { operand, .. } => *operand,
            Patch::NegateCondition { wrapper, .. } => *wrapper,
            Patch::NilReturn { nil_id, .. } => *nil_id,
            Patch::KeepLeft { left, .. } => *left,
        }
    }

    pub fn apply(&self, program: &mut Program) -> Result<(), Failure> {
        match &self.patch {
            Patch::OpSwap { target, to, .. } => set_bin_op(program, *target, *to),
            Patch::BoolFlip { target } => flip_bool(program, *target),
            Patch::IntSet { target, to, .. } => set_int(program, *target, *to),
            Patch::StrSet { target, to, .. } => set_str(program, *target, to.clone()),
            Patch::DropUnary { target, .. } => replace_expr(program, *target, |old| match old {
                Expr::Unary(unary) => unary.right,
                other => other,
            }),
            Patch::NegateCondition { target, wrapper } => {
                let wrapper = *wrapper;
                replace_expr(program, *target, move |old| {
                    let token = Token::new(TokenKind::Not, "!", old.pos().clone());
                    Expr::Unary(Box::new(UnaryExpr {
                        id: wrapper,
                        token,
                        op: UnaryOp::Not,
                        right: old,
                    }))
                })
            }
            Patch::NilReturn { target, nil_id, .. } => {
                let nil_id = *nil_id;
                replace_expr(program, *target, move |old| {
                    let token = Token::new(TokenKind::Catnap, "catnap", old.pos().clone());
                    Expr::Nil(NilLit { id: nil_id, token })
                })
            }
            Patch::KeepLeft { target, .. } => replace_expr(program, *target, |old| match old {
                Expr::Pipe(pipe) => pipe.left,
                Expr::Catch(catch) => catch.left,
                other => other,
            }),
        }
    }

    pub fn undo(&self, program: &mut Program) -> Result<(), Failure> {
        match &self.patch {
            Patch::OpSwap { target, from, .. } => set_bin_op(program, *target, *from),
            Patch::BoolFlip { target } => flip_bool(program, *target),
            Patch::IntSet { target, from, .. } => set_int(program, *target, *from),
            Patch::StrSet { target, from, .. } => set_str(program, *target, from.clone()),
            Patch::DropUnary {
                operand, original, ..
            } => {
                let original = original.clone();
                replace_expr(program, *operand, move |_| *original)
            }
            Patch::NegateCondition { wrapper, .. } => {
                replace_expr(program, *wrapper, |old| match old {
                    Expr::Unary(unary) => unary.right,
                    other => other,
                })
            }
            Patch::NilReturn {
                nil_id, original, ..
            } => {
                let original = original.clone();
                replace_expr(program, *nil_id, move |_| *original)
            }
            Patch::KeepLeft { left, original, .. } => {
                let original = original.clone();
                replace_expr(program, *left, move |_| *original)
            }
        }
    }
}

/// The outcome of running tests against a single mutant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub id: MutantId,
    pub killed: bool,
}

// --- In-place AST editing, addressed by expression id ---

fn set_bin_op(program: &mut Program, id: ExprId, op: BinOp) -> Result<(), Failure> {
    edit_expr(program, id, &mut |expr| {
        if let Expr::Binary(binary) = expr {
            binary.op = op;
        }
    })
}

fn flip_bool(program: &mut Program, id: ExprId) -> Result<(), Failure> {
    edit_expr(program, id, &mut |expr| {
        if let Expr::Bool(lit) = expr {
            lit.value = !lit.value;
        }
    })
}

fn set_int(program: &mut Program, id: ExprId, value: i64) -> Result<(), Failure> {
    edit_expr(program, id, &mut |expr| {
        if let Expr::Int(lit) = expr {
            lit.value = value;
        }
    })
}

fn set_str(program: &mut Program, id: ExprId, value: String) -> Result<(), Failure> {
    let mut value = Some(value);
    edit_expr(program, id, &mut |expr| {
        if let Expr::Str(lit) = expr {
            if let Some(v) = value.take() {
                lit.value = v;
            }
        }
    })
}

fn replace_expr(
    program: &mut Program,
    id: ExprId,
    build: impl FnOnce(Expr) -> Expr,
) -> Result<(), Failure> {
    let mut build = Some(build);
    edit_expr(program, id, &mut |expr| {
        if let Some(build) = build.take() {
            let placeholder = Expr::Nil(NilLit {
                id: ExprId(u32::MAX),
                token: Token::new(TokenKind::Catnap, "catnap", Position::default()),
            });
            let old = std::mem::replace(expr, placeholder);
            *expr = build(old);
        }
    })
}

/// Applies `edit` to the expression with the given id, searching the whole
/// program. Errors when the site has vanished, which would indicate a
/// broken apply/undo pairing.
fn edit_expr(
    program: &mut Program,
    id: ExprId,
    edit: &mut dyn FnMut(&mut Expr),
) -> Result<(), Failure> {
    for stmt in &mut program.stmts {
        if edit_in_stmt(stmt, id, edit) {
            return Ok(());
        }
    }
    Err(Failure::internal(format!(
        "mutation target {id} not found in program"
    )))
}

fn edit_in_stmt(stmt: &mut Stmt, id: ExprId, edit: &mut dyn FnMut(&mut Expr)) -> bool {
    match stmt {
        Stmt::Var(s) => edit_in_expr(&mut s.value, id, edit),
        Stmt::Func(s) => s.body.iter_mut().any(|s| edit_in_stmt(s, id, edit)),
        Stmt::Return(s) => s
            .value
            .as_mut()
            .is_some_and(|v| edit_in_expr(v, id, edit)),
        Stmt::If(s) => {
            edit_in_expr(&mut s.condition, id, edit)
                || s.body.iter_mut().any(|s| edit_in_stmt(s, id, edit))
                || s.else_body.iter_mut().any(|s| edit_in_stmt(s, id, edit))
        }
        Stmt::Range(s) => {
            s.start
                .as_mut()
                .is_some_and(|v| edit_in_expr(v, id, edit))
                || edit_in_expr(&mut s.end, id, edit)
                || s.body.iter_mut().any(|s| edit_in_stmt(s, id, edit))
        }
        Stmt::Expr(s) => edit_in_expr(&mut s.expr, id, edit),
        Stmt::Learn(s) => s
            .methods
            .iter_mut()
            .any(|m| m.body.iter_mut().any(|s| edit_in_stmt(s, id, edit))),
        Stmt::Fetch(_) | Stmt::Kitty(_) | Stmt::Breed(_) | Stmt::Collar(_) | Stmt::Trick(_) => {
            false
        }
    }
}

fn edit_in_expr(expr: &mut Expr, id: ExprId, edit: &mut dyn FnMut(&mut Expr)) -> bool {
    if expr.id() == id {
        edit(expr);
        return true;
    }
    match expr {
        Expr::Int(_)
        | Expr::Float(_)
        | Expr::Str(_)
        | Expr::Bool(_)
        | Expr::Nil(_)
        | Expr::Ident(_)
        | Expr::SelfRef(_) => false,
        Expr::Member(e) => edit_in_expr(&mut e.object, id, edit),
        Expr::Unary(e) => edit_in_expr(&mut e.right, id, edit),
        Expr::Binary(e) => {
            edit_in_expr(&mut e.left, id, edit) || edit_in_expr(&mut e.right, id, edit)
        }
        Expr::Pipe(e) => {
            edit_in_expr(&mut e.left, id, edit) || edit_in_expr(&mut e.right, id, edit)
        }
        Expr::Catch(e) => {
            edit_in_expr(&mut e.left, id, edit) || edit_in_expr(&mut e.right, id, edit)
        }
        Expr::Index(e) => {
            edit_in_expr(&mut e.left, id, edit) || edit_in_expr(&mut e.index, id, edit)
        }
        Expr::List(e) => e.items.iter_mut().any(|item| edit_in_expr(item, id, edit)),
        Expr::Map(e) => {
            e.keys.iter_mut().any(|k| edit_in_expr(k, id, edit))
                || e.values.iter_mut().any(|v| edit_in_expr(v, id, edit))
        }
        Expr::Call(e) => {
            edit_in_expr(&mut e.func, id, edit)
                || e.args.iter_mut().any(|a| edit_in_expr(a, id, edit))
        }
        Expr::Lambda(e) => edit_in_expr(&mut e.body, id, edit),
        Expr::Match(e) => {
            if edit_in_expr(&mut e.subject, id, edit) {
                return true;
            }
            for arm in &mut e.arms {
                let hit = match &mut arm.pattern {
                    Pattern::Literal(p) => edit_in_expr(&mut p.value, id, edit),
                    Pattern::Range(p) => {
                        edit_in_expr(&mut p.low, id, edit) || edit_in_expr(&mut p.high, id, edit)
                    }
                    Pattern::Wildcard(_) => false,
                };
                if hit || edit_in_expr(&mut arm.body, id, edit) {
                    return true;
                }
            }
            false
        }
    }
}

/// Looks up the expression with the given id (used by the schema builder to
/// snapshot applied replacements).
pub(crate) fn find_expr(program: &Program, id: ExprId) -> Option<Expr> {
    use crate::ast::{preorder, Node};
    for node in preorder(program) {
        if let Node::Expr(expr) = node {
            if expr.id() == id {
                return Some(expr.clone());
            }
        }
    }
    None
}
