use crate::ast::*;
use crate::mutation::{Mutant, MutantKind, Patch};

/// Walks the program and returns all possible mutants, with dense ids.
pub fn enumerate(program: &Program) -> Vec<Mutant> {
    enumerate_prefix(program, program.stmts.len())
}

/// Enumerates mutants over the first `stmt_count` top-level statements
/// only. The interpreter-backed mutation driver appends test statements
/// after the source program and must not mutate them.
pub fn enumerate_prefix(program: &Program, stmt_count: usize) -> Vec<Mutant> {
    let mut e = Enumerator {
        mutants: Vec::new(),
        next_synthetic: program.expr_count,
    };
    for stmt in program.stmts.iter().take(stmt_count) {
        e.enum_stmt(stmt);
    }
    e.mutants
}

struct Enumerator {
    mutants: Vec<Mutant>,
    next_synthetic: u32,
}

impl Enumerator {
    fn add(&mut self, description: String, pos: &crate::position::Position, kind: MutantKind, patch: Patch) {
        self.mutants.push(Mutant {
            id: self.mutants.len(),
            description,
            pos: pos.clone(),
            kind,
            patch,
        });
    }

    fn synthetic_id(&mut self) -> ExprId {
        let id = ExprId(self.next_synthetic);
        self.next_synthetic += 1;
        id
    }

    fn enum_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Func(s) => {
                for body_stmt in &s.body {
                    self.enum_stmt(body_stmt);
                }
            }
            Stmt::If(s) => {
                self.enum_expr(&s.condition);
                let wrapper = self.synthetic_id();
                self.add(
                    format!("negate if condition at {}", s.token.pos),
                    &s.token.pos,
                    MutantKind::ConditionNegate,
                    Patch::NegateCondition {
                        target: s.condition.id(),
                        wrapper,
                    },
                );
                for body_stmt in &s.body {
                    self.enum_stmt(body_stmt);
                }
                for body_stmt in &s.else_body {
                    self.enum_stmt(body_stmt);
                }
            }
            Stmt::Range(s) => {
                if let Some(start) = &s.start {
                    self.enum_expr(start);
                }
                self.enum_expr(&s.end);
                for body_stmt in &s.body {
                    self.enum_stmt(body_stmt);
                }
            }
            Stmt::Return(s) => {
                if let Some(value) = &s.value {
                    let nil_id = self.synthetic_id();
                    self.add(
                        format!("replace return with nil at {}", s.token.pos),
                        &s.token.pos,
                        MutantKind::ReturnNil,
                        Patch::NilReturn {
                            target: value.id(),
                            nil_id,
                            original: Box::new(value.clone()),
                        },
                    );
                    self.enum_expr(value);
                }
            }
            Stmt::Var(s) => self.enum_expr(&s.value),
            Stmt::Expr(s) => self.enum_expr(&s.expr),
            Stmt::Learn(s) => {
                for method in &s.methods {
                    for body_stmt in &method.body {
                        self.enum_stmt(body_stmt);
                    }
                }
            }
            Stmt::Fetch(_) | Stmt::Kitty(_) | Stmt::Breed(_) | Stmt::Collar(_) | Stmt::Trick(_) => {
            }
        }
    }

    fn enum_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Binary(e) => {
                self.enum_binary(e);
                self.enum_expr(&e.left);
                self.enum_expr(&e.right);
            }
            Expr::Unary(e) => {
                self.enum_unary(e);
                self.enum_expr(&e.right);
            }
            Expr::Bool(e) => {
                self.add(
                    format!("flip bool {}→{} at {}", e.value, !e.value, e.token.pos),
                    &e.token.pos,
                    MutantKind::BoolFlip,
                    Patch::BoolFlip { target: e.id },
                );
            }
            Expr::Int(e) => {
                let (description, to) = if e.value == 0 {
                    (format!("int 0→1 at {}", e.token.pos), 1)
                } else {
                    (format!("int {}→0 at {}", e.value, e.token.pos), 0)
                };
                self.add(
                    description,
                    &e.token.pos,
                    MutantKind::IntBoundary,
                    Patch::IntSet {
                        target: e.id,
                        from: e.value,
                        to,
                    },
                );
            }
            Expr::Str(e) => {
                let (description, to) = if e.value.is_empty() {
                    (
                        format!("string \"\"→\"mutant\" at {}", e.token.pos),
                        "mutant".to_owned(),
                    )
                } else {
                    (
                        format!("string {:?}→\"\" at {}", e.value, e.token.pos),
                        String::new(),
                    )
                };
                self.add(
                    description,
                    &e.token.pos,
                    MutantKind::StringEmpty,
                    Patch::StrSet {
                        target: e.id,
                        from: e.value.clone(),
                        to,
                    },
                );
            }
            Expr::Call(e) => {
                for arg in &e.args {
                    self.enum_expr(arg);
                }
            }
            Expr::Lambda(e) => self.enum_expr(&e.body),
            Expr::List(e) => {
                for item in &e.items {
                    self.enum_expr(item);
                }
            }
            Expr::Index(e) => {
                self.enum_expr(&e.left);
                self.enum_expr(&e.index);
            }
            Expr::Pipe(e) => {
                self.add(
                    format!("remove pipe at {}", e.token.pos),
                    &e.token.pos,
                    MutantKind::PipeRemove,
                    Patch::KeepLeft {
                        target: e.id,
                        left: e.left.id(),
                        original: Box::new(Expr::Pipe(e.clone())),
                    },
                );
                self.enum_expr(&e.left);
                self.enum_expr(&e.right);
            }
            Expr::Catch(e) => {
                self.add(
                    format!("remove catch at {}", e.token.pos),
                    &e.token.pos,
                    MutantKind::CatchRemove,
                    Patch::KeepLeft {
                        target: e.id,
                        left: e.left.id(),
                        original: Box::new(Expr::Catch(e.clone())),
                    },
                );
                self.enum_expr(&e.left);
                self.enum_expr(&e.right);
            }
            Expr::Map(e) => {
                for value in &e.values {
                    self.enum_expr(value);
                }
            }
            Expr::Match(e) => {
                self.enum_expr(&e.subject);
                for arm in &e.arms {
                    self.enum_expr(&arm.body);
                }
            }
            Expr::Float(_) | Expr::Nil(_) | Expr::Ident(_) | Expr::SelfRef(_) | Expr::Member(_) => {
            }
        }
    }

    fn enum_binary(&mut self, e: &BinaryExpr) {
        let swaps = [
            (e.op.arithmetic_swap(), MutantKind::ArithmeticSwap),
            (e.op.comparison_swap(), MutantKind::ComparisonSwap),
            (e.op.logical_swap(), MutantKind::LogicalSwap),
        ];
        for (swapped, kind) in swaps {
            if let Some(to) = swapped {
                self.add(
                    format!("swap {}→{} at {}", e.op, to, e.token.pos),
                    &e.token.pos,
                    kind,
                    Patch::OpSwap {
                        target: e.id,
                        from: e.op,
                        to,
                    },
                );
            }
        }
    }

    fn enum_unary(&mut self, e: &UnaryExpr) {
        self.add(
            format!("remove {} at {}", e.op, e.token.pos),
            &e.token.pos,
            MutantKind::NegationRemoval,
            Patch::DropUnary {
                target: e.id,
                operand: e.right.id(),
                original: Box::new(Expr::Unary(Box::new(e.clone()))),
            },
        );
    }
}
