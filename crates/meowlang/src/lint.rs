use crate::ast::*;
use crate::position::Position;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single lint finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub pos: Position,
    pub severity: Severity,
    pub rule: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}[{}]: {}",
            self.pos, self.severity, self.rule, self.message
        )
    }
}

/// A static-analysis rule.
pub trait Rule {
    fn name(&self) -> &'static str;
    fn check(&self, program: &Program, report: &mut dyn FnMut(Diagnostic));
}

/// Runs a set of rules over a program.
pub struct Linter {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for Linter {
    fn default() -> Self {
        Self::new()
    }
}

impl Linter {
    /// A linter with all built-in rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(SnakeCaseRule),
                Box::new(UnusedVarRule),
                Box::new(UnreachableCodeRule),
                Box::new(EmptyBlockRule),
            ],
        }
    }

    /// Runs every rule and returns diagnostics sorted by position, then
    /// rule name.
    pub fn lint(&self, program: &Program) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for rule in &self.rules {
            rule.check(program, &mut |d| diagnostics.push(d));
        }
        diagnostics.sort_by(|a, b| {
            a.pos
                .line
                .cmp(&b.pos.line)
                .then(a.pos.column.cmp(&b.pos.column))
                .then(a.rule.cmp(b.rule))
        });
        diagnostics
    }
}

// --- snake-case ---

/// Identifiers must use snake_case.
pub struct SnakeCaseRule;

impl Rule for SnakeCaseRule {
    fn name(&self) -> &'static str {
        "snake-case"
    }

    fn check(&self, program: &Program, report: &mut dyn FnMut(Diagnostic)) {
        for node in preorder(program) {
            match node {
                Node::Stmt(Stmt::Var(s)) => {
                    if !is_snake_case(&s.name) {
                        report(Diagnostic {
                            pos: s.token.pos.clone(),
                            severity: Severity::Warning,
                            rule: self.name(),
                            message: format!("variable name \"{}\" should be snake_case", s.name),
                        });
                    }
                }
                Node::Stmt(Stmt::Func(s)) => {
                    if !is_snake_case(&s.name) {
                        report(Diagnostic {
                            pos: s.token.pos.clone(),
                            severity: Severity::Warning,
                            rule: self.name(),
                            message: format!("function name \"{}\" should be snake_case", s.name),
                        });
                    }
                    check_params(&s.params, &s.token.pos, self.name(), report);
                }
                Node::Expr(Expr::Lambda(e)) => {
                    check_params(&e.params, &e.token.pos, self.name(), report);
                }
                _ => {}
            }
        }
    }
}

fn check_params(
    params: &[Param],
    pos: &Position,
    rule: &'static str,
    report: &mut dyn FnMut(Diagnostic),
) {
    for param in params {
        if param.name == "_" {
            continue;
        }
        if !is_snake_case(&param.name) {
            report(Diagnostic {
                pos: pos.clone(),
                severity: Severity::Warning,
                rule,
                message: format!("parameter name \"{}\" should be snake_case", param.name),
            });
        }
    }
}

/// Matches `[a-z_][a-z0-9_]*`.
fn is_snake_case(name: &str) -> bool {
    if name == "_" {
        return true;
    }
    if name.is_empty() {
        return false;
    }
    for (i, c) in name.chars().enumerate() {
        match c {
            'a'..='z' | '_' => {}
            '0'..='9' if i > 0 => {}
            _ => return false,
        }
    }
    true
}

// --- unused-var ---

/// Declared variables must be used.
pub struct UnusedVarRule;

struct VarEntry {
    pos: Position,
    name: SmolStr,
    used: bool,
}

struct UnusedChecker<'a> {
    rule: &'static str,
    report: &'a mut dyn FnMut(Diagnostic),
    scopes: Vec<HashMap<SmolStr, VarEntry>>,
}

impl Rule for UnusedVarRule {
    fn name(&self) -> &'static str {
        "unused-var"
    }

    fn check(&self, program: &Program, report: &mut dyn FnMut(Diagnostic)) {
        let mut checker = UnusedChecker {
            rule: self.name(),
            report,
            scopes: vec![HashMap::new()],
        };
        // Top-level function names count as used: they are entry points.
        for stmt in &program.stmts {
            if let Stmt::Func(s) = stmt {
                checker.define(&s.name, &s.token.pos);
                checker.mark_used(&s.name);
            }
        }
        for stmt in &program.stmts {
            checker.check_stmt(stmt);
        }
        checker.report_unused();
        checker.scopes.pop();
    }
}

impl UnusedChecker<'_> {
    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.report_unused();
        self.scopes.pop();
    }

    fn define(&mut self, name: &SmolStr, pos: &Position) {
        let rule = self.rule;
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(prev) = scope.get(name) {
                if !prev.used && prev.name != "_" {
                    (self.report)(Diagnostic {
                        pos: prev.pos.clone(),
                        severity: Severity::Warning,
                        rule,
                        message: format!("variable \"{}\" is declared but never used", prev.name),
                    });
                }
            }
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.clone(),
                VarEntry {
                    pos: pos.clone(),
                    name: name.clone(),
                    used: false,
                },
            );
        }
    }

    fn mark_used(&mut self, name: &str) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(entry) = scope.get_mut(name) {
                entry.used = true;
                return;
            }
        }
    }

    fn report_unused(&mut self) {
        let rule = self.rule;
        if let Some(scope) = self.scopes.last() {
            let mut entries: Vec<&VarEntry> = scope.values().collect();
            entries.sort_by(|a, b| {
                (a.pos.line, a.pos.column, &a.name).cmp(&(b.pos.line, b.pos.column, &b.name))
            });
            let unused: Vec<Diagnostic> = entries
                .iter()
                .filter(|e| !e.used && e.name != "_")
                .map(|e| Diagnostic {
                    pos: e.pos.clone(),
                    severity: Severity::Warning,
                    rule,
                    message: format!("variable \"{}\" is declared but never used", e.name),
                })
                .collect();
            for d in unused {
                (self.report)(d);
            }
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(s) => {
                self.check_expr(&s.value);
                self.define(&s.name, &s.token.pos);
            }
            Stmt::Func(s) => {
                self.push_scope();
                // Parameters are provided by callers; never flagged.
                for param in &s.params {
                    self.define(&param.name, &s.token.pos);
                    self.mark_used(&param.name);
                }
                for body_stmt in &s.body {
                    self.check_stmt(body_stmt);
                }
                self.pop_scope();
            }
            Stmt::If(s) => {
                self.check_expr(&s.condition);
                self.push_scope();
                for body_stmt in &s.body {
                    self.check_stmt(body_stmt);
                }
                self.pop_scope();
                if !s.else_body.is_empty() {
                    self.push_scope();
                    for body_stmt in &s.else_body {
                        self.check_stmt(body_stmt);
                    }
                    self.pop_scope();
                }
            }
            Stmt::Range(s) => {
                if let Some(start) = &s.start {
                    self.check_expr(start);
                }
                self.check_expr(&s.end);
                self.push_scope();
                self.define(&s.var, &s.token.pos);
                self.mark_used(&s.var);
                for body_stmt in &s.body {
                    self.check_stmt(body_stmt);
                }
                self.pop_scope();
            }
            Stmt::Return(s) => {
                if let Some(value) = &s.value {
                    self.check_expr(value);
                }
            }
            Stmt::Expr(s) => self.check_expr(&s.expr),
            Stmt::Learn(s) => {
                for method in &s.methods {
                    self.push_scope();
                    for param in &method.params {
                        self.define(&param.name, &method.token.pos);
                        self.mark_used(&param.name);
                    }
                    for body_stmt in &method.body {
                        self.check_stmt(body_stmt);
                    }
                    self.pop_scope();
                }
            }
            Stmt::Fetch(_) | Stmt::Kitty(_) | Stmt::Breed(_) | Stmt::Collar(_) | Stmt::Trick(_) => {
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(e) => self.mark_used(&e.name),
            Expr::Unary(e) => self.check_expr(&e.right),
            Expr::Binary(e) => {
                self.check_expr(&e.left);
                self.check_expr(&e.right);
            }
            Expr::Call(e) => {
                self.check_expr(&e.func);
                for arg in &e.args {
                    self.check_expr(arg);
                }
            }
            Expr::Lambda(e) => {
                self.push_scope();
                for param in &e.params {
                    self.define(&param.name, &e.token.pos);
                    self.mark_used(&param.name);
                }
                self.check_expr(&e.body);
                self.pop_scope();
            }
            Expr::List(e) => {
                for item in &e.items {
                    self.check_expr(item);
                }
            }
            Expr::Index(e) => {
                self.check_expr(&e.left);
                self.check_expr(&e.index);
            }
            Expr::Pipe(e) => {
                self.check_expr(&e.left);
                self.check_expr(&e.right);
            }
            Expr::Catch(e) => {
                self.check_expr(&e.left);
                self.check_expr(&e.right);
            }
            Expr::Match(e) => {
                self.check_expr(&e.subject);
                for arm in &e.arms {
                    self.check_expr(&arm.body);
                }
            }
            Expr::Member(e) => self.check_expr(&e.object),
            Expr::Map(e) => {
                for key in &e.keys {
                    self.check_expr(key);
                }
                for value in &e.values {
                    self.check_expr(value);
                }
            }
            Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Nil(_)
            | Expr::SelfRef(_) => {}
        }
    }
}

// --- unreachable-code ---

/// Statements after a `bring` in the same block are unreachable.
pub struct UnreachableCodeRule;

impl Rule for UnreachableCodeRule {
    fn name(&self) -> &'static str {
        "unreachable-code"
    }

    fn check(&self, program: &Program, report: &mut dyn FnMut(Diagnostic)) {
        for stmt in &program.stmts {
            self.check_stmt(stmt, report);
        }
    }
}

impl UnreachableCodeRule {
    fn check_stmt(&self, stmt: &Stmt, report: &mut dyn FnMut(Diagnostic)) {
        match stmt {
            Stmt::Func(s) => self.check_block(&s.body, report),
            Stmt::If(s) => {
                self.check_block(&s.body, report);
                if !s.else_body.is_empty() {
                    self.check_block(&s.else_body, report);
                }
            }
            Stmt::Range(s) => self.check_block(&s.body, report),
            Stmt::Learn(s) => {
                for method in &s.methods {
                    self.check_block(&method.body, report);
                }
            }
            _ => {}
        }
    }

    fn check_block(&self, stmts: &[Stmt], report: &mut dyn FnMut(Diagnostic)) {
        let mut found_return = false;
        for stmt in stmts {
            if found_return {
                report(Diagnostic {
                    pos: stmt.pos().clone(),
                    severity: Severity::Warning,
                    rule: self.name(),
                    message: "unreachable code after bring".to_owned(),
                });
                // Only the first unreachable statement is reported.
                return;
            }
            if matches!(stmt, Stmt::Return(_)) {
                found_return = true;
            }
            self.check_stmt(stmt, report);
        }
    }
}

// --- empty-block ---

/// Function, if, and loop bodies must not be empty.
pub struct EmptyBlockRule;

impl Rule for EmptyBlockRule {
    fn name(&self) -> &'static str {
        "empty-block"
    }

    fn check(&self, program: &Program, report: &mut dyn FnMut(Diagnostic)) {
        for node in preorder(program) {
            let Node::Stmt(stmt) = node else { continue };
            match stmt {
                Stmt::Func(s) if s.body.is_empty() => report(Diagnostic {
                    pos: s.token.pos.clone(),
                    severity: Severity::Warning,
                    rule: self.name(),
                    message: format!("function \"{}\" has an empty body", s.name),
                }),
                Stmt::If(s) if s.body.is_empty() => report(Diagnostic {
                    pos: s.token.pos.clone(),
                    severity: Severity::Warning,
                    rule: self.name(),
                    // An omitted else is normal; only the sniff body is
                    // checked.
                    message: "sniff block has an empty body".to_owned(),
                }),
                Stmt::Range(s) if s.body.is_empty() => report(Diagnostic {
                    pos: s.token.pos.clone(),
                    severity: Severity::Warning,
                    rule: self.name(),
                    message: "purr loop has an empty body".to_owned(),
                }),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser;

    fn lint(source: &str) -> Vec<Diagnostic> {
        let (program, errors) = parser::parse(Lexer::new(source, "lint.nyan"));
        assert!(errors.is_empty(), "{errors:?}");
        Linter::new().lint(&program)
    }

    fn rules(source: &str) -> Vec<&'static str> {
        lint(source).into_iter().map(|d| d.rule).collect()
    }

    #[test]
    fn flags_camel_case_names() {
        let diags = lint("nyan catName = 1\nnya(catName)");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, "snake-case");
        assert!(diags[0].message.contains("catName"));
    }

    #[test]
    fn flags_unused_variables() {
        let got = rules("nyan unused = 1");
        assert_eq!(got, vec!["unused-var"]);
        assert!(rules("nyan used = 1\nnya(used)").is_empty());
    }

    #[test]
    fn underscore_is_exempt_everywhere() {
        assert!(rules("nyan _ = 1").is_empty());
    }

    #[test]
    fn flags_unreachable_code() {
        let got = rules("meow f() int {\n  bring 1\n  nya(2)\n}");
        assert!(got.contains(&"unreachable-code"));
    }

    #[test]
    fn flags_empty_blocks() {
        let got = rules("meow nothing() {\n}");
        assert!(got.contains(&"empty-block"));
        let got = rules("sniff (yarn) {\n}");
        assert!(got.contains(&"empty-block"));
        let got = rules("purr i (3) {\n}");
        assert!(got.contains(&"empty-block"));
    }

    #[test]
    fn diagnostics_are_sorted_and_rendered() {
        let diags = lint("nyan BadName = 1");
        // Shadowed rules at the same position sort by rule name.
        assert!(diags.windows(2).all(|w| {
            (w[0].pos.line, w[0].pos.column, w[0].rule)
                <= (w[1].pos.line, w[1].pos.column, w[1].rule)
        }));
        let rendered = diags[0].to_string();
        assert!(rendered.starts_with("lint.nyan:1:1: warning["), "{rendered}");
    }

    #[test]
    fn loop_variable_counts_as_used() {
        assert!(rules("purr i (3) {\n  nya(1)\n}").is_empty());
    }
}
