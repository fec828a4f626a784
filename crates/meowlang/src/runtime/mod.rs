//! The tree-walking evaluation substrate: runtime values, operators, the
//! environment chain, the `learn` method registry, and the interpreter
//! itself. Used by the playground and by the test harness.

pub mod builtins;
pub mod env;
pub mod methods;
pub mod operators;
pub mod value;

use crate::ast::*;
use crate::coverage::Coverage;
use crate::diagnostics::Failure;
use crate::typeck::TypeInfo;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub use env::Environment;
pub use value::{FuncBody, FuncValue, Furball, KittyValue, Value};

/// Default evaluation step limit, matching the playground bound.
pub const DEFAULT_STEP_LIMIT: u64 = 10_000_000;

// The step limit bounds run time; this bounds the host stack against
// runaway recursion, which a tree-walker cannot survive long enough to
// reach the step limit.
const MAX_CALL_DEPTH: usize = 1_000;

/// Statement-level control flow: either fall through or unwind the current
/// function frame with a value. Only the enclosing call handler consumes
/// `Return`.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// A test outcome recorded by the `run` test builtin.
#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub name: String,
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    Capture(Rc<RefCell<String>>),
}

/// Walks the AST directly against the runtime value model.
///
/// `run` first registers top-level declarations (kitty/collar definitions,
/// functions, `learn` methods), then executes the remaining top-level
/// statements in source order. A step counter bounds untrusted runs.
pub struct Interpreter {
    globals: Environment,
    kitty_defs: HashMap<SmolStr, Vec<SmolStr>>,
    collar_defs: HashSet<SmolStr>,
    methods: methods::MethodRegistry,
    type_info: Option<TypeInfo>,
    out: Sink,
    steps: u64,
    step_limit: u64,
    depth: usize,
    coverage: Option<Rc<RefCell<Coverage>>>,
    test_records: Option<Rc<RefCell<Vec<TestRecord>>>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter writing `nya` output to stdout.
    pub fn new() -> Self {
        Self::with_sink(Sink::Stdout)
    }

    /// Creates an interpreter that captures output into a shared buffer.
    pub fn with_capture() -> (Self, Rc<RefCell<String>>) {
        let buffer = Rc::new(RefCell::new(String::new()));
        let interp = Self::with_sink(Sink::Capture(buffer.clone()));
        (interp, buffer)
    }

    fn with_sink(out: Sink) -> Self {
        Self {
            globals: Environment::new(),
            kitty_defs: HashMap::new(),
            collar_defs: HashSet::new(),
            methods: methods::MethodRegistry::default(),
            type_info: None,
            out,
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
            depth: 0,
            coverage: None,
            test_records: None,
        }
    }

    /// Attaches checker output (optional; evaluation does not depend on it).
    pub fn set_type_info(&mut self, info: TypeInfo) {
        self.type_info = Some(info);
    }

    pub fn type_info(&self) -> Option<&TypeInfo> {
        self.type_info.as_ref()
    }

    /// Sets the maximum number of evaluation steps.
    pub fn set_step_limit(&mut self, limit: u64) {
        self.step_limit = limit;
    }

    /// Attaches a statement-coverage tracker.
    pub fn set_coverage(&mut self, coverage: Rc<RefCell<Coverage>>) {
        self.coverage = Some(coverage);
    }

    /// Resets the step counter; the fuzz driver calls this between inputs
    /// so the limit bounds each invocation rather than the whole session.
    pub fn reset_steps(&mut self) {
        self.steps = 0;
        self.depth = 0;
    }

    /// Looks up a top-level binding after a run.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).ok()
    }

    /// Calls a callable value with the given arguments.
    pub fn call(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, Failure> {
        self.call_value(callee, args)
    }

    /// Enables the `run`/`judge`/`expect`/`refuse` test builtins and
    /// returns the shared record list the harness reads back.
    pub fn enable_test_builtins(&mut self) -> Rc<RefCell<Vec<TestRecord>>> {
        let records = Rc::new(RefCell::new(Vec::new()));
        self.test_records = Some(records.clone());
        records
    }

    /// Executes the program.
    pub fn run(&mut self, program: &Program) -> Result<(), Failure> {
        // The method registry is rebuilt on every run so evaluations never
        // leak methods into each other.
        self.methods.clear();
        self.kitty_defs.clear();
        self.collar_defs.clear();
        self.steps = 0;
        self.depth = 0;

        // Pass 1: collect declarations.
        for stmt in &program.stmts {
            match stmt {
                Stmt::Kitty(s) => {
                    let fields = s.fields.iter().map(|f| f.name.clone()).collect();
                    self.kitty_defs.insert(s.name.clone(), fields);
                }
                Stmt::Collar(s) => {
                    self.collar_defs.insert(s.name.clone());
                }
                Stmt::Func(s) => self.register_func(s, &self.globals.clone()),
                Stmt::Learn(s) => self.register_learn_methods(s),
                Stmt::Breed(_) | Stmt::Trick(_) => {}
                _ => {}
            }
        }

        // Pass 2: execute non-declaration top-level statements.
        for stmt in &program.stmts {
            match stmt {
                Stmt::Kitty(_)
                | Stmt::Collar(_)
                | Stmt::Func(_)
                | Stmt::Learn(_)
                | Stmt::Breed(_)
                | Stmt::Trick(_) => continue,
                _ => {}
            }
            self.exec_stmt(stmt, &self.globals.clone())?;
        }
        Ok(())
    }

    fn check_step(&mut self) -> Result<(), Failure> {
        self.steps += 1;
        if self.steps > self.step_limit {
            return Err(Failure::StepLimit {
                limit: self.step_limit,
            });
        }
        Ok(())
    }

    fn write_output(&mut self, text: &str) {
        match &self.out {
            Sink::Stdout => print!("{text}"),
            Sink::Capture(buffer) => buffer.borrow_mut().push_str(text),
        }
    }

    // --- Declarations ---

    fn register_func(&mut self, fn_stmt: &FuncStmt, env: &Environment) {
        let func = FuncValue {
            name: fn_stmt.name.clone(),
            params: fn_stmt.params.clone(),
            body: FuncBody::Block(Rc::new(fn_stmt.body.clone())),
            env: env.clone(),
        };
        env.define(fn_stmt.name.clone(), Value::Func(Rc::new(func)));
    }

    fn register_learn_methods(&mut self, learn: &LearnStmt) {
        for method in &learn.methods {
            self.methods.register(
                learn.type_name.clone(),
                methods::MethodDef {
                    name: method.name.clone(),
                    params: method.params.clone(),
                    body: Rc::new(method.body.clone()),
                },
            );
        }
    }

    // --- Statement execution ---

    fn exec_stmt(&mut self, stmt: &Stmt, env: &Environment) -> Result<Flow, Failure> {
        self.check_step()?;
        if let Some(coverage) = &self.coverage {
            coverage.borrow_mut().hit(stmt.pos());
        }
        match stmt {
            Stmt::Var(s) => {
                let value = self.eval_expr(&s.value, env)?;
                env.define(s.name.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::Expr(s) => {
                self.eval_expr(&s.expr, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(s) => {
                let value = match &s.value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If(s) => self.exec_if(s, env),
            Stmt::Range(s) => self.exec_range(s, env),
            Stmt::Func(s) => {
                // Nested function definition.
                self.register_func(s, env);
                Ok(Flow::Normal)
            }
            Stmt::Fetch(s) => Err(Failure::hiss(format!(
                "nab {:?} is not supported in the playground",
                s.path
            ))),
            // Type-level declarations were handled in the first pass.
            Stmt::Kitty(_) | Stmt::Collar(_) | Stmt::Breed(_) | Stmt::Trick(_) | Stmt::Learn(_) => {
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &Environment) -> Result<Flow, Failure> {
        for stmt in stmts {
            if let Flow::Return(value) = self.exec_stmt(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_if(&mut self, s: &IfStmt, env: &Environment) -> Result<Flow, Failure> {
        let cond = self.eval_expr(&s.condition, env)?;
        if cond.is_truthy() {
            self.exec_block(&s.body, &env.child())
        } else if !s.else_body.is_empty() {
            self.exec_block(&s.else_body, &env.child())
        } else {
            Ok(Flow::Normal)
        }
    }

    fn exec_range(&mut self, s: &RangeStmt, env: &Environment) -> Result<Flow, Failure> {
        let start = match &s.start {
            Some(expr) => as_int(&self.eval_expr(expr, env)?)?,
            None => 0,
        };
        let end = as_int(&self.eval_expr(&s.end, env)?)?;
        let last = if s.inclusive { end } else { end - 1 };

        let mut i = start;
        while i <= last {
            self.check_step()?;
            // A fresh child scope per iteration keeps the loop variable from
            // leaking.
            let child = env.child();
            child.define(s.var.clone(), Value::Int(i));
            if let Flow::Return(value) = self.exec_block(&s.body, &child)? {
                return Ok(Flow::Return(value));
            }
            i += 1;
        }
        Ok(Flow::Normal)
    }

    // --- Expression evaluation ---

    fn eval_expr(&mut self, expr: &Expr, env: &Environment) -> Result<Value, Failure> {
        self.check_step()?;
        match expr {
            Expr::Int(e) => Ok(Value::Int(e.value)),
            Expr::Float(e) => Ok(Value::Float(e.value)),
            Expr::Str(e) => Ok(Value::Str(e.value.clone())),
            Expr::Bool(e) => Ok(Value::Bool(e.value)),
            Expr::Nil(_) => Ok(Value::Nil),
            Expr::Ident(e) => env.get(&e.name),
            Expr::SelfRef(_) => env.get("self"),
            Expr::Unary(e) => self.eval_unary(e, env),
            Expr::Binary(e) => self.eval_binary(e, env),
            Expr::Call(e) => self.eval_call(e, env),
            Expr::Lambda(e) => Ok(Value::Func(Rc::new(FuncValue {
                name: SmolStr::new_static("lambda"),
                params: e.params.clone(),
                body: FuncBody::Expr(Rc::new(e.body.clone())),
                env: env.clone(),
            }))),
            Expr::List(e) => {
                let mut items = Vec::with_capacity(e.items.len());
                for item in &e.items {
                    items.push(self.eval_expr(item, env)?);
                }
                Ok(Value::list(items))
            }
            Expr::Map(e) => {
                let mut entries = Vec::with_capacity(e.keys.len());
                for (key_expr, value_expr) in e.keys.iter().zip(&e.values) {
                    let key = self.eval_expr(key_expr, env)?;
                    let value = self.eval_expr(value_expr, env)?;
                    entries.push((as_string(&key)?, value));
                }
                Ok(Value::map(entries))
            }
            Expr::Index(e) => self.eval_index(e, env),
            Expr::Member(e) => self.eval_member(e, env),
            Expr::Pipe(e) => self.eval_pipe(e, env),
            Expr::Catch(e) => self.eval_catch(e, env),
            Expr::Match(e) => self.eval_match(e, env),
        }
    }

    fn eval_unary(&mut self, e: &UnaryExpr, env: &Environment) -> Result<Value, Failure> {
        let right = self.eval_expr(&e.right, env)?;
        match e.op {
            UnaryOp::Neg => operators::negate(&right),
            UnaryOp::Not => Ok(operators::not(&right)),
        }
    }

    fn eval_binary(&mut self, e: &BinaryExpr, env: &Environment) -> Result<Value, Failure> {
        // && and || are short-circuit and return one of their operands.
        if e.op == BinOp::And {
            let left = self.eval_expr(&e.left, env)?;
            if !left.is_truthy() {
                return Ok(left);
            }
            return self.eval_expr(&e.right, env);
        }
        if e.op == BinOp::Or {
            let left = self.eval_expr(&e.left, env)?;
            if left.is_truthy() {
                return Ok(left);
            }
            return self.eval_expr(&e.right, env);
        }

        let left = self.eval_expr(&e.left, env)?;
        let right = self.eval_expr(&e.right, env)?;
        match e.op {
            BinOp::Add => operators::add(&left, &right),
            BinOp::Sub => operators::sub(&left, &right),
            BinOp::Mul => operators::mul(&left, &right),
            BinOp::Div => operators::div(&left, &right),
            BinOp::Mod => operators::modulo(&left, &right),
            BinOp::Eq => operators::equal(&left, &right),
            BinOp::NotEq => operators::not_equal(&left, &right),
            BinOp::Lt => operators::less_than(&left, &right),
            BinOp::Gt => operators::greater_than(&left, &right),
            BinOp::LtEq => operators::less_equal(&left, &right),
            BinOp::GtEq => operators::greater_equal(&left, &right),
            BinOp::And | BinOp::Or => unreachable!("short-circuit handled above"),
        }
    }

    // --- Calls ---

    fn eval_call(&mut self, e: &CallExpr, env: &Environment) -> Result<Value, Failure> {
        // Member calls go through method dispatch.
        if let Expr::Member(member) = &e.func {
            return self.eval_member_call(member, &e.args, env);
        }

        let mut args = Vec::with_capacity(e.args.len());
        for arg in &e.args {
            args.push(self.eval_expr(arg, env)?);
        }

        if let Expr::Ident(ident) = &e.func {
            return self.call_by_name(&ident.name, args, env);
        }

        let callee = self.eval_expr(&e.func, env)?;
        self.call_value(callee, args)
    }

    fn call_by_name(
        &mut self,
        name: &str,
        args: Vec<Value>,
        env: &Environment,
    ) -> Result<Value, Failure> {
        if let Some(result) = self.dispatch_builtin(name, &args) {
            return result;
        }

        if let Some(field_names) = self.kitty_defs.get(name).cloned() {
            return make_kitty(name, &field_names, args);
        }

        if self.collar_defs.contains(name) {
            if args.len() != 1 {
                return Err(Failure::hiss(format!(
                    "{name} expects 1 argument but got {}",
                    args.len()
                )));
            }
            return Ok(Value::Kitty(Rc::new(KittyValue {
                type_name: name.into(),
                fields: vec![(SmolStr::new_static("value"), args.into_iter().next().unwrap())],
            })));
        }

        if env.has(name) {
            let callee = env.get(name)?;
            if matches!(callee, Value::Func(_)) {
                return self.call_value(callee, args);
            }
            return Err(Failure::hiss(format!("{name} is not callable")));
        }

        Err(Failure::hiss(format!("undefined function {name}")))
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, Failure> {
        match callee {
            Value::Func(func) => self.call_function(&func, args),
            other => Err(Failure::hiss(format!(
                "{} is not callable",
                other.type_name()
            ))),
        }
    }

    fn enter_frame(&mut self) -> Result<(), Failure> {
        self.depth += 1;
        if self.depth > MAX_CALL_DEPTH {
            self.depth -= 1;
            return Err(Failure::hiss(format!(
                "call depth exceeded ({MAX_CALL_DEPTH} frames)"
            )));
        }
        Ok(())
    }

    pub(crate) fn call_function(
        &mut self,
        func: &FuncValue,
        args: Vec<Value>,
    ) -> Result<Value, Failure> {
        self.check_step()?;
        self.enter_frame()?;
        let result = self.call_function_inner(func, args);
        self.depth -= 1;
        result
    }

    fn call_function_inner(&mut self, func: &FuncValue, args: Vec<Value>) -> Result<Value, Failure> {
        let child = func.env.child();
        let mut args = args.into_iter();
        for param in &func.params {
            child.define(param.name.clone(), args.next().unwrap_or(Value::Nil));
        }
        match &func.body {
            FuncBody::Block(body) => match self.exec_block(body, &child)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Nil),
            },
            FuncBody::Expr(body) => self.eval_expr(body, &child),
        }
    }

    fn call_method(
        &mut self,
        def: &methods::MethodDef,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Failure> {
        self.check_step()?;
        self.enter_frame()?;
        let result = self.call_method_inner(def, receiver, args);
        self.depth -= 1;
        result
    }

    fn call_method_inner(
        &mut self,
        def: &methods::MethodDef,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Failure> {
        // Methods close over the globals; self is bound at call time.
        let child = self.globals.child();
        child.define("self", receiver);
        let mut args = args.into_iter();
        for param in &def.params {
            child.define(param.name.clone(), args.next().unwrap_or(Value::Nil));
        }
        match self.exec_block(&def.body, &child)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }

    fn eval_member_call(
        &mut self,
        member: &MemberExpr,
        raw_args: &[Expr],
        env: &Environment,
    ) -> Result<Value, Failure> {
        let mut args = Vec::with_capacity(raw_args.len());
        for arg in raw_args {
            args.push(self.eval_expr(arg, env)?);
        }

        let obj = self.eval_expr(&member.object, env)?;
        if let Value::Kitty(kitty) = &obj {
            if let Some(def) = self.methods.lookup(&kitty.type_name, &member.member) {
                return self.call_method(&def, obj.clone(), args);
            }
            // A record field holding a function.
            if let Some(field) = kitty.get_field(&member.member) {
                if matches!(field, Value::Func(_)) {
                    return self.call_value(field.clone(), args);
                }
            }
            return Err(Failure::hiss(format!(
                "{}.{} is not callable",
                kitty.type_name, member.member
            )));
        }
        Err(Failure::hiss(format!(
            "cannot call method {} on {}",
            member.member,
            obj.type_name()
        )))
    }

    // --- Collections and members ---

    fn eval_index(&mut self, e: &IndexExpr, env: &Environment) -> Result<Value, Failure> {
        let left = self.eval_expr(&e.left, env)?;
        let index = self.eval_expr(&e.index, env)?;
        match &left {
            Value::List(items) => {
                let i = as_int(&index)?;
                if i < 0 || i as usize >= items.len() {
                    return Err(Failure::hiss(format!("Index {i} out of range")));
                }
                Ok(items[i as usize].clone())
            }
            Value::Map(entries) => {
                let key = as_string(&index)?;
                Ok(entries
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.clone())
                    .unwrap_or(Value::Nil))
            }
            _ => Err(Failure::hiss(format!(
                "cannot index {}",
                left.type_name()
            ))),
        }
    }

    fn eval_member(&mut self, e: &MemberExpr, env: &Environment) -> Result<Value, Failure> {
        let obj = self.eval_expr(&e.object, env)?;
        if let Value::Kitty(kitty) = &obj {
            return kitty.get_field(&e.member).cloned().ok_or_else(|| {
                Failure::hiss(format!("{} has no field {}", kitty.type_name, e.member))
            });
        }
        Err(Failure::hiss(format!(
            "cannot access field {} on {}",
            e.member,
            obj.type_name()
        )))
    }

    // --- Pipe and catch ---

    fn eval_pipe(&mut self, e: &PipeExpr, env: &Environment) -> Result<Value, Failure> {
        let left = self.eval_expr(&e.left, env)?;

        // x |=| f(y) is f(x, y); record methods dispatch with x prepended to
        // the call's own arguments.
        if let Expr::Call(call) = &e.right {
            let mut args = Vec::with_capacity(call.args.len() + 1);
            args.push(left);
            for arg in &call.args {
                args.push(self.eval_expr(arg, env)?);
            }

            if let Expr::Member(member) = &call.func {
                let obj = self.eval_expr(&member.object, env)?;
                if let Value::Kitty(kitty) = &obj {
                    if let Some(def) = self.methods.lookup(&kitty.type_name, &member.member) {
                        return self.call_method(&def, obj.clone(), args);
                    }
                }
            }

            if let Expr::Ident(ident) = &call.func {
                return self.call_by_name(&ident.name, args, env);
            }

            let callee = self.eval_expr(&call.func, env)?;
            if matches!(callee, Value::Func(_)) {
                return self.call_value(callee, args);
            }
            return Err(Failure::hiss("pipe target is not callable"));
        }

        // x |=| f is f(x). Bare builtin names resolve too.
        if let Expr::Ident(ident) = &e.right {
            return self.call_by_name(&ident.name, vec![left], env);
        }
        let callee = self.eval_expr(&e.right, env)?;
        if matches!(callee, Value::Func(_)) {
            return self.call_value(callee, vec![left]);
        }
        Err(Failure::hiss("pipe target is not callable"))
    }

    fn eval_catch(&mut self, e: &CatchExpr, env: &Environment) -> Result<Value, Failure> {
        match self.eval_expr(&e.left, env) {
            Ok(value) => Ok(value),
            Err(failure) if failure.is_catchable() => {
                let furball = Value::furball(failure.furball_message());
                let fallback = self.eval_expr(&e.right, env)?;
                if matches!(fallback, Value::Func(_)) {
                    return self.call_value(fallback, vec![furball]);
                }
                Ok(fallback)
            }
            Err(failure) => Err(failure),
        }
    }

    // --- Pattern match ---

    fn eval_match(&mut self, e: &MatchExpr, env: &Environment) -> Result<Value, Failure> {
        let subject = self.eval_expr(&e.subject, env)?;
        for arm in &e.arms {
            if self.match_pattern(&subject, &arm.pattern, env)? {
                return self.eval_expr(&arm.body, env);
            }
        }
        Ok(Value::Nil)
    }

    fn match_pattern(
        &mut self,
        subject: &Value,
        pattern: &Pattern,
        env: &Environment,
    ) -> Result<bool, Failure> {
        match pattern {
            Pattern::Wildcard(_) => Ok(true),
            Pattern::Literal(p) => {
                let candidate = self.eval_expr(&p.value, env)?;
                // A literal of a different runtime kind is simply no match.
                match operators::equal(subject, &candidate) {
                    Ok(result) => Ok(result.is_truthy()),
                    Err(_) => Ok(false),
                }
            }
            Pattern::Range(p) => {
                let (Expr::Int(low), Expr::Int(high)) = (&p.low, &p.high) else {
                    return Ok(false);
                };
                Ok(match subject {
                    Value::Int(v) => *v >= low.value && *v <= high.value,
                    Value::Float(v) => *v >= low.value as f64 && *v <= high.value as f64,
                    _ => false,
                })
            }
        }
    }

    // --- Builtins ---

    /// Dispatches a builtin by name. Returns `None` when the name is not a
    /// builtin so user definitions can take over.
    fn dispatch_builtin(&mut self, name: &str, args: &[Value]) -> Option<Result<Value, Failure>> {
        use builtins::require_args;
        let result = match name {
            "nya" => {
                let line = args
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                self.write_output(&line);
                self.write_output("\n");
                Ok(Value::Nil)
            }
            "hiss" => {
                let message = args
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                Err(Failure::hiss(message))
            }
            "len" => require_args("len", args, 1).and_then(|_| builtins::len(&args[0])),
            "to_int" => require_args("to_int", args, 1).and_then(|_| builtins::to_int(&args[0])),
            "to_float" => {
                require_args("to_float", args, 1).and_then(|_| builtins::to_float(&args[0]))
            }
            "to_string" => {
                require_args("to_string", args, 1).map(|_| builtins::to_string(&args[0]))
            }
            "gag" => require_args("gag", args, 1).and_then(|_| self.builtin_gag(&args[0])),
            "is_furball" => require_args("is_furball", args, 1)
                .map(|_| Value::Bool(matches!(args[0], Value::Furball(_)))),
            "head" => require_args("head", args, 1).and_then(|_| builtins::head(&args[0])),
            "tail" => require_args("tail", args, 1).and_then(|_| builtins::tail(&args[0])),
            "append" => {
                require_args("append", args, 2).and_then(|_| builtins::append(&args[0], &args[1]))
            }
            "lick" => require_args("lick", args, 2).and_then(|_| self.builtin_lick(args)),
            "picky" => require_args("picky", args, 2).and_then(|_| self.builtin_picky(args)),
            "curl" => require_args("curl", args, 3).and_then(|_| self.builtin_curl(args)),
            "run" if self.test_records.is_some() => self.builtin_test_run(args),
            "judge" if self.test_records.is_some() => builtin_judge(args),
            "expect" if self.test_records.is_some() => builtin_expect(args),
            "refuse" if self.test_records.is_some() => builtin_refuse(args),
            _ => return None,
        };
        Some(result)
    }

    fn builtin_gag(&mut self, thunk: &Value) -> Result<Value, Failure> {
        let Value::Func(func) = thunk else {
            return Err(Failure::hiss("gag requires a Func"));
        };
        let func = func.clone();
        match self.call_function(&func, Vec::new()) {
            Ok(value) => Ok(value),
            Err(failure) if failure.is_catchable() => {
                Ok(Value::furball(failure.furball_message()))
            }
            Err(failure) => Err(failure),
        }
    }

    /// Maps a function over a list.
    fn builtin_lick(&mut self, args: &[Value]) -> Result<Value, Failure> {
        let Value::List(items) = &args[0] else {
            return Err(Failure::hiss("lick requires a List"));
        };
        let items = items.clone();
        let func = args[1].clone();
        let mut out = Vec::with_capacity(items.len());
        for item in items.iter() {
            out.push(self.call_value(func.clone(), vec![item.clone()])?);
        }
        Ok(Value::list(out))
    }

    /// Filters a list by a predicate's truthiness.
    fn builtin_picky(&mut self, args: &[Value]) -> Result<Value, Failure> {
        let Value::List(items) = &args[0] else {
            return Err(Failure::hiss("picky requires a List"));
        };
        let items = items.clone();
        let func = args[1].clone();
        let mut out = Vec::new();
        for item in items.iter() {
            if self.call_value(func.clone(), vec![item.clone()])?.is_truthy() {
                out.push(item.clone());
            }
        }
        Ok(Value::list(out))
    }

    /// Reduces a list with an accumulator.
    fn builtin_curl(&mut self, args: &[Value]) -> Result<Value, Failure> {
        let Value::List(items) = &args[0] else {
            return Err(Failure::hiss("curl requires a List"));
        };
        let items = items.clone();
        let func = args[2].clone();
        let mut acc = args[1].clone();
        for item in items.iter() {
            acc = self.call_value(func.clone(), vec![acc, item.clone()])?;
        }
        Ok(acc)
    }

    // --- Test builtins (active only under the harness) ---

    fn builtin_test_run(&mut self, args: &[Value]) -> Result<Value, Failure> {
        builtins::require_args("run", args, 2)?;
        let Value::Str(name) = &args[0] else {
            return Err(Failure::hiss(format!(
                "run expects a String name, got {}",
                args[0].type_name()
            )));
        };
        let Value::Func(func) = &args[1] else {
            return Err(Failure::hiss(format!(
                "run expects a Func, got {}",
                args[1].type_name()
            )));
        };
        let name = name.clone();
        let func = func.clone();

        let (passed, message) = match self.call_function(&func, Vec::new()) {
            Ok(_) => (true, String::new()),
            Err(failure) if failure.is_catchable() => {
                (false, failure.furball_message().to_owned())
            }
            Err(failure) => return Err(failure),
        };

        if passed {
            self.write_output(&format!("PASS: {name}\n"));
        } else {
            self.write_output(&format!("FAIL: {name} - {message}\n"));
        }
        if let Some(records) = &self.test_records {
            records.borrow_mut().push(TestRecord {
                name,
                passed,
                message,
            });
        }
        Ok(Value::Bool(passed))
    }
}

fn builtin_judge(args: &[Value]) -> Result<Value, Failure> {
    builtins::require_args("judge", args, 1)?;
    if !args[0].is_truthy() {
        let message = args
            .get(1)
            .map(Value::to_string)
            .unwrap_or_else(|| "assertion failed: expected truthy value".to_owned());
        return Err(Failure::assert(message));
    }
    Ok(Value::Nil)
}

fn builtin_expect(args: &[Value]) -> Result<Value, Failure> {
    builtins::require_args("expect", args, 2)?;
    let actual = args[0].to_string();
    let expected = args[1].to_string();
    if actual != expected {
        let message = match args.get(2) {
            Some(label) => format!("{label}: expected {expected}, got {actual}"),
            None => format!("expected {expected}, got {actual}"),
        };
        return Err(Failure::assert(message));
    }
    Ok(Value::Nil)
}

fn builtin_refuse(args: &[Value]) -> Result<Value, Failure> {
    builtins::require_args("refuse", args, 1)?;
    if args[0].is_truthy() {
        let message = args
            .get(1)
            .map(Value::to_string)
            .unwrap_or_else(|| "assertion failed: expected falsy value".to_owned());
        return Err(Failure::assert(message));
    }
    Ok(Value::Nil)
}

fn as_int(v: &Value) -> Result<i64, Failure> {
    match v {
        Value::Int(x) => Ok(*x),
        _ => Err(Failure::hiss(format!(
            "expected int but got {}",
            v.type_name()
        ))),
    }
}

fn as_string(v: &Value) -> Result<String, Failure> {
    match v {
        Value::Str(s) => Ok(s.clone()),
        _ => Err(Failure::hiss(format!(
            "expected string but got {}",
            v.type_name()
        ))),
    }
}

fn make_kitty(type_name: &str, field_names: &[SmolStr], args: Vec<Value>) -> Result<Value, Failure> {
    if args.len() != field_names.len() {
        return Err(Failure::hiss(format!(
            "{type_name} expects {} fields but got {}",
            field_names.len(),
            args.len()
        )));
    }
    let fields = field_names
        .iter()
        .cloned()
        .zip(args)
        .collect::<Vec<(SmolStr, Value)>>();
    Ok(Value::Kitty(Rc::new(KittyValue {
        type_name: type_name.into(),
        fields,
    })))
}
