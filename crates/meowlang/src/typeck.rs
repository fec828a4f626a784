use crate::ast::*;
use crate::diagnostics::TypeError;
use crate::position::Position;
use crate::types::{
    AliasType, CollarType, FuncType, KittyField as KittyFieldType, KittyType, TrickMethodSig,
    TrickType, Type,
};
use smol_str::SmolStr;
use std::collections::HashMap;

/// Resolved type information, produced by [`check`] and consumed by the
/// interpreter and the back-end.
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    /// Every expression's resolved type, keyed by the parser-assigned id.
    pub expr_types: HashMap<ExprId, Type>,
    pub var_types: HashMap<SmolStr, Type>,
    pub func_sigs: HashMap<SmolStr, FuncType>,
    pub kitty_types: HashMap<SmolStr, KittyType>,
    pub alias_types: HashMap<SmolStr, AliasType>,
    pub collar_types: HashMap<SmolStr, CollarType>,
    pub trick_types: HashMap<SmolStr, TrickType>,
    /// `learn` method signatures: type name → method name → signature.
    pub learn_methods: HashMap<SmolStr, HashMap<SmolStr, FuncType>>,
}

/// Performs three-pass name and type resolution on a program.
///
/// Pass 1 registers every `kitty`, `breed`, `collar`, `trick`, and `meow`
/// name with a placeholder so forward references resolve. Pass 2 resolves
/// the underlying types of the declarations (back-patching alias handles in
/// place). Pass 3 walks statements, annotating every expression. Checking
/// never aborts early; all errors come back as one batch.
pub fn check(program: &Program) -> (TypeInfo, Vec<TypeError>) {
    let mut checker = Checker::new();
    checker.check_program(program);
    (checker.info, checker.errors)
}

struct Checker {
    info: TypeInfo,
    errors: Vec<TypeError>,
    scopes: Vec<HashMap<SmolStr, Type>>,
    /// Return type of the function currently being checked; `None` when
    /// outside any function body.
    current_return: Option<Type>,
    /// Type bound to `self` inside the `learn` method being checked.
    self_type: Option<Type>,
}

impl Checker {
    fn new() -> Self {
        Self {
            info: TypeInfo::default(),
            errors: Vec::new(),
            scopes: vec![HashMap::new()],
            current_return: None,
            self_type: None,
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn define(&mut self, name: SmolStr, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, ty);
        }
    }

    fn lookup(&self, name: &str) -> Type {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return ty.clone();
            }
        }
        Type::Any
    }

    fn add_error(&mut self, pos: &Position, message: impl Into<String>) {
        self.errors.push(TypeError::new(pos.clone(), message));
    }

    fn check_program(&mut self, program: &Program) {
        // Pass 1: placeholders for forward references.
        for stmt in &program.stmts {
            match stmt {
                Stmt::Breed(s) => {
                    self.info
                        .alias_types
                        .insert(s.name.clone(), AliasType::new(s.name.clone()));
                }
                Stmt::Collar(s) => {
                    self.info.collar_types.insert(
                        s.name.clone(),
                        CollarType {
                            name: s.name.clone(),
                            underlying: Box::new(Type::Any),
                        },
                    );
                }
                Stmt::Kitty(s) => {
                    self.info.kitty_types.insert(
                        s.name.clone(),
                        KittyType {
                            name: s.name.clone(),
                            fields: Vec::new(),
                        },
                    );
                }
                Stmt::Trick(s) => {
                    self.info.trick_types.insert(
                        s.name.clone(),
                        TrickType {
                            name: s.name.clone(),
                            methods: Vec::new(),
                        },
                    );
                }
                Stmt::Func(fn_stmt) => {
                    let sig = self.func_signature(fn_stmt);
                    self.info.func_sigs.insert(fn_stmt.name.clone(), sig.clone());
                    self.define(fn_stmt.name.clone(), Type::Func(sig));
                }
                _ => {}
            }
        }

        // Pass 2: resolve underlying types; forward references now work,
        // and alias handles are patched in place.
        for stmt in &program.stmts {
            match stmt {
                Stmt::Breed(s) => {
                    let resolved = self.resolve_type_expr(Some(&s.original));
                    if let Some(alias) = self.info.alias_types.get(&s.name) {
                        let handle = alias.underlying.clone();
                        let self_referential = matches!(
                            &resolved,
                            Type::Alias(inner) if std::rc::Rc::ptr_eq(&inner.underlying, &handle)
                        );
                        *handle.borrow_mut() = if self_referential {
                            Type::Any
                        } else {
                            resolved
                        };
                    }
                }
                Stmt::Collar(s) => {
                    let resolved = self.resolve_type_expr(Some(&s.wrapped));
                    if let Some(collar) = self.info.collar_types.get_mut(&s.name) {
                        collar.underlying = Box::new(resolved);
                    }
                }
                Stmt::Kitty(s) => {
                    let fields: Vec<KittyFieldType> = s
                        .fields
                        .iter()
                        .map(|f| KittyFieldType {
                            name: f.name.clone(),
                            ty: self.resolve_type_expr(Some(&f.type_ann)),
                        })
                        .collect();
                    if let Some(kitty) = self.info.kitty_types.get_mut(&s.name) {
                        kitty.fields = fields;
                    }
                }
                Stmt::Trick(s) => {
                    let methods: Vec<TrickMethodSig> = s
                        .methods
                        .iter()
                        .map(|m| TrickMethodSig {
                            name: m.name.clone(),
                            params: m
                                .params
                                .iter()
                                .map(|p| self.resolve_type_expr(p.type_ann.as_ref()))
                                .collect(),
                            ret: self.resolve_type_expr(m.return_type.as_ref()),
                        })
                        .collect();
                    if let Some(trick) = self.info.trick_types.get_mut(&s.name) {
                        trick.methods = methods;
                    }
                }
                _ => {}
            }
        }

        // Pass 3: check all statements.
        for stmt in &program.stmts {
            self.check_stmt(stmt);
        }
    }

    fn func_signature(&mut self, fn_stmt: &FuncStmt) -> FuncType {
        let params = fn_stmt
            .params
            .iter()
            .map(|p| self.resolve_type_expr(p.type_ann.as_ref()))
            .collect();
        let ret = self.resolve_type_expr(fn_stmt.return_type.as_ref());
        FuncType {
            params,
            ret: Box::new(ret),
        }
    }

    fn resolve_type_expr(&mut self, te: Option<&TypeExpr>) -> Type {
        let Some(te) = te else {
            return Type::Any;
        };
        match te {
            TypeExpr::Basic(basic) => match basic.name.as_str() {
                "int" => Type::Int,
                "float" => Type::Float,
                "string" => Type::String,
                "bool" => Type::Bool,
                "furball" => Type::Furball,
                "list" => Type::List(Box::new(Type::Any)),
                _ => Type::Any,
            },
            TypeExpr::Named(named) => {
                if let Some(alias) = self.info.alias_types.get(&named.name) {
                    return Type::Alias(alias.clone());
                }
                if let Some(collar) = self.info.collar_types.get(&named.name) {
                    return Type::Collar(collar.clone());
                }
                if let Some(kitty) = self.info.kitty_types.get(&named.name) {
                    return Type::Kitty(kitty.clone());
                }
                if let Some(trick) = self.info.trick_types.get(&named.name) {
                    return Type::Trick(trick.clone());
                }
                self.add_error(&named.token.pos, format!("Unknown type {}", named.name));
                Type::Any
            }
        }
    }

    // --- Statements ---

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(s) => self.check_var_stmt(s),
            Stmt::Func(s) => {
                let sig = self.func_signature(s);
                self.define(s.name.clone(), Type::Func(sig));
                self.check_func_stmt(s, None);
            }
            Stmt::Return(s) => self.check_return_stmt(s),
            Stmt::If(s) => self.check_if_stmt(s),
            Stmt::Range(s) => self.check_range_stmt(s),
            Stmt::Expr(s) => {
                self.infer_expr(&s.expr);
            }
            Stmt::Learn(s) => self.check_learn_stmt(s),
            // Imports have no effect on type checking; type declarations
            // were handled in the first two passes.
            Stmt::Fetch(_) | Stmt::Kitty(_) | Stmt::Breed(_) | Stmt::Collar(_) | Stmt::Trick(_) => {
            }
        }
    }

    fn check_var_stmt(&mut self, s: &VarStmt) {
        let val_type = self.infer_expr(&s.value);
        let decl_type = self.resolve_type_expr(s.type_ann.as_ref());

        // Reject same-scope redeclaration (shadowing in nested scopes is
        // allowed, `_` is exempt).
        if s.name != "_" {
            if let Some(scope) = self.scopes.last() {
                if scope.contains_key(&s.name) {
                    self.add_error(
                        &s.token.pos,
                        format!("Variable {} already declared in this scope", s.name),
                    );
                }
            }
        }

        if !decl_type.is_any() && !val_type.is_any() && !decl_type.equals(&val_type) {
            self.add_error(
                &s.token.pos,
                format!(
                    "Variable {} declared as {} but assigned {}",
                    s.name, decl_type, val_type
                ),
            );
        }

        let recorded = if decl_type.is_any() { val_type } else { decl_type };
        self.define(s.name.clone(), recorded.clone());
        self.info.var_types.insert(s.name.clone(), recorded);
    }

    fn check_func_stmt(&mut self, fn_stmt: &FuncStmt, self_type: Option<Type>) {
        for param in &fn_stmt.params {
            if param.type_ann.is_none() {
                self.add_error(
                    &fn_stmt.token.pos,
                    format!(
                        "Parameter {:?} of function {} must have a type annotation",
                        param.name.as_str(),
                        fn_stmt.name
                    ),
                );
            }
        }

        if fn_stmt.return_type.is_none() && has_return_stmt(&fn_stmt.body) {
            self.add_error(
                &fn_stmt.token.pos,
                format!(
                    "Function {} has bring statements but no return type annotation",
                    fn_stmt.name
                ),
            );
        }

        let return_type = self.resolve_type_expr(fn_stmt.return_type.as_ref());
        if !return_type.is_any() && !block_always_returns(&fn_stmt.body) {
            self.add_error(
                &fn_stmt.token.pos,
                format!(
                    "Function {} declares return type {} but does not return on all paths",
                    fn_stmt.name, return_type
                ),
            );
        }

        let prev_return = self.current_return.replace(return_type);
        let prev_self = match &self_type {
            Some(ty) => self.self_type.replace(ty.clone()),
            None => self.self_type.take(),
        };

        self.push_scope();
        for param in &fn_stmt.params {
            let ty = self.resolve_type_expr(param.type_ann.as_ref());
            self.define(param.name.clone(), ty);
        }
        for stmt in &fn_stmt.body {
            self.check_stmt(stmt);
        }
        self.pop_scope();

        self.current_return = prev_return;
        self.self_type = prev_self;
    }

    fn check_return_stmt(&mut self, s: &ReturnStmt) {
        let Some(expected) = self.current_return.clone() else {
            self.add_error(&s.token.pos, "bring used outside function");
            return;
        };
        let Some(value) = &s.value else {
            if !expected.is_any() {
                self.add_error(
                    &s.token.pos,
                    format!("Function requires a return value of type {expected}"),
                );
            }
            return;
        };
        let val_type = self.infer_expr(value);
        if !expected.is_any() && !val_type.is_any() && !expected.equals(&val_type) {
            self.add_error(
                &s.token.pos,
                format!("Return type mismatch: expected {expected} but got {val_type}"),
            );
        }
    }

    fn check_if_stmt(&mut self, s: &IfStmt) {
        let cond_type = self.infer_expr(&s.condition).unwrap();
        if !cond_type.is_any() && !matches!(cond_type, Type::Bool) {
            self.add_error(&s.token.pos, format!("Condition must be bool, got {cond_type}"));
        }
        self.push_scope();
        for stmt in &s.body {
            self.check_stmt(stmt);
        }
        self.pop_scope();
        if !s.else_body.is_empty() {
            self.push_scope();
            for stmt in &s.else_body {
                self.check_stmt(stmt);
            }
            self.pop_scope();
        }
    }

    fn check_range_stmt(&mut self, s: &RangeStmt) {
        if let Some(start) = &s.start {
            let start_type = self.infer_expr(start).unwrap();
            if !start_type.is_any() && !matches!(start_type, Type::Int) {
                self.add_error(&s.token.pos, format!("Range start must be int, got {start_type}"));
            }
        }
        let end_type = self.infer_expr(&s.end).unwrap();
        if !end_type.is_any() && !matches!(end_type, Type::Int) {
            self.add_error(&s.token.pos, format!("Range end must be int, got {end_type}"));
        }
        self.push_scope();
        self.define(s.var.clone(), Type::Int);
        self.info.var_types.insert(s.var.clone(), Type::Int);
        for stmt in &s.body {
            self.check_stmt(stmt);
        }
        self.pop_scope();
    }

    fn check_learn_stmt(&mut self, s: &LearnStmt) {
        let self_type = if let Some(kitty) = self.info.kitty_types.get(&s.type_name) {
            Type::Kitty(kitty.clone())
        } else if let Some(collar) = self.info.collar_types.get(&s.type_name) {
            Type::Collar(collar.clone())
        } else {
            self.add_error(&s.token.pos, format!("Unknown type {}", s.type_name));
            Type::Any
        };

        for method in &s.methods {
            let sig = self.func_signature(method);
            self.info
                .learn_methods
                .entry(s.type_name.clone())
                .or_default()
                .insert(method.name.clone(), sig);
            self.check_func_stmt(method, Some(self_type.clone()));
        }
    }

    // --- Expressions ---

    fn infer_expr(&mut self, expr: &Expr) -> Type {
        let ty = self.infer_expr_inner(expr);
        self.info.expr_types.insert(expr.id(), ty.clone());
        ty
    }

    fn infer_expr_inner(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::Int(_) => Type::Int,
            Expr::Float(_) => Type::Float,
            Expr::Str(_) => Type::String,
            Expr::Bool(_) => Type::Bool,
            Expr::Nil(_) => Type::Nil,
            Expr::Ident(e) => self.lookup(&e.name),
            Expr::SelfRef(e) => {
                match self.self_type.clone() {
                    Some(ty) => ty,
                    None => {
                        self.add_error(&e.token.pos, "self used outside a learn method body");
                        Type::Any
                    }
                }
            }
            Expr::Unary(e) => self.infer_unary(e),
            Expr::Binary(e) => self.infer_binary(e),
            Expr::Call(e) => self.infer_call(e),
            Expr::Lambda(e) => self.infer_lambda(e),
            Expr::List(e) => self.infer_list(e),
            Expr::Index(e) => {
                let left_type = self.infer_expr(&e.left);
                self.infer_expr(&e.index);
                match left_type.unwrap() {
                    Type::List(elem) => *elem,
                    _ => Type::Any,
                }
            }
            Expr::Pipe(e) => {
                self.infer_expr(&e.left);
                let right_type = self.infer_expr(&e.right);
                match right_type {
                    Type::Func(func) => *func.ret,
                    other => other,
                }
            }
            Expr::Catch(e) => {
                let left_type = self.infer_expr(&e.left);
                let right_type = self.infer_expr(&e.right);
                if !left_type.is_any() {
                    return left_type;
                }
                match right_type {
                    Type::Func(func) => *func.ret,
                    other => other,
                }
            }
            Expr::Map(e) => {
                for key in &e.keys {
                    self.infer_expr(key);
                }
                for value in &e.values {
                    self.infer_expr(value);
                }
                Type::Any
            }
            Expr::Match(e) => self.infer_match(e),
            Expr::Member(e) => self.infer_member(e),
        }
    }

    fn infer_unary(&mut self, e: &UnaryExpr) -> Type {
        let operand = self.infer_expr(&e.right);
        match e.op {
            UnaryOp::Neg => {
                if operand.is_any() {
                    return Type::Any;
                }
                if operand.unwrap().is_numeric() {
                    return operand;
                }
                self.add_error(&e.token.pos, format!("Cannot negate {operand}"));
                Type::Any
            }
            // NOT operates on truthiness, so it accepts any type.
            UnaryOp::Not => Type::Bool,
        }
    }

    fn infer_binary(&mut self, e: &BinaryExpr) -> Type {
        let left = self.infer_expr(&e.left);
        let right = self.infer_expr(&e.right);

        // Unwrap aliases for transparent checking.
        let uleft = left.unwrap();
        let uright = right.unwrap();

        // If either side is Any, skip checking.
        if uleft.is_any() || uright.is_any() {
            return match e.op {
                BinOp::Eq
                | BinOp::NotEq
                | BinOp::Lt
                | BinOp::Gt
                | BinOp::LtEq
                | BinOp::GtEq
                | BinOp::And
                | BinOp::Or => Type::Bool,
                _ => Type::Any,
            };
        }

        match e.op {
            BinOp::Add => {
                if uleft.equals(&uright)
                    && matches!(uleft, Type::Int | Type::Float | Type::String)
                {
                    // Result keeps the left operand's surface type so aliases
                    // survive arithmetic.
                    return left;
                }
                self.add_error(&e.token.pos, format!("Cannot add {left} and {right}"));
                Type::Any
            }
            BinOp::Sub | BinOp::Mul | BinOp::Div => {
                if uleft.equals(&uright) && uleft.is_numeric() {
                    return left;
                }
                let verb = match e.op {
                    BinOp::Sub => "subtract",
                    BinOp::Mul => "multiply",
                    _ => "divide",
                };
                self.add_error(&e.token.pos, format!("Cannot {verb} {left} and {right}"));
                Type::Any
            }
            BinOp::Mod => {
                if uleft.equals(&uright) && matches!(uleft, Type::Int) {
                    return Type::Int;
                }
                self.add_error(&e.token.pos, format!("Cannot modulo {left} and {right}"));
                Type::Any
            }
            BinOp::Eq | BinOp::NotEq => {
                // Comparison between two collars is always permitted; the
                // runtime decides.
                let both_collars =
                    matches!(uleft, Type::Collar(_)) && matches!(uright, Type::Collar(_));
                if !both_collars && !uleft.equals(&uright) {
                    self.add_error(&e.token.pos, format!("Cannot compare {left} and {right}"));
                }
                Type::Bool
            }
            BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => {
                if !(uleft.equals(&uright) && uleft.is_numeric()) {
                    self.add_error(&e.token.pos, format!("Cannot compare {left} and {right}"));
                }
                Type::Bool
            }
            BinOp::And | BinOp::Or => {
                let lok = matches!(uleft, Type::Bool);
                let rok = matches!(uright, Type::Bool);
                if !lok || !rok {
                    self.add_error(
                        &e.token.pos,
                        format!("Logical operator requires bool operands, got {left} and {right}"),
                    );
                }
                Type::Bool
            }
        }
    }

    fn infer_call(&mut self, e: &CallExpr) -> Type {
        for arg in &e.args {
            self.infer_expr(arg);
        }

        if let Expr::Ident(ident) = &e.func {
            // Annotate the callee; known signatures override the fallback.
            let callee_type = self
                .info
                .func_sigs
                .get(&ident.name)
                .cloned()
                .map(Type::Func)
                .unwrap_or(Type::Any);
            self.info.expr_types.insert(ident.id, callee_type);

            if let Some(ret) = builtin_return_type(&ident.name) {
                return ret;
            }

            if let Some(collar) = self.info.collar_types.get(&ident.name).cloned() {
                if e.args.len() != 1 {
                    self.add_error(
                        &e.token.pos,
                        format!("{} expects 1 argument but got {}", ident.name, e.args.len()),
                    );
                } else if let Some(arg_type) = self.info.expr_types.get(&e.args[0].id()).cloned() {
                    if !arg_type.is_any()
                        && !collar.underlying.is_any()
                        && !collar.underlying.equals(&arg_type)
                    {
                        self.add_error(
                            &e.token.pos,
                            format!(
                                "{} expects {} but got {}",
                                ident.name, collar.underlying, arg_type
                            ),
                        );
                    }
                }
                return Type::Collar(collar);
            }

            if let Some(kitty) = self.info.kitty_types.get(&ident.name).cloned() {
                if e.args.len() != kitty.fields.len() {
                    self.add_error(
                        &e.token.pos,
                        format!(
                            "{} expects {} fields but got {}",
                            ident.name,
                            kitty.fields.len(),
                            e.args.len()
                        ),
                    );
                }
                return Type::Kitty(kitty);
            }

            if let Some(sig) = self.info.func_sigs.get(&ident.name).cloned() {
                if e.args.len() != sig.params.len() {
                    self.add_error(
                        &e.token.pos,
                        format!(
                            "Function {} expects {} arguments but got {}",
                            ident.name,
                            sig.params.len(),
                            e.args.len()
                        ),
                    );
                    return *sig.ret;
                }
                for (i, arg) in e.args.iter().enumerate() {
                    if let Some(arg_type) = self.info.expr_types.get(&arg.id()) {
                        if !arg_type.is_any()
                            && !sig.params[i].is_any()
                            && !sig.params[i].equals(arg_type)
                        {
                            self.add_error(
                                &e.token.pos,
                                format!(
                                    "Argument {}: expected {} but got {}",
                                    i + 1,
                                    sig.params[i],
                                    arg_type
                                ),
                            );
                        }
                    }
                }
                return *sig.ret;
            }
        }

        if let Expr::Member(member) = &e.func {
            return self.infer_member_call(member);
        }

        self.infer_expr(&e.func);
        Type::Any
    }

    fn infer_member_call(&mut self, member: &MemberExpr) -> Type {
        let obj_type = self.infer_expr(&member.object);
        self.info.expr_types.insert(member.id, Type::Any);
        let type_name = match obj_type.unwrap() {
            Type::Kitty(k) => Some(k.name),
            Type::Collar(c) => Some(c.name),
            _ => None,
        };
        if let Some(name) = type_name {
            if let Some(sig) = self
                .info
                .learn_methods
                .get(&name)
                .and_then(|methods| methods.get(&member.member))
            {
                return *sig.ret.clone();
            }
        }
        Type::Any
    }

    fn infer_lambda(&mut self, e: &LambdaExpr) -> Type {
        self.push_scope();
        let mut param_types = Vec::with_capacity(e.params.len());
        for param in &e.params {
            if param.type_ann.is_none() {
                self.add_error(
                    &e.token.pos,
                    format!(
                        "Lambda parameter {:?} must have a type annotation",
                        param.name.as_str()
                    ),
                );
            }
            let ty = self.resolve_type_expr(param.type_ann.as_ref());
            param_types.push(ty.clone());
            self.define(param.name.clone(), ty);
        }
        let ret = self.infer_expr(&e.body);
        self.pop_scope();
        Type::Func(FuncType {
            params: param_types,
            ret: Box::new(ret),
        })
    }

    fn infer_list(&mut self, e: &ListLit) -> Type {
        let Some(first) = e.items.first() else {
            return Type::List(Box::new(Type::Any));
        };
        let mut elem_type = self.infer_expr(first);
        for item in &e.items[1..] {
            let ty = self.infer_expr(item);
            if !elem_type.is_any() && !ty.is_any() && !elem_type.equals(&ty) {
                if elem_type.is_primitive() && ty.is_primitive() {
                    self.add_error(
                        &e.token.pos,
                        format!("List elements must have consistent types: {elem_type} vs {ty}"),
                    );
                }
                elem_type = Type::Any;
            }
        }
        Type::List(Box::new(elem_type))
    }

    fn infer_match(&mut self, e: &MatchExpr) -> Type {
        self.infer_expr(&e.subject);
        let mut arm_type: Option<Type> = None;
        for arm in &e.arms {
            match &arm.pattern {
                Pattern::Literal(p) => {
                    self.infer_expr(&p.value);
                }
                Pattern::Range(p) => {
                    self.infer_expr(&p.low);
                    self.infer_expr(&p.high);
                }
                Pattern::Wildcard(_) => {}
            }
            let ty = self.infer_expr(&arm.body);
            match &arm_type {
                None => arm_type = Some(ty),
                Some(prev) => {
                    if !prev.is_any() && !ty.is_any() && !prev.equals(&ty) {
                        self.add_error(
                            &e.token.pos,
                            format!("Match arms have inconsistent types: {prev} vs {ty}"),
                        );
                        arm_type = Some(Type::Any);
                    }
                }
            }
        }
        arm_type.unwrap_or(Type::Any)
    }

    fn infer_member(&mut self, e: &MemberExpr) -> Type {
        let obj_type = self.infer_expr(&e.object);
        match obj_type.unwrap() {
            Type::Collar(collar) => {
                if e.member == "value" {
                    return *collar.underlying;
                }
                self.add_error(
                    &e.token.pos,
                    format!("{} has no field {}", collar.name, e.member),
                );
                Type::Any
            }
            Type::Kitty(kitty) => {
                for field in &kitty.fields {
                    if field.name == e.member {
                        return field.ty.clone();
                    }
                }
                self.add_error(
                    &e.token.pos,
                    format!("{} has no field {}", kitty.name, e.member),
                );
                Type::Any
            }
            _ => Type::Any,
        }
    }
}

/// The built-in return-type table. Everything not listed here resolves
/// through user declarations.
fn builtin_return_type(name: &str) -> Option<Type> {
    match name {
        "to_int" => Some(Type::Int),
        "to_float" => Some(Type::Float),
        "to_string" => Some(Type::String),
        "is_furball" => Some(Type::Bool),
        "len" => Some(Type::Int),
        "nya" | "hiss" | "gag" | "head" | "tail" | "append" | "lick" | "picky" | "curl"
        | "judge" | "expect" | "refuse" => Some(Type::Any),
        _ => None,
    }
}

/// Reports whether a statement list contains any `bring`, searching through
/// `sniff` and `purr` bodies.
fn has_return_stmt(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Stmt::Return(_) => true,
        Stmt::If(s) => has_return_stmt(&s.body) || has_return_stmt(&s.else_body),
        Stmt::Range(s) => has_return_stmt(&s.body),
        _ => false,
    })
}

/// Reports whether all control-flow paths through the block end with a
/// `bring`: the last statement is a return, or an if/else whose branches
/// both always return.
fn block_always_returns(stmts: &[Stmt]) -> bool {
    match stmts.last() {
        Some(Stmt::Return(_)) => true,
        Some(Stmt::If(s)) => block_always_returns(&s.body) && block_always_returns(&s.else_body),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser;

    fn check_source(source: &str) -> (TypeInfo, Vec<TypeError>) {
        let (program, errors) = parser::parse(Lexer::new(source, "test.nyan"));
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        check(&program)
    }

    fn assert_clean(source: &str) -> TypeInfo {
        let (info, errors) = check_source(source);
        assert!(errors.is_empty(), "unexpected type errors: {errors:?}");
        info
    }

    fn assert_fails(source: &str) -> Vec<TypeError> {
        let (_, errors) = check_source(source);
        assert!(!errors.is_empty(), "expected type errors for {source:?}");
        errors
    }

    #[test]
    fn infers_literals() {
        let info = assert_clean("nyan a = 42\nnyan b = 3.14\nnyan c = \"hi\"\nnyan d = yarn");
        assert!(matches!(info.var_types["a"], Type::Int));
        assert!(matches!(info.var_types["b"], Type::Float));
        assert!(matches!(info.var_types["c"], Type::String));
        assert!(matches!(info.var_types["d"], Type::Bool));
    }

    #[test]
    fn annotation_mismatch_is_an_error() {
        let errors = assert_fails("nyan x int = \"hello\"");
        assert!(errors[0].message.contains("declared as int"));
    }

    #[test]
    fn add_int_string_is_an_error() {
        assert_fails("nyan x = 1 + \"hello\"");
    }

    #[test]
    fn untyped_parameter_is_an_error() {
        let errors = assert_fails("meow greet(name) string {\n  bring \"hi \" + name\n}");
        assert!(errors[0].message.contains("type annotation"));
    }

    #[test]
    fn missing_return_path_is_an_error() {
        let errors = assert_fails("meow f(n int) int {\n  sniff (n > 0) {\n    bring 1\n  }\n}");
        assert!(errors[0].message.contains("does not return on all paths"));
    }

    #[test]
    fn same_scope_redeclaration_is_an_error() {
        assert_fails("nyan x = 1\nnyan x = 2");
    }

    #[test]
    fn underscore_may_be_redeclared() {
        assert_clean("nyan _ = 1\nnyan _ = 2");
    }

    #[test]
    fn mixed_primitive_list_is_an_error() {
        assert_fails("nyan xs = [1, \"x\"]");
    }

    #[test]
    fn empty_list_is_list_any() {
        let info = assert_clean("nyan xs = []");
        match &info.var_types["xs"] {
            Type::List(elem) => assert!(elem.is_any()),
            other => panic!("expected list, got {other}"),
        }
    }

    #[test]
    fn forward_alias_references_resolve() {
        let info = assert_clean("breed Score = Points\nbreed Points = int\nnyan s Score = 3");
        assert!(Type::Alias(info.alias_types["Score"].clone()).equals(&Type::Int));
    }

    #[test]
    fn collar_constructor_requires_underlying() {
        assert_clean("collar UserId = int\nnyan id = UserId(42)");
        let errors = assert_fails("collar UserId = int\nnyan id = UserId(\"meow\")");
        assert!(errors[0].message.contains("UserId expects int"));
    }

    #[test]
    fn collars_compare_to_each_other_but_not_to_ints() {
        assert_clean(
            "collar A = int\ncollar B = int\nnyan r = A(1) == B(1)",
        );
        assert_fails("collar A = int\nnyan r = A(1) == 1");
    }

    #[test]
    fn typed_call_arguments_are_checked() {
        assert_fails("meow add(a int, b int) int {\n  bring a + b\n}\nnyan r = add(1, \"two\")");
        let info = assert_clean(
            "meow add(a int, b int) int {\n  bring a + b\n}\nnyan r = add(1, 2)",
        );
        assert!(matches!(info.var_types["r"], Type::Int));
    }

    #[test]
    fn bare_return_in_typed_function_is_an_error() {
        assert_fails("meow f(n int) int {\n  bring\n}");
    }

    #[test]
    fn return_outside_function_is_an_error() {
        let errors = assert_fails("bring 1");
        assert!(errors[0].message.contains("outside function"));
    }

    #[test]
    fn self_outside_learn_is_an_error() {
        let errors = assert_fails("nyan x = self");
        assert!(errors[0].message.contains("self"));
    }

    #[test]
    fn learn_methods_are_recorded_and_checked() {
        let info = assert_clean(
            "kitty Cat {\n  name: string\n}\nlearn Cat {\n  meow greet() string {\n    bring \"hi \" + self.name\n  }\n}",
        );
        let sig = &info.learn_methods["Cat"]["greet"];
        assert!(sig.ret.equals(&Type::String));
    }

    #[test]
    fn match_arm_types_must_agree() {
        assert_fails("nyan x = 1\nnyan r = peek(x) {\n  1 => \"one\"\n  _ => 2\n}");
        let info = assert_clean("nyan x = 1\nnyan r = peek(x) {\n  1 => \"one\"\n  _ => \"other\"\n}");
        assert!(matches!(info.var_types["r"], Type::String));
    }

    #[test]
    fn condition_must_be_bool() {
        assert_fails("sniff (1) {\n  nya(1)\n}");
    }

    #[test]
    fn alias_survives_arithmetic() {
        let info = assert_clean("breed Score = int\nnyan a Score = 1\nnyan b = a + a");
        assert!(matches!(info.var_types["b"], Type::Alias(_)));
    }

    #[test]
    fn builtin_return_types() {
        let info = assert_clean("nyan a = to_int(3.9)\nnyan b = to_string(1)\nnyan c = len([1])");
        assert!(matches!(info.var_types["a"], Type::Int));
        assert!(matches!(info.var_types["b"], Type::String));
        assert!(matches!(info.var_types["c"], Type::Int));
    }
}
