use crate::position::Position;
use crate::tokens::Token;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// Identity of an expression node, assigned densely by the parser.
///
/// The checker's `expr_types` table and the mutation schema are keyed by
/// these ids.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ExprId(pub u32);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// The root AST node: an ordered sequence of top-level statements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub stmts: Vec<Stmt>,
    /// Number of expression ids the parser assigned; fresh ids for
    /// synthesized nodes (mutation wrappers) start here.
    pub expr_count: u32,
}

impl Program {
    pub fn pos(&self) -> Position {
        self.stmts
            .first()
            .map(|s| s.pos().clone())
            .unwrap_or_default()
    }
}

// --- Statements ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Var(VarStmt),
    Func(FuncStmt),
    Return(ReturnStmt),
    If(IfStmt),
    Range(RangeStmt),
    Expr(ExprStmt),
    Fetch(FetchStmt),
    Kitty(KittyStmt),
    Breed(BreedStmt),
    Collar(CollarStmt),
    Trick(TrickStmt),
    Learn(LearnStmt),
}

impl Stmt {
    pub fn pos(&self) -> &Position {
        match self {
            Stmt::Var(s) => &s.token.pos,
            Stmt::Func(s) => &s.token.pos,
            Stmt::Return(s) => &s.token.pos,
            Stmt::If(s) => &s.token.pos,
            Stmt::Range(s) => &s.token.pos,
            Stmt::Expr(s) => &s.token.pos,
            Stmt::Fetch(s) => &s.token.pos,
            Stmt::Kitty(s) => &s.token.pos,
            Stmt::Breed(s) => &s.token.pos,
            Stmt::Collar(s) => &s.token.pos,
            Stmt::Trick(s) => &s.token.pos,
            Stmt::Learn(s) => &s.token.pos,
        }
    }
}

/// Variable declaration: `nyan x = …` (or the implicit `x = …` form).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarStmt {
    pub token: Token,
    pub name: SmolStr,
    pub type_ann: Option<TypeExpr>,
    pub value: Expr,
}

/// Function definition: `meow f(a int) int { … }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncStmt {
    pub token: Token,
    pub name: SmolStr,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Vec<Stmt>,
}

/// Return statement: `bring …` (value optional).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub token: Token,
    pub value: Option<Expr>,
}

/// Conditional: `sniff (…) { … } scratch { … }`. A `scratch sniff` chain
/// parses as an `IfStmt` in the else body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStmt {
    pub token: Token,
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
}

/// Range loop: `purr i (n) { … }` (count form, `start` absent) or
/// `purr i (a..b) { … }` (inclusive form).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeStmt {
    pub token: Token,
    pub var: SmolStr,
    pub start: Option<Expr>,
    pub end: Expr,
    pub inclusive: bool,
    pub body: Vec<Stmt>,
}

/// Expression used as a statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprStmt {
    pub token: Token,
    pub expr: Expr,
}

/// Import statement: `nab "name"` (equivalently `fetch "name"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchStmt {
    pub token: Token,
    pub path: String,
}

/// Record declaration: `kitty Name { field: type … }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KittyStmt {
    pub token: Token,
    pub name: SmolStr,
    pub fields: Vec<KittyField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KittyField {
    pub name: SmolStr,
    pub type_ann: TypeExpr,
}

/// Transparent type alias: `breed Name = type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedStmt {
    pub token: Token,
    pub name: SmolStr,
    pub original: TypeExpr,
}

/// Nominal wrapper: `collar Name = type`. The constructor takes one value
/// and the wrapper exposes an implicit `.value` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollarStmt {
    pub token: Token,
    pub name: SmolStr,
    pub wrapped: TypeExpr,
}

/// Structural interface: `trick Name { meow sig(…) type … }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrickStmt {
    pub token: Token,
    pub name: SmolStr,
    pub methods: Vec<MethodSig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSig {
    pub token: Token,
    pub name: SmolStr,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
}

/// Method attachment: `learn Name { meow m(…) { … } … }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnStmt {
    pub token: Token,
    pub type_name: SmolStr,
    pub methods: Vec<FuncStmt>,
}

/// A function or lambda parameter with optional type annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: SmolStr,
    pub type_ann: Option<TypeExpr>,
}

// --- Type expressions ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeExpr {
    /// A primitive type name: int, float, string, bool, furball, list.
    Basic(BasicType),
    /// A user-declared type name (kitty, breed, collar, trick).
    Named(NamedType),
}

impl TypeExpr {
    pub fn pos(&self) -> &Position {
        match self {
            TypeExpr::Basic(t) => &t.token.pos,
            TypeExpr::Named(t) => &t.token.pos,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicType {
    pub token: Token,
    pub name: SmolStr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedType {
    pub token: Token,
    pub name: SmolStr,
}

// --- Expressions ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Int(IntLit),
    Float(FloatLit),
    Str(StringLit),
    Bool(BoolLit),
    Nil(NilLit),
    Ident(Ident),
    SelfRef(SelfExpr),
    Member(Box<MemberExpr>),
    Unary(Box<UnaryExpr>),
    Binary(Box<BinaryExpr>),
    Pipe(Box<PipeExpr>),
    Catch(Box<CatchExpr>),
    Index(Box<IndexExpr>),
    List(ListLit),
    Map(MapLit),
    Call(Box<CallExpr>),
    Lambda(Box<LambdaExpr>),
    Match(Box<MatchExpr>),
}

impl Expr {
    pub fn id(&self) -> ExprId {
        match self {
            Expr::Int(e) => e.id,
            Expr::Float(e) => e.id,
            Expr::Str(e) => e.id,
            Expr::Bool(e) => e.id,
            Expr::Nil(e) => e.id,
            Expr::Ident(e) => e.id,
            Expr::SelfRef(e) => e.id,
            Expr::Member(e) => e.id,
            Expr::Unary(e) => e.id,
            Expr::Binary(e) => e.id,
            Expr::Pipe(e) => e.id,
            Expr::Catch(e) => e.id,
            Expr::Index(e) => e.id,
            Expr::List(e) => e.id,
            Expr::Map(e) => e.id,
            Expr::Call(e) => e.id,
            Expr::Lambda(e) => e.id,
            Expr::Match(e) => e.id,
        }
    }

    pub fn token(&self) -> &Token {
        match self {
            Expr::Int(e) => &e.token,
            Expr::Float(e) => &e.token,
            Expr::Str(e) => &e.token,
            Expr::Bool(e) => &e.token,
            Expr::Nil(e) => &e.token,
            Expr::Ident(e) => &e.token,
            Expr::SelfRef(e) => &e.token,
            Expr::Member(e) => &e.token,
            Expr::Unary(e) => &e.token,
            Expr::Binary(e) => &e.token,
            Expr::Pipe(e) => &e.token,
            Expr::Catch(e) => &e.token,
            Expr::Index(e) => &e.token,
            Expr::List(e) => &e.token,
            Expr::Map(e) => &e.token,
            Expr::Call(e) => &e.token,
            Expr::Lambda(e) => &e.token,
            Expr::Match(e) => &e.token,
        }
    }

    pub fn pos(&self) -> &Position {
        &self.token().pos
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntLit {
    pub id: ExprId,
    pub token: Token,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatLit {
    pub id: ExprId,
    pub token: Token,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringLit {
    pub id: ExprId,
    pub token: Token,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoolLit {
    pub id: ExprId,
    pub token: Token,
    pub value: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NilLit {
    pub id: ExprId,
    pub token: Token,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ident {
    pub id: ExprId,
    pub token: Token,
    pub name: SmolStr,
}

/// `self` inside a `learn` method body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfExpr {
    pub id: ExprId,
    pub token: Token,
}

/// Member access: `object.member`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberExpr {
    pub id: ExprId,
    pub token: Token,
    pub object: Expr,
    pub member: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub id: ExprId,
    pub token: Token,
    pub op: UnaryOp,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        use BinOp::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Eq => "==",
            NotEq => "!=",
            Lt => "<",
            Gt => ">",
            LtEq => "<=",
            GtEq => ">=",
            And => "&&",
            Or => "||",
        }
    }

    /// The `+↔-`, `*↔/` mutation partner, if any.
    pub fn arithmetic_swap(self) -> Option<BinOp> {
        use BinOp::*;
        match self {
            Add => Some(Sub),
            Sub => Some(Add),
            Mul => Some(Div),
            Div => Some(Mul),
            _ => None,
        }
    }

    /// The `==↔!=`, `<↔<=`, `>↔>=` mutation partner, if any.
    pub fn comparison_swap(self) -> Option<BinOp> {
        use BinOp::*;
        match self {
            Eq => Some(NotEq),
            NotEq => Some(Eq),
            Lt => Some(LtEq),
            LtEq => Some(Lt),
            Gt => Some(GtEq),
            GtEq => Some(Gt),
            _ => None,
        }
    }

    /// The `&&↔||` mutation partner, if any.
    pub fn logical_swap(self) -> Option<BinOp> {
        use BinOp::*;
        match self {
            And => Some(Or),
            Or => Some(And),
            _ => None,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub id: ExprId,
    pub token: Token,
    pub op: BinOp,
    pub left: Expr,
    pub right: Expr,
}

/// Pipe: `left |=| right`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeExpr {
    pub id: ExprId,
    pub token: Token,
    pub left: Expr,
    pub right: Expr,
}

/// Catch: `left ~> right`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchExpr {
    pub id: ExprId,
    pub token: Token,
    pub left: Expr,
    pub right: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexExpr {
    pub id: ExprId,
    pub token: Token,
    pub left: Expr,
    pub index: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLit {
    pub id: ExprId,
    pub token: Token,
    pub items: Vec<Expr>,
}

/// Map literal; `keys` and `values` are same-length parallel sequences
/// preserving the source insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapLit {
    pub id: ExprId,
    pub token: Token,
    pub keys: Vec<Expr>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExpr {
    pub id: ExprId,
    pub token: Token,
    pub func: Expr,
    pub args: Vec<Expr>,
}

/// Lambda: `paw(x int) { x * 2 }`. The body is a single expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub id: ExprId,
    pub token: Token,
    pub params: Vec<Param>,
    pub body: Expr,
}

/// Pattern match: `peek(subject) { pattern => body, … }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchExpr {
    pub id: ExprId,
    pub token: Token,
    pub subject: Expr,
    pub arms: Vec<MatchArm>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Expr,
}

// --- Patterns ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Pattern {
    /// Matches a specific literal value.
    Literal(LiteralPattern),
    /// Matches integers and floats within an inclusive range.
    Range(RangePattern),
    /// `_`, matches any value.
    Wildcard(WildcardPattern),
}

impl Pattern {
    pub fn pos(&self) -> &Position {
        match self {
            Pattern::Literal(p) => &p.token.pos,
            Pattern::Range(p) => &p.token.pos,
            Pattern::Wildcard(p) => &p.token.pos,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteralPattern {
    pub token: Token,
    pub value: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangePattern {
    pub token: Token,
    pub low: Expr,
    pub high: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WildcardPattern {
    pub token: Token,
}

// --- Pre-order traversal ---

/// A node yielded by [`preorder`].
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Pattern(&'a Pattern),
}

/// Returns a restartable depth-first pre-order iterator over every
/// statement, expression, and pattern in the program. Consumers
/// short-circuit by simply dropping the iterator.
pub fn preorder(program: &Program) -> Preorder<'_> {
    let mut stack: Vec<Node<'_>> = Vec::with_capacity(program.stmts.len());
    for stmt in program.stmts.iter().rev() {
        stack.push(Node::Stmt(stmt));
    }
    Preorder { stack }
}

pub struct Preorder<'a> {
    stack: Vec<Node<'a>>,
}

impl<'a> Preorder<'a> {
    fn push_stmts(&mut self, stmts: &'a [Stmt]) {
        for s in stmts.iter().rev() {
            self.stack.push(Node::Stmt(s));
        }
    }

    fn push_expr(&mut self, e: &'a Expr) {
        self.stack.push(Node::Expr(e));
    }

    fn expand_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Var(s) => self.push_expr(&s.value),
            Stmt::Func(s) => self.push_stmts(&s.body),
            Stmt::Return(s) => {
                if let Some(v) = &s.value {
                    self.push_expr(v);
                }
            }
            Stmt::If(s) => {
                self.push_stmts(&s.else_body);
                self.push_stmts(&s.body);
                self.push_expr(&s.condition);
            }
            Stmt::Range(s) => {
                self.push_stmts(&s.body);
                self.push_expr(&s.end);
                if let Some(start) = &s.start {
                    self.push_expr(start);
                }
            }
            Stmt::Expr(s) => self.push_expr(&s.expr),
            Stmt::Learn(s) => {
                // Method bodies are visited without an enclosing node; the
                // FuncStmt wrappers live outside the Stmt enum here.
                for m in s.methods.iter().rev() {
                    self.push_stmts(&m.body);
                }
            }
            Stmt::Fetch(_) | Stmt::Kitty(_) | Stmt::Breed(_) | Stmt::Collar(_) | Stmt::Trick(_) => {}
        }
    }

    fn expand_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::Str(_)
            | Expr::Bool(_)
            | Expr::Nil(_)
            | Expr::Ident(_)
            | Expr::SelfRef(_) => {}
            Expr::Member(e) => self.push_expr(&e.object),
            Expr::Unary(e) => self.push_expr(&e.right),
            Expr::Binary(e) => {
                self.push_expr(&e.right);
                self.push_expr(&e.left);
            }
            Expr::Pipe(e) => {
                self.push_expr(&e.right);
                self.push_expr(&e.left);
            }
            Expr::Catch(e) => {
                self.push_expr(&e.right);
                self.push_expr(&e.left);
            }
            Expr::Index(e) => {
                self.push_expr(&e.index);
                self.push_expr(&e.left);
            }
            Expr::List(e) => {
                for item in e.items.iter().rev() {
                    self.push_expr(item);
                }
            }
            Expr::Map(e) => {
                for (k, v) in e.keys.iter().zip(&e.values).rev() {
                    self.push_expr(v);
                    self.push_expr(k);
                }
            }
            Expr::Call(e) => {
                for a in e.args.iter().rev() {
                    self.push_expr(a);
                }
                self.push_expr(&e.func);
            }
            Expr::Lambda(e) => self.push_expr(&e.body),
            Expr::Match(e) => {
                for arm in e.arms.iter().rev() {
                    self.push_expr(&arm.body);
                    self.stack.push(Node::Pattern(&arm.pattern));
                }
                self.push_expr(&e.subject);
            }
        }
    }

    fn expand_pattern(&mut self, pattern: &'a Pattern) {
        match pattern {
            Pattern::Literal(p) => self.push_expr(&p.value),
            Pattern::Range(p) => {
                self.push_expr(&p.high);
                self.push_expr(&p.low);
            }
            Pattern::Wildcard(_) => {}
        }
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Node<'a>> {
        let node = self.stack.pop()?;
        match node {
            Node::Stmt(s) => self.expand_stmt(s),
            Node::Expr(e) => self.expand_expr(e),
            Node::Pattern(p) => self.expand_pattern(p),
        }
        Some(node)
    }
}
