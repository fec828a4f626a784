use crate::ast::*;
use crate::diagnostics::ParseError;
use crate::position::Position;
use crate::tokens::{Token, TokenKind};

// Expression precedence, lowest to highest.
const PREC_NONE: u8 = 0;
const PREC_CATCH: u8 = 1; // ~>
const PREC_OR: u8 = 2; // ||
const PREC_AND: u8 = 3; // &&
const PREC_EQ: u8 = 4; // == !=
const PREC_CMP: u8 = 5; // < > <= >=
const PREC_PIPE: u8 = 6; // |=|
const PREC_ADD: u8 = 7; // + -
const PREC_MUL: u8 = 8; // * / %
const PREC_UNARY: u8 = 9; // ! -

/// Recursive-descent parser with a Pratt expression core.
///
/// Carries a two-token lookahead (`cur`, `peek`) over the lazy token
/// stream. Errors are collected as a batch; after a local error the parser
/// consumes one token and substitutes a nil-literal placeholder so the
/// enclosing construct can still be recognized.
pub struct Parser<I: Iterator<Item = Token>> {
    tokens: I,
    cur: Token,
    peek: Token,
    errors: Vec<ParseError>,
    next_expr_id: u32,
}

/// Parses a token stream into a program plus the full error batch.
pub fn parse(tokens: impl Iterator<Item = Token>) -> (Program, Vec<ParseError>) {
    Parser::new(tokens).parse()
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        let mut parser = Self {
            tokens,
            cur: Token::eof(Position::default()),
            peek: Token::eof(Position::default()),
            errors: Vec::new(),
            next_expr_id: 0,
        };
        parser.advance();
        parser.advance();
        parser
    }

    pub fn parse(mut self) -> (Program, Vec<ParseError>) {
        let mut stmts = Vec::new();
        self.skip_newlines();
        while self.cur.kind != TokenKind::Eof {
            stmts.push(self.parse_stmt());
            self.skip_newlines();
        }
        let program = Program {
            stmts,
            expr_count: self.next_expr_id,
        };
        (program, self.errors)
    }

    fn advance(&mut self) -> Token {
        let next = self
            .tokens
            .next()
            .unwrap_or_else(|| Token::eof(self.peek.pos.clone()));
        let prev = std::mem::replace(&mut self.cur, std::mem::replace(&mut self.peek, next));
        prev
    }

    fn new_id(&mut self) -> ExprId {
        let id = ExprId(self.next_expr_id);
        self.next_expr_id += 1;
        id
    }

    fn cur_is(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.cur.kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Token {
        if self.cur.kind != kind {
            self.error(format!(
                "expected {} but got {} ({:?})",
                kind, self.cur.kind, self.cur.literal
            ));
        }
        self.advance()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors
            .push(ParseError::new(self.cur.pos.clone(), message));
    }

    fn error_at(&mut self, pos: Position, message: impl Into<String>) {
        self.errors.push(ParseError::new(pos, message));
    }

    fn skip_newlines(&mut self) {
        while matches!(self.cur.kind, TokenKind::Newline | TokenKind::Comment) {
            self.advance();
        }
    }

    fn consume_terminator(&mut self) {
        if self.cur_is(&[TokenKind::Newline, TokenKind::Eof, TokenKind::RBrace]) {
            if self.cur.kind == TokenKind::Newline {
                self.advance();
            }
        }
    }

    // --- Statements ---

    fn parse_stmt(&mut self) -> Stmt {
        match self.cur.kind {
            TokenKind::Nyan => Stmt::Var(self.parse_var_stmt()),
            TokenKind::Meow => Stmt::Func(self.parse_func_stmt()),
            TokenKind::Bring => Stmt::Return(self.parse_return_stmt()),
            TokenKind::Sniff => Stmt::If(self.parse_if_stmt()),
            TokenKind::Purr => Stmt::Range(self.parse_purr_stmt()),
            TokenKind::Nab => Stmt::Fetch(self.parse_fetch_stmt()),
            TokenKind::Kitty => Stmt::Kitty(self.parse_kitty_stmt()),
            TokenKind::Breed => Stmt::Breed(self.parse_breed_stmt()),
            TokenKind::Collar => Stmt::Collar(self.parse_collar_stmt()),
            TokenKind::Trick => Stmt::Trick(self.parse_trick_stmt()),
            TokenKind::Learn => Stmt::Learn(self.parse_learn_stmt()),
            _ => self.parse_expr_stmt_or_assign(),
        }
    }

    fn parse_var_stmt(&mut self) -> VarStmt {
        let token = self.advance(); // nyan
        let name = self.expect(TokenKind::Ident);
        let type_ann = if self.is_type_start() {
            Some(self.parse_type_expr())
        } else {
            None
        };
        self.expect(TokenKind::Assign);
        let value = self.parse_expr(PREC_NONE);
        self.consume_terminator();
        VarStmt {
            token,
            name: name.literal.into(),
            type_ann,
            value,
        }
    }

    fn parse_func_stmt(&mut self) -> FuncStmt {
        let token = self.advance(); // meow
        let name = self.expect(TokenKind::Ident);
        self.expect(TokenKind::LParen);
        let params = self.parse_typed_param_list();
        self.expect(TokenKind::RParen);
        let return_type = if self.is_type_start() {
            Some(self.parse_type_expr())
        } else {
            None
        };
        let body = self.parse_block();
        FuncStmt {
            token,
            name: name.literal.into(),
            params,
            return_type,
            body,
        }
    }

    /// Parses a comma-separated parameter list, then back-fills grouped
    /// annotations: in `a, b int, c string` each name in a run shares the
    /// run's trailing annotation.
    fn parse_typed_param_list(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        if self.cur.kind == TokenKind::RParen {
            return params;
        }
        params.push(self.parse_param());
        while self.cur.kind == TokenKind::Comma {
            self.advance();
            params.push(self.parse_param());
        }
        let mut group_ann: Option<TypeExpr> = None;
        for param in params.iter_mut().rev() {
            match &param.type_ann {
                Some(ann) => group_ann = Some(ann.clone()),
                None => param.type_ann = group_ann.clone(),
            }
        }
        params
    }

    fn parse_param(&mut self) -> Param {
        let name = self.expect(TokenKind::Ident);
        let type_ann = if self.is_type_start() {
            Some(self.parse_type_expr())
        } else {
            None
        };
        Param {
            name: name.literal.into(),
            type_ann,
        }
    }

    fn is_type_start(&self) -> bool {
        matches!(
            self.cur.kind,
            TokenKind::TyInt
                | TokenKind::TyFloat
                | TokenKind::TyString
                | TokenKind::TyBool
                | TokenKind::TyFurball
                | TokenKind::TyList
                | TokenKind::Ident
        )
    }

    fn parse_type_expr(&mut self) -> TypeExpr {
        let token = self.advance();
        match token.kind {
            TokenKind::TyInt => basic(token, "int"),
            TokenKind::TyFloat => basic(token, "float"),
            TokenKind::TyString => basic(token, "string"),
            TokenKind::TyBool => basic(token, "bool"),
            TokenKind::TyFurball => basic(token, "furball"),
            TokenKind::TyList => basic(token, "list"),
            TokenKind::Ident => {
                let name = token.literal.clone().into();
                TypeExpr::Named(NamedType { token, name })
            }
            _ => {
                self.error_at(
                    token.pos.clone(),
                    format!("expected type, got {} ({:?})", token.kind, token.literal),
                );
                let name = token.literal.clone().into();
                TypeExpr::Basic(BasicType { token, name })
            }
        }
    }

    fn parse_block(&mut self) -> Vec<Stmt> {
        self.skip_newlines();
        self.expect(TokenKind::LBrace);
        self.skip_newlines();
        let mut stmts = Vec::new();
        while !self.cur_is(&[TokenKind::RBrace, TokenKind::Eof]) {
            stmts.push(self.parse_stmt());
            self.skip_newlines();
        }
        self.expect(TokenKind::RBrace);
        stmts
    }

    fn parse_return_stmt(&mut self) -> ReturnStmt {
        let token = self.advance(); // bring
        let value = if self.cur_is(&[TokenKind::Newline, TokenKind::RBrace, TokenKind::Eof]) {
            None
        } else {
            Some(self.parse_expr(PREC_NONE))
        };
        self.consume_terminator();
        ReturnStmt { token, value }
    }

    fn parse_if_stmt(&mut self) -> IfStmt {
        let token = self.advance(); // sniff
        self.expect(TokenKind::LParen);
        let condition = self.parse_expr(PREC_NONE);
        self.expect(TokenKind::RParen);
        let body = self.parse_block();
        self.skip_newlines();
        let mut else_body = Vec::new();
        if self.cur.kind == TokenKind::Scratch {
            self.advance();
            if self.cur.kind == TokenKind::Sniff {
                else_body = vec![Stmt::If(self.parse_if_stmt())];
            } else {
                else_body = self.parse_block();
            }
        }
        IfStmt {
            token,
            condition,
            body,
            else_body,
        }
    }

    fn parse_purr_stmt(&mut self) -> RangeStmt {
        let token = self.advance(); // purr
        let var = self.expect(TokenKind::Ident);
        self.expect(TokenKind::LParen);
        let first = self.parse_expr(PREC_NONE);
        if self.cur.kind == TokenKind::DotDot {
            self.advance();
            let end = self.parse_expr(PREC_NONE);
            self.expect(TokenKind::RParen);
            let body = self.parse_block();
            return RangeStmt {
                token,
                var: var.literal.into(),
                start: Some(first),
                end,
                inclusive: true,
                body,
            };
        }
        self.expect(TokenKind::RParen);
        let body = self.parse_block();
        RangeStmt {
            token,
            var: var.literal.into(),
            start: None,
            end: first,
            inclusive: false,
            body,
        }
    }

    fn parse_fetch_stmt(&mut self) -> FetchStmt {
        let token = self.advance(); // nab / fetch
        let path = self.expect(TokenKind::Str);
        self.consume_terminator();
        FetchStmt {
            token,
            path: path.literal,
        }
    }

    fn parse_kitty_stmt(&mut self) -> KittyStmt {
        let token = self.advance(); // kitty
        let name = self.expect(TokenKind::Ident);
        self.skip_newlines();
        self.expect(TokenKind::LBrace);
        self.skip_newlines();
        let mut fields = Vec::new();
        while !self.cur_is(&[TokenKind::RBrace, TokenKind::Eof]) {
            let field_name = self.expect(TokenKind::Ident);
            self.expect(TokenKind::Colon);
            let type_ann = self.parse_type_expr();
            fields.push(KittyField {
                name: field_name.literal.into(),
                type_ann,
            });
            self.skip_newlines();
        }
        self.expect(TokenKind::RBrace);
        KittyStmt {
            token,
            name: name.literal.into(),
            fields,
        }
    }

    fn parse_breed_stmt(&mut self) -> BreedStmt {
        let token = self.advance(); // breed
        let name = self.expect(TokenKind::Ident);
        self.expect(TokenKind::Assign);
        let original = self.parse_type_expr();
        self.consume_terminator();
        BreedStmt {
            token,
            name: name.literal.into(),
            original,
        }
    }

    fn parse_collar_stmt(&mut self) -> CollarStmt {
        let token = self.advance(); // collar
        let name = self.expect(TokenKind::Ident);
        self.expect(TokenKind::Assign);
        let wrapped = self.parse_type_expr();
        self.consume_terminator();
        CollarStmt {
            token,
            name: name.literal.into(),
            wrapped,
        }
    }

    fn parse_trick_stmt(&mut self) -> TrickStmt {
        let token = self.advance(); // trick
        let name = self.expect(TokenKind::Ident);
        self.skip_newlines();
        self.expect(TokenKind::LBrace);
        self.skip_newlines();
        let mut methods = Vec::new();
        while self.cur.kind == TokenKind::Meow {
            let sig_token = self.advance();
            let sig_name = self.expect(TokenKind::Ident);
            self.expect(TokenKind::LParen);
            let params = self.parse_typed_param_list();
            self.expect(TokenKind::RParen);
            let return_type = if self.is_type_start() {
                Some(self.parse_type_expr())
            } else {
                None
            };
            methods.push(MethodSig {
                token: sig_token,
                name: sig_name.literal.into(),
                params,
                return_type,
            });
            self.skip_newlines();
        }
        self.expect(TokenKind::RBrace);
        TrickStmt {
            token,
            name: name.literal.into(),
            methods,
        }
    }

    fn parse_learn_stmt(&mut self) -> LearnStmt {
        let token = self.advance(); // learn
        let type_name = self.expect(TokenKind::Ident);
        self.skip_newlines();
        self.expect(TokenKind::LBrace);
        self.skip_newlines();
        let mut methods = Vec::new();
        while self.cur.kind == TokenKind::Meow {
            methods.push(self.parse_func_stmt());
            self.skip_newlines();
        }
        self.expect(TokenKind::RBrace);
        LearnStmt {
            token,
            type_name: type_name.literal.into(),
            methods,
        }
    }

    fn parse_expr_stmt_or_assign(&mut self) -> Stmt {
        let expr = self.parse_expr(PREC_NONE);
        // `x = 42` is an implicit variable declaration; the checker rejects
        // same-scope redeclaration.
        if let Expr::Ident(ident) = &expr {
            if self.cur.kind == TokenKind::Assign {
                let token = ident.token.clone();
                let name = ident.name.clone();
                self.advance();
                let value = self.parse_expr(PREC_NONE);
                self.consume_terminator();
                return Stmt::Var(VarStmt {
                    token,
                    name,
                    type_ann: None,
                    value,
                });
            }
        }
        self.consume_terminator();
        Stmt::Expr(ExprStmt {
            token: expr.token().clone(),
            expr,
        })
    }

    // --- Expressions (Pratt core) ---

    fn infix_prec(kind: TokenKind) -> u8 {
        match kind {
            TokenKind::TildeArrow => PREC_CATCH,
            TokenKind::Or => PREC_OR,
            TokenKind::And => PREC_AND,
            TokenKind::Eq | TokenKind::NotEq => PREC_EQ,
            TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => PREC_CMP,
            TokenKind::Pipe => PREC_PIPE,
            TokenKind::Plus | TokenKind::Minus => PREC_ADD,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => PREC_MUL,
            _ => PREC_NONE,
        }
    }

    fn parse_expr(&mut self, min_prec: u8) -> Expr {
        let mut left = self.parse_prefix();
        loop {
            let prec = Self::infix_prec(self.cur.kind);
            if prec <= min_prec {
                break;
            }
            left = self.parse_infix(left, prec);
        }
        left
    }

    fn parse_prefix(&mut self) -> Expr {
        match self.cur.kind {
            TokenKind::Int => self.parse_int(),
            TokenKind::Float => self.parse_float(),
            TokenKind::Str => {
                let token = self.advance();
                Expr::Str(StringLit {
                    id: self.new_id(),
                    value: token.literal.clone(),
                    token,
                })
            }
            TokenKind::Yarn => {
                let token = self.advance();
                Expr::Bool(BoolLit {
                    id: self.new_id(),
                    token,
                    value: true,
                })
            }
            TokenKind::Hairball => {
                let token = self.advance();
                Expr::Bool(BoolLit {
                    id: self.new_id(),
                    token,
                    value: false,
                })
            }
            TokenKind::Catnap => {
                let token = self.advance();
                Expr::Nil(NilLit {
                    id: self.new_id(),
                    token,
                })
            }
            TokenKind::Ident => self.parse_ident_expr(),
            TokenKind::SelfKw => {
                let token = self.advance();
                let expr = Expr::SelfRef(SelfExpr {
                    id: self.new_id(),
                    token,
                });
                self.parse_postfix(expr)
            }
            // `hiss` is a keyword but calls like an ordinary builtin.
            TokenKind::Hiss => {
                let token = self.advance();
                let expr = Expr::Ident(Ident {
                    id: self.new_id(),
                    name: token.literal.clone().into(),
                    token,
                });
                self.parse_postfix(expr)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr(PREC_NONE);
                self.expect(TokenKind::RParen);
                self.parse_postfix(expr)
            }
            TokenKind::Minus | TokenKind::Not => {
                let token = self.advance();
                let op = if token.kind == TokenKind::Minus {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Not
                };
                let right = self.parse_expr(PREC_UNARY);
                Expr::Unary(Box::new(UnaryExpr {
                    id: self.new_id(),
                    token,
                    op,
                    right,
                }))
            }
            TokenKind::Paw => self.parse_lambda(),
            TokenKind::LBracket => self.parse_list_lit(),
            TokenKind::LBrace => self.parse_map_lit(),
            TokenKind::Peek => self.parse_match(),
            _ => {
                self.error(format!(
                    "unexpected token {} ({:?})",
                    self.cur.kind, self.cur.literal
                ));
                let token = self.advance();
                Expr::Nil(NilLit {
                    id: self.new_id(),
                    token,
                })
            }
        }
    }

    fn parse_infix(&mut self, left: Expr, prec: u8) -> Expr {
        let token = self.advance();
        match token.kind {
            TokenKind::Pipe => {
                let right = self.parse_expr(prec);
                Expr::Pipe(Box::new(PipeExpr {
                    id: self.new_id(),
                    token,
                    left,
                    right,
                }))
            }
            TokenKind::TildeArrow => {
                let right = self.parse_expr(prec);
                Expr::Catch(Box::new(CatchExpr {
                    id: self.new_id(),
                    token,
                    left,
                    right,
                }))
            }
            _ => {
                let op = match token.kind {
                    TokenKind::Plus => BinOp::Add,
                    TokenKind::Minus => BinOp::Sub,
                    TokenKind::Star => BinOp::Mul,
                    TokenKind::Slash => BinOp::Div,
                    TokenKind::Percent => BinOp::Mod,
                    TokenKind::Eq => BinOp::Eq,
                    TokenKind::NotEq => BinOp::NotEq,
                    TokenKind::Lt => BinOp::Lt,
                    TokenKind::Gt => BinOp::Gt,
                    TokenKind::LtEq => BinOp::LtEq,
                    TokenKind::GtEq => BinOp::GtEq,
                    TokenKind::And => BinOp::And,
                    TokenKind::Or => BinOp::Or,
                    other => {
                        self.error_at(
                            token.pos.clone(),
                            format!("unexpected infix operator {other}"),
                        );
                        BinOp::Add
                    }
                };
                let right = self.parse_expr(prec);
                Expr::Binary(Box::new(BinaryExpr {
                    id: self.new_id(),
                    token,
                    op,
                    left,
                    right,
                }))
            }
        }
    }

    fn parse_int(&mut self) -> Expr {
        let token = self.advance();
        let value = match token.literal.parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                self.error_at(
                    token.pos.clone(),
                    format!("invalid integer {:?}", token.literal),
                );
                0
            }
        };
        Expr::Int(IntLit {
            id: self.new_id(),
            token,
            value,
        })
    }

    fn parse_float(&mut self) -> Expr {
        let token = self.advance();
        let value = match token.literal.parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                self.error_at(
                    token.pos.clone(),
                    format!("invalid float {:?}", token.literal),
                );
                0.0
            }
        };
        Expr::Float(FloatLit {
            id: self.new_id(),
            token,
            value,
        })
    }

    fn parse_ident_expr(&mut self) -> Expr {
        let token = self.advance();
        let expr = Expr::Ident(Ident {
            id: self.new_id(),
            name: token.literal.clone().into(),
            token,
        });
        self.parse_postfix(expr)
    }

    /// Postfix chain at call precedence: `.member`, `(args)`, `[index]`.
    fn parse_postfix(&mut self, mut expr: Expr) -> Expr {
        loop {
            match self.cur.kind {
                TokenKind::Dot => {
                    let token = self.advance();
                    let member = self.expect(TokenKind::Ident);
                    expr = Expr::Member(Box::new(MemberExpr {
                        id: self.new_id(),
                        token,
                        object: expr,
                        member: member.literal.into(),
                    }));
                }
                TokenKind::LParen => {
                    let token = self.advance();
                    let args = self.parse_arg_list();
                    self.expect(TokenKind::RParen);
                    expr = Expr::Call(Box::new(CallExpr {
                        id: self.new_id(),
                        token,
                        func: expr,
                        args,
                    }));
                }
                TokenKind::LBracket => {
                    let token = self.advance();
                    let index = self.parse_expr(PREC_NONE);
                    self.expect(TokenKind::RBracket);
                    expr = Expr::Index(Box::new(IndexExpr {
                        id: self.new_id(),
                        token,
                        left: expr,
                        index,
                    }));
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_arg_list(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if self.cur.kind == TokenKind::RParen {
            return args;
        }
        args.push(self.parse_expr(PREC_NONE));
        while self.cur.kind == TokenKind::Comma {
            self.advance();
            args.push(self.parse_expr(PREC_NONE));
        }
        args
    }

    fn parse_lambda(&mut self) -> Expr {
        let token = self.advance(); // paw
        self.expect(TokenKind::LParen);
        let params = self.parse_typed_param_list();
        self.expect(TokenKind::RParen);
        self.expect(TokenKind::LBrace);
        self.skip_newlines();
        let body = self.parse_expr(PREC_NONE);
        self.skip_newlines();
        self.expect(TokenKind::RBrace);
        Expr::Lambda(Box::new(LambdaExpr {
            id: self.new_id(),
            token,
            params,
            body,
        }))
    }

    fn parse_list_lit(&mut self) -> Expr {
        let token = self.advance(); // [
        let mut items = Vec::new();
        self.skip_newlines();
        if self.cur.kind != TokenKind::RBracket {
            items.push(self.parse_expr(PREC_NONE));
            while self.cur.kind == TokenKind::Comma {
                self.advance();
                self.skip_newlines();
                if self.cur.kind == TokenKind::RBracket {
                    break;
                }
                items.push(self.parse_expr(PREC_NONE));
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::RBracket);
        Expr::List(ListLit {
            id: self.new_id(),
            token,
            items,
        })
    }

    fn parse_map_lit(&mut self) -> Expr {
        let token = self.advance(); // {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        self.skip_newlines();
        if self.cur.kind != TokenKind::RBrace {
            loop {
                keys.push(self.parse_expr(PREC_NONE));
                self.expect(TokenKind::Colon);
                values.push(self.parse_expr(PREC_NONE));
                if self.cur.kind != TokenKind::Comma {
                    break;
                }
                self.advance();
                self.skip_newlines();
                if self.cur.kind == TokenKind::RBrace {
                    break;
                }
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::RBrace);
        Expr::Map(MapLit {
            id: self.new_id(),
            token,
            keys,
            values,
        })
    }

    fn parse_match(&mut self) -> Expr {
        let token = self.advance(); // peek
        self.expect(TokenKind::LParen);
        let subject = self.parse_expr(PREC_NONE);
        self.expect(TokenKind::RParen);
        self.skip_newlines();
        self.expect(TokenKind::LBrace);
        self.skip_newlines();
        let mut arms = Vec::new();
        while !self.cur_is(&[TokenKind::RBrace, TokenKind::Eof]) {
            let pattern = self.parse_pattern();
            self.expect(TokenKind::Arrow);
            let body = self.parse_expr(PREC_NONE);
            arms.push(MatchArm { pattern, body });
            self.skip_newlines();
            if self.cur.kind == TokenKind::Comma {
                self.advance();
                self.skip_newlines();
            }
        }
        self.expect(TokenKind::RBrace);
        Expr::Match(Box::new(MatchExpr {
            id: self.new_id(),
            token,
            subject,
            arms,
        }))
    }

    fn parse_pattern(&mut self) -> Pattern {
        if self.cur.kind == TokenKind::Ident && self.cur.literal == "_" {
            let token = self.advance();
            return Pattern::Wildcard(WildcardPattern { token });
        }
        let expr = self.parse_prefix();
        if self.cur.kind == TokenKind::DotDot {
            let token = self.advance();
            let high = self.parse_prefix();
            return Pattern::Range(RangePattern {
                token,
                low: expr,
                high,
            });
        }
        Pattern::Literal(LiteralPattern {
            token: expr.token().clone(),
            value: expr,
        })
    }
}

fn basic(token: Token, name: &str) -> TypeExpr {
    TypeExpr::Basic(BasicType {
        token,
        name: name.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_ok(source: &str) -> Program {
        let (program, errors) = parse(Lexer::new(source, "test.nyan"));
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        program
    }

    #[test]
    fn parses_var_with_annotation() {
        let program = parse_ok("nyan x int = 42");
        let Stmt::Var(var) = &program.stmts[0] else {
            panic!("expected var statement");
        };
        assert_eq!(var.name, "x");
        assert!(matches!(var.type_ann, Some(TypeExpr::Basic(_))));
        assert!(matches!(var.value, Expr::Int(_)));
    }

    #[test]
    fn promotes_bare_assignment_to_var() {
        let program = parse_ok("x = 42");
        assert!(matches!(&program.stmts[0], Stmt::Var(v) if v.name == "x"));
    }

    #[test]
    fn grouped_params_share_the_annotation() {
        let program = parse_ok("meow f(a, b int, c string) int {\n  bring a\n}");
        let Stmt::Func(func) = &program.stmts[0] else {
            panic!("expected func statement");
        };
        let anns: Vec<_> = func
            .params
            .iter()
            .map(|p| match &p.type_ann {
                Some(TypeExpr::Basic(b)) => b.name.as_str().to_owned(),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(anns, ["int", "int", "string"]);
    }

    #[test]
    fn precedence_of_pipe_between_compare_and_add() {
        // a < b |=| f parses as a < (b |=| f)
        let program = parse_ok("nyan r = 1 < 2 |=| f");
        let Stmt::Var(var) = &program.stmts[0] else {
            panic!()
        };
        let Expr::Binary(cmp) = &var.value else {
            panic!("expected comparison at the top: {:?}", var.value);
        };
        assert_eq!(cmp.op, BinOp::Lt);
        assert!(matches!(cmp.right, Expr::Pipe(_)));
    }

    #[test]
    fn catch_binds_loosest() {
        let program = parse_ok("nyan r = 1 + 2 ~> 0");
        let Stmt::Var(var) = &program.stmts[0] else {
            panic!()
        };
        assert!(matches!(var.value, Expr::Catch(_)));
    }

    #[test]
    fn infix_is_left_associative() {
        let program = parse_ok("nyan r = 1 - 2 - 3");
        let Stmt::Var(var) = &program.stmts[0] else {
            panic!()
        };
        let Expr::Binary(outer) = &var.value else {
            panic!()
        };
        assert_eq!(outer.op, BinOp::Sub);
        assert!(matches!(&outer.left, Expr::Binary(inner) if inner.op == BinOp::Sub));
    }

    #[test]
    fn purr_forms() {
        let program = parse_ok("purr i (5) {\n  nya(i)\n}\npurr j (1..3) {\n  nya(j)\n}");
        let Stmt::Range(count) = &program.stmts[0] else {
            panic!()
        };
        assert!(count.start.is_none());
        assert!(!count.inclusive);
        let Stmt::Range(range) = &program.stmts[1] else {
            panic!()
        };
        assert!(range.start.is_some());
        assert!(range.inclusive);
    }

    #[test]
    fn scratch_sniff_chains() {
        let program = parse_ok("sniff (x) {\n  nya(1)\n} scratch sniff (y) {\n  nya(2)\n} scratch {\n  nya(3)\n}");
        let Stmt::If(outer) = &program.stmts[0] else {
            panic!()
        };
        assert_eq!(outer.else_body.len(), 1);
        assert!(matches!(&outer.else_body[0], Stmt::If(inner) if !inner.else_body.is_empty()));
    }

    #[test]
    fn member_chain_and_call() {
        let program = parse_ok("nya(cat.paws.count())");
        let Stmt::Expr(stmt) = &program.stmts[0] else {
            panic!()
        };
        let Expr::Call(nya_call) = &stmt.expr else {
            panic!()
        };
        assert!(matches!(nya_call.args[0], Expr::Call(_)));
    }

    #[test]
    fn patterns() {
        let program = parse_ok("nyan r = peek(x) {\n  1 => \"one\"\n  1..10 => \"small\"\n  _ => \"other\"\n}");
        let Stmt::Var(var) = &program.stmts[0] else {
            panic!()
        };
        let Expr::Match(m) = &var.value else { panic!() };
        assert!(matches!(m.arms[0].pattern, Pattern::Literal(_)));
        assert!(matches!(m.arms[1].pattern, Pattern::Range(_)));
        assert!(matches!(m.arms[2].pattern, Pattern::Wildcard(_)));
    }

    #[test]
    fn type_level_statements() {
        let program = parse_ok(
            "kitty Cat {\n  name: string\n  age: int\n}\nbreed Score = int\ncollar UserId = int\ntrick Noisy {\n  meow speak() string\n}\nlearn Cat {\n  meow greet() string {\n    bring \"hi \" + self.name\n  }\n}",
        );
        assert!(matches!(&program.stmts[0], Stmt::Kitty(k) if k.fields.len() == 2));
        assert!(matches!(&program.stmts[1], Stmt::Breed(_)));
        assert!(matches!(&program.stmts[2], Stmt::Collar(_)));
        assert!(matches!(&program.stmts[3], Stmt::Trick(t) if t.methods.len() == 1));
        assert!(matches!(&program.stmts[4], Stmt::Learn(l) if l.methods.len() == 1));
    }

    #[test]
    fn errors_are_batched_and_recovered() {
        let (program, errors) = parse(Lexer::new("nyan = 1\nnyan y = )\nnya(y)", "test.nyan"));
        assert!(errors.len() >= 2, "want at least two errors, got {errors:?}");
        // The parser kept going and still produced statements.
        assert!(program.stmts.len() >= 2);
        let rendered = errors[0].to_string();
        assert!(rendered.starts_with("test.nyan:1:"), "{rendered}");
        assert!(rendered.contains("Hiss!"), "{rendered}");
        assert!(rendered.ends_with("nya~"), "{rendered}");
    }

    #[test]
    fn expr_ids_are_dense_and_unique() {
        let program = parse_ok("nyan x = 1 + 2\nnya(x)");
        let mut seen = std::collections::HashSet::new();
        for node in crate::ast::preorder(&program) {
            if let crate::ast::Node::Expr(e) = node {
                assert!(seen.insert(e.id()), "duplicate id {:?}", e.id());
                assert!(e.id().0 < program.expr_count);
            }
        }
        assert!(!seen.is_empty());
    }
}
