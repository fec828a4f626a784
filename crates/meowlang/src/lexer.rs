use crate::position::Position;
use crate::tokens::{Token, TokenKind};
use smol_str::SmolStr;

/// Tokenizes Meow source code.
///
/// The lexer is a lazy, single-pass iterator over tokens ending with `Eof`.
/// Whitespace other than newlines is discarded; newlines are emitted as
/// tokens so the parser can terminate statements, and comments are emitted
/// so the formatter can preserve them. The lexer never fails: unexpected
/// input produces an `Illegal` token and scanning continues.
pub struct Lexer<'a> {
    src: &'a str,
    file: SmolStr,
    pos: usize,
    line: u32,
    col: u32,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: impl Into<SmolStr>) -> Self {
        Self {
            src: source,
            file: file.into(),
            pos: 0,
            line: 1,
            col: 1,
            done: false,
        }
    }

    /// Collects the full token sequence, including the trailing `Eof`.
    pub fn tokenize(self) -> Vec<Token> {
        self.collect()
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    #[inline]
    fn peek_second(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(1)
    }

    #[inline]
    fn peek_third(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(2)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    #[inline]
    fn current_pos(&self) -> Position {
        Position::new(self.file.clone(), self.line, self.col)
    }

    fn make(&self, kind: TokenKind, literal: impl Into<String>, pos: Position) -> Token {
        Token::new(kind, literal, pos)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.bump();
        }
    }

    fn read_string(&mut self) -> Token {
        let pos = self.current_pos();
        self.bump(); // opening quote
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '"' {
                let literal = &self.src[start..self.pos];
                self.bump(); // closing quote
                return self.make(TokenKind::Str, literal, pos);
            }
            if ch == '\\' {
                // The backslash protects the next rune; both stay in the literal.
                self.bump();
            }
            self.bump();
        }
        self.make(TokenKind::Illegal, &self.src[start..self.pos], pos)
    }

    fn read_number(&mut self) -> Token {
        let pos = self.current_pos();
        let start = self.pos;
        let mut is_float = false;
        while let Some(ch) = self.peek() {
            if ch == '.' && self.peek_second() != Some('.') {
                if is_float {
                    break;
                }
                is_float = true;
                self.bump();
                continue;
            }
            if !ch.is_ascii_digit() {
                break;
            }
            self.bump();
        }
        let literal = &self.src[start..self.pos];
        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Int
        };
        self.make(kind, literal, pos)
    }

    fn read_ident(&mut self) -> Token {
        let pos = self.current_pos();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !ch.is_alphabetic() && !ch.is_ascii_digit() && ch != '_' {
                break;
            }
            self.bump();
        }
        let literal = &self.src[start..self.pos];
        self.make(TokenKind::lookup_ident(literal), literal, pos)
    }

    fn read_line_comment(&mut self) -> Token {
        let pos = self.current_pos();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
        self.make(TokenKind::Comment, &self.src[start..self.pos], pos)
    }

    /// Reads a `-~ … ~-` block comment; the leading `-` is already consumed
    /// and the cursor sits on `~`. Delimiters are stripped from the literal.
    fn read_block_comment(&mut self, pos: Position) -> Token {
        self.bump(); // ~
        let start = self.pos;
        while self.peek().is_some() {
            if self.peek() == Some('~') && self.peek_second() == Some('-') {
                let literal = &self.src[start..self.pos];
                self.bump();
                self.bump();
                let mut tok = self.make(TokenKind::Comment, literal, pos);
                tok.block_comment = true;
                return tok;
            }
            self.bump();
        }
        self.make(TokenKind::Illegal, &self.src[start..self.pos], pos)
    }

    /// Consumes one rune and emits `kind` when it equals `follow`, otherwise
    /// emits `alone` with the single-rune literal.
    fn two_char(
        &mut self,
        pos: Position,
        first: char,
        follow: char,
        kind: TokenKind,
        joined: &str,
        alone: TokenKind,
    ) -> Token {
        if self.peek() == Some(follow) {
            self.bump();
            self.make(kind, joined, pos)
        } else {
            self.make(alone, first.to_string(), pos)
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        if self.pos >= self.src.len() {
            if self.done {
                return None;
            }
            self.done = true;
            return Some(Token::eof(self.current_pos()));
        }

        let pos = self.current_pos();
        let ch = self.peek()?;

        let token = match ch {
            '\n' => {
                self.bump();
                self.make(TokenKind::Newline, "\n", pos)
            }
            '"' => self.read_string(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_ident(),
            '+' => {
                self.bump();
                self.make(TokenKind::Plus, "+", pos)
            }
            '*' => {
                self.bump();
                self.make(TokenKind::Star, "*", pos)
            }
            '/' => {
                self.bump();
                self.make(TokenKind::Slash, "/", pos)
            }
            '%' => {
                self.bump();
                self.make(TokenKind::Percent, "%", pos)
            }
            '(' => {
                self.bump();
                self.make(TokenKind::LParen, "(", pos)
            }
            ')' => {
                self.bump();
                self.make(TokenKind::RParen, ")", pos)
            }
            '{' => {
                self.bump();
                self.make(TokenKind::LBrace, "{", pos)
            }
            '}' => {
                self.bump();
                self.make(TokenKind::RBrace, "}", pos)
            }
            '[' => {
                self.bump();
                self.make(TokenKind::LBracket, "[", pos)
            }
            ']' => {
                self.bump();
                self.make(TokenKind::RBracket, "]", pos)
            }
            ',' => {
                self.bump();
                self.make(TokenKind::Comma, ",", pos)
            }
            ':' => {
                self.bump();
                self.make(TokenKind::Colon, ":", pos)
            }
            '-' => {
                self.bump();
                if self.peek() == Some('~') {
                    self.read_block_comment(pos)
                } else {
                    self.make(TokenKind::Minus, "-", pos)
                }
            }
            '=' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    self.make(TokenKind::Eq, "==", pos)
                } else if self.peek() == Some('>') {
                    self.bump();
                    self.make(TokenKind::Arrow, "=>", pos)
                } else {
                    self.make(TokenKind::Assign, "=", pos)
                }
            }
            '!' => {
                self.bump();
                self.two_char(pos, '!', '=', TokenKind::NotEq, "!=", TokenKind::Not)
            }
            '<' => {
                self.bump();
                self.two_char(pos, '<', '=', TokenKind::LtEq, "<=", TokenKind::Lt)
            }
            '>' => {
                self.bump();
                self.two_char(pos, '>', '=', TokenKind::GtEq, ">=", TokenKind::Gt)
            }
            '&' => {
                self.bump();
                self.two_char(pos, '&', '&', TokenKind::And, "&&", TokenKind::Illegal)
            }
            '|' => {
                self.bump();
                if self.peek() == Some('=') && self.peek_second() == Some('|') {
                    self.bump();
                    self.bump();
                    self.make(TokenKind::Pipe, "|=|", pos)
                } else if self.peek() == Some('|') {
                    self.bump();
                    self.make(TokenKind::Or, "||", pos)
                } else {
                    self.make(TokenKind::Illegal, "|", pos)
                }
            }
            '.' => {
                self.bump();
                self.two_char(pos, '.', '.', TokenKind::DotDot, "..", TokenKind::Dot)
            }
            '~' => {
                self.bump();
                self.two_char(pos, '~', '>', TokenKind::TildeArrow, "~>", TokenKind::Illegal)
            }
            '#' => self.read_line_comment(),
            other => {
                self.bump();
                self.make(TokenKind::Illegal, other.to_string(), pos)
            }
        };
        Some(token)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}
