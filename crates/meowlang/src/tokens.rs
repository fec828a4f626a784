use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a lexical token.
///
/// Kinds partition into: special, literals, operators, delimiters, keywords,
/// and type keywords. `nya`, `lick`, `picky`, `curl`, `gag` and the other
/// builtins are ordinary identifiers, not keywords; the checker and the
/// interpreter resolve them by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    // Special
    Illegal,
    Eof,
    Newline,
    Comment,

    // Literals
    Ident,
    Int,
    Float,
    Str,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Assign,     // =
    Eq,         // ==
    NotEq,      // !=
    Lt,         // <
    Gt,         // >
    LtEq,       // <=
    GtEq,       // >=
    And,        // &&
    Or,         // ||
    Not,        // !
    Pipe,       // |=|
    TildeArrow, // ~>
    Dot,        // .
    DotDot,     // ..
    Arrow,      // =>

    // Delimiters
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Colon,    // :

    // Keywords
    Nyan,    // variable declaration
    Meow,    // function definition
    Bring,   // return
    Sniff,   // if
    Scratch, // else
    Purr,    // range loop
    Paw,     // lambda
    Peek,    // match
    Hiss,    // raise failure
    Nab,     // import (also spelled "fetch")
    Catnap,  // nil literal
    Yarn,    // true literal
    Hairball, // false literal
    Kitty,   // record declaration
    Breed,   // transparent alias
    Collar,  // nominal wrapper
    Trick,   // structural interface
    Learn,   // method attachment
    SelfKw,  // self reference inside learn bodies

    // Type keywords
    TyInt,
    TyFloat,
    TyString,
    TyBool,
    TyFurball,
    TyList,
}

impl TokenKind {
    /// Returns the token kind for an identifier, resolving keywords via the
    /// static keyword table.
    pub fn lookup_ident(ident: &str) -> TokenKind {
        use TokenKind::*;
        match ident {
            "nyan" => Nyan,
            "meow" => Meow,
            "bring" => Bring,
            "sniff" => Sniff,
            "scratch" => Scratch,
            "purr" => Purr,
            "paw" => Paw,
            "peek" => Peek,
            "hiss" => Hiss,
            "nab" | "fetch" => Nab,
            "catnap" => Catnap,
            "yarn" => Yarn,
            "hairball" => Hairball,
            "kitty" => Kitty,
            "breed" => Breed,
            "collar" => Collar,
            "trick" => Trick,
            "learn" => Learn,
            "self" => SelfKw,
            "int" => TyInt,
            "float" => TyFloat,
            "string" => TyString,
            "bool" => TyBool,
            "furball" => TyFurball,
            "list" => TyList,
            _ => Ident,
        }
    }

    /// Reports whether the kind is a keyword (including type keywords).
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Nyan | Meow
                | Bring
                | Sniff
                | Scratch
                | Purr
                | Paw
                | Peek
                | Hiss
                | Nab
                | Catnap
                | Yarn
                | Hairball
                | Kitty
                | Breed
                | Collar
                | Trick
                | Learn
                | SelfKw
                | TyInt
                | TyFloat
                | TyString
                | TyBool
                | TyFurball
                | TyList
        )
    }

    /// A human-readable name for diagnostics: operators, delimiters, and
    /// keywords show their surface form, literal kinds show a description.
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            Illegal => "illegal token",
            Eof => "end of file",
            Newline => "newline",
            Comment => "comment",
            Ident => "identifier",
            Int => "int literal",
            Float => "float literal",
            Str => "string literal",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Assign => "=",
            Eq => "==",
            NotEq => "!=",
            Lt => "<",
            Gt => ">",
            LtEq => "<=",
            GtEq => ">=",
            And => "&&",
            Or => "||",
            Not => "!",
            Pipe => "|=|",
            TildeArrow => "~>",
            Dot => ".",
            DotDot => "..",
            Arrow => "=>",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Comma => ",",
            Colon => ":",
            Nyan => "nyan",
            Meow => "meow",
            Bring => "bring",
            Sniff => "sniff",
            Scratch => "scratch",
            Purr => "purr",
            Paw => "paw",
            Peek => "peek",
            Hiss => "hiss",
            Nab => "nab",
            Catnap => "catnap",
            Yarn => "yarn",
            Hairball => "hairball",
            Kitty => "kitty",
            Breed => "breed",
            Collar => "collar",
            Trick => "trick",
            Learn => "learn",
            SelfKw => "self",
            TyInt => "int",
            TyFloat => "float",
            TyString => "string",
            TyBool => "bool",
            TyFurball => "furball",
            TyList => "list",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// A lexical token with its exact source text and location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source slice: for strings without the quotes, for block
    /// comments without the `-~`/`~-` delimiters.
    pub literal: String,
    pub pos: Position,
    /// True when `kind` is `Comment` and the comment uses `-~ … ~-` form.
    pub block_comment: bool,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, pos: Position) -> Self {
        Self {
            kind,
            literal: literal.into(),
            pos,
            block_comment: false,
        }
    }

    pub fn eof(pos: Position) -> Self {
        Self::new(TokenKind::Eof, "", pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(TokenKind::lookup_ident("nyan"), TokenKind::Nyan);
        assert_eq!(TokenKind::lookup_ident("peek"), TokenKind::Peek);
        assert_eq!(TokenKind::lookup_ident("nab"), TokenKind::Nab);
        assert_eq!(TokenKind::lookup_ident("fetch"), TokenKind::Nab);
        assert_eq!(TokenKind::lookup_ident("furball"), TokenKind::TyFurball);
        assert_eq!(TokenKind::lookup_ident("nya"), TokenKind::Ident);
        assert_eq!(TokenKind::lookup_ident("gag"), TokenKind::Ident);
        assert_eq!(TokenKind::lookup_ident("tuna"), TokenKind::Ident);
    }

    #[test]
    fn keyword_predicate() {
        assert!(TokenKind::Nyan.is_keyword());
        assert!(TokenKind::TyList.is_keyword());
        assert!(!TokenKind::Ident.is_keyword());
        assert!(!TokenKind::Pipe.is_keyword());
    }
}
