use crate::lexer::Lexer;
use crate::tokens::{Token, TokenKind};

/// Formatter settings.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub indent_width: usize,
    pub max_blank_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indent_width: 2,
            max_blank_lines: 1,
        }
    }
}

/// Formats Meow source code with the canonical style.
pub fn format_source(source: &str, file: &str) -> String {
    format(Lexer::new(source, file).tokenize(), Config::default())
}

/// Formats a token stream into normalized source: 2-space indentation per
/// brace depth, capped blank lines, `} scratch {` joined on one line, and
/// the spacing table below. Comments are preserved (block comments are
/// re-wrapped in their `-~ ~-` delimiters).
pub fn format(tokens: Vec<Token>, cfg: Config) -> String {
    let mut buf = String::new();
    let mut indent: usize = 0;
    let mut blank_count = 0usize;
    let mut line_start = true;
    let mut prev_meaningful: Option<TokenKind> = None;
    let mut after_brace = false;
    let mut first_token = true;

    let next_meaningful = |from: usize| -> TokenKind {
        for tok in &tokens[from..] {
            if !matches!(tok.kind, TokenKind::Newline | TokenKind::Comment) {
                return tok.kind;
            }
        }
        TokenKind::Eof
    };

    let write_indent = |buf: &mut String, indent: usize| {
        for _ in 0..indent * cfg.indent_width {
            buf.push(' ');
        }
    };

    for i in 0..tokens.len() {
        let tok = &tokens[i];
        if tok.kind == TokenKind::Eof {
            break;
        }

        match tok.kind {
            TokenKind::Newline => {
                if first_token || after_brace {
                    continue;
                }
                // Keep `}` and `scratch` on one line.
                if prev_meaningful == Some(TokenKind::RBrace)
                    && next_meaningful(i + 1) == TokenKind::Scratch
                {
                    continue;
                }
                if line_start {
                    blank_count += 1;
                    if blank_count > cfg.max_blank_lines {
                        continue;
                    }
                } else {
                    blank_count = 0;
                }
                buf.push('\n');
                line_start = true;
                continue;
            }
            TokenKind::Comment => {
                after_brace = false;
                if line_start {
                    write_indent(&mut buf, indent);
                } else {
                    buf.push(' ');
                }
                if tok.block_comment {
                    // The lexer strips the delimiters; re-wrap here.
                    buf.push_str("-~");
                    buf.push_str(&tok.literal);
                    buf.push_str("~-");
                } else {
                    buf.push_str(&tok.literal);
                }
                line_start = false;
                blank_count = 0;
                first_token = false;
                prev_meaningful = Some(tok.kind);
                continue;
            }
            _ => {}
        }

        after_brace = false;

        // Closing brace dedents before writing.
        if tok.kind == TokenKind::RBrace {
            indent = indent.saturating_sub(1);
            if !line_start {
                buf.push('\n');
            }
            blank_count = 0;
            write_indent(&mut buf, indent);
            buf.push('}');
            line_start = false;
            first_token = false;
            prev_meaningful = Some(tok.kind);
            continue;
        }

        // `scratch` after `}` stays on the same line.
        if tok.kind == TokenKind::Scratch && prev_meaningful == Some(TokenKind::RBrace) {
            buf.push_str(" scratch");
            line_start = false;
            blank_count = 0;
            first_token = false;
            prev_meaningful = Some(tok.kind);
            continue;
        }

        if line_start {
            blank_count = 0;
            write_indent(&mut buf, indent);
            line_start = false;
        } else if needs_space_before(tok.kind, prev_meaningful) {
            buf.push(' ');
        }

        match tok.kind {
            TokenKind::Str => {
                buf.push('"');
                buf.push_str(&tok.literal);
                buf.push('"');
            }
            _ => buf.push_str(&tok.literal),
        }

        if tok.kind == TokenKind::LBrace {
            buf.push('\n');
            line_start = true;
            indent += 1;
            after_brace = true;
        }

        first_token = false;
        prev_meaningful = Some(tok.kind);
    }

    let trimmed = buf.trim_end_matches('\n');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

fn is_binary_op(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::Assign
            | TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq
            | TokenKind::And
            | TokenKind::Or
            | TokenKind::Pipe
            | TokenKind::TildeArrow
            | TokenKind::DotDot
            | TokenKind::Arrow
    )
}

/// Keywords that take a paren-delimited condition where a space before `(`
/// is wanted.
fn is_block_keyword(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Sniff | TokenKind::Purr)
}

fn needs_space_before(cur: TokenKind, prev: Option<TokenKind>) -> bool {
    let Some(prev) = prev else {
        return false;
    };
    // Never a space just inside delimiters.
    if matches!(prev, TokenKind::LParen | TokenKind::LBracket) {
        return false;
    }
    if matches!(cur, TokenKind::RParen | TokenKind::RBracket) {
        return false;
    }
    if cur == TokenKind::Comma {
        return false;
    }
    if prev == TokenKind::Comma {
        return true;
    }
    if prev == TokenKind::Colon {
        return true;
    }
    if cur == TokenKind::Colon {
        return false;
    }
    if cur == TokenKind::Dot || prev == TokenKind::Dot {
        return false;
    }
    if is_binary_op(cur) || is_binary_op(prev) {
        return true;
    }
    if cur == TokenKind::LBrace {
        return true;
    }
    if cur == TokenKind::LParen {
        return is_block_keyword(prev);
    }
    if prev == TokenKind::Not {
        return false;
    }
    if prev.is_keyword() {
        return true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(source: &str) -> String {
        format_source(source, "test.nyan")
    }

    #[test]
    fn normalizes_indentation() {
        let input = "meow greet(name string) string {\nbring \"hello\"\n}\n";
        let want = "meow greet(name string) string {\n  bring \"hello\"\n}\n";
        assert_eq!(fmt(input), want);
    }

    #[test]
    fn nested_indentation() {
        let input = "meow f(n int) int {\nsniff (n > 0) {\nbring n\n}\nbring 0\n}\n";
        let want = "meow f(n int) int {\n  sniff (n > 0) {\n    bring n\n  }\n  bring 0\n}\n";
        assert_eq!(fmt(input), want);
    }

    #[test]
    fn operator_spacing() {
        assert_eq!(fmt("nyan x=1+2\n"), "nyan x = 1 + 2\n");
    }

    #[test]
    fn preserves_comments() {
        let input = "# this is a comment\nnyan x = 1\n";
        assert_eq!(fmt(input), input);
        let block = "-~ block comment ~-\nnyan x = 1\n";
        assert_eq!(fmt(block), block);
    }

    #[test]
    fn scratch_joins_the_closing_brace() {
        let input = "sniff (x > 0) {\n  nya(x)\n}\nscratch {\n  nya(0)\n}\n";
        let want = "sniff (x > 0) {\n  nya(x)\n} scratch {\n  nya(0)\n}\n";
        assert_eq!(fmt(input), want);
    }

    #[test]
    fn caps_blank_lines() {
        let input = "nyan x = 1\n\n\n\nnyan y = 2\n";
        let want = "nyan x = 1\n\nnyan y = 2\n";
        assert_eq!(fmt(input), want);
    }

    #[test]
    fn idempotent_over_formatted_output() {
        let sources = [
            "meow fib(n int) int {\nsniff (n <= 1) {\nbring n\n}\nbring fib(n - 1) + fib(n - 2)\n}\nnya(fib(10))\n",
            "nyan xs = [1, 2, 3]\nnyan r = xs |=| lick(paw(x int) { x * 10 })\nnya(r)\n",
            "purr i (1..3) {\nnya(i)\n}\n",
            "kitty Cat {\nname: string\n}\nnyan c = Cat(\"Tama\")\nnya(c.name)\n",
        ];
        for source in sources {
            let once = fmt(source);
            let twice = fmt(&once);
            assert_eq!(once, twice, "formatter not idempotent for {source:?}");
        }
    }
}
