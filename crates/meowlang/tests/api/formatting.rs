use meowlang::fmt::format_source;
use meowlang::lexer::Lexer;
use meowlang::tokens::TokenKind;

const SAMPLES: [&str; 5] = [
    "meow factorial(n int) int {\nsniff (n <= 1) {\nbring 1\n} scratch {\nbring n * factorial(n - 1)\n}\n}\nnya(factorial(5))\n",
    "nyan xs = [1, 2, 3, 4, 5]\nnyan r = xs |=| picky(paw(x int) { x > 2 })\nnya(r)\n",
    "# cats are liquid\nkitty Cat {\nname: string\nage: int\n}\n-~ the method block ~-\nlearn Cat {\nmeow greet() string {\nbring \"hi \" + self.name\n}\n}\n",
    "purr i (1..15) {\nsniff (i % 3 == 0) {\nnya(\"Fizz\")\n} scratch {\nnya(i)\n}\n}\n",
    "nyan r = peek(15) {\n1..10 => \"small\"\n_ => \"large\"\n}\n",
];

/// Concatenating the meaningful tokens of a re-lexed formatted program must
/// reproduce a token-equivalent stream (lexer round-trip).
fn meaningful(source: &str) -> Vec<(TokenKind, String)> {
    Lexer::new(source, "rt.nyan")
        .tokenize()
        .into_iter()
        .filter(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Comment))
        .map(|t| (t.kind, t.literal))
        .collect()
}

#[test]
fn formatting_preserves_the_token_stream() {
    for source in SAMPLES {
        let formatted = format_source(source, "rt.nyan");
        assert_eq!(
            meaningful(source),
            meaningful(&formatted),
            "token stream changed for {source:?}"
        );
    }
}

#[test]
fn formatting_is_idempotent() {
    for source in SAMPLES {
        let once = format_source(source, "fmt.nyan");
        let twice = format_source(&once, "fmt.nyan");
        assert_eq!(once, twice, "second format pass changed {source:?}");
    }
}

#[test]
fn formatted_programs_still_parse_cleanly() {
    for source in SAMPLES {
        let formatted = format_source(source, "fmt.nyan");
        let (_, errors) = meowlang::parser::parse(Lexer::new(&formatted, "fmt.nyan"));
        assert!(errors.is_empty(), "formatted output broke parsing: {formatted}");
    }
}

#[test]
fn comments_survive_formatting() {
    let formatted = format_source(SAMPLES[2], "fmt.nyan");
    assert!(formatted.contains("# cats are liquid"));
    assert!(formatted.contains("-~ the method block ~-"));
}
