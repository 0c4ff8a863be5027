//! Lexer for text templates using logos

use logos::Logos;

use crate::error::Span;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // `${field}` with optional padding inside the braces
    #[regex(r"\$\{[ \t]*[a-zA-Z_][a-zA-Z0-9_\-]*[ \t]*\}", |lex| {
        let s = lex.slice();
        s[2..s.len() - 1].trim().to_string()
    })]
    Placeholder(String),

    // `$${` renders a literal `${`
    #[token("$${")]
    EscapedOpen,

    // An opening that did not form a placeholder
    #[token("${")]
    Open,

    #[token("$")]
    Dollar,

    #[regex(r"[^$]+", |lex| lex.slice().to_string())]
    Text(String),
}

/// Lex template source into tokens with spans
///
/// Every byte of the input belongs to some token, so lexing never drops text.
pub fn lex(input: &str) -> impl Iterator<Item = (Result<Token, ()>, Span)> + '_ {
    Token::lexer(input).spanned()
}
