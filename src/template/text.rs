//! Parsed text templates with `${field}` placeholders

use serde::Deserialize;
use serde_json::Value;

use super::lexer::{lex, Token};
use crate::error::TemplateSyntaxError;
use crate::html::escape_html;

/// How placeholder values are escaped on output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Escape {
    #[default]
    None,
    Html,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A text template: literal text interleaved with content fields
#[derive(Debug, Clone, PartialEq)]
pub struct TextTemplate {
    segments: Vec<Segment>,
}

impl TextTemplate {
    /// Parse template source
    pub fn parse(source: &str) -> Result<Self, TemplateSyntaxError> {
        let mut segments = Vec::new();
        let mut literal = String::new();

        for (token, span) in lex(source) {
            match token {
                Ok(Token::Text(text)) => literal.push_str(&text),
                Ok(Token::Dollar) => literal.push('$'),
                Ok(Token::EscapedOpen) => literal.push_str("${"),
                Ok(Token::Placeholder(name)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name));
                }
                Ok(Token::Open) => {
                    return Err(TemplateSyntaxError::new(
                        span,
                        "malformed placeholder, expected ${field}",
                    ));
                }
                Err(()) => {
                    return Err(TemplateSyntaxError::new(span, "unexpected input"));
                }
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Names of the fields the template refers to, in order of appearance
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Render the template against a content object
    ///
    /// Strings render verbatim, other values as compact JSON, and missing
    /// fields as nothing.
    pub fn render(&self, content: &Value, escape: Escape) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = match content.get(name) {
                        None => continue,
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                    };
                    match escape {
                        Escape::None => out.push_str(&value),
                        Escape::Html => out.push_str(&escape_html(&value)),
                    }
                }
            }
        }
        out
    }
}
