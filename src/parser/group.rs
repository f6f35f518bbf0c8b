//! Group file lexer and parser
//!
//! A group file is a list of template declarations:
//!
//! ```text
//! // comment
//! greeting(name) ::= "Hello, <name>!"
//! page(title, body) ::= <<
//! # <title>
//! <body>
//! >>
//! ```

use std::fmt;

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use logos::Logos;

use super::ast::{Identifier, RawBody, Spanned, TemplateDecl};
use super::grammar::span_range;
use crate::error::ParseError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum GroupToken {
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token("::=")]
    Defines,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| quoted_body(lex.slice(), lex.span().start))]
    String(RawBody),

    #[regex(r"<<([^>]|>[^>])*>>", |lex| big_string_body(lex.slice(), lex.span().start))]
    BigString(RawBody),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    BlockComment,
}

impl fmt::Display for GroupToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupToken::ParenOpen => write!(f, "'('"),
            GroupToken::ParenClose => write!(f, "')'"),
            GroupToken::Comma => write!(f, "','"),
            GroupToken::Defines => write!(f, "'::='"),
            GroupToken::Ident(s) => write!(f, "identifier '{}'", s),
            GroupToken::String(_) => write!(f, "template string"),
            GroupToken::BigString(_) => write!(f, "<<template>>"),
            GroupToken::LineComment | GroupToken::BlockComment => write!(f, "comment"),
        }
    }
}

/// `"..."`: only `\"` is unescaped, everything else is template text
fn quoted_body(slice: &str, start: usize) -> RawBody {
    RawBody {
        text: slice[1..slice.len() - 1].replace("\\\"", "\""),
        offset: start + 1,
    }
}

/// `<<...>>` with the newline right after `<<` and right before `>>` removed
fn big_string_body(slice: &str, start: usize) -> RawBody {
    let mut inner = &slice[2..slice.len() - 2];
    let mut offset = start + 2;

    if let Some(rest) = inner.strip_prefix("\r\n") {
        inner = rest;
        offset += 2;
    } else if let Some(rest) = inner.strip_prefix('\n') {
        inner = rest;
        offset += 1;
    }
    if let Some(rest) = inner.strip_suffix("\r\n") {
        inner = rest;
    } else if let Some(rest) = inner.strip_suffix('\n') {
        inner = rest;
    }

    RawBody {
        text: inner.to_string(),
        offset,
    }
}

/// Parse a group definition into template declarations
pub fn parse_group(input: &str) -> Result<Vec<TemplateDecl>, Vec<ParseError>> {
    let len = input.len();
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let mut lexer = GroupToken::lexer(input);
    while let Some(result) = lexer.next() {
        match result {
            Ok(tok) => tokens.push((tok, lexer.span())),
            Err(()) => errors.push(ParseError::Lexical {
                span: lexer.span(),
                message: format!("invalid character '{}'", lexer.slice()),
            }),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream =
        Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    group_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn group_parser<'a, I>(
) -> impl Parser<'a, I, Vec<TemplateDecl>, extra::Err<Rich<'a, GroupToken>>> + Clone
where
    I: ValueInput<'a, Token = GroupToken, Span = SimpleSpan>,
{
    let identifier = select! {
        GroupToken::Ident(s) => Identifier::new(s),
    }
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())));

    let parameters = identifier
        .clone()
        .separated_by(just(GroupToken::Comma))
        .collect::<Vec<_>>()
        .delimited_by(just(GroupToken::ParenOpen), just(GroupToken::ParenClose));

    let body = select! {
        GroupToken::String(b) => b,
        GroupToken::BigString(b) => b,
    };

    identifier
        .then(parameters)
        .then_ignore(just(GroupToken::Defines))
        .then(body)
        .map(|((name, parameters), body)| TemplateDecl {
            name,
            parameters,
            body,
        })
        .repeated()
        .collect()
        .then_ignore(end())
}
