//! Parse errors and located diagnostics

use std::cell::RefCell;
use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::error::{Rich, RichPattern, RichReason};
use thiserror::Error;

use crate::parser::lexer::LexError;
use crate::template::{DiagnosticSink, EngineMessage, MessageKind};
use crate::value::Value;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Lex error at {span:?}: {message}")]
    Lexical { span: Span, message: String },

    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Lexical { span, .. } | ParseError::Syntax { span, .. } => span,
        }
    }

    /// Message text including what was expected
    pub fn description(&self) -> String {
        match self {
            ParseError::Lexical { message, .. } => message.clone(),
            ParseError::Syntax {
                message, expected, ..
            } if !expected.is_empty() => {
                format!("{}, expecting {}", message, expected.join(", "))
            }
            ParseError::Syntax { message, .. } => message.clone(),
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::Lexical {
            span: err.span,
            message: err.message,
        }
    }
}

impl<'a, T: fmt::Display> From<Rich<'a, T>> for ParseError {
    fn from(err: Rich<'a, T>) -> Self {
        let message = match err.reason() {
            RichReason::Custom(msg) => msg.to_string(),
            _ => match err.found() {
                Some(tok) => format!("unexpected {}", tok),
                None => "unexpected end of input".to_string(),
            },
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format!("{}", &**tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of input".to_string()),
                _ => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// A located problem with a template, ready to show to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: MessageKind,
    pub template: Option<String>,
    pub description: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    /// Text of the offending line, or empty when it could not be located
    pub source_line: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.template {
            Some(name) => write!(
                f,
                "{} {}:{}: {}",
                name, self.line, self.column, self.description
            ),
            None => write!(f, "{}:{}: {}", self.line, self.column, self.description),
        }
    }
}

impl Diagnostic {
    /// Format the diagnostic with its source line using ariadne
    pub fn format(&self, filename: &str) -> String {
        // Pad with blank lines so ariadne reports the real line number
        let padding = "\n".repeat(self.line.saturating_sub(1));
        let source = format!("{}{}\n", padding, self.source_line);
        let column = (self.column.saturating_sub(1)).min(self.source_line.chars().count());
        let start = padding.len() + column;
        let span = start..start + 1;

        let kind = match self.kind {
            MessageKind::Runtime => ReportKind::Warning,
            MessageKind::Lexer | MessageKind::Compile => ReportKind::Error,
        };

        let mut buf = Vec::new();
        let written = Report::build(kind, filename, start)
            .with_message(&self.description)
            .with_label(
                Label::new((filename, span))
                    .with_message(&self.description)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Convert an engine message into a located diagnostic.
///
/// Positions come from the recognition failure when there is one, since it is positioned
/// against the full source; otherwise from the reporting token, whose input may be only a
/// slice of the source (a template body within a group), making the line relative to that
/// slice. Lines are counted from the text itself, so the result is always 1-based whatever
/// base the message used.
pub fn translate(message: &EngineMessage) -> Diagnostic {
    let description = match message.kind {
        MessageKind::Lexer => message.text.clone().unwrap_or_default(),
        _ => match &message.arg {
            Some(Value::Str(s)) => s.clone(),
            _ => String::new(),
        },
    };

    let (offset, column, text) = match (&message.cause, &message.token) {
        (Some(cause), _) => (cause.index, cause.char_position_in_line, Some(&cause.input)),
        (None, Some(token)) => (
            token.start_index,
            token.char_position_in_line,
            Some(&token.input),
        ),
        (None, None) => (0, 0, None),
    };
    let full_text: &str = text.map(|t| &**t).unwrap_or("");

    let line_index = full_text
        .char_indices()
        .take_while(|(i, _)| *i < offset)
        .filter(|(_, c)| *c == '\n')
        .count();

    let normalized = full_text.replace('\r', "");
    let source_line = normalized
        .split('\n')
        .nth(line_index)
        .unwrap_or("")
        .to_string();

    Diagnostic {
        kind: message.kind,
        template: message.template.clone(),
        description,
        line: line_index + 1,
        column: column + 1,
        source_line,
    }
}

/// Sink that translates every message and keeps the diagnostics for the caller
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Remove and return everything collected so far
    pub fn take(&self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, message: EngineMessage) {
        self.diagnostics.borrow_mut().push(translate(&message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{MessageToken, RecognitionFailure};
    use std::sync::Arc;

    #[test]
    fn test_lexer_message_uses_own_text() {
        let input: Arc<str> = Arc::from("Hello, <name");
        let msg = EngineMessage::lexer("premature EOF", MessageToken::at(input, 7));
        let diag = translate(&msg);
        assert_eq!(diag.description, "premature EOF");
        assert_eq!(diag.line, 1);
        assert_eq!(diag.column, 8);
        assert_eq!(diag.source_line, "Hello, <name");
    }

    #[test]
    fn test_non_text_arg_gives_empty_description() {
        let msg = EngineMessage::runtime(Value::Int(3), None);
        let diag = translate(&msg);
        assert_eq!(diag.description, "");
        assert_eq!(diag.line, 1);
        assert_eq!(diag.column, 1);
        assert_eq!(diag.source_line, "");
    }

    #[test]
    fn test_cause_preferred_over_token() {
        let group: Arc<str> = Arc::from("a() ::= \"x\"\nb() ::= \"<\"\n");
        let body: Arc<str> = Arc::from("<");
        let offset = group.find("\"<").unwrap() + 1;
        let msg = EngineMessage::compile("bad", Some(MessageToken::at(body, 0)))
            .with_cause(RecognitionFailure::at(group, offset));
        let diag = translate(&msg);
        assert_eq!(diag.line, 2);
        assert_eq!(diag.column, 10);
        assert_eq!(diag.source_line, "b() ::= \"<\"");
    }

    #[test]
    fn test_lines_are_one_based_for_either_message_base() {
        let input: Arc<str> = Arc::from("one\ntwo <x");
        // Token lines are 1-based, recognition failure lines 0-based
        let token = MessageToken::at(input.clone(), 8);
        let cause = RecognitionFailure::at(input, 8);
        assert_eq!(token.line, cause.line + 1);

        let from_token = translate(&EngineMessage::compile("e", Some(token.clone())));
        let from_cause =
            translate(&EngineMessage::compile("e", Some(token)).with_cause(cause));
        assert_eq!(from_token.line, 2);
        assert_eq!(from_cause.line, 2);
        assert_eq!(from_token.column, 5);
    }

    #[test]
    fn test_carriage_returns_removed_from_source_line() {
        let input: Arc<str> = Arc::from("first\r\nsecond <");
        let msg = EngineMessage::lexer("oops", MessageToken::at(input, 14));
        let diag = translate(&msg);
        assert_eq!(diag.line, 2);
        assert_eq!(diag.source_line, "second <");
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.report(EngineMessage::runtime("no such property", None));
        assert_eq!(sink.diagnostics().len(), 1);
        assert_eq!(sink.take()[0].description, "no such property");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_format_mentions_description() {
        let diag = Diagnostic {
            kind: MessageKind::Lexer,
            template: None,
            description: "premature EOF".to_string(),
            line: 3,
            column: 2,
            source_line: "x<y".to_string(),
        };
        let formatted = diag.format("greeting.stg");
        assert!(formatted.contains("premature EOF"));
        assert!(formatted.contains("greeting.stg"));
    }
}
