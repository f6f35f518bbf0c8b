//! Messages the engine reports while compiling and rendering, and the sinks that receive them

use std::sync::Arc;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Template text could not be tokenised
    Lexer,
    /// Tokens did not form a valid template or group
    Compile,
    /// Problem found while rendering
    Runtime,
}

/// The token an engine message was reported against.
///
/// `input` may be only the slice of source the token was lexed from (a single template body
/// inside a group), so positions are relative to that slice.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageToken {
    /// Byte offset of the token in `input`
    pub start_index: usize,
    /// 1-based line of the token in `input`
    pub line: usize,
    /// 0-based character offset of the token within its line
    pub char_position_in_line: usize,
    pub input: Arc<str>,
}

impl MessageToken {
    pub fn at(input: Arc<str>, start_index: usize) -> Self {
        let (line, column) = line_and_column(&input, start_index);
        Self {
            start_index,
            line: line + 1,
            char_position_in_line: column,
            input,
        }
    }
}

/// The underlying recognition failure, positioned against the full source text
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionFailure {
    /// Byte offset of the failure in `input`
    pub index: usize,
    /// 0-based line of the failure in `input`
    pub line: usize,
    /// 0-based character offset of the failure within its line
    pub char_position_in_line: usize,
    pub input: Arc<str>,
}

impl RecognitionFailure {
    pub fn at(input: Arc<str>, index: usize) -> Self {
        let (line, column) = line_and_column(&input, index);
        Self {
            index,
            line,
            char_position_in_line: column,
            input,
        }
    }
}

/// 0-based line and character column of a byte offset
fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut column = 0;
    for (i, c) in text.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 0;
        } else if c != '\r' {
            column += 1;
        }
    }
    (line, column)
}

/// A problem reported by the engine
#[derive(Debug, Clone)]
pub struct EngineMessage {
    pub kind: MessageKind,
    /// Template the message concerns, when known
    pub template: Option<String>,
    /// Message text; only lexer messages carry one
    pub text: Option<String>,
    /// Message payload for compile and runtime messages
    pub arg: Option<Value>,
    pub token: Option<MessageToken>,
    pub cause: Option<RecognitionFailure>,
}

impl EngineMessage {
    pub fn lexer(text: impl Into<String>, token: MessageToken) -> Self {
        Self {
            kind: MessageKind::Lexer,
            template: None,
            text: Some(text.into()),
            arg: None,
            token: Some(token),
            cause: None,
        }
    }

    pub fn compile(arg: impl Into<Value>, token: Option<MessageToken>) -> Self {
        Self {
            kind: MessageKind::Compile,
            template: None,
            text: None,
            arg: Some(arg.into()),
            token,
            cause: None,
        }
    }

    pub fn runtime(arg: impl Into<Value>, token: Option<MessageToken>) -> Self {
        Self {
            kind: MessageKind::Runtime,
            template: None,
            text: None,
            arg: Some(arg.into()),
            token,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: RecognitionFailure) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn in_template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }
}

/// Receives engine messages
pub trait DiagnosticSink {
    fn report(&self, message: EngineMessage);
}

/// The sink in place when no session is bound: logs each message
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, message: EngineMessage) {
        let diagnostic = crate::error::translate(&message);
        tracing::warn!(
            kind = ?message.kind,
            template = message.template.as_deref().unwrap_or(""),
            line = diagnostic.line,
            column = diagnostic.column,
            "{}",
            diagnostic.description
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_positions() {
        let input: Arc<str> = Arc::from("ab\ncd<x");
        let token = MessageToken::at(input.clone(), 5);
        assert_eq!(token.line, 2);
        assert_eq!(token.char_position_in_line, 2);

        let cause = RecognitionFailure::at(input, 5);
        assert_eq!(cause.line, 1);
        assert_eq!(cause.char_position_in_line, 2);
    }

    #[test]
    fn test_carriage_returns_do_not_count_as_columns() {
        let (line, column) = line_and_column("a\r\nbc", 4);
        assert_eq!((line, column), (1, 1));
    }
}
