//! Lexer for template source using logos
//!
//! Template text alternates between literal text and `<...>` expressions, and expressions
//! may open `{...}` sub-templates that switch back to text. Literal text is scanned by hand;
//! each expression region is tokenised by a logos lexer until its closing `>` or a `{`.

use std::fmt;

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Tokens seen by the template grammar
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text with escapes already applied
    Text(String),
    /// Opening `<` of an expression
    LDelim,
    /// Closing `>` of an expression
    RDelim,

    If,
    ElseIf,
    Else,
    EndIf,
    True,
    False,

    Ident(String),
    String(String),

    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    BraceOpen,
    BraceClose,
    Comma,
    Dot,
    Colon,
    Semi,
    Equals,
    Bang,
    And,
    Or,
    Pipe,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(s) => write!(f, "text {:?}", s),
            Token::LDelim => write!(f, "'<'"),
            Token::RDelim => write!(f, "'>'"),
            Token::If => write!(f, "keyword 'if'"),
            Token::ElseIf => write!(f, "keyword 'elseif'"),
            Token::Else => write!(f, "keyword 'else'"),
            Token::EndIf => write!(f, "keyword 'endif'"),
            Token::True => write!(f, "'true'"),
            Token::False => write!(f, "'false'"),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::String(s) => write!(f, "string \"{}\"", s),
            Token::ParenOpen => write!(f, "'('"),
            Token::ParenClose => write!(f, "')'"),
            Token::BracketOpen => write!(f, "'['"),
            Token::BracketClose => write!(f, "']'"),
            Token::BraceOpen => write!(f, "'{{'"),
            Token::BraceClose => write!(f, "'}}'"),
            Token::Comma => write!(f, "','"),
            Token::Dot => write!(f, "'.'"),
            Token::Colon => write!(f, "':'"),
            Token::Semi => write!(f, "';'"),
            Token::Equals => write!(f, "'='"),
            Token::Bang => write!(f, "'!'"),
            Token::And => write!(f, "'&&'"),
            Token::Or => write!(f, "'||'"),
            Token::Pipe => write!(f, "'|'"),
        }
    }
}

/// Tokens inside a `<...>` expression
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
enum ExprToken {
    #[token("if")]
    If,
    #[token("elseif")]
    ElseIf,
    #[token("else")]
    Else,
    #[token("endif")]
    EndIf,
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[token(">")]
    RDelim,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token("=")]
    Equals,
    #[token("!")]
    Bang,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("|")]
    Pipe,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape_string(lex.slice()))]
    String(String),
}

impl From<ExprToken> for Token {
    fn from(tok: ExprToken) -> Self {
        match tok {
            ExprToken::If => Token::If,
            ExprToken::ElseIf => Token::ElseIf,
            ExprToken::Else => Token::Else,
            ExprToken::EndIf => Token::EndIf,
            ExprToken::True => Token::True,
            ExprToken::False => Token::False,
            ExprToken::RDelim => Token::RDelim,
            ExprToken::ParenOpen => Token::ParenOpen,
            ExprToken::ParenClose => Token::ParenClose,
            ExprToken::BracketOpen => Token::BracketOpen,
            ExprToken::BracketClose => Token::BracketClose,
            ExprToken::BraceOpen => Token::BraceOpen,
            ExprToken::BraceClose => Token::BraceClose,
            ExprToken::Comma => Token::Comma,
            ExprToken::Dot => Token::Dot,
            ExprToken::Colon => Token::Colon,
            ExprToken::Semi => Token::Semi,
            ExprToken::Equals => Token::Equals,
            ExprToken::Bang => Token::Bang,
            ExprToken::And => Token::And,
            ExprToken::Or => Token::Or,
            ExprToken::Pipe => Token::Pipe,
            ExprToken::Ident(s) => Token::Ident(s),
            ExprToken::String(s) => Token::String(s),
        }
    }
}

/// Strip the quotes from a string literal and apply its escapes
fn unescape_string(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// A malformed template that could not be tokenised
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    /// Literal text; `Some(offset)` inside a sub-template opened at `offset`
    Text(Option<usize>),
    /// Expression opened by the `<` at `offset`
    Expr(usize),
}

struct TemplateLexer<'s> {
    src: &'s str,
    pos: usize,
    tokens: Vec<(Token, Span)>,
    modes: Vec<Mode>,
}

/// Lex template source into tokens with spans
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, LexError> {
    TemplateLexer {
        src: source,
        pos: 0,
        tokens: Vec::new(),
        modes: vec![Mode::Text(None)],
    }
    .run()
}

impl<'s> TemplateLexer<'s> {
    fn run(mut self) -> Result<Vec<(Token, Span)>, LexError> {
        while let Some(mode) = self.modes.last().copied() {
            match mode {
                Mode::Text(sub) => {
                    if self.pos >= self.src.len() {
                        if let Some(open) = sub {
                            return Err(LexError::new(
                                "premature EOF: sub-template is missing '}'",
                                open..open + 1,
                            ));
                        }
                        break;
                    }
                    self.text(sub.is_some())?;
                }
                Mode::Expr(open) => self.expr(open)?,
            }
        }
        Ok(self.tokens)
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    /// Scan literal text up to the next delimiter
    fn text(&mut self, in_subtemplate: bool) -> Result<(), LexError> {
        let start = self.pos;
        let mut buf = String::new();
        let mut chars = self.rest().char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.peek() {
                    Some(&(_, next @ ('<' | '>' | '\\'))) => {
                        buf.push(next);
                        chars.next();
                    }
                    Some(&(_, '}')) if in_subtemplate => {
                        buf.push('}');
                        chars.next();
                    }
                    _ => buf.push('\\'),
                },
                '<' => {
                    self.flush_text(buf, start, start + i);
                    self.pos = start + i;
                    return self.open_delimiter();
                }
                '}' if in_subtemplate => {
                    self.flush_text(buf, start, start + i);
                    let at = start + i;
                    self.tokens.push((Token::BraceClose, at..at + 1));
                    self.pos = at + 1;
                    self.modes.pop();
                    return Ok(());
                }
                _ => buf.push(c),
            }
        }

        let end = self.src.len();
        self.flush_text(buf, start, end);
        self.pos = end;
        Ok(())
    }

    fn flush_text(&mut self, buf: String, start: usize, end: usize) {
        if !buf.is_empty() {
            self.tokens.push((Token::Text(buf), start..end));
        }
    }

    /// Handle a `<` in text: comment, special character, or expression
    fn open_delimiter(&mut self) -> Result<(), LexError> {
        let open = self.pos;
        let rest = self.rest();

        if rest.starts_with("<!") {
            let close = rest[2..].find("!>").ok_or_else(|| {
                LexError::new(
                    "nonterminated comment starting with <!: '!>' missing",
                    open..open + 2,
                )
            })?;
            self.pos = open + 2 + close + 2;
            return Ok(());
        }

        if rest[1..].starts_with('\\') {
            return self.special_characters(open);
        }

        self.tokens.push((Token::LDelim, open..open + 1));
        self.pos = open + 1;
        self.modes.push(Mode::Expr(open));
        Ok(())
    }

    /// `<\n>`, `<\t>`, `<\ >` and chains of them
    fn special_characters(&mut self, open: usize) -> Result<(), LexError> {
        let mut out = String::new();
        let mut chars = self.src[open + 1..].char_indices();
        loop {
            match chars.next() {
                Some((_, '\\')) => {
                    let escaped = match chars.next() {
                        Some((_, 'n')) => '\n',
                        Some((_, 't')) => '\t',
                        Some((_, ' ')) => ' ',
                        Some((_, '\\')) => '\\',
                        Some((i, other)) => {
                            let at = open + 1 + i;
                            return Err(LexError::new(
                                format!("invalid escaped char: '{}'", other),
                                at..at + other.len_utf8(),
                            ));
                        }
                        None => break,
                    };
                    out.push(escaped);
                }
                Some((i, '>')) => {
                    let end = open + 1 + i + 1;
                    self.tokens.push((Token::Text(out), open..end));
                    self.pos = end;
                    return Ok(());
                }
                _ => break,
            }
        }
        Err(LexError::new(
            "malformed escape sequence: expected '>'",
            open..open + 1,
        ))
    }

    /// Tokenise an expression until its closing `>` or a sub-template `{`
    fn expr(&mut self, open: usize) -> Result<(), LexError> {
        let base = self.pos;
        let mut lexer = ExprToken::lexer(self.rest());

        while let Some(result) = lexer.next() {
            let rel = lexer.span();
            let span = base + rel.start..base + rel.end;
            match result {
                Ok(ExprToken::RDelim) => {
                    self.tokens.push((Token::RDelim, span.clone()));
                    self.pos = span.end;
                    self.modes.pop();
                    return Ok(());
                }
                Ok(ExprToken::BraceOpen) => {
                    self.tokens.push((Token::BraceOpen, span.clone()));
                    self.pos = span.end;
                    self.subtemplate_args();
                    self.modes.push(Mode::Text(Some(span.start)));
                    return Ok(());
                }
                Ok(tok) => self.tokens.push((tok.into(), span)),
                Err(()) => {
                    let found = lexer.slice();
                    return Err(LexError::new(
                        format!("invalid character '{}'", found),
                        span,
                    ));
                }
            }
        }

        Err(LexError::new(
            "premature EOF: expression is missing '>'",
            open..open + 1,
        ))
    }

    /// Optional `name, name |` header of a sub-template
    fn subtemplate_args(&mut self) {
        let mut scanned = Vec::new();
        let mut at = self.pos;
        loop {
            at = skip_whitespace(self.src, at);
            let Some(ident_end) = scan_ident(self.src, at) else {
                return;
            };
            scanned.push((Token::Ident(self.src[at..ident_end].to_string()), at..ident_end));
            at = skip_whitespace(self.src, ident_end);
            match self.src[at..].chars().next() {
                Some(',') => {
                    scanned.push((Token::Comma, at..at + 1));
                    at += 1;
                }
                Some('|') => {
                    scanned.push((Token::Pipe, at..at + 1));
                    self.tokens.extend(scanned);
                    // A single whitespace character after '|' is dropped
                    self.pos = match self.src[at + 1..].chars().next() {
                        Some(c) if c.is_whitespace() => at + 1 + c.len_utf8(),
                        _ => at + 1,
                    };
                    return;
                }
                _ => return,
            }
        }
    }
}

fn skip_whitespace(src: &str, from: usize) -> usize {
    src[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(src.len(), |(i, _)| from + i)
}

fn scan_ident(src: &str, from: usize) -> Option<usize> {
    let mut chars = src[from..].char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return None,
    }
    let end = chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(src.len(), |(i, _)| from + i);
    Some(end)
}
