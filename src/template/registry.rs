//! Template groups: named collections of compiled template definitions

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::error::ParseError;
use crate::parser::{self, ast::Body, referenced_attributes};

use super::instance::TemplateInstance;
use super::message::{DiagnosticSink, EngineMessage, MessageToken, RecognitionFailure};

/// Name given to the template compiled from a bare definition
pub const DEFAULT_TEMPLATE_NAME: &str = "default";

/// Errors that can occur while defining templates
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Duplicate template definition
    #[error("redefinition of template {name}")]
    Duplicate { name: String },

    /// Template source failed to compile
    #[error("template {name} has {} syntax error(s)", errors.len())]
    Syntax {
        name: String,
        errors: Vec<ParseError>,
    },
}

/// A compiled template. Immutable once defined.
#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    pub name: String,
    /// Declared formal parameters, in order
    pub formal_parameters: Vec<String>,
    /// Raw template text the body was compiled from
    pub source: Arc<str>,
    pub body: Body,
}

impl TemplateDefinition {
    /// Check if this template declares a formal parameter
    pub fn declares(&self, name: &str) -> bool {
        self.formal_parameters.iter().any(|p| p == name)
    }
}

/// A named collection of template definitions
#[derive(Debug, Clone, Default)]
pub struct TemplateGroup {
    name: String,
    templates: Vec<TemplateDefinition>,
    index: HashMap<String, usize>,
}

impl TemplateGroup {
    /// Create an empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            templates: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Compile a group definition.
    ///
    /// Problems are reported to `sink` rather than returned: a template whose body fails to
    /// compile is left undefined while the rest of the group is kept. A group file that does
    /// not parse at all defines nothing.
    pub fn from_group_source(
        name: impl Into<String>,
        source: &str,
        sink: &dyn DiagnosticSink,
    ) -> Self {
        let mut group = Self::new(name);
        let full: Arc<str> = Arc::from(source);

        let decls = match parser::parse_group(source) {
            Ok(decls) => decls,
            Err(errors) => {
                for err in errors {
                    sink.report(group_message(&full, &err));
                }
                return group;
            }
        };

        for decl in decls {
            let name = decl.name.node.to_string();
            let parameters = decl.parameters.iter().map(|p| p.node.to_string()).collect();
            match group.define(name.clone(), parameters, &decl.body.text) {
                Ok(()) => {}
                Err(TemplateError::Duplicate { name }) => {
                    let token = MessageToken::at(full.clone(), decl.name.span.start);
                    sink.report(
                        EngineMessage::compile(format!("redefinition of template {}", name), Some(token))
                            .with_cause(RecognitionFailure::at(full.clone(), decl.name.span.start))
                            .in_template(name),
                    );
                }
                Err(TemplateError::Syntax { name, errors }) => {
                    let body: Arc<str> = Arc::from(decl.body.text.as_str());
                    for err in errors {
                        sink.report(
                            body_message(&full, &body, decl.body.offset, &err).in_template(&name),
                        );
                    }
                }
            }
        }

        group
    }

    /// Compile a one-template group from a bare definition.
    ///
    /// The template is named [`DEFAULT_TEMPLATE_NAME`] and its formal parameters are the root
    /// attributes it references.
    pub fn from_definition(source: &str, sink: &dyn DiagnosticSink) -> Self {
        let mut group = Self::new(DEFAULT_TEMPLATE_NAME);
        match parser::parse_template(source) {
            Ok(body) => group.insert(DEFAULT_TEMPLATE_NAME.to_string(), None, source, body),
            Err(errors) => {
                let text: Arc<str> = Arc::from(source);
                for err in errors {
                    sink.report(
                        body_message(&text, &text, 0, &err).in_template(DEFAULT_TEMPLATE_NAME),
                    );
                }
            }
        }
        group
    }

    /// Compile and add a template with explicit formal parameters
    pub fn define(
        &mut self,
        name: impl Into<String>,
        parameters: Vec<String>,
        source: &str,
    ) -> Result<(), TemplateError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(TemplateError::Duplicate { name });
        }
        let body = parser::parse_template(source)
            .map_err(|errors| TemplateError::Syntax {
                name: name.clone(),
                errors,
            })?;
        self.insert(name, Some(parameters), source, body);
        Ok(())
    }

    fn insert(&mut self, name: String, parameters: Option<Vec<String>>, source: &str, body: Body) {
        let formal_parameters = parameters.unwrap_or_else(|| referenced_attributes(&body));
        tracing::trace!(template = %name, parameters = ?formal_parameters, "defined template");
        self.index.insert(name.clone(), self.templates.len());
        self.templates.push(TemplateDefinition {
            name,
            formal_parameters,
            source: Arc::from(source),
            body,
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&TemplateDefinition> {
        self.index.get(name).map(|&i| &self.templates[i])
    }

    /// Templates in definition order
    pub fn templates(&self) -> &[TemplateDefinition] {
        &self.templates
    }

    pub fn template_names(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// A fresh working instance of the named template
    pub fn instance_of(&self, name: &str) -> Option<TemplateInstance<'_>> {
        self.get(name)
            .map(|definition| TemplateInstance::new(self, definition))
    }
}

/// A group-level problem, positioned in the group source
fn group_message(full: &Arc<str>, err: &ParseError) -> EngineMessage {
    let start = err.span().start;
    let token = MessageToken::at(full.clone(), start);
    match err {
        ParseError::Lexical { message, .. } => EngineMessage::lexer(message.clone(), token),
        ParseError::Syntax { .. } => EngineMessage::compile(err.description(), Some(token))
            .with_cause(RecognitionFailure::at(full.clone(), start)),
    }
}

/// A problem in a template body that starts at `offset` in the full source.
///
/// Lexer messages carry a token in the full source. Parser messages carry a token relative to
/// the body and a recognition failure in the full source.
fn body_message(full: &Arc<str>, body: &Arc<str>, offset: usize, err: &ParseError) -> EngineMessage {
    let start = err.span().start;
    match err {
        ParseError::Lexical { message, .. } => {
            EngineMessage::lexer(message.clone(), MessageToken::at(full.clone(), offset + start))
        }
        ParseError::Syntax { .. } => {
            EngineMessage::compile(err.description(), Some(MessageToken::at(body.clone(), start)))
                .with_cause(RecognitionFailure::at(full.clone(), offset + start))
        }
    }
}
