//! Hostplate - render text templates from loosely-typed host objects
//!
//! Templates use StringTemplate-style `<...>` expressions. Arguments are either an explicit
//! name/value map or an arbitrary host object whose properties, `GetName()` accessor methods
//! and (for type descriptors) static members are resolved into template attributes.
//!
//! # Example
//!
//! ```rust
//! use hostplate::{render, Value};
//!
//! let params: Value = [("name", "World")].into_iter().collect();
//! let text = render("Hello, <name>!", Some(params)).unwrap();
//! assert_eq!(text, "Hello, World!");
//! ```

pub mod binder;
pub mod config;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod session;
pub mod template;
pub mod value;

pub use binder::{bind, ArgumentSource, BindError, BindOutcome, ResolvedAttribute};
pub use config::{
    ConfigError, DateFormat, DateFormatError, DateLength, InvokeConfig, Locale,
};
pub use error::{translate, CollectingSink, Diagnostic, ParseError};
pub use resolver::{normalize, resolve_instance, resolve_static, Resolution};
pub use session::{Session, SessionState};
pub use template::{
    AssignError, DiagnosticSink, MessageKind, RenderContext, TemplateDefinition, TemplateGroup,
    TemplateInstance, DEFAULT_TEMPLATE_NAME,
};
pub use value::{DynamicObject, DynamicType, HostError, HostObject, Value};

use std::rc::Rc;

use thiserror::Error;

/// Errors that stop an invocation
#[derive(Debug, Error)]
pub enum RenderError {
    /// The requested template is not defined in the group
    #[error("template '{name}' not found; available templates: {available}")]
    TemplateNotFound { name: String, available: String },

    #[error("group {group} defines no templates")]
    NoTemplates { group: String },

    /// An argument could not be assigned
    #[error(transparent)]
    Binding(#[from] BindError),

    /// The template did not compile
    #[error("template failed to compile: {}", format_diagnostics(.0))]
    Compile(Vec<Diagnostic>),
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The result of rendering one template
#[derive(Debug, Clone)]
pub struct Invocation {
    pub template: String,
    /// Rendered text, or `None` when the template did not compile
    pub output: Option<String>,
    /// Located compile and render problems. They do not stop the render.
    pub diagnostics: Vec<Diagnostic>,
    /// What happened to each argument considered during binding
    pub attributes: Vec<ResolvedAttribute>,
}

/// Render a template from `group`.
///
/// `name` defaults to the group's first template. `params` is bound onto a fresh instance: a
/// [`Value::Map`] as explicit name/value pairs, anything else by introspecting its members.
/// Without `params`, the configuration's parameters are bound instead.
pub fn invoke(
    group: &TemplateGroup,
    name: Option<&str>,
    params: Option<Value>,
    config: &InvokeConfig,
) -> Result<Invocation, RenderError> {
    let name = match name {
        Some(name) => name.to_string(),
        None => group
            .templates()
            .first()
            .map(|t| t.name.clone())
            .ok_or_else(|| RenderError::NoTemplates {
                group: group.name().to_string(),
            })?,
    };

    let sink = Rc::new(CollectingSink::new());
    let mut session = Session::bind(group, sink.clone()).with_locale(config.locale.clone());

    let Some(mut instance) = session.instance_of(&name) else {
        return Err(RenderError::TemplateNotFound {
            available: group
                .template_names()
                .join(config.locale.list_separator()),
            name,
        });
    };

    let attributes = match params.or_else(|| config.parameters_value()) {
        Some(params) => session.bind_arguments(&mut instance, &ArgumentSource::from(params))?,
        None => Vec::new(),
    };

    let output = session.render(instance);
    session.unbind();

    Ok(Invocation {
        template: name,
        output: Some(output),
        diagnostics: sink.take(),
        attributes,
    })
}

/// Compile a bare template definition and render it.
///
/// The template is named [`DEFAULT_TEMPLATE_NAME`] and declares every root attribute it
/// references. If it does not compile, the invocation has no output and its diagnostics say
/// why.
pub fn invoke_definition(
    source: &str,
    params: Option<Value>,
    config: &InvokeConfig,
) -> Result<Invocation, RenderError> {
    let sink = CollectingSink::new();
    let group = TemplateGroup::from_definition(source, &sink);
    let mut compile_diagnostics = sink.take();

    if group.is_empty() {
        return Ok(Invocation {
            template: DEFAULT_TEMPLATE_NAME.to_string(),
            output: None,
            diagnostics: compile_diagnostics,
            attributes: Vec::new(),
        });
    }

    let mut invocation = invoke(&group, Some(DEFAULT_TEMPLATE_NAME), params, config)?;
    compile_diagnostics.append(&mut invocation.diagnostics);
    invocation.diagnostics = compile_diagnostics;
    Ok(invocation)
}

/// Render a template definition with default configuration
///
/// # Example
///
/// ```rust
/// use hostplate::{render, DynamicObject, Value};
///
/// let order = Value::object(
///     DynamicObject::new("Order")
///         .with_property("Id", "A-7")
///         .with_accessor("GetTotal", || Ok(Value::Int(12))),
/// );
/// let text = render("<Id>: <Total>", Some(order)).unwrap();
/// assert_eq!(text, "A-7: 12");
/// ```
pub fn render(definition: &str, params: Option<Value>) -> Result<String, RenderError> {
    let invocation = invoke_definition(definition, params, &InvokeConfig::default())?;
    invocation
        .output
        .ok_or(RenderError::Compile(invocation.diagnostics))
}
