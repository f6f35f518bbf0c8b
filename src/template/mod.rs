//! Template engine
//!
//! Compiles templates into a [`TemplateGroup`], creates per-render [`TemplateInstance`]s and
//! renders them against a [`RenderContext`]. Host values are read through the context's
//! [`ModelAdaptor`]s, and problems are reported to its [`DiagnosticSink`].
//!
//! # Example
//!
//! ```text
//! greeting(name) ::= "Hello, <name>!"
//! list(items) ::= "<items:{it | - <it>}; separator=\"\n\">"
//! ```

mod adaptor;
mod instance;
mod interpreter;
mod message;
mod registry;

pub use adaptor::{Lookup, ModelAdaptor, ObjectModelAdaptor, RenderContext};
pub use instance::{AssignError, TemplateInstance};
pub use message::{
    DiagnosticSink, EngineMessage, LogSink, MessageKind, MessageToken, RecognitionFailure,
};
pub use registry::{TemplateDefinition, TemplateError, TemplateGroup, DEFAULT_TEMPLATE_NAME};
