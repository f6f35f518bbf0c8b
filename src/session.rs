//! Render sessions
//!
//! A [`Session`] installs the resolver adaptors and a diagnostics sink for the duration of
//! one request. It owns its [`RenderContext`], so the group stays immutable and any number of
//! sessions may be open against one group. Unbinding restores the logging sink and happens
//! on drop if the caller did not unbind explicitly, including when rendering fails.

use std::rc::Rc;

use crate::binder::{bind, ArgumentSource, BindError, ResolvedAttribute};
use crate::config::Locale;
use crate::resolver::{InstanceAdaptor, TypeAdaptor};
use crate::template::{DiagnosticSink, LogSink, RenderContext, TemplateGroup, TemplateInstance};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unbound,
    Bound,
}

/// Request-scoped binding of resolvers and a diagnostics sink to a group
#[derive(Debug)]
pub struct Session<'g> {
    group: &'g TemplateGroup,
    context: RenderContext,
    state: SessionState,
}

impl<'g> Session<'g> {
    /// Bind resolvers and `sink` for a request against `group`
    pub fn bind(group: &'g TemplateGroup, sink: Rc<dyn DiagnosticSink>) -> Self {
        tracing::debug!(group = group.name(), "binding render session");
        let context = RenderContext::new()
            .with_instance_adaptor(Rc::new(InstanceAdaptor))
            .with_type_adaptor(Rc::new(TypeAdaptor))
            .with_sink(sink);
        Self {
            group,
            context,
            state: SessionState::Bound,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.context.set_locale(locale);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn group(&self) -> &'g TemplateGroup {
        self.group
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// A fresh instance of the named template
    pub fn instance_of(&self, name: &str) -> Option<TemplateInstance<'g>> {
        self.group.instance_of(name)
    }

    /// Bind arguments onto an instance
    pub fn bind_arguments(
        &self,
        instance: &mut TemplateInstance<'_>,
        source: &ArgumentSource,
    ) -> Result<Vec<ResolvedAttribute>, BindError> {
        bind(instance, source)
    }

    /// Render an instance under this session's context
    pub fn render(&self, instance: TemplateInstance<'_>) -> String {
        instance.render(&self.context)
    }

    /// Restore the logging sink. Calling this more than once has no further effect.
    pub fn unbind(&mut self) {
        if self.state == SessionState::Unbound {
            return;
        }
        self.context.set_sink(Rc::new(LogSink));
        self.state = SessionState::Unbound;
        tracing::debug!(group = self.group.name(), "unbound render session");
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.unbind();
    }
}
