//! Pluggable attribute lookup and the request-scoped render context

use std::fmt;
use std::rc::Rc;

use crate::config::Locale;
use crate::value::Value;

use super::message::{DiagnosticSink, EngineMessage, LogSink};

/// Outcome of asking an adaptor for a property
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The property exists and has a value worth showing
    Value(Value),
    /// The property exists but has nothing to show
    Null,
    /// The object has no such property
    Missing,
}

/// Looks up a named property on a host value during rendering
pub trait ModelAdaptor {
    fn get_property(&self, object: &Value, name: &str) -> Lookup;
}

/// Reads instance properties and nothing else
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectModelAdaptor;

impl ModelAdaptor for ObjectModelAdaptor {
    fn get_property(&self, object: &Value, name: &str) -> Lookup {
        let Value::Object(obj) = object else {
            return Lookup::Missing;
        };
        match obj.get_property(name) {
            Some(Ok(Value::Null)) => Lookup::Null,
            Some(Ok(value)) => Lookup::Value(value),
            Some(Err(err)) => {
                tracing::trace!(property = name, error = %err, "property getter failed");
                Lookup::Missing
            }
            None => Lookup::Missing,
        }
    }
}

/// Everything a render needs besides the group: adaptors, diagnostics sink and locale.
///
/// A context is built per request and passed down explicitly; the group itself is never
/// mutated.
#[derive(Clone)]
pub struct RenderContext {
    instance_adaptor: Rc<dyn ModelAdaptor>,
    type_adaptor: Rc<dyn ModelAdaptor>,
    sink: Rc<dyn DiagnosticSink>,
    locale: Locale,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            instance_adaptor: Rc::new(ObjectModelAdaptor),
            type_adaptor: Rc::new(ObjectModelAdaptor),
            sink: Rc::new(LogSink),
            locale: Locale::invariant(),
        }
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adaptor for host objects that are instances
    pub fn with_instance_adaptor(mut self, adaptor: Rc<dyn ModelAdaptor>) -> Self {
        self.instance_adaptor = adaptor;
        self
    }

    /// Adaptor for host objects that describe a type
    pub fn with_type_adaptor(mut self, adaptor: Rc<dyn ModelAdaptor>) -> Self {
        self.type_adaptor = adaptor;
        self
    }

    pub fn with_sink(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn set_sink(&mut self, sink: Rc<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// The adaptor responsible for `value`
    pub fn adaptor_for(&self, value: &Value) -> &dyn ModelAdaptor {
        if value.as_type_descriptor().is_some() {
            self.type_adaptor.as_ref()
        } else {
            self.instance_adaptor.as_ref()
        }
    }

    pub fn report(&self, message: EngineMessage) {
        self.sink.report(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{DynamicObject, HostError};

    #[test]
    fn test_object_adaptor_reads_properties() {
        let obj = Value::object(
            DynamicObject::new("Person")
                .with_property("Name", "Ada")
                .with_property("Nickname", Value::Null)
                .with_getter("Age", || Err(HostError::new("boom"))),
        );
        let adaptor = ObjectModelAdaptor;
        assert_eq!(adaptor.get_property(&obj, "Name"), Lookup::Value(Value::from("Ada")));
        assert_eq!(adaptor.get_property(&obj, "Nickname"), Lookup::Null);
        assert_eq!(adaptor.get_property(&obj, "Age"), Lookup::Missing);
        assert_eq!(adaptor.get_property(&obj, "Height"), Lookup::Missing);
    }

    #[test]
    fn test_object_adaptor_ignores_plain_values() {
        assert_eq!(
            ObjectModelAdaptor.get_property(&Value::from("text"), "Length"),
            Lookup::Missing
        );
    }
}
