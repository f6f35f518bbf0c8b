//! Builder-style host objects for embedding hosts and tests

use std::fmt;
use std::rc::Rc;

use super::host::{
    HostError, HostObject, InvocableMembers, MethodSignature, NamedPropertyBag, StaticMember,
    TypeDescriptor,
};
use super::Value;

type Getter = Rc<dyn Fn() -> Result<Value, HostError>>;
type Method = Rc<dyn Fn(&[Value]) -> Result<Value, HostError>>;

/// A host object assembled at runtime from named properties and methods
#[derive(Clone)]
pub struct DynamicObject {
    type_name: String,
    properties: Vec<(String, Getter)>,
    methods: Vec<(MethodSignature, Method)>,
    falsy: bool,
    display: Option<String>,
}

impl DynamicObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: Vec::new(),
            methods: Vec::new(),
            falsy: false,
            display: None,
        }
    }

    /// Add a property holding a fixed value
    pub fn with_property(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.with_getter(name, move || Ok(value.clone()))
    }

    /// Add a property whose getter runs on every read and may fail
    pub fn with_getter(
        mut self,
        name: impl Into<String>,
        getter: impl Fn() -> Result<Value, HostError> + 'static,
    ) -> Self {
        self.properties.push((name.into(), Rc::new(getter)));
        self
    }

    /// Add a method. Several methods may share a name to model overloads.
    pub fn with_method(
        mut self,
        name: impl Into<String>,
        arity: usize,
        returns_void: bool,
        body: impl Fn(&[Value]) -> Result<Value, HostError> + 'static,
    ) -> Self {
        self.methods
            .push((MethodSignature::new(name, arity, returns_void), Rc::new(body)));
        self
    }

    /// Add a zero-argument, value-returning method
    pub fn with_accessor(
        self,
        name: impl Into<String>,
        body: impl Fn() -> Result<Value, HostError> + 'static,
    ) -> Self {
        self.with_method(name, 0, false, move |_| body())
    }

    /// Make the object test false under the host truthiness predicate
    pub fn falsy(mut self) -> Self {
        self.falsy = true;
        self
    }

    /// Text used when the object itself is rendered
    pub fn with_display(mut self, text: impl Into<String>) -> Self {
        self.display = Some(text.into());
        self
    }
}

impl fmt::Debug for DynamicObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicObject")
            .field("type_name", &self.type_name)
            .field(
                "properties",
                &self.properties.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field(
                "methods",
                &self.methods.iter().map(|(s, _)| s).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl NamedPropertyBag for DynamicObject {
    fn property_names(&self) -> Vec<String> {
        self.properties.iter().map(|(name, _)| name.clone()).collect()
    }

    fn get_property(&self, name: &str) -> Option<Result<Value, HostError>> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, getter)| getter())
    }
}

impl InvocableMembers for DynamicObject {
    fn methods(&self) -> Vec<MethodSignature> {
        self.methods.iter().map(|(sig, _)| sig.clone()).collect()
    }

    fn invoke(&self, signature: &MethodSignature, args: &[Value]) -> Result<Value, HostError> {
        if args.len() != signature.arity {
            return Err(HostError::new(format!(
                "{} expects {} argument(s), got {}",
                signature.name,
                signature.arity,
                args.len()
            )));
        }
        let (_, body) = self
            .methods
            .iter()
            .find(|(sig, _)| sig == signature)
            .ok_or_else(|| {
                HostError::new(format!(
                    "method not found: {}.{}",
                    self.type_name, signature.name
                ))
            })?;
        body(args)
    }
}

impl HostObject for DynamicObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn is_truthy(&self) -> bool {
        !self.falsy
    }

    fn render(&self) -> String {
        self.display
            .clone()
            .unwrap_or_else(|| self.type_name.clone())
    }
}

/// A type descriptor: static members plus the descriptor's own instance surface.
///
/// The instance surface always carries a `Name` property with the type's name.
#[derive(Clone)]
pub struct DynamicType {
    name: String,
    statics: Vec<StaticMember>,
    surface: DynamicObject,
}

impl DynamicType {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let surface = DynamicObject::new("Type").with_property("Name", name.as_str());
        Self {
            name,
            statics: Vec::new(),
            surface,
        }
    }

    /// Add a public static member. Adding the same name twice makes lookups ambiguous.
    pub fn with_static(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.statics.push(StaticMember::new(name, value));
        self
    }

    /// Add an instance property on the descriptor itself
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.surface = self.surface.with_property(name, value);
        self
    }

    /// Add a method on the descriptor itself
    pub fn with_accessor(
        mut self,
        name: impl Into<String>,
        body: impl Fn() -> Result<Value, HostError> + 'static,
    ) -> Self {
        self.surface = self.surface.with_accessor(name, body);
        self
    }
}

impl fmt::Debug for DynamicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicType")
            .field("name", &self.name)
            .field("statics", &self.statics)
            .finish()
    }
}

impl NamedPropertyBag for DynamicType {
    fn property_names(&self) -> Vec<String> {
        self.surface.property_names()
    }

    fn get_property(&self, name: &str) -> Option<Result<Value, HostError>> {
        self.surface.get_property(name)
    }
}

impl InvocableMembers for DynamicType {
    fn methods(&self) -> Vec<MethodSignature> {
        self.surface.methods()
    }

    fn invoke(&self, signature: &MethodSignature, args: &[Value]) -> Result<Value, HostError> {
        self.surface.invoke(signature, args)
    }
}

impl TypeDescriptor for DynamicType {
    fn full_name(&self) -> &str {
        &self.name
    }

    fn static_members(&self) -> Vec<StaticMember> {
        self.statics.clone()
    }
}

impl HostObject for DynamicType {
    fn type_name(&self) -> &str {
        "Type"
    }

    fn as_type_descriptor(&self) -> Option<&dyn TypeDescriptor> {
        Some(self)
    }

    fn render(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_object_properties() {
        let obj = DynamicObject::new("Person")
            .with_property("Name", "Ada")
            .with_getter("Broken", || Err(HostError::new("not implemented")));

        assert_eq!(obj.property_names(), vec!["Name", "Broken"]);
        assert_eq!(obj.get_property("Name"), Some(Ok(Value::from("Ada"))));
        assert!(matches!(obj.get_property("Broken"), Some(Err(_))));
        assert!(obj.get_property("Missing").is_none());
    }

    #[test]
    fn test_dynamic_object_invoke_checks_arity() {
        let obj = DynamicObject::new("Counter").with_accessor("GetCount", || Ok(Value::Int(4)));
        let sig = MethodSignature::new("GetCount", 0, false);
        assert_eq!(obj.invoke(&sig, &[]), Ok(Value::Int(4)));
        assert!(obj.invoke(&sig, &[Value::Null]).is_err());
    }

    #[test]
    fn test_dynamic_type_is_descriptor() {
        let ty = DynamicType::new("System.Math").with_static("Zero", 0);
        assert!(ty.as_type_descriptor().is_some());
        assert_eq!(ty.full_name(), "System.Math");
        assert_eq!(ty.static_members().len(), 1);
        assert_eq!(ty.get_property("Name"), Some(Ok(Value::from("System.Math"))));
    }
}
