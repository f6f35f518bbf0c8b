//! Capability traits implemented by host object adaptors

use std::fmt;

use thiserror::Error;

use super::Value;

/// A failure raised by host code (a property getter or an invoked method)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Named instance members with a getter
pub trait NamedPropertyBag {
    /// Names of all instance-level members, in declaration order
    fn property_names(&self) -> Vec<String>;

    /// Read a member. `None` means the object has no such member; `Some(Err(_))` means the
    /// member exists but its getter failed.
    fn get_property(&self, name: &str) -> Option<Result<Value, HostError>>;
}

/// Shape of an invocable member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub arity: usize,
    pub returns_void: bool,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>, arity: usize, returns_void: bool) -> Self {
        Self {
            name: name.into(),
            arity,
            returns_void,
        }
    }

    /// Zero parameters and a non-void return
    pub fn is_accessor_shaped(&self) -> bool {
        self.arity == 0 && !self.returns_void
    }
}

/// Invocable members. Overloads appear as separate signatures sharing a name.
pub trait InvocableMembers {
    fn methods(&self) -> Vec<MethodSignature>;

    fn invoke(&self, signature: &MethodSignature, args: &[Value]) -> Result<Value, HostError>;
}

/// A public type-scoped member and its current value
#[derive(Debug, Clone)]
pub struct StaticMember {
    pub name: String,
    pub value: Value,
}

impl StaticMember {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A value that describes a type rather than an instance
pub trait TypeDescriptor {
    fn full_name(&self) -> &str;

    /// Public type-scoped members. A name listed more than once is ambiguous.
    fn static_members(&self) -> Vec<StaticMember>;
}

/// An opaque runtime value whose members are discovered at runtime
pub trait HostObject: NamedPropertyBag + InvocableMembers + fmt::Debug {
    fn type_name(&self) -> &str;

    fn as_type_descriptor(&self) -> Option<&dyn TypeDescriptor> {
        None
    }

    fn is_truthy(&self) -> bool {
        true
    }

    /// Text shown when the object itself is rendered
    fn render(&self) -> String {
        self.type_name().to_string()
    }
}
