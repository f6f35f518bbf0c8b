//! Attribute resolution on host objects
//!
//! Decides, for an (object, attribute name) pair, what value a template should see:
//!
//! - [`normalize`] turns host-falsy values into "absent"
//! - [`resolve_static`] reads public type-scoped members of a type descriptor
//! - [`resolve_instance`] gives type-scoped members precedence when the object is a type,
//!   then reads instance properties, then falls back to a `GetName()` accessor method
//!
//! Nothing here ever fails: ambiguous members, failing getters and throwing accessors all
//! come back as [`Resolution::NotFound`].

mod adaptor;
mod instance;
mod type_level;

pub use adaptor::{InstanceAdaptor, TypeAdaptor};
pub use instance::{
    accessor_method_name, attempt_accessor, resolve_instance, resolve_members, AccessorAttempt,
};
pub use type_level::{lookup_static, resolve_static, StaticLookup};

use crate::value::Value;

/// What resolving one attribute produced
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A value worth showing
    Bound(Value),
    /// The member exists but its value is host-falsy
    Absent,
    /// No resolution path found the member
    NotFound,
}

impl Resolution {
    /// Normalize a raw member value
    pub fn from_raw(value: Value) -> Self {
        match normalize(value) {
            Some(value) => Resolution::Bound(value),
            None => Resolution::Absent,
        }
    }

    /// Bound or absent: the member was found
    pub fn is_found(&self) -> bool {
        !matches!(self, Resolution::NotFound)
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Resolution::Bound(value) => Some(value),
            Resolution::Absent | Resolution::NotFound => None,
        }
    }
}

/// `None` for null and host-falsy values, otherwise the value itself, unchanged
pub fn normalize(value: Value) -> Option<Value> {
    if value.is_truthy() {
        Some(value)
    } else {
        None
    }
}
