//! Model adaptors that route template property lookups through the resolvers

use crate::template::{Lookup, ModelAdaptor};
use crate::value::Value;

use super::{resolve_instance, resolve_members, resolve_static, Resolution};

impl From<Resolution> for Lookup {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Bound(value) => Lookup::Value(value),
            Resolution::Absent => Lookup::Null,
            Resolution::NotFound => Lookup::Missing,
        }
    }
}

/// Adaptor for instance-like host objects
#[derive(Debug, Default, Clone, Copy)]
pub struct InstanceAdaptor;

impl ModelAdaptor for InstanceAdaptor {
    fn get_property(&self, object: &Value, name: &str) -> Lookup {
        resolve_instance(object, name).into()
    }
}

/// Adaptor for host objects that describe a type: static members first, then the
/// descriptor's own members
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeAdaptor;

impl ModelAdaptor for TypeAdaptor {
    fn get_property(&self, object: &Value, name: &str) -> Lookup {
        let Value::Object(obj) = object else {
            return Lookup::Missing;
        };
        match resolve_static(obj.as_type_descriptor(), name) {
            Resolution::NotFound => resolve_members(obj.as_ref(), name).into(),
            found => found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{DynamicObject, DynamicType};

    #[test]
    fn test_instance_adaptor_uses_accessors() {
        let obj = Value::object(
            DynamicObject::new("Order")
                .with_accessor("GetTotal", || Ok(Value::Int(12)))
                .with_property("Notes", ""),
        );
        assert_eq!(
            InstanceAdaptor.get_property(&obj, "Total"),
            Lookup::Value(Value::Int(12))
        );
        assert_eq!(InstanceAdaptor.get_property(&obj, "Notes"), Lookup::Null);
        assert_eq!(InstanceAdaptor.get_property(&obj, "Missing"), Lookup::Missing);
    }

    #[test]
    fn test_type_adaptor_prefers_statics() {
        let ty = Value::object(
            DynamicType::new("Color")
                .with_static("Red", "#f00")
                .with_property("Red", "instance"),
        );
        assert_eq!(
            TypeAdaptor.get_property(&ty, "Red"),
            Lookup::Value(Value::from("#f00"))
        );
        assert_eq!(
            TypeAdaptor.get_property(&ty, "Name"),
            Lookup::Value(Value::from("Color"))
        );
    }
}
