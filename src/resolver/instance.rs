//! Instance member resolution with accessor-method fallback

use crate::value::{HostError, HostObject, Value};

use super::{normalize, resolve_static, Resolution};

/// Outcome of trying the `Get<Name>()` accessor for an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorAttempt {
    /// The accessor returned a value worth showing
    Bound(Value),
    /// The accessor returned a host-falsy value
    Absent,
    /// The accessor raised an error. Ignored by resolution.
    Failed(HostError),
    /// More than one accessor-shaped method carries the name
    Ambiguous,
    /// No zero-argument, value-returning method carries the name
    Missing,
}

/// `Count` -> `GetCount`
pub fn accessor_method_name(attribute: &str) -> String {
    format!("Get{}", attribute)
}

/// Invoke the accessor for `name` if exactly one method qualifies
pub fn attempt_accessor(object: &dyn HostObject, name: &str) -> AccessorAttempt {
    let method = accessor_method_name(name);
    let mut candidates = object
        .methods()
        .into_iter()
        .filter(|sig| sig.name == method && sig.is_accessor_shaped());

    let signature = match (candidates.next(), candidates.next()) {
        (None, _) => return AccessorAttempt::Missing,
        (Some(_), Some(_)) => return AccessorAttempt::Ambiguous,
        (Some(signature), None) => signature,
    };

    match object.invoke(&signature, &[]) {
        Ok(value) => match normalize(value) {
            Some(value) => AccessorAttempt::Bound(value),
            None => AccessorAttempt::Absent,
        },
        Err(err) => AccessorAttempt::Failed(err),
    }
}

/// Resolve `name` from an object's own members: an instance property, then the accessor.
///
/// A property holding null does not stop the search; if the accessor finds nothing either,
/// the attribute is absent rather than not found.
pub fn resolve_members(object: &dyn HostObject, name: &str) -> Resolution {
    let mut has_null_property = false;

    match object.get_property(name) {
        Some(Ok(Value::Null)) => has_null_property = true,
        Some(Ok(value)) => return Resolution::from_raw(value),
        Some(Err(err)) => {
            tracing::trace!(
                type_name = object.type_name(),
                property = name,
                error = %err,
                "property getter failed"
            );
        }
        None => {}
    }

    let not_found = if has_null_property {
        Resolution::Absent
    } else {
        Resolution::NotFound
    };

    match attempt_accessor(object, name) {
        AccessorAttempt::Bound(value) => Resolution::Bound(value),
        AccessorAttempt::Absent => Resolution::Absent,
        AccessorAttempt::Failed(err) => {
            tracing::trace!(
                type_name = object.type_name(),
                method = %accessor_method_name(name),
                error = %err,
                "accessor failed, treating attribute as not found"
            );
            not_found
        }
        AccessorAttempt::Ambiguous => {
            tracing::trace!(
                type_name = object.type_name(),
                method = %accessor_method_name(name),
                "ambiguous accessor ignored"
            );
            not_found
        }
        AccessorAttempt::Missing => not_found,
    }
}

/// Resolve `name` on a host value.
///
/// When the value is a type descriptor its type-scoped members win; otherwise, or when the
/// type has no such member, the object's own members are searched. Values that are not
/// host objects have no members.
pub fn resolve_instance(value: &Value, name: &str) -> Resolution {
    let Value::Object(object) = value else {
        return Resolution::NotFound;
    };

    if let Some(ty) = object.as_type_descriptor() {
        let resolution = resolve_static(Some(ty), name);
        if resolution.is_found() {
            return resolution;
        }
    }

    resolve_members(object.as_ref(), name)
}
