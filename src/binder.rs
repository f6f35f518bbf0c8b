//! Binding render arguments onto a template instance
//!
//! Arguments come either as an explicit name/value mapping or as a host object whose members
//! are introspected. Binding a name the template does not declare is expected and skipped;
//! any other assignment failure is a contract violation and stops the render.

use thiserror::Error;

use crate::resolver::{resolve_instance, resolve_static, Resolution};
use crate::template::{AssignError, TemplateDefinition, TemplateInstance};
use crate::value::Value;

/// Where render arguments come from
#[derive(Debug, Clone)]
pub enum ArgumentSource {
    /// Explicit name/value pairs, assigned as given
    Map(Vec<(String, Value)>),
    /// A host value whose members become arguments
    Object(Value),
}

impl From<Value> for ArgumentSource {
    fn from(value: Value) -> Self {
        match value {
            Value::Map(map) => ArgumentSource::Map(map.into_iter().collect()),
            other => ArgumentSource::Object(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    /// Resolved to a host-falsy value and left unset
    Absent,
    /// The template does not declare this attribute
    NotDeclared,
}

/// What happened to one candidate attribute during a binding pass
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAttribute {
    pub name: String,
    pub value: Option<Value>,
    pub outcome: BindOutcome,
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("cannot bind attribute '{attribute}' on template {template}: {source}")]
    Assignment {
        attribute: String,
        template: String,
        source: AssignError,
    },
}

/// Bind arguments from `source` onto `instance`
pub fn bind(
    instance: &mut TemplateInstance<'_>,
    source: &ArgumentSource,
) -> Result<Vec<ResolvedAttribute>, BindError> {
    match source {
        ArgumentSource::Map(entries) => entries
            .iter()
            .map(|(name, value)| assign(instance, name, value.clone()))
            .collect(),
        ArgumentSource::Object(object) => bind_object(instance, object),
    }
}

fn bind_object(
    instance: &mut TemplateInstance<'_>,
    object: &Value,
) -> Result<Vec<ResolvedAttribute>, BindError> {
    let mut resolved = Vec::new();

    for candidate in candidate_attributes(object, instance.definition()) {
        let name = candidate.name.clone();
        match resolve_candidate(object, candidate) {
            Resolution::Bound(value) => resolved.push(assign(instance, &name, value)?),
            Resolution::Absent => resolved.push(ResolvedAttribute {
                name,
                value: None,
                outcome: BindOutcome::Absent,
            }),
            Resolution::NotFound => {
                tracing::trace!(attribute = %name, "candidate attribute not found");
            }
        }
    }

    Ok(resolved)
}

/// Resolve a candidate, reusing the property value read while collecting candidates
fn resolve_candidate(object: &Value, candidate: Candidate) -> Resolution {
    let Some(raw) = candidate.property else {
        return resolve_instance(object, &candidate.name);
    };

    let statics = resolve_static(object.as_type_descriptor(), &candidate.name);
    if statics.is_found() {
        statics
    } else {
        Resolution::from_raw(raw)
    }
}

fn assign(
    instance: &mut TemplateInstance<'_>,
    name: &str,
    value: Value,
) -> Result<ResolvedAttribute, BindError> {
    match instance.add(name, value.clone()) {
        Ok(()) => {
            tracing::trace!(attribute = name, template = instance.name(), "bound attribute");
            Ok(ResolvedAttribute {
                name: name.to_string(),
                value: Some(value),
                outcome: BindOutcome::Bound,
            })
        }
        Err(AssignError::NoSuchAttribute { .. }) => {
            tracing::debug!(
                attribute = name,
                template = instance.name(),
                "skipping attribute the template does not declare"
            );
            Ok(ResolvedAttribute {
                name: name.to_string(),
                value: Some(value),
                outcome: BindOutcome::NotDeclared,
            })
        }
        Err(source) => Err(BindError::Assignment {
            attribute: name.to_string(),
            template: instance.name().to_string(),
            source,
        }),
    }
}

/// An attribute name worth resolving on a bound object
#[derive(Debug)]
struct Candidate {
    name: String,
    /// Non-null instance property value, read once during the scan
    property: Option<Value>,
}

/// Attribute names worth resolving on `object`, type-scoped members first.
///
/// Instance properties count when their raw value is not null. `GetName()` accessors count
/// only when the template declares `Name` and no such property was found.
fn candidate_attributes(object: &Value, template: &TemplateDefinition) -> Vec<Candidate> {
    let Value::Object(obj) = object else {
        tracing::debug!(kind = object.kind(), "argument source has no members");
        return Vec::new();
    };

    let mut candidates: Vec<Candidate> = Vec::new();

    if let Some(ty) = obj.as_type_descriptor() {
        for member in ty.static_members() {
            if !candidates.iter().any(|c| c.name == member.name) {
                candidates.push(Candidate {
                    name: member.name.clone(),
                    property: None,
                });
            }
        }
    }

    for name in obj.property_names() {
        let value = match obj.get_property(&name) {
            Some(Ok(value)) if !value.is_null() => value,
            _ => continue,
        };
        match candidates.iter_mut().find(|c| c.name == name) {
            Some(existing) => {
                if existing.property.is_none() {
                    existing.property = Some(value);
                }
            }
            None => candidates.push(Candidate {
                name,
                property: Some(value),
            }),
        }
    }

    for signature in obj.methods() {
        if !signature.is_accessor_shaped() {
            continue;
        }
        let Some(derived) = accessor_attribute(&signature.name) else {
            continue;
        };
        let listed = candidates.iter().any(|c| c.name == derived);
        if template.declares(derived) && !listed {
            candidates.push(Candidate {
                name: derived.to_string(),
                property: None,
            });
        }
    }

    candidates
}

/// `GetCount` -> `Count`
fn accessor_attribute(method: &str) -> Option<&str> {
    method
        .strip_prefix("Get")
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
}
