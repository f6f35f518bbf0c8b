//! Type-scoped member resolution

use crate::value::{TypeDescriptor, Value};

use super::Resolution;

/// Result of looking a type-scoped member up by name
#[derive(Debug, Clone, PartialEq)]
pub enum StaticLookup {
    Unique(Value),
    /// More than one member carries the name
    Ambiguous(usize),
    Missing,
}

pub fn lookup_static(ty: &dyn TypeDescriptor, name: &str) -> StaticLookup {
    let mut matches = ty
        .static_members()
        .into_iter()
        .filter(|member| member.name == name);

    match (matches.next(), matches.next()) {
        (None, _) => StaticLookup::Missing,
        (Some(member), None) => StaticLookup::Unique(member.value),
        (Some(_), Some(_)) => StaticLookup::Ambiguous(2 + matches.count()),
    }
}

/// Resolve a public type-scoped member. Ambiguity counts as not found.
pub fn resolve_static(ty: Option<&dyn TypeDescriptor>, name: &str) -> Resolution {
    let Some(ty) = ty else {
        return Resolution::NotFound;
    };

    match lookup_static(ty, name) {
        StaticLookup::Unique(value) => Resolution::from_raw(value),
        StaticLookup::Ambiguous(candidates) => {
            tracing::trace!(
                type_name = ty.full_name(),
                member = name,
                candidates,
                "ambiguous static member treated as not found"
            );
            Resolution::NotFound
        }
        StaticLookup::Missing => Resolution::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DynamicType;

    fn math() -> DynamicType {
        DynamicType::new("System.Math")
            .with_static("E", 2.5)
            .with_static("Zero", 0)
            .with_static("Round", "first overload")
            .with_static("Round", "second overload")
    }

    #[test]
    fn test_unique_member() {
        let ty = math();
        assert_eq!(
            resolve_static(Some(&ty), "E"),
            Resolution::Bound(Value::Float(2.5))
        );
    }

    #[test]
    fn test_falsy_member_is_absent() {
        let ty = math();
        assert_eq!(resolve_static(Some(&ty), "Zero"), Resolution::Absent);
    }

    #[test]
    fn test_ambiguous_member_is_not_found() {
        let ty = math();
        assert_eq!(lookup_static(&ty, "Round"), StaticLookup::Ambiguous(2));
        assert_eq!(resolve_static(Some(&ty), "Round"), Resolution::NotFound);
    }

    #[test]
    fn test_missing_member_and_missing_type() {
        let ty = math();
        assert_eq!(resolve_static(Some(&ty), "PI"), Resolution::NotFound);
        assert_eq!(resolve_static(None, "E"), Resolution::NotFound);
    }
}
