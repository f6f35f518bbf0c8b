//! Per-render working copies of template definitions

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::parser::ast::IMPLICIT_ATTRIBUTES;
use crate::value::Value;

use super::adaptor::RenderContext;
use super::interpreter::Interpreter;
use super::registry::{TemplateDefinition, TemplateGroup};

/// Why an attribute could not be assigned on an instance
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignError {
    /// The template does not declare a formal parameter with this name
    #[error("no such attribute: {name}")]
    NoSuchAttribute { name: String },

    #[error("invalid attribute name: '{name}'")]
    InvalidName { name: String },

    #[error("cannot set implicitly defined attribute {name}")]
    ImplicitAttribute { name: String },
}

/// A fresh, mutable working copy of a template for a single render
#[derive(Debug)]
pub struct TemplateInstance<'g> {
    group: &'g TemplateGroup,
    definition: &'g TemplateDefinition,
    attributes: HashMap<String, Value>,
    /// Attributes whose value was built by repeated `add` calls
    aggregated: HashSet<String>,
}

impl<'g> TemplateInstance<'g> {
    pub(crate) fn new(group: &'g TemplateGroup, definition: &'g TemplateDefinition) -> Self {
        Self {
            group,
            definition,
            attributes: HashMap::new(),
            aggregated: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &'g TemplateDefinition {
        self.definition
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Assign an argument. Adding a name that is already set turns it into a list of every
    /// value added.
    pub fn add(&mut self, name: &str, value: Value) -> Result<(), AssignError> {
        if name.is_empty() || name.contains('.') {
            return Err(AssignError::InvalidName {
                name: name.to_string(),
            });
        }
        if IMPLICIT_ATTRIBUTES.contains(&name) {
            return Err(AssignError::ImplicitAttribute {
                name: name.to_string(),
            });
        }
        if !self.definition.declares(name) {
            return Err(AssignError::NoSuchAttribute {
                name: name.to_string(),
            });
        }

        match self.attributes.remove(name) {
            None => {
                self.attributes.insert(name.to_string(), value);
            }
            Some(Value::List(mut items)) if self.aggregated.contains(name) => {
                items.push(value);
                self.attributes.insert(name.to_string(), Value::List(items));
            }
            Some(existing) => {
                self.aggregated.insert(name.to_string());
                self.attributes
                    .insert(name.to_string(), Value::List(vec![existing, value]));
            }
        }
        Ok(())
    }

    /// Render the instance, consuming it
    pub fn render(self, context: &RenderContext) -> String {
        Interpreter::new(self.group, context).render(self.definition, self.attributes)
    }
}
