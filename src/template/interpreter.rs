//! Evaluates compiled template bodies
//!
//! Attribute lookup is dynamically scoped: a name not set on the current template is looked
//! up on the template that included it, and so on outwards. Problems found while rendering
//! are reported to the context's sink and the offending expression renders as nothing.

use std::collections::HashMap;
use std::sync::Arc;

use crate::parser::ast::{
    Body, Condition, Element, Expr, ExprElement, ExprOption, IfBlock, PropertyName, Span,
    Spanned, SubTemplate, TemplateRef, IMPLICIT_ATTRIBUTES,
};
use crate::config::DateFormat;
use crate::value::Value;

use super::adaptor::{Lookup, RenderContext};
use super::message::{EngineMessage, MessageToken};
use super::registry::{TemplateDefinition, TemplateGroup};

const BUILTINS: [&str; 8] = [
    "first", "last", "rest", "reverse", "length", "strlen", "trim", "strip",
];

const MAX_DEPTH: usize = 100;

/// One template on the dynamic scope chain
struct Frame<'f> {
    template: &'f str,
    /// Text the template's spans refer to
    source: Arc<str>,
    declared: Vec<String>,
    attributes: HashMap<String, Value>,
    parent: Option<&'f Frame<'f>>,
    depth: usize,
}

impl<'f> Frame<'f> {
    fn child<'c>(
        &'c self,
        template: &'c str,
        source: Arc<str>,
        declared: Vec<String>,
        attributes: HashMap<String, Value>,
    ) -> Frame<'c> {
        Frame {
            template,
            source,
            declared,
            attributes,
            parent: Some(self),
            depth: self.depth + 1,
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        match self.attributes.get(name) {
            Some(value) => Some(value.clone()),
            None => self.parent.and_then(|p| p.lookup(name)),
        }
    }

    fn declares(&self, name: &str) -> bool {
        self.declared.iter().any(|d| d == name)
            || self.parent.is_some_and(|p| p.declares(name))
    }
}

/// Options written after `;` in an expression, evaluated to text
#[derive(Debug, Default)]
struct RenderOptions {
    separator: Option<String>,
    null: Option<String>,
    /// Applies to date values only
    format: Option<DateFormat>,
}

pub(crate) struct Interpreter<'a> {
    group: &'a TemplateGroup,
    context: &'a RenderContext,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(group: &'a TemplateGroup, context: &'a RenderContext) -> Self {
        Self { group, context }
    }

    pub(crate) fn render(
        &self,
        definition: &TemplateDefinition,
        attributes: HashMap<String, Value>,
    ) -> String {
        let frame = Frame {
            template: &definition.name,
            source: definition.source.clone(),
            declared: definition.formal_parameters.clone(),
            attributes,
            parent: None,
            depth: 0,
        };
        let mut out = String::new();
        self.write_body(&frame, &definition.body, &mut out);
        out
    }

    fn write_body(&self, frame: &Frame<'_>, body: &Body, out: &mut String) {
        for element in body {
            match &element.node {
                Element::Text(text) => out.push_str(text),
                Element::Expr(expr) => self.write_expr(frame, expr, out),
                Element::If(block) => self.write_if(frame, block, out),
            }
        }
    }

    fn write_expr(&self, frame: &Frame<'_>, element: &ExprElement, out: &mut String) {
        let value = self.eval(frame, &element.expr);

        let mut options = RenderOptions::default();
        for option in &element.options {
            match &option.node {
                ExprOption::Separator(expr) => {
                    options.separator = Some(self.text_of(&self.eval(frame, expr)))
                }
                ExprOption::Null(expr) => options.null = Some(self.text_of(&self.eval(frame, expr))),
                ExprOption::Format(expr) => {
                    let text = self.text_of(&self.eval(frame, expr));
                    match DateFormat::parse(&text) {
                        Ok(format) => options.format = Some(format),
                        Err(err) => self.report(frame, &expr.span, err.to_string()),
                    }
                }
            }
        }

        self.write_value(&value, &options, out);
    }

    fn write_if(&self, frame: &Frame<'_>, block: &IfBlock, out: &mut String) {
        for (condition, body) in &block.branches {
            if self.test(frame, condition) {
                self.write_body(frame, body, out);
                return;
            }
        }
        if let Some(otherwise) = &block.otherwise {
            self.write_body(frame, otherwise, out);
        }
    }

    fn test(&self, frame: &Frame<'_>, condition: &Condition) -> bool {
        match condition {
            Condition::Expr(expr) => is_present(&self.eval(frame, expr)),
            Condition::Not(inner) => !self.test(frame, inner),
            Condition::And(a, b) => self.test(frame, a) && self.test(frame, b),
            Condition::Or(a, b) => self.test(frame, a) || self.test(frame, b),
        }
    }

    fn write_value(&self, value: &Value, options: &RenderOptions, out: &mut String) {
        match value {
            Value::Null => {
                if let Some(null) = &options.null {
                    out.push_str(null);
                }
            }
            Value::List(items) => self.write_items(items, options, out),
            Value::Map(map) => {
                let keys: Vec<Value> = map.keys().map(|k| Value::Str(k.clone())).collect();
                self.write_items(&keys, options, out);
            }
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(x) => out.push_str(&self.context.locale().format_float(*x)),
            Value::Str(s) => out.push_str(s),
            Value::DateTime(dt) => {
                let format = options.format.as_ref().unwrap_or(&DateFormat::General);
                out.push_str(&self.context.locale().format_datetime(dt, format));
            }
            Value::Object(obj) => out.push_str(&obj.render()),
        }
    }

    fn write_items(&self, items: &[Value], options: &RenderOptions, out: &mut String) {
        let mut first = true;
        for item in items {
            if item.is_null() && options.null.is_none() {
                continue;
            }
            if !first {
                if let Some(separator) = &options.separator {
                    out.push_str(separator);
                }
            }
            first = false;
            self.write_value(item, options, out);
        }
    }

    fn text_of(&self, value: &Value) -> String {
        let mut out = String::new();
        self.write_value(value, &RenderOptions::default(), &mut out);
        out
    }

    fn eval(&self, frame: &Frame<'_>, expr: &Spanned<Expr>) -> Value {
        match &expr.node {
            Expr::Attribute(id) => self.attribute(frame, id.as_str(), &expr.span),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::List(items) => {
                let mut values = Vec::new();
                for item in items {
                    match self.eval(frame, item) {
                        Value::List(inner) => values.extend(inner),
                        other => values.push(other),
                    }
                }
                Value::List(values)
            }
            Expr::Property { target, name } => {
                let object = self.eval(frame, target);
                let name = match name {
                    PropertyName::Named(id) => id.to_string(),
                    PropertyName::Indirect(inner) => self.text_of(&self.eval(frame, inner)),
                };
                self.property(frame, &object, &name, &expr.span)
            }
            Expr::Include { name, args } => self.include(frame, name.as_str(), args, &expr.span),
            Expr::SubTemplate(sub) => Value::Str(self.render_subtemplate(frame, sub, None)),
            Expr::Map { target, templates } => {
                let mut value = self.eval(frame, target);
                for template in templates {
                    value = self.map(frame, value, template);
                }
                value
            }
        }
    }

    fn attribute(&self, frame: &Frame<'_>, name: &str, span: &Span) -> Value {
        if let Some(value) = frame.lookup(name) {
            return value;
        }
        if !frame.declares(name) {
            self.report(frame, span, format!("attribute {} isn't defined", name));
        }
        Value::Null
    }

    fn property(&self, frame: &Frame<'_>, object: &Value, name: &str, span: &Span) -> Value {
        match object {
            Value::Null => Value::Null,
            Value::Map(map) => map.get(name).cloned().unwrap_or_default(),
            Value::Object(_) => match self.context.adaptor_for(object).get_property(object, name) {
                Lookup::Value(value) => value,
                Lookup::Null => Value::Null,
                Lookup::Missing => {
                    self.report(
                        frame,
                        span,
                        format!("no such property or can't access: {}.{}", object.kind(), name),
                    );
                    Value::Null
                }
            },
            other => {
                self.report(
                    frame,
                    span,
                    format!("no such property or can't access: {}.{}", other.kind(), name),
                );
                Value::Null
            }
        }
    }

    fn include(
        &self,
        frame: &Frame<'_>,
        name: &str,
        args: &[Spanned<Expr>],
        span: &Span,
    ) -> Value {
        if let Some(definition) = self.group.get(name) {
            let values = args.iter().map(|a| self.eval(frame, a)).collect();
            return self
                .invoke(frame, definition, values, None, span)
                .map_or(Value::Null, Value::Str);
        }
        if BUILTINS.contains(&name) {
            return self.builtin(frame, name, args, span);
        }
        self.report(frame, span, format!("no such template: {}", name));
        Value::Null
    }

    /// Render a named template with positional arguments on top of the current scope
    fn invoke(
        &self,
        frame: &Frame<'_>,
        definition: &TemplateDefinition,
        positional: Vec<Value>,
        implicit: Option<(Value, usize)>,
        span: &Span,
    ) -> Option<String> {
        if frame.depth >= MAX_DEPTH {
            self.report(
                frame,
                span,
                format!("template recursion too deep in {}", definition.name),
            );
            return None;
        }
        let declared_count = definition.formal_parameters.len();
        if positional.len() > declared_count {
            self.report(
                frame,
                span,
                format!(
                    "passed {} arg(s) to template {} with {} declared arg(s)",
                    positional.len(),
                    definition.name,
                    declared_count
                ),
            );
            return None;
        }

        let mut declared = definition.formal_parameters.clone();
        let mut attributes: HashMap<String, Value> = declared
            .iter()
            .cloned()
            .zip(positional)
            .collect();
        if let Some((item, index)) = implicit {
            set_implicit(&mut declared, &mut attributes, item, index);
        }

        let child = frame.child(
            &definition.name,
            definition.source.clone(),
            declared,
            attributes,
        );
        let mut out = String::new();
        self.write_body(&child, &definition.body, &mut out);
        Some(out)
    }

    fn render_subtemplate(
        &self,
        frame: &Frame<'_>,
        sub: &SubTemplate,
        implicit: Option<(Value, usize)>,
    ) -> String {
        let mut declared: Vec<String> = sub.params.iter().map(|p| p.to_string()).collect();
        let mut attributes = HashMap::new();
        if let Some((item, index)) = implicit {
            if let Some(first) = declared.first() {
                attributes.insert(first.clone(), item.clone());
            }
            set_implicit(&mut declared, &mut attributes, item, index);
        }

        let child = frame.child(frame.template, frame.source.clone(), declared, attributes);
        let mut out = String::new();
        self.write_body(&child, &sub.body, &mut out);
        out
    }

    /// Apply a template to each non-null element of `value`
    fn map(&self, frame: &Frame<'_>, value: Value, template: &Spanned<TemplateRef>) -> Value {
        let items: Vec<Value> = match value {
            Value::Null => return Value::Null,
            Value::List(items) => items,
            Value::Map(map) => map.into_keys().map(Value::Str).collect(),
            single => vec![single],
        };
        let items = items.into_iter().filter(|v| !v.is_null());

        let results = match &template.node {
            TemplateRef::Anonymous(sub) => items
                .enumerate()
                .map(|(index, item)| {
                    Value::Str(self.render_subtemplate(frame, sub, Some((item, index))))
                })
                .collect(),
            TemplateRef::Named { name, args } => {
                let Some(definition) = self.group.get(name.as_str()) else {
                    self.report(frame, &template.span, format!("no such template: {}", name));
                    return Value::Null;
                };
                let mut results = Vec::new();
                for (index, item) in items.enumerate() {
                    let mut positional = Vec::new();
                    if !definition.formal_parameters.is_empty() {
                        positional.push(item.clone());
                    }
                    positional.extend(args.iter().map(|a| self.eval(frame, a)));
                    match self.invoke(frame, definition, positional, Some((item, index)), &template.span) {
                        Some(text) => results.push(Value::Str(text)),
                        None => break,
                    }
                }
                results
            }
        };
        Value::List(results)
    }

    fn builtin(&self, frame: &Frame<'_>, name: &str, args: &[Spanned<Expr>], span: &Span) -> Value {
        let [arg] = args else {
            self.report(
                frame,
                span,
                format!("{}() takes exactly 1 argument, {} given", name, args.len()),
            );
            return Value::Null;
        };

        match (name, self.eval(frame, arg)) {
            ("first", Value::List(items)) => items.into_iter().next().unwrap_or_default(),
            ("last", Value::List(items)) => items.into_iter().last().unwrap_or_default(),
            ("rest", Value::List(items)) => Value::List(items.into_iter().skip(1).collect()),
            ("rest", _) => Value::Null,
            ("reverse", Value::List(mut items)) => {
                items.reverse();
                Value::List(items)
            }
            ("length", value) => {
                let len = match &value {
                    Value::Null => 0,
                    Value::List(items) => items.len(),
                    Value::Map(map) => map.len(),
                    _ => 1,
                };
                Value::Int(i64::try_from(len).unwrap_or(i64::MAX))
            }
            ("strlen", Value::Str(s)) => {
                Value::Int(i64::try_from(s.chars().count()).unwrap_or(i64::MAX))
            }
            ("strlen", other) => {
                self.report(
                    frame,
                    span,
                    format!("strlen() expects a string, got {}", other.kind()),
                );
                Value::Null
            }
            ("trim", Value::Str(s)) => Value::Str(s.trim().to_string()),
            ("strip", Value::List(items)) => {
                Value::List(items.into_iter().filter(|v| !v.is_null()).collect())
            }
            (_, value) => value,
        }
    }

    fn report(&self, frame: &Frame<'_>, span: &Span, text: String) {
        let token = MessageToken::at(frame.source.clone(), span.start);
        self.context
            .report(EngineMessage::runtime(text, Some(token)).in_template(frame.template));
    }
}

fn set_implicit(
    declared: &mut Vec<String>,
    attributes: &mut HashMap<String, Value>,
    item: Value,
    index: usize,
) {
    let position = i64::try_from(index).unwrap_or(i64::MAX);
    attributes.entry("it".to_string()).or_insert(item);
    attributes.insert("i".to_string(), Value::Int(position.saturating_add(1)));
    attributes.insert("i0".to_string(), Value::Int(position));
    declared.extend(IMPLICIT_ATTRIBUTES.iter().map(|s| s.to_string()));
}

/// Whether an `if` condition on this value holds
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::List(items) => !items.is_empty(),
        Value::Map(map) => !map.is_empty(),
        _ => true,
    }
}
