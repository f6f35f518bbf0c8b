//! Abstract Syntax Tree types for templates and template groups

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (alphanumeric + underscore, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A compiled template body
pub type Body = Vec<Spanned<Element>>;

/// One piece of a template body
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Literal text
    Text(String),
    /// `<expr; options>`
    Expr(ExprElement),
    /// `<if(...)>...<endif>`
    If(IfBlock),
}

/// An expression written out by the template, with its rendering options
#[derive(Debug, Clone, PartialEq)]
pub struct ExprElement {
    pub expr: Spanned<Expr>,
    pub options: Vec<Spanned<ExprOption>>,
}

/// Options after `;` in an expression
#[derive(Debug, Clone, PartialEq)]
pub enum ExprOption {
    /// `separator=expr`: written between list elements
    Separator(Spanned<Expr>),
    /// `null=expr`: written in place of null values
    Null(Spanned<Expr>),
    /// `format=expr`: style or pattern for values that have a renderer, such as dates
    Format(Spanned<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Attribute reference: `name`
    Attribute(Identifier),
    /// String literal
    Str(String),
    /// `true` / `false`
    Bool(bool),
    /// List literal: `[a, b]`
    List(Vec<Spanned<Expr>>),
    /// Property access: `target.name` or `target.(expr)`
    Property {
        target: Box<Spanned<Expr>>,
        name: PropertyName,
    },
    /// Template include or built-in call: `name(args)`
    Include {
        name: Identifier,
        args: Vec<Spanned<Expr>>,
    },
    /// Anonymous sub-template written inline: `{...}`
    SubTemplate(SubTemplate),
    /// Apply templates to each element: `target:t1():{x | ...}`
    Map {
        target: Box<Spanned<Expr>>,
        templates: Vec<Spanned<TemplateRef>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyName {
    Named(Identifier),
    Indirect(Box<Spanned<Expr>>),
}

/// Template applied in a map expression
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateRef {
    Named {
        name: Identifier,
        args: Vec<Spanned<Expr>>,
    },
    Anonymous(SubTemplate),
}

/// `{a, b | body}`
#[derive(Debug, Clone, PartialEq)]
pub struct SubTemplate {
    pub params: Vec<Identifier>,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBlock {
    /// `if` followed by any `elseif` branches, in order
    pub branches: Vec<(Condition, Body)>,
    pub otherwise: Option<Body>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Expr(Spanned<Expr>),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

/// A template declared in a group file: `name(a, b) ::= "..."`
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDecl {
    pub name: Spanned<Identifier>,
    pub parameters: Vec<Spanned<Identifier>>,
    pub body: RawBody,
}

/// Uncompiled template text and where it starts in the group source
#[derive(Debug, Clone, PartialEq)]
pub struct RawBody {
    pub text: String,
    pub offset: usize,
}

/// Root names referenced by a template body, in first-appearance order.
///
/// Names bound by sub-template parameters and the implicit iteration attributes are not
/// roots.
pub fn referenced_attributes(body: &Body) -> Vec<String> {
    let mut names = Vec::new();
    collect_body(body, &[], &mut names);
    names
}

/// Names set automatically inside mapped templates
pub(crate) const IMPLICIT_ATTRIBUTES: [&str; 3] = ["it", "i", "i0"];

fn collect_body(body: &Body, bound: &[String], names: &mut Vec<String>) {
    for element in body {
        match &element.node {
            Element::Text(_) => {}
            Element::Expr(e) => {
                collect_expr(&e.expr.node, bound, names);
                for opt in &e.options {
                    match &opt.node {
                        ExprOption::Separator(x) | ExprOption::Null(x) | ExprOption::Format(x) => {
                            collect_expr(&x.node, bound, names)
                        }
                    }
                }
            }
            Element::If(block) => {
                for (cond, branch) in &block.branches {
                    collect_condition(cond, bound, names);
                    collect_body(branch, bound, names);
                }
                if let Some(otherwise) = &block.otherwise {
                    collect_body(otherwise, bound, names);
                }
            }
        }
    }
}

fn collect_condition(cond: &Condition, bound: &[String], names: &mut Vec<String>) {
    match cond {
        Condition::Expr(e) => collect_expr(&e.node, bound, names),
        Condition::Not(c) => collect_condition(c, bound, names),
        Condition::And(a, b) | Condition::Or(a, b) => {
            collect_condition(a, bound, names);
            collect_condition(b, bound, names);
        }
    }
}

fn collect_expr(expr: &Expr, bound: &[String], names: &mut Vec<String>) {
    match expr {
        Expr::Attribute(id) => {
            let name = id.as_str();
            let is_bound =
                bound.iter().any(|b| b == name) || IMPLICIT_ATTRIBUTES.contains(&name);
            if !is_bound && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        Expr::Str(_) | Expr::Bool(_) => {}
        Expr::List(items) => items.iter().for_each(|i| collect_expr(&i.node, bound, names)),
        Expr::Property { target, name } => {
            collect_expr(&target.node, bound, names);
            if let PropertyName::Indirect(e) = name {
                collect_expr(&e.node, bound, names);
            }
        }
        Expr::Include { args, .. } => {
            args.iter().for_each(|a| collect_expr(&a.node, bound, names))
        }
        Expr::SubTemplate(sub) => collect_subtemplate(sub, bound, names),
        Expr::Map { target, templates } => {
            collect_expr(&target.node, bound, names);
            for t in templates {
                match &t.node {
                    TemplateRef::Named { args, .. } => {
                        args.iter().for_each(|a| collect_expr(&a.node, bound, names))
                    }
                    TemplateRef::Anonymous(sub) => collect_subtemplate(sub, bound, names),
                }
            }
        }
    }
}

fn collect_subtemplate(sub: &SubTemplate, bound: &[String], names: &mut Vec<String>) {
    let mut inner = bound.to_vec();
    inner.extend(sub.params.iter().map(|p| p.0.clone()));
    collect_body(&sub.body, &inner, names);
}
