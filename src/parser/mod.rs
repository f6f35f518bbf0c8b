//! Parser for templates and template group files

pub mod ast;
mod grammar;
mod group;
pub mod lexer;

pub use ast::*;
pub use grammar::parse_template;
pub use group::{parse_group, GroupToken};
