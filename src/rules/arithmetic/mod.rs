//! The arithmetic expression language: grammar, precedence table and compiler.
//!
//! ## Layout
//!
//! - `language.rs`: the grammar, resolved once into a process-wide static.
//! - `rules.rs`: the precedence table (levels, scan directions, reducers).
//! - `predicates.rs`: window predicates the reducers are built from.
//! - `compiler.rs`: the level-by-level reduction into [`Expr`] nodes.
//! - `operators.rs`: symbol to function tables.
//! - `helpers.rs`: literal parsing.

mod compiler;
mod helpers;
mod language;
mod operators;
mod predicates;
mod rules;

#[cfg(test)]
mod tests;

pub use compiler::compile_tree;
pub use language::{arithmetic_grammar, arithmetic_spec};

use crate::{CompileError, Expr};

/// Parse `source` with the arithmetic grammar and compile the tree.
pub(crate) fn compile_source(source: &str) -> Result<Expr, CompileError> {
    let tree = arithmetic_grammar().parse(source)?;
    compile_tree(&tree)
}
