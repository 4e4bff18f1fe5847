use super::compiler::Item;
use super::language::OPERATOR;

/// Returns true when the slot holds an already compiled expression.
pub(super) fn is_expr(item: Option<&Item<'_>>) -> bool {
    matches!(item, Some(Item::Expr(_)))
}

/// Returns true when the slot holds an unreduced leaf token of term `name`.
pub(super) fn is_entity(item: Option<&Item<'_>>, name: &str) -> bool {
    matches!(item, Some(Item::Token(node)) if node.is_entity() && node.name() == name)
}

/// Returns true when the slot holds an unreduced bracket group of term `name`.
pub(super) fn is_group(item: Option<&Item<'_>>, name: &str) -> bool {
    matches!(item, Some(Item::Token(node)) if !node.is_entity() && node.name() == name)
}

/// Returns true when the slot holds an operator token spelled as one of `symbols`.
pub(super) fn is_operator(item: Option<&Item<'_>>, symbols: &[&str]) -> bool {
    matches!(item, Some(Item::Token(node))
        if node.name() == OPERATOR && node.content().is_some_and(|c| symbols.contains(&c)))
}

/// Returns true when the slot holds the `(truthy : falsy)` half of a ternary.
pub(super) fn is_branches(item: Option<&Item<'_>>) -> bool {
    matches!(item, Some(Item::Branches { .. }))
}
