//! Parse tree to [`Expr`] reduction.
//!
//! A group's children become a work list of items. Each precedence level (see
//! `rules.rs`) rewrites the list in place until it stops changing, then the next
//! level runs:
//!
//! ```text
//! a . b + c * 2          tokens
//! [a] . b + [c] * [2]    19: literals and symbols
//! [a.b] + [c] * [2]      18: member
//! [a.b] + [c * 2]        15
//! [(a.b + (c * 2))]      14
//! ```
//!
//! Bracket groups (parens, call arguments, index keys) are compiled
//! recursively when their level reaches them. Exactly one expression must be
//! left at the end.

use tracing::{debug, trace};

use super::helpers::{parse_number, parse_string};
use super::language::{NUMBER, STRING};
use super::operators::{BINARY_OPERATORS, PREFIX_OPERATORS};
use super::predicates::{is_branches, is_operator};
use super::rules::{Direction, PRECEDENCE, PrecedenceLevel, Reduction};
use crate::expr::{
    Binary, Call, Combinator, Constant, Evaluatable, Expr, Expression, Index, Literal, Member, Origin, PostfixUnary,
    PrefixOp, PrefixUnary, Step, Symbol, Ternary,
};
use crate::{CompileError, ParseNode};

/// One slot of the work list.
#[derive(Debug)]
pub(super) enum Item<'t> {
    /// Not yet reduced.
    Token(&'t ParseNode),
    Expr(Expr),
    /// The `truthy : falsy` half of a ternary, waiting for its `?`.
    Branches { truthy: Expr, falsy: Expr, origin: Origin },
}

impl Item<'_> {
    fn position(&self) -> usize {
        match self {
            Item::Token(node) => node.position(),
            Item::Expr(expr) => expr.origin().position,
            Item::Branches { origin, .. } => origin.position,
        }
    }
}

/// The `(previous, current, next)` view a reducer decides on.
pub(super) struct Window<'a, 't> {
    items: &'a [Item<'t>],
    index: usize,
}

impl<'a, 't> Window<'a, 't> {
    pub(super) fn index(&self) -> usize {
        self.index
    }

    pub(super) fn prev(&self) -> Option<&'a Item<'t>> {
        self.index.checked_sub(1).and_then(|i| self.items.get(i))
    }

    pub(super) fn current(&self) -> Option<&'a Item<'t>> {
        self.items.get(self.index)
    }

    pub(super) fn next(&self) -> Option<&'a Item<'t>> {
        self.items.get(self.index + 1)
    }

    /// Position of the `?` that the `:` at the current position closes.
    ///
    /// Scans leftwards balancing `?` against `:` (and against already built
    /// branch pairs, which stand for a consumed `:`).
    pub(super) fn matching_question(&self) -> Option<usize> {
        let mut depth = 0usize;
        for i in (0..self.index).rev() {
            let item = self.items.get(i);
            if is_operator(item, &[":"]) || is_branches(item) {
                depth += 1;
            } else if is_operator(item, &["?"]) {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
        }
        None
    }
}

/// Compile a tree produced by the arithmetic grammar.
pub fn compile_tree(tree: &ParseNode) -> Result<Expr, CompileError> {
    let origin = origin_of(tree);
    let expr = reduce(tree.children(), &origin)?;
    debug!(nodes = tree.children().len(), expr = %expr, "compiled parse tree");
    Ok(expr)
}

/// Reduce one bracket's children to a single expression.
fn reduce(nodes: &[ParseNode], origin: &Origin) -> Result<Expr, CompileError> {
    let mut items: Vec<Item<'_>> = nodes.iter().map(Item::Token).collect();
    for level in PRECEDENCE {
        reduce_level(&mut items, level)?;
    }
    finish(items, origin)
}

fn reduce_level(items: &mut Vec<Item<'_>>, level: &PrecedenceLevel) -> Result<(), CompileError> {
    loop {
        let mut changed = false;

        match level.direction {
            Direction::LeftToRight => {
                let mut i = 0;
                while i < items.len() {
                    match apply_at(items, i, level)? {
                        Some(at) => {
                            changed = true;
                            i = at;
                        }
                        None => i += 1,
                    }
                }
            }
            Direction::RightToLeft => {
                let mut i = items.len();
                while i > 0 {
                    i -= 1;
                    if let Some(at) = apply_at(items, i, level)? {
                        changed = true;
                        // Revisit the new item so a reducer to its left can use it.
                        i = at + 1;
                    }
                }
            }
        }

        if !changed {
            return Ok(());
        }
    }
}

/// Try the level's reducers at `index`; on a match splice the result in and
/// return its position.
fn apply_at(items: &mut Vec<Item<'_>>, index: usize, level: &PrecedenceLevel) -> Result<Option<usize>, CompileError> {
    let window = Window { items, index };
    let Some(&reduction) = level.reducers.iter().find(|r| r.accepts(&window)) else {
        return Ok(None);
    };

    let range = reduction.splice().range(index);
    let at = *range.start();
    let parts: Vec<Item<'_>> = items.drain(range).collect();
    let item = build(reduction, parts)?;
    trace!(level = level.level, ?reduction, at, "reduced");
    items.insert(at, item);

    Ok(Some(at))
}

fn finish(items: Vec<Item<'_>>, origin: &Origin) -> Result<Expr, CompileError> {
    if let Some(item) = items.iter().find(|&item| is_operator(Some(item), &["?", ":"]) || is_branches(Some(item))) {
        return Err(CompileError::IncompleteTernary { offset: item.position() });
    }

    let remaining = items.len();
    let offset = items.iter().find(|item| !matches!(item, Item::Expr(_))).map_or(origin.position, Item::position);
    let mut items = items.into_iter();
    match (items.next(), items.next()) {
        (Some(Item::Expr(expr)), None) => Ok(expr),
        _ => Err(CompileError::Unreduced { offset, remaining }),
    }
}

// --- Node construction -----------------------------------------------------------

fn build<'t>(reduction: Reduction, parts: Vec<Item<'t>>) -> Result<Item<'t>, CompileError> {
    let offset = parts.first().map_or(0, Item::position);
    let mismatch = || CompileError::Unreduced { offset, remaining: 0 };

    let expr = match reduction {
        Reduction::Literal => {
            let [Item::Token(node)] = take::<1>(parts, offset)? else { return Err(mismatch()) };
            literal(node)?
        }
        Reduction::Symbol => {
            let [Item::Token(node)] = take::<1>(parts, offset)? else { return Err(mismatch()) };
            Expr::Symbol(Symbol { origin: origin_of(node), name: text(node).to_string() })
        }
        Reduction::Group => {
            let [Item::Token(node)] = take::<1>(parts, offset)? else { return Err(mismatch()) };
            let origin = origin_of(node);
            Expression::wrap(reduce(node.children(), &origin)?, origin)
        }
        Reduction::Member => {
            let [Item::Expr(object), Item::Token(dot), Item::Token(property)] = take::<3>(parts, offset)? else {
                return Err(mismatch());
            };
            let origin = Origin::spanning(dot.name(), object.origin(), &origin_of(property));
            Expr::Member(Member { origin, object: Box::new(object), property: text(property).to_string() })
        }
        Reduction::Call => {
            let [Item::Expr(callee), Item::Token(group)] = take::<2>(parts, offset)? else { return Err(mismatch()) };
            let inner = origin_of(group);
            // Not wrapped: a top-level comma list must stay a sequence so that
            // it spreads into positional arguments.
            let arguments = match group.children() {
                [] => None,
                children => Some(Box::new(reduce(children, &inner)?)),
            };
            let origin = Origin::spanning(group.name(), callee.origin(), &inner);
            Expr::Call(Call { origin, callee: Box::new(callee), arguments })
        }
        Reduction::Index => {
            let [Item::Expr(object), Item::Token(group)] = take::<2>(parts, offset)? else { return Err(mismatch()) };
            let inner = origin_of(group);
            let index = reduce(group.children(), &inner)?;
            let origin = Origin::spanning(group.name(), object.origin(), &inner);
            Expr::Index(Index { origin, object: Box::new(object), index: Box::new(index) })
        }
        Reduction::Postfix => {
            let [Item::Expr(operand), Item::Token(op)] = take::<2>(parts, offset)? else { return Err(mismatch()) };
            let step = step(op).ok_or_else(|| unknown_operator(op))?;
            let origin = Origin::spanning(op.name(), operand.origin(), &origin_of(op));
            Expr::PostfixUnary(PostfixUnary { origin, step, operand: Box::new(operand) })
        }
        Reduction::Prefix => {
            let [Item::Token(op), Item::Expr(operand)] = take::<2>(parts, offset)? else { return Err(mismatch()) };
            let prefix = match step(op) {
                Some(step) => PrefixOp::Step(step),
                None => {
                    let apply = PREFIX_OPERATORS.get(text(op)).copied().ok_or_else(|| unknown_operator(op))?;
                    PrefixOp::Apply(apply)
                }
            };
            let origin = Origin::spanning(op.name(), &origin_of(op), operand.origin());
            let operator = text(op).to_string();
            Expr::PrefixUnary(PrefixUnary { origin, operator, op: prefix, operand: Box::new(operand) })
        }
        Reduction::Binary(_) => {
            let [Item::Expr(left), Item::Token(op), Item::Expr(right)] = take::<3>(parts, offset)? else {
                return Err(mismatch());
            };
            let combinator = match text(op) {
                "&&" => Combinator::And,
                "||" => Combinator::Or,
                "," => Combinator::Sequence,
                symbol => {
                    let apply = BINARY_OPERATORS.get(symbol).copied().ok_or_else(|| unknown_operator(op))?;
                    Combinator::Apply(apply)
                }
            };
            let origin = Origin::spanning(op.name(), left.origin(), right.origin());
            Expr::Binary(Binary {
                origin,
                operator: text(op).to_string(),
                combinator,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
        Reduction::Branches => {
            let [Item::Expr(truthy), Item::Token(colon), Item::Expr(falsy)] = take::<3>(parts, offset)? else {
                return Err(mismatch());
            };
            let origin = Origin::spanning(colon.name(), truthy.origin(), falsy.origin());
            return Ok(Item::Branches { truthy, falsy, origin });
        }
        Reduction::Conditional => {
            let [Item::Expr(condition), Item::Token(question), Item::Branches { truthy, falsy, origin: branches }] =
                take::<3>(parts, offset)?
            else {
                return Err(mismatch());
            };
            let origin = Origin::spanning(question.name(), condition.origin(), &branches);
            Expr::Ternary(Ternary {
                origin,
                condition: Box::new(condition),
                truthy: Box::new(truthy),
                falsy: Box::new(falsy),
            })
        }
    };

    Ok(Item::Expr(expr))
}

fn take<'t, const N: usize>(parts: Vec<Item<'t>>, offset: usize) -> Result<[Item<'t>; N], CompileError> {
    let remaining = parts.len();
    <[Item<'t>; N]>::try_from(parts).map_err(|_| CompileError::Unreduced { offset, remaining })
}

fn literal(node: &ParseNode) -> Result<Expr, CompileError> {
    let value = match node.name() {
        NUMBER => Constant::Number(parse_number(text(node), node.position())?),
        STRING => Constant::String(parse_string(text(node), node.position())?),
        _ => return Err(CompileError::InvalidLiteral { text: text(node).to_string(), offset: node.position() }),
    };
    Ok(Expr::Literal(Literal { origin: origin_of(node), value }))
}

fn step(op: &ParseNode) -> Option<Step> {
    match text(op) {
        "++" => Some(Step::Increment),
        "--" => Some(Step::Decrement),
        _ => None,
    }
}

fn unknown_operator(op: &ParseNode) -> CompileError {
    CompileError::UnknownOperator { symbol: text(op).to_string(), offset: op.position() }
}

fn origin_of(node: &ParseNode) -> Origin {
    Origin::new(node.name(), node.position(), node.length())
}

/// Verbatim text of an entity token.
fn text(node: &ParseNode) -> &str {
    node.content().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::arithmetic::arithmetic_grammar;

    fn compiled(source: &str) -> String {
        let tree = arithmetic_grammar().parse(source).unwrap();
        compile_tree(&tree).unwrap_or_else(|e| panic!("{source:?}: {e}")).to_string()
    }

    #[test]
    fn nested_ternaries_pair_with_their_own_question_marks() {
        assert_eq!(compiled("a ? b : c ? d : e"), "(a ? b : (c ? d : e))");
        assert_eq!(compiled("a ? b ? c : d : e"), "(a ? (b ? c : d) : e)");
        assert_eq!(compiled("a ? b : c, d"), "(a ? b : c), d");
    }

    #[test]
    fn origins_span_their_operands() {
        let tree = arithmetic_grammar().parse("x + y * 2").unwrap();
        let expr = compile_tree(&tree).unwrap();
        let origin = expr.origin();

        assert_eq!(origin.name, "operator");
        assert_eq!((origin.position, origin.length), (0, 9));
    }

    #[test]
    fn window_finds_the_matching_question_mark() {
        let tree = arithmetic_grammar().parse("a ? b ? c : d : e").unwrap();
        let items: Vec<Item<'_>> = tree.children().iter().map(Item::Token).collect();

        assert_eq!(Window { items: &items, index: 5 }.matching_question(), Some(3));
        assert_eq!(Window { items: &items, index: 7 }.matching_question(), Some(1));
        assert_eq!(Window { items: &items, index: 1 }.matching_question(), None);
    }
}
