//! Evaluatable expression nodes.
//!
//! The compiler (see `rules/arithmetic`) turns a parse tree into an [`Expr`]
//! tree once; the tree is then evaluated, or assigned through, any number of
//! times against different [`Context`]s.
//!
//! ```text
//! Expr ─┬─ Symbol         a            read / write a named slot
//!       ├─ Literal        1, "s"       constant folded at compile time
//!       ├─ Member         a.b          read / write property b of a
//!       ├─ Index          a[i]         read / write key i of a
//!       ├─ Call           f(x, y)      method calls bind `this` to the receiver
//!       ├─ PrefixUnary    -a, ++a
//!       ├─ PostfixUnary   a++
//!       ├─ Binary         a + b, a && b, a, b
//!       ├─ Ternary        c ? a : b    only the chosen branch runs
//!       └─ Expression     (a)          wrapper around a bracketed sub-tree
//! ```
//!
//! ## Invariants
//!
//! - Nodes hold no runtime state: operator functions and children are fixed at
//!   compile time, so an `Expr` is `Send + Sync` and never mutates itself.
//! - Only `Symbol`, `Member`, `Index` and `Expression` wrapping one of them are
//!   lvalues; every other node fails `set` with [`EvalError::ReadOnly`].

use crate::api::Context;
use crate::error::{EvalError, EvalResult};
use crate::value::{Value, format_number};
use std::fmt;

/// Prefix operator implementation.
pub(crate) type UnaryFn = fn(&Value) -> Value;

/// Binary operator implementation (both operands already evaluated).
pub(crate) type BinaryFn = fn(&Value, &Value) -> Value;

/// Where a node came from in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Name of the grammar term that produced the node.
    pub name: String,
    pub position: usize,
    pub length: usize,
}

impl Origin {
    pub fn new(name: impl Into<String>, position: usize, length: usize) -> Self {
        Origin { name: name.into(), position, length }
    }

    /// Smallest origin covering `first` through `last`.
    pub(crate) fn spanning(name: impl Into<String>, first: &Origin, last: &Origin) -> Self {
        let end = (last.position + last.length).max(first.position + first.length);
        Origin::new(name, first.position, end - first.position)
    }
}

/// Behaviour shared by every node.
///
/// `evaluate` and `set` fail by default; each node overrides what it supports.
pub trait Evaluatable {
    fn origin(&self) -> &Origin;

    fn evaluate(&self, _ctx: &Context) -> EvalResult<Value> {
        Err(EvalError::NotEvaluable)
    }

    fn set(&self, _ctx: &Context, _value: Value) -> EvalResult<()> {
        Err(EvalError::ReadOnly)
    }

    /// Values of a call's argument list. A comma sequence yields one value per
    /// operand; anything else a single value.
    fn evaluate_list(&self, ctx: &Context) -> EvalResult<Vec<Value>> {
        Ok(vec![self.evaluate(ctx)?])
    }
}

/// A compile-time constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Number(f64),
    String(String),
}

impl Constant {
    pub fn to_value(&self) -> Value {
        match self {
            Constant::Number(n) => Value::Number(*n),
            Constant::String(s) => Value::String(s.clone()),
        }
    }
}

/// Increment or decrement, read-modify-write through an lvalue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Increment,
    Decrement,
}

impl Step {
    fn apply(self, n: f64) -> f64 {
        match self {
            Step::Increment => n + 1.0,
            Step::Decrement => n - 1.0,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Step::Increment => "++",
            Step::Decrement => "--",
        }
    }
}

// --- Nodes -----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Symbol {
    pub origin: Origin,
    pub name: String,
}

impl Evaluatable for Symbol {
    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn evaluate(&self, ctx: &Context) -> EvalResult<Value> {
        match ctx.lookup(&self.name) {
            Some(value) => Ok(value),
            None if ctx.is_strict() => Err(EvalError::UndefinedVariable(self.name.clone())),
            None => Ok(Value::Undefined),
        }
    }

    fn set(&self, ctx: &Context, value: Value) -> EvalResult<()> {
        ctx.assign(&self.name, value)
    }
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub origin: Origin,
    pub value: Constant,
}

impl Evaluatable for Literal {
    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn evaluate(&self, _ctx: &Context) -> EvalResult<Value> {
        Ok(self.value.to_value())
    }
}

#[derive(Debug, Clone)]
pub struct Member {
    pub origin: Origin,
    pub object: Box<Expr>,
    pub property: String,
}

impl Member {
    /// The evaluated base and the property read from it.
    pub fn receiver(&self, ctx: &Context) -> EvalResult<(Value, Value)> {
        let base = self.object.evaluate(ctx)?;
        let value = base.get_property(&self.property)?;
        Ok((base, value))
    }
}

impl Evaluatable for Member {
    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn evaluate(&self, ctx: &Context) -> EvalResult<Value> {
        self.object.evaluate(ctx)?.get_property(&self.property)
    }

    fn set(&self, ctx: &Context, value: Value) -> EvalResult<()> {
        self.object.evaluate(ctx)?.set_property(&self.property, value)
    }
}

#[derive(Debug, Clone)]
pub struct Index {
    pub origin: Origin,
    pub object: Box<Expr>,
    pub index: Box<Expr>,
}

impl Index {
    pub fn receiver(&self, ctx: &Context) -> EvalResult<(Value, Value)> {
        let base = self.object.evaluate(ctx)?;
        let key = self.index.evaluate(ctx)?;
        let value = base.get_index(&key)?;
        Ok((base, value))
    }
}

impl Evaluatable for Index {
    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn evaluate(&self, ctx: &Context) -> EvalResult<Value> {
        Ok(self.receiver(ctx)?.1)
    }

    fn set(&self, ctx: &Context, value: Value) -> EvalResult<()> {
        let base = self.object.evaluate(ctx)?;
        let key = self.index.evaluate(ctx)?;
        base.set_index(&key, value)
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub origin: Origin,
    pub callee: Box<Expr>,
    /// Argument list root; `None` for `f()`.
    pub arguments: Option<Box<Expr>>,
}

impl Evaluatable for Call {
    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn evaluate(&self, ctx: &Context) -> EvalResult<Value> {
        let (this, callee) = match self.callee.unwrapped() {
            Expr::Member(member) => member.receiver(ctx)?,
            Expr::Index(index) => index.receiver(ctx)?,
            other => (Value::Undefined, other.evaluate(ctx)?),
        };
        let args = match &self.arguments {
            Some(arguments) => arguments.evaluate_list(ctx)?,
            None => Vec::new(),
        };

        match callee {
            Value::Function(function) => function.call(&this, &args),
            _ => Err(EvalError::NotCallable(self.callee.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PrefixOp {
    Apply(UnaryFn),
    Step(Step),
}

#[derive(Debug, Clone)]
pub struct PrefixUnary {
    pub origin: Origin,
    pub operator: String,
    pub op: PrefixOp,
    pub operand: Box<Expr>,
}

impl Evaluatable for PrefixUnary {
    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn evaluate(&self, ctx: &Context) -> EvalResult<Value> {
        match self.op {
            PrefixOp::Apply(apply) => Ok(apply(&self.operand.evaluate(ctx)?)),
            PrefixOp::Step(step) => {
                let updated = Value::Number(step.apply(self.operand.evaluate(ctx)?.to_number()));
                self.operand.set(ctx, updated.clone())?;
                Ok(updated)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostfixUnary {
    pub origin: Origin,
    pub step: Step,
    pub operand: Box<Expr>,
}

impl Evaluatable for PostfixUnary {
    fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Yields the operand's numeric value from before the update.
    fn evaluate(&self, ctx: &Context) -> EvalResult<Value> {
        let old = self.operand.evaluate(ctx)?.to_number();
        self.operand.set(ctx, Value::Number(self.step.apply(old)))?;
        Ok(Value::Number(old))
    }
}

/// How a binary node combines its operands.
#[derive(Debug, Clone, Copy)]
pub enum Combinator {
    /// Evaluate both sides, then apply.
    Apply(BinaryFn),
    /// `&&`: the right side runs only when the left is truthy.
    And,
    /// `||`: the right side runs only when the left is falsy.
    Or,
    /// `,`: evaluate both, keep the right.
    Sequence,
}

#[derive(Debug, Clone)]
pub struct Binary {
    pub origin: Origin,
    pub operator: String,
    pub combinator: Combinator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

impl Evaluatable for Binary {
    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn evaluate(&self, ctx: &Context) -> EvalResult<Value> {
        match self.combinator {
            Combinator::Apply(apply) => {
                let left = self.left.evaluate(ctx)?;
                let right = self.right.evaluate(ctx)?;
                Ok(apply(&left, &right))
            }
            Combinator::And => {
                let left = self.left.evaluate(ctx)?;
                if left.is_truthy() { self.right.evaluate(ctx) } else { Ok(left) }
            }
            Combinator::Or => {
                let left = self.left.evaluate(ctx)?;
                if left.is_truthy() { Ok(left) } else { self.right.evaluate(ctx) }
            }
            Combinator::Sequence => {
                self.left.evaluate(ctx)?;
                self.right.evaluate(ctx)
            }
        }
    }

    fn evaluate_list(&self, ctx: &Context) -> EvalResult<Vec<Value>> {
        match self.combinator {
            Combinator::Sequence => {
                let mut values = self.left.evaluate_list(ctx)?;
                values.push(self.right.evaluate(ctx)?);
                Ok(values)
            }
            _ => Ok(vec![self.evaluate(ctx)?]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ternary {
    pub origin: Origin,
    pub condition: Box<Expr>,
    pub truthy: Box<Expr>,
    pub falsy: Box<Expr>,
}

impl Evaluatable for Ternary {
    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn evaluate(&self, ctx: &Context) -> EvalResult<Value> {
        if self.condition.evaluate(ctx)?.is_truthy() { self.truthy.evaluate(ctx) } else { self.falsy.evaluate(ctx) }
    }
}

/// A bracketed sub-expression; transparent for reads and writes.
#[derive(Debug, Clone)]
pub struct Expression {
    pub origin: Origin,
    pub inner: Box<Expr>,
}

impl Expression {
    /// Wrap `inner`, unless it already is a wrapper.
    pub fn wrap(inner: Expr, origin: Origin) -> Expr {
        match inner {
            Expr::Expression(_) => inner,
            other => Expr::Expression(Expression { origin, inner: Box::new(other) }),
        }
    }
}

impl Evaluatable for Expression {
    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn evaluate(&self, ctx: &Context) -> EvalResult<Value> {
        self.inner.evaluate(ctx)
    }

    fn set(&self, ctx: &Context, value: Value) -> EvalResult<()> {
        self.inner.set(ctx, value)
    }
}

// --- Expr ------------------------------------------------------------------------

/// A compiled expression tree.
#[derive(Debug, Clone)]
pub enum Expr {
    Symbol(Symbol),
    Literal(Literal),
    Member(Member),
    Index(Index),
    Call(Call),
    PrefixUnary(PrefixUnary),
    PostfixUnary(PostfixUnary),
    Binary(Binary),
    Ternary(Ternary),
    Expression(Expression),
}

impl Expr {
    fn as_dyn(&self) -> &dyn Evaluatable {
        match self {
            Expr::Symbol(node) => node,
            Expr::Literal(node) => node,
            Expr::Member(node) => node,
            Expr::Index(node) => node,
            Expr::Call(node) => node,
            Expr::PrefixUnary(node) => node,
            Expr::PostfixUnary(node) => node,
            Expr::Binary(node) => node,
            Expr::Ternary(node) => node,
            Expr::Expression(node) => node,
        }
    }

    /// Look through `Expression` wrappers.
    pub fn unwrapped(&self) -> &Expr {
        match self {
            Expr::Expression(wrapper) => wrapper.inner.unwrapped(),
            other => other,
        }
    }

    /// Whether `set` can succeed on this node.
    pub fn is_lvalue(&self) -> bool {
        matches!(self.unwrapped(), Expr::Symbol(_) | Expr::Member(_) | Expr::Index(_))
    }
}

impl Evaluatable for Expr {
    fn origin(&self) -> &Origin {
        self.as_dyn().origin()
    }

    fn evaluate(&self, ctx: &Context) -> EvalResult<Value> {
        self.as_dyn().evaluate(ctx)
    }

    fn set(&self, ctx: &Context, value: Value) -> EvalResult<()> {
        self.as_dyn().set(ctx, value)
    }

    fn evaluate_list(&self, ctx: &Context) -> EvalResult<Vec<Value>> {
        self.as_dyn().evaluate_list(ctx)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Symbol(node) => f.write_str(&node.name),
            Expr::Literal(node) => match &node.value {
                Constant::Number(n) => f.write_str(&format_number(*n)),
                Constant::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            },
            Expr::Member(node) => write!(f, "{}.{}", node.object, node.property),
            Expr::Index(node) => write!(f, "{}[{}]", node.object, node.index),
            Expr::Call(node) => match &node.arguments {
                Some(arguments) => write!(f, "{}({})", node.callee, arguments),
                None => write!(f, "{}()", node.callee),
            },
            Expr::PrefixUnary(node) => write!(f, "({}{})", node.operator, node.operand),
            Expr::PostfixUnary(node) => write!(f, "({}{})", node.operand, node.step.symbol()),
            Expr::Binary(node) if matches!(node.combinator, Combinator::Sequence) => {
                write!(f, "{}, {}", node.left, node.right)
            }
            Expr::Binary(node) => write!(f, "({} {} {})", node.left, node.operator, node.right),
            Expr::Ternary(node) => write!(f, "({} ? {} : {})", node.condition, node.truthy, node.falsy),
            Expr::Expression(node) => match node.inner.as_ref() {
                Expr::Binary(Binary { combinator: Combinator::Sequence, .. }) => write!(f, "({})", node.inner),
                inner => write!(f, "{inner}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Context, Options};
    use crate::value::Map;

    fn origin() -> Origin {
        Origin::new("test", 0, 0)
    }

    fn symbol(name: &str) -> Expr {
        Expr::Symbol(Symbol { origin: origin(), name: name.to_string() })
    }

    fn number(n: f64) -> Expr {
        Expr::Literal(Literal { origin: origin(), value: Constant::Number(n) })
    }

    #[test]
    fn literals_are_read_only() {
        let scope = Map::new();
        let ctx = Context::new(&scope, None, &Options::default());

        assert_eq!(number(2.0).evaluate(&ctx).unwrap(), Value::from(2));
        assert_eq!(number(2.0).set(&ctx, 1.into()), Err(EvalError::ReadOnly));
        assert!(!number(2.0).is_lvalue());
    }

    #[test]
    fn wrapping_is_idempotent_and_transparent() {
        let scope: Map = [("a", Value::from(1))].into_iter().collect();
        let ctx = Context::new(&scope, None, &Options { raw_scope: true, ..Options::default() });

        let once = Expression::wrap(symbol("a"), origin());
        let twice = Expression::wrap(once.clone(), origin());
        assert!(matches!(&twice, Expr::Expression(w) if matches!(*w.inner, Expr::Symbol(_))));
        assert!(twice.is_lvalue());

        twice.set(&ctx, 5.into()).unwrap();
        assert_eq!(scope.get("a"), Some(Value::from(5)));
        assert_eq!(once.evaluate(&ctx).unwrap(), Value::from(5));
    }

    #[test]
    fn sequence_flattens_only_in_argument_lists() {
        let scope = Map::new();
        let ctx = Context::new(&scope, None, &Options::default());
        let pair = |left, right| {
            Expr::Binary(Binary {
                origin: origin(),
                operator: ",".into(),
                combinator: Combinator::Sequence,
                left: Box::new(left),
                right: Box::new(right),
            })
        };
        let list = pair(pair(number(1.0), number(2.0)), number(3.0));

        assert_eq!(list.evaluate(&ctx).unwrap(), Value::from(3));
        assert_eq!(list.evaluate_list(&ctx).unwrap(), vec![Value::from(1), Value::from(2), Value::from(3)]);

        let wrapped = Expression::wrap(list, origin());
        assert_eq!(wrapped.evaluate_list(&ctx).unwrap(), vec![Value::from(3)]);
    }

    #[test]
    fn expressions_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Expr>();
    }
}
