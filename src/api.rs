use crate::error::{CompileError, EvalError, EvalResult, Result};
use crate::expr::{Evaluatable, Expr};
use crate::rules::arithmetic;
use crate::value::{Map, Value};
use tracing::debug;

/// Evaluation context.
///
/// A stack of lookup frames searched front to back, plus the map that receives
/// writes to bare symbols.
///
/// ```text
/// default:   [temporary, locals?, scope, constants]   writes -> temporary
/// raw_scope: [locals?, scope]                         writes -> first frame holding the name, else scope
/// ```
///
/// Member and index writes never touch the frames: they go through whatever
/// object the base evaluates to, so `a.b = 1` reaches the caller's `a` in
/// either mode.
#[derive(Debug, Clone)]
pub struct Context {
    frames: Vec<Map>,
    temporary: Option<Map>,
    strict: bool,
}

impl Context {
    pub fn new(scope: &Map, locals: Option<&Map>, options: &Options) -> Self {
        let mut frames = Vec::with_capacity(4);
        let temporary = if options.raw_scope {
            None
        } else {
            let temporary = Map::new();
            frames.push(temporary.clone());
            Some(temporary)
        };
        frames.extend(locals.cloned());
        frames.push(scope.clone());
        if !options.raw_scope {
            frames.push(Self::constants());
        }

        Context { frames, temporary, strict: !options.not_strict }
    }

    /// Built-in names visible to every non-raw evaluation.
    pub fn constants() -> Map {
        [
            ("null", Value::Null),
            ("undefined", Value::Undefined),
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
            ("NaN", Value::Number(f64::NAN)),
            ("Infinity", Value::Number(f64::INFINITY)),
        ]
        .into_iter()
        .collect()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains_key(name))
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.frames.iter().find_map(|frame| frame.get(name))
    }

    /// Write a bare symbol. In strict mode the name must already exist.
    pub fn assign(&self, name: &str, value: Value) -> EvalResult<()> {
        let holder = self.frames.iter().find(|frame| frame.contains_key(name));
        if holder.is_none() && self.strict {
            return Err(EvalError::UndefinedVariable(name.to_string()));
        }

        let target = match (&self.temporary, holder) {
            (Some(temporary), _) => temporary,
            (None, Some(frame)) => frame,
            // Raw frames always end with the scope.
            (None, None) => match self.frames.last() {
                Some(scope) => scope,
                None => return Err(EvalError::UndefinedVariable(name.to_string())),
            },
        };
        target.insert(name, value);
        Ok(())
    }
}

/// Options that affect evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Evaluate directly against the caller's scope: bare-symbol writes are
    /// visible to the caller and the built-in constants are not injected.
    pub raw_scope: bool,
    /// Read missing names as `undefined` and create them on write instead of
    /// failing.
    pub not_strict: bool,
}

/// A compiled arithmetic expression, ready to run against any number of scopes.
///
/// # Example
/// ```
/// use dialect::{Evaluator, Map, Value};
///
/// let scope: Map = [("x", Value::from(4))].into_iter().collect();
/// let eval = Evaluator::new("x * (x + 1)").unwrap();
/// assert_eq!(eval.evaluate(&scope).unwrap(), Value::from(20));
/// ```
#[derive(Debug, Clone)]
pub struct Evaluator {
    source: String,
    expression: Expr,
    options: Options,
}

impl Evaluator {
    pub fn new(source: &str) -> std::result::Result<Self, CompileError> {
        let expression = arithmetic::compile_source(source)?;
        debug!(source, compiled = %expression, "compiled expression");
        Ok(Evaluator { source: source.to_string(), expression, options: Options::default() })
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn evaluate(&self, scope: &Map) -> EvalResult<Value> {
        self.evaluate_with(scope, None)
    }

    /// Evaluate with `locals` shadowing `scope`.
    pub fn evaluate_with(&self, scope: &Map, locals: Option<&Map>) -> EvalResult<Value> {
        let ctx = Context::new(scope, locals, &self.options);
        self.expression.evaluate(&ctx)
    }

    /// Assign `value` to the expression, which must be an lvalue (`a`, `a.b`, `a[i]`).
    pub fn set(&self, scope: &Map, value: Value) -> EvalResult<()> {
        self.set_with(scope, None, value)
    }

    pub fn set_with(&self, scope: &Map, locals: Option<&Map>, value: Value) -> EvalResult<()> {
        let ctx = Context::new(scope, locals, &self.options);
        self.expression.set(&ctx, value)
    }
}

/// Compile `source` with default [`Options`].
pub fn compile(source: &str) -> Result<Evaluator> {
    Ok(Evaluator::new(source)?)
}

/// Compile `source` and evaluate it once against `scope`.
///
/// # Example
/// ```
/// use dialect::{Map, Value, evaluate};
///
/// let out = evaluate("5 + 0 ? 1 + 2 : 2 + 3", &Map::new()).unwrap();
/// assert_eq!(out, Value::from(3));
/// ```
pub fn evaluate(source: &str, scope: &Map) -> Result<Value> {
    Ok(compile(source)?.evaluate(scope)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::cell::Cell;
    use std::rc::Rc;

    fn scope(entries: Vec<(&str, Value)>) -> Map {
        entries.into_iter().collect()
    }

    #[test]
    fn strict_mode_rejects_unknown_names() {
        let scope = scope(vec![("object", Map::new().into())]);

        let err = evaluate("doesntExist", &scope).unwrap_err();
        assert!(matches!(err, Error::Eval(EvalError::UndefinedVariable(ref name)) if name == "doesntExist"));
        assert_eq!(evaluate("object.doesntExist", &scope).unwrap(), Value::Undefined);

        let lenient = Evaluator::new("doesntExist").unwrap();
        let lenient = lenient.with_options(Options { not_strict: true, ..Options::default() });
        assert_eq!(lenient.evaluate(&scope).unwrap(), Value::Undefined);
    }

    #[test]
    fn lvalue_chains_mutate_the_callers_objects() {
        let data: Map = [("array", Value::from(vec![1.into(), 2.into(), 3.into()]))].into_iter().collect();
        let scope = scope(vec![("data", data.into())]);

        compile("data.array[1]").unwrap().set(&scope, 4.into()).unwrap();

        assert_eq!(evaluate("data.array[1]", &scope).unwrap(), Value::from(4));
        assert_eq!(evaluate("data.array.join()", &scope).unwrap(), Value::from("1,4,3"));
    }

    #[test]
    fn writing_through_a_missing_intermediate_fails() {
        let scope = scope(vec![("data", Map::new().into())]);
        let err = compile("data.missing.x").unwrap().set(&scope, 1.into()).unwrap_err();

        assert_eq!(err, EvalError::MissingIntermediate { property: "x".into(), base: "undefined" });
    }

    #[test]
    fn logical_operators_short_circuit() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let side_effect = Value::function("sideEffect", move |_, _| {
            counter.set(counter.get() + 1);
            Ok(Value::Bool(false))
        });
        let scope = scope(vec![("sideEffect", side_effect)]);

        assert_eq!(evaluate("true || sideEffect()", &scope).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("false && sideEffect()", &scope).unwrap(), Value::Bool(false));
        assert_eq!(calls.get(), 0);

        assert_eq!(evaluate("false || sideEffect()", &scope).unwrap(), Value::Bool(false));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn bare_symbol_writes_stay_in_the_temporary_frame() {
        let scope = scope(vec![("x", 1.into())]);
        let eval = compile("x").unwrap();

        eval.set(&scope, 2.into()).unwrap();
        assert_eq!(scope.get("x"), Some(Value::from(1)));

        let raw = eval.with_options(Options { raw_scope: true, ..Options::default() });
        raw.set(&scope, 2.into()).unwrap();
        assert_eq!(scope.get("x"), Some(Value::from(2)));
    }

    #[test]
    fn raw_scope_hides_constants() {
        let raw = Options { raw_scope: true, ..Options::default() };
        let eval = compile("true").unwrap().with_options(raw);

        assert!(matches!(eval.evaluate(&Map::new()), Err(EvalError::UndefinedVariable(_))));
        assert_eq!(eval.evaluate(&scope(vec![("true", 7.into())])).unwrap(), Value::from(7));
        assert_eq!(evaluate("Infinity > 1e308 && NaN != NaN", &Map::new()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn locals_shadow_scope() {
        let scope = scope(vec![("x", 1.into()), ("y", 10.into())]);
        let locals: Map = [("x", Value::from(5))].into_iter().collect();
        let eval = compile("x + y").unwrap();

        assert_eq!(eval.evaluate_with(&scope, Some(&locals)).unwrap(), Value::from(15));
        assert_eq!(eval.evaluate(&scope).unwrap(), Value::from(11));

        // In raw mode a write lands in the frame that holds the name.
        let raw = compile("x").unwrap().with_options(Options { raw_scope: true, ..Options::default() });
        raw.set_with(&scope, Some(&locals), 9.into()).unwrap();
        assert_eq!(locals.get("x"), Some(Value::from(9)));
        assert_eq!(scope.get("x"), Some(Value::from(1)));
    }

    #[test]
    fn not_strict_creates_missing_names() {
        let scope = Map::new();
        let options = Options { raw_scope: true, not_strict: true };
        compile("fresh").unwrap().with_options(options).set(&scope, "v".into()).unwrap();

        assert_eq!(scope.get("fresh"), Some(Value::from("v")));
        assert!(compile("fresh").unwrap().set(&Map::new(), 1.into()).is_err());
    }

    #[test]
    fn method_calls_bind_the_receiver() {
        let scope = scope(vec![("name", " Ada ".into()), ("list", vec![Value::from(1)].into())]);

        assert_eq!(evaluate("name.trim().toUpperCase()", &scope).unwrap(), Value::from("ADA"));
        assert_eq!(evaluate("list.push(2, 3)", &scope).unwrap(), Value::from(3));
        assert_eq!(evaluate("list.join('-')", &scope).unwrap(), Value::from("1-2-3"));
        assert!(matches!(evaluate("name()", &scope), Err(Error::Eval(EvalError::NotCallable(_)))));
    }

    #[test]
    fn oversized_list_writes_fail_cleanly() {
        let scope = scope(vec![("a", vec![Value::from(1)].into())]);

        let err = compile("a['18446744073709551615']").unwrap().set(&scope, 1.into()).unwrap_err();
        assert!(matches!(err, EvalError::Type(_)));
        assert!(matches!(compile("a[4294967294]").unwrap().set(&scope, 1.into()), Err(EvalError::Type(_))));
        assert_eq!(evaluate("a.length", &scope).unwrap(), Value::from(1));
    }

    #[test]
    fn list_pushed_into_itself_still_renders() {
        let scope = scope(vec![("a", vec![Value::from(1)].into())]);

        assert_eq!(evaluate("a.push(a)", &scope).unwrap(), Value::from(2));
        assert_eq!(evaluate("a.join()", &scope).unwrap(), Value::from("1,"));
        assert_eq!(evaluate("a + ''", &scope).unwrap(), Value::from("1,"));
        assert_eq!(evaluate("a == '1,'", &scope).unwrap(), Value::Bool(true));
    }

    #[test]
    fn increments_write_back() {
        let counter: Map = [("n", Value::from(1))].into_iter().collect();
        let scope = scope(vec![("counter", counter.clone().into())]);

        assert_eq!(evaluate("counter.n++", &scope).unwrap(), Value::from(1));
        assert_eq!(evaluate("++counter.n", &scope).unwrap(), Value::from(3));
        assert_eq!(counter.get("n"), Some(Value::from(3)));
        assert!(matches!(evaluate("1++", &scope), Err(Error::Eval(EvalError::ReadOnly))));
    }

    #[test]
    fn compiling_twice_gives_independent_equal_trees() {
        let scope = scope(vec![("a", 2.into()), ("b", 3.into())]);
        let first = compile("a * b + a").unwrap();
        let second = compile("a * b + a").unwrap();

        assert_eq!(first.evaluate(&scope).unwrap(), second.evaluate(&scope).unwrap());
        assert_eq!(first.expression().to_string(), second.expression().to_string());
    }

    #[test]
    fn evaluator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Evaluator>();
    }
}
