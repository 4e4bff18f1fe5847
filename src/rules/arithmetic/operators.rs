use std::cmp::Ordering;
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::Value;
use crate::expr::{BinaryFn, UnaryFn};

// `++`/`--` are not here: they write back through their operand, so the
// compiler builds them as steps rather than table lookups.

/// Prefix operators that only read their operand.
pub(crate) static PREFIX_OPERATORS: Lazy<HashMap<&'static str, UnaryFn>> = Lazy::new(|| {
    HashMap::from([
        ("!", (|v: &Value| Value::Bool(!v.is_truthy())) as UnaryFn),
        ("~", (|v: &Value| Value::Number(f64::from(!v.to_int32()))) as UnaryFn),
        ("+", (|v: &Value| Value::Number(v.to_number())) as UnaryFn),
        ("-", (|v: &Value| Value::Number(-v.to_number())) as UnaryFn),
    ])
});

// `&&`, `||` and `,` control evaluation order themselves and are built as
// combinators by the compiler.

/// Binary operators applied to two already evaluated operands.
pub(crate) static BINARY_OPERATORS: Lazy<HashMap<&'static str, BinaryFn>> = Lazy::new(|| {
    HashMap::from([
        ("*", (|a: &Value, b: &Value| Value::Number(a.to_number() * b.to_number())) as BinaryFn),
        ("/", (|a: &Value, b: &Value| Value::Number(a.to_number() / b.to_number())) as BinaryFn),
        ("%", (|a: &Value, b: &Value| Value::Number(a.to_number() % b.to_number())) as BinaryFn),
        ("+", add as BinaryFn),
        ("-", (|a: &Value, b: &Value| Value::Number(a.to_number() - b.to_number())) as BinaryFn),
        ("<<", (|a: &Value, b: &Value| Value::Number(f64::from(a.to_int32().wrapping_shl(b.to_uint32())))) as BinaryFn),
        (">>", (|a: &Value, b: &Value| Value::Number(f64::from(a.to_int32().wrapping_shr(b.to_uint32())))) as BinaryFn),
        (">>>", (|a: &Value, b: &Value| Value::Number(f64::from(a.to_uint32().wrapping_shr(b.to_uint32())))) as BinaryFn),
        ("<", (|a: &Value, b: &Value| Value::Bool(compare(a, b) == Some(Ordering::Less))) as BinaryFn),
        ("<=", (|a: &Value, b: &Value| Value::Bool(matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal)))) as BinaryFn),
        (">", (|a: &Value, b: &Value| Value::Bool(compare(a, b) == Some(Ordering::Greater))) as BinaryFn),
        (">=", (|a: &Value, b: &Value| Value::Bool(matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal)))) as BinaryFn),
        ("==", (|a: &Value, b: &Value| Value::Bool(a.loose_equals(b))) as BinaryFn),
        ("!=", (|a: &Value, b: &Value| Value::Bool(!a.loose_equals(b))) as BinaryFn),
        ("===", (|a: &Value, b: &Value| Value::Bool(a.strict_equals(b))) as BinaryFn),
        ("!==", (|a: &Value, b: &Value| Value::Bool(!a.strict_equals(b))) as BinaryFn),
        ("&", (|a: &Value, b: &Value| Value::Number(f64::from(a.to_int32() & b.to_int32()))) as BinaryFn),
        ("^", (|a: &Value, b: &Value| Value::Number(f64::from(a.to_int32() ^ b.to_int32()))) as BinaryFn),
        ("|", (|a: &Value, b: &Value| Value::Number(f64::from(a.to_int32() | b.to_int32()))) as BinaryFn),
    ])
});

/// `+`: string concatenation when either side is not a plain scalar, numeric
/// addition otherwise.
fn add(a: &Value, b: &Value) -> Value {
    let concatenates = |v: &Value| matches!(v, Value::String(_) | Value::List(_) | Value::Map(_) | Value::Function(_));
    if concatenates(a) || concatenates(b) {
        Value::String(format!("{a}{b}"))
    } else {
        Value::Number(a.to_number() + b.to_number())
    }
}

/// Relational ordering: two strings compare lexicographically, anything else
/// numerically. `None` when either side is NaN.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => a.to_number().partial_cmp(&b.to_number()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(symbol: &str, a: Value, b: Value) -> Value {
        BINARY_OPERATORS[symbol](&a, &b)
    }

    #[test]
    fn right_shift_keeps_the_sign() {
        assert_eq!(binary(">>", (-16).into(), 2.into()), Value::from(-4));
        assert_eq!(binary("<<", (-16).into(), 2.into()), Value::from(-64));
        assert_eq!(binary(">>>", (-16).into(), 2.into()), Value::from(1_073_741_820));
        assert_eq!(binary("<<", 1.into(), 33.into()), Value::from(2));
    }

    #[test]
    fn add_concatenates_strings_and_lists() {
        assert_eq!(binary("+", 1.into(), "1".into()), Value::from("11"));
        assert_eq!(binary("+", vec![Value::from(1), 2.into()].into(), "!".into()), Value::from("1,2!"));
        assert_eq!(binary("+", Value::Bool(true), Value::Null), Value::from(1));
    }

    #[test]
    fn relational_operators_compare_strings_lexicographically() {
        assert_eq!(binary("<", "10".into(), "9".into()), Value::Bool(true));
        assert_eq!(binary("<", "10".into(), 9.into()), Value::Bool(false));
        assert_eq!(binary(">=", f64::NAN.into(), 1.into()), Value::Bool(false));
    }

    #[test]
    fn every_operator_symbol_has_an_implementation() {
        for symbol in ["*", "/", "%", "+", "-", "<<", ">>", ">>>", "<", "<=", ">", ">=", "==", "!=", "===", "!=="] {
            assert!(BINARY_OPERATORS.contains_key(symbol), "missing {symbol}");
        }
        for symbol in ["!", "~", "+", "-"] {
            assert!(PREFIX_OPERATORS.contains_key(symbol), "missing {symbol}");
        }
    }
}
