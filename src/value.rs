//! Runtime values seen by compiled expressions.
//!
//! Scalars are plain data. Lists, maps and functions are shared handles: cloning
//! a `Value::List` clones the handle, not the items, so an assignment through
//! `a.b[0]` is visible to every holder of `a`. The model follows the loose
//! dynamic typing expression languages usually have: `+` concatenates when
//! either side is a string, everything else coerces to a number.

use crate::error::{EvalError, EvalResult};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// Signature of every callable: the bound receiver plus the arguments.
type NativeFn = dyn Fn(&Value, &[Value]) -> EvalResult<Value>;

/// Built-in method implementation.
type Method = fn(&Value, &[Value]) -> EvalResult<Value>;

/// Largest canonical array index (`2^32 - 2`); larger keys are plain property names.
const MAX_INDEX: usize = u32::MAX as usize - 1;

/// Longest a single write may grow a list to.
const MAX_LIST_LEN: usize = 1 << 24;

/// A dynamically typed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(List),
    Map(Map),
    Function(Function),
}

/// Shared, mutable list.
#[derive(Debug, Clone, Default)]
pub struct List(Rc<RefCell<Vec<Value>>>);

/// Shared, mutable string-keyed map. Scopes and locals are maps.
#[derive(Debug, Clone, Default)]
pub struct Map(Rc<RefCell<BTreeMap<String, Value>>>);

/// A callable host function.
#[derive(Clone)]
pub struct Function {
    name: String,
    call: Rc<NativeFn>,
}

// --- Handles -------------------------------------------------------------------

impl List {
    pub fn new(items: Vec<Value>) -> Self {
        List(Rc::new(RefCell::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Store `value` at `index`, padding with `undefined` when writing past the end.
    pub fn set(&self, index: usize, value: Value) -> EvalResult<()> {
        let mut items = self.0.borrow_mut();
        if index >= items.len() {
            let len = index.checked_add(1).filter(|&len| len <= MAX_LIST_LEN).ok_or_else(|| {
                EvalError::Type(format!("list index {index} is out of range (at most {})", MAX_LIST_LEN - 1))
            })?;
            items.resize(len, Value::Undefined);
        }
        items[index] = value;
        Ok(())
    }

    pub fn push(&self, value: Value) -> usize {
        let mut items = self.0.borrow_mut();
        items.push(value);
        items.len()
    }

    pub fn pop(&self) -> Option<Value> {
        self.0.borrow_mut().pop()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// Identity comparison: both handles point at the same list.
    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl Map {
    pub fn new() -> Self {
        Map::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &Map) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Map(Rc::new(RefCell::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())))
    }
}

impl Function {
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> EvalResult<Value> + 'static,
    {
        Function { name: name.into(), call: Rc::new(call) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke with `this` bound to `receiver`.
    pub fn call(&self, receiver: &Value, args: &[Value]) -> EvalResult<Value> {
        (self.call)(receiver, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.call), Rc::as_ptr(&other.call))
    }
}

// --- Conversions -----------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(List::new(items))
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Function(function)
    }
}

impl Value {
    /// A host function value.
    pub fn function<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> EvalResult<Value> + 'static,
    {
        Value::Function(Function::new(name, call))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Function(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::List(_) => string_to_number(&self.to_string()),
            Value::Map(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// Number truncated and wrapped into 32-bit signed range (bitwise operands).
    pub fn to_int32(&self) -> i32 {
        self.to_uint32() as i32
    }

    pub fn to_uint32(&self) -> u32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        n.trunc().rem_euclid(4_294_967_296.0) as u32
    }

    /// Abstract equality (`==`): compares across types after coercion.
    pub fn loose_equals(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            (Bool(a), Bool(b)) => a == b,
            (Bool(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Bool(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Number(a), Number(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Number(a), String(_)) => *a == other.to_number(),
            (String(_), Number(b)) => self.to_number() == *b,
            (List(_) | Map(_) | Function(_), List(_) | Map(_) | Function(_)) => self.strict_equals(other),
            (List(_) | Map(_) | Function(_), _) => Value::String(self.to_string()).loose_equals(other),
            (_, List(_) | Map(_) | Function(_)) => self.loose_equals(&Value::String(other.to_string())),
        }
    }

    /// Strict equality (`===`): same type and value; containers by identity.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }

    // --- Property access ---------------------------------------------------------

    /// Read `self.name`.
    pub fn get_property(&self, name: &str) -> EvalResult<Value> {
        match self {
            Value::Undefined | Value::Null => {
                Err(EvalError::Type(format!("cannot read property '{name}' of {}", self.type_name())))
            }
            Value::Map(map) => Ok(map.get(name).unwrap_or_default()),
            Value::List(list) => {
                if name == "length" {
                    return Ok(list.len().into());
                }
                if let Some(index) = array_index(name) {
                    return Ok(list.get(index).unwrap_or_default());
                }
                Ok(method(&LIST_METHODS, name))
            }
            Value::String(s) => {
                if name == "length" {
                    return Ok(s.chars().count().into());
                }
                if let Some(index) = array_index(name) {
                    return Ok(s.chars().nth(index).map(|c| Value::String(c.to_string())).unwrap_or_default());
                }
                Ok(method(&STRING_METHODS, name))
            }
            Value::Function(f) if name == "name" => Ok(f.name().into()),
            _ => Ok(Value::Undefined),
        }
    }

    /// Write `self.name = value`.
    pub fn set_property(&self, name: &str, value: Value) -> EvalResult<()> {
        match self {
            Value::Undefined | Value::Null => {
                Err(EvalError::MissingIntermediate { property: name.to_string(), base: self.type_name() })
            }
            Value::Map(map) => {
                map.insert(name, value);
                Ok(())
            }
            Value::List(list) => match array_index(name) {
                Some(index) => list.set(index, value),
                None => Err(EvalError::Type(format!("cannot set property '{name}' of a list"))),
            },
            _ => Err(EvalError::Type(format!("cannot set property '{name}' of {}", self.type_name()))),
        }
    }

    /// Read `self[key]`.
    pub fn get_index(&self, key: &Value) -> EvalResult<Value> {
        self.get_property(&key.to_string())
    }

    /// Write `self[key] = value`.
    pub fn set_index(&self, key: &Value, value: Value) -> EvalResult<()> {
        self.set_property(&key.to_string(), value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::List(list) => f.write_str(&join_items(list, ",")),
            Value::Map(_) => f.write_str("[object Map]"),
            Value::Function(func) => write!(f, "function {}() {{ [native code] }}", func.name()),
        }
    }
}

thread_local! {
    /// Lists being rendered on this thread, innermost last.
    static RENDERING: RefCell<Vec<*const RefCell<Vec<Value>>>> = const { RefCell::new(Vec::new()) };
}

/// Render the items of `list` joined by `separator`. Nullish items render as
/// nothing, and so does a list met again while it is being rendered.
fn join_items(list: &List, separator: &str) -> String {
    let id = Rc::as_ptr(&list.0);
    let entered = RENDERING.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.contains(&id) {
            return false;
        }
        stack.push(id);
        true
    });
    if !entered {
        return String::new();
    }

    let parts: Vec<String> =
        list.to_vec().iter().map(|v| if v.is_nullish() { String::new() } else { v.to_string() }).collect();
    RENDERING.with(|stack| stack.borrow_mut().pop());
    parts.join(separator)
}

/// Render a number the way it is written in source: integral values carry no
/// fraction, non-finite values print as `NaN` / `Infinity`.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return parse_hex(hex).unwrap_or(f64::NAN);
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if regex!(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").is_match(s) {
        s.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Hex digits (no prefix) accumulated as `f64`, so long runs lose precision
/// instead of overflowing. `None` when empty or on a non-hex digit.
pub(crate) fn parse_hex(digits: &str) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0f64, |acc, c| c.to_digit(16).map(|d| acc * 16.0 + f64::from(d)))
}

/// Canonical non-negative integer keys ("0", "12", not "01" or "1.5").
fn array_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok().filter(|&index| index <= MAX_INDEX)
}

// --- Built-in methods ------------------------------------------------------------

fn method(table: &HashMap<&'static str, Method>, name: &str) -> Value {
    match table.get_key_value(name) {
        Some((&name, &call)) => Value::Function(Function::new(name, call)),
        None => Value::Undefined,
    }
}

/// Methods available on every list, bound to the receiver when called.
static LIST_METHODS: Lazy<HashMap<&'static str, Method>> = Lazy::new(|| {
    HashMap::from([
        ("join", list_join as Method),
        ("push", list_push as Method),
        ("pop", list_pop as Method),
        ("indexOf", list_index_of as Method),
        ("includes", list_includes as Method),
        ("slice", list_slice as Method),
    ])
});

/// Methods available on every string.
static STRING_METHODS: Lazy<HashMap<&'static str, Method>> = Lazy::new(|| {
    HashMap::from([
        ("toUpperCase", string_to_upper as Method),
        ("toLowerCase", string_to_lower as Method),
        ("trim", string_trim as Method),
        ("indexOf", string_index_of as Method),
        ("slice", string_slice as Method),
        ("split", string_split as Method),
    ])
});

fn receiver_list(this: &Value) -> EvalResult<&List> {
    match this {
        Value::List(list) => Ok(list),
        other => Err(EvalError::Type(format!("list method called on {}", other.type_name()))),
    }
}

fn receiver_str(this: &Value) -> EvalResult<&str> {
    match this {
        Value::String(s) => Ok(s),
        other => Err(EvalError::Type(format!("string method called on {}", other.type_name()))),
    }
}

/// Resolve a possibly negative `slice` bound against `len`.
fn relative_index(arg: Option<&Value>, len: usize, default: usize) -> usize {
    match arg {
        None | Some(Value::Undefined) => default,
        Some(v) => {
            let n = v.to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            if n < 0.0 { (len as f64 + n).max(0.0) as usize } else { (n as usize).min(len) }
        }
    }
}

fn list_join(this: &Value, args: &[Value]) -> EvalResult<Value> {
    let list = receiver_list(this)?;
    let separator = match args.first() {
        None | Some(Value::Undefined) => ",".to_string(),
        Some(sep) => sep.to_string(),
    };
    Ok(join_items(list, &separator).into())
}

fn list_push(this: &Value, args: &[Value]) -> EvalResult<Value> {
    let list = receiver_list(this)?;
    let mut len = list.len();
    for arg in args {
        len = list.push(arg.clone());
    }
    Ok(len.into())
}

fn list_pop(this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(receiver_list(this)?.pop().unwrap_or_default())
}

fn list_index_of(this: &Value, args: &[Value]) -> EvalResult<Value> {
    let needle = args.first().cloned().unwrap_or_default();
    let position = receiver_list(this)?.to_vec().iter().position(|v| v.strict_equals(&needle));
    Ok(position.map_or(Value::Number(-1.0), Value::from))
}

fn list_includes(this: &Value, args: &[Value]) -> EvalResult<Value> {
    let needle = args.first().cloned().unwrap_or_default();
    let nan = matches!(needle, Value::Number(n) if n.is_nan());
    let found = receiver_list(this)?
        .to_vec()
        .iter()
        .any(|v| v.strict_equals(&needle) || (nan && matches!(v, Value::Number(n) if n.is_nan())));
    Ok(found.into())
}

fn list_slice(this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = receiver_list(this)?.to_vec();
    let start = relative_index(args.first(), items.len(), 0);
    let end = relative_index(args.get(1), items.len(), items.len());
    Ok(items.get(start..end.max(start)).unwrap_or_default().to_vec().into())
}

fn string_to_upper(this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(receiver_str(this)?.to_uppercase().into())
}

fn string_to_lower(this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(receiver_str(this)?.to_lowercase().into())
}

fn string_trim(this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(receiver_str(this)?.trim().into())
}

fn string_index_of(this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = receiver_str(this)?;
    let needle = args.first().map(Value::to_string).unwrap_or_else(|| "undefined".to_string());
    let position = s.find(&needle).map(|byte| s[..byte].chars().count());
    Ok(position.map_or(Value::Number(-1.0), Value::from))
}

fn string_slice(this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars: Vec<char> = receiver_str(this)?.chars().collect();
    let start = relative_index(args.first(), chars.len(), 0);
    let end = relative_index(args.get(1), chars.len(), chars.len());
    Ok(chars.get(start..end.max(start)).unwrap_or_default().iter().collect::<String>().into())
}

fn string_split(this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = receiver_str(this)?;
    let parts: Vec<Value> = match args.first() {
        None | Some(Value::Undefined) => vec![s.into()],
        Some(sep) => {
            let sep = sep.to_string();
            if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(Value::from).collect()
            }
        }
    };
    Ok(parts.into())
}
