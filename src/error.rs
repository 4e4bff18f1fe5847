//! Errors, one enum per phase.
//!
//! ```text
//! LanguageSpec ─▶ ResolveError      (grammar construction)
//! Grammar      ─▶ ParseError        (one `parse` call)
//! ParseNode    ─▶ CompileError      (one expression string)
//! Expr         ─▶ EvalError         (one `evaluate` / `set` call)
//! ```
//!
//! Every failure aborts the operation that raised it; there are no partial
//! results. [`Error`] unifies the four for callers that go from source text to a
//! value in one step.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Result of evaluating or assigning through an expression.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Grammar resolution errors; raised before any parsing happens.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("unresolved reference '{name}' (referenced by '{referrer}')")]
    UnresolvedReference { name: String, referrer: String },

    #[error("no root specified: '{0}' is not defined")]
    NoRoot(String),

    #[error("invalid term '{name}': {reason}")]
    InvalidTerm { name: String, reason: &'static str },

    #[error("invalid marker pattern in term '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while parsing one input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error at offset {offset} near {context:?}")]
    Syntax { offset: usize, context: String },

    #[error("unterminated group '{name}': '{marker}' opened at offset {offset} was never closed")]
    Unterminated { name: String, marker: String, offset: usize },
}

impl ParseError {
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Syntax { offset, .. } | ParseError::Unterminated { offset, .. } => *offset,
        }
    }
}

/// Errors raised while compiling an expression string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error("failed to parse expression at offset {offset} ({remaining} unreduced nodes)")]
    Unreduced { offset: usize, remaining: usize },

    #[error("incomplete ternary (missing ?/:) at offset {offset}")]
    IncompleteTernary { offset: usize },

    #[error("could not resolve operator '{symbol}' at offset {offset}")]
    UnknownOperator { symbol: String, offset: usize },

    #[error("invalid literal {text:?} at offset {offset}")]
    InvalidLiteral { text: String, offset: usize },
}

/// Errors raised while evaluating, or assigning through, a compiled expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("expression is read-only")]
    ReadOnly,

    #[error("expression cannot be evaluated")]
    NotEvaluable,

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("cannot set property '{property}' of {base}")]
    MissingIntermediate { property: String, base: &'static str },

    #[error("type error: {0}")]
    Type(String),

    /// Raised by a host function stored in the scope.
    #[error("{0}")]
    Host(String),
}
