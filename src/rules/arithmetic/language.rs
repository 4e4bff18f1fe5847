use once_cell::sync::Lazy;

use crate::{Grammar, LanguageSpec};

// Term and phrase names
pub(crate) const EXPRESSION: &str = "expression";
pub(crate) const VALUE: &str = "value";
pub(crate) const OPERATION: &str = "operation";
pub(crate) const WHITESPACE: &str = "whitespace";
pub(crate) const NUMBER: &str = "number";
pub(crate) const STRING: &str = "string";
pub(crate) const IDENTIFIER: &str = "identifier";
pub(crate) const PAREN: &str = "paren";
pub(crate) const PREFIX: &str = "prefix";
pub(crate) const CALL: &str = "call";
pub(crate) const INDEX: &str = "index";
pub(crate) const DOT: &str = "dot";
pub(crate) const PROPERTY: &str = "property";
pub(crate) const POSTFIX: &str = "postfix";
pub(crate) const OPERATOR: &str = "operator";

/// Hex integers, or decimals with an optional fraction and exponent.
const NUMBER_PATTERN: &str = r"0[xX][0-9a-fA-F]+|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?";

/// Double- or single-quoted, backslash escapes allowed (newlines included).
const STRING_PATTERN: &str = r#"(?s)"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#;

const IDENTIFIER_PATTERN: &str = r"[A-Za-z_$][A-Za-z0-9_$]*";

static LANGUAGE: Lazy<Grammar> = Lazy::new(|| arithmetic_spec().resolve().expect("arithmetic grammar resolves"));

/// The arithmetic expression language, resolved once per process.
pub fn arithmetic_grammar() -> &'static Grammar {
    &LANGUAGE
}

/// Declarative definition of the arithmetic expression language.
///
/// Tokens alternate between two candidate sets, which is what keeps `-` after
/// a value a binary operator and `-` before one a prefix:
///
/// ```text
/// value:     paren | prefix | number | string | identifier   -> then operation
/// operation: call | index | dot | postfix | operator        -> then value
///            (dot -> property -> operation; postfix -> operation)
/// ```
pub fn arithmetic_spec() -> LanguageSpec {
    LanguageSpec::new(EXPRESSION)
        .phrase(EXPRESSION, [VALUE])
        .phrase(VALUE, [PAREN, PREFIX, NUMBER, STRING, IDENTIFIER])
        .phrase(OPERATION, [CALL, INDEX, DOT, POSTFIX, OPERATOR])
        .term(WHITESPACE, term! { entity: re!(r"\s+") })
        // Value position
        .term(PAREN, term! { start: "(", end: ")", subgroups: [VALUE], postgroups: [OPERATION] })
        .term(PREFIX, term! { entity: ["++", "--", "!", "~", "+", "-"], postgroups: [VALUE] })
        .term(NUMBER, term! { entity: re!(NUMBER_PATTERN), postgroups: [OPERATION] })
        .term(STRING, term! { entity: re!(STRING_PATTERN), postgroups: [OPERATION] })
        .term(IDENTIFIER, term! { entity: re!(IDENTIFIER_PATTERN), postgroups: [OPERATION] })
        // Operation position
        .term(CALL, term! { start: "(", end: ")", subgroups: [VALUE], postgroups: [OPERATION] })
        .term(INDEX, term! { start: "[", end: "]", subgroups: [VALUE], postgroups: [OPERATION] })
        .term(DOT, term! { entity: ".", postgroups: [PROPERTY] })
        .term(PROPERTY, term! { entity: re!(IDENTIFIER_PATTERN), postgroups: [OPERATION] })
        .term(POSTFIX, term! { entity: ["++", "--"], postgroups: [OPERATION] })
        .term(
            OPERATOR,
            term! {
                entity: [
                    ">>>", "===", "!==", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||",
                    "*", "/", "%", "+", "-", "<", ">", "&", "^", "|", "?", ":", ",",
                ],
                postgroups: [VALUE],
            },
        )
        .aether(WHITESPACE)
}
