//! A toolkit for small domain-specific languages.
//!
//! The crate pairs two pieces:
//!
//! - a **recursive grammar engine**: a declarative [`LanguageSpec`] (named terms
//!   and phrases that reference each other, recursively if needed) is resolved
//!   into a [`Grammar`], which parses text into a tree of [`ParseNode`]s using
//!   first-match-wins candidate sets, postgroup continuation sets, optional
//!   backtracking and a floating "aether" token class (typically whitespace);
//! - an **arithmetic expression compiler**: a parse tree produced by the bundled
//!   arithmetic grammar is reduced, precedence level by precedence level, into an
//!   [`Expr`] tree that can be evaluated (and assigned through) many times against
//!   different scopes.
//!
//! ```text
//! LanguageSpec ──resolve──▶ Grammar ──parse──▶ ParseNode ──compile──▶ Expr
//!                                                                    │
//!                                     Evaluator(scope, locals) ◀─────┘
//! ```

use std::collections::BTreeMap;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod expr;
mod rules;
mod value;

pub use api::{Context, Evaluator, Options, compile, evaluate};
pub use engine::{Grammar, Matcher, Parser, Term, TermFlags, TermId, resolve, unparse};
pub use error::{CompileError, Error, EvalError, EvalResult, ParseError, ResolveError, Result};
pub use expr::{
    Binary, Call, Constant, Evaluatable, Expr, Expression, Index, Literal, Member, Origin, PostfixUnary, PrefixUnary,
    Step, Symbol, Ternary,
};
pub use rules::arithmetic::{arithmetic_grammar, arithmetic_spec, compile_tree};
pub use value::{Function, List, Map, Value};

// --- Grammar spec format -----------------------------------------------------

/// How a term's start (or end) is recognized in the input.
///
/// Every marker is compiled into a regular expression anchored at the current
/// scan offset when the spec is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// A literal string, matched verbatim.
    Literal(String),
    /// A set of literal alternatives. The longest alternative is tried first so
    /// that `>>>` is never read as `>>` followed by `>`.
    AnyOf(Vec<String>),
    /// A regular expression (the `regex` crate dialect).
    Pattern(String),
}

impl From<&str> for Marker {
    fn from(literal: &str) -> Self {
        Marker::Literal(literal.to_string())
    }
}

impl From<String> for Marker {
    fn from(literal: String) -> Self {
        Marker::Literal(literal)
    }
}

impl<const N: usize> From<[&str; N]> for Marker {
    fn from(alternatives: [&str; N]) -> Self {
        Marker::AnyOf(alternatives.iter().map(|s| s.to_string()).collect())
    }
}

/// Declarative definition of a single term.
///
/// Fields are deliberately loose (everything optional) so that a spec can be
/// assembled from any source; [`LanguageSpec::resolve`] rejects combinations that
/// make no sense:
///
/// ```text
/// entity:  { entity }                                  (no start/end, no subgroups)
/// group:   { start, end, subgroups, postgroups? }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermDef {
    /// Marker of a leaf token. Mutually exclusive with `start`/`end`.
    pub entity: Option<Marker>,
    /// Opening marker of a group.
    pub start: Option<Marker>,
    /// Closing marker of a group.
    pub end: Option<Marker>,
    /// Candidate terms inside a group, by name (terms or phrases), in priority order.
    pub subgroups: Option<Vec<String>>,
    /// Candidate set to switch to once this term has matched.
    pub postgroups: Option<Vec<String>>,
    /// Keep the current candidate set after this term matches.
    pub same_postgroups: bool,
}

impl TermDef {
    /// A leaf token recognized by `marker`.
    pub fn entity(marker: impl Into<Marker>) -> Self {
        TermDef { entity: Some(marker.into()), ..TermDef::default() }
    }

    /// A bracketed group whose body may contain `subgroups`.
    pub fn group<I, S>(start: impl Into<Marker>, end: impl Into<Marker>, subgroups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TermDef {
            start: Some(start.into()),
            end: Some(end.into()),
            subgroups: Some(subgroups.into_iter().map(Into::into).collect()),
            ..TermDef::default()
        }
    }

    /// Set the candidate set used after this term matches.
    pub fn postgroups<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.postgroups = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Keep the current candidate set after this term matches.
    pub fn same_postgroups(mut self) -> Self {
        self.same_postgroups = true;
        self
    }
}

/// A named entry of a [`LanguageSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Term(TermDef),
    /// A reusable, ordered alternative-set of term (or phrase) names.
    Phrase(Vec<String>),
}

/// A declarative language: named terms and phrases plus the root phrase.
///
/// ```
/// use dialect::{LanguageSpec, TermDef};
///
/// let grammar = LanguageSpec::new("root")
///     .phrase("root", ["word", "list"])
///     .term("word", TermDef::entity(dialect::re!(r"[a-z]+")))
///     .term("list", TermDef::group("(", ")", ["root"]))
///     .term("space", TermDef::entity(dialect::re!(r"\s+")))
///     .aether("space")
///     .resolve()
///     .unwrap();
///
/// let tree = grammar.parse("(a (b c))").unwrap();
/// assert_eq!(tree.unparse(), "(a (b c))");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageSpec {
    pub definitions: BTreeMap<String, Definition>,
    pub root: String,
    pub aether: Option<String>,
}

impl LanguageSpec {
    /// Start a spec whose root candidate list is the phrase (or term) `root`.
    pub fn new(root: impl Into<String>) -> Self {
        LanguageSpec { definitions: BTreeMap::new(), root: root.into(), aether: None }
    }

    pub fn term(mut self, name: impl Into<String>, def: TermDef) -> Self {
        self.definitions.insert(name.into(), Definition::Term(def));
        self
    }

    pub fn phrase<I, S>(mut self, name: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definitions.insert(name.into(), Definition::Phrase(names.into_iter().map(Into::into).collect()));
        self
    }

    /// Designate the term matched, and discarded, between any two tokens.
    pub fn aether(mut self, name: impl Into<String>) -> Self {
        self.aether = Some(name.into());
        self
    }

    /// Resolve every definition into a [`Grammar`].
    pub fn resolve(&self) -> std::result::Result<Grammar, ResolveError> {
        engine::resolve(self)
    }
}

// --- Parse tree ----------------------------------------------------------------

/// Parser configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Retry the next candidate when a group's body fails to parse.
    pub backtrack: bool,
    /// Keep the verbatim source span on group nodes, not only on entities.
    pub original_strings: bool,
}

/// A matched leaf token.
///
/// `position`/`length` are byte offsets into the parsed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityNode {
    pub name: String,
    pub position: usize,
    pub length: usize,
    /// The consumed input, verbatim.
    pub content: String,
    /// Aether consumed right before this token.
    pub leading: String,
}

/// A matched bracketed group and its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub name: String,
    pub position: usize,
    pub length: usize,
    /// The text matched by the start marker (empty for the root).
    pub start: String,
    /// The text matched by the end marker (empty for the root).
    pub end: String,
    /// Verbatim span, only with [`ParseOptions::original_strings`].
    pub content: Option<String>,
    pub children: Vec<ParseNode>,
    /// Aether consumed right before the start marker.
    pub leading: String,
    /// Aether consumed after the last child, before the end marker.
    pub trailing: String,
}

/// A node of the tree produced by [`Grammar::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
    Entity(EntityNode),
    Group(GroupNode),
}

impl ParseNode {
    pub fn name(&self) -> &str {
        match self {
            ParseNode::Entity(e) => &e.name,
            ParseNode::Group(g) => &g.name,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            ParseNode::Entity(e) => e.position,
            ParseNode::Group(g) => g.position,
        }
    }

    pub fn length(&self) -> usize {
        match self {
            ParseNode::Entity(e) => e.length,
            ParseNode::Group(g) => g.length,
        }
    }

    /// Verbatim text of an entity, or of a group parsed with `original_strings`.
    pub fn content(&self) -> Option<&str> {
        match self {
            ParseNode::Entity(e) => Some(&e.content),
            ParseNode::Group(g) => g.content.as_deref(),
        }
    }

    pub fn children(&self) -> &[ParseNode] {
        match self {
            ParseNode::Entity(_) => &[],
            ParseNode::Group(g) => &g.children,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, ParseNode::Entity(_))
    }

    pub fn leading(&self) -> &str {
        match self {
            ParseNode::Entity(e) => &e.leading,
            ParseNode::Group(g) => &g.leading,
        }
    }

    pub(crate) fn set_leading(&mut self, aether: String) {
        match self {
            ParseNode::Entity(e) => e.leading = aether,
            ParseNode::Group(g) => g.leading = aether,
        }
    }

    /// Rebuild the exact source text this node was parsed from.
    pub fn unparse(&self) -> String {
        engine::unparse(self)
    }
}
