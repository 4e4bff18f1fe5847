//! Resolved terms and the grammar arena.
//!
//! This module holds the *static* side of the engine: what a [`LanguageSpec`]
//! looks like once every name has been resolved and every marker compiled.
//!
//! Parsing is split into two phases:
//!
//! 1. **Resolve** (see `resolve.rs`): build the arena once per language.
//! 2. **Parse** (see `parser.rs`): walk the arena, once per input.
//!
//! ## Invariants
//!
//! - `TermId` is an index into `Grammar::terms`. Every id stored in a term's
//!   `subgroups`/`postgroups`, in `Grammar::root` or in `Grammar::aether` is in
//!   bounds.
//! - A term is either an entity (`TermFlags::ENTITY`, `end` is `None`, no
//!   subgroups) or a group (`end` is `Some`).
//! - A name maps to exactly one id, so two references to the same name share the
//!   same `Term`.
//!
//! [`LanguageSpec`]: crate::LanguageSpec

use crate::{ParseNode, ParseOptions};
use regex::Regex;
use std::collections::HashMap;

use super::parser::Parser;

/// Term identifier (index into the grammar arena).
pub type TermId = usize;

bitflags::bitflags! {
    /// Per-term behaviour bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TermFlags: u8 {
        /// Leaf token; the start marker is the whole token.
        const ENTITY          = 1 << 0;
        /// Keep the current candidate set after this term matches.
        const SAME_POSTGROUPS = 1 << 1;
        /// This term is the grammar's aether.
        const AETHER          = 1 << 2;
    }
}

/// A compiled marker, anchored at the scan offset.
#[derive(Debug, Clone)]
pub struct Matcher {
    source: String,
    regex: Regex,
}

impl Matcher {
    /// Compile an already-escaped pattern body.
    pub(crate) fn new(body: &str) -> Result<Self, regex::Error> {
        let source = format!("^(?:{body})");
        let regex = Regex::new(&source)?;
        Ok(Matcher { source, regex })
    }

    /// The anchored pattern this matcher runs.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match at exactly `offset`. Empty matches never count: every successful
    /// match moves the cursor forward.
    pub fn match_at<'t>(&self, input: &'t str, offset: usize) -> Option<&'t str> {
        let rest = input.get(offset..)?;
        self.regex.find(rest).map(|m| m.as_str()).filter(|m| !m.is_empty())
    }
}

/// A resolved term.
#[derive(Debug, Clone)]
pub struct Term {
    pub(crate) name: String,
    pub(crate) flags: TermFlags,
    pub(crate) start: Matcher,
    pub(crate) end: Option<Matcher>,
    pub(crate) subgroups: Vec<TermId>,
    pub(crate) postgroups: Option<Vec<TermId>>,
}

impl Term {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> TermFlags {
        self.flags
    }

    pub fn is_entity(&self) -> bool {
        self.flags.contains(TermFlags::ENTITY)
    }

    pub fn same_postgroups(&self) -> bool {
        self.flags.contains(TermFlags::SAME_POSTGROUPS)
    }

    /// Start marker; for an entity, the whole token.
    pub fn start(&self) -> &Matcher {
        &self.start
    }

    pub fn end(&self) -> Option<&Matcher> {
        self.end.as_ref()
    }

    /// Candidates inside the group, in priority order.
    pub fn subgroups(&self) -> &[TermId] {
        &self.subgroups
    }

    pub fn postgroups(&self) -> Option<&[TermId]> {
        self.postgroups.as_deref()
    }
}

/// A resolved language: the root candidate list plus the full term arena.
///
/// Immutable once built; share it freely between threads. Each parse owns its
/// own cursor (see [`Parser`]).
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) root_name: String,
    pub(crate) terms: Vec<Term>,
    pub(crate) names: HashMap<String, TermId>,
    pub(crate) root: Vec<TermId>,
    pub(crate) aether: Option<TermId>,
}

impl Grammar {
    /// Name of the root phrase; also the name of the root parse node.
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Root candidate ids, in priority order.
    pub fn root(&self) -> &[TermId] {
        &self.root
    }

    pub fn term(&self, name: &str) -> Option<&Term> {
        self.term_id(name).map(|id| &self.terms[id])
    }

    pub fn term_id(&self, name: &str) -> Option<TermId> {
        self.names.get(name).copied()
    }

    /// Look up a term by id. Ids come from this grammar, so they are in bounds.
    pub fn term_at(&self, id: TermId) -> &Term {
        &self.terms[id]
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn aether(&self) -> Option<&Term> {
        self.aether.map(|id| &self.terms[id])
    }

    pub(crate) fn aether_id(&self) -> Option<TermId> {
        self.aether
    }

    /// Parse `text` with default [`ParseOptions`].
    pub fn parse(&self, text: &str) -> Result<ParseNode, crate::ParseError> {
        Parser::new(self, text).run()
    }

    pub fn parse_with(&self, text: &str, options: &ParseOptions) -> Result<ParseNode, crate::ParseError> {
        Parser::new(self, text).with_options(*options).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matcher_is_anchored_at_offset() {
        let m = Matcher::new(r"\d+").unwrap();
        assert_eq!(m.match_at("ab12", 0), None);
        assert_eq!(m.match_at("ab12", 2), Some("12"));
        assert_eq!(m.source(), r"^(?:\d+)");
    }

    #[test]
    fn matcher_ignores_empty_matches_and_bad_offsets() {
        let m = Matcher::new(r"\d*").unwrap();
        assert_eq!(m.match_at("abc", 0), None);
        assert_eq!(m.match_at("abc", 10), None);
        assert_eq!(m.match_at("7", 0), Some("7"));
    }

    #[test]
    fn grammar_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Grammar>();
    }
}
