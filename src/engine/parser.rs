//! Recursive grammar engine.
//!
//! This module is the operational core of the engine: it walks a resolved
//! [`Grammar`] over an input string and builds a [`ParseNode`] tree.
//!
//! ## Group loop
//!
//! Every group (the root included) runs the same loop until its end marker (or,
//! for the root, the end of input):
//!
//! ```text
//! (1) current candidate set, in order   -> first match wins
//!       entity -> leaf node
//!       group  -> recurse into its body (subgroups become the candidate set)
//!     after a match: candidates = term.postgroups (unless absent / same_postgroups)
//! (2) end marker of the open group      -> close the group
//! (3) aether                            -> consumed, no node, candidates unchanged
//! (4) nothing matched                   -> syntax error at the cursor
//! ```
//!
//! Running out of input inside a non-root group is an "unterminated group"
//! error naming the start marker and where it opened.
//!
//! ## Backtracking
//!
//! Off by default. When on, a group whose start marker matched but whose body
//! failed is rejected: the cursor is restored to where the start marker began
//! and the next candidate is tried. When off the body's error propagates as is.
//!
//! ## State
//!
//! The cursor lives in the `Parser`, never in the `Grammar`, so any number of
//! parsers can walk one grammar concurrently.

use super::terms::{Grammar, Matcher, TermId};
use crate::{EntityNode, GroupNode, ParseError, ParseNode, ParseOptions};
use tracing::{debug, trace};

/// Characters of context shown on each side of a syntax error.
const CONTEXT_CHARS: usize = 12;

/// The group currently open.
///
/// ```text
/// input:  "f(a, b)"
///           ^ position = 1, start = "("
/// candidates: the group's subgroups, replaced by postgroups as tokens match
/// ```
struct Frame<'a> {
    name: &'a str,
    start: &'a str,
    position: usize,
    candidates: &'a [TermId],
    end: Option<&'a Matcher>,
}

/// Parser orchestrates one walk of a [`Grammar`] over an input string.
///
/// Usage: `Parser::new(&grammar, input)`, optionally `.with_options(..)`, then
/// `run()`.
#[derive(Debug)]
pub struct Parser<'a> {
    grammar: &'a Grammar,
    input: &'a str,
    /// Scan cursor (byte offset into `input`).
    offset: usize,
    options: ParseOptions,
}

impl<'a> Parser<'a> {
    pub fn new(grammar: &'a Grammar, input: &'a str) -> Self {
        Parser { grammar, input, offset: 0, options: ParseOptions::default() }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse the whole input as the implicit root group.
    pub fn run(mut self) -> Result<ParseNode, ParseError> {
        let grammar = self.grammar;
        let frame =
            Frame { name: grammar.root_name(), start: "", position: 0, candidates: grammar.root(), end: None };
        self.parse_group(frame)
    }

    fn parse_group(&mut self, frame: Frame<'a>) -> Result<ParseNode, ParseError> {
        let grammar = self.grammar;
        let mut candidates = frame.candidates;
        let mut children = Vec::new();
        let mut pending = String::new();

        loop {
            if self.offset >= self.input.len() {
                if frame.end.is_none() {
                    return Ok(self.close(frame, children, pending, ""));
                }
                return Err(ParseError::Unterminated {
                    name: frame.name.to_string(),
                    marker: frame.start.to_string(),
                    offset: frame.position,
                });
            }

            let mut rejected = None;
            if let Some((id, mut node)) = self.try_candidates(candidates, &mut rejected)? {
                node.set_leading(std::mem::take(&mut pending));
                children.push(node);

                let term = grammar.term_at(id);
                if let (Some(postgroups), false) = (term.postgroups(), term.same_postgroups()) {
                    candidates = postgroups;
                }
                continue;
            }

            if let Some(end) = frame.end {
                if let Some(marker) = end.match_at(self.input, self.offset) {
                    self.offset += marker.len();
                    return Ok(self.close(frame, children, pending, marker));
                }
            }

            if let Some(skipped) = self.try_aether()? {
                pending.push_str(&skipped);
                continue;
            }

            return Err(rejected.unwrap_or_else(|| self.syntax_error()));
        }
    }

    /// Try each candidate at the cursor; the first whose start marker matches
    /// (and, for a group, whose body parses) wins.
    fn try_candidates(
        &mut self,
        candidates: &'a [TermId],
        rejected: &mut Option<ParseError>,
    ) -> Result<Option<(TermId, ParseNode)>, ParseError> {
        let grammar = self.grammar;

        for &id in candidates {
            let term = grammar.term_at(id);
            let Some(marker) = term.start().match_at(self.input, self.offset) else {
                continue;
            };
            let position = self.offset;
            self.offset += marker.len();

            if term.is_entity() {
                trace!(term = term.name(), offset = position, text = marker, "matched entity");
                return Ok(Some((id, entity(term.name(), position, marker))));
            }

            trace!(term = term.name(), offset = position, marker, "opened group");
            let frame =
                Frame { name: term.name(), start: marker, position, candidates: term.subgroups(), end: term.end() };
            match self.parse_group(frame) {
                Ok(node) => return Ok(Some((id, node))),
                Err(err) if self.options.backtrack => {
                    debug!(term = term.name(), offset = position, error = %err, "candidate rejected");
                    self.offset = position;
                    rejected.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(None)
    }

    /// Consume one aether token (or group) at the cursor, returning its text.
    fn try_aether(&mut self) -> Result<Option<String>, ParseError> {
        let grammar = self.grammar;
        let Some(id) = grammar.aether_id() else {
            return Ok(None);
        };
        let term = grammar.term_at(id);
        let Some(marker) = term.start().match_at(self.input, self.offset) else {
            return Ok(None);
        };
        let position = self.offset;
        self.offset += marker.len();
        trace!(term = term.name(), offset = position, "skipped aether");

        if term.is_entity() {
            return Ok(Some(marker.to_string()));
        }

        let frame = Frame { name: term.name(), start: marker, position, candidates: term.subgroups(), end: term.end() };
        match self.parse_group(frame) {
            Ok(node) => Ok(Some(node.unparse())),
            Err(err) if self.options.backtrack => {
                debug!(term = term.name(), offset = position, error = %err, "aether rejected");
                self.offset = position;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn close(&self, frame: Frame<'a>, children: Vec<ParseNode>, trailing: String, end: &str) -> ParseNode {
        let content = if self.options.original_strings {
            self.input.get(frame.position..self.offset).map(str::to_string)
        } else {
            None
        };

        ParseNode::Group(GroupNode {
            name: frame.name.to_string(),
            position: frame.position,
            length: self.offset - frame.position,
            start: frame.start.to_string(),
            end: end.to_string(),
            content,
            children,
            leading: String::new(),
            trailing,
        })
    }

    fn syntax_error(&self) -> ParseError {
        let before = self.input.get(..self.offset).unwrap_or_default();
        let after = self.input.get(self.offset..).unwrap_or_default();
        let mut head: Vec<char> = before.chars().rev().take(CONTEXT_CHARS).collect();
        head.reverse();
        let tail: String = after.chars().take(CONTEXT_CHARS).collect();
        let context = format!("{}<<here>>{}", head.into_iter().collect::<String>(), tail);

        ParseError::Syntax { offset: self.offset, context }
    }
}

fn entity(name: &str, position: usize, text: &str) -> ParseNode {
    ParseNode::Entity(EntityNode {
        name: name.to_string(),
        position,
        length: text.len(),
        content: text.to_string(),
        leading: String::new(),
    })
}
