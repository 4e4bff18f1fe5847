//! Grammar resolution, parsing and unparsing.
//!
//! This module is the language-independent half of the crate. Nothing in here
//! knows about arithmetic: it turns a declarative [`LanguageSpec`](crate::LanguageSpec)
//! into a [`Grammar`] and walks that grammar over input text.
//!
//! ## How the parts work together
//!
//! ```text
//! LanguageSpec ──┐
//!                │  resolve                       (resolve.rs)
//!                │   - assign-before-resolve arena (cycles terminate)
//!                │   - flatten + dedup phrases
//!                │   - compile markers to anchored regexes
//!                └───────────────┬──────────────
//!                                │
//!                                v
//!                   Grammar (terms.rs, immutable, Send + Sync)
//!                                │
//! input ── Parser::run ──────────┤                (parser.rs)
//!           - first match wins in the current candidate set
//!           - postgroups switch the set after a match
//!           - end marker, then aether, then syntax error
//!           - optional backtracking around group bodies
//!                                │
//!                                v
//!                            ParseNode ── unparse ──▶ original text   (unparse.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `terms.rs`: the resolved, static side: [`Term`], [`Matcher`], [`TermFlags`]
//!   and the [`Grammar`] arena with its name index.
//! - `resolve.rs`: validates a spec and builds the arena.
//! - `parser.rs`: the recursive engine; owns the scan cursor for one parse.
//! - `unparse.rs`: structural inverse of the parser, used to verify round trips.
//!
//! ## Debugging
//!
//! Resolution and backtracking emit `tracing` events at `debug` level; every
//! matched token and skipped aether is emitted at `trace` level.

#[path = "engine/parser.rs"]
mod parser;
#[path = "engine/resolve.rs"]
mod resolve;
#[path = "engine/terms.rs"]
mod terms;
#[path = "engine/unparse.rs"]
mod unparse;

pub use parser::Parser;
pub use resolve::resolve;
pub use terms::{Grammar, Matcher, Term, TermFlags, TermId};
pub use unparse::unparse;
