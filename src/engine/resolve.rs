//! Language definition resolution.
//!
//! Turns a [`LanguageSpec`] (names referencing names) into a [`Grammar`] (an
//! arena of terms referencing ids).
//!
//! ## Recursion
//!
//! Terms may reference themselves or each other. Resolution is lazy and uses
//! the *assign-before-resolve* trick:
//!
//! ```text
//! resolve_term("paren")
//!   ├─ slot 3 reserved, index["paren"] = 3      (placeholder)
//!   ├─ resolve subgroups ─▶ resolve_term("paren") ─▶ already indexed: 3
//!   └─ slot 3 filled
//! ```
//!
//! so a cycle always ends at the placeholder and both references end up with
//! the same id.
//!
//! ## Phrases
//!
//! Phrases are alternative-sets, not terms: they are flattened (recursively,
//! in order) wherever they are referenced, and duplicate terms are dropped so a
//! term appears once in a candidate list even when reachable through several
//! phrases.
//!
//! ## Totality
//!
//! Every term in the spec is resolved, including terms unreachable from the
//! root, so a typo in an unused term still fails resolution.

use super::terms::{Grammar, Matcher, Term, TermFlags, TermId};
use crate::{Definition, LanguageSpec, Marker, ResolveError, TermDef};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Resolve `spec` into a [`Grammar`].
///
/// ```text
/// spec.root ──▶ flatten ──▶ Grammar::root
/// every Term definition ──▶ resolve_term ──▶ Grammar::terms
/// spec.aether ──▶ resolve_term (+AETHER flag)
/// ```
pub fn resolve(spec: &LanguageSpec) -> Result<Grammar, ResolveError> {
    if !spec.definitions.contains_key(&spec.root) {
        return Err(ResolveError::NoRoot(spec.root.clone()));
    }

    let mut resolver = Resolver { spec, slots: Vec::new(), index: HashMap::new() };
    let root = resolver.flatten(std::slice::from_ref(&spec.root), "<root>")?;

    for (name, def) in &spec.definitions {
        if let Definition::Term(_) = def {
            resolver.resolve_term(name, "<spec>")?;
        }
    }

    let aether = match &spec.aether {
        Some(name) => match spec.definitions.get(name) {
            Some(Definition::Term(_)) => Some(resolver.resolve_term(name, "<aether>")?),
            Some(Definition::Phrase(_)) => {
                return Err(ResolveError::InvalidTerm { name: name.clone(), reason: "aether must name a term" });
            }
            None => {
                return Err(ResolveError::UnresolvedReference { name: name.clone(), referrer: "<aether>".to_string() });
            }
        },
        None => None,
    };

    let mut terms = resolver
        .slots
        .into_iter()
        .enumerate()
        .map(|(id, slot)| {
            slot.ok_or_else(|| ResolveError::UnresolvedReference {
                name: format!("#{id}"),
                referrer: "<placeholder>".to_string(),
            })
        })
        .collect::<Result<Vec<Term>, ResolveError>>()?;

    if let Some(id) = aether {
        terms[id].flags |= TermFlags::AETHER;
    }

    debug!(terms = terms.len(), root = root.len(), aether = ?spec.aether, "resolved language");

    Ok(Grammar { root_name: spec.root.clone(), terms, names: resolver.index, root, aether })
}

struct Resolver<'a> {
    spec: &'a LanguageSpec,
    /// `None` while a term is being resolved (the placeholder).
    slots: Vec<Option<Term>>,
    index: HashMap<String, TermId>,
}

impl<'a> Resolver<'a> {
    fn resolve_term(&mut self, name: &str, referrer: &str) -> Result<TermId, ResolveError> {
        if let Some(&id) = self.index.get(name) {
            return Ok(id);
        }

        let spec = self.spec;
        let def = match spec.definitions.get(name) {
            Some(Definition::Term(def)) => def,
            _ => {
                return Err(ResolveError::UnresolvedReference { name: name.to_string(), referrer: referrer.to_string() });
            }
        };

        let id = self.slots.len();
        self.slots.push(None);
        self.index.insert(name.to_string(), id);

        let term = self.build_term(name, def)?;
        self.slots[id] = Some(term);
        Ok(id)
    }

    fn build_term(&mut self, name: &str, def: &'a TermDef) -> Result<Term, ResolveError> {
        let invalid = |reason| ResolveError::InvalidTerm { name: name.to_string(), reason };

        let postgroups = match &def.postgroups {
            Some(names) => Some(self.flatten(names, name)?),
            None => None,
        };
        let mut flags = TermFlags::empty();
        if def.same_postgroups {
            flags |= TermFlags::SAME_POSTGROUPS;
        }

        if let Some(marker) = &def.entity {
            if def.start.is_some() || def.end.is_some() {
                return Err(invalid("entity declares separate start/end markers"));
            }
            if def.subgroups.is_some() {
                return Err(invalid("entity declares subgroups"));
            }
            return Ok(Term {
                name: name.to_string(),
                flags: flags | TermFlags::ENTITY,
                start: compile_marker(name, marker)?,
                end: None,
                subgroups: Vec::new(),
                postgroups,
            });
        }

        let (Some(start), Some(end)) = (&def.start, &def.end) else {
            return Err(invalid("group requires both start and end markers"));
        };
        let Some(subgroups) = &def.subgroups else {
            return Err(invalid("group requires subgroups"));
        };

        Ok(Term {
            name: name.to_string(),
            flags,
            start: compile_marker(name, start)?,
            end: Some(compile_marker(name, end)?),
            subgroups: self.flatten(subgroups, name)?,
            postgroups,
        })
    }

    /// Expand `names` (terms and phrases) into a de-duplicated, ordered id list.
    fn flatten(&mut self, names: &'a [String], referrer: &str) -> Result<Vec<TermId>, ResolveError> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.flatten_into(names, referrer, &mut out, &mut visited)?;
        Ok(out)
    }

    fn flatten_into(
        &mut self,
        names: &'a [String],
        referrer: &str,
        out: &mut Vec<TermId>,
        visited: &mut HashSet<&'a str>,
    ) -> Result<(), ResolveError> {
        let spec = self.spec;
        for name in names {
            match spec.definitions.get(name) {
                Some(Definition::Phrase(members)) => {
                    // A phrase reached twice (or through itself) adds nothing new.
                    if visited.insert(name.as_str()) {
                        self.flatten_into(members, name, out, visited)?;
                    }
                }
                Some(Definition::Term(_)) => {
                    let id = self.resolve_term(name, referrer)?;
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
                None => {
                    return Err(ResolveError::UnresolvedReference {
                        name: name.clone(),
                        referrer: referrer.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Normalize a marker into an anchored matcher.
///
/// ```text
/// Literal("(")            ─▶ ^(?:\()
/// AnyOf(["+", "++"])      ─▶ ^(?:\+\+|\+)      (longest first)
/// Pattern(r"\d+")         ─▶ ^(?:\d+)
/// ```
fn compile_marker(name: &str, marker: &Marker) -> Result<Matcher, ResolveError> {
    let body = match marker {
        Marker::Literal(text) => regex::escape(text),
        Marker::AnyOf(alternatives) => {
            let mut sorted: Vec<&String> = alternatives.iter().collect();
            sorted.sort_by(|a, b| b.len().cmp(&a.len()));
            sorted.iter().map(|alt| regex::escape(alt)).collect::<Vec<_>>().join("|")
        }
        Marker::Pattern(pattern) => pattern.clone(),
    };
    Matcher::new(&body).map_err(|source| ResolveError::InvalidPattern { name: name.to_string(), source })
}
