//! The precedence table driving the compiler.
//!
//! Levels run from the highest number down. Within a level the list of work
//! items is scanned in the level's direction; at each position the reducers are
//! tried in order and the first one that accepts the `(previous, current, next)`
//! window replaces the slots named by its [`Splice`] with one new item.

use std::ops::RangeInclusive;

use super::compiler::Window;
use super::language::{CALL, DOT, IDENTIFIER, INDEX, NUMBER, PAREN, POSTFIX, PREFIX, PROPERTY, STRING};
use super::predicates::{is_branches, is_entity, is_expr, is_group, is_operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Direction {
    LeftToRight,
    RightToLeft,
}

/// Which slots around the scan position a reduction consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Splice {
    Current,
    CurrentNext,
    PreviousCurrent,
    PreviousCurrentNext,
}

impl Splice {
    pub(super) fn range(self, index: usize) -> RangeInclusive<usize> {
        match self {
            Splice::Current => index..=index,
            Splice::CurrentNext => index..=index + 1,
            Splice::PreviousCurrent => index.saturating_sub(1)..=index,
            Splice::PreviousCurrentNext => index.saturating_sub(1)..=index + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Reduction {
    /// `1`, `"s"`
    Literal,
    /// `a`
    Symbol,
    /// `( .. )` in value position
    Group,
    /// `a . b`
    Member,
    /// `a ( .. )`
    Call,
    /// `a [ .. ]`
    Index,
    /// `a ++`
    Postfix,
    /// `- a`
    Prefix,
    /// `a op b` for the listed symbols
    Binary(&'static [&'static str]),
    /// `t : f`, once its `?` sits right before `t`
    Branches,
    /// `c ? (t : f)`
    Conditional,
}

impl Reduction {
    pub(super) fn accepts(self, w: &Window<'_, '_>) -> bool {
        match self {
            Reduction::Literal => is_entity(w.current(), NUMBER) || is_entity(w.current(), STRING),
            Reduction::Symbol => is_entity(w.current(), IDENTIFIER),
            Reduction::Group => is_group(w.current(), PAREN),
            Reduction::Member => is_expr(w.prev()) && is_entity(w.current(), DOT) && is_entity(w.next(), PROPERTY),
            Reduction::Call => is_expr(w.prev()) && is_group(w.current(), CALL),
            Reduction::Index => is_expr(w.prev()) && is_group(w.current(), INDEX),
            Reduction::Postfix => is_expr(w.prev()) && is_entity(w.current(), POSTFIX),
            Reduction::Prefix => is_entity(w.current(), PREFIX) && is_expr(w.next()),
            Reduction::Binary(symbols) => {
                is_expr(w.prev()) && is_operator(w.current(), symbols) && is_expr(w.next())
            }
            Reduction::Branches => {
                is_expr(w.prev())
                    && is_operator(w.current(), &[":"])
                    && is_expr(w.next())
                    && w.matching_question().is_some_and(|q| Some(q) == w.index().checked_sub(2))
            }
            Reduction::Conditional => is_expr(w.prev()) && is_operator(w.current(), &["?"]) && is_branches(w.next()),
        }
    }

    pub(super) fn splice(self) -> Splice {
        match self {
            Reduction::Literal | Reduction::Symbol | Reduction::Group => Splice::Current,
            Reduction::Prefix => Splice::CurrentNext,
            Reduction::Call | Reduction::Index | Reduction::Postfix => Splice::PreviousCurrent,
            Reduction::Member | Reduction::Binary(_) | Reduction::Branches | Reduction::Conditional => {
                Splice::PreviousCurrentNext
            }
        }
    }
}

#[derive(Debug)]
pub(super) struct PrecedenceLevel {
    pub(super) level: u8,
    pub(super) direction: Direction,
    pub(super) reducers: &'static [Reduction],
}

use Direction::{LeftToRight, RightToLeft};

/// Every level, strictly decreasing.
pub(super) static PRECEDENCE: &[PrecedenceLevel] = &[
    PrecedenceLevel { level: 19, direction: LeftToRight, reducers: &[Reduction::Literal, Reduction::Symbol, Reduction::Group] },
    PrecedenceLevel { level: 18, direction: LeftToRight, reducers: &[Reduction::Member, Reduction::Call, Reduction::Index] },
    PrecedenceLevel { level: 17, direction: LeftToRight, reducers: &[Reduction::Postfix] },
    PrecedenceLevel { level: 16, direction: RightToLeft, reducers: &[Reduction::Prefix] },
    PrecedenceLevel { level: 15, direction: LeftToRight, reducers: &[Reduction::Binary(&["*", "/", "%"])] },
    PrecedenceLevel { level: 14, direction: LeftToRight, reducers: &[Reduction::Binary(&["+", "-"])] },
    PrecedenceLevel { level: 13, direction: LeftToRight, reducers: &[Reduction::Binary(&["<<", ">>", ">>>"])] },
    PrecedenceLevel { level: 12, direction: LeftToRight, reducers: &[Reduction::Binary(&["<", "<=", ">", ">="])] },
    PrecedenceLevel { level: 11, direction: LeftToRight, reducers: &[Reduction::Binary(&["==", "!=", "===", "!=="])] },
    PrecedenceLevel { level: 10, direction: LeftToRight, reducers: &[Reduction::Binary(&["&"])] },
    PrecedenceLevel { level: 9, direction: LeftToRight, reducers: &[Reduction::Binary(&["^"])] },
    PrecedenceLevel { level: 8, direction: LeftToRight, reducers: &[Reduction::Binary(&["|"])] },
    PrecedenceLevel { level: 7, direction: LeftToRight, reducers: &[Reduction::Binary(&["&&"])] },
    PrecedenceLevel { level: 6, direction: LeftToRight, reducers: &[Reduction::Binary(&["||"])] },
    PrecedenceLevel { level: 5, direction: RightToLeft, reducers: &[Reduction::Branches, Reduction::Conditional] },
    PrecedenceLevel { level: 4, direction: LeftToRight, reducers: &[Reduction::Binary(&[","])] },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_strictly_decrease() {
        for pair in PRECEDENCE.windows(2) {
            assert!(pair[0].level > pair[1].level, "level {} is not above {}", pair[0].level, pair[1].level);
        }
    }

    #[test]
    fn every_binary_symbol_appears_once() {
        let mut seen = Vec::new();
        for level in PRECEDENCE {
            for reducer in level.reducers {
                if let Reduction::Binary(symbols) = reducer {
                    for symbol in symbols.iter() {
                        assert!(!seen.contains(symbol), "{symbol} appears twice");
                        seen.push(*symbol);
                    }
                }
            }
        }
        assert_eq!(seen.len(), 22);
    }

    #[test]
    fn splices_cover_the_window() {
        assert_eq!(Splice::Current.range(3), 3..=3);
        assert_eq!(Splice::CurrentNext.range(3), 3..=4);
        assert_eq!(Splice::PreviousCurrent.range(3), 2..=3);
        assert_eq!(Splice::PreviousCurrentNext.range(3), 2..=4);
    }
}
