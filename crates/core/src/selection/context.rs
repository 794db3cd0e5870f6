//! Selection contexts and the `context: expression` header.

use std::fmt;
use std::str::FromStr;

use crate::selection::error::SelectionError;
use crate::selection::keywords::CONTEXT_ALIASES;

/// What kind of tuple a selection matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// Single atoms
    Atom,
    /// Ordered pairs of distinct atoms
    Pair,
    /// Ordered triples of distinct atoms
    Three,
    /// Ordered quadruples of distinct atoms
    Four,
    /// Bonded pairs from the topology
    Bond,
    /// Angles `i-j-k` from the topology
    Angle,
    /// Dihedral angles `i-j-k-m` from the topology
    Dihedral,
}

impl Context {
    /// Number of atoms in every match of this context.
    pub fn arity(self) -> usize {
        match self {
            Context::Atom => 1,
            Context::Pair | Context::Bond => 2,
            Context::Three | Context::Angle => 3,
            Context::Four | Context::Dihedral => 4,
        }
    }

    /// Whether candidates come from the topology connectivity instead of
    /// every combination of atoms.
    pub fn is_connectivity(self) -> bool {
        matches!(self, Context::Bond | Context::Angle | Context::Dihedral)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Context::Atom => "atoms",
            Context::Pair => "pairs",
            Context::Three => "three",
            Context::Four => "four",
            Context::Bond => "bonds",
            Context::Angle => "angles",
            Context::Dihedral => "dihedrals",
        };
        f.write_str(name)
    }
}

impl FromStr for Context {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CONTEXT_ALIASES
            .iter()
            .find(|(alias, _)| *alias == s)
            .map(|&(_, context)| context)
            .ok_or_else(|| SelectionError::UnknownContext {
                context: s.to_string(),
                selection: s.to_string(),
            })
    }
}

/// Split `selection` into its context and the expression text after the
/// colon. Without a colon the whole text is the expression and the context
/// is [`Context::Atom`].
pub fn split_context(selection: &str) -> Result<(Context, &str), SelectionError> {
    let mut parts = selection.split(':');
    let (Some(head), tail, None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(SelectionError::AmbiguousContext(selection.to_string()));
    };
    match tail {
        None => Ok((Context::Atom, head)),
        Some(expression) => {
            let name = head.trim();
            let context = name.parse::<Context>().map_err(|_| SelectionError::UnknownContext {
                context: name.to_string(),
                selection: selection.to_string(),
            })?;
            Ok((context, expression))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_colon_defaults_to_atoms() {
        let (context, rest) = split_context("name H").unwrap();
        assert_eq!(context, Context::Atom);
        assert_eq!(rest, "name H");
    }

    #[test]
    fn test_aliases() {
        let cases = [
            ("atoms", Context::Atom),
            ("one", Context::Atom),
            ("pairs", Context::Pair),
            ("two", Context::Pair),
            ("three", Context::Three),
            ("four", Context::Four),
            ("bonds", Context::Bond),
            ("angles", Context::Angle),
            ("dihedrals", Context::Dihedral),
        ];
        for (alias, expected) in cases {
            let text = format!("  {} : all", alias);
            let (context, rest) = split_context(&text).unwrap();
            assert_eq!(context, expected);
            assert_eq!(rest, " all");
        }
    }

    #[test]
    fn test_arity() {
        assert_eq!(Context::Atom.arity(), 1);
        assert_eq!(Context::Pair.arity(), 2);
        assert_eq!(Context::Bond.arity(), 2);
        assert_eq!(Context::Three.arity(), 3);
        assert_eq!(Context::Angle.arity(), 3);
        assert_eq!(Context::Four.arity(), 4);
        assert_eq!(Context::Dihedral.arity(), 4);
        assert!(Context::Angle.is_connectivity());
        assert!(!Context::Four.is_connectivity());
    }

    #[test]
    fn test_unknown_context() {
        let err = split_context("xyz: name H").unwrap_err();
        assert_eq!(
            err,
            SelectionError::UnknownContext {
                context: "xyz".into(),
                selection: "xyz: name H".into(),
            }
        );
        // aliases are matched exactly
        assert!(split_context("Atoms: all").is_err());
        assert!(split_context(": all").is_err());
    }

    #[test]
    fn test_too_many_colons() {
        let err = split_context("atoms: pairs: atoms").unwrap_err();
        assert!(matches!(err, SelectionError::AmbiguousContext(_)));
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for context in [Context::Atom, Context::Pair, Context::Dihedral] {
            assert_eq!(context.to_string().parse::<Context>().unwrap(), context);
        }
    }
}
