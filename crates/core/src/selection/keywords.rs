//! Name tables for contexts, builtin properties and functions.
//!
//! The parser only uses these tables to decide how to read a bare
//! identifier; whether a name actually exists is checked at evaluation time.

use crate::selection::context::Context;

/// Accepted spellings of each context in a `context: expression` header.
pub const CONTEXT_ALIASES: &[(&str, Context)] = &[
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

/// Builtin atom properties with a string value.
pub const STRING_PROPERTIES: &[&str] = &["name", "type", "element", "resname"];

/// Builtin atom properties with a numeric value.
pub const NUMERIC_PROPERTIES: &[&str] = &[
    "index", "mass", "charge", "resid", "x", "y", "z", "vx", "vy", "vz",
];

/// Geometric functions and the number of atoms they take.
pub const GEOMETRIC_FUNCTIONS: &[(&str, usize)] = &[
    ("distance", 2),
    ("angle", 3),
    ("dihedral", 4),
    ("out_of_plane", 4),
];

/// Topology tests returning a boolean, and the number of atoms they take.
pub const BOOLEAN_FUNCTIONS: &[(&str, usize)] =
    &[("is_bonded", 2), ("is_angle", 3), ("is_dihedral", 4)];

/// Boolean constants.
pub const ALL: &str = "all";
pub const NONE: &str = "none";

/// Can `name` be used without parentheses as a property of the first atom?
pub fn is_builtin_property(name: &str) -> bool {
    STRING_PROPERTIES.contains(&name) || NUMERIC_PROPERTIES.contains(&name)
}

/// Number of atoms taken by the function `name`, if it is one.
pub fn function_arity(name: &str) -> Option<usize> {
    GEOMETRIC_FUNCTIONS
        .iter()
        .chain(BOOLEAN_FUNCTIONS)
        .find(|(f, _)| *f == name)
        .map(|&(_, arity)| arity)
}

pub fn is_boolean_function(name: &str) -> bool {
    BOOLEAN_FUNCTIONS.iter().any(|(f, _)| *f == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_properties() {
        assert!(is_builtin_property("name"));
        assert!(is_builtin_property("vz"));
        assert!(is_builtin_property("element"));
        assert!(!is_builtin_property("Name"));
        assert!(!is_builtin_property("distance"));
    }

    #[test]
    fn test_function_arity() {
        assert_eq!(function_arity("distance"), Some(2));
        assert_eq!(function_arity("dihedral"), Some(4));
        assert_eq!(function_arity("is_angle"), Some(3));
        assert_eq!(function_arity("mass"), None);
        assert!(is_boolean_function("is_bonded"));
        assert!(!is_boolean_function("angle"));
    }

    #[test]
    fn test_names_do_not_overlap() {
        for (name, _) in GEOMETRIC_FUNCTIONS.iter().chain(BOOLEAN_FUNCTIONS) {
            assert!(!is_builtin_property(name), "{}", name);
        }
    }
}
