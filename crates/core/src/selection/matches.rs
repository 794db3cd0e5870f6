//! Fixed-size atom index tuples produced by selections.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Most atoms a match can hold (dihedrals and `four`).
pub const MAX_MATCH_SIZE: usize = 4;

/// An ordered tuple of 1 to 4 atom indexes. `(i, j)` and `(j, i)` are
/// different matches.
#[derive(Clone, Copy)]
pub struct Match {
    atoms: [usize; MAX_MATCH_SIZE],
    size: usize,
}

impl Match {
    /// Build a match from a slice of 1 to 4 indexes.
    pub fn from_slice(atoms: &[usize]) -> Option<Self> {
        if atoms.is_empty() || atoms.len() > MAX_MATCH_SIZE {
            return None;
        }
        let mut data = [0; MAX_MATCH_SIZE];
        data[..atoms.len()].copy_from_slice(atoms);
        Some(Self {
            atoms: data,
            size: atoms.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.size
    }

    /// Always false, matches hold at least one atom.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.atoms[..self.size]
    }
}

macro_rules! impl_from_array {
    ($($n:literal),*) => {
        $(
            impl From<[usize; $n]> for Match {
                fn from(atoms: [usize; $n]) -> Self {
                    let mut data = [0; MAX_MATCH_SIZE];
                    data[..$n].copy_from_slice(&atoms);
                    Self { atoms: data, size: $n }
                }
            }
        )*
    };
}

impl_from_array!(1, 2, 3, 4);

impl Deref for Match {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        self.as_slice()
    }
}

impl PartialEq for Match {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Match {}

impl Hash for Match {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl PartialOrd for Match {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Match {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl fmt::Debug for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tuple = f.debug_tuple("");
        for atom in self.as_slice() {
            tuple.field(atom);
        }
        tuple.finish()
    }
}
