//! Selection language for atoms and tuples of atoms.
//!
//! A selection is an optional context followed by a boolean expression:
//! `"pairs: distance(1, 2) < 3.0 and name(1) == O"`. The context decides
//! which tuples are candidates, the expression decides which of them match.
//!
//! # Examples
//!
//! ```ignore
//! use molsel_core::selection::{select, Selection};
//!
//! let oxygens = select(&frame, "name O")?;
//! let hbonds = Selection::new("pairs: name(1) == O and name(2) == H and distance(1, 2) < 2.5")?;
//! for pair in hbonds.evaluate(&frame)? {
//!     println!("{} - {}", pair[0], pair[1]);
//! }
//! ```

pub mod ast;
pub mod context;
pub(crate) mod enumerate;
pub mod error;
pub mod eval;
pub mod keywords;
pub mod matches;
pub mod parser;
pub mod token;

use std::fmt;
use std::str::FromStr;

pub use ast::Expr;
pub use context::Context;
pub use error::{Error, EvaluationError, SelectionError};
pub use matches::Match;

use crate::config::EvaluationOptions;
use crate::frame::FrameView;
use enumerate::Enumerator;

/// A parsed selection, reusable across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    selection: String,
    context: Context,
    ast: Expr,
}

impl Selection {
    /// Parse `selection`, with an optional `context:` header.
    pub fn new(selection: &str) -> Result<Self, SelectionError> {
        let (context, expression) = context::split_context(selection)?;
        let ast = parser::parse_selection(expression)?;

        let arity = context.arity();
        let slot = ast.max_slot();
        if slot > arity {
            return Err(SelectionError::SlotOutOfRange { slot, arity });
        }

        tracing::debug!(%context, selection, "parsed selection");
        Ok(Self {
            selection: selection.to_string(),
            context,
            ast,
        })
    }

    /// Number of atoms in each match.
    pub fn size(&self) -> usize {
        self.context.arity()
    }

    pub fn context(&self) -> Context {
        self.context
    }

    /// The text this selection was built from.
    pub fn string(&self) -> &str {
        &self.selection
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// All matches in `frame`, in enumeration order.
    pub fn evaluate<F: FrameView + ?Sized>(&self, frame: &F) -> Result<Vec<Match>, EvaluationError> {
        self.evaluate_with(frame, &EvaluationOptions::default())
    }

    pub fn evaluate_with<F: FrameView + ?Sized>(
        &self,
        frame: &F,
        options: &EvaluationOptions,
    ) -> Result<Vec<Match>, EvaluationError> {
        Enumerator::new(self.context, &self.ast, frame, options).run()
    }

    /// Indexes of the matching atoms, for selections of size 1.
    pub fn list<F: FrameView + ?Sized>(&self, frame: &F) -> Result<Vec<usize>, Error> {
        if self.size() != 1 {
            return Err(SelectionError::NotSingleAtom { arity: self.size() }.into());
        }
        let matches = self.evaluate(frame)?;
        Ok(matches.iter().map(|m| m[0]).collect())
    }
}

impl FromStr for Selection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selection::new(s)
    }
}

/// `context: expression`, with the expression fully parenthesized.
impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.ast)
    }
}

/// Select atoms with a single-atom selection expression.
pub fn select<F: FrameView + ?Sized>(frame: &F, selection: &str) -> Result<Vec<usize>, Error> {
    Selection::new(selection)?.list(frame)
}
