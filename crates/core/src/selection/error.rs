//! Selection language error types with position spans.
//!
//! Construction failures ([`SelectionError`]) and evaluation failures
//! ([`EvaluationError`]) are kept apart; [`Error`] only exists for the calls
//! that can hit both.

/// Byte range `(start, end)` in the expression text.
pub type Span = (usize, usize);

/// Errors raised while building a [`crate::selection::Selection`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionError {
    #[error("lexer error: {message}{}", caret(.input, .span))]
    Lexer {
        message: String,
        span: Span,
        input: String,
    },

    #[error("parser error: {message}{}", caret(.input, .span))]
    Parser {
        message: String,
        span: Span,
        input: String,
    },

    #[error("unknown selection context '{context}' in \"{selection}\"")]
    UnknownContext { context: String, selection: String },

    #[error("can not read selection context in \"{0}\", too many ':'")]
    AmbiguousContext(String),

    #[error("atom #{slot} is out of range for a selection of size {arity}")]
    SlotOutOfRange { slot: usize, arity: usize },

    #[error("can not call `list` on a selection of size {arity}")]
    NotSingleAtom { arity: usize },
}

impl SelectionError {
    pub(crate) fn lexer(message: impl Into<String>, span: Span, input: &str) -> Self {
        SelectionError::Lexer {
            message: message.into(),
            span,
            input: input.to_string(),
        }
    }

    pub(crate) fn parser(message: impl Into<String>, span: Span, input: &str) -> Self {
        SelectionError::Parser {
            message: message.into(),
            span,
            input: input.to_string(),
        }
    }

    /// Location of the error in the expression text, when known.
    pub fn span(&self) -> Option<Span> {
        match self {
            SelectionError::Lexer { span, .. } | SelectionError::Parser { span, .. } => Some(*span),
            _ => None,
        }
    }
}

/// Render the input with a `^^^` marker under `span`.
fn caret(input: &str, span: &Span) -> String {
    let &(start, end) = span;
    format!(
        "\n  {}\n  {}{}",
        input,
        " ".repeat(start),
        "^".repeat(end.saturating_sub(start).max(1))
    )
}

/// Errors raised while evaluating a selection against a frame.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("unknown property '{name}' for atom {atom}")]
    UnknownProperty { name: String, atom: usize },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("bad arguments for '{name}': {reason}")]
    BadArguments { name: String, reason: String },

    #[error("atom {atom} is out of bounds for a frame with {size} atoms")]
    AtomOutOfBounds { atom: usize, size: usize },

    #[error("evaluation was cancelled")]
    Cancelled,
}

/// Either kind of failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_rendering() {
        let err = SelectionError::parser("expected ')'", (8, 9), "name(1 ==");
        assert_eq!(
            err.to_string(),
            "parser error: expected ')'\n  name(1 ==\n          ^"
        );
        assert_eq!(err.span(), Some((8, 9)));
    }

    #[test]
    fn test_caret_for_empty_span() {
        let err = SelectionError::lexer("unterminated string", (5, 5), "name \"");
        assert!(err.to_string().ends_with("\n       ^"));
    }

    #[test]
    fn test_families_convert() {
        let err: Error = EvaluationError::Cancelled.into();
        assert!(matches!(err, Error::Evaluation(EvaluationError::Cancelled)));
        let err: Error = SelectionError::NotSingleAtom { arity: 2 }.into();
        assert_eq!(err.to_string(), "can not call `list` on a selection of size 2");
        assert_eq!(SelectionError::AmbiguousContext("a:b:c".into()).span(), None);
    }
}
