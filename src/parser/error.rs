//! Parser error types.

/// A line carried a recognized tag but its body did not follow the grammar.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A quoted display name had no closing delimiter.
    #[error("{tag}: unterminated display name at column {column}")]
    UnterminatedName { tag: String, column: usize },

    /// An expected literal was not found.
    #[error("{tag}: expected `{expected}` at column {column}")]
    Expected {
        tag: String,
        expected: &'static str,
        column: usize,
    },

    /// The fixed-width owner field was shorter than required.
    #[error("{tag}: owner field needs {needed} characters, found {found}")]
    ShortOwnerField {
        tag: String,
        needed: usize,
        found: usize,
    },

    /// An attack/health pair could not be read.
    #[error("{tag}: malformed attack/health pair `{token}`")]
    MalformedStatPair { tag: String, token: String },
}
