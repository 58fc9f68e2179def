//! Action builder error types.

/// Errors raised while building an [`Action`](super::Action) from a record.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The record's tag has no action constructor.
    #[error("Unknown event tag: {0}")]
    UnknownTag(String),

    /// A field required by the tag was absent.
    #[error("{tag}: missing required field `{field}`")]
    MissingField { tag: String, field: String },

    /// A field was present but could not be coerced.
    #[error("{tag}: invalid value `{value}` for field `{field}`")]
    InvalidValue {
        tag: String,
        field: String,
        value: String,
    },
}
