//! Error types for snapshot resolution and descriptor processing

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving a query or turning a descriptor set into source.
///
/// Every variant is fatal to the current invocation. Nothing here is retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("version and latest cannot be specified together")]
    ConflictingSelector,

    #[error("need either version or latest")]
    MissingSelector,

    #[error("descriptor set is malformed: {0}")]
    MalformedInput(String),

    #[error(
        "{kind} '{name}' not found{}",
        .suggestion.as_ref().map(|s| format!(", did you mean '{s}'?")).unwrap_or_default()
    )]
    NotFound {
        kind: &'static str,
        name: String,
        suggestion: Option<String>,
    },

    #[error("cyclic dependency between files: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("cannot render {file}: {construct}")]
    UnrenderableConstruct { file: String, construct: String },

    /// Message reported by the registry, surfaced verbatim
    #[error("{message}")]
    Remote { status: u16, message: String },
}

impl Error {
    pub(crate) fn unrenderable(file: &str, construct: impl Into<String>) -> Self {
        Error::UnrenderableConstruct {
            file: file.to_string(),
            construct: construct.into(),
        }
    }
}
