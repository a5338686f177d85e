use crate::object::ObjectKind;
use std::path::PathBuf;
use thiserror::Error;

/// The errors produced by world-state construction and persistence.
#[derive(Debug, Error)]
pub enum StateError {
    /// A geometry or graph invariant was violated during construction.
    /// This indicates a broken layout and is not recoverable at runtime.
    #[error("layout inconsistency: {0}")]
    LayoutInconsistency(String),

    /// A waypoint index in a precomputed graph or cache did not resolve.
    #[error("unresolved waypoint reference: index {index}")]
    UnresolvedReference { index: usize },

    /// An episode record was produced on a different layout than the one
    /// it is being restored onto.
    #[error("episode was recorded on layout `{found}`, but layout `{expected}` is loaded")]
    IncompatibleRestore { expected: String, found: String },

    /// Randomized placement gave up after too many rejected candidates.
    /// Recoverable: reduce the agent count or relax the layout.
    #[error("could not place a {kind:?} after {attempts} attempts")]
    PlacementExhausted { kind: ObjectKind, attempts: usize },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record in {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Format {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
