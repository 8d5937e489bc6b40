//! Error types for mission conversion and archive handling.

use crate::actions::ActionError;
use crate::validation::ValidationErrors;
use std::fmt;
use thiserror::Error;

/// Failure while assembling the mission tree. No partial tree is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("mission request is invalid: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("waypoint {waypoint}: {source}")]
    Encoding {
        waypoint: usize,
        #[source]
        source: ActionError,
    },
}

/// Failure while writing a mission document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to render {document}: {reason}")]
pub struct RenderError {
    pub document: DocumentKind,
    pub reason: String,
}

/// The two documents inside a mission archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// `wpmz/template.kml`
    Template,
    /// `wpmz/waylines.wpml`
    Waylines,
}

impl DocumentKind {
    pub fn entry_path(self) -> &'static str {
        match self {
            DocumentKind::Template => crate::container::TEMPLATE_ENTRY,
            DocumentKind::Waylines => crate::container::WAYLINES_ENTRY,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_path())
    }
}

/// Failure while packing or unpacking a mission archive.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("archive is missing required entry '{entry}'")]
    MissingEntry { entry: &'static str },
    #[error("malformed document {document}: {reason}")]
    MalformedDocument { document: DocumentKind, reason: String },
    #[error("inconsistent documents: {reason}")]
    InconsistentDocuments { reason: String },
    #[error("invalid resource name '{0}'")]
    InvalidResourceName(String),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure of the one-shot conversion operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl From<ValidationErrors> for Error {
    fn from(err: ValidationErrors) -> Self {
        Error::Build(BuildError::Validation(err))
    }
}
