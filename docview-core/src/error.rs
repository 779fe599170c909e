use std::path::PathBuf;

use thiserror::Error;

use crate::annotation::AnnotationId;

pub type ViewerResult<T> = std::result::Result<T, ViewerError>;

/// Coarse failure categories the presentation layer switches on when deciding
/// how to surface an error (dialog, status line, silent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoDocument,
    InvalidPage,
    InvalidRange,
    NotFound,
    EmptyHistory,
    NoMatches,
    OpenError,
    SaveError,
    ExternalToolError,
    Engine,
    Format,
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("no document is open")]
    NoDocument,
    #[error("page {page} is out of range (document has {page_count} pages)")]
    InvalidPage { page: usize, page_count: usize },
    #[error("page range {start}-{end} is invalid for a document with {page_count} pages")]
    InvalidRange {
        start: usize,
        end: usize,
        page_count: usize,
    },
    #[error("rotation of {0} degrees is not a multiple of 90")]
    InvalidRotation(i32),
    #[error("bookmark {0:?} not found")]
    BookmarkNotFound(String),
    #[error("annotation {id} not found on page {page}")]
    AnnotationNotFound { page: usize, id: AnnotationId },
    #[error("nothing to {0}")]
    EmptyHistory(&'static str),
    #[error("search has no matches")]
    NoMatches,
    #[error("failed to open {path:?}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("failed to save: {0}")]
    Save(String),
    #[error("failed to render page {page}: {message}")]
    Render { page: usize, message: String },
    #[error("document engine failed: {0}")]
    Engine(String),
    #[error("external tool failed: {0}")]
    ExternalTool(String),
    #[error("malformed annotation file: {0}")]
    AnnotationFormat(String),
}

impl ViewerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ViewerError::NoDocument => ErrorKind::NoDocument,
            ViewerError::InvalidPage { .. } => ErrorKind::InvalidPage,
            ViewerError::InvalidRange { .. } | ViewerError::InvalidRotation(_) => {
                ErrorKind::InvalidRange
            }
            ViewerError::BookmarkNotFound(_) | ViewerError::AnnotationNotFound { .. } => {
                ErrorKind::NotFound
            }
            ViewerError::EmptyHistory(_) => ErrorKind::EmptyHistory,
            ViewerError::NoMatches => ErrorKind::NoMatches,
            ViewerError::Open { .. } => ErrorKind::OpenError,
            ViewerError::Save(_) => ErrorKind::SaveError,
            ViewerError::Render { .. } | ViewerError::Engine(_) => ErrorKind::Engine,
            ViewerError::ExternalTool(_) => ErrorKind::ExternalToolError,
            ViewerError::AnnotationFormat(_) => ErrorKind::Format,
        }
    }

    pub(crate) fn save(err: anyhow::Error) -> Self {
        ViewerError::Save(format!("{err:#}"))
    }

    pub(crate) fn engine(err: anyhow::Error) -> Self {
        ViewerError::Engine(format!("{err:#}"))
    }

    pub(crate) fn render(page: usize, err: anyhow::Error) -> Self {
        ViewerError::Render {
            page,
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn external(err: anyhow::Error) -> Self {
        ViewerError::ExternalTool(format!("{err:#}"))
    }
}

pub(crate) fn check_page(page: usize, page_count: usize) -> ViewerResult<()> {
    if page < page_count {
        Ok(())
    } else {
        Err(ViewerError::InvalidPage { page, page_count })
    }
}
