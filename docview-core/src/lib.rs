use std::path::{Path, PathBuf};

use anyhow::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod annotation;
mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod history;
pub mod navigation;
pub mod overlay;
pub mod range;
pub mod raster;
pub mod search;
pub mod session;

pub use annotation::{Annotation, AnnotationId, AnnotationStore, StoredAnnotation};
pub use config::ViewerConfig;
pub use error::{ErrorKind, ViewerError, ViewerResult};
pub use export::{AnnotationExport, ExportedAnnotation};
pub use geometry::{DeviceRect, Point, Rect};
pub use history::{Command, History};
pub use navigation::{Bookmark, NavigationIndex, OutlineNode, ThumbnailRef, TocEntry};
pub use overlay::{OverlayItem, OverlayShape, RenderedPage};
pub use range::{parse_page_ranges, PageRange, ParseRangeError};
pub use raster::{Color, RasterImage};
pub use search::{SearchMatch, SearchSession};
pub use session::{Action, PanelVisibility, Session, SessionEvent, SharedSession};

pub type DocumentId = Uuid;

static DOCUMENT_NAMESPACE: Lazy<Uuid> = Lazy::new(|| {
    Uuid::parse_str("3f0c9d5e-6a41-5b0e-9c1f-8d2b7e4a6c13").expect("valid namespace UUID")
});

pub fn document_id_for_path(path: &Path) -> DocumentId {
    let resolved = path
        .canonicalize()
        .or_else(|_| {
            if path.is_absolute() {
                Ok(path.to_path_buf())
            } else {
                std::env::current_dir().map(|cwd| cwd.join(path))
            }
        })
        .unwrap_or_else(|_| path.to_path_buf());
    let rendered = resolved.to_string_lossy();
    Uuid::new_v5(&DOCUMENT_NAMESPACE, rendered.as_bytes())
}

/// Document-level information fields as exposed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub id: DocumentId,
    /// Source file; `None` for documents assembled in memory (merge results).
    pub path: Option<PathBuf>,
    pub page_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderRequest {
    pub page_index: usize,
    pub scale: f32,
    pub dark_mode: bool,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            page_index: 0,
            scale: 1.0,
            dark_mode: false,
        }
    }
}

/// One open document inside the decode/encode engine. Implementations use
/// interior mutability; a handle is owned by exactly one session.
pub trait DocumentBackend: Send + Sync {
    fn info(&self) -> &DocumentInfo;
    fn render_page(&self, request: RenderRequest) -> Result<RasterImage>;
    fn outline(&self) -> Result<Vec<OutlineNode>>;
    fn metadata(&self) -> Result<DocumentMetadata>;
    fn set_metadata(&self, metadata: &DocumentMetadata) -> Result<()>;
    /// Current clockwise rotation of a page in degrees, one of 0/90/180/270.
    fn rotation(&self, page_index: usize) -> Result<i32>;
    /// Rotates a page clockwise by `degrees` relative to its current rotation.
    fn rotate_page(&self, page_index: usize, degrees: i32) -> Result<()>;
    /// Match rectangles for `query` on one page, in page space at zoom 1.0.
    fn search_page(&self, page_index: usize, query: &str) -> Result<Vec<Rect>>;
    /// Copies the inclusive page range into a new in-memory document.
    fn extract_range(&self, start: usize, end: usize) -> Result<Box<dyn DocumentBackend>>;
    /// Serialised document bytes, used when concatenating handles.
    fn to_bytes(&self) -> Result<Vec<u8>>;
    fn save(&self, path: &Path) -> Result<()>;
    /// Writes pending changes back to the source file.
    fn save_incremental(&self) -> Result<()>;
}

#[async_trait::async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Box<dyn DocumentBackend>>;
    async fn concatenate(
        &self,
        documents: Vec<Box<dyn DocumentBackend>>,
    ) -> Result<Box<dyn DocumentBackend>>;
}

pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &RasterImage) -> Result<String>;
}

pub trait TextExporter: Send + Sync {
    fn export_text(&self, text: &str, output: &Path) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing;
