//! In-memory engine used by the unit tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use parking_lot::Mutex;

use crate::geometry::Rect;
use crate::navigation::OutlineNode;
use crate::raster::{Color, RasterImage};
use crate::{
    document_id_for_path, DocumentBackend, DocumentInfo, DocumentMetadata, DocumentProvider,
    OcrEngine, RenderRequest, TextExporter,
};

#[derive(Default)]
pub(crate) struct FakeState {
    pub rotations: Vec<i32>,
    pub metadata: DocumentMetadata,
    pub fail_rotate_on: Option<usize>,
    pub fail_save_after: Option<usize>,
    pub saves: usize,
}

pub(crate) struct FakeBackend {
    pub info: DocumentInfo,
    pub outline: Vec<OutlineNode>,
    pub hits: HashMap<usize, Vec<Rect>>,
    pub state: Arc<Mutex<FakeState>>,
    pub renders: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new(path: Option<PathBuf>, page_count: usize) -> Self {
        let id = match &path {
            Some(path) => document_id_for_path(path),
            None => uuid::Uuid::new_v4(),
        };
        Self {
            info: DocumentInfo {
                id,
                path,
                page_count,
            },
            outline: Vec::new(),
            hits: HashMap::new(),
            state: Arc::new(Mutex::new(FakeState {
                rotations: vec![0; page_count],
                ..FakeState::default()
            })),
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl DocumentBackend for FakeBackend {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    fn render_page(&self, request: RenderRequest) -> Result<RasterImage> {
        if request.page_index >= self.info.page_count {
            bail!("page {} out of range", request.page_index);
        }
        self.renders.fetch_add(1, Ordering::SeqCst);
        let side = (100.0 * request.scale).round().max(1.0) as u32;
        let fill = if request.dark_mode {
            Color::new(0, 0, 0, 255)
        } else {
            Color::new(255, 255, 255, 255)
        };
        Ok(RasterImage::new(side, side, fill))
    }

    fn outline(&self) -> Result<Vec<OutlineNode>> {
        Ok(self.outline.clone())
    }

    fn metadata(&self) -> Result<DocumentMetadata> {
        Ok(self.state.lock().metadata.clone())
    }

    fn set_metadata(&self, metadata: &DocumentMetadata) -> Result<()> {
        self.state.lock().metadata = metadata.clone();
        Ok(())
    }

    fn rotation(&self, page_index: usize) -> Result<i32> {
        self.state
            .lock()
            .rotations
            .get(page_index)
            .copied()
            .ok_or_else(|| anyhow!("page {page_index} out of range"))
    }

    fn rotate_page(&self, page_index: usize, degrees: i32) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_rotate_on == Some(page_index) {
            bail!("page {page_index} is locked");
        }
        let rotation = state
            .rotations
            .get_mut(page_index)
            .ok_or_else(|| anyhow!("page {page_index} out of range"))?;
        *rotation = (*rotation + degrees).rem_euclid(360);
        Ok(())
    }

    fn search_page(&self, page_index: usize, _query: &str) -> Result<Vec<Rect>> {
        Ok(self.hits.get(&page_index).cloned().unwrap_or_default())
    }

    fn extract_range(&self, start: usize, end: usize) -> Result<Box<dyn DocumentBackend>> {
        let mut part = FakeBackend::new(None, end - start + 1);
        // share the save counter so failures can be injected mid-split
        part.state = Arc::clone(&self.state);
        Ok(Box::new(part))
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(format!("fake:{}", self.info.page_count).into_bytes())
    }

    fn save(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_save_after == Some(state.saves) {
            bail!("disk full");
        }
        state.saves += 1;
        fs::write(path, format!("fake:{}", self.info.page_count))?;
        Ok(())
    }

    fn save_incremental(&self) -> Result<()> {
        match &self.info.path {
            Some(path) => self.save(path),
            None => bail!("document has no source file"),
        }
    }
}

/// Shared views into the most recently opened fake document.
#[derive(Clone)]
pub(crate) struct FakeHandles {
    pub state: Arc<Mutex<FakeState>>,
    pub renders: Arc<AtomicUsize>,
}

impl FakeHandles {
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

/// Opens any path as a document with `page_count` pages, except paths whose
/// file name starts with `broken`.
pub(crate) struct FakeProvider {
    pub page_count: usize,
    pub outline: Vec<OutlineNode>,
    pub hits: HashMap<usize, Vec<Rect>>,
    last_opened: Mutex<Option<FakeHandles>>,
}

impl FakeProvider {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            outline: Vec::new(),
            hits: HashMap::new(),
            last_opened: Mutex::new(None),
        }
    }

    pub fn last_opened(&self) -> FakeHandles {
        self.last_opened
            .lock()
            .clone()
            .expect("a document was opened")
    }
}

#[async_trait::async_trait]
impl DocumentProvider for FakeProvider {
    async fn open(&self, path: &Path) -> Result<Box<dyn DocumentBackend>> {
        let broken = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with("broken"))
            .unwrap_or(false);
        if broken {
            bail!("not a PDF file");
        }
        let mut backend = FakeBackend::new(Some(path.to_path_buf()), self.page_count);
        backend.outline = self.outline.clone();
        backend.hits = self.hits.clone();
        *self.last_opened.lock() = Some(FakeHandles {
            state: Arc::clone(&backend.state),
            renders: Arc::clone(&backend.renders),
        });
        Ok(Box::new(backend))
    }

    async fn concatenate(
        &self,
        documents: Vec<Box<dyn DocumentBackend>>,
    ) -> Result<Box<dyn DocumentBackend>> {
        let mut total = 0;
        for document in &documents {
            let bytes = document.to_bytes()?;
            let text = String::from_utf8(bytes)?;
            let count: usize = text
                .strip_prefix("fake:")
                .ok_or_else(|| anyhow!("unexpected payload"))?
                .parse()?;
            total += count;
        }
        Ok(Box::new(FakeBackend::new(None, total)))
    }
}

/// Never finishes opening or concatenating; records that a call began.
#[derive(Default)]
pub(crate) struct PendingProvider {
    started: AtomicBool,
}

impl PendingProvider {
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DocumentProvider for PendingProvider {
    async fn open(&self, _path: &Path) -> Result<Box<dyn DocumentBackend>> {
        self.started.store(true, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn concatenate(
        &self,
        _documents: Vec<Box<dyn DocumentBackend>>,
    ) -> Result<Box<dyn DocumentBackend>> {
        self.started.store(true, Ordering::SeqCst);
        std::future::pending().await
    }
}

pub(crate) struct SizeReportingOcr;

impl OcrEngine for SizeReportingOcr {
    fn recognize(&self, image: &RasterImage) -> Result<String> {
        Ok(format!("PAGE {}x{}\n", image.width, image.height))
    }
}

pub(crate) struct FailingOcr;

impl OcrEngine for FailingOcr {
    fn recognize(&self, _image: &RasterImage) -> Result<String> {
        bail!("tesseract exited with status 1")
    }
}

#[derive(Default)]
pub(crate) struct CapturingExporter {
    pub written: Mutex<Vec<(String, PathBuf)>>,
}

impl TextExporter for CapturingExporter {
    fn export_text(&self, text: &str, output: &Path) -> Result<()> {
        self.written
            .lock()
            .push((text.to_owned(), output.to_path_buf()));
        Ok(())
    }
}
