use std::convert::TryFrom;
use std::fs;
use std::io::Write;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use docview_core::{
    document_id_for_path, DocumentBackend, DocumentInfo, DocumentMetadata, DocumentProvider,
    OutlineNode, RasterImage, Rect, RenderRequest,
};
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use tempfile::NamedTempFile;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::info::apply_metadata;
use crate::invert_pixels;

pub struct PdfiumRenderFactory {
    pdfium: Arc<Pdfium>,
}

impl PdfiumRenderFactory {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pdfium: Arc::new(bind_pdfium_default()?),
        })
    }
}

#[async_trait]
impl DocumentProvider for PdfiumRenderFactory {
    #[instrument(skip(self))]
    async fn open(&self, path: &Path) -> Result<Box<dyn DocumentBackend>> {
        let absolute = path
            .canonicalize()
            .with_context(|| format!("failed to resolve path for {:?}", path))?;
        let document = self
            .pdfium
            .load_pdf_from_file(&absolute, None)
            .with_context(|| format!("failed to open {:?}", absolute))?;
        Ok(Box::new(PdfiumDocument::adopt(
            Arc::clone(&self.pdfium),
            document,
            Some(absolute),
        )))
    }

    #[instrument(skip_all, fields(count = documents.len()))]
    async fn concatenate(
        &self,
        documents: Vec<Box<dyn DocumentBackend>>,
    ) -> Result<Box<dyn DocumentBackend>> {
        let mut merged = self
            .pdfium
            .create_new_pdf()
            .context("failed to create merged document")?;
        for (idx, document) in documents.iter().enumerate() {
            let bytes = document
                .to_bytes()
                .with_context(|| format!("failed to serialise document {}", idx + 1))?;
            let source = self
                .pdfium
                .load_pdf_from_byte_vec(bytes, None)
                .with_context(|| format!("failed to reload document {}", idx + 1))?;
            merged
                .pages_mut()
                .append(&source)
                .with_context(|| format!("failed to append document {}", idx + 1))?;
        }
        Ok(Box::new(PdfiumDocument::adopt(
            Arc::clone(&self.pdfium),
            merged,
            None,
        )))
    }
}

struct PdfiumDocument {
    info: DocumentInfo,
    document: Mutex<PdfDocument<'static>>,
    /// Pdfium has no metadata writer; edits are patched into the bytes on save.
    metadata_override: Mutex<Option<DocumentMetadata>>,
    pdfium: Arc<Pdfium>,
}

impl PdfiumDocument {
    fn adopt(pdfium: Arc<Pdfium>, document: PdfDocument<'_>, path: Option<PathBuf>) -> Self {
        let page_count = usize::try_from(document.pages().len()).unwrap_or_default();
        let id = match &path {
            Some(path) => document_id_for_path(path),
            None => Uuid::new_v4(),
        };
        // SAFETY: the document borrows the bindings owned by `pdfium`. Struct fields drop in
        // declaration order, so `document` is dropped while this struct's Arc still keeps the
        // bindings alive.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
        Self {
            info: DocumentInfo {
                id,
                path,
                page_count,
            },
            document: Mutex::new(document),
            metadata_override: Mutex::new(None),
            pdfium,
        }
    }

    fn with_page<R, F>(&self, page_index: usize, f: F) -> Result<R>
    where
        F: FnOnce(PdfPage<'_>) -> Result<R>,
    {
        let document = self.document.lock();
        let index = pdf_page_index(page_index)?;
        let page = document
            .pages()
            .get(index)
            .with_context(|| format!("page {} out of range", page_index))?;
        f(page)
    }

    fn serialise(&self) -> Result<Vec<u8>> {
        let bytes = self
            .document
            .lock()
            .save_to_bytes()
            .context("failed to serialise document")?;
        match self.metadata_override.lock().as_ref() {
            Some(metadata) => apply_metadata(&bytes, metadata),
            None => Ok(bytes),
        }
    }
}

impl DocumentBackend for PdfiumDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    #[instrument(skip(self))]
    fn render_page(&self, request: RenderRequest) -> Result<RasterImage> {
        self.with_page(request.page_index, |page| {
            let config = PdfRenderConfig::new().scale_page_by_factor(request.scale.max(0.1));
            let bitmap = page
                .render_with_config(&config)
                .with_context(|| format!("failed to render page {}", request.page_index))?;
            let image = bitmap.as_image().to_rgba8();
            let (width, height) = image.dimensions();
            let mut pixels = image.into_raw();

            if request.dark_mode {
                invert_pixels(&mut pixels);
            }

            Ok(RasterImage {
                width,
                height,
                pixels,
            })
        })
    }

    fn outline(&self) -> Result<Vec<OutlineNode>> {
        let document = self.document.lock();
        Ok(document
            .bookmarks()
            .root()
            .map(collect_outline)
            .unwrap_or_default())
    }

    fn metadata(&self) -> Result<DocumentMetadata> {
        if let Some(metadata) = self.metadata_override.lock().as_ref() {
            return Ok(metadata.clone());
        }
        Ok(read_metadata(&self.document.lock()))
    }

    fn set_metadata(&self, metadata: &DocumentMetadata) -> Result<()> {
        *self.metadata_override.lock() = Some(metadata.clone());
        Ok(())
    }

    fn rotation(&self, page_index: usize) -> Result<i32> {
        self.with_page(page_index, |page| {
            let rotation = page
                .rotation()
                .with_context(|| format!("failed to read rotation of page {}", page_index))?;
            Ok(rotation_degrees(rotation))
        })
    }

    fn rotate_page(&self, page_index: usize, degrees: i32) -> Result<()> {
        self.with_page(page_index, |mut page| {
            let current = page
                .rotation()
                .with_context(|| format!("failed to read rotation of page {}", page_index))?;
            let target = rotation_from_degrees(rotation_degrees(current) + degrees)?;
            page.set_rotation(target);
            Ok(())
        })
    }

    fn search_page(&self, page_index: usize, query: &str) -> Result<Vec<Rect>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        self.with_page(page_index, |page| {
            let text = page
                .text()
                .with_context(|| format!("failed to extract text for page {}", page_index))?;
            let search = text
                .search(query, &PdfSearchOptions::new())
                .with_context(|| format!("failed to perform search on page {}", page_index))?;

            let page_height = page.height().value;
            let mut results = Vec::new();
            while let Some(segments) = search.find_next() {
                let mut bounds: Option<(f32, f32, f32, f32)> = None;
                for segment in segments.iter() {
                    let rect = segment.bounds();
                    let (left, top) = (rect.left().value, page_height - rect.top().value);
                    let (right, bottom) = (rect.right().value, page_height - rect.bottom().value);
                    bounds = Some(match bounds {
                        Some((l, t, r, b)) => (l.min(left), t.min(top), r.max(right), b.max(bottom)),
                        None => (left, top, right, bottom),
                    });
                }
                if let Some((left, top, right, bottom)) = bounds {
                    let rect = Rect::new(left, top, right - left, bottom - top);
                    if !rect.is_empty() {
                        results.push(rect);
                    }
                }
            }
            Ok(results)
        })
    }

    fn extract_range(&self, start: usize, end: usize) -> Result<Box<dyn DocumentBackend>> {
        let source = self.document.lock();
        let mut part = self
            .pdfium
            .create_new_pdf()
            .context("failed to create document")?;
        part.pages_mut()
            .copy_page_range_from_document(
                &source,
                pdf_page_index(start)?..=pdf_page_index(end)?,
                0,
            )
            .with_context(|| format!("failed to copy pages {}-{}", start + 1, end + 1))?;
        Ok(Box::new(PdfiumDocument::adopt(
            Arc::clone(&self.pdfium),
            part,
            None,
        )))
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        self.serialise()
    }

    fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.serialise()?;
        fs::write(path, bytes).with_context(|| format!("failed to write {:?}", path))?;
        info!(?path, "document saved");
        Ok(())
    }

    fn save_incremental(&self) -> Result<()> {
        let Some(path) = self.info.path.as_ref() else {
            bail!("document has no source file");
        };
        let bytes = self.serialise()?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to stage write next to {:?}", path))?;
        staged.write_all(&bytes)?;
        staged
            .persist(path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to replace {:?}", path))?;
        info!(?path, "document saved in place");
        Ok(())
    }
}

fn pdf_page_index(page_index: usize) -> Result<PdfPageIndex> {
    page_index
        .try_into()
        .map_err(|_| anyhow!("page {} is out of supported range", page_index))
}

fn collect_outline(first: PdfBookmark<'_>) -> Vec<OutlineNode> {
    let mut nodes = Vec::new();
    let mut current = Some(first);
    while let Some(bookmark) = current {
        let page = bookmark
            .destination()
            .and_then(|destination| destination.page_index().ok())
            .map(|index| index as usize + 1);
        nodes.push(OutlineNode {
            title: bookmark.title().unwrap_or_default(),
            page,
            children: bookmark.first_child().map(collect_outline).unwrap_or_default(),
        });
        current = bookmark.next_sibling();
    }
    nodes
}

fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();
    let field = |tag: PdfDocumentMetadataTagType| {
        metadata
            .get(tag)
            .map(|t| t.value().to_owned())
            .filter(|value| !value.is_empty())
    };
    DocumentMetadata {
        title: field(PdfDocumentMetadataTagType::Title),
        author: field(PdfDocumentMetadataTagType::Author),
        subject: field(PdfDocumentMetadataTagType::Subject),
        keywords: field(PdfDocumentMetadataTagType::Keywords),
    }
}

fn rotation_degrees(rotation: PdfPageRenderRotation) -> i32 {
    match rotation {
        PdfPageRenderRotation::None => 0,
        PdfPageRenderRotation::Degrees90 => 90,
        PdfPageRenderRotation::Degrees180 => 180,
        PdfPageRenderRotation::Degrees270 => 270,
    }
}

fn rotation_from_degrees(degrees: i32) -> Result<PdfPageRenderRotation> {
    match degrees.rem_euclid(360) {
        0 => Ok(PdfPageRenderRotation::None),
        90 => Ok(PdfPageRenderRotation::Degrees90),
        180 => Ok(PdfPageRenderRotation::Degrees180),
        270 => Ok(PdfPageRenderRotation::Degrees270),
        other => bail!("rotation of {other} degrees is not supported"),
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");

    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("{}: {}", cwd_path.display(), err));
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; ensure it is installed ({})",
                errors.join(", ")
            ))
        }
    }
}
