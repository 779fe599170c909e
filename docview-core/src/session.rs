use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::annotation::{Annotation, AnnotationId, AnnotationStore, StoredAnnotation};
use crate::cache::{CacheKey, RenderCache};
use crate::config::ViewerConfig;
use crate::error::{check_page, ViewerError, ViewerResult};
use crate::export::AnnotationExport;
use crate::geometry::Rect;
use crate::history::{Command, History};
use crate::navigation::{Bookmark, NavigationIndex, TocEntry};
use crate::overlay::{self, RenderedPage};
use crate::range::PageRange;
use crate::raster::RasterImage;
use crate::search::{SearchMatch, SearchSession};
use crate::{
    DocumentBackend, DocumentId, DocumentInfo, DocumentMetadata, DocumentProvider, OcrEngine,
    RenderRequest, TextExporter,
};

/// Navigation and view actions relayed from the presentation layer.
#[derive(Debug, Clone)]
pub enum Action {
    NextPage { count: usize },
    PrevPage { count: usize },
    GotoPage { page: usize },
    ZoomIn,
    ZoomOut,
    SetZoom { factor: f32 },
    PutBookmark { name: String },
    GotoBookmark { name: String },
    ToggleToc,
    ToggleThumbnails,
    ToggleDarkMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    DocumentOpened(DocumentId),
    DocumentClosed(DocumentId),
    ActivePageChanged { document: DocumentId, page: usize },
    RedrawNeeded(DocumentId),
    ThumbnailInvalidated { document: DocumentId, page: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelVisibility {
    pub toc: bool,
    pub thumbnails: bool,
}

/// A session behind a mutex, for hosts that drive it from several threads.
/// The whole session is the unit of exclusion.
pub type SharedSession = Arc<Mutex<Session>>;

/// Everything tied to one open document. Dropping it discards all of it at
/// once.
struct OpenDocument {
    info: DocumentInfo,
    backend: Box<dyn DocumentBackend>,
    annotations: AnnotationStore,
    navigation: NavigationIndex,
    history: History,
    search: SearchSession,
    active_page: usize,
    render_cache: Mutex<RenderCache>,
}

impl OpenDocument {
    fn new(backend: Box<dyn DocumentBackend>, config: &ViewerConfig) -> Self {
        let info = backend.info().clone();
        let outline = match backend.outline() {
            Ok(outline) => outline,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to read document outline");
                Vec::new()
            }
        };
        Self {
            navigation: NavigationIndex::new(&outline, info.page_count),
            annotations: AnnotationStore::new(info.page_count),
            history: History::new(),
            search: SearchSession::new(),
            active_page: 0,
            render_cache: Mutex::new(RenderCache::new(config.render_cache_capacity)),
            info,
            backend,
        }
    }

    fn page_count(&self) -> usize {
        self.info.page_count
    }

    fn raster(&self, page_index: usize, scale: f32, dark_mode: bool) -> ViewerResult<RasterImage> {
        let key = CacheKey::new(page_index, scale, dark_mode);
        if let Some(image) = self.render_cache.lock().get(&key) {
            return Ok(image);
        }

        let request = RenderRequest {
            page_index,
            scale,
            dark_mode,
        };
        let image = self
            .backend
            .render_page(request)
            .map_err(|err| ViewerError::render(page_index, err))?;
        self.render_cache
            .lock()
            .insert(key, image.clone(), self.active_page);
        Ok(image)
    }

    fn rotate(&mut self, page_index: usize, degrees: i32) -> ViewerResult<()> {
        check_page(page_index, self.page_count())?;
        self.backend
            .rotate_page(page_index, degrees)
            .with_context(|| format!("failed to rotate page {page_index}"))
            .map_err(ViewerError::engine)?;
        self.navigation.invalidate_page(page_index);
        self.render_cache.get_mut().invalidate_page(page_index);
        Ok(())
    }

    fn apply(&mut self, command: &Command) -> ViewerResult<()> {
        match command {
            Command::AddAnnotation {
                page_index,
                id,
                position,
                annotation,
            } => self
                .annotations
                .insert_at(*page_index, *position, *id, annotation.clone()),
            Command::RemoveAnnotation { page_index, id, .. } => {
                self.annotations.remove(*page_index, *id).map(|_| ())
            }
            Command::RotatePage {
                page_index,
                degrees,
            } => self.rotate(*page_index, *degrees),
            Command::SetMetadata { new, .. } => {
                self.backend.set_metadata(new).map_err(ViewerError::save)
            }
        }
    }
}

fn announce(events: &Mutex<Vec<SessionEvent>>, document: DocumentId, command: &Command) {
    let mut events = events.lock();
    if let Command::RotatePage { page_index, .. } = command {
        events.push(SessionEvent::ThumbnailInvalidated {
            document,
            page: *page_index,
        });
    }
    events.push(SessionEvent::RedrawNeeded(document));
}

fn normalize_rotation(degrees: i32) -> ViewerResult<i32> {
    if degrees % 90 != 0 {
        return Err(ViewerError::InvalidRotation(degrees));
    }
    Ok(degrees.rem_euclid(360))
}

pub struct Session {
    config: ViewerConfig,
    document: Option<OpenDocument>,
    zoom: f32,
    dark_mode: bool,
    panels: PanelVisibility,
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl Session {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            zoom: config.clamp_zoom(config.default_zoom),
            config,
            document: None,
            dark_mode: false,
            panels: PanelVisibility::default(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn events(&self) -> Arc<Mutex<Vec<SessionEvent>>> {
        Arc::clone(&self.events)
    }

    fn doc(&self) -> ViewerResult<&OpenDocument> {
        self.document.as_ref().ok_or(ViewerError::NoDocument)
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    pub fn info(&self) -> Option<&DocumentInfo> {
        self.document.as_ref().map(|doc| &doc.info)
    }

    pub fn page_count(&self) -> Option<usize> {
        self.document.as_ref().map(OpenDocument::page_count)
    }

    pub fn active_page(&self) -> Option<usize> {
        self.document
            .as_ref()
            .filter(|doc| doc.active_page < doc.page_count())
            .map(|doc| doc.active_page)
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn panels(&self) -> PanelVisibility {
        self.panels
    }

    pub fn toc(&self) -> ViewerResult<&[TocEntry]> {
        Ok(self.doc()?.navigation.toc())
    }

    pub fn bookmarks(&self) -> ViewerResult<Vec<Bookmark>> {
        Ok(self.doc()?.navigation.bookmarks())
    }

    pub fn annotations(&self, page_index: usize) -> ViewerResult<&[StoredAnnotation]> {
        let doc = self.doc()?;
        check_page(page_index, doc.page_count())?;
        Ok(doc.annotations.for_page(page_index))
    }

    pub fn annotation_count(&self) -> usize {
        self.document
            .as_ref()
            .map_or(0, |doc| doc.annotations.len())
    }

    pub fn can_undo(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|doc| doc.history.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|doc| doc.history.can_redo())
    }

    pub fn search_session(&self) -> Option<&SearchSession> {
        self.document.as_ref().map(|doc| &doc.search)
    }

    /// Opens `path` and makes it the session's document. A failure leaves
    /// the current document and all of its state in place.
    #[instrument(skip(self, provider))]
    pub async fn open_with<P>(&mut self, provider: &P, path: PathBuf) -> ViewerResult<()>
    where
        P: DocumentProvider + ?Sized,
    {
        let backend = provider
            .open(&path)
            .await
            .map_err(|err| ViewerError::Open {
                path: path.clone(),
                message: format!("{err:#}"),
            })?;
        self.adopt(backend);
        info!(pages = self.page_count().unwrap_or(0), "document opened");
        Ok(())
    }

    /// Concatenates `documents` in order and replaces the session's document
    /// with the result. Navigation, annotations and history start empty.
    #[instrument(skip(self, provider, documents), fields(count = documents.len()))]
    pub async fn merge_with<P>(
        &mut self,
        provider: &P,
        documents: Vec<Box<dyn DocumentBackend>>,
    ) -> ViewerResult<()>
    where
        P: DocumentProvider + ?Sized,
    {
        if documents.is_empty() {
            return Err(ViewerError::Engine("no documents to merge".into()));
        }
        let merged = provider
            .concatenate(documents)
            .await
            .map_err(ViewerError::engine)?;
        self.adopt(merged);
        info!(pages = self.page_count().unwrap_or(0), "documents merged");
        Ok(())
    }

    fn adopt(&mut self, backend: Box<dyn DocumentBackend>) {
        let document = OpenDocument::new(backend, &self.config);
        let id = document.info.id;
        let previous = self.document.replace(document);

        let mut events = self.events.lock();
        if let Some(previous) = previous {
            events.push(SessionEvent::DocumentClosed(previous.info.id));
        }
        events.push(SessionEvent::DocumentOpened(id));
        events.push(SessionEvent::ActivePageChanged {
            document: id,
            page: 0,
        });
    }

    /// Releases the document and everything derived from it. Idempotent.
    pub fn close(&mut self) {
        if let Some(document) = self.document.take() {
            info!(id = %document.info.id, "document closed");
            self.events
                .lock()
                .push(SessionEvent::DocumentClosed(document.info.id));
        }
        self.panels = PanelVisibility::default();
    }

    pub fn set_active_page(&mut self, page_index: usize) -> ViewerResult<()> {
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        check_page(page_index, doc.page_count())?;
        if doc.active_page != page_index {
            doc.active_page = page_index;
            self.events.lock().push(SessionEvent::ActivePageChanged {
                document: doc.info.id,
                page: page_index,
            });
        }
        Ok(())
    }

    /// Renders a page at the session zoom, then paints the optional
    /// highlight followed by the page's annotations in insertion order.
    pub fn render_page(
        &self,
        page_index: usize,
        highlight: Option<Rect>,
    ) -> ViewerResult<RenderedPage> {
        let doc = self.doc()?;
        check_page(page_index, doc.page_count())?;
        let base = doc.raster(page_index, self.zoom, self.dark_mode)?;
        Ok(overlay::compose(
            page_index,
            self.zoom,
            base,
            highlight,
            doc.annotations.for_page(page_index),
        ))
    }

    /// Renders the page of the current search match with the match
    /// highlighted.
    pub fn render_search_match(&self) -> ViewerResult<RenderedPage> {
        let found = self
            .doc()?
            .search
            .current()
            .ok_or(ViewerError::NoMatches)?;
        self.render_page(found.page_index, Some(found.rect))
    }

    /// Thumbnail raster for a page, rendered on first use and kept until the
    /// page is rotated or the document closes.
    pub fn thumbnail(&mut self, page_index: usize) -> ViewerResult<RasterImage> {
        let scale = self.config.thumbnail_scale;
        let dark_mode = self.dark_mode;
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        check_page(page_index, doc.page_count())?;

        if let Some(raster) = doc
            .navigation
            .thumbnail(page_index)
            .and_then(|thumb| thumb.raster.clone())
        {
            return Ok(raster);
        }

        let raster = doc
            .backend
            .render_page(RenderRequest {
                page_index,
                scale,
                dark_mode,
            })
            .map_err(|err| ViewerError::render(page_index, err))?;
        doc.navigation.store_thumbnail(page_index, raster.clone())?;
        Ok(raster)
    }

    /// Sets the shared zoom, clamped to the configured bounds. Returns the
    /// zoom actually applied. Re-rendering is left to the caller.
    pub fn set_zoom(&mut self, factor: f32) -> f32 {
        let zoom = self.config.clamp_zoom(factor);
        if (zoom - self.zoom).abs() > f32::EPSILON {
            self.zoom = zoom;
            if let Some(doc) = &self.document {
                self.events
                    .lock()
                    .push(SessionEvent::RedrawNeeded(doc.info.id));
            }
        }
        self.zoom
    }

    pub fn add_annotation(
        &mut self,
        page_index: usize,
        annotation: Annotation,
    ) -> ViewerResult<AnnotationId> {
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        let id = doc.annotations.add(page_index, annotation.clone())?;
        let position = doc.annotations.for_page(page_index).len() - 1;
        let command = Command::AddAnnotation {
            page_index,
            id,
            position,
            annotation,
        };
        announce(&self.events, doc.info.id, &command);
        doc.history.record(command);
        Ok(id)
    }

    pub fn remove_annotation(&mut self, page_index: usize, id: AnnotationId) -> ViewerResult<()> {
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        let (position, annotation) = doc.annotations.remove(page_index, id)?;
        let command = Command::RemoveAnnotation {
            page_index,
            id,
            position,
            annotation,
        };
        announce(&self.events, doc.info.id, &command);
        doc.history.record(command);
        Ok(())
    }

    /// Bookmarks the active page under `name`, replacing any bookmark with
    /// the same name.
    pub fn add_bookmark(&mut self, name: impl Into<String>) -> ViewerResult<usize> {
        let doc = self.doc()?;
        let page = doc.active_page;
        check_page(page, doc.page_count())?;
        self.add_bookmark_at(name, page)?;
        Ok(page)
    }

    pub fn add_bookmark_at(&mut self, name: impl Into<String>, page_index: usize) -> ViewerResult<()> {
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        doc.navigation.add_bookmark(name, page_index)
    }

    pub fn resolve_bookmark(&self, name: &str) -> ViewerResult<usize> {
        self.doc()?.navigation.resolve_bookmark(name)
    }

    pub fn goto_bookmark(&mut self, name: &str) -> ViewerResult<usize> {
        let page = self.resolve_bookmark(name)?;
        self.set_active_page(page)?;
        Ok(page)
    }

    pub fn rotation(&self, page_index: usize) -> ViewerResult<i32> {
        let doc = self.doc()?;
        check_page(page_index, doc.page_count())?;
        doc.backend.rotation(page_index).map_err(ViewerError::engine)
    }

    #[instrument(skip(self))]
    pub fn rotate_page(&mut self, page_index: usize, degrees: i32) -> ViewerResult<()> {
        let degrees = normalize_rotation(degrees)?;
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        doc.rotate(page_index, degrees)?;
        let command = Command::RotatePage {
            page_index,
            degrees,
        };
        announce(&self.events, doc.info.id, &command);
        doc.history.record(command);
        Ok(())
    }

    /// Rotates every page, recording one command per page. If any page
    /// fails, pages already rotated are turned back and nothing is recorded.
    #[instrument(skip(self))]
    pub fn rotate_all(&mut self, degrees: i32) -> ViewerResult<()> {
        let degrees = normalize_rotation(degrees)?;
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        let page_count = doc.page_count();

        for page_index in 0..page_count {
            if let Err(err) = doc.rotate(page_index, degrees) {
                let back = (360 - degrees) % 360;
                for done in (0..page_index).rev() {
                    if let Err(rollback) = doc.rotate(done, back) {
                        warn!(page = done, error = %rollback, "failed to roll back rotation");
                    }
                }
                return Err(err);
            }
        }

        for page_index in 0..page_count {
            let command = Command::RotatePage {
                page_index,
                degrees,
            };
            announce(&self.events, doc.info.id, &command);
            doc.history.record(command);
        }
        Ok(())
    }

    pub fn metadata(&self) -> ViewerResult<DocumentMetadata> {
        self.doc()?.backend.metadata().map_err(ViewerError::engine)
    }

    pub fn set_metadata(&mut self, metadata: DocumentMetadata) -> ViewerResult<()> {
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        let old = doc.backend.metadata().map_err(ViewerError::engine)?;
        if old == metadata {
            return Ok(());
        }
        doc.backend
            .set_metadata(&metadata)
            .map_err(ViewerError::save)?;
        let command = Command::SetMetadata { old, new: metadata };
        announce(&self.events, doc.info.id, &command);
        doc.history.record(command);
        Ok(())
    }

    /// Reverts the most recent command. Returns the command that was undone.
    pub fn undo(&mut self) -> ViewerResult<Command> {
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        let mut history = std::mem::take(&mut doc.history);
        let result = history.undo(|inverse| doc.apply(inverse));
        doc.history = history;
        let command = result?;
        announce(&self.events, doc.info.id, &command);
        Ok(command)
    }

    pub fn redo(&mut self) -> ViewerResult<Command> {
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        let mut history = std::mem::take(&mut doc.history);
        let result = history.redo(|command| doc.apply(command));
        doc.history = history;
        let command = result?;
        announce(&self.events, doc.info.id, &command);
        Ok(command)
    }

    /// Runs a new search over every page. Returns the number of matches.
    #[instrument(skip(self))]
    pub fn search(&mut self, query: &str) -> ViewerResult<usize> {
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        let backend = &doc.backend;
        let page_count = doc.info.page_count;
        let count = doc.search.start(query, |query| {
            let mut matches = Vec::new();
            if query.trim().is_empty() {
                return Ok(matches);
            }
            for page_index in 0..page_count {
                let rects = backend
                    .search_page(page_index, query)
                    .map_err(ViewerError::engine)?;
                matches.extend(
                    rects
                        .into_iter()
                        .map(|rect| SearchMatch { page_index, rect }),
                );
            }
            Ok(matches)
        })?;
        info!(count, "search finished");
        Ok(count)
    }

    pub fn search_next(&mut self) -> ViewerResult<SearchMatch> {
        self.step_search(SearchSession::next)
    }

    pub fn search_previous(&mut self) -> ViewerResult<SearchMatch> {
        self.step_search(SearchSession::previous)
    }

    fn step_search(
        &mut self,
        step: fn(&mut SearchSession) -> ViewerResult<SearchMatch>,
    ) -> ViewerResult<SearchMatch> {
        let doc = self.document.as_mut().ok_or(ViewerError::NoDocument)?;
        let found = step(&mut doc.search)?;
        let mut events = self.events.lock();
        if doc.active_page != found.page_index {
            doc.active_page = found.page_index;
            events.push(SessionEvent::ActivePageChanged {
                document: doc.info.id,
                page: found.page_index,
            });
        }
        events.push(SessionEvent::RedrawNeeded(doc.info.id));
        Ok(found)
    }

    /// Writes each range to `output_dir/split_part_<n>.pdf`. All ranges are
    /// validated before anything is written, and parts already written are
    /// removed again if a later part fails.
    #[instrument(skip(self, ranges), fields(parts = ranges.len()))]
    pub fn split_ranges(
        &self,
        ranges: &[PageRange],
        output_dir: &Path,
    ) -> ViewerResult<Vec<PathBuf>> {
        let doc = self.doc()?;
        for range in ranges {
            range.validate(doc.page_count())?;
        }

        fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create output directory {:?}", output_dir))
            .map_err(ViewerError::save)?;

        // parts land under hidden names and are renamed only once all succeeded
        let mut staged = Vec::with_capacity(ranges.len());
        for (idx, range) in ranges.iter().enumerate() {
            let n = idx + 1;
            let partial = output_dir.join(format!(".split_part_{n}.pdf.partial"));
            let result = doc
                .backend
                .extract_range(range.start, range.end)
                .and_then(|part| part.save(&partial))
                .with_context(|| format!("failed to write pages {range} to {:?}", partial));
            if let Err(err) = result {
                discard_partials(staged.iter().map(|(partial, _)| partial).chain([&partial]));
                return Err(ViewerError::save(err));
            }
            staged.push((partial, output_dir.join(format!("split_part_{n}.pdf"))));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (idx, (partial, path)) in staged.iter().enumerate() {
            let moved = fs::rename(partial, path)
                .with_context(|| format!("failed to move {:?} into place", path));
            if let Err(err) = moved {
                discard_partials(staged[idx..].iter().map(|(partial, _)| partial));
                return Err(ViewerError::save(err));
            }
            written.push(path.clone());
        }

        info!(parts = written.len(), dir = ?output_dir, "document split");
        Ok(written)
    }

    pub fn save(&self, path: &Path) -> ViewerResult<()> {
        self.doc()?
            .backend
            .save(path)
            .with_context(|| format!("failed to save document to {:?}", path))
            .map_err(ViewerError::save)
    }

    pub fn save_incremental(&self) -> ViewerResult<()> {
        self.doc()?
            .backend
            .save_incremental()
            .map_err(ViewerError::save)
    }

    /// Writes every annotation to `path` in the JSON interchange format.
    /// Returns the number of annotations written.
    pub fn export_annotations(&self, path: &Path) -> ViewerResult<usize> {
        let export = AnnotationExport::from_store(&self.doc()?.annotations);
        export.write_to(path).map_err(ViewerError::save)?;
        Ok(export.annotation_count())
    }

    /// Adds every annotation from an exported file. Each one is recorded in
    /// the history like a user edit. Nothing is added if any entry targets a
    /// page outside the document.
    pub fn import_annotations(&mut self, path: &Path) -> ViewerResult<usize> {
        let page_count = self.doc()?.page_count();
        let export = AnnotationExport::read_from(path)
            .map_err(|err| ViewerError::AnnotationFormat(format!("{err:#}")))?;
        for page in export.pages.keys() {
            check_page(*page, page_count)?;
        }

        let annotations = export.into_annotations();
        if let Some((page_index, annotation)) = annotations
            .iter()
            .find(|(_, annotation)| !annotation.has_valid_geometry())
        {
            return Err(ViewerError::AnnotationFormat(format!(
                "{} on page {} has out-of-range geometry",
                annotation.kind_name(),
                page_index + 1
            )));
        }
        let count = annotations.len();
        for (page_index, annotation) in annotations {
            self.add_annotation(page_index, annotation)?;
        }
        Ok(count)
    }

    /// Recognises the text of every page and hands the result to
    /// `exporter`. Session state is never touched.
    #[instrument(skip(self, ocr, exporter))]
    pub fn export_text_via_ocr(
        &self,
        ocr: &dyn OcrEngine,
        exporter: &dyn TextExporter,
        output: &Path,
    ) -> ViewerResult<usize> {
        let doc = self.doc()?;
        let mut text = String::new();
        for page_index in 0..doc.page_count() {
            let request = RenderRequest {
                page_index,
                scale: self.config.ocr_scale,
                dark_mode: false,
            };
            let image = doc
                .backend
                .render_page(request)
                .map_err(|err| ViewerError::render(page_index, err))?;
            let page_text = ocr
                .recognize(&image)
                .with_context(|| format!("OCR failed on page {}", page_index + 1))
                .map_err(ViewerError::external)?;
            text.push_str(&page_text);
        }
        exporter
            .export_text(&text, output)
            .map_err(ViewerError::external)?;
        info!(pages = doc.page_count(), chars = text.len(), "OCR export finished");
        Ok(doc.page_count())
    }

    pub fn toggle_toc(&mut self) -> bool {
        self.panels.toc = !self.panels.toc;
        self.panels.toc
    }

    pub fn toggle_thumbnails(&mut self) -> bool {
        self.panels.thumbnails = !self.panels.thumbnails;
        self.panels.thumbnails
    }

    pub fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        if let Some(doc) = self.document.as_mut() {
            doc.navigation.invalidate_all();
            self.events
                .lock()
                .push(SessionEvent::RedrawNeeded(doc.info.id));
        }
        self.dark_mode
    }

    pub fn apply(&mut self, action: Action) -> ViewerResult<()> {
        match action {
            Action::NextPage { count } => {
                let doc = self.doc()?;
                let last = doc.page_count().saturating_sub(1);
                let next = doc.active_page.saturating_add(count).min(last);
                self.set_active_page(next)?;
            }
            Action::PrevPage { count } => {
                let next = self.doc()?.active_page.saturating_sub(count);
                self.set_active_page(next)?;
            }
            Action::GotoPage { page } => {
                let last = self.doc()?.page_count().saturating_sub(1);
                self.set_active_page(page.min(last))?;
            }
            Action::ZoomIn => {
                self.set_zoom(self.zoom + self.config.zoom_step);
            }
            Action::ZoomOut => {
                self.set_zoom(self.zoom - self.config.zoom_step);
            }
            Action::SetZoom { factor } => {
                self.set_zoom(factor);
            }
            Action::PutBookmark { name } => {
                self.add_bookmark(name)?;
            }
            Action::GotoBookmark { name } => {
                self.goto_bookmark(&name)?;
            }
            Action::ToggleToc => {
                self.toggle_toc();
            }
            Action::ToggleThumbnails => {
                self.toggle_thumbnails();
            }
            Action::ToggleDarkMode => {
                self.toggle_dark_mode();
            }
        }
        Ok(())
    }
}

fn discard_partials<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) {
    for partial in paths {
        match fs::remove_file(partial) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = ?partial, error = %err, "failed to remove partial split output"),
        }
    }
}
