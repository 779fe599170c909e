//! Per-page annotation storage.
//!
//! Insertion order is z-order: later entries paint on top of earlier ones.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::{check_page, ViewerError, ViewerResult};
use crate::geometry::{Point, Rect};

pub type AnnotationId = Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Highlight { rect: Rect },
    Rectangle { rect: Rect },
    TextNote { position: Point, text: String },
}

impl Annotation {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Annotation::Highlight { .. } => "highlight",
            Annotation::Rectangle { .. } => "rectangle",
            Annotation::TextNote { .. } => "text_note",
        }
    }

    /// Finite coordinates within `MAX_COORDINATE` of the origin and no
    /// negative extents.
    pub fn has_valid_geometry(&self) -> bool {
        let bounded = |value: f32| value.is_finite() && value.abs() <= MAX_COORDINATE;
        match self {
            Annotation::Highlight { rect } | Annotation::Rectangle { rect } => {
                [rect.x, rect.y, rect.width, rect.height]
                    .into_iter()
                    .all(bounded)
                    && rect.width >= 0.0
                    && rect.height >= 0.0
            }
            Annotation::TextNote { position, .. } => bounded(position.x) && bounded(position.y),
        }
    }
}

/// Largest coordinate magnitude, in points, accepted from annotation files.
pub const MAX_COORDINATE: f32 = 1.0e6;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredAnnotation {
    pub id: AnnotationId,
    pub annotation: Annotation,
}

#[derive(Debug, Default)]
pub struct AnnotationStore {
    page_count: usize,
    pages: BTreeMap<usize, Vec<StoredAnnotation>>,
}

impl AnnotationStore {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            pages: BTreeMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn add(&mut self, page_index: usize, annotation: Annotation) -> ViewerResult<AnnotationId> {
        check_page(page_index, self.page_count)?;
        let id = Uuid::new_v4();
        self.pages
            .entry(page_index)
            .or_default()
            .push(StoredAnnotation { id, annotation });
        Ok(id)
    }

    /// Places an annotation at an exact z-order slot. Used when replaying
    /// history so the restored store matches the original entry for entry.
    pub fn insert_at(
        &mut self,
        page_index: usize,
        position: usize,
        id: AnnotationId,
        annotation: Annotation,
    ) -> ViewerResult<()> {
        check_page(page_index, self.page_count)?;
        let entries = self.pages.entry(page_index).or_default();
        let position = position.min(entries.len());
        entries.insert(position, StoredAnnotation { id, annotation });
        Ok(())
    }

    /// Removes an annotation, returning its former z-order slot and value.
    pub fn remove(
        &mut self,
        page_index: usize,
        id: AnnotationId,
    ) -> ViewerResult<(usize, Annotation)> {
        check_page(page_index, self.page_count)?;
        let not_found = || ViewerError::AnnotationNotFound {
            page: page_index,
            id,
        };
        let entries = self.pages.get_mut(&page_index).ok_or_else(not_found)?;
        let position = entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(not_found)?;
        let removed = entries.remove(position);
        if entries.is_empty() {
            self.pages.remove(&page_index);
        }
        Ok((position, removed.annotation))
    }

    pub fn for_page(&self, page_index: usize) -> &[StoredAnnotation] {
        self.pages
            .get(&page_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Non-empty pages in ascending page order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[StoredAnnotation])> {
        self.pages
            .iter()
            .map(|(page, entries)| (*page, entries.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}
