//! Table of contents, bookmarks and thumbnail references, all keyed by page
//! index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{check_page, ViewerError, ViewerResult};
use crate::range::PageRange;
use crate::raster::RasterImage;

/// Outline node as reported by the document engine. `page` is the declared
/// 1-based page number; `None` for nodes without an in-document target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub title: String,
    pub page: Option<usize>,
    #[serde(default)]
    pub children: Vec<OutlineNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub level: usize,
    pub title: String,
    pub page_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub name: String,
    pub page_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailRef {
    pub page_index: usize,
    pub raster: Option<RasterImage>,
}

/// Flattens an outline depth-first. Level 1 is the outermost node.
pub fn build_from_outline(outline: &[OutlineNode], page_count: usize) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    flatten(outline, 1, page_count, &mut entries);
    entries
}

fn flatten(nodes: &[OutlineNode], level: usize, page_count: usize, out: &mut Vec<TocEntry>) {
    for node in nodes {
        match node.page.and_then(|page| page.checked_sub(1)) {
            Some(page_index) if page_index < page_count => out.push(TocEntry {
                level,
                title: node.title.clone(),
                page_index,
            }),
            _ => warn!(
                title = %node.title,
                page = ?node.page,
                "dropping outline entry without a valid page target"
            ),
        }
        flatten(&node.children, level + 1, page_count, out);
    }
}

#[derive(Debug, Default)]
pub struct NavigationIndex {
    page_count: usize,
    toc: Vec<TocEntry>,
    bookmarks: HashMap<String, usize>,
    thumbnails: Vec<ThumbnailRef>,
}

impl NavigationIndex {
    pub fn new(outline: &[OutlineNode], page_count: usize) -> Self {
        Self {
            page_count,
            toc: build_from_outline(outline, page_count),
            bookmarks: HashMap::new(),
            thumbnails: (0..page_count)
                .map(|page_index| ThumbnailRef {
                    page_index,
                    raster: None,
                })
                .collect(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn toc(&self) -> &[TocEntry] {
        &self.toc
    }

    /// Last write wins for an existing name.
    pub fn add_bookmark(&mut self, name: impl Into<String>, page_index: usize) -> ViewerResult<()> {
        check_page(page_index, self.page_count)?;
        self.bookmarks.insert(name.into(), page_index);
        Ok(())
    }

    pub fn resolve_bookmark(&self, name: &str) -> ViewerResult<usize> {
        self.bookmarks
            .get(name)
            .copied()
            .ok_or_else(|| ViewerError::BookmarkNotFound(name.to_owned()))
    }

    pub fn bookmarks(&self) -> Vec<Bookmark> {
        let mut list: Vec<_> = self
            .bookmarks
            .iter()
            .map(|(name, page)| Bookmark {
                name: name.clone(),
                page_index: *page,
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn thumbnails(&self) -> &[ThumbnailRef] {
        &self.thumbnails
    }

    pub fn thumbnail(&self, page_index: usize) -> Option<&ThumbnailRef> {
        self.thumbnails.get(page_index)
    }

    pub fn store_thumbnail(&mut self, page_index: usize, raster: RasterImage) -> ViewerResult<()> {
        check_page(page_index, self.page_count)?;
        if let Some(thumb) = self.thumbnails.get_mut(page_index) {
            thumb.raster = Some(raster);
        }
        Ok(())
    }

    pub fn invalidate_page(&mut self, page_index: usize) {
        if let Some(thumb) = self.thumbnails.get_mut(page_index) {
            thumb.raster = None;
        }
    }

    pub fn invalidate_all(&mut self) {
        for thumb in &mut self.thumbnails {
            thumb.raster = None;
        }
    }

    /// Renumbers after `range` has been removed from the document. Entries
    /// inside the range are dropped, later entries shift down by its length.
    pub fn remove_range(&mut self, range: PageRange) -> ViewerResult<()> {
        range.validate(self.page_count)?;
        let removed = range.len();
        let renumber = |page: usize| -> Option<usize> {
            if range.contains(page) {
                None
            } else if page > range.end {
                Some(page - removed)
            } else {
                Some(page)
            }
        };

        self.toc = std::mem::take(&mut self.toc)
            .into_iter()
            .filter_map(|entry| {
                renumber(entry.page_index).map(|page_index| TocEntry {
                    page_index,
                    ..entry
                })
            })
            .collect();
        self.bookmarks = std::mem::take(&mut self.bookmarks)
            .into_iter()
            .filter_map(|(name, page)| renumber(page).map(|page| (name, page)))
            .collect();
        self.thumbnails = std::mem::take(&mut self.thumbnails)
            .into_iter()
            .filter_map(|thumb| {
                renumber(thumb.page_index).map(|page_index| ThumbnailRef {
                    page_index,
                    raster: thumb.raster,
                })
            })
            .collect();
        self.page_count -= removed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(title: &str, page: Option<usize>, children: Vec<OutlineNode>) -> OutlineNode {
        OutlineNode {
            title: title.into(),
            page,
            children,
        }
    }

    fn sample_outline() -> Vec<OutlineNode> {
        vec![
            node(
                "Introduction",
                Some(1),
                vec![node("Motivation", Some(2), vec![])],
            ),
            node(
                "Figures",
                None,
                vec![node("Figure 1", Some(5), vec![])],
            ),
            node("Appendix", Some(10), vec![]),
        ]
    }

    #[test]
    fn outline_flattens_in_document_order_with_zero_based_pages() {
        let toc = build_from_outline(&sample_outline(), 10);
        let summary: Vec<_> = toc
            .iter()
            .map(|e| (e.level, e.title.as_str(), e.page_index))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "Introduction", 0),
                (2, "Motivation", 1),
                (2, "Figure 1", 4),
                (1, "Appendix", 9),
            ]
        );
    }

    #[test]
    fn outline_target_past_the_end_is_dropped() {
        let toc = build_from_outline(&sample_outline(), 9);
        assert!(toc.iter().all(|e| e.page_index < 9));
        assert_eq!(toc.len(), 3);
    }

    #[test]
    fn bookmark_overwrite_keeps_only_latest_page() {
        let mut index = NavigationIndex::new(&[], 10);
        index.add_bookmark("chapter", 2).unwrap();
        index.add_bookmark("chapter", 7).unwrap();
        assert_eq!(index.resolve_bookmark("chapter").unwrap(), 7);
        assert_eq!(index.bookmarks().len(), 1);
    }

    #[test]
    fn missing_bookmark_is_not_found() {
        let index = NavigationIndex::new(&[], 3);
        assert!(matches!(
            index.resolve_bookmark("nope"),
            Err(ViewerError::BookmarkNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn bookmark_outside_document_is_rejected() {
        let mut index = NavigationIndex::new(&[], 3);
        assert!(index.add_bookmark("late", 3).is_err());
        assert!(index.bookmarks().is_empty());
    }

    #[test]
    fn one_thumbnail_ref_per_page() {
        let mut index = NavigationIndex::new(&[], 4);
        assert_eq!(index.thumbnails().len(), 4);
        index
            .store_thumbnail(
                2,
                RasterImage {
                    width: 1,
                    height: 1,
                    pixels: vec![0; 4],
                },
            )
            .unwrap();
        assert!(index.thumbnail(2).unwrap().raster.is_some());
        index.invalidate_page(2);
        assert!(index.thumbnail(2).unwrap().raster.is_none());
    }

    #[test]
    fn remove_range_drops_inside_and_shifts_after() {
        let mut index = NavigationIndex::new(&sample_outline(), 10);
        index.add_bookmark("before", 0).unwrap();
        index.add_bookmark("inside", 3).unwrap();
        index.add_bookmark("after", 8).unwrap();

        index.remove_range(PageRange::new(2, 4)).unwrap();

        assert_eq!(index.page_count(), 7);
        assert_eq!(index.resolve_bookmark("before").unwrap(), 0);
        assert!(index.resolve_bookmark("inside").is_err());
        assert_eq!(index.resolve_bookmark("after").unwrap(), 5);

        let pages: Vec<_> = index.toc().iter().map(|e| e.page_index).collect();
        assert_eq!(pages, vec![0, 1, 6]);
        assert_eq!(index.thumbnails().len(), 7);
        assert!(index
            .thumbnails()
            .iter()
            .enumerate()
            .all(|(i, t)| t.page_index == i));
    }
}
