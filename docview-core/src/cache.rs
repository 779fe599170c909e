use std::collections::HashMap;

use tracing::debug;

use crate::raster::RasterImage;

/// Base page rasters (before annotation painting) keyed by page, zoom and
/// colour mode. When full, the entries furthest from the page being viewed
/// are evicted first.
#[derive(Debug)]
pub(crate) struct RenderCache {
    entries: HashMap<CacheKey, RasterImage>,
    capacity: usize,
}

impl RenderCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn get(&self, key: &CacheKey) -> Option<RasterImage> {
        let hit = self.entries.get(key).cloned();
        if hit.is_some() {
            debug!(page = key.page_index, "render cache hit");
        }
        hit
    }

    pub(crate) fn insert(&mut self, key: CacheKey, image: RasterImage, reference_page: usize) {
        self.entries.insert(key, image);

        if self.entries.len() > self.capacity {
            let mut keys: Vec<_> = self.entries.keys().copied().collect();
            keys.sort_by_key(|k| k.distance(reference_page));
            for stale in keys.into_iter().skip(self.capacity) {
                self.entries.remove(&stale);
            }
        }
    }

    pub(crate) fn invalidate_page(&mut self, page_index: usize) {
        self.entries.retain(|key, _| key.page_index != page_index);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub(crate) struct CacheKey {
    page_index: usize,
    scale_milli: u32,
    dark_mode: bool,
}

impl CacheKey {
    pub(crate) fn new(page_index: usize, scale: f32, dark_mode: bool) -> Self {
        Self {
            page_index,
            scale_milli: quantize_scale(scale),
            dark_mode,
        }
    }

    fn distance(&self, reference_page: usize) -> usize {
        self.page_index.abs_diff(reference_page)
    }
}

fn quantize_scale(scale: f32) -> u32 {
    let scaled = (scale * 1000.0).round();
    if !scaled.is_finite() || scaled <= 0.0 {
        1
    } else if scaled > u32::MAX as f32 {
        u32::MAX
    } else {
        scaled as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(tag: u8) -> RasterImage {
        RasterImage {
            width: 1,
            height: 1,
            pixels: vec![tag, 0, 0, 255],
        }
    }

    #[test]
    fn nearly_equal_scales_share_an_entry() {
        let mut cache = RenderCache::new(4);
        cache.insert(CacheKey::new(0, 1.0, false), image(1), 0);
        assert!(cache.get(&CacheKey::new(0, 1.0001, false)).is_some());
        assert!(cache.get(&CacheKey::new(0, 1.0, true)).is_none());
    }

    #[test]
    fn eviction_keeps_pages_nearest_the_reference() {
        let mut cache = RenderCache::new(2);
        cache.insert(CacheKey::new(0, 1.0, false), image(0), 5);
        cache.insert(CacheKey::new(5, 1.0, false), image(5), 5);
        cache.insert(CacheKey::new(6, 1.0, false), image(6), 5);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&CacheKey::new(0, 1.0, false)).is_none());
        assert!(cache.get(&CacheKey::new(6, 1.0, false)).is_some());
    }

    #[test]
    fn invalidate_page_drops_every_scale() {
        let mut cache = RenderCache::new(8);
        cache.insert(CacheKey::new(2, 1.0, false), image(1), 2);
        cache.insert(CacheKey::new(2, 2.0, true), image(2), 2);
        cache.insert(CacheKey::new(3, 1.0, false), image(3), 2);
        cache.invalidate_page(2);
        assert_eq!(cache.len(), 1);
    }
}
