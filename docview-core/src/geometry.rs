//! Page-local coordinate model.
//!
//! Everything stored by the core lives in page space at zoom 1.0: points with
//! the origin at the top-left corner of the page, x growing right and y
//! growing down. Device pixels only exist transiently while painting a raster
//! at the session zoom.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Converts a position captured on a raster rendered at `zoom` back into
    /// page space.
    pub fn from_device(x: f32, y: f32, zoom: f32) -> Self {
        let zoom = effective_zoom(zoom);
        Self {
            x: x / zoom,
            y: y / zoom,
        }
    }

    pub fn to_device(self, zoom: f32) -> (i64, i64) {
        (
            (self.x * zoom).round() as i64,
            (self.y * zoom).round() as i64,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rectangle from two opposite corners in any order, so a drag
    /// towards the top-left yields the same rectangle as one towards the
    /// bottom-right.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Self {
            x: left,
            y: top,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Normalises a pointer drag captured in device pixels at `zoom`.
    pub fn from_device(start: (f32, f32), end: (f32, f32), zoom: f32) -> Self {
        Self::from_corners(
            Point::from_device(start.0, start.1, zoom),
            Point::from_device(end.0, end.1, zoom),
        )
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn to_device(&self, zoom: f32) -> DeviceRect {
        let left = (self.x * zoom).round() as i64;
        let top = (self.y * zoom).round() as i64;
        let right = (self.right() * zoom).round() as i64;
        let bottom = (self.bottom() * zoom).round() as i64;
        DeviceRect {
            x: left,
            y: top,
            width: pixel_extent(left, right),
            height: pixel_extent(top, bottom),
        }
    }
}

/// Integer pixel rectangle on a rendered raster. May extend past the raster
/// bounds; painting clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

fn pixel_extent(start: i64, end: i64) -> u32 {
    end.saturating_sub(start).clamp(0, i64::from(u32::MAX)) as u32
}

fn effective_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() && zoom > 0.0 {
        zoom
    } else {
        1.0
    }
}
