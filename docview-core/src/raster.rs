use crate::geometry::DeviceRect;

/// RGBA8 bitmap, row-major, no padding between rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const HIGHLIGHT: Color = Color::new(255, 255, 0, 100);
    pub const RECTANGLE: Color = Color::new(0, 0, 255, 255);
    pub const TEXT: Color = Color::new(0, 0, 0, 255);
}

pub const RECTANGLE_STROKE: u32 = 3;
pub const NOTE_MARKER_SIZE: u32 = 4;

impl RasterImage {
    pub fn new(width: u32, height: u32, fill: Color) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&[fill.r, fill.g, fill.b, fill.a]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = self.offset(x, y);
        self.pixels
            .get(offset..offset + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    pub fn fill_rect(&mut self, rect: DeviceRect, color: Color) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color);
            }
        }
    }

    /// Draws an outline of `thickness` pixels inside `rect`.
    pub fn stroke_rect(&mut self, rect: DeviceRect, color: Color, thickness: u32) {
        let t = thickness.min(rect.width).min(rect.height);
        if t == 0 {
            return;
        }
        let top = DeviceRect { height: t, ..rect };
        let bottom = DeviceRect {
            y: rect.y.saturating_add(i64::from(rect.height - t)),
            height: t,
            ..rect
        };
        let inner_height = rect.height - 2 * t.min(rect.height / 2);
        let left = DeviceRect {
            y: rect.y.saturating_add(i64::from(t)),
            width: t,
            height: inner_height,
            ..rect
        };
        let right = DeviceRect {
            x: rect.x.saturating_add(i64::from(rect.width - t)),
            ..left
        };
        for edge in [top, bottom, left, right] {
            self.fill_rect(edge, color);
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn clip(&self, rect: DeviceRect) -> Option<(u32, u32, u32, u32)> {
        let x0 = rect.x.clamp(0, i64::from(self.width));
        let y0 = rect.y.clamp(0, i64::from(self.height));
        let x1 = (rect.x.saturating_add(i64::from(rect.width))).clamp(0, i64::from(self.width));
        let y1 = (rect.y.saturating_add(i64::from(rect.height))).clamp(0, i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            None
        } else {
            Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
        }
    }

    fn blend(&mut self, x: u32, y: u32, color: Color) {
        let offset = self.offset(x, y);
        let Some(dst) = self.pixels.get_mut(offset..offset + 4) else {
            return;
        };
        let alpha = u32::from(color.a);
        let inv = 255 - alpha;
        dst[0] = ((u32::from(color.r) * alpha + u32::from(dst[0]) * inv) / 255) as u8;
        dst[1] = ((u32::from(color.g) * alpha + u32::from(dst[1]) * inv) / 255) as u8;
        dst[2] = ((u32::from(color.b) * alpha + u32::from(dst[2]) * inv) / 255) as u8;
        dst[3] = dst[3].max(color.a);
    }
}
