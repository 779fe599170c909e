//! Paints annotations onto a page raster and describes what was painted.

use crate::annotation::{Annotation, AnnotationId, StoredAnnotation};
use crate::geometry::{DeviceRect, Rect};
use crate::raster::{Color, RasterImage, NOTE_MARKER_SIZE, RECTANGLE_STROKE};

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    Highlight { rect: DeviceRect },
    Rectangle { rect: DeviceRect },
    /// Glyphs are left to the presentation layer; only an anchor marker is
    /// painted into the raster.
    TextNote { anchor: (i64, i64), text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayItem {
    SearchHighlight { rect: DeviceRect },
    Annotation { id: AnnotationId, shape: OverlayShape },
}

/// A page raster at the session zoom with every overlay already painted, in
/// paint order.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page_index: usize,
    pub zoom: f32,
    pub image: RasterImage,
    pub overlay: Vec<OverlayItem>,
}

pub(crate) fn compose(
    page_index: usize,
    zoom: f32,
    mut image: RasterImage,
    highlight: Option<Rect>,
    annotations: &[StoredAnnotation],
) -> RenderedPage {
    let mut overlay = Vec::with_capacity(annotations.len() + 1);

    if let Some(rect) = highlight {
        let rect = rect.to_device(zoom);
        image.fill_rect(rect, Color::HIGHLIGHT);
        overlay.push(OverlayItem::SearchHighlight { rect });
    }

    for entry in annotations {
        let shape = paint(&mut image, &entry.annotation, zoom);
        overlay.push(OverlayItem::Annotation {
            id: entry.id,
            shape,
        });
    }

    RenderedPage {
        page_index,
        zoom,
        image,
        overlay,
    }
}

fn paint(image: &mut RasterImage, annotation: &Annotation, zoom: f32) -> OverlayShape {
    match annotation {
        Annotation::Highlight { rect } => {
            let rect = rect.to_device(zoom);
            image.fill_rect(rect, Color::HIGHLIGHT);
            OverlayShape::Highlight { rect }
        }
        Annotation::Rectangle { rect } => {
            let rect = rect.to_device(zoom);
            image.stroke_rect(rect, Color::RECTANGLE, RECTANGLE_STROKE);
            OverlayShape::Rectangle { rect }
        }
        Annotation::TextNote { position, text } => {
            let anchor = position.to_device(zoom);
            image.fill_rect(
                DeviceRect {
                    x: anchor.0,
                    y: anchor.1,
                    width: NOTE_MARKER_SIZE,
                    height: NOTE_MARKER_SIZE,
                },
                Color::TEXT,
            );
            OverlayShape::TextNote {
                anchor,
                text: text.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use uuid::Uuid;

    fn blank(width: u32, height: u32) -> RasterImage {
        RasterImage::new(width, height, Color::new(255, 255, 255, 255))
    }

    #[test]
    fn geometry_is_scaled_at_paint_time() {
        let note = StoredAnnotation {
            id: Uuid::new_v4(),
            annotation: Annotation::Highlight {
                rect: Rect::new(2.0, 2.0, 4.0, 4.0),
            },
        };
        let page = compose(0, 2.0, blank(20, 20), None, &[note]);
        match &page.overlay[0] {
            OverlayItem::Annotation {
                shape: OverlayShape::Highlight { rect },
                ..
            } => assert_eq!(
                *rect,
                DeviceRect {
                    x: 4,
                    y: 4,
                    width: 8,
                    height: 8
                }
            ),
            other => panic!("unexpected overlay item {other:?}"),
        }
        assert_eq!(page.image.pixel(3, 3), Some([255, 255, 255, 255]));
        assert_eq!(page.image.pixel(4, 4), Some([255, 255, 155, 255]));
    }

    #[test]
    fn later_annotations_paint_over_earlier_ones() {
        let under = StoredAnnotation {
            id: Uuid::new_v4(),
            annotation: Annotation::Rectangle {
                rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            },
        };
        let over = StoredAnnotation {
            id: Uuid::new_v4(),
            annotation: Annotation::TextNote {
                position: Point::new(0.0, 0.0),
                text: "top".into(),
            },
        };
        let page = compose(
            0,
            1.0,
            blank(10, 10),
            Some(Rect::new(5.0, 5.0, 2.0, 2.0)),
            &[under.clone(), over.clone()],
        );

        assert!(matches!(page.overlay[0], OverlayItem::SearchHighlight { .. }));
        let ids: Vec<_> = page
            .overlay
            .iter()
            .filter_map(|item| match item {
                OverlayItem::Annotation { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![under.id, over.id]);
        // the note marker covers the rectangle's blue corner
        assert_eq!(page.image.pixel(0, 0), Some([0, 0, 0, 255]));
    }
}
