//! JSON interchange format for annotations.
//!
//! ```json
//! {
//!     "0": [
//!         { "type": "highlight", "x": 10.0, "y": 20.0, "width": 30.0, "height": 5.0 },
//!         { "type": "text_note", "pos": { "x": 4.0, "y": 8.0 }, "text": "check" }
//!     ]
//! }
//! ```
//!
//! Keys are 0-based page indices rendered as strings; geometry is in page
//! space at zoom 1.0.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_with::{serde_as, DisplayFromStr};

use crate::annotation::{Annotation, AnnotationStore};
use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportedAnnotation {
    Highlight {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    TextNote {
        pos: Point,
        text: String,
    },
}

impl From<&Annotation> for ExportedAnnotation {
    fn from(annotation: &Annotation) -> Self {
        match annotation {
            Annotation::Highlight { rect } => ExportedAnnotation::Highlight {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            },
            Annotation::Rectangle { rect } => ExportedAnnotation::Rectangle {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            },
            Annotation::TextNote { position, text } => ExportedAnnotation::TextNote {
                pos: *position,
                text: text.clone(),
            },
        }
    }
}

impl From<ExportedAnnotation> for Annotation {
    fn from(exported: ExportedAnnotation) -> Self {
        match exported {
            ExportedAnnotation::Highlight {
                x,
                y,
                width,
                height,
            } => Annotation::Highlight {
                rect: Rect::new(x, y, width, height),
            },
            ExportedAnnotation::Rectangle {
                x,
                y,
                width,
                height,
            } => Annotation::Rectangle {
                rect: Rect::new(x, y, width, height),
            },
            ExportedAnnotation::TextNote { pos, text } => Annotation::TextNote {
                position: pos,
                text,
            },
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationExport {
    #[serde_as(as = "BTreeMap<DisplayFromStr, _>")]
    pub pages: BTreeMap<usize, Vec<ExportedAnnotation>>,
}

impl AnnotationExport {
    pub fn from_store(store: &AnnotationStore) -> Self {
        let pages = store
            .iter()
            .map(|(page, entries)| {
                let exported = entries
                    .iter()
                    .map(|entry| ExportedAnnotation::from(&entry.annotation))
                    .collect();
                (page, exported)
            })
            .collect();
        Self { pages }
    }

    pub fn annotation_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Annotations in page order, each page in its stored z-order.
    pub fn into_annotations(self) -> Vec<(usize, Annotation)> {
        self.pages
            .into_iter()
            .flat_map(|(page, entries)| {
                entries
                    .into_iter()
                    .map(move |entry| (page, Annotation::from(entry)))
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8(buf)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Writes through a temporary sibling file and renames it into place.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let payload = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        let mut file = File::create(&tmp)
            .with_context(|| format!("failed to open temp annotation file {:?}", tmp))?;
        file.write_all(payload.as_bytes())?;
        file.flush()?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to move annotations into {:?}", path))?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read annotation file {:?}", path))?;
        Self::from_json(&raw).with_context(|| format!("failed to decode annotation file {:?}", path))
    }
}
