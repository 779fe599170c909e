//! Document info dictionary editing on serialised PDF bytes.

use anyhow::{Context, Result};
use docview_core::DocumentMetadata;
use lopdf::{dictionary, Document, Object, StringFormat};

/// Rewrites the trailer `Info` dictionary of `bytes` so it carries
/// `metadata`. Fields set to `None` are removed.
pub(crate) fn apply_metadata(bytes: &[u8], metadata: &DocumentMetadata) -> Result<Vec<u8>> {
    let mut document = Document::load_mem(bytes).context("failed to parse serialised document")?;
    let info_id = match document.trailer.get(b"Info").and_then(Object::as_reference) {
        Ok(id) => id,
        Err(_) => {
            let id = document.add_object(dictionary! {});
            document.trailer.set("Info", id);
            id
        }
    };

    let info = document
        .get_object_mut(info_id)
        .and_then(Object::as_dict_mut)
        .context("document info is not a dictionary")?;
    let fields = [
        ("Title", &metadata.title),
        ("Author", &metadata.author),
        ("Subject", &metadata.subject),
        ("Keywords", &metadata.keywords),
    ];
    for (key, value) in fields {
        match value {
            Some(value) => info.set(key, text_string(value)),
            None => {
                info.remove(key.as_bytes());
            }
        }
    }

    let mut out = Vec::with_capacity(bytes.len());
    document
        .save_to(&mut out)
        .context("failed to write document info")?;
    Ok(out)
}

/// PDF text string: ASCII as is, anything else UTF-16BE behind a byte order mark.
fn text_string(value: &str) -> Object {
    let bytes = if value.is_ascii() {
        value.as_bytes().to_vec()
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend(value.encode_utf16().flat_map(u16::to_be_bytes));
        bytes
    };
    Object::String(bytes, StringFormat::Literal)
}
