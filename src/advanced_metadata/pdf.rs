//! Extracción de metadata en PDFs mediante lectura del diccionario Info.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::Result;

/// Límite de saltos al heredar atributos de página a través de `Parent`.
const MAX_PAGE_TREE_DEPTH: usize = 32;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PdfTags {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub version: Option<String>,
    pub page_count: u32,
    /// Ancho y alto de la primera página, en puntos.
    pub page_size: Option<(f64, f64)>,
    pub encrypted: bool,
}

pub fn extract_pdf_metadata(bytes: &[u8]) -> Result<PdfTags> {
    let doc = Document::load_mem(bytes)?;

    let encrypted = doc.trailer.get(b"Encrypt").is_ok();
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| deref_dictionary(&doc, info));
    if info.is_none() {
        debug!("PDF sin diccionario Info");
    }
    let text = |key: &[u8]| {
        info.and_then(|dict| dict.get(key).ok())
            .and_then(|obj| object_to_string(&doc, obj))
    };

    let pages = doc.get_pages();
    let page_size = pages
        .values()
        .next()
        .and_then(|page_id| page_media_box(&doc, *page_id));

    Ok(PdfTags {
        title: text(b"Title"),
        author: text(b"Author"),
        subject: text(b"Subject"),
        keywords: text(b"Keywords"),
        creator: text(b"Creator"),
        producer: text(b"Producer"),
        creation_date: text(b"CreationDate"),
        modification_date: text(b"ModDate"),
        version: Some(doc.version.clone()).filter(|version| !version.is_empty()),
        page_count: pages.len() as u32,
        page_size,
        encrypted,
    })
}

fn deref_dictionary<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(reference) => doc.get_dictionary(*reference).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn deref_object<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(reference) => doc.get_object(*reference).ok(),
        other => Some(other),
    }
}

fn object_to_string(doc: &Document, obj: &Object) -> Option<String> {
    let value = match deref_object(doc, obj)? {
        Object::String(bytes, _) => decode_text_string(bytes),
        Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
        _ => return None,
    };
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Cadenas de texto PDF: UTF-16BE con BOM, o bytes de un solo octeto.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&byte| char::from(byte)).collect(),
    }
}

/// MediaBox de la página, heredado del árbol de páginas cuando falta.
fn page_media_box(doc: &Document, page_id: ObjectId) -> Option<(f64, f64)> {
    let mut current = page_id;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(media_box) = dict.get(b"MediaBox") {
            return media_box_size(doc, media_box);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn media_box_size(doc: &Document, obj: &Object) -> Option<(f64, f64)> {
    let Object::Array(items) = deref_object(doc, obj)? else {
        return None;
    };
    let coords: Vec<f64> = items
        .iter()
        .filter_map(|item| match deref_object(doc, item)? {
            Object::Integer(value) => Some(*value as f64),
            Object::Real(value) => Some(f64::from(*value)),
            _ => None,
        })
        .collect();
    let [x1, y1, x2, y2] = coords.as_slice() else {
        return None;
    };
    let width = (x2 - x1).abs();
    let height = (y2 - y1).abs();
    (width > 0.0 && height > 0.0).then_some((width, height))
}
