//! Lectura de metadata en documentos Office empaquetados en ZIP.

use std::io::{Cursor, Read};
use tracing::{debug, warn};
use xmltree::{Element, XMLNode};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::Result;

const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const CP_NS: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
const APP_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";

const CORE_PART: &str = "docProps/core.xml";
const APP_PART: &str = "docProps/app.xml";

/// Propiedades de `core.xml` y `app.xml` como texto sin interpretar.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OfficeTags {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub last_modified_by: Option<String>,
    pub revision: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub application: Option<String>,
    pub app_version: Option<String>,
    pub company: Option<String>,
    pub manager: Option<String>,
    pub template: Option<String>,
    pub pages: Option<String>,
    pub words: Option<String>,
    pub characters: Option<String>,
    pub characters_with_spaces: Option<String>,
    pub lines: Option<String>,
    pub paragraphs: Option<String>,
    pub slides: Option<String>,
    pub notes: Option<String>,
    pub hidden_slides: Option<String>,
}

pub fn extract_office_metadata(bytes: &[u8]) -> Result<OfficeTags> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut tags = OfficeTags::default();

    if let Some(root) = read_part(&mut archive, CORE_PART)? {
        let field = |local_name, namespace| find_child_text(&root, local_name, namespace);
        tags.title = field("title", DC_NS);
        tags.subject = field("subject", DC_NS);
        tags.creator = field("creator", DC_NS);
        tags.description = field("description", DC_NS);
        tags.keywords = field("keywords", CP_NS);
        tags.category = field("category", CP_NS);
        tags.last_modified_by = field("lastModifiedBy", CP_NS);
        tags.revision = field("revision", CP_NS);
        tags.created = field("created", DCTERMS_NS);
        tags.modified = field("modified", DCTERMS_NS);
    }

    if let Some(root) = read_part(&mut archive, APP_PART)? {
        let field = |local_name| find_child_text(&root, local_name, APP_NS);
        tags.application = field("Application");
        tags.app_version = field("AppVersion");
        tags.company = field("Company");
        tags.manager = field("Manager");
        tags.template = field("Template");
        tags.pages = field("Pages");
        tags.words = field("Words");
        tags.characters = field("Characters");
        tags.characters_with_spaces = field("CharactersWithSpaces");
        tags.lines = field("Lines");
        tags.paragraphs = field("Paragraphs");
        tags.slides = field("Slides");
        tags.notes = field("Notes");
        tags.hidden_slides = field("HiddenSlides");
    }

    Ok(tags)
}

/// Lee y analiza una parte XML del paquete. Una parte ausente o con XML inválido se omite.
fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<Element>> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => {
            debug!(part = name, "parte ausente en el paquete");
            return Ok(None);
        }
        Err(error) => return Err(error.into()),
    };

    // La codificación la detecta el parser XML (BOM o declaración).
    let mut contents = Vec::new();
    part.read_to_end(&mut contents).map_err(ZipError::from)?;

    match Element::parse(contents.as_slice()) {
        Ok(root) => Ok(Some(root)),
        Err(error) => {
            warn!(part = name, %error, "XML inválido, se ignora la parte");
            Ok(None)
        }
    }
}

fn find_child_text(root: &Element, local_name: &str, namespace: &str) -> Option<String> {
    root.children.iter().find_map(|node| match node {
        XMLNode::Element(child)
            if child.name == local_name && namespace_matches(child, namespace) =>
        {
            Some(element_text_content(child)).filter(|text| !text.is_empty())
        }
        _ => None,
    })
}

/// Un elemento sin espacio de nombres se acepta por su nombre local.
fn namespace_matches(element: &Element, namespace: &str) -> bool {
    match element.namespace.as_deref() {
        Some(actual) => actual == namespace,
        None => true,
    }
}

fn element_text_content(element: &Element) -> String {
    let mut content = String::new();
    for node in &element.children {
        match node {
            XMLNode::Text(text) | XMLNode::CData(text) => content.push_str(text),
            _ => {}
        }
    }
    content.trim().to_string()
}
