//! Árbol común de exportación y recorrido que lo aplana en hojas.
//!
//! JSON, CSV, TXT y la vista de consola se generan desde el mismo árbol, por lo que
//! ninguna salida puede mostrar campos distintos a las demás.

use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;

use super::report::{FieldValue, FileInfo, NormalizedResult, Outcome};

#[derive(Clone, Debug, PartialEq)]
pub enum ExportNode {
    Leaf(FieldValue),
    Map(Vec<(String, ExportNode)>),
    Seq(Vec<ExportNode>),
}

/// Evento emitido al recorrer el árbol.
#[derive(Debug)]
pub enum Visit<'v> {
    Enter {
        key: &'v str,
        depth: usize,
    },
    Leaf {
        path: &'v [String],
        key: &'v str,
        value: &'v FieldValue,
        depth: usize,
    },
    Exit {
        key: &'v str,
        depth: usize,
    },
}

/// Hoja aplanada con su ruta separada por puntos.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatEntry {
    pub path: String,
    pub value: FieldValue,
}

impl ExportNode {
    pub fn from_result(result: &NormalizedResult) -> Self {
        let mut entries = vec![("fileInfo".to_string(), file_info_node(&result.file_info))];
        match &result.outcome {
            Outcome::Metadata(sections) => {
                for section in sections {
                    let fields = section
                        .fields
                        .iter()
                        .map(|field| (field.key.clone(), ExportNode::Leaf(field.value.clone())))
                        .collect();
                    entries.push((section.id.as_str().to_string(), ExportNode::Map(fields)));
                }
            }
            Outcome::Note(note) => {
                entries.push(("note".to_string(), ExportNode::Leaf(note.as_str().into())));
            }
            Outcome::Error(error) => {
                entries.push(("error".to_string(), ExportNode::Leaf(error.as_str().into())));
            }
        }
        ExportNode::Map(entries)
    }

    /// Recorre el árbol en orden, emitiendo ramas y hojas.
    pub fn walk(&self, visitor: &mut dyn FnMut(Visit<'_>)) {
        let mut path = Vec::new();
        walk_node(self, &mut path, 0, visitor);
    }

    /// Devuelve solo las hojas, en orden, con su ruta completa.
    pub fn flatten(&self) -> Vec<FlatEntry> {
        let mut entries = Vec::new();
        self.walk(&mut |visit: Visit<'_>| {
            if let Visit::Leaf { path, value, .. } = visit {
                entries.push(FlatEntry {
                    path: path.join("."),
                    value: value.clone(),
                });
            }
        });
        entries
    }
}

fn walk_node(
    node: &ExportNode,
    path: &mut Vec<String>,
    depth: usize,
    visitor: &mut dyn FnMut(Visit<'_>),
) {
    match node {
        ExportNode::Leaf(_) => {}
        ExportNode::Map(entries) => {
            for (key, child) in entries {
                visit_child(key, child, path, depth, visitor);
            }
        }
        ExportNode::Seq(items) => {
            for (index, child) in items.iter().enumerate() {
                visit_child(&index.to_string(), child, path, depth, visitor);
            }
        }
    }
}

fn visit_child(
    key: &str,
    child: &ExportNode,
    path: &mut Vec<String>,
    depth: usize,
    visitor: &mut dyn FnMut(Visit<'_>),
) {
    path.push(key.to_string());
    match child {
        ExportNode::Leaf(value) => visitor(Visit::Leaf {
            path: path.as_slice(),
            key,
            value,
            depth,
        }),
        _ => {
            visitor(Visit::Enter { key, depth });
            walk_node(child, path, depth + 1, visitor);
            visitor(Visit::Exit { key, depth });
        }
    }
    path.pop();
}

fn file_info_node(info: &FileInfo) -> ExportNode {
    ExportNode::Map(vec![
        ("name".to_string(), ExportNode::Leaf(info.name.as_str().into())),
        ("size".to_string(), ExportNode::Leaf(info.size.as_str().into())),
        (
            "sizeBytes".to_string(),
            ExportNode::Leaf(FieldValue::Integer(
                i64::try_from(info.size_bytes).unwrap_or(i64::MAX),
            )),
        ),
        (
            "type".to_string(),
            ExportNode::Leaf(info.declared_type.as_str().into()),
        ),
        (
            "lastModified".to_string(),
            ExportNode::Leaf(FieldValue::Date(info.last_modified)),
        ),
    ])
}

impl Serialize for ExportNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExportNode::Leaf(value) => value.serialize(serializer),
            ExportNode::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            ExportNode::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}
