//! Modelos compartidos para reportar metadata normalizada de manera consistente.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::flatten::ExportNode;
use crate::formatting::format_timestamp;

/// Identificadores de sección reconocidos por el normalizador.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SectionId {
    Camera,
    Settings,
    Dates,
    Gps,
    Dimensions,
    Document,
    Properties,
    Application,
    Statistics,
    Format,
    Tags,
    AlbumArt,
}

impl SectionId {
    pub const ALL: [SectionId; 12] = [
        SectionId::Camera,
        SectionId::Settings,
        SectionId::Dates,
        SectionId::Gps,
        SectionId::Dimensions,
        SectionId::Document,
        SectionId::Properties,
        SectionId::Application,
        SectionId::Statistics,
        SectionId::Format,
        SectionId::Tags,
        SectionId::AlbumArt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionId::Camera => "camera",
            SectionId::Settings => "settings",
            SectionId::Dates => "dates",
            SectionId::Gps => "gps",
            SectionId::Dimensions => "dimensions",
            SectionId::Document => "document",
            SectionId::Properties => "properties",
            SectionId::Application => "application",
            SectionId::Statistics => "statistics",
            SectionId::Format => "format",
            SectionId::Tags => "tags",
            SectionId::AlbumArt => "albumArt",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SectionId::ALL
            .into_iter()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| format!("unknown section `{value}`"))
    }
}

/// Valor de un campo ya normalizado.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Indica si el valor debe descartarse antes de materializar la sección.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Float(value) => !value.is_finite(),
            FieldValue::List(items) => items.iter().all(FieldValue::is_empty),
            _ => false,
        }
    }

    /// Texto usado por la exportación CSV.
    pub fn to_csv_text(&self) -> String {
        match self {
            FieldValue::Date(date) => date.to_rfc3339_opts(SecondsFormat::Millis, true),
            FieldValue::List(items) => join_values(items, "; ", FieldValue::to_csv_text),
            other => other.to_plain_text(),
        }
    }

    /// Texto legible para reportes y consola.
    pub fn to_display_text(&self) -> String {
        match self {
            FieldValue::Date(date) => format_timestamp(*date),
            FieldValue::List(items) => join_values(items, ", ", FieldValue::to_display_text),
            other => other.to_plain_text(),
        }
    }

    fn to_plain_text(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Integer(value) => value.to_string(),
            FieldValue::Float(value) => value.to_string(),
            FieldValue::Bool(value) => value.to_string(),
            FieldValue::Date(date) => date.to_rfc3339(),
            FieldValue::List(items) => join_values(items, ", ", FieldValue::to_plain_text),
        }
    }
}

fn join_values(items: &[FieldValue], separator: &str, render: fn(&FieldValue) -> String) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(separator)
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(text) => serializer.serialize_str(text),
            FieldValue::Integer(value) => serializer.serialize_i64(*value),
            FieldValue::Float(value) => serializer.serialize_f64(*value),
            FieldValue::Bool(value) => serializer.serialize_bool(*value),
            FieldValue::Date(date) => date.serialize(serializer),
            FieldValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldValueVisitor;

        impl<'de> Visitor<'de> for FieldValueVisitor {
            type Value = FieldValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, number, boolean or list of primitives")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<FieldValue, E> {
                Ok(FieldValue::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<FieldValue, E> {
                Ok(FieldValue::Integer(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<FieldValue, E> {
                i64::try_from(value)
                    .map(FieldValue::Integer)
                    .or(Ok(FieldValue::Float(value as f64)))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<FieldValue, E> {
                Ok(FieldValue::Float(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<FieldValue, E> {
                Ok(FieldValue::Text(value.to_string()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<FieldValue, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element::<FieldValue>()? {
                    items.push(item);
                }
                Ok(FieldValue::List(items))
            }
        }

        deserializer.deserialize_any(FieldValueVisitor)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub id: SectionId,
    pub fields: Vec<Field>,
}

impl Section {
    pub fn new(id: SectionId) -> Self {
        Self {
            id,
            fields: Vec::new(),
        }
    }

    /// Agrega el campo solo si tiene un valor utilizable.
    pub fn push(&mut self, key: &str, value: Option<FieldValue>) -> &mut Self {
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            self.fields.push(Field::new(key, value));
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| &field.value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Descriptor básico del archivo, siempre disponible sin leer su contenido.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub size: String,
    pub size_bytes: u64,
    #[serde(rename = "type")]
    pub declared_type: String,
    pub last_modified: DateTime<Utc>,
}

/// Resultado terminal de una extracción.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Metadata(Vec<Section>),
    Note(String),
    Error(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedResult {
    pub file_info: FileInfo,
    pub outcome: Outcome,
}

impl NormalizedResult {
    pub fn with_sections(file_info: FileInfo, sections: Vec<Section>) -> Self {
        let sections: Vec<Section> = sections.into_iter().filter(|s| !s.is_empty()).collect();
        Self {
            file_info,
            outcome: Outcome::Metadata(sections),
        }
    }

    pub fn with_note(file_info: FileInfo, note: impl Into<String>) -> Self {
        Self {
            file_info,
            outcome: Outcome::Note(note.into()),
        }
    }

    pub fn with_error(file_info: FileInfo, error: impl Into<String>) -> Self {
        Self {
            file_info,
            outcome: Outcome::Error(error.into()),
        }
    }

    pub fn sections(&self) -> &[Section] {
        match &self.outcome {
            Outcome::Metadata(sections) => sections,
            _ => &[],
        }
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections().iter().find(|section| section.id == id)
    }

    /// Busca un campo con la ruta `seccion.clave`.
    pub fn field(&self, path: &str) -> Option<&FieldValue> {
        let (section, key) = path.split_once('.')?;
        let id = SectionId::from_str(section).ok()?;
        self.section(id)?.get(key)
    }

    pub fn note(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Note(note) => Some(note),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}

impl Serialize for NormalizedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ExportNode::from_result(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NormalizedResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ResultVisitor;

        impl<'de> Visitor<'de> for ResultVisitor {
            type Value = NormalizedResult;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a normalized metadata object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut file_info = None;
                let mut note = None;
                let mut error = None;
                let mut sections = Vec::new();

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "fileInfo" => file_info = Some(map.next_value::<FileInfo>()?),
                        "note" => note = Some(map.next_value::<String>()?),
                        "error" => error = Some(map.next_value::<String>()?),
                        other => {
                            let id = SectionId::from_str(other).map_err(de::Error::custom)?;
                            let mut fields = map.next_value::<SectionFields>()?.0;
                            if id == SectionId::Dates {
                                for field in &mut fields {
                                    revive_date(&mut field.value);
                                }
                            }
                            sections.push(Section { id, fields });
                        }
                    }
                }

                let file_info = file_info.ok_or_else(|| de::Error::missing_field("fileInfo"))?;
                let outcome = match (error, note) {
                    (Some(_), _) | (_, Some(_)) if !sections.is_empty() => {
                        return Err(de::Error::custom(
                            "sections cannot be combined with `note` or `error`",
                        ));
                    }
                    (Some(_), Some(_)) => {
                        return Err(de::Error::custom("`note` and `error` are exclusive"));
                    }
                    (Some(error), None) => Outcome::Error(error),
                    (None, Some(note)) => Outcome::Note(note),
                    (None, None) => Outcome::Metadata(sections),
                };

                Ok(NormalizedResult { file_info, outcome })
            }
        }

        deserializer.deserialize_map(ResultVisitor)
    }
}

/// En la sección de fechas todo texto RFC 3339 fue una fecha al exportarse.
fn revive_date(value: &mut FieldValue) {
    if let FieldValue::Text(text) = value {
        if let Ok(date) = DateTime::parse_from_rfc3339(text) {
            *value = FieldValue::Date(date.with_timezone(&Utc));
        }
    }
}

/// Campos de una sección en el orden en que aparecen.
struct SectionFields(Vec<Field>);

impl<'de> Deserialize<'de> for SectionFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = SectionFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of section fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut fields = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, FieldValue>()? {
                    fields.push(Field { key, value });
                }
                Ok(SectionFields(fields))
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}
