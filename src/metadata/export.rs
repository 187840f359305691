//! Exportación de resultados normalizados en distintos formatos.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::batch::BatchEntry;
use super::flatten::{ExportNode, Visit};
use super::report::NormalizedResult;
use crate::error::ExportError;

pub const BATCH_BASE_NAME: &str = "batch";
const RULE_WIDTH: usize = 50;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Csv,
    Txt,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Txt => "text/plain",
        }
    }
}

pub fn parse_export_format(input: &str) -> Result<ExportFormat, String> {
    match input.trim().to_lowercase().as_str() {
        "json" => Ok(ExportFormat::Json),
        "csv" => Ok(ExportFormat::Csv),
        "txt" | "text" => Ok(ExportFormat::Txt),
        other => Err(format!("unknown export format `{other}` (expected json, csv or txt)")),
    }
}

/// Archivo listo para guardarse o descargarse.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: String,
}

impl ExportArtifact {
    fn new(base: &str, format: ExportFormat, contents: String) -> Self {
        Self {
            file_name: format!("{base}_metadata.{}", format.extension()),
            mime_type: format.mime_type(),
            contents,
        }
    }

    /// Guarda el artefacto dentro de `dir` y devuelve la ruta escrita.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.contents)?;
        info!(path = %path.display(), "exportación guardada");
        Ok(path)
    }
}

/// Nombre sin su última extensión (`photo.final.jpg` → `photo.final`).
pub fn base_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(index) if index > 0 && index + 1 < file_name.len() => {
            let extension = &file_name[index + 1..];
            if extension.contains(['/', '\\']) {
                file_name
            } else {
                &file_name[..index]
            }
        }
        _ => file_name,
    }
}

/// Convierte una clave camelCase en un título legible (`sizeBytes` → `Size Bytes`).
pub fn format_key(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c);
    }
    let mut chars = spaced.chars();
    let titled: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    titled.trim().to_string()
}

pub fn export_result(
    result: &NormalizedResult,
    file_name: &str,
    format: ExportFormat,
) -> Result<ExportArtifact, ExportError> {
    let base = base_name(file_name);
    render(&ExportNode::from_result(result), base, format)
}

pub fn export_to_json(result: &NormalizedResult, file_name: &str) -> Result<ExportArtifact, ExportError> {
    export_result(result, file_name, ExportFormat::Json)
}

pub fn export_to_csv(result: &NormalizedResult, file_name: &str) -> Result<ExportArtifact, ExportError> {
    export_result(result, file_name, ExportFormat::Csv)
}

pub fn export_to_txt(result: &NormalizedResult, file_name: &str) -> Result<ExportArtifact, ExportError> {
    export_result(result, file_name, ExportFormat::Txt)
}

/// Exporta todas las entradas de un lote en un único artefacto `batch_metadata.*`.
pub fn export_batch(
    entries: &[BatchEntry],
    format: ExportFormat,
) -> Result<ExportArtifact, ExportError> {
    render(&batch_node(entries), BATCH_BASE_NAME, format)
}

fn batch_node(entries: &[BatchEntry]) -> ExportNode {
    ExportNode::Seq(
        entries
            .iter()
            .map(|entry| {
                ExportNode::Map(vec![
                    (
                        "fileName".to_string(),
                        ExportNode::Leaf(entry.file_name.as_str().into()),
                    ),
                    (
                        "fileType".to_string(),
                        ExportNode::Leaf(entry.declared_type.as_str().into()),
                    ),
                    ("metadata".to_string(), ExportNode::from_result(&entry.result)),
                ])
            })
            .collect(),
    )
}

fn render(node: &ExportNode, base: &str, format: ExportFormat) -> Result<ExportArtifact, ExportError> {
    let contents = match format {
        ExportFormat::Json => serde_json::to_string_pretty(node)?,
        ExportFormat::Csv => render_csv(node)?,
        ExportFormat::Txt => render_txt(node, base),
    };
    Ok(ExportArtifact::new(base, format, contents))
}

fn render_csv(node: &ExportNode) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(["Property", "Value"])?;
    for entry in node.flatten() {
        writer.write_record([entry.path.as_str(), entry.value.to_csv_text().as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|error| ExportError::Io(error.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn render_txt(node: &ExportNode, base: &str) -> String {
    let mut lines = vec![
        format!("Metadata Report: {base}"),
        "=".repeat(RULE_WIDTH),
        String::new(),
    ];
    node.walk(&mut |visit: Visit<'_>| match visit {
        Visit::Enter { key, depth } => {
            lines.push(format!("{}[{}]", "  ".repeat(depth), format_key(key)));
        }
        Visit::Leaf {
            key, value, depth, ..
        } => {
            lines.push(format!(
                "{}{}: {}",
                "  ".repeat(depth),
                format_key(key),
                value.to_display_text()
            ));
        }
        Visit::Exit { .. } => lines.push(String::new()),
    });
    lines.join("\n")
}
