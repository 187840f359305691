//! Vista en consola de un resultado normalizado o de un lote.

use console::style;

use super::batch::{BatchEntry, BatchProgress};
use super::export::format_key;
use super::flatten::{ExportNode, Visit};
use super::output::{Tone, format_heading, format_property};
use super::report::{NormalizedResult, Outcome};

pub const NO_METADATA_MESSAGE: &str = "No metadata found in this file";

/// Genera las líneas de la vista de un resultado.
pub fn render_result(result: &NormalizedResult) -> String {
    let mut lines = vec![format!(
        "\n{}",
        style(format!("📄 {}", result.file_info.name)).cyan().bold()
    )];

    ExportNode::from_result(result).walk(&mut |visit: Visit<'_>| match visit {
        Visit::Enter { key, depth } => lines.push(format_heading(&format_key(key), depth)),
        Visit::Leaf {
            key, value, depth, ..
        } => {
            let tone = match (depth, key) {
                (0, "error") => Tone::Error,
                (0, "note") => Tone::Warning,
                _ => Tone::Normal,
            };
            lines.push(format_property(
                &format_key(key),
                &value.to_display_text(),
                depth,
                tone,
            ));
        }
        Visit::Exit { .. } => {}
    });

    if matches!(&result.outcome, Outcome::Metadata(sections) if sections.is_empty()) {
        lines.push(format!("  {}", style(NO_METADATA_MESSAGE).dim()));
    }
    lines.join("\n")
}

pub fn render_metadata(result: &NormalizedResult) {
    println!("{}", render_result(result));
}

/// Línea de progreso de un lote (`[2/5] photo.jpg`).
pub fn render_progress(progress: &BatchProgress<'_>) -> String {
    let name = progress
        .entries
        .last()
        .map(|entry| entry.file_name.as_str())
        .unwrap_or_default();
    format!(
        "{} {}",
        style(format!("[{}/{}]", progress.current, progress.total)).dim(),
        name
    )
}

/// Resumen final de un lote con el estado de cada archivo.
pub fn render_batch_summary(entries: &[BatchEntry]) -> String {
    let failures = entries.iter().filter(|entry| entry.result.is_error()).count();
    let mut lines = vec![format_heading(
        &format!("{} files processed, {} failed", entries.len(), failures),
        0,
    )];
    for entry in entries {
        let (status, tone) = match &entry.result.outcome {
            Outcome::Error(error) => (error.clone(), Tone::Error),
            Outcome::Note(note) => (note.clone(), Tone::Warning),
            Outcome::Metadata(sections) => (format!("{} sections", sections.len()), Tone::Success),
        };
        lines.push(format_property(&entry.file_name, &status, 0, tone));
    }
    lines.join("\n")
}
