//! Clasificación de formatos a partir del tipo declarado y la extensión.

use infer::Infer;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

const AUDIO_EXTENSIONS: [&str; 15] = [
    "mp3", "wav", "flac", "ogg", "oga", "opus", "m4a", "aac", "aiff", "aif", "ape", "wv", "mpc",
    "spx", "wma",
];
const VIDEO_EXTENSIONS: [&str; 9] = [
    "mp4", "m4v", "mov", "mkv", "webm", "avi", "wmv", "flv", "3gp",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    Image,
    Pdf,
    OfficeDocx,
    OfficeXlsx,
    OfficePptx,
    Audio,
    Video,
    Unknown,
}

impl FormatKind {
    pub fn is_office(self) -> bool {
        matches!(
            self,
            FormatKind::OfficeDocx | FormatKind::OfficeXlsx | FormatKind::OfficePptx
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            FormatKind::Image => "image",
            FormatKind::Pdf => "PDF",
            FormatKind::OfficeDocx => "Word document",
            FormatKind::OfficeXlsx => "Excel workbook",
            FormatKind::OfficePptx => "PowerPoint presentation",
            FormatKind::Audio => "audio",
            FormatKind::Video => "video",
            FormatKind::Unknown => "unknown",
        }
    }
}

/// Determina el tipo de formato usando solo el tipo declarado y la extensión.
pub fn classify(declared_type: &str, file_name: &str) -> FormatKind {
    let declared = declared_type.trim().to_ascii_lowercase();
    let extension = extension_of(file_name);
    let extension = extension.as_deref().unwrap_or("");

    if declared.starts_with("image/") {
        return FormatKind::Image;
    }
    if declared == "application/pdf" || extension == "pdf" {
        return FormatKind::Pdf;
    }
    if declared == DOCX_MIME || extension == "docx" {
        return FormatKind::OfficeDocx;
    }
    if declared == XLSX_MIME || extension == "xlsx" {
        return FormatKind::OfficeXlsx;
    }
    if declared == PPTX_MIME || extension == "pptx" {
        return FormatKind::OfficePptx;
    }
    if declared.starts_with("audio/") || AUDIO_EXTENSIONS.contains(&extension) {
        return FormatKind::Audio;
    }
    if declared.starts_with("video/") || VIDEO_EXTENSIONS.contains(&extension) {
        return FormatKind::Video;
    }
    FormatKind::Unknown
}

/// Extensión en minúsculas, sin el punto.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Intenta detectar el tipo MIME del archivo a partir de su contenido.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<String> {
    let infer = Infer::new();
    infer.get(bytes).map(|kind| kind.mime_type().to_string())
}

/// Tipo declarado para un archivo local: contenido primero, extensión después.
pub fn guess_declared_type(file_name: &str, head: &[u8]) -> String {
    sniff_mime_type(head)
        .filter(|mime| mime != "application/zip")
        .or_else(|| mime_from_extension(file_name).map(str::to_string))
        .unwrap_or_default()
}

fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    let mime = match extension_of(file_name)?.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "heic" | "heif" => "image/heif",
        "pdf" => "application/pdf",
        "docx" => DOCX_MIME,
        "xlsx" => XLSX_MIME,
        "pptx" => PPTX_MIME,
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "m4a" => "audio/mp4",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "txt" => "text/plain",
        "json" => "application/json",
        "csv" => "text/csv",
        _ => return None,
    };
    Some(mime)
}
