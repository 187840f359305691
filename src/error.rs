use thiserror::Error;

/// Fallos de un decodificador; el despachador los convierte en el campo `error`.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Could not read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Could not parse EXIF data: {0}")]
    Exif(#[from] exif::Error),

    #[error("Could not parse PDF document: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Could not read Office document: {0}")]
    Office(#[from] zip::result::ZipError),

    #[error("Could not parse media file: {0}")]
    Media(#[from] lofty::error::LoftyError),

    #[error("Could not parse Matroska container: {0}")]
    Matroska(String),

    #[error("Extraction timed out after {0} s")]
    Timeout(u64),

    #[error("Extraction worker stopped unexpectedly")]
    WorkerLost,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Could not serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not build CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not save export: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
