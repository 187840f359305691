//! MetaHunter: extracción y normalización de metadata de imágenes, PDFs,
//! documentos Office, audio y video.

pub mod advanced_metadata;
pub mod error;
pub mod formatting;
pub mod metadata;

pub use error::{ExportError, ExtractError};
pub use formatting::FormatOptions;
pub use metadata::*;
