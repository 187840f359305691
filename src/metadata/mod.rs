//! Motor de extracción: clasificación, despacho, normalización, lotes y exportación.

pub mod batch;
pub mod dispatch;
pub mod export;
pub mod file;
pub mod flatten;
pub mod mime;
pub mod normalize;
mod output;
pub mod renderer;
pub mod report;

pub use batch::{
    Batch, BatchEntry, BatchEvent, BatchProgress, Extraction, process_files, run_batch,
    run_batch_with_progress, run_batch_with_sender,
};
pub use dispatch::{ExtractOptions, extract};
pub use export::{
    ExportArtifact, ExportFormat, export_batch, export_result, export_to_csv, export_to_json,
    export_to_txt, parse_export_format,
};
pub use file::FileHandle;
pub use mime::{FormatKind, classify};
pub use normalize::normalize;
pub use report::{Field, FieldValue, FileInfo, NormalizedResult, Outcome, Section, SectionId};
