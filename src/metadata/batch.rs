//! Procesamiento secuencial de varios archivos con progreso incremental.

use serde::{Deserialize, Serialize};
use std::slice;
use std::sync::mpsc::Sender;
use tracing::info;

use super::dispatch::{ExtractOptions, extract};
use super::file::FileHandle;
use super::report::NormalizedResult;

/// Resultado de un archivo dentro de un lote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileType")]
    pub declared_type: String,
    #[serde(rename = "metadata")]
    pub result: NormalizedResult,
}

impl BatchEntry {
    fn extract(file: &FileHandle, options: &ExtractOptions) -> Self {
        Self {
            file_name: file.name().to_string(),
            declared_type: file.declared_type().to_string(),
            result: extract(file, options),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BatchProgress<'a> {
    pub current: usize,
    pub total: usize,
    pub entries: &'a [BatchEntry],
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BatchEvent {
    Started { total: usize },
    Processing { index: usize, total: usize, file_name: String },
    Completed { index: usize, total: usize, entry: BatchEntry },
    Finished { total: usize, failures: usize },
}

/// Resultado de `process_files`: un archivo o un lote.
#[derive(Clone, Debug, PartialEq)]
pub enum Extraction {
    Single(NormalizedResult),
    Batch(Vec<BatchEntry>),
}

/// Iterador perezoso: cada archivo se abre solo cuando se solicita su entrada.
pub struct Batch<'a> {
    files: slice::Iter<'a, FileHandle>,
    options: ExtractOptions,
}

impl Iterator for Batch<'_> {
    type Item = BatchEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let file = self.files.next()?;
        Some(BatchEntry::extract(file, &self.options))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.files.size_hint()
    }
}

impl ExactSizeIterator for Batch<'_> {}

pub fn run_batch<'a>(files: &'a [FileHandle], options: &ExtractOptions) -> Batch<'a> {
    Batch {
        files: files.iter(),
        options: *options,
    }
}

pub fn run_batch_with_progress(
    files: &[FileHandle],
    options: &ExtractOptions,
    mut observer: impl FnMut(BatchProgress<'_>),
) -> Vec<BatchEntry> {
    let total = files.len();
    info!(total, "procesando lote");

    let mut entries = Vec::with_capacity(total);
    for entry in run_batch(files, options) {
        entries.push(entry);
        observer(BatchProgress {
            current: entries.len(),
            total,
            entries: &entries,
        });
    }
    entries
}

pub fn run_batch_with_sender(
    files: Vec<FileHandle>,
    options: ExtractOptions,
    sender: Sender<BatchEvent>,
) {
    let total = files.len();
    info!(total, "procesando lote en segundo plano");
    let _ = sender.send(BatchEvent::Started { total });

    let mut failures = 0_usize;
    for (index, file) in files.iter().enumerate() {
        let _ = sender.send(BatchEvent::Processing {
            index: index + 1,
            total,
            file_name: file.name().to_string(),
        });

        let entry = BatchEntry::extract(file, &options);
        if entry.result.is_error() {
            failures += 1;
        }
        let _ = sender.send(BatchEvent::Completed {
            index: index + 1,
            total,
            entry,
        });
    }

    let _ = sender.send(BatchEvent::Finished { total, failures });
}

/// Un único archivo se extrae directamente; varios pasan por el lote.
pub fn process_files(
    files: &[FileHandle],
    options: &ExtractOptions,
    observer: impl FnMut(BatchProgress<'_>),
) -> Extraction {
    match files {
        [file] => Extraction::Single(extract(file, options)),
        _ => Extraction::Batch(run_batch_with_progress(files, options, observer)),
    }
}
