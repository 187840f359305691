//! Punto de entrada de la extracción: clasifica, decodifica con límite de tiempo y normaliza.

use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::file::FileHandle;
use super::mime::{FormatKind, classify};
use super::normalize::normalize;
use super::report::{FileInfo, NormalizedResult};
use crate::advanced_metadata::{Decoder, decoder_for};
use crate::error::{ExtractError, Result};
use crate::formatting::{FormatOptions, format_size};

pub const UNSUPPORTED_NOTE: &str = "File type not fully supported yet";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Opciones de una extracción.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Tiempo máximo por decodificación; `None` lo desactiva.
    pub timeout: Option<Duration>,
    pub format: FormatOptions,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            format: FormatOptions::default(),
        }
    }
}

pub fn file_info(file: &FileHandle, options: &FormatOptions) -> FileInfo {
    FileInfo {
        name: file.name().to_string(),
        size: format_size(file.size_bytes(), options),
        size_bytes: file.size_bytes(),
        declared_type: file.declared_type().to_string(),
        last_modified: file.last_modified(),
    }
}

/// Extrae y normaliza la metadata de un archivo. Nunca falla: los errores quedan en el resultado.
pub fn extract(file: &FileHandle, options: &ExtractOptions) -> NormalizedResult {
    let info = file_info(file, &options.format);
    let kind = format_kind(file);

    let Some(decoder) = decoder_for(kind) else {
        debug!(file = file.name(), "tipo de archivo sin decodificador");
        return NormalizedResult::with_note(info, UNSUPPORTED_NOTE);
    };

    debug!(file = file.name(), kind = kind.label(), "decodificando");
    let job = Job {
        kind,
        decoder,
        info: info.clone(),
        format: options.format,
    };
    let outcome = file
        .read_bytes()
        .map_err(ExtractError::from)
        .and_then(|bytes| match options.timeout {
            None => run_guarded(job, &bytes),
            Some(timeout) => run_with_timeout(job, bytes, timeout),
        });

    match outcome {
        Ok(result) => result,
        Err(error) => {
            warn!(file = file.name(), kind = kind.label(), %error, "no se pudo extraer metadata");
            NormalizedResult::with_error(info, error.to_string())
        }
    }
}

/// Tipo de formato que usaría `extract` para este archivo.
pub fn format_kind(file: &FileHandle) -> FormatKind {
    classify(file.declared_type(), file.name())
}

/// Decodificación y normalización de un archivo, ejecutadas siempre juntas.
struct Job {
    kind: FormatKind,
    decoder: Decoder,
    info: FileInfo,
    format: FormatOptions,
}

impl Job {
    fn run(self, bytes: &[u8]) -> Result<NormalizedResult> {
        let bag = (self.decoder)(bytes)?;
        Ok(normalize(self.kind, bag, self.info, &self.format))
    }
}

/// Ejecuta el trabajo en el hilo actual; un pánico se reporta como error del archivo.
fn run_guarded(job: Job, bytes: &[u8]) -> Result<NormalizedResult> {
    panic::catch_unwind(AssertUnwindSafe(|| job.run(bytes)))
        .unwrap_or_else(|_| Err(ExtractError::WorkerLost))
}

/// Ejecuta el trabajo en un hilo aparte; al vencer el plazo el resultado se descarta.
fn run_with_timeout(job: Job, bytes: Vec<u8>, timeout: Duration) -> Result<NormalizedResult> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let result = job.run(&bytes);
        let _ = sender.send(result);
    });

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ExtractError::Timeout(timeout.as_secs())),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ExtractError::WorkerLost),
    }
}
