//! Manejador de archivo de entrada: atributos básicos y acceso diferido al contenido.

use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use super::mime::guess_declared_type;

const SNIFF_BYTES: u64 = 8192;

#[derive(Clone, Debug)]
enum Content {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// Archivo entregado al motor. El contenido solo se lee al extraer.
#[derive(Clone, Debug)]
pub struct FileHandle {
    name: String,
    declared_type: String,
    size_bytes: u64,
    last_modified: DateTime<Utc>,
    content: Content,
}

impl FileHandle {
    /// Construye el manejador desde disco, deduciendo el tipo declarado.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("`{}` no es un archivo", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|value| value.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut head = Vec::new();
        File::open(path)?.take(SNIFF_BYTES).read_to_end(&mut head)?;

        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Self {
            declared_type: guess_declared_type(&name, &head),
            name,
            size_bytes: metadata.len(),
            last_modified,
            content: Content::Path(path.to_path_buf()),
        })
    }

    /// Construye el manejador a partir de bytes en memoria.
    pub fn from_bytes(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            size_bytes: bytes.len() as u64,
            last_modified: Utc::now(),
            content: Content::Memory(bytes),
        }
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Lee el contenido completo del archivo.
    pub fn read_bytes(&self) -> io::Result<Vec<u8>> {
        match &self.content {
            Content::Path(path) => fs::read(path),
            Content::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}
