//! Metadata de audio y video: propiedades del flujo, etiquetas y carátulas.

use lofty::error::LoftyError;
use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::picture::MimeType;
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::io::Cursor;
use tracing::debug;

use super::matroska::{self, EBML_MAGIC};
use crate::error::Result;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaTags {
    pub container: Option<String>,
    pub codec: Option<String>,
    pub duration_secs: Option<f64>,
    /// Bits por segundo.
    pub bitrate: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub bit_depth: Option<u8>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub year: Option<u32>,
    pub track: Option<u32>,
    pub track_total: Option<u32>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub comment: Option<String>,
    /// Tipo MIME de cada imagen incrustada, en orden.
    pub artwork: Vec<String>,
}

pub fn extract_media_metadata(bytes: &[u8]) -> Result<MediaTags> {
    if bytes.starts_with(&EBML_MAGIC) {
        debug!("contenedor EBML detectado");
        return matroska::extract_matroska_metadata(bytes);
    }

    let tagged_file = Probe::new(Cursor::new(bytes))
        .guess_file_type()
        .map_err(LoftyError::from)?
        .read()?;

    let file_type = tagged_file.file_type();
    let properties = tagged_file.properties();
    let bitrate = properties
        .audio_bitrate()
        .or_else(|| properties.overall_bitrate())
        .filter(|kbps| *kbps > 0)
        .map(|kbps| f64::from(kbps) * 1000.0);

    let mut tags = MediaTags {
        container: Some(container_label(file_type)),
        codec: codec_label(file_type).map(str::to_string),
        duration_secs: Some(properties.duration().as_secs_f64()).filter(|secs| *secs > 0.0),
        bitrate,
        sample_rate: properties.sample_rate(),
        channels: properties.channels(),
        bit_depth: properties.bit_depth(),
        ..MediaTags::default()
    };

    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
    match tag {
        Some(tag) => read_tag(tag, &mut tags),
        None => debug!(?file_type, "archivo sin etiquetas"),
    }

    Ok(tags)
}

fn read_tag(tag: &Tag, tags: &mut MediaTags) {
    tags.title = tag.title().map(|value| normalize_text(&value));
    tags.artist = tag.artist().map(|value| normalize_text(&value));
    tags.album = tag.album().map(|value| normalize_text(&value));
    tags.album_artist = tag.get_string(&ItemKey::AlbumArtist).map(normalize_text);
    tags.year = tag.year();
    tags.track = tag.track();
    tags.track_total = tag.track_total();
    tags.genre = tag.genre().map(|value| normalize_text(&value));
    tags.composer = tag.get_string(&ItemKey::Composer).map(normalize_text);
    tags.comment = tag.comment().map(|value| normalize_text(&value));
    tags.artwork = tag
        .pictures()
        .iter()
        .map(|picture| {
            picture
                .mime_type()
                .map(mime_type_to_string)
                .unwrap_or_else(|| "application/octet-stream".to_string())
        })
        .collect();
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

fn mime_type_to_string(mime_type: &MimeType) -> String {
    match mime_type {
        MimeType::Png => "image/png".to_string(),
        MimeType::Jpeg => "image/jpeg".to_string(),
        MimeType::Tiff => "image/tiff".to_string(),
        MimeType::Bmp => "image/bmp".to_string(),
        MimeType::Gif => "image/gif".to_string(),
        MimeType::Unknown(mime) => mime.clone(),
        _ => "application/octet-stream".to_string(),
    }
}

fn container_label(file_type: FileType) -> String {
    match file_type {
        FileType::Aac => "AAC (ADTS)",
        FileType::Aiff => "AIFF",
        FileType::Ape => "APE",
        FileType::Flac => "FLAC",
        FileType::Mpeg => "MPEG",
        FileType::Mp4 => "MP4",
        FileType::Mpc => "Musepack",
        FileType::Opus | FileType::Vorbis | FileType::Speex => "Ogg",
        FileType::Wav => "WAV",
        FileType::WavPack => "WavPack",
        other => return format!("{other:?}"),
    }
    .to_string()
}

/// Códec implícito en el contenedor; MP4 y WAV pueden transportar varios.
fn codec_label(file_type: FileType) -> Option<&'static str> {
    let codec = match file_type {
        FileType::Aac => "AAC",
        FileType::Aiff => "PCM",
        FileType::Ape => "Monkey's Audio",
        FileType::Flac => "FLAC",
        FileType::Mpeg => "MPEG audio",
        FileType::Mpc => "Musepack",
        FileType::Opus => "Opus",
        FileType::Vorbis => "Vorbis",
        FileType::Speex => "Speex",
        FileType::WavPack => "WavPack",
        _ => return None,
    };
    Some(codec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_whitespace() {
        assert_eq!(normalize_text("  Hello   World  "), "Hello World");
        assert_eq!(normalize_text("Title\nWith\tTabs"), "Title With Tabs");
    }

    #[test]
    fn ogg_family_shares_container_label() {
        assert_eq!(container_label(FileType::Opus), "Ogg");
        assert_eq!(container_label(FileType::Vorbis), "Ogg");
        assert_eq!(codec_label(FileType::Opus), Some("Opus"));
        assert_eq!(codec_label(FileType::Mp4), None);
    }

    #[test]
    fn unrecognized_bytes_are_an_error() {
        assert!(extract_media_metadata(b"plain text, not audio at all").is_err());
    }
}
