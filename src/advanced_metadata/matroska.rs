//! Lectura mínima de contenedores EBML (Matroska y WebM).

use std::io::{Cursor, Read};
use tracing::debug;

use super::media::MediaTags;
use crate::error::{ExtractError, Result};

pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

const EBML_HEADER: u32 = 0x1A45DFA3;
const DOC_TYPE: u32 = 0x4282;
const SEGMENT: u32 = 0x18538067;
const INFO: u32 = 0x1549A966;
const TIMECODE_SCALE: u32 = 0x2AD7B1;
const DURATION: u32 = 0x4489;
const TITLE: u32 = 0x7BA9;
const TRACKS: u32 = 0x1654AE6B;
const TRACK_ENTRY: u32 = 0xAE;
const TRACK_TYPE: u32 = 0x83;
const CODEC_ID: u32 = 0x86;
const AUDIO: u32 = 0xE1;
const SAMPLING_FREQUENCY: u32 = 0xB5;
const CHANNELS: u32 = 0x9F;
const BIT_DEPTH: u32 = 0x6264;

const TRACK_TYPE_AUDIO: u64 = 2;
const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

#[derive(Default)]
struct SegmentInfo {
    timecode_scale: Option<u64>,
    duration: Option<f64>,
    title: Option<String>,
}

#[derive(Default)]
struct TrackInfo {
    track_type: Option<u64>,
    codec_id: Option<String>,
    sampling_frequency: Option<f64>,
    channels: Option<u64>,
    bit_depth: Option<u64>,
}

pub fn extract_matroska_metadata(data: &[u8]) -> Result<MediaTags> {
    let mut doc_type = None;
    let mut segment = None;

    for (id, body) in elements(data) {
        match id {
            EBML_HEADER => {
                doc_type = elements(body)
                    .find(|(id, _)| *id == DOC_TYPE)
                    .map(|(_, value)| read_ebml_string(value));
            }
            SEGMENT => {
                segment = Some(body);
                break;
            }
            _ => {}
        }
    }

    let segment = segment.ok_or_else(|| ExtractError::Matroska("missing Segment element".into()))?;

    let mut info = SegmentInfo::default();
    let mut tracks = Vec::new();
    for (id, body) in elements(segment) {
        match id {
            INFO => info = parse_info(body),
            TRACKS => tracks.extend(
                elements(body)
                    .filter(|(id, _)| *id == TRACK_ENTRY)
                    .map(|(_, entry)| parse_track_entry(entry)),
            ),
            _ => {}
        }
    }
    debug!(tracks = tracks.len(), ?doc_type, "segmento Matroska leído");

    let scale = info.timecode_scale.unwrap_or(DEFAULT_TIMECODE_SCALE) as f64;
    let duration_secs = info
        .duration
        .map(|ticks| ticks * scale / 1_000_000_000.0)
        .filter(|secs| secs.is_finite() && *secs > 0.0);

    let mut codecs: Vec<String> = Vec::new();
    for codec in tracks.iter().filter_map(|track| track.codec_id.clone()) {
        if !codecs.contains(&codec) {
            codecs.push(codec);
        }
    }
    let audio = tracks
        .iter()
        .find(|track| track.track_type == Some(TRACK_TYPE_AUDIO));

    Ok(MediaTags {
        container: Some(container_label(doc_type.as_deref())),
        codec: (!codecs.is_empty()).then(|| codecs.join(", ")),
        duration_secs,
        bitrate: duration_secs.map(|secs| data.len() as f64 * 8.0 / secs),
        sample_rate: audio
            .and_then(|track| track.sampling_frequency)
            .map(|hz| hz.round() as u32),
        channels: audio
            .and_then(|track| track.channels)
            .and_then(|value| u8::try_from(value).ok()),
        bit_depth: audio
            .and_then(|track| track.bit_depth)
            .and_then(|value| u8::try_from(value).ok()),
        title: info.title,
        ..MediaTags::default()
    })
}

fn container_label(doc_type: Option<&str>) -> String {
    match doc_type {
        Some("webm") => "WebM".to_string(),
        Some("matroska") | None => "Matroska".to_string(),
        Some(other) => other.to_string(),
    }
}

fn parse_info(data: &[u8]) -> SegmentInfo {
    let mut info = SegmentInfo::default();
    for (id, body) in elements(data) {
        match id {
            TIMECODE_SCALE => info.timecode_scale = Some(read_ebml_uint(body)).filter(|v| *v > 0),
            DURATION => info.duration = read_ebml_float(body),
            TITLE => info.title = Some(read_ebml_string(body)).filter(|t| !t.is_empty()),
            _ => {}
        }
    }
    info
}

fn parse_track_entry(data: &[u8]) -> TrackInfo {
    let mut track = TrackInfo::default();
    for (id, body) in elements(data) {
        match id {
            TRACK_TYPE => track.track_type = Some(read_ebml_uint(body)),
            CODEC_ID => track.codec_id = Some(read_ebml_string(body)).filter(|c| !c.is_empty()),
            AUDIO => {
                for (id, body) in elements(body) {
                    match id {
                        SAMPLING_FREQUENCY => track.sampling_frequency = read_ebml_float(body),
                        CHANNELS => track.channels = Some(read_ebml_uint(body)),
                        BIT_DEPTH => track.bit_depth = Some(read_ebml_uint(body)),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    track
}

/// Itera los elementos hijos de un cuerpo EBML. Un tamaño desconocido o que
/// excede los datos se recorta al final del cuerpo.
fn elements(data: &[u8]) -> impl Iterator<Item = (u32, &[u8])> {
    let mut cursor = Cursor::new(data);
    std::iter::from_fn(move || {
        let (id, size) = read_ebml_element(&mut cursor)?;
        let start = cursor.position() as usize;
        let end = match size {
            Some(size) => start.saturating_add(usize::try_from(size).ok()?).min(data.len()),
            None => data.len(),
        };
        cursor.set_position(end as u64);
        Some((id, &data[start..end]))
    })
}

fn read_ebml_element(cursor: &mut Cursor<&[u8]>) -> Option<(u32, Option<u64>)> {
    let id = read_ebml_id(cursor)?;
    let size = read_ebml_size(cursor)?;
    Some((id, size))
}

fn read_ebml_id(cursor: &mut Cursor<&[u8]>) -> Option<u32> {
    let mut first = [0_u8; 1];
    cursor.read_exact(&mut first).ok()?;
    let mut mask = 0x80;
    let mut length = 1;
    while length <= 4 && first[0] & mask == 0 {
        mask >>= 1;
        length += 1;
    }
    if length > 4 {
        return None;
    }
    let mut value = first[0] as u32;
    for _ in 1..length {
        let mut b = [0_u8; 1];
        cursor.read_exact(&mut b).ok()?;
        value = (value << 8) | b[0] as u32;
    }
    Some(value)
}

/// Tamaño del elemento; `None` interno indica tamaño desconocido (todos los bits en uno).
fn read_ebml_size(cursor: &mut Cursor<&[u8]>) -> Option<Option<u64>> {
    let mut first = [0_u8; 1];
    cursor.read_exact(&mut first).ok()?;
    let mut mask = 0x80_u8;
    let mut length = 1;
    while length <= 8 && first[0] & mask == 0 {
        mask >>= 1;
        length += 1;
    }
    if length > 8 {
        return None;
    }
    let mut value = (first[0] & !mask) as u64;
    for _ in 1..length {
        let mut b = [0_u8; 1];
        cursor.read_exact(&mut b).ok()?;
        value = (value << 8) | b[0] as u64;
    }
    let unknown = (1_u64 << (7 * length)) - 1;
    Some((value != unknown).then_some(value))
}

fn read_ebml_uint(data: &[u8]) -> u64 {
    let mut value = 0u64;
    for &b in data.iter().take(8) {
        value = (value << 8) | b as u64;
    }
    value
}

fn read_ebml_string(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_matches(char::from(0))
        .trim()
        .to_string()
}

fn read_ebml_float(data: &[u8]) -> Option<f64> {
    match data.len() {
        4 => Some(f32::from_be_bytes([data[0], data[1], data[2], data[3]]) as f64),
        8 => Some(f64::from_be_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ])),
        _ => None,
    }
}
