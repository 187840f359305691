//! Conversión de las etiquetas nativas de cada decodificador al esquema de secciones.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::mime::FormatKind;
use super::report::{FieldValue, FileInfo, NormalizedResult, Section, SectionId};
use crate::advanced_metadata::{ImageTags, MediaTags, OfficeTags, PdfTags, TagBag};
use crate::formatting::{
    FormatOptions, format_bitrate, format_duration, format_exposure_time, format_f_number,
    format_focal_length, format_page_size, format_sample_rate,
};

pub const NO_EXIF_NOTE: &str = "No EXIF data found";
pub const NO_METADATA_NOTE: &str = "No embedded metadata found";

/// Orden de secciones por familia de formato.
const IMAGE_SECTIONS: [SectionId; 5] = [
    SectionId::Camera,
    SectionId::Settings,
    SectionId::Dates,
    SectionId::Gps,
    SectionId::Dimensions,
];
const PDF_SECTIONS: [SectionId; 3] = [SectionId::Document, SectionId::Properties, SectionId::Dates];
const OFFICE_SECTIONS: [SectionId; 4] = [
    SectionId::Document,
    SectionId::Dates,
    SectionId::Application,
    SectionId::Statistics,
];
const MEDIA_SECTIONS: [SectionId; 3] = [SectionId::Format, SectionId::Tags, SectionId::AlbumArt];

pub fn section_order(kind: FormatKind) -> &'static [SectionId] {
    match kind {
        FormatKind::Image => &IMAGE_SECTIONS,
        FormatKind::Pdf => &PDF_SECTIONS,
        FormatKind::OfficeDocx | FormatKind::OfficeXlsx | FormatKind::OfficePptx => {
            &OFFICE_SECTIONS
        }
        FormatKind::Audio | FormatKind::Video => &MEDIA_SECTIONS,
        FormatKind::Unknown => &[],
    }
}

pub fn normalize(
    kind: FormatKind,
    bag: TagBag,
    file_info: FileInfo,
    options: &FormatOptions,
) -> NormalizedResult {
    let sections: Vec<Section> = section_order(kind)
        .iter()
        .filter_map(|id| {
            let section = match &bag {
                TagBag::Image(tags) => image_section(*id, tags, options),
                TagBag::Pdf(tags) => pdf_section(*id, tags, options),
                TagBag::Office(tags) => office_section(*id, tags),
                TagBag::Media(tags) => media_section(*id, tags),
            }?;
            (!section.is_empty()).then_some(section)
        })
        .collect();

    if sections.is_empty() {
        let note = match bag {
            TagBag::Image(_) => NO_EXIF_NOTE,
            _ => NO_METADATA_NOTE,
        };
        return NormalizedResult::with_note(file_info, note);
    }
    NormalizedResult::with_sections(file_info, sections)
}

fn text(value: &Option<String>) -> Option<FieldValue> {
    value.as_deref().map(FieldValue::from)
}

fn image_section(id: SectionId, tags: &ImageTags, options: &FormatOptions) -> Option<Section> {
    let mut section = Section::new(id);
    match id {
        SectionId::Camera if tags.make.is_some() || tags.model.is_some() => {
            section
                .push("make", text(&tags.make))
                .push("model", text(&tags.model))
                .push("software", text(&tags.software))
                .push("lensModel", text(&tags.lens_model));
        }
        SectionId::Settings
            if tags.exposure_time.is_some() || tags.f_number.is_some() || tags.iso.is_some() =>
        {
            section
                .push(
                    "exposureTime",
                    tags.exposure_time
                        .and_then(|secs| format_exposure_time(secs, options))
                        .map(FieldValue::from),
                )
                .push(
                    "fNumber",
                    tags.f_number
                        .and_then(|value| format_f_number(value, options))
                        .map(FieldValue::from),
                )
                .push("iso", tags.iso.map(FieldValue::from))
                .push(
                    "focalLength",
                    tags.focal_length
                        .and_then(|value| format_focal_length(value, options))
                        .map(FieldValue::from),
                )
                .push("flash", text(&tags.flash));
        }
        SectionId::Dates if tags.date_taken.is_some() || tags.date_created.is_some() => {
            section
                .push("taken", tags.date_taken.as_deref().map(coerce_date))
                .push("created", tags.date_created.as_deref().map(coerce_date))
                .push("modified", tags.date_modified.as_deref().map(coerce_date));
        }
        SectionId::Gps => {
            if let (Some(latitude), Some(longitude)) = (tags.latitude, tags.longitude) {
                section
                    .push("latitude", Some(latitude.into()))
                    .push("longitude", Some(longitude.into()))
                    .push("altitude", tags.altitude.map(FieldValue::from));
            }
        }
        SectionId::Dimensions if tags.width.is_some() => {
            section
                .push("width", tags.width.map(FieldValue::from))
                .push("height", tags.height.map(FieldValue::from))
                .push(
                    "orientation",
                    tags.orientation.map(|code| match orientation_label(code) {
                        Some(label) => FieldValue::from(label),
                        None => FieldValue::from(code),
                    }),
                );
        }
        _ => return None,
    }
    Some(section)
}

fn orientation_label(code: u32) -> Option<&'static str> {
    let label = match code {
        1 => "Horizontal (normal)",
        2 => "Mirror horizontal",
        3 => "Rotate 180",
        4 => "Mirror vertical",
        5 => "Mirror horizontal and rotate 270 CW",
        6 => "Rotate 90 CW",
        7 => "Mirror horizontal and rotate 90 CW",
        8 => "Rotate 270 CW",
        _ => return None,
    };
    Some(label)
}

fn pdf_section(id: SectionId, tags: &PdfTags, options: &FormatOptions) -> Option<Section> {
    let mut section = Section::new(id);
    match id {
        SectionId::Document => {
            section
                .push("title", text(&tags.title))
                .push("author", text(&tags.author))
                .push("subject", text(&tags.subject))
                .push("keywords", text(&tags.keywords))
                .push("creator", text(&tags.creator))
                .push("producer", text(&tags.producer));
        }
        SectionId::Properties => {
            let page_size: Option<FieldValue> = tags
                .page_size
                .map(|(width, height)| format_page_size(width, height, options).into());
            section
                .push("pageCount", (tags.page_count > 0).then(|| tags.page_count.into()))
                .push("pageSize", page_size)
                .push("pdfVersion", text(&tags.version))
                .push("encrypted", tags.encrypted.then_some(FieldValue::Bool(true)));
        }
        SectionId::Dates => {
            section
                .push("created", tags.creation_date.as_deref().map(coerce_date))
                .push("modified", tags.modification_date.as_deref().map(coerce_date));
        }
        _ => return None,
    }
    Some(section)
}

fn office_section(id: SectionId, tags: &OfficeTags) -> Option<Section> {
    let mut section = Section::new(id);
    match id {
        SectionId::Document => {
            section
                .push("title", text(&tags.title))
                .push("subject", text(&tags.subject))
                .push("creator", text(&tags.creator))
                .push("keywords", text(&tags.keywords))
                .push("description", text(&tags.description))
                .push("category", text(&tags.category))
                .push("lastModifiedBy", text(&tags.last_modified_by))
                .push("revision", text(&tags.revision));
        }
        SectionId::Dates => {
            section
                .push("created", tags.created.as_deref().map(coerce_date))
                .push("modified", tags.modified.as_deref().map(coerce_date));
        }
        SectionId::Application => {
            section
                .push("application", text(&tags.application))
                .push("appVersion", text(&tags.app_version))
                .push("company", text(&tags.company))
                .push("manager", text(&tags.manager))
                .push("template", text(&tags.template));
        }
        SectionId::Statistics => {
            let stats = [
                ("pages", &tags.pages),
                ("words", &tags.words),
                ("characters", &tags.characters),
                ("charactersWithSpaces", &tags.characters_with_spaces),
                ("lines", &tags.lines),
                ("paragraphs", &tags.paragraphs),
                ("slides", &tags.slides),
                ("notes", &tags.notes),
                ("hiddenSlides", &tags.hidden_slides),
            ];
            for (key, value) in stats {
                let number = value
                    .as_deref()
                    .and_then(|raw| raw.trim().parse::<i64>().ok())
                    .map(FieldValue::Integer);
                section.push(key, number);
            }
        }
        _ => return None,
    }
    Some(section)
}

fn media_section(id: SectionId, tags: &MediaTags) -> Option<Section> {
    let mut section = Section::new(id);
    match id {
        SectionId::Format => {
            section
                .push("container", text(&tags.container))
                .push("codec", text(&tags.codec))
                .push(
                    "duration",
                    tags.duration_secs.and_then(format_duration).map(FieldValue::from),
                )
                .push(
                    "bitrate",
                    tags.bitrate.and_then(format_bitrate).map(FieldValue::from),
                )
                .push(
                    "sampleRate",
                    tags.sample_rate.and_then(format_sample_rate).map(FieldValue::from),
                )
                .push("channels", tags.channels.map(|value| u32::from(value).into()))
                .push("bitDepth", tags.bit_depth.map(|value| u32::from(value).into()));
        }
        SectionId::Tags => {
            let track = match (tags.track, tags.track_total) {
                (Some(track), Some(total)) => Some(format!("{track}/{total}").into()),
                (Some(track), None) => Some(track.into()),
                _ => None,
            };
            section
                .push("title", text(&tags.title))
                .push("artist", text(&tags.artist))
                .push("album", text(&tags.album))
                .push("albumArtist", text(&tags.album_artist))
                .push("year", tags.year.map(FieldValue::from))
                .push("track", track)
                .push("genre", text(&tags.genre))
                .push("composer", text(&tags.composer))
                .push("comment", text(&tags.comment));
        }
        SectionId::AlbumArt if !tags.artwork.is_empty() => {
            let mut mime_types: Vec<FieldValue> = Vec::new();
            for mime in &tags.artwork {
                let value = FieldValue::from(mime.as_str());
                if !mime_types.contains(&value) {
                    mime_types.push(value);
                }
            }
            section
                .push("count", Some((tags.artwork.len() as i64).into()))
                .push("mimeTypes", Some(FieldValue::List(mime_types)));
        }
        _ => return None,
    }
    Some(section)
}

/// Convierte una fecha EXIF, PDF o ISO 8601 a UTC. El texto no reconocido se conserva.
pub fn coerce_date(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    parse_date(trimmed)
        .map(FieldValue::Date)
        .unwrap_or_else(|| FieldValue::from(trimmed))
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Some(pdf) = raw.strip_prefix("D:") {
        return parse_pdf_date(pdf);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y:%m:%d %H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(date) = DateTime::parse_from_str(raw, format) {
            return Some(date.with_timezone(&Utc));
        }
    }
    for format in ["%Y:%m:%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

/// `YYYY[MM[DD[HH[mm[SS]]]]][Z|(+|-)HH['mm']]`, sin el prefijo `D:`.
fn parse_pdf_date(raw: &str) -> Option<DateTime<Utc>> {
    let digits_len = raw.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len < 4 || digits_len % 2 != 0 {
        return None;
    }
    let (digits, zone) = raw.split_at(digits_len);
    let component = |start: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + 2) {
            Some(part) => part.parse().ok(),
            None => Some(default),
        }
    };
    let year: i32 = digits[..4].parse().ok()?;
    let month = component(4, 1)?;
    let day = component(6, 1)?;
    let hour = component(8, 0)?;
    let minute = component(10, 0)?;
    let second = component(12, 0)?;
    let local = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    let offset = parse_pdf_offset(zone)?;
    let date = offset.from_local_datetime(&local).single()?;
    Some(date.with_timezone(&Utc))
}

fn parse_pdf_offset(zone: &str) -> Option<FixedOffset> {
    let zone = zone.trim();
    let sign = match zone.chars().next() {
        None | Some('Z') => return FixedOffset::east_opt(0),
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };
    let numbers: Vec<u32> = zone[1..]
        .split('\'')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().ok())
        .collect::<Option<_>>()?;
    let hours = numbers.first().copied().unwrap_or(0);
    let minutes = numbers.get(1).copied().unwrap_or(0);
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = i32::try_from(hours * 3600 + minutes * 60).ok()?;
    FixedOffset::east_opt(sign * seconds)
}
