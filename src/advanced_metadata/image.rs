//! Extracción de metadata EXIF relevante para imágenes.

use exif::{Exif, In, Tag, Value};
use infer::MatcherType;
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::Result;

/// Contenedores de imagen donde puede existir un bloque EXIF.
const EXIF_CONTAINERS: [&str; 7] = [
    "image/jpeg",
    "image/png",
    "image/tiff",
    "image/webp",
    "image/heif",
    "image/avif",
    "image/x-canon-cr2",
];

/// Etiquetas EXIF tal como aparecen en el archivo, sin formato de unidades.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageTags {
    pub make: Option<String>,
    pub model: Option<String>,
    pub software: Option<String>,
    pub lens_model: Option<String>,
    pub exposure_time: Option<f64>,
    pub f_number: Option<f64>,
    pub iso: Option<u32>,
    pub focal_length: Option<f64>,
    pub flash: Option<String>,
    pub date_taken: Option<String>,
    pub date_created: Option<String>,
    pub date_modified: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub orientation: Option<u32>,
}

pub fn extract_image_metadata(bytes: &[u8]) -> Result<ImageTags> {
    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() == MatcherType::Image && !EXIF_CONTAINERS.contains(&kind.mime_type()) {
            debug!(mime = kind.mime_type(), "contenedor sin soporte EXIF");
            return Ok(ImageTags::default());
        }
    }

    let mut reader = exif::Reader::new();
    reader.continue_on_error(true);
    let exif = match reader.read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(container)) => {
            debug!(container, "sin bloque EXIF");
            return Ok(ImageTags::default());
        }
        Err(exif::Error::PartialResult(partial)) => {
            let (exif, errors) = partial.into_inner();
            warn!(errors = errors.len(), "EXIF parcialmente dañado, se conservan los campos válidos");
            exif
        }
        Err(error) => return Err(error.into()),
    };

    let (latitude, longitude) = match (
        gps_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S"),
        gps_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W"),
    ) {
        (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
        _ => (None, None),
    };

    Ok(ImageTags {
        make: ascii(&exif, Tag::Make),
        model: ascii(&exif, Tag::Model),
        software: ascii(&exif, Tag::Software),
        lens_model: ascii(&exif, Tag::LensModel),
        exposure_time: rational(&exif, Tag::ExposureTime),
        f_number: rational(&exif, Tag::FNumber),
        iso: uint(&exif, Tag::PhotographicSensitivity),
        focal_length: rational(&exif, Tag::FocalLength),
        flash: exif
            .get_field(Tag::Flash, In::PRIMARY)
            .map(|field| field.display_value().to_string()),
        date_taken: dated(&exif, Tag::DateTimeOriginal, Tag::OffsetTimeOriginal),
        date_created: dated(&exif, Tag::DateTimeDigitized, Tag::OffsetTimeDigitized),
        date_modified: dated(&exif, Tag::DateTime, Tag::OffsetTime),
        latitude,
        longitude,
        altitude: altitude(&exif),
        width: uint(&exif, Tag::ImageWidth).or_else(|| uint(&exif, Tag::PixelXDimension)),
        height: uint(&exif, Tag::ImageLength).or_else(|| uint(&exif, Tag::PixelYDimension)),
        orientation: uint(&exif, Tag::Orientation),
    })
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(values) => values
            .iter()
            .map(|value| {
                String::from_utf8_lossy(value)
                    .trim_matches(char::from(0))
                    .trim()
                    .to_string()
            })
            .find(|value| !value.is_empty()),
        _ => None,
    }
}

fn rational(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let value = match &field.value {
        Value::Rational(values) => values.first().map(|value| value.to_f64()),
        Value::SRational(values) => values.first().map(|value| value.to_f64()),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

fn uint(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

/// Fecha EXIF cruda, con el desfase horario anexado cuando existe.
fn dated(exif: &Exif, tag: Tag, offset_tag: Tag) -> Option<String> {
    let date = ascii(exif, tag)?;
    match ascii(exif, offset_tag) {
        Some(offset) => Some(format!("{date}{offset}")),
        None => Some(date),
    }
}

fn gps_coordinate(exif: &Exif, tag: Tag, ref_tag: Tag, negative_ref: &str) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let parts = match &field.value {
        Value::Rational(values) if values.len() >= 3 => values,
        _ => return None,
    };
    let degrees = parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0;
    if !degrees.is_finite() {
        return None;
    }
    let sign = match ascii(exif, ref_tag) {
        Some(reference) if reference.eq_ignore_ascii_case(negative_ref) => -1.0,
        _ => 1.0,
    };
    Some(sign * degrees)
}

fn altitude(exif: &Exif) -> Option<f64> {
    let value = rational(exif, Tag::GPSAltitude)?;
    let below_sea_level = uint(exif, Tag::GPSAltitudeRef) == Some(1);
    Some(if below_sea_level { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::experimental::Writer;
    use exif::{Field, Rational};

    fn ascii_field(tag: Tag, value: &str) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![value.as_bytes().to_vec()]),
        }
    }

    fn rational_field(tag: Tag, values: &[(u32, u32)]) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Rational(values.iter().map(|&pair| Rational::from(pair)).collect()),
        }
    }

    /// Construye un JPEG mínimo con un segmento APP1 que contiene los campos dados.
    pub(crate) fn jpeg_with_exif(fields: &[Field]) -> Vec<u8> {
        let mut writer = Writer::new();
        for field in fields {
            writer.push_field(field);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).expect("escritura TIFF");
        let tiff = tiff.into_inner();

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        let length = (2 + 6 + tiff.len()) as u16;
        jpeg.extend_from_slice(&length.to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    #[test]
    fn jpeg_without_exif_yields_empty_tags() {
        let tags = extract_image_metadata(&[0xFF, 0xD8, 0xFF, 0xD9]).expect("jpeg válido");
        assert_eq!(tags, ImageTags::default());
    }

    #[test]
    fn gif_is_not_an_exif_container() {
        let tags = extract_image_metadata(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;")
            .expect("gif no debería fallar");
        assert_eq!(tags, ImageTags::default());
    }

    #[test]
    fn garbage_is_a_decode_failure() {
        assert!(extract_image_metadata(b"definitely not an image").is_err());
    }

    #[test]
    fn reads_camera_settings_and_gps() {
        let fields = vec![
            ascii_field(Tag::Make, "Canon"),
            ascii_field(Tag::Model, "EOS 5D"),
            rational_field(Tag::ExposureTime, &[(1, 250)]),
            rational_field(Tag::FNumber, &[(28, 10)]),
            Field {
                tag: Tag::PhotographicSensitivity,
                ifd_num: In::PRIMARY,
                value: Value::Short(vec![400]),
            },
            ascii_field(Tag::DateTimeOriginal, "2023:07:14 18:30:00"),
            ascii_field(Tag::GPSLatitudeRef, "S"),
            rational_field(Tag::GPSLatitude, &[(33, 1), (30, 1), (0, 1)]),
            ascii_field(Tag::GPSLongitudeRef, "E"),
            rational_field(Tag::GPSLongitude, &[(151, 1), (12, 1), (36, 1)]),
        ];

        let tags = extract_image_metadata(&jpeg_with_exif(&fields)).expect("exif válido");

        assert_eq!(tags.make.as_deref(), Some("Canon"));
        assert_eq!(tags.model.as_deref(), Some("EOS 5D"));
        assert_eq!(tags.exposure_time, Some(1.0 / 250.0));
        assert_eq!(tags.f_number, Some(2.8));
        assert_eq!(tags.iso, Some(400));
        assert_eq!(tags.date_taken.as_deref(), Some("2023:07:14 18:30:00"));
        assert_eq!(tags.latitude, Some(-33.5));
        let longitude = tags.longitude.expect("longitud");
        assert!((longitude - 151.21).abs() < 1e-9);
    }

    #[test]
    fn damaged_field_keeps_the_valid_ones() {
        let fields = vec![
            ascii_field(Tag::Make, "Canon"),
            ascii_field(Tag::Model, "EOS 5D Mark IV"),
        ];
        let mut jpeg = jpeg_with_exif(&fields);
        // Entrada IFD de Model (0x0110, ASCII) en orden big-endian.
        let entry = jpeg
            .windows(4)
            .position(|window| window == [0x01, 0x10, 0x00, 0x02])
            .expect("entrada de Model");
        jpeg[entry + 8..entry + 12].copy_from_slice(&0xFFFF_FF00_u32.to_be_bytes());

        let tags = extract_image_metadata(&jpeg).expect("EXIF parcial no es un error");

        assert_eq!(tags.make.as_deref(), Some("Canon"));
        assert_eq!(tags.model, None);
    }
}
