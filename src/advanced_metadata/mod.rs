//! Decodificadores por formato que producen la bolsa de etiquetas nativa de cada archivo.

mod image;
mod matroska;
mod media;
mod office;
mod pdf;

pub use image::{ImageTags, extract_image_metadata};
pub use matroska::extract_matroska_metadata;
pub use media::{MediaTags, extract_media_metadata};
pub use office::{OfficeTags, extract_office_metadata};
pub use pdf::{PdfTags, extract_pdf_metadata};

use crate::error::Result;
use crate::metadata::mime::FormatKind;

/// Etiquetas crudas de un archivo, una variante por familia de decodificador.
#[derive(Clone, Debug, PartialEq)]
pub enum TagBag {
    Image(ImageTags),
    Pdf(PdfTags),
    Office(OfficeTags),
    Media(MediaTags),
}

pub type Decoder = fn(&[u8]) -> Result<TagBag>;

/// Decodificador asociado a un tipo de formato, si existe.
pub fn decoder_for(kind: FormatKind) -> Option<Decoder> {
    let decoder: Decoder = match kind {
        FormatKind::Image => |bytes| extract_image_metadata(bytes).map(TagBag::Image),
        FormatKind::Pdf => |bytes| extract_pdf_metadata(bytes).map(TagBag::Pdf),
        kind if kind.is_office() => |bytes| extract_office_metadata(bytes).map(TagBag::Office),
        FormatKind::Audio | FormatKind::Video => {
            |bytes| extract_media_metadata(bytes).map(TagBag::Media)
        }
        _ => return None,
    };
    Some(decoder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_kind_has_a_decoder() {
        let kinds = [
            FormatKind::Image,
            FormatKind::Pdf,
            FormatKind::OfficeDocx,
            FormatKind::OfficeXlsx,
            FormatKind::OfficePptx,
            FormatKind::Audio,
            FormatKind::Video,
        ];
        for kind in kinds {
            assert!(decoder_for(kind).is_some(), "{kind:?}");
        }
        assert!(decoder_for(FormatKind::Unknown).is_none());
    }
}
