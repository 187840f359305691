use std::error::Error;
use std::fs;
use std::io::{Cursor, Write};

use chrono::{TimeZone, Utc};
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use lopdf::{Dictionary, Document, Object, dictionary};
use metahunter::{
    ExportFormat, ExtractOptions, Extraction, FieldValue, FileHandle, FormatKind, NormalizedResult,
    classify, export_batch, export_to_csv, export_to_json, extract, process_files, run_batch,
};
use tempfile::tempdir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const CORE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>Plan</dc:title>
  <dc:creator>Grace</dc:creator>
  <dcterms:modified xsi:type="dcterms:W3CDTF">2024-06-10T08:00:00+02:00</dcterms:modified>
</cp:coreProperties>"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
  <Application>LibreOffice</Application>
  <Words>250</Words>
</Properties>"#;

fn pdf_document(info: Dictionary, pages: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);
    doc
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serializar PDF");
    bytes
}

fn pdf_bytes(title: &str, pages: usize) -> Vec<u8> {
    save(pdf_document(
        dictionary! { "Title" => Object::string_literal(title) },
        pages,
    ))
}

fn docx_bytes() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<'_, ()>::default().compression_method(CompressionMethod::Stored);
    for (name, contents) in [
        ("docProps/core.xml", CORE_XML),
        ("docProps/app.xml", APP_XML),
        ("word/document.xml", "<w:document/>"),
    ] {
        writer.start_file(name, options).expect("iniciar parte");
        writer.write_all(contents.as_bytes()).expect("escribir parte");
    }
    writer.finish().expect("cerrar zip").into_inner()
}

/// MP3 CBR de 128 kbps y 44.1 kHz con una etiqueta ID3v2.4 que solo define el artista.
fn mp3_bytes(artist: &str, seconds: u64) -> Vec<u8> {
    let mut frame = vec![0x03];
    frame.extend_from_slice(artist.as_bytes());

    let mut bytes = b"ID3\x04\x00\x00".to_vec();
    bytes.extend_from_slice(&synchsafe(10 + frame.len() as u32));
    bytes.extend_from_slice(b"TPE1");
    bytes.extend_from_slice(&synchsafe(frame.len() as u32));
    bytes.extend_from_slice(&[0x00, 0x00]);
    bytes.extend_from_slice(&frame);

    const FRAME_LEN: u64 = 417;
    let frames = (seconds * 128_000 / 8).div_ceil(FRAME_LEN) + 1;
    let mut mpeg_frame = vec![0_u8; FRAME_LEN as usize];
    mpeg_frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    for _ in 0..frames {
        bytes.extend_from_slice(&mpeg_frame);
    }
    bytes
}

fn synchsafe(value: u32) -> [u8; 4] {
    [
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ]
}

fn ascii_field(tag: Tag, value: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![value.as_bytes().to_vec()]),
    }
}

fn rational_field(tag: Tag, numerator: u32, denominator: u32) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![Rational::from((numerator, denominator))]),
    }
}

/// JPEG mínimo: SOI, un APP1 con el bloque EXIF y EOI.
fn jpeg_with_exif(fields: &[Field]) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).expect("escritura TIFF");
    let tiff = tiff.into_inner();

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// Elemento EBML con tamaño de ocho bytes.
fn ebml(id: u32, body: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = id.to_be_bytes().into_iter().skip_while(|byte| *byte == 0).collect();
    out.push(0x01);
    out.extend_from_slice(&(body.len() as u64).to_be_bytes()[1..]);
    out.extend_from_slice(body);
    out
}

/// WebM de 90.5 s con una pista VP9 y otra Opus estéreo a 48 kHz.
fn webm_bytes() -> Vec<u8> {
    let header = ebml(0x1A45DFA3, &ebml(0x4282, b"webm"));
    let info = ebml(
        0x1549A966,
        &[
            ebml(0x2AD7B1, &[0x0F, 0x42, 0x40]),
            ebml(0x4489, &90_500.0_f64.to_be_bytes()),
            ebml(0x7BA9, b"Trailer"),
        ]
        .concat(),
    );
    let video = ebml(0xAE, &[ebml(0x83, &[1]), ebml(0x86, b"V_VP9")].concat());
    let audio = ebml(
        0xAE,
        &[
            ebml(0x83, &[2]),
            ebml(0x86, b"A_OPUS"),
            ebml(
                0xE1,
                &[ebml(0xB5, &48_000.0_f64.to_be_bytes()), ebml(0x9F, &[2])].concat(),
            ),
        ]
        .concat(),
    );
    let tracks = ebml(0x1654AE6B, &[video, audio].concat());
    [header, ebml(0x18538067, &[info, tracks].concat())].concat()
}

fn assert_single_outcome(result: &NormalizedResult) {
    let characterizations = [
        !result.sections().is_empty(),
        result.note().is_some(),
        result.error().is_some(),
    ];
    let count = characterizations.iter().filter(|flag| **flag).count();
    assert!(count <= 1, "{result:?}");
}

#[test]
fn jpeg_without_exif_reports_note() {
    let file = FileHandle::from_bytes("plain.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xD9]);
    let result = extract(&file, &ExtractOptions::default());

    assert_eq!(result.note(), Some("No EXIF data found"));
    assert!(result.sections().is_empty());
    assert!(!result.is_error());
}

#[test]
fn pdf_title_and_page_count() {
    let file = FileHandle::from_bytes("report.pdf", "application/pdf", pdf_bytes("Report", 3));
    let result = extract(&file, &ExtractOptions::default());

    assert_eq!(result.field("document.title"), Some(&FieldValue::from("Report")));
    assert_eq!(result.field("properties.pageCount"), Some(&FieldValue::Integer(3)));
    assert_eq!(result.field("properties.pageSize"), Some(&FieldValue::from("612 x 792 pt")));
    assert_single_outcome(&result);
}

#[test]
fn pdf_without_pages_has_no_page_size() {
    let file = FileHandle::from_bytes("empty.pdf", "", pdf_bytes("Empty", 0));
    let result = extract(&file, &ExtractOptions::default());

    assert_eq!(result.field("document.title"), Some(&FieldValue::from("Empty")));
    assert_eq!(result.field("properties.pageCount"), None);
    assert_eq!(result.field("properties.pageSize"), None);
}

#[test]
fn encrypted_pdf_is_flagged_not_failed() {
    let mut doc = pdf_document(dictionary! { "Title" => Object::string_literal("Locked") }, 1);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0_u8; 32]),
        "U" => Object::string_literal(vec![0_u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    let file = FileHandle::from_bytes("locked.pdf", "application/pdf", save(doc));
    let result = extract(&file, &ExtractOptions::default());

    assert!(!result.is_error());
    assert_eq!(result.field("properties.encrypted"), Some(&FieldValue::Bool(true)));
    assert_single_outcome(&result);
}

#[test]
fn out_of_range_pdf_offset_is_kept_as_text() {
    let raw = "D:20240101000000+99999999'";
    let bytes = save(pdf_document(
        dictionary! {
            "Title" => Object::string_literal("Offsets"),
            "CreationDate" => Object::string_literal(raw),
        },
        1,
    ));
    let inline = ExtractOptions {
        timeout: None,
        ..ExtractOptions::default()
    };

    for options in [inline, ExtractOptions::default()] {
        let file = FileHandle::from_bytes("offsets.pdf", "application/pdf", bytes.clone());
        let result = extract(&file, &options);

        assert!(!result.is_error(), "{result:?}");
        assert_eq!(result.field("dates.created"), Some(&FieldValue::from(raw)));
    }
}

#[test]
fn date_like_title_round_trips_as_text() -> Result<(), Box<dyn Error>> {
    let file = FileHandle::from_bytes(
        "dated.pdf",
        "application/pdf",
        pdf_bytes("2024-01-01T00:00:00+02:00", 1),
    );
    let result = extract(&file, &ExtractOptions::default());
    let artifact = export_to_json(&result, file.name())?;
    let parsed: NormalizedResult = serde_json::from_str(&artifact.contents)?;

    assert_eq!(
        parsed.field("document.title"),
        Some(&FieldValue::from("2024-01-01T00:00:00+02:00"))
    );
    assert_eq!(parsed, result);
    Ok(())
}

#[test]
fn jpeg_exif_camera_and_settings() {
    let bytes = jpeg_with_exif(&[
        ascii_field(Tag::Make, "Nikon"),
        ascii_field(Tag::Model, "Z6"),
        rational_field(Tag::ExposureTime, 1, 250),
        rational_field(Tag::FNumber, 28, 10),
        ascii_field(Tag::DateTimeOriginal, "2023:07:14 18:30:00"),
    ]);
    let file = FileHandle::from_bytes("photo.jpg", "image/jpeg", bytes);
    let result = extract(&file, &ExtractOptions::default());

    assert_eq!(result.field("camera.make"), Some(&FieldValue::from("Nikon")));
    assert_eq!(result.field("camera.model"), Some(&FieldValue::from("Z6")));
    assert_eq!(result.field("settings.exposureTime"), Some(&FieldValue::from("1/250s")));
    assert_eq!(result.field("settings.fNumber"), Some(&FieldValue::from("f/2.8")));
    let taken = result.field("dates.taken").expect("fecha de captura");
    assert_eq!(taken.to_csv_text(), "2023-07-14T18:30:00.000Z");
    assert_single_outcome(&result);
}

#[test]
fn webm_container_duration_and_codecs() {
    let file = FileHandle::from_bytes("clip.webm", "video/webm", webm_bytes());
    assert_eq!(classify(file.declared_type(), file.name()), FormatKind::Video);

    let result = extract(&file, &ExtractOptions::default());

    assert_eq!(result.field("format.container"), Some(&FieldValue::from("WebM")));
    assert_eq!(result.field("format.duration"), Some(&FieldValue::from("1:30")));
    assert_eq!(result.field("format.codec"), Some(&FieldValue::from("V_VP9, A_OPUS")));
    assert_eq!(result.field("format.sampleRate"), Some(&FieldValue::from("48000 Hz")));
    assert_single_outcome(&result);
}

#[test]
fn extraction_without_timeout_stays_total() {
    let options = ExtractOptions {
        timeout: None,
        ..ExtractOptions::default()
    };
    let files = [
        FileHandle::from_bytes("broken.pdf", "application/pdf", b"%PDF-1.7\n%corrupt".to_vec()),
        FileHandle::from_bytes("report.pdf", "application/pdf", pdf_bytes("Report", 2)),
        FileHandle::from_bytes("notes.txt", "text/plain", b"x".to_vec()),
    ];

    let results: Vec<NormalizedResult> = files.iter().map(|file| extract(file, &options)).collect();

    assert!(results[0].is_error());
    assert_eq!(results[1].field("document.title"), Some(&FieldValue::from("Report")));
    assert_eq!(results[2].note(), Some("File type not fully supported yet"));
    for result in &results {
        assert_single_outcome(result);
    }
}

#[test]
fn mp3_duration_and_artist() {
    let file = FileHandle::from_bytes("song.mp3", "audio/mpeg", mp3_bytes("A", 125));
    let result = extract(&file, &ExtractOptions::default());

    assert_eq!(result.field("format.duration"), Some(&FieldValue::from("2:05")));
    assert_eq!(result.field("tags.artist"), Some(&FieldValue::from("A")));
    assert_eq!(result.field("format.sampleRate"), Some(&FieldValue::from("44100 Hz")));
}

#[test]
fn docx_core_and_app_properties() {
    let file = FileHandle::from_bytes("plan.docx", DOCX_MIME, docx_bytes());
    let result = extract(&file, &ExtractOptions::default());

    assert_eq!(result.field("document.title"), Some(&FieldValue::from("Plan")));
    assert_eq!(result.field("document.creator"), Some(&FieldValue::from("Grace")));
    assert_eq!(result.field("application.application"), Some(&FieldValue::from("LibreOffice")));
    assert_eq!(result.field("statistics.words"), Some(&FieldValue::Integer(250)));
    let modified = result.field("dates.modified").expect("fecha de modificación");
    assert_eq!(modified.to_csv_text(), "2024-06-10T06:00:00.000Z");
}

#[test]
fn text_files_are_not_supported_yet() {
    let file = FileHandle::from_bytes("notes.txt", "text/plain", b"hello".to_vec());
    let result = extract(&file, &ExtractOptions::default());

    assert_eq!(result.note(), Some("File type not fully supported yet"));
    assert!(result.sections().is_empty());
    assert!(result.error().is_none());
}

#[test]
fn classification_uses_only_declared_type_and_extension() {
    assert_eq!(classify("", "clip.WEBM"), FormatKind::Video);
    assert_eq!(classify("image/png", "scan.pdf"), FormatKind::Image);
    assert_eq!(classify("application/octet-stream", "deck.pptx"), FormatKind::OfficePptx);
}

#[test]
fn batch_isolates_corrupted_pdf() {
    let files = vec![
        FileHandle::from_bytes("first.pdf", "application/pdf", pdf_bytes("One", 1)),
        FileHandle::from_bytes("broken.pdf", "application/pdf", b"%PDF-1.7\n%corrupt".to_vec()),
        FileHandle::from_bytes("third.docx", DOCX_MIME, docx_bytes()),
    ];

    let entries: Vec<_> = run_batch(&files, &ExtractOptions::default()).collect();

    assert_eq!(entries.len(), 3);
    assert!(!entries[0].result.sections().is_empty());
    assert!(entries[1].result.is_error());
    assert!(entries[1].result.sections().is_empty());
    assert_eq!(entries[1].result.file_info.name, "broken.pdf");
    assert!(!entries[2].result.sections().is_empty());
    for entry in &entries {
        assert_single_outcome(&entry.result);
    }
}

#[test]
fn json_export_round_trips_for_every_outcome() -> Result<(), Box<dyn Error>> {
    let files = vec![
        FileHandle::from_bytes("report.pdf", "application/pdf", pdf_bytes("Report", 2)),
        FileHandle::from_bytes("song.mp3", "audio/mpeg", mp3_bytes("A", 10)),
        FileHandle::from_bytes("notes.txt", "text/plain", b"x".to_vec()),
        FileHandle::from_bytes("broken.docx", DOCX_MIME, b"not a zip".to_vec()),
    ];

    for file in &files {
        let result = extract(file, &ExtractOptions::default());
        let artifact = export_to_json(&result, file.name())?;
        let parsed: NormalizedResult = serde_json::from_str(&artifact.contents)?;
        assert_eq!(parsed, result, "{}", file.name());
    }
    Ok(())
}

#[test]
fn csv_export_lists_every_leaf() -> Result<(), Box<dyn Error>> {
    let modified = Utc.with_ymd_and_hms(2024, 6, 11, 9, 15, 0).unwrap();
    let file = FileHandle::from_bytes("plan.docx", DOCX_MIME, docx_bytes())
        .with_last_modified(modified);
    let result = extract(&file, &ExtractOptions::default());
    let csv = export_to_csv(&result, file.name())?;

    assert_eq!(csv.file_name, "plan_metadata.csv");
    assert!(csv.contents.starts_with("Property,Value\n"));
    assert!(csv.contents.contains("fileInfo.lastModified,2024-06-11T09:15:00.000Z\n"));
    assert!(csv.contents.contains("document.title,Plan\n"));
    assert!(csv.contents.contains("statistics.words,250\n"));
    Ok(())
}

#[test]
fn process_files_writes_batch_exports() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let files = vec![
        FileHandle::from_bytes("a.pdf", "application/pdf", pdf_bytes("A", 1)),
        FileHandle::from_bytes("b.txt", "text/plain", b"b".to_vec()),
    ];

    let mut progress = Vec::new();
    let extraction = process_files(&files, &ExtractOptions::default(), |p| {
        progress.push(p.current)
    });
    let Extraction::Batch(entries) = extraction else {
        panic!("se esperaba un lote");
    };
    assert_eq!(progress, vec![1, 2]);

    let path = export_batch(&entries, ExportFormat::Json)?.write_to(dir.path())?;
    assert!(path.ends_with("batch_metadata.json"));
    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    assert_eq!(parsed[0]["fileName"], "a.pdf");
    assert_eq!(parsed[0]["metadata"]["document"]["title"], "A");
    assert_eq!(parsed[1]["fileType"], "text/plain");
    Ok(())
}

#[test]
fn from_path_builds_handles_for_local_files() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("scan.pdf");
    fs::write(&path, pdf_bytes("Scan", 1))?;

    let file = FileHandle::from_path(&path)?;
    let result = extract(&file, &ExtractOptions::default());

    assert_eq!(file.declared_type(), "application/pdf");
    assert_eq!(result.field("document.title"), Some(&FieldValue::from("Scan")));
    Ok(())
}
