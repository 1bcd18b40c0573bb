//! Attachment normalization: classify uploads and decide which files are accepted.

/// Accepted extensions and the MIME type a file with that extension is stored and served as.
const KNOWN_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("pdf", "application/pdf"),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("odp", "application/vnd.oasis.opendocument.presentation"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("md", "text/markdown"),
    ("rtf", "application/rtf"),
    ("zip", "application/zip"),
    ("rar", "application/vnd.rar"),
    ("7z", "application/x-7z-compressed"),
    ("tar", "application/x-tar"),
    ("gz", "application/gzip"),
    ("webm", "audio/webm"),
    ("ogg", "audio/ogg"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("wav", "audio/wav"),
];

const RASTER_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png"];

// Browser voice recorders upload blobs without a usable file name.
const AUDIO_MIME_TYPES: &[&str] = &[
    "audio/webm",
    "audio/ogg",
    "audio/mpeg",
    "audio/mp4",
    "audio/x-m4a",
    "audio/wav",
    "audio/x-wav",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    File,
    Image,
    Voice,
}

/// An accepted file: its kind and the MIME type to store and serve it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFile {
    pub kind: AttachmentKind,
    pub mime_type: String,
}

/// Classify a file by its MIME type.
pub fn classify(mime_type: &str) -> AttachmentKind {
    let essence = mime_essence(mime_type);
    if essence.starts_with("image/") {
        AttachmentKind::Image
    } else if essence.starts_with("audio/") {
        AttachmentKind::Voice
    } else {
        AttachmentKind::File
    }
}

/// Lowercased file extension, if the name has one.
pub fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 10 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn known_type(ext: &str) -> Option<&'static str> {
    KNOWN_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Accept or reject an upload. A known extension fixes the stored MIME type; the declared
/// type may be generic but must not claim another kind or a non-raster image or unknown
/// audio format. Files without a known extension are accepted only as voice recordings.
pub fn normalize(filename: &str, declared_mime: &str) -> Option<NormalizedFile> {
    let declared = mime_essence(declared_mime);

    let Some(canonical) = extension(filename).and_then(|ext| known_type(&ext)) else {
        return AUDIO_MIME_TYPES
            .contains(&declared.as_str())
            .then(|| NormalizedFile {
                kind: AttachmentKind::Voice,
                mime_type: declared,
            });
    };

    let kind = classify(canonical);
    if !declared.is_empty() && declared != "application/octet-stream" {
        let consistent = match classify(&declared) {
            claimed if claimed != kind => false,
            AttachmentKind::Image => RASTER_IMAGE_TYPES.contains(&declared.as_str()),
            AttachmentKind::Voice => AUDIO_MIME_TYPES.contains(&declared.as_str()),
            AttachmentKind::File => true,
        };
        if !consistent {
            return None;
        }
    }

    Some(NormalizedFile {
        kind,
        mime_type: canonical.to_string(),
    })
}

/// Types a browser may render in place. Everything else is served as a download.
pub fn is_inline_safe(mime_type: &str) -> bool {
    let essence = mime_essence(mime_type);
    RASTER_IMAGE_TYPES.contains(&essence.as_str()) || AUDIO_MIME_TYPES.contains(&essence.as_str())
}

/// Duration is only meaningful for voice notes; negative or non-finite values are dropped.
pub fn normalize_duration(kind: AttachmentKind, duration: Option<f64>) -> Option<f64> {
    match (kind, duration) {
        (AttachmentKind::Voice, Some(d)) if d.is_finite() && d >= 0.0 => Some(d),
        _ => None,
    }
}

fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
