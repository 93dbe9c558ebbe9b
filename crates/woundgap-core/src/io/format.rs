use std::path::Path;

use crate::error::{AnalysisError, Result};

/// Container class of an input, resolved once before decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// JPEG / PNG / JPEG 2000: exactly one frame.
    StillImage,
    /// TIFF: one frame per page.
    MultiPage,
    /// Nikon ND2: one frame per stored plane.
    Microscopy,
    /// ZIP: every image member is its own source.
    Archive,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StillImage => write!(f, "Still Image"),
            Self::MultiPage => write!(f, "Multi-page TIFF"),
            Self::Microscopy => write!(f, "ND2 Microscopy"),
            Self::Archive => write!(f, "ZIP Archive"),
        }
    }
}

pub const STILL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "jp2"];
pub const MULTI_PAGE_EXTENSIONS: &[&str] = &["tif", "tiff"];
pub const MICROSCOPY_EXTENSIONS: &[&str] = &["nd2"];
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const JP2_MAGIC: &[u8] = &[0x00, 0x00, 0x00, 0x0C, b'j', b'P', b' ', b' '];
const J2K_CODESTREAM_MAGIC: &[u8] = &[0xFF, 0x4F, 0xFF, 0x51];
const TIFF_LE_MAGIC: &[u8] = b"II*\0";
const TIFF_BE_MAGIC: &[u8] = b"MM\0*";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ND2_MAGIC: &[u8] = &[0xDA, 0xCE, 0xBE, 0x0A];

/// Lowercased extension of a file name, if any.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn kind_from_extension(name: &str) -> Option<SourceKind> {
    let ext = extension_of(name)?;
    let ext = ext.as_str();
    if STILL_EXTENSIONS.contains(&ext) {
        Some(SourceKind::StillImage)
    } else if MULTI_PAGE_EXTENSIONS.contains(&ext) {
        Some(SourceKind::MultiPage)
    } else if MICROSCOPY_EXTENSIONS.contains(&ext) {
        Some(SourceKind::Microscopy)
    } else if ARCHIVE_EXTENSIONS.contains(&ext) {
        Some(SourceKind::Archive)
    } else {
        None
    }
}

/// True for names a directory scan should pick up (images and archives).
pub fn is_recognized_name(name: &str) -> bool {
    kind_from_extension(name).is_some()
}

/// True for names an archive member must carry to be analyzed.
pub fn is_image_name(name: &str) -> bool {
    matches!(
        kind_from_extension(name),
        Some(SourceKind::StillImage | SourceKind::MultiPage | SourceKind::Microscopy)
    )
}

/// Guess the container class from the first bytes of a source.
pub fn sniff(head: &[u8]) -> Option<SourceKind> {
    if head.starts_with(PNG_MAGIC)
        || head.starts_with(JPEG_MAGIC)
        || head.starts_with(JP2_MAGIC)
        || head.starts_with(J2K_CODESTREAM_MAGIC)
    {
        Some(SourceKind::StillImage)
    } else if head.starts_with(TIFF_LE_MAGIC) || head.starts_with(TIFF_BE_MAGIC) {
        Some(SourceKind::MultiPage)
    } else if head.starts_with(ND2_MAGIC) {
        Some(SourceKind::Microscopy)
    } else if head.starts_with(ZIP_MAGIC) {
        Some(SourceKind::Archive)
    } else {
        None
    }
}

/// Resolve the container class: extension first, content sniffing when the
/// extension is missing or unknown.
pub fn classify(name: &str, head: &[u8]) -> Result<SourceKind> {
    kind_from_extension(name)
        .or_else(|| sniff(head))
        .ok_or_else(|| AnalysisError::UnsupportedFormat {
            name: name.to_string(),
        })
}
