use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::consts::SNIFF_LEN;
use crate::error::{AnalysisError, Result};

use super::format::{classify, extension_of, kind_from_extension, SourceKind};

/// Where the bytes of an input come from.
pub enum SourceData {
    Bytes(Vec<u8>),
    /// Read to the end exactly once, when the source is loaded.
    Reader(Box<dyn Read>),
    Path(PathBuf),
}

impl std::fmt::Debug for SourceData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Reader(_) => write!(f, "Reader"),
            Self::Path(p) => write!(f, "Path({})", p.display()),
        }
    }
}

/// A named input handed to the analyzer.
///
/// The identifier reported for its rows is `prefix/name`, or just `name`
/// when there is no prefix.
#[derive(Debug)]
pub struct InputSource {
    pub prefix: Option<String>,
    pub name: String,
    pub data: SourceData,
}

impl InputSource {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            prefix: None,
            name: name.into(),
            data: SourceData::Bytes(bytes),
        }
    }

    pub fn from_reader(name: impl Into<String>, reader: impl Read + 'static) -> Self {
        Self {
            prefix: None,
            name: name.into(),
            data: SourceData::Reader(Box::new(reader)),
        }
    }

    /// File-backed source named after the path's file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            prefix: None,
            name,
            data: SourceData::Path(path),
        }
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn identifier(&self) -> String {
        join_identifier(self.prefix.as_deref(), &self.name)
    }

    /// Consume the byte source. Readers are drained here; paths stay lazy.
    pub fn load(self) -> Result<LoadedSource> {
        let id = self.identifier();
        let payload = match self.data {
            SourceData::Bytes(bytes) => Payload::Memory(bytes),
            SourceData::Reader(mut reader) => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                Payload::Memory(bytes)
            }
            SourceData::Path(path) => Payload::File(path),
        };
        Ok(LoadedSource {
            id,
            name: self.name,
            payload,
        })
    }
}

/// `prefix/name`, or `name` alone when the prefix is absent or empty.
pub fn join_identifier(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}/{name}"),
        _ => name.to_string(),
    }
}

#[derive(Debug)]
pub enum Payload {
    Memory(Vec<u8>),
    File(PathBuf),
}

/// An input whose bytes are available, either in memory or on disk.
#[derive(Debug)]
pub struct LoadedSource {
    /// Full identifier (prefix + name) used for result rows.
    pub id: String,
    pub name: String,
    pub payload: Payload,
}

impl LoadedSource {
    /// A member extracted from the archive identified by `archive_id`.
    pub fn archive_member(archive_id: &str, member: &str, bytes: Vec<u8>) -> Self {
        Self {
            id: join_identifier(Some(archive_id), member),
            name: member.to_string(),
            payload: Payload::Memory(bytes),
        }
    }

    /// Container class from the extension, sniffing the head when needed.
    pub fn classify(&self) -> Result<SourceKind> {
        if let Some(kind) = kind_from_extension(&self.name) {
            return Ok(kind);
        }
        classify(&self.name, &self.head()?).map_err(|e| match e {
            AnalysisError::UnsupportedFormat { .. } => AnalysisError::UnsupportedFormat {
                name: self.id.clone(),
            },
            other => other,
        })
    }

    fn head(&self) -> Result<Vec<u8>> {
        match &self.payload {
            Payload::Memory(bytes) => Ok(bytes[..bytes.len().min(SNIFF_LEN)].to_vec()),
            Payload::File(path) => {
                let mut head = Vec::with_capacity(SNIFF_LEN);
                File::open(path)?.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
                Ok(head)
            }
        }
    }

    pub fn bytes(&self) -> Result<Cow<'_, [u8]>> {
        match &self.payload {
            Payload::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
            Payload::File(path) => Ok(Cow::Owned(std::fs::read(path)?)),
        }
    }

    /// A filesystem path holding this source's bytes.
    ///
    /// File-backed sources are used in place. In-memory sources are written to
    /// a temporary file that is deleted when the returned guard drops.
    pub fn stage(&self) -> Result<StagedFile<'_>> {
        match &self.payload {
            Payload::File(path) => Ok(StagedFile::InPlace(path)),
            Payload::Memory(bytes) => {
                let staging_err = |source| AnalysisError::Staging {
                    name: self.id.clone(),
                    source,
                };
                let suffix = extension_of(&self.name)
                    .map(|e| format!(".{e}"))
                    .unwrap_or_default();
                let mut file = tempfile::Builder::new()
                    .prefix("woundgap-")
                    .suffix(&suffix)
                    .tempfile()
                    .map_err(staging_err)?;
                file.write_all(bytes).map_err(staging_err)?;
                file.flush().map_err(staging_err)?;
                Ok(StagedFile::Temporary(file))
            }
        }
    }
}

/// Scoped filesystem location of a source.
pub enum StagedFile<'a> {
    InPlace(&'a Path),
    Temporary(NamedTempFile),
}

impl StagedFile<'_> {
    pub fn path(&self) -> &Path {
        match self {
            Self::InPlace(path) => path,
            Self::Temporary(file) => file.path(),
        }
    }
}
