use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::{Array3, Axis};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::frame::{RawFrame, SampleData};

use super::extract::{FrameSlot, PlanePolicy};

pub const CHUNK_MAGIC: u32 = 0x0ABE_CEDA;
pub const CHUNK_HEADER_SIZE: usize = 16;
pub const CHUNK_MAP_SIGNATURE: &[u8; 32] = b"ND2 CHUNK MAP SIGNATURE 0000001!";
pub const ATTRIBUTES_CHUNK: &str = "ImageAttributesLV!";
pub const IMAGE_DATA_PREFIX: &str = "ImageDataSeq|";
/// Every image chunk starts with an f64 acquisition time in milliseconds.
pub const TIMESTAMP_SIZE: usize = 8;
/// Headers claiming more channels per pixel than this are treated as corrupt.
pub const MAX_COMPONENTS: u32 = 64;

const CHUNK_MAP_TRAILER_SIZE: usize = 40;
const LEGACY_JP2_SIGNATURE: &[u8] = &[0x00, 0x00, 0x00, 0x0C, b'j', b'P', b' ', b' '];

/// Frame geometry from the `ImageAttributesLV!` chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct Nd2Attributes {
    pub width: u32,
    pub height: u32,
    pub components: u32,
    pub bits_in_memory: u32,
    pub bits_significant: u32,
    /// Row stride in bytes when rows are padded.
    pub width_bytes: Option<u32>,
    pub sequence_count: u32,
}

impl Nd2Attributes {
    pub fn bytes_per_sample(&self) -> usize {
        match self.bits_in_memory {
            0..=8 => 1,
            9..=16 => 2,
            _ => 4,
        }
    }

    /// Bytes of one unpadded row. `None` when the geometry overflows.
    pub fn row_bytes(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.components as usize)?
            .checked_mul(self.bytes_per_sample())
    }

    pub fn row_stride(&self) -> Option<usize> {
        match self.width_bytes {
            Some(bytes) => Some(bytes as usize),
            None => self.row_bytes(),
        }
    }

    /// Bytes of one image chunk payload: timestamp plus all (padded) rows.
    pub fn chunk_bytes(&self) -> Option<usize> {
        self.row_stride()?
            .checked_mul(self.height as usize)?
            .checked_add(TIMESTAMP_SIZE)
    }

    fn check(&self) -> io::Result<()> {
        if self.width == 0 || self.height == 0 || self.components == 0 {
            return Err(invalid(format!(
                "invalid plane geometry {}x{}x{}",
                self.width, self.height, self.components
            )));
        }
        if self.components > MAX_COMPONENTS {
            return Err(invalid(format!(
                "{} components per pixel exceeds the limit of {MAX_COMPONENTS}",
                self.components
            )));
        }
        let row = self
            .row_bytes()
            .ok_or_else(|| invalid("row size overflows"))?;
        let stride = self
            .row_stride()
            .ok_or_else(|| invalid("row size overflows"))?;
        if stride < row {
            return Err(invalid(format!("row stride {stride} shorter than row ({row})")));
        }
        self.chunk_bytes()
            .ok_or_else(|| invalid("plane size overflows"))?;
        Ok(())
    }

    /// Frames produced per image chunk: one for mono or color, one per
    /// component for other multichannel layouts.
    pub fn frames_per_sequence(&self) -> usize {
        match self.components {
            1 | 3 | 4 => 1,
            n => n as usize,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ChunkLocation {
    offset: usize,
}

/// Memory-mapped Nikon ND2 (v3 chunked layout) reader.
pub struct Nd2Reader {
    mmap: Mmap,
    name: String,
    pub attributes: Nd2Attributes,
    /// Image chunks in storage order (sorted by sequence number).
    images: Vec<(u32, ChunkLocation)>,
}

impl Nd2Reader {
    /// Open an ND2 file, naming errors after the file itself.
    pub fn open(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::open_as(path, &name)
    }

    /// Open an ND2 file whose errors should carry `name` (used for staged copies).
    pub fn open_as(path: &Path, name: &str) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.starts_with(LEGACY_JP2_SIGNATURE) {
            return Err(AnalysisError::decode(
                name,
                "legacy JPEG2000-based ND2 files are not supported",
            ));
        }

        let (attributes, images) =
            parse_layout(&mmap).map_err(|e| AnalysisError::decode(name, e))?;

        debug!(
            source = name,
            width = attributes.width,
            height = attributes.height,
            components = attributes.components,
            chunks = images.len(),
            "ND2 layout parsed"
        );

        Ok(Self {
            mmap,
            name: name.to_string(),
            attributes,
            images,
        })
    }

    pub fn sequence_count(&self) -> usize {
        self.images.len()
    }

    pub fn plane_count(&self) -> usize {
        self.images.len() * self.attributes.frames_per_sequence()
    }

    /// Decode one image chunk into its frame(s).
    pub fn read_sequence(&self, index: usize) -> Result<Vec<RawFrame>> {
        let (_, location) = self.images.get(index).ok_or_else(|| {
            AnalysisError::decode(
                &self.name,
                format!("image chunk {index} out of range (total: {})", self.images.len()),
            )
        })?;
        let data = read_chunk(&self.mmap, location.offset)
            .map_err(|e| AnalysisError::decode(&self.name, e))?;
        decode_sequence(data, &self.attributes).map_err(|e| {
            AnalysisError::decode(&self.name, format!("image chunk {}: {e}", index + 1))
        })
    }

    /// All planes in storage order, or only the first under `PlanePolicy::First`.
    ///
    /// A chunk that fails to decode yields one error slot per plane it would
    /// have produced.
    pub fn frames(&self, policy: PlanePolicy) -> Vec<FrameSlot> {
        let per_sequence = self.attributes.frames_per_sequence();
        let mut slots: Vec<FrameSlot> = Vec::new();

        for index in 0..self.images.len() {
            match self.read_sequence(index) {
                Ok(frames) => {
                    for mut frame in frames {
                        frame.metadata.plane_index = slots.len();
                        slots.push(Ok(frame));
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    slots.push(Err(e));
                    for _ in 1..per_sequence {
                        slots.push(Err(AnalysisError::decode(&self.name, &reason)));
                    }
                }
            }
            if policy == PlanePolicy::First {
                slots.truncate(1);
                break;
            }
        }
        slots
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn parse_layout(buf: &[u8]) -> io::Result<(Nd2Attributes, Vec<(u32, ChunkLocation)>)> {
    if buf.len() < 4 || Cursor::new(buf).read_u32::<LittleEndian>()? != CHUNK_MAGIC {
        return Err(invalid("missing ND2 chunk signature"));
    }

    let chunk_map = parse_chunk_map(buf)?;

    let attributes_at = chunk_map
        .get(ATTRIBUTES_CHUNK)
        .ok_or_else(|| invalid("missing image attributes chunk"))?;
    let lv = parse_lv(read_chunk(buf, attributes_at.offset)?, Some(1))?;
    let attributes = attributes_from_lv(&lv)?;

    let mut images: Vec<(u32, ChunkLocation)> = chunk_map
        .iter()
        .filter_map(|(name, loc)| {
            let seq = name.strip_prefix(IMAGE_DATA_PREFIX)?.strip_suffix('!')?;
            Some((seq.parse().ok()?, *loc))
        })
        .collect();
    images.sort_by_key(|(seq, _)| *seq);

    if images.is_empty() {
        return Err(invalid("no image planes in file"));
    }
    Ok((attributes, images))
}

/// Locate chunks through the trailing map: `<signature><u64 map offset>`.
fn parse_chunk_map(buf: &[u8]) -> io::Result<BTreeMap<String, ChunkLocation>> {
    if buf.len() < CHUNK_MAP_TRAILER_SIZE {
        return Err(invalid("file too small for ND2 chunk map"));
    }
    let trailer = &buf[buf.len() - CHUNK_MAP_TRAILER_SIZE..];
    if &trailer[..32] != CHUNK_MAP_SIGNATURE {
        return Err(invalid("missing chunk map signature"));
    }
    let map_offset = Cursor::new(&trailer[32..]).read_u64::<LittleEndian>()? as usize;
    let entries = read_chunk(buf, map_offset)?;

    let mut map = BTreeMap::new();
    let mut pos = 0usize;
    while pos < entries.len() {
        let bang = entries[pos..]
            .iter()
            .position(|&b| b == b'!')
            .ok_or_else(|| invalid("unterminated chunk map entry"))?;
        let name = &entries[pos..=pos + bang];
        if name == CHUNK_MAP_SIGNATURE {
            break;
        }
        pos += bang + 1;
        let mut cursor = Cursor::new(&entries[pos..]);
        let offset = cursor.read_u64::<LittleEndian>()? as usize;
        let _size = cursor.read_u64::<LittleEndian>()?;
        pos += 16;
        map.insert(
            String::from_utf8_lossy(name).into_owned(),
            ChunkLocation { offset },
        );
    }
    Ok(map)
}

/// Payload of the chunk whose header starts at `offset`.
///
/// Header: magic (u32), name length (u32), data length (u64), then the name.
fn read_chunk(buf: &[u8], offset: usize) -> io::Result<&[u8]> {
    let header = buf
        .get(offset..offset.saturating_add(CHUNK_HEADER_SIZE))
        .ok_or_else(|| invalid(format!("chunk header at {offset} past end of file")))?;
    let mut cursor = Cursor::new(header);
    if cursor.read_u32::<LittleEndian>()? != CHUNK_MAGIC {
        return Err(invalid(format!("bad chunk magic at {offset}")));
    }
    let name_len = cursor.read_u32::<LittleEndian>()? as usize;
    let data_len = cursor.read_u64::<LittleEndian>()? as usize;

    let start = (offset + CHUNK_HEADER_SIZE).saturating_add(name_len);
    buf.get(start..start.saturating_add(data_len))
        .ok_or_else(|| invalid(format!("chunk at {offset} truncated")))
}

fn decode_sequence(data: &[u8], attrs: &Nd2Attributes) -> io::Result<Vec<RawFrame>> {
    let h = attrs.height as usize;
    let w = attrs.width as usize;
    let c = attrs.components as usize;
    let bps = attrs.bytes_per_sample();

    attrs.check()?;
    let stride = attrs.row_stride().ok_or_else(|| invalid("row size overflows"))?;
    let needed = attrs
        .chunk_bytes()
        .ok_or_else(|| invalid("plane size overflows"))?;
    if data.len() < needed {
        return Err(invalid(format!(
            "plane truncated: expected {needed} bytes, got {}",
            data.len()
        )));
    }

    let timestamp = Cursor::new(data).read_f64::<LittleEndian>()?;
    let pixels = &data[TIMESTAMP_SIZE..];
    let sample_at = |row: usize, col: usize, ch: usize| {
        let idx = row * stride + (col * c + ch) * bps;
        &pixels[idx..idx + bps]
    };

    let samples = match bps {
        1 => SampleData::U8(Array3::from_shape_fn((h, w, c), |(r, x, ch)| sample_at(r, x, ch)[0])),
        2 => SampleData::U16(Array3::from_shape_fn((h, w, c), |(r, x, ch)| {
            let s = sample_at(r, x, ch);
            u16::from_le_bytes([s[0], s[1]])
        })),
        _ => SampleData::F32(Array3::from_shape_fn((h, w, c), |(r, x, ch)| {
            let s = sample_at(r, x, ch);
            f32::from_le_bytes([s[0], s[1], s[2], s[3]])
        })),
    };

    let bit_depth = match samples {
        SampleData::U8(_) => 8,
        SampleData::U16(_) => attrs.bits_significant.clamp(9, 16) as u8,
        SampleData::F32(_) => 32,
    };

    let frames = if attrs.frames_per_sequence() == 1 {
        vec![RawFrame::new(samples, bit_depth)]
    } else {
        split_components(samples)
            .into_iter()
            .map(|s| RawFrame::new(s, bit_depth))
            .collect()
    };

    Ok(frames
        .into_iter()
        .map(|mut f| {
            f.metadata.timestamp_ms = Some(timestamp);
            f
        })
        .collect())
}

fn split_components(samples: SampleData) -> Vec<SampleData> {
    fn split<T: Clone>(a: &Array3<T>) -> Vec<Array3<T>> {
        a.axis_iter(Axis(2))
            .map(|plane| plane.to_owned().insert_axis(Axis(2)))
            .collect()
    }
    match samples {
        SampleData::U8(a) => split(&a).into_iter().map(SampleData::U8).collect(),
        SampleData::U16(a) => split(&a).into_iter().map(SampleData::U16).collect(),
        SampleData::F32(a) => split(&a).into_iter().map(SampleData::F32).collect(),
    }
}

// ---------------------------------------------------------------------------
// LV ("lite variant") metadata trees
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum LvValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Level(Vec<(String, LvValue)>),
}

impl LvValue {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::UInt(v) => Some(v),
            Self::Int(v) if v >= 0 => Some(v as u64),
            Self::Float(v) if v >= 0.0 => Some(v as u64),
            _ => None,
        }
    }
}

/// Depth-first lookup of the first item called `key`.
pub fn lv_find<'a>(items: &'a [(String, LvValue)], key: &str) -> Option<&'a LvValue> {
    items.iter().find_map(|(name, value)| {
        if name == key {
            Some(value)
        } else if let LvValue::Level(children) = value {
            lv_find(children, key)
        } else {
            None
        }
    })
}

/// Parse up to `count` LV items (all of `buf` when `None`).
///
/// Item: type (u8), name length in UTF-16 units (u8), UTF-16LE name with
/// terminator, then the value. A level (type 11) stores its child count (u32)
/// and its byte length counted from the item start (u64), the children, and
/// one u64 offset per child.
pub fn parse_lv(buf: &[u8], count: Option<usize>) -> io::Result<Vec<(String, LvValue)>> {
    let mut cursor = Cursor::new(buf);
    let mut items = Vec::new();

    loop {
        if count.is_some_and(|c| items.len() >= c) {
            break;
        }
        let start = cursor.position() as usize;
        if start >= buf.len() {
            break;
        }

        let kind = cursor.read_u8()?;
        let name_units = cursor.read_u8()? as usize;
        let name = read_utf16(&mut cursor, name_units)?;

        let value = match kind {
            1 => LvValue::Bool(cursor.read_u8()? != 0),
            2 => LvValue::Int(cursor.read_i32::<LittleEndian>()? as i64),
            3 => LvValue::UInt(cursor.read_u32::<LittleEndian>()? as u64),
            4 => LvValue::Int(cursor.read_i64::<LittleEndian>()?),
            5 | 7 => LvValue::UInt(cursor.read_u64::<LittleEndian>()?),
            6 => LvValue::Float(cursor.read_f64::<LittleEndian>()?),
            8 => LvValue::Text(read_utf16_z(&mut cursor)?),
            9 => {
                let len = cursor.read_u64::<LittleEndian>()?;
                let remaining = (buf.len() as u64).saturating_sub(cursor.position());
                if len > remaining {
                    return Err(invalid(format!(
                        "byte array {name} of {len} bytes runs past its parent ({remaining} left)"
                    )));
                }
                let mut bytes = vec![0u8; len as usize];
                cursor.read_exact(&mut bytes)?;
                LvValue::Bytes(bytes)
            }
            11 => {
                let children = cursor.read_u32::<LittleEndian>()? as usize;
                let length = cursor.read_u64::<LittleEndian>()? as usize;
                let begin = cursor.position() as usize;
                let nested_len = length
                    .checked_sub(begin - start)
                    .ok_or_else(|| invalid(format!("level {name} shorter than its header")))?;
                let end = begin
                    .checked_add(nested_len)
                    .filter(|&e| e <= buf.len())
                    .ok_or_else(|| invalid(format!("level {name} runs past its parent")))?;
                let nested = parse_lv(&buf[begin..end], Some(children))?;
                cursor.set_position(end.saturating_add(children.saturating_mul(8)) as u64);
                LvValue::Level(nested)
            }
            other => return Err(invalid(format!("unknown LV item type {other} ({name})"))),
        };
        items.push((name, value));
    }
    Ok(items)
}

fn read_utf16(cursor: &mut Cursor<&[u8]>, units: usize) -> io::Result<String> {
    let mut raw = Vec::with_capacity(units);
    for _ in 0..units {
        raw.push(cursor.read_u16::<LittleEndian>()?);
    }
    Ok(String::from_utf16_lossy(&raw).trim_end_matches('\0').to_string())
}

fn read_utf16_z(cursor: &mut Cursor<&[u8]>) -> io::Result<String> {
    let mut raw = Vec::new();
    loop {
        let unit = cursor.read_u16::<LittleEndian>()?;
        if unit == 0 {
            break;
        }
        raw.push(unit);
    }
    Ok(String::from_utf16_lossy(&raw))
}

fn attributes_from_lv(items: &[(String, LvValue)]) -> io::Result<Nd2Attributes> {
    // out-of-range values saturate so that `check` rejects them
    let get = |key: &str| {
        lv_find(items, key)
            .and_then(LvValue::as_u64)
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
    };
    let required =
        |key: &str| get(key).ok_or_else(|| invalid(format!("image attribute {key} missing")));

    let bits_in_memory = required("uiBpcInMemory")?;
    let attributes = Nd2Attributes {
        width: required("uiWidth")?,
        height: required("uiHeight")?,
        components: get("uiComp").unwrap_or(1),
        bits_in_memory,
        bits_significant: get("uiBpcSignificant").unwrap_or(bits_in_memory),
        width_bytes: get("uiWidthBytes").filter(|&b| b > 0),
        sequence_count: get("uiSequenceCount").unwrap_or(0),
    };
    attributes.check()?;
    Ok(attributes)
}
