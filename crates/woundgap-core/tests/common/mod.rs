use std::io::{Cursor, Write};
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat};
use ndarray::Array2;
use woundgap_core::io::nd2::{CHUNK_MAGIC, CHUNK_MAP_SIGNATURE};

/// Deterministic pseudo-random bytes (64-bit LCG, high byte).
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u8(&mut self) -> u8 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 56) as u8
    }
}

/// Left `flat_cols` columns constant at `flat_value`, the rest random noise.
///
/// Mimics a scratch (smooth, left) next to a cell-covered region (textured).
pub fn half_flat_image(width: usize, height: usize, flat_cols: usize, seed: u64) -> Array2<u8> {
    let mut rng = Lcg::new(seed);
    Array2::from_shape_fn((height, width), |(_, col)| {
        let noise = rng.next_u8();
        if col < flat_cols {
            128
        } else {
            noise
        }
    })
}

/// Random noise everywhere.
pub fn noise_image(width: usize, height: usize, seed: u64) -> Array2<u8> {
    half_flat_image(width, height, 0, seed)
}

pub fn to_gray_image(data: &Array2<u8>) -> GrayImage {
    let (h, w) = data.dim();
    GrayImage::from_fn(w as u32, h as u32, |x, y| image::Luma([data[[y as usize, x as usize]]]))
}

/// Encode an 8-bit gray frame as PNG.
pub fn encode_png(data: &Array2<u8>) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(to_gray_image(data))
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode PNG");
    buf.into_inner()
}

/// Uniform gray PNG.
pub fn uniform_png(width: usize, height: usize, value: u8) -> Vec<u8> {
    encode_png(&Array2::from_elem((height, width), value))
}

// ---------------------------------------------------------------------------
// TIFF
// ---------------------------------------------------------------------------

/// A page of a hand-built TIFF.
pub enum TiffPage {
    Gray8(Array2<u8>),
    /// Valid IFD whose strip points past the end of the file.
    BrokenStrip { width: u32, height: u32 },
}

/// Build a little-endian, uncompressed, single-strip-per-page gray8 TIFF.
pub fn build_tiff(pages: &[TiffPage]) -> Vec<u8> {
    const ENTRY_COUNT: u16 = 9;
    const IFD_SIZE: u32 = 2 + ENTRY_COUNT as u32 * 12 + 4;

    let mut buf = Vec::new();
    buf.extend_from_slice(b"II");
    buf.extend_from_slice(&42u16.to_le_bytes());
    // first IFD offset, patched below
    buf.extend_from_slice(&0u32.to_le_bytes());
    let mut link_at = 4usize;

    for page in pages {
        let (width, height, strip_offset) = match page {
            TiffPage::Gray8(data) => {
                let (h, w) = data.dim();
                let offset = buf.len() as u32;
                buf.extend(data.iter().copied());
                if buf.len() % 2 == 1 {
                    buf.push(0);
                }
                (w as u32, h as u32, offset)
            }
            TiffPage::BrokenStrip { width, height } => (*width, *height, 0x7FFF_0000),
        };

        let ifd_offset = buf.len() as u32;
        buf[link_at..link_at + 4].copy_from_slice(&ifd_offset.to_le_bytes());

        buf.extend_from_slice(&ENTRY_COUNT.to_le_bytes());
        let short = 3u16;
        let long = 4u16;
        let entries: [(u16, u16, u32); ENTRY_COUNT as usize] = [
            (256, long, width),          // ImageWidth
            (257, long, height),         // ImageLength
            (258, short, 8),             // BitsPerSample
            (259, short, 1),             // Compression: none
            (262, short, 1),             // Photometric: BlackIsZero
            (273, long, strip_offset),   // StripOffsets
            (277, short, 1),             // SamplesPerPixel
            (278, long, height),         // RowsPerStrip
            (279, long, width * height), // StripByteCounts
        ];
        for (tag, kind, value) in entries {
            buf.extend_from_slice(&tag.to_le_bytes());
            buf.extend_from_slice(&kind.to_le_bytes());
            buf.extend_from_slice(&1u32.to_le_bytes());
            buf.extend_from_slice(&value.to_le_bytes());
        }
        link_at = buf.len();
        buf.extend_from_slice(&0u32.to_le_bytes());
        debug_assert_eq!(buf.len() as u32, ifd_offset + IFD_SIZE);
    }
    buf
}

// ---------------------------------------------------------------------------
// ND2
// ---------------------------------------------------------------------------

/// An LV item for the ND2 attribute tree.
pub enum Lv {
    U32(&'static str, u32),
    F64(&'static str, f64),
    Text(&'static str, &'static str),
    Level(&'static str, Vec<Lv>),
}

fn lv_name(buf: &mut Vec<u8>, name: &str) {
    let units: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
    buf.push(units.len() as u8);
    for u in units {
        buf.extend_from_slice(&u.to_le_bytes());
    }
}

pub fn encode_lv(items: &[Lv]) -> Vec<u8> {
    let mut buf = Vec::new();
    for item in items {
        match item {
            Lv::U32(name, v) => {
                buf.push(3);
                lv_name(&mut buf, name);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Lv::F64(name, v) => {
                buf.push(6);
                lv_name(&mut buf, name);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Lv::Text(name, s) => {
                buf.push(8);
                lv_name(&mut buf, name);
                for u in s.encode_utf16().chain(std::iter::once(0)) {
                    buf.extend_from_slice(&u.to_le_bytes());
                }
            }
            Lv::Level(name, children) => {
                let start = buf.len();
                buf.push(11);
                lv_name(&mut buf, name);
                let nested = encode_lv(children);
                let header = buf.len() - start + 12;
                buf.extend_from_slice(&(children.len() as u32).to_le_bytes());
                buf.extend_from_slice(&((header + nested.len()) as u64).to_le_bytes());
                buf.extend_from_slice(&nested);
                // per-child offset table, unused by readers of the attributes
                buf.extend(std::iter::repeat(0u8).take(children.len() * 8));
            }
        }
    }
    buf
}

fn nd2_chunk(buf: &mut Vec<u8>, name: &str, data: &[u8]) -> u64 {
    let offset = buf.len() as u64;
    buf.extend_from_slice(&CHUNK_MAGIC.to_le_bytes());
    buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(data.len() as u64).to_le_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(data);
    offset
}

/// Geometry of a synthetic ND2 file.
#[derive(Clone, Copy, Debug)]
pub struct Nd2Spec {
    pub width: u32,
    pub height: u32,
    pub components: u32,
    pub bits_in_memory: u32,
    pub bits_significant: u32,
}

impl Nd2Spec {
    pub fn mono8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            components: 1,
            bits_in_memory: 8,
            bits_significant: 8,
        }
    }

    pub fn bytes_per_plane(&self) -> usize {
        let bps = if self.bits_in_memory <= 8 { 1 } else { 2 };
        (self.width * self.height * self.components) as usize * bps
    }
}

/// Build an ND2 (v3 chunk layout) file. Each entry of `sequences` is the raw
/// interleaved pixel payload of one image chunk (without timestamp).
pub fn build_nd2(spec: Nd2Spec, sequences: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut map: Vec<(String, u64, u64)> = Vec::new();

    nd2_chunk(&mut buf, "ND2 FILE SIGNATURE CHUNK NAME01!", b"Ver3.0");

    let attrs = encode_lv(&[Lv::Level(
        "SLxImageAttributes",
        vec![
            Lv::U32("uiWidth", spec.width),
            Lv::U32("uiHeight", spec.height),
            Lv::U32("uiComp", spec.components),
            Lv::U32("uiBpcInMemory", spec.bits_in_memory),
            Lv::U32("uiBpcSignificant", spec.bits_significant),
            Lv::U32("uiSequenceCount", sequences.len() as u32),
            Lv::F64("dCompressionParam", 0.0),
            Lv::Text("wsCameraName", "synthetic"),
        ],
    )]);
    let at = nd2_chunk(&mut buf, "ImageAttributesLV!", &attrs);
    map.push(("ImageAttributesLV!".into(), at, attrs.len() as u64));

    for (i, pixels) in sequences.iter().enumerate() {
        let mut data = (i as f64 * 250.0).to_le_bytes().to_vec();
        data.extend_from_slice(pixels);
        let name = format!("ImageDataSeq|{i}!");
        let at = nd2_chunk(&mut buf, &name, &data);
        map.push((name, at, data.len() as u64));
    }

    let mut map_data = Vec::new();
    for (name, offset, size) in &map {
        map_data.extend_from_slice(name.as_bytes());
        map_data.extend_from_slice(&offset.to_le_bytes());
        map_data.extend_from_slice(&size.to_le_bytes());
    }
    map_data.extend_from_slice(CHUNK_MAP_SIGNATURE);
    map_data.extend_from_slice(&0u64.to_le_bytes());
    let map_at = nd2_chunk(&mut buf, "ND2 FILEMAP SIGNATURE NAME 0001!", &map_data);

    buf.extend_from_slice(CHUNK_MAP_SIGNATURE);
    buf.extend_from_slice(&map_at.to_le_bytes());
    buf
}

// ---------------------------------------------------------------------------
// ZIP
// ---------------------------------------------------------------------------

/// Stored (uncompressed) ZIP archive; names ending in `/` become directories.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).expect("add directory");
        } else {
            zip.start_file(*name, options).expect("start file");
            zip.write_all(data).expect("write member");
        }
    }
    zip.finish().expect("finish zip").into_inner()
}

pub fn write_file(dir: &Path, relative: &str, bytes: &[u8]) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(path, bytes).expect("write test file");
}
