use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::error::Result;
use crate::segment::ScratchMask;

/// `<source>_frame<NNNN>.png`, with the path separators of the source
/// identifier flattened to `_` so every mask lands directly in one directory.
pub fn mask_file_name(source: &str, frame: usize) -> String {
    let flat: String = source
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();
    format!("{flat}_frame{frame:04}.png")
}

/// Write a frame's mask into `dir` and return the file's path.
pub fn save_mask(mask: &ScratchMask, dir: &Path, source: &str, frame: usize) -> Result<PathBuf> {
    let path = dir.join(mask_file_name(source, frame));
    mask.to_image().save_with_format(&path, ImageFormat::Png)?;
    Ok(path)
}
