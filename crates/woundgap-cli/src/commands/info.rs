use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use woundgap_core::io::{decode_frames, InputSource, PlanePolicy};

#[derive(Args)]
pub struct InfoArgs {
    /// Input image, TIFF stack, ND2 file or ZIP archive
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let source = InputSource::from_path(&args.file)
        .load()
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let kind = source.classify()?;
    let slots = decode_frames(&source, kind, PlanePolicy::All)
        .with_context(|| format!("Failed to decode {}", args.file.display()))?;

    println!("File:        {}", args.file.display());
    println!("Kind:        {}", kind);
    println!("Frames:      {}", slots.len());
    println!();

    for (i, slot) in slots.iter().enumerate() {
        match slot {
            Ok(frame) => {
                let timestamp = frame
                    .metadata
                    .timestamp_ms
                    .map(|t| format!("  t={:.1} ms", t))
                    .unwrap_or_default();
                println!(
                    "  #{:<4} {}x{}x{}  {} ({} bit){}",
                    i + 1,
                    frame.width(),
                    frame.height(),
                    frame.channels(),
                    frame.data.sample_type(),
                    frame.bit_depth,
                    timestamp
                );
            }
            Err(e) => println!("  #{:<4} error: {}", i + 1, e),
        }
    }

    Ok(())
}
