use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::frame::RawFrame;

use super::archive;
use super::format::SourceKind;
use super::nd2::Nd2Reader;
use super::source::{InputSource, LoadedSource};
use super::still::decode_still;
use super::tiff_pages::decode_pages;

/// Which stored planes of a multi-plane microscopy file become frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanePolicy {
    /// Every plane, in storage order.
    #[default]
    All,
    /// Only the first plane.
    First,
}

/// A decoded frame, or the reason that frame could not be decoded.
///
/// Slots keep the frame's position in its source even when it fails, so a
/// bad page does not shift the numbering of the pages after it.
pub type FrameSlot = Result<RawFrame>;

/// Decode all frames of a loaded source of a known container class.
///
/// Archives are flattened: the frames of every image member are returned in
/// member order. Failure to open the container at all is returned as `Err`;
/// failures of individual frames are returned as error slots.
pub fn decode_frames(
    source: &LoadedSource,
    kind: SourceKind,
    policy: PlanePolicy,
) -> Result<Vec<FrameSlot>> {
    let slots = match kind {
        SourceKind::StillImage => vec![Ok(decode_still(&source.id, &source.bytes()?)?)],
        SourceKind::MultiPage => decode_pages(&source.id, &source.bytes()?)?,
        SourceKind::Microscopy => {
            let staged = source.stage()?;
            let reader = Nd2Reader::open_as(staged.path(), &source.id)?;
            let slots = reader.frames(policy);
            // The mapping must be released before a staged copy is deleted.
            drop(reader);
            drop(staged);
            slots
        }
        SourceKind::Archive => {
            let mut slots = Vec::new();
            for (member, bytes) in archive::members(&source.id, &source.bytes()?)? {
                let member = bytes.map(|b| LoadedSource::archive_member(&source.id, &member, b));
                match member.and_then(|m| Ok((m.classify()?, m))) {
                    Ok((kind, m)) => match decode_frames(&m, kind, policy) {
                        Ok(frames) => slots.extend(frames),
                        Err(e) => slots.push(Err(e)),
                    },
                    Err(e) => slots.push(Err(e)),
                }
            }
            slots
        }
    };

    if slots.is_empty() {
        return Err(AnalysisError::decode(&source.id, "no frames found"));
    }
    debug!(source = %source.id, %kind, frames = slots.len(), "frames extracted");
    Ok(slots)
}

/// Load, classify and decode a single input.
pub fn extract_frames(source: InputSource, policy: PlanePolicy) -> Result<Vec<FrameSlot>> {
    let loaded = source.load()?;
    let kind = loaded.classify()?;
    decode_frames(&loaded, kind, policy)
}

