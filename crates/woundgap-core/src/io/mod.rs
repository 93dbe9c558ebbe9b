pub mod archive;
pub mod extract;
pub mod format;
pub mod nd2;
pub mod source;
pub mod still;
pub mod tiff_pages;

pub use extract::{decode_frames, extract_frames, FrameSlot, PlanePolicy};
pub use format::SourceKind;
pub use source::{InputSource, LoadedSource, SourceData};
