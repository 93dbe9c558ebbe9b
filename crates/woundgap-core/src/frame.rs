use ndarray::{Array2, Array3, Axis};

/// Sample storage of a decoded frame, shape = (height, width, channels).
#[derive(Clone, Debug, PartialEq)]
pub enum SampleData {
    U8(Array3<u8>),
    U16(Array3<u16>),
    F32(Array3<f32>),
}

impl SampleData {
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            Self::U8(a) => a.dim(),
            Self::U16(a) => a.dim(),
            Self::F32(a) => a.dim(),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::U8(_) => SampleType::U8,
            Self::U16(_) => SampleType::U16,
            Self::F32(_) => SampleType::F32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleType {
    U8,
    U16,
    F32,
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::F32 => write!(f, "f32"),
        }
    }
}

/// A single decoded image plane as it came out of its container.
///
/// Channels: 1 = gray, 2 = gray + alpha, 3 = RGB, 4 = RGBA.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub data: SampleData,
    /// Significant bits per sample (8 for u8, 9..=16 for u16, 32 for f32).
    pub bit_depth: u8,
    pub metadata: FrameMetadata,
}

impl RawFrame {
    pub fn new(data: SampleData, bit_depth: u8) -> Self {
        Self {
            data,
            bit_depth,
            metadata: FrameMetadata::default(),
        }
    }

    /// Single-channel 8-bit frame.
    pub fn gray_u8(data: Array2<u8>) -> Self {
        Self::new(SampleData::U8(data.insert_axis(Axis(2))), 8)
    }

    /// Single-channel 16-bit frame with `bit_depth` significant bits.
    pub fn gray_u16(data: Array2<u16>, bit_depth: u8) -> Self {
        Self::new(SampleData::U16(data.insert_axis(Axis(2))), bit_depth)
    }

    /// Single-channel floating point frame.
    pub fn gray_f32(data: Array2<f32>) -> Self {
        Self::new(SampleData::F32(data.insert_axis(Axis(2))), 32)
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn is_color(&self) -> bool {
        self.channels() >= 3
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameMetadata {
    /// Zero-based position of this plane inside its container.
    pub plane_index: usize,
    /// Acquisition time in milliseconds, when the container records one.
    pub timestamp_ms: Option<f64>,
}

/// Single-channel frame with samples in the 8-bit range.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedFrame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<u8>,
}

impl NormalizedFrame {
    pub fn new(data: Array2<u8>) -> Self {
        Self { data }
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }
}

impl From<NormalizedFrame> for RawFrame {
    fn from(frame: NormalizedFrame) -> Self {
        RawFrame::gray_u8(frame.data)
    }
}
