/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 2;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Number of intensity levels in a normalized frame.
pub const GRAY_LEVELS: usize = 256;

/// Default radius of the disk-shaped entropy neighborhood.
pub const DEFAULT_ENTROPY_RADIUS: usize = 5;

/// Largest accepted entropy radius; the disk then covers about 200k pixels.
pub const MAX_ENTROPY_RADIUS: usize = 255;

/// Number of histogram bins for Otsu's thresholding.
pub const OTSU_HISTOGRAM_BINS: usize = 256;

/// Entropy spread (max - min) below which a map is treated as constant.
pub const ENTROPY_EPSILON: f32 = 1e-6;

/// Default chart raster size in pixels.
pub const DEFAULT_CHART_WIDTH: u32 = 800;
pub const DEFAULT_CHART_HEIGHT: u32 = 400;

/// Bytes sniffed from the head of a source when its extension is ambiguous.
pub const SNIFF_LEN: usize = 16;
