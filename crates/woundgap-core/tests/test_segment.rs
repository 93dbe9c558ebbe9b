#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use woundgap_core::error::DegenerateReason;
use woundgap_core::frame::NormalizedFrame;
use woundgap_core::quantify::measure;
use woundgap_core::segment::{
    local_entropy, local_entropy_with, otsu_threshold, segment, EntropyMap, ScratchMask,
    SegmentConfig,
};

fn frame(data: Array2<u8>) -> NormalizedFrame {
    NormalizedFrame::new(data)
}

// ---------------------------------------------------------------------------
// Local entropy
// ---------------------------------------------------------------------------

#[test]
fn test_entropy_of_constant_frame_is_zero() {
    let map = local_entropy(&frame(Array2::from_elem((20, 30), 77)), 5);
    assert_eq!(map.data.dim(), (20, 30));
    assert!(map.data.iter().all(|&v| v == 0.0));
}

#[test]
fn test_entropy_of_checkerboard_center() {
    // radius 1 disk = plus shape of 5 pixels: center + 4 opposite-colored
    let data = Array2::from_shape_fn((9, 9), |(r, c)| if (r + c) % 2 == 0 { 0 } else { 255 });
    let map = local_entropy(&frame(data), 1);
    let expected = -(0.2f64 * 0.2f64.log2() + 0.8 * 0.8f64.log2()) as f32;
    assert_abs_diff_eq!(map.data[[4, 4]], expected, epsilon = 1e-5);
}

#[test]
fn test_entropy_is_bounded_by_footprint() {
    let map = local_entropy(&frame(common::noise_image(40, 40, 7)), 5);
    // 81 samples can hold at most log2(81) bits
    let (_, max) = map.min_max().unwrap();
    assert!(max <= 81f32.log2() + 1e-4);
    assert!(map.data.iter().all(|&v| v >= 0.0));
}

#[test]
fn test_entropy_uses_truncated_disk_at_borders() {
    // Two-valued image split down the middle; the corner sees only one value.
    let data = Array2::from_shape_fn((12, 12), |(_, c)| if c < 6 { 10 } else { 200 });
    let map = local_entropy(&frame(data), 3);
    assert_eq!(map.data[[0, 0]], 0.0);
    assert!(map.data[[0, 5]] > 0.0);
}

#[test]
fn test_entropy_parallel_matches_serial() {
    // 300 x 300 crosses the row-parallel threshold
    let image = frame(common::half_flat_image(300, 300, 120, 42));
    let parallel = local_entropy_with(&image, 5, true);
    let serial = local_entropy_with(&image, 5, false);
    assert_eq!(parallel, serial);
}

// ---------------------------------------------------------------------------
// Otsu threshold
// ---------------------------------------------------------------------------

#[test]
fn test_otsu_separates_two_levels() {
    let mut data = Array2::<f32>::zeros((10, 10));
    for r in 0..10 {
        for c in 5..10 {
            data[[r, c]] = 6.0;
        }
    }
    let t = otsu_threshold(&EntropyMap { data }, 256).unwrap();
    assert!(t > 0.0 && t < 6.0, "threshold {t}");
}

#[test]
fn test_otsu_constant_map_is_degenerate() {
    let data = Array2::from_elem((8, 8), 2.5f32);
    assert_eq!(
        otsu_threshold(&EntropyMap { data }, 256),
        Err(DegenerateReason::ConstantEntropy)
    );
}

#[test]
fn test_otsu_empty_map_is_degenerate() {
    let data = Array2::<f32>::zeros((0, 0));
    assert_eq!(
        otsu_threshold(&EntropyMap { data }, 256),
        Err(DegenerateReason::EmptyFrame)
    );
}

#[test]
fn test_otsu_returns_bin_center() {
    // Values 0 and 1 with 2 bins: bin 0 wins, its center is 0.25.
    let data = Array2::from_shape_fn((4, 4), |(r, _)| if r < 2 { 0.0 } else { 1.0 });
    let t = otsu_threshold(&EntropyMap { data }, 2).unwrap();
    assert_abs_diff_eq!(t, 0.25, epsilon = 1e-6);
}

// ---------------------------------------------------------------------------
// Mask + measurement
// ---------------------------------------------------------------------------

#[test]
fn test_mask_ties_are_not_scratch() {
    let data = Array2::from_shape_vec((1, 3), vec![0.5f32, 1.0, 1.5]).unwrap();
    let mask = ScratchMask::from_threshold(&EntropyMap { data }, 1.0);
    assert_eq!(mask.data.iter().copied().collect::<Vec<_>>(), vec![true, false, false]);
    assert_eq!(mask.scratch_pixels(), 1);
}

#[test]
fn test_mask_image_marks_scratch_white() {
    let data = Array2::from_shape_vec((2, 3), vec![0.0f32, 2.0, 0.0, 2.0, 2.0, 0.0]).unwrap();
    let mask = ScratchMask::from_threshold(&EntropyMap { data }, 1.0);
    let image = mask.to_image();

    assert_eq!(image.dimensions(), (3, 2));
    assert_eq!(image.get_pixel(0, 0).0, [255]);
    assert_eq!(image.get_pixel(1, 0).0, [0]);
    assert_eq!(image.get_pixel(2, 1).0, [255]);
    assert_eq!(image.get_pixel(0, 1).0, [0]);
}

#[test]
fn test_half_flat_frame_is_about_half_scratch() {
    let image = frame(common::half_flat_image(64, 64, 32, 3));
    let mask = segment(&image, &SegmentConfig::default()).unwrap();
    let m = measure(&mask).unwrap();

    assert_eq!(m.total_pixels, 64 * 64);
    // Columns farther than the radius from the textured half are exactly zero
    // entropy; only the boundary band is uncertain.
    assert!(m.percentage >= 27.0 * 100.0 / 64.0, "{}", m.percentage);
    assert!(m.percentage <= 55.0, "{}", m.percentage);
    // The flat column far from the boundary is scratch, the noise is not.
    assert!(mask.data[[32, 0]]);
    assert!(!mask.data[[32, 60]]);
}

#[test]
fn test_segment_constant_frame_is_degenerate() {
    let image = frame(Array2::from_elem((100, 100), 128));
    assert_eq!(
        segment(&image, &SegmentConfig::default()),
        Err(DegenerateReason::ConstantEntropy)
    );
}

#[test]
fn test_segment_empty_frame_is_degenerate() {
    let image = frame(Array2::zeros((0, 10)));
    assert_eq!(
        segment(&image, &SegmentConfig::default()),
        Err(DegenerateReason::EmptyFrame)
    );
}

#[test]
fn test_segmentation_is_deterministic() {
    let image = frame(common::half_flat_image(90, 70, 40, 11));
    let config = SegmentConfig::default();
    let a = segment(&image, &config).unwrap();
    let b = segment(&image, &config).unwrap();
    let serial = segment(
        &image,
        &SegmentConfig {
            parallel: false,
            ..config
        },
    )
    .unwrap();
    assert_eq!(a, b);
    assert_eq!(a, serial);
}

#[test]
fn test_percentage_extremes() {
    let all = ScratchMask {
        data: Array2::from_elem((5, 4), true),
        threshold: 1.0,
    };
    let none = ScratchMask {
        data: Array2::from_elem((5, 4), false),
        threshold: 1.0,
    };
    assert_eq!(measure(&all).unwrap().percentage, 100.0);
    assert_eq!(measure(&none).unwrap().percentage, 0.0);
    assert_eq!(measure(&none).unwrap().scratch_pixels, 0);
}

#[test]
fn test_measure_empty_mask_is_degenerate() {
    let empty = ScratchMask {
        data: Array2::from_elem((0, 4), false),
        threshold: 0.0,
    };
    assert_eq!(measure(&empty), Err(DegenerateReason::EmptyFrame));
}
