use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::BatchResult;

use super::glyphs::{self, GLYPH_HEIGHT};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const BAR: Rgb<u8> = Rgb([70, 130, 180]);
const TEXT: Rgb<u8> = Rgb([30, 30, 30]);

/// Horizontal grid lines at every quarter of the value axis.
const GRID_DIVISIONS: u32 = 4;

/// Below this size the chart is drawn without text.
const MIN_ANNOTATED_WIDTH: u32 = 160;
const MIN_ANNOTATED_HEIGHT: u32 = 100;

/// Quantity plotted per source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartMetric {
    /// Mean scratch percentage over the source's measured frames.
    #[default]
    Percentage,
    /// Mean scratch area in pixels.
    Area,
}

impl std::fmt::Display for ChartMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percentage => write!(f, "Scratch area (%)"),
            Self::Area => write!(f, "Scratch area (px)"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartBar {
    pub label: String,
    pub value: f64,
    /// Measured frames averaged into `value`.
    pub frames: usize,
}

/// Bar chart of per-source scratch statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryChart {
    pub metric: ChartMetric,
    pub bars: Vec<ChartBar>,
}

impl SummaryChart {
    /// One bar per source with at least one measured frame, in the order the
    /// sources first appear. `None` when no source has a measurement.
    pub fn from_batch(batch: &BatchResult, metric: ChartMetric) -> Option<Self> {
        let mut bars: Vec<ChartBar> = Vec::new();
        for row in batch.measured() {
            let Some(m) = row.measurement() else {
                continue;
            };
            let value = match metric {
                ChartMetric::Percentage => m.percentage,
                ChartMetric::Area => m.scratch_pixels as f64,
            };
            match bars.iter_mut().find(|b| b.label == row.source) {
                // running sum; divided once all rows are in
                Some(bar) => {
                    bar.value += value;
                    bar.frames += 1;
                }
                None => bars.push(ChartBar {
                    label: row.source.clone(),
                    value,
                    frames: 1,
                }),
            }
        }
        for bar in &mut bars {
            bar.value /= bar.frames as f64;
        }
        (!bars.is_empty()).then_some(Self { metric, bars })
    }

    /// Top of the value axis: 100 for percentages, the tallest bar otherwise.
    pub fn axis_max(&self) -> f64 {
        match self.metric {
            ChartMetric::Percentage => 100.0,
            ChartMetric::Area => self
                .bars
                .iter()
                .map(|b| b.value)
                .fold(0.0, f64::max)
                .max(1.0),
        }
    }

    /// Value printed next to the `i`-th grid line, counted from the base.
    fn tick_label(&self, i: u32) -> String {
        let axis_max = self.axis_max();
        let value = axis_max * f64::from(i) / f64::from(GRID_DIVISIONS);
        if axis_max < 10.0 {
            format!("{value:.1}")
        } else {
            format!("{value:.0}")
        }
    }

    /// Falls back to the text-free margins when the text would not fit.
    fn layout(&self, width: u32, height: u32) -> Option<Layout> {
        let annotate = width >= MIN_ANNOTATED_WIDTH && height >= MIN_ANNOTATED_HEIGHT;
        self.layout_with(width, height, annotate)
            .or_else(|| self.layout_with(width, height, false))
    }

    fn layout_with(&self, width: u32, height: u32, annotate: bool) -> Option<Layout> {
        let scale = if width >= 640 && height >= 320 { 2 } else { 1 };
        let text_h = GLYPH_HEIGHT * scale;

        let mut left = (width / 10).clamp(1, 60);
        let right = (width / 40).max(1);
        let mut top = (height / 20).max(1);
        let mut bottom = (height / 10).clamp(1, 40);
        if annotate {
            let ticks = (0..=GRID_DIVISIONS)
                .map(|i| glyphs::text_width(&self.tick_label(i), scale))
                .max()
                .unwrap_or(0);
            left = left.max(ticks + 3 * scale);
            top = top.max(text_h + 2 * scale);
            bottom = bottom.max(text_h + 4 * scale);
        }
        if left + right >= width || top + bottom >= height {
            return None;
        }
        Some(Layout {
            left,
            top,
            plot_w: width - left - right,
            plot_h: height - top - bottom,
            scale,
            annotate,
        })
    }

    /// Rasterize the chart: grid, axes and one bar per source, left to right.
    ///
    /// Rasters of at least 160x100 also get the metric as a title, the value
    /// of every grid line and each bar's file name (cut to the bar's slot).
    /// Text is doubled from 640x320 up.
    pub fn render(&self, width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(width.max(1), height.max(1), BACKGROUND);
        let (w, h) = img.dimensions();
        let Some(l) = self.layout(w, h) else {
            return img;
        };
        let base_y = l.base_y();

        for i in 1..=GRID_DIVISIONS {
            let y = base_y - l.plot_h * i / GRID_DIVISIONS;
            fill_rect(&mut img, l.left, y, l.plot_w, 1, GRID);
        }

        let slot = l.slot(self.bars.len());
        let bar_w = (slot * 3 / 5).max(1);
        let axis_max = self.axis_max();
        for (i, bar) in self.bars.iter().enumerate() {
            let fraction = (bar.value / axis_max).clamp(0.0, 1.0);
            let bar_h = (fraction * l.plot_h as f64).round() as u32;
            let x = l.left + slot * i as u32 + (slot - bar_w.min(slot)) / 2;
            fill_rect(&mut img, x, base_y - bar_h, bar_w, bar_h, BAR);
        }

        fill_rect(&mut img, l.left, l.top, 1, l.plot_h + 1, AXIS);
        fill_rect(&mut img, l.left, base_y, l.plot_w, 1, AXIS);

        if l.annotate {
            self.annotate(&mut img, &l);
        }
        img
    }

    fn annotate(&self, img: &mut RgbImage, l: &Layout) {
        let scale = l.scale;
        let text_h = GLYPH_HEIGHT * scale;
        let base_y = l.base_y();

        let title = self.metric.to_string();
        let title_w = glyphs::text_width(&title, scale);
        if title_w <= l.plot_w {
            let x = l.left + (l.plot_w - title_w) / 2;
            glyphs::draw_text(img, x, (l.top - text_h) / 2, &title, scale, TEXT);
        }

        for i in 0..=GRID_DIVISIONS {
            let label = self.tick_label(i);
            let y = base_y - l.plot_h * i / GRID_DIVISIONS;
            let x = l
                .left
                .saturating_sub(2 * scale + glyphs::text_width(&label, scale));
            glyphs::draw_text(img, x, y.saturating_sub(text_h / 2), &label, scale, TEXT);
        }

        let slot = l.slot(self.bars.len());
        for (i, bar) in self.bars.iter().enumerate() {
            let label = glyphs::fit(short_label(&bar.label), slot.saturating_sub(scale), scale);
            let label_w = glyphs::text_width(label, scale);
            let x = l.left + slot * i as u32 + slot.saturating_sub(label_w) / 2;
            glyphs::draw_text(img, x, base_y + 2 * scale, label, scale, TEXT);
        }
    }

    pub fn save_png(&self, path: &Path, width: u32, height: u32) -> Result<()> {
        self.render(width, height)
            .save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

/// The last path component of a source identifier, as printed under its bar.
pub fn short_label(source: &str) -> &str {
    source.rsplit(['/', '\\']).next().unwrap_or(source)
}

/// Margins and plot area of one raster, in pixels.
struct Layout {
    left: u32,
    top: u32,
    plot_w: u32,
    plot_h: u32,
    scale: u32,
    annotate: bool,
}

impl Layout {
    fn base_y(&self) -> u32 {
        self.top + self.plot_h
    }

    fn slot(&self, bars: usize) -> u32 {
        self.plot_w / bars.max(1) as u32
    }
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let (iw, ih) = img.dimensions();
    for row in y..(y + h).min(ih) {
        for col in x..(x + w).min(iw) {
            img.put_pixel(col, row, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(values: &[f64]) -> SummaryChart {
        SummaryChart {
            metric: ChartMetric::Percentage,
            bars: values
                .iter()
                .enumerate()
                .map(|(i, &value)| ChartBar {
                    label: format!("s{i}"),
                    value,
                    frames: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_render_has_requested_size() {
        let img = chart(&[10.0, 50.0]).render(320, 200);
        assert_eq!(img.dimensions(), (320, 200));
    }

    fn has_text(img: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> bool {
        (y0..y1).any(|y| (x0..x1).any(|x| *img.get_pixel(x, y) == TEXT))
    }

    #[test]
    fn test_full_bar_reaches_plot_top() {
        let img = chart(&[100.0]).render(200, 200);
        // plot area x 20..195, y 10..180; the single bar is centered in it
        let x = 110;
        assert_eq!(*img.get_pixel(x, 12), BAR);
        assert_eq!(*img.get_pixel(x, 10), BAR);
        assert_eq!(*img.get_pixel(x, 9), BACKGROUND);
    }

    #[test]
    fn test_layout_makes_room_for_text() {
        let l = chart(&[1.0]).layout(200, 200).unwrap();
        assert_eq!((l.left, l.top, l.plot_w, l.plot_h), (20, 10, 175, 170));
        assert!(l.annotate);

        let l = chart(&[1.0]).layout(800, 400).unwrap();
        assert_eq!(l.scale, 2);
        assert_eq!(l.left, 60);
        // title at double size plus its padding
        assert_eq!(l.top, 20);
        assert_eq!(l.plot_h, 400 - 20 - 40);
    }

    #[test]
    fn test_title_ticks_and_labels_are_drawn() {
        let img = chart(&[25.0, 75.0]).render(400, 240);
        let l = chart(&[25.0, 75.0]).layout(400, 240).unwrap();
        let base_y = l.base_y();

        assert!(has_text(&img, l.left, 0, 400, l.top), "title");
        assert!(has_text(&img, 0, 0, l.left, 240), "tick values");
        let slot = l.slot(2);
        for i in 0..2 {
            let x0 = l.left + slot * i;
            assert!(has_text(&img, x0, base_y + 1, x0 + slot, 240), "label {i}");
        }
    }

    #[test]
    fn test_small_raster_has_no_text() {
        let img = chart(&[25.0, 75.0]).render(120, 80);
        assert!(img.pixels().all(|p| *p != TEXT));
        assert!(img.pixels().any(|p| *p == BAR));
    }

    #[test]
    fn test_wide_tick_values_drop_text_not_bars() {
        let huge = SummaryChart {
            metric: ChartMetric::Area,
            bars: vec![ChartBar {
                label: "a".into(),
                value: 1e30,
                frames: 1,
            }],
        };
        let l = huge.layout(160, 100).unwrap();
        assert!(!l.annotate);
        let img = huge.render(160, 100);
        assert!(img.pixels().any(|p| *p == BAR));
    }

    #[test]
    fn test_tick_labels() {
        let pct = chart(&[10.0]);
        let ticks: Vec<String> = (0..=GRID_DIVISIONS).map(|i| pct.tick_label(i)).collect();
        assert_eq!(ticks, vec!["0", "25", "50", "75", "100"]);

        let area = SummaryChart {
            metric: ChartMetric::Area,
            bars: vec![ChartBar {
                label: "a".into(),
                value: 2.0,
                frames: 1,
            }],
        };
        assert_eq!(area.tick_label(1), "0.5");
    }

    #[test]
    fn test_short_label_is_file_name() {
        assert_eq!(short_label("exp/plates.zip/day1/a.png"), "a.png");
        assert_eq!(short_label("w1.png"), "w1.png");
    }

    #[test]
    fn test_tiny_raster_is_blank() {
        let img = chart(&[40.0]).render(2, 2);
        assert!(img.pixels().all(|p| *p == BACKGROUND));
    }
}
