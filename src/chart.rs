//! Dual-axis comparison charts.
//!
//! Left axis: friction coefficient μ (bars on categorical axes, a line on the
//! voltage axis). Right axis: friction force F. Both carry vertical error bars
//! sized to the computed half-widths.

#![allow(clippy::cast_precision_loss)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use crate::config::ChartFormat;
use crate::error::{LabError, Result};
use crate::pipeline::{ComparisonView, ViewSeries, XAxis};
use crate::types::{Material, ReducedValue};

/// Output size in pixels.
pub const CHART_SIZE: (u32, u32) = (1200, 600);

const PALETTE: [RGBColor; 3] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
];

/// Family every chart text style resolves to.
const FONT_FAMILY: &str = "sans-serif";
static FONT_BYTES: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

/// Registers the embedded font once; other styles fall back to it.
fn register_fonts() -> Result<()> {
    let registered =
        *FONT_REGISTERED.get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());
    if registered {
        Ok(())
    } else {
        Err(LabError::Chart {
            view: FONT_FAMILY.to_string(),
            reason: "embedded font could not be loaded".to_string(),
        })
    }
}

/// Series color: fixed per material, palette order otherwise.
pub const fn series_color(material: Option<Material>, index: usize) -> RGBColor {
    match material {
        Some(Material::Steel) => PALETTE[0],
        Some(Material::Polyethylene) => PALETTE[1],
        Some(Material::Polyisoprene) => PALETTE[2],
        None => PALETTE[index % PALETTE.len()],
    }
}

/// Renders `view` into `dir` and returns the written path.
pub fn render_view(view: &ComparisonView, dir: &Path, format: ChartFormat) -> Result<PathBuf> {
    register_fonts()?;
    fs::create_dir_all(dir).map_err(|source| LabError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(format!("{}.{}", view.kind.file_stem(), format.extension()));

    match format {
        ChartFormat::Png => {
            let root = BitMapBackend::new(&path, CHART_SIZE).into_drawing_area();
            draw(&root, view).map_err(|e| chart_error(view, &e))?;
        }
        ChartFormat::Svg => {
            let root = SVGBackend::new(&path, CHART_SIZE).into_drawing_area();
            draw(&root, view).map_err(|e| chart_error(view, &e))?;
        }
    }
    Ok(path)
}

/// Renders `view` as an SVG document in memory.
pub fn render_svg(view: &ComparisonView) -> Result<String> {
    register_fonts()?;
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        draw(&root, view).map_err(|e| chart_error(view, &e))?;
    }
    Ok(svg)
}

fn chart_error(view: &ComparisonView, err: &dyn std::fmt::Display) -> LabError {
    LabError::Chart {
        view: view.kind.file_stem().to_string(),
        reason: err.to_string(),
    }
}

/// Defined (x, μ) and (x, F) points of a series, shifted by `offset`.
fn defined_points(series: &ViewSeries, offset: f64) -> (Vec<(f64, ReducedValue)>, Vec<(f64, ReducedValue)>) {
    let mu = series
        .points
        .iter()
        .filter_map(|p| p.mu.known().map(|v| (p.x + offset, v)))
        .collect();
    let force = series
        .points
        .iter()
        .filter_map(|p| p.force.known().map(|a| (p.x + offset, a.value)))
        .collect();
    (mu, force)
}

fn upper_bound<'a>(values: impl Iterator<Item = &'a ReducedValue>) -> f64 {
    let top = values.map(|v| v.high()).fold(0.0, f64::max);
    if top > 0.0 {
        top * 1.15
    } else {
        1.0
    }
}

fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    view: &ComparisonView,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let (categorical, labels, x_range) = match &view.x_axis {
        XAxis::Categorical { labels } => {
            let last = labels.len().saturating_sub(1) as f64;
            (true, labels.clone(), -0.6..last + 0.6)
        }
        XAxis::Numeric { ticks } => {
            let low = ticks.iter().copied().fold(f64::INFINITY, f64::min);
            let high = ticks.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = if low.is_finite() && high.is_finite() {
                low - 1.0..high + 1.0
            } else {
                0.0..1.0
            };
            (false, Vec::new(), range)
        }
    };

    let count = view.series.len().max(1);
    let bar_width = 0.8 / count as f64;
    let offset = |index: usize| {
        if categorical {
            (index as f64 - (count as f64 - 1.0) / 2.0) * bar_width
        } else {
            0.0
        }
    };

    let prepared: Vec<_> = view
        .series
        .iter()
        .enumerate()
        .map(|(i, s)| (s, series_color(s.material, i), defined_points(s, offset(i))))
        .collect();

    let mu_top = upper_bound(prepared.iter().flat_map(|(_, _, (mu, _))| mu.iter().map(|(_, v)| v)));
    let force_top = upper_bound(prepared.iter().flat_map(|(_, _, (_, f))| f.iter().map(|(_, v)| v)));

    let mut chart = ChartBuilder::on(root)
        .caption(&view.title, (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .right_y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), 0.0..mu_top)?
        .set_secondary_coord(x_range, 0.0..force_top);

    let x_formatter = |x: &f64| {
        if categorical {
            let rounded = x.round();
            if (x - rounded).abs() < 1e-6 && rounded >= 0.0 {
                labels.get(rounded as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        } else {
            format!("{x:.0}")
        }
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(if categorical { labels.len().max(1) } else { 10 })
        .x_label_formatter(&x_formatter)
        .x_desc(view.kind.x_description())
        .y_desc("Friction Coefficient (μ)")
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_desc("Friction Force (F) [N]")
        .draw()?;

    let half_bar = bar_width * 0.45;
    for (series, color, (mu, force)) in &prepared {
        let color = *color;

        if categorical {
            chart
                .draw_series(mu.iter().map(|&(x, v)| {
                    Rectangle::new([(x - half_bar, 0.0), (x + half_bar, v.center)], color.mix(0.8).filled())
                }))?
                .label(format!("{} (μ)", series.label))
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        } else {
            chart
                .draw_series(LineSeries::new(
                    mu.iter().map(|&(x, v)| (x, v.center)),
                    color.stroke_width(2),
                ))?
                .label(format!("{} (μ)", series.label))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            chart.draw_series(mu.iter().map(|&(x, v)| Circle::new((x, v.center), 5, color.filled())))?;
        }

        chart.draw_series(mu.iter().map(|&(x, v)| {
            ErrorBar::new_vertical(x, v.low().max(0.0), v.center, v.high(), BLACK.stroke_width(1), 8)
        }))?;

        chart
            .draw_secondary_series(LineSeries::new(
                force.iter().map(|&(x, v)| (x, v.center)),
                color.mix(0.6).stroke_width(2),
            ))?
            .label(format!("{} (F)", series.label))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.mix(0.6).stroke_width(2)));
        chart.draw_secondary_series(
            force
                .iter()
                .map(|&(x, v)| Circle::new((x, v.center), 4, color.mix(0.6).filled())),
        )?;
        chart.draw_secondary_series(force.iter().map(|&(x, v)| {
            ErrorBar::new_vertical(x, v.low().max(0.0), v.center, v.high(), color.mix(0.6).stroke_width(1), 6)
        }))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LabConfig, StatisticsConfig};
    use crate::dataset;
    use crate::pipeline::{comparison_views, process};

    fn views() -> Vec<ComparisonView> {
        let rows = process(&dataset::measurements(), &LabConfig::default());
        comparison_views(&rows, &StatisticsConfig::default())
    }

    #[test]
    fn material_colors_are_fixed() {
        assert_eq!(series_color(Some(Material::Polyethylene), 0), PALETTE[1]);
        assert_eq!(series_color(None, 4), PALETTE[1]);
    }

    #[test]
    fn svg_contains_axis_descriptions() {
        for view in views() {
            let svg = render_svg(&view).unwrap();
            assert!(svg.contains("<svg"), "{}", view.kind.file_stem());
            assert!(svg.contains("Friction Force (F) [N]"));
            assert!(svg.contains(view.kind.x_description()));
        }
    }

    #[test]
    fn png_is_written_with_caption_text() {
        let dir = tempfile::tempdir().unwrap();
        let view = views().remove(0);
        let path = render_view(&view, dir.path(), ChartFormat::Png).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn bitmap_caption_is_rasterised() {
        register_fonts().unwrap();
        let view = views().remove(0);
        let (width, height) = CHART_SIZE;
        let mut buffer = vec![0_u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, CHART_SIZE).into_drawing_area();
            draw(&root, &view).unwrap();
        }
        // Centered caption band, clear of the legend and the plot frame.
        let dark = (10..35_u32)
            .flat_map(|y| (450..750_u32).map(move |x| ((y * width + x) * 3) as usize))
            .filter(|&i| buffer[i] < 128)
            .count();
        assert!(dark > 0);
    }

    #[test]
    fn svg_of_empty_view_still_renders() {
        let mut view = views().remove(0);
        view.series.clear();
        assert!(render_svg(&view).is_ok());
    }
}
