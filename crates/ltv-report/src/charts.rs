//! LTV curves rendered with `plotters`.
//!
//! One line chart per profiled segment: distinct LTV values on the x axis,
//! number of users at each value on the y axis.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ltv_core::models::SegmentColumn;
use ltv_core::{LtvError, Result};
use ltv_data::ltv_profile::{LtvPoint, SegmentLtvProfile};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{debug, info};

const CHART_SIZE: (u32, u32) = (800, 600);
const LINE_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Output format of chart files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartFormat {
    #[default]
    Svg,
    Png,
}

impl ChartFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ChartFormat::Svg => "svg",
            ChartFormat::Png => "png",
        }
    }
}

impl FromStr for ChartFormat {
    type Err = LtvError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "svg" => Ok(ChartFormat::Svg),
            "png" => Ok(ChartFormat::Png),
            other => Err(LtvError::Config(format!("unknown chart format: {other}"))),
        }
    }
}

impl fmt::Display for ChartFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// `<dir>/ltv_<column>_<segment>.<ext>`
pub fn chart_path(dir: &Path, column: SegmentColumn, segment: &str, format: ChartFormat) -> PathBuf {
    dir.join(format!(
        "ltv_{}_{}.{}",
        column.as_str(),
        sanitize_segment(segment),
        format.extension()
    ))
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Axis ranges covering every point with a 5 % margin. A single distinct
/// value still gets a non-empty range.
pub fn axis_bounds(points: &[LtvPoint]) -> (Range<f64>, Range<f64>) {
    let (x_min, x_max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.ltv), hi.max(p.ltv))
    });
    let y_max = points.iter().map(|p| p.users).max().unwrap_or(1) as f64;

    let (x_min, x_max) = if x_min.is_finite() && x_max.is_finite() {
        (x_min, x_max)
    } else {
        (0.0, 1.0)
    };
    let span = x_max - x_min;
    let pad = if span > 0.0 { span * 0.05 } else { x_min.abs().max(1.0) * 0.5 };

    ((x_min - pad)..(x_max + pad), 0.0..(y_max * 1.1).max(1.0))
}

/// Draw the curve. Text (caption, axis labels) is only drawn when `title` is
/// given; the bitmap backend has no font rasteriser available.
fn draw_curve<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: Option<&str>,
    points: &[LtvPoint],
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (x_range, y_range) = axis_bounds(points);
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(root);
    builder.margin(10).x_label_area_size(40).y_label_area_size(50);
    if let Some(title) = title {
        builder.caption(title, ("sans-serif", 24));
    }
    let mut chart = builder.build_cartesian_2d(x_range, y_range)?;

    {
        let mut mesh = chart.configure_mesh();
        if title.is_some() {
            mesh.x_desc("ltv")
                .y_desc("number of users")
                .axis_desc_style(("sans-serif", 15));
        } else {
            mesh.x_labels(0).y_labels(0);
        }
        mesh.draw()?;
    }

    chart.draw_series(LineSeries::new(
        points.iter().map(|p| (p.ltv, p.users as f64)),
        &LINE_COLOR,
    ))?;
    chart.draw_series(
        points
            .iter()
            .map(|p| Circle::new((p.ltv, p.users as f64), 3, LINE_COLOR.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Write a single LTV curve to `path`.
///
/// SVG output carries the title and axis labels; PNG output is the bare
/// curve.
pub fn render_ltv_curve(
    path: &Path,
    title: &str,
    points: &[LtvPoint],
    format: ChartFormat,
) -> Result<()> {
    let drawn = match format {
        ChartFormat::Svg => {
            let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
            draw_curve(&root, Some(title), points).map_err(|e| e.to_string())
        }
        ChartFormat::Png => {
            let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
            draw_curve(&root, None, points).map_err(|e| e.to_string())
        }
    };
    drawn.map_err(|e| LtvError::Chart(format!("{}: {e}", path.display())))
}

/// Render one chart per profile that has non-zero LTV values.
///
/// Creates `dir` if needed and returns the written paths in profile order.
pub fn render_profile_charts(
    profiles: &[SegmentLtvProfile],
    column: SegmentColumn,
    dir: &Path,
    format: ChartFormat,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for profile in profiles {
        if !profile.has_curve() {
            debug!(segment = %profile.segment, "No non-zero LTV, chart skipped");
            continue;
        }
        let path = chart_path(dir, column, &profile.segment, format);
        let title = format!("LTV for {column} = {}", profile.segment);
        render_ltv_curve(&path, &title, &profile.histogram, format)?;
        written.push(path);
    }

    info!(charts = written.len(), dir = %dir.display(), "Rendered LTV charts");
    Ok(written)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn profile(segment: &str, histogram: Vec<LtvPoint>) -> SegmentLtvProfile {
        SegmentLtvProfile {
            segment: segment.to_string(),
            users: histogram.iter().map(|p| p.users).sum(),
            zero_ltv: 0,
            zero_ltv_percent: 0.0,
            histogram,
            stats: None,
        }
    }

    fn points() -> Vec<LtvPoint> {
        vec![
            LtvPoint { ltv: 4.5, users: 3 },
            LtvPoint { ltv: 9.0, users: 7 },
            LtvPoint { ltv: 20.0, users: 1 },
        ]
    }

    #[test]
    fn test_chart_format_parse() {
        assert_eq!("svg".parse::<ChartFormat>().unwrap(), ChartFormat::Svg);
        assert_eq!("PNG".parse::<ChartFormat>().unwrap(), ChartFormat::Png);
        assert!("gif".parse::<ChartFormat>().is_err());
        assert_eq!(ChartFormat::default().to_string(), "svg");
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("US"), "US");
        assert_eq!(sanitize_segment("com.app.year"), "com_app_year");
        assert_eq!(sanitize_segment("a/b c"), "a_b_c");
        assert_eq!(sanitize_segment("free_trial-1"), "free_trial-1");
        assert_eq!(sanitize_segment(""), "_");
    }

    #[test]
    fn test_chart_path() {
        let path = chart_path(
            Path::new("charts"),
            SegmentColumn::IpCountry,
            "US",
            ChartFormat::Png,
        );
        assert_eq!(path, Path::new("charts").join("ltv_ip_country_US.png"));
    }

    #[test]
    fn test_axis_bounds_pads_ranges() {
        let (x, y) = axis_bounds(&points());
        assert!(x.start < 4.5 && x.end > 20.0);
        assert_eq!(y.start, 0.0);
        assert!(y.end > 7.0);
    }

    #[test]
    fn test_axis_bounds_single_value() {
        let (x, _) = axis_bounds(&[LtvPoint { ltv: 10.0, users: 2 }]);
        assert!(x.start < 10.0 && x.end > 10.0);
        let (x, y) = axis_bounds(&[]);
        assert!(x.start < x.end);
        assert!(y.start < y.end);
    }

    #[test]
    fn test_render_svg_curve() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("curve.svg");
        render_ltv_curve(&path, "LTV for ip_country = US", &points(), ChartFormat::Svg).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("polyline") || svg.contains("path"));
        assert!(svg.contains("LTV for ip_country = US"));
        assert!(svg.contains(">\nltv\n</text>"));
        assert!(svg.contains("number of users"));
    }

    #[test]
    fn test_render_png_curve() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("curve.png");
        render_ltv_curve(&path, "curve", &points(), ChartFormat::Png).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn test_render_profile_charts_skips_empty_profiles() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("charts");
        let profiles = vec![
            profile("US", points()),
            profile("DE", Vec::new()),
            profile("com.app.week", vec![LtvPoint { ltv: 3.0, users: 1 }]),
        ];
        let written =
            render_profile_charts(&profiles, SegmentColumn::IpCountry, &out, ChartFormat::Svg)
                .unwrap();

        assert_eq!(
            written,
            vec![
                out.join("ltv_ip_country_US.svg"),
                out.join("ltv_ip_country_com_app_week.svg"),
            ]
        );
        assert!(written.iter().all(|p| p.exists()));
        assert!(!out.join("ltv_ip_country_DE.svg").exists());
    }

    #[test]
    fn test_render_profile_charts_creates_nested_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("reports").join("2021").join("charts");
        let profiles = vec![profile("US", points())];
        let written =
            render_profile_charts(&profiles, SegmentColumn::IpCountry, &out, ChartFormat::Png)
                .unwrap();

        assert!(out.is_dir());
        assert_eq!(written, vec![out.join("ltv_ip_country_US.png")]);
        assert!(written[0].exists());
    }
}
