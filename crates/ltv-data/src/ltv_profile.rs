//! Per-segment LTV distributions: zero-LTV share, histogram of LTV values
//! and summary statistics.

use ltv_core::formatting::percentage;
use ltv_core::models::{LtvRecord, SegmentColumn};
use serde::Serialize;
use tracing::debug;

/// Number of users sharing one LTV value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LtvPoint {
    pub ltv: f64,
    pub users: usize,
}

/// Summary statistics over the distinct non-zero LTV values of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LtvStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// LTV distribution for the records of one segment value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentLtvProfile {
    pub segment: String,
    pub users: usize,
    /// Records whose LTV is exactly zero.
    pub zero_ltv: usize,
    /// Share of `zero_ltv` in `users`, two decimals.
    pub zero_ltv_percent: f64,
    /// Distinct non-zero LTV values, ascending.
    pub histogram: Vec<LtvPoint>,
    /// `None` when the segment has no non-zero LTV.
    pub stats: Option<LtvStats>,
}

impl SegmentLtvProfile {
    /// Whether there is anything to plot.
    pub fn has_curve(&self) -> bool {
        !self.histogram.is_empty()
    }
}

/// Group non-zero LTV values into an ascending histogram.
pub fn describe_ltv(values: &[f64]) -> Vec<LtvPoint> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| *v != 0.0).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut histogram: Vec<LtvPoint> = Vec::new();
    for value in sorted {
        match histogram.last_mut() {
            Some(point) if point.ltv == value => point.users += 1,
            _ => histogram.push(LtvPoint {
                ltv: value,
                users: 1,
            }),
        }
    }
    histogram
}

/// Mean, min and max of the histogram's LTV values. Each distinct value
/// counts once regardless of how many users share it.
pub fn ltv_stats(histogram: &[LtvPoint]) -> Option<LtvStats> {
    let first = histogram.first()?;
    let (sum, min, max) = histogram.iter().fold(
        (0.0_f64, first.ltv, first.ltv),
        |(sum, min, max), point| (sum + point.ltv, min.min(point.ltv), max.max(point.ltv)),
    );
    Some(LtvStats {
        mean: sum / histogram.len() as f64,
        min,
        max,
    })
}

/// Build a profile for every listed segment value of `column`.
///
/// Segments are returned in the order given. A segment with no matching
/// records yields an empty profile.
pub fn segment_profiles(
    scored: &[LtvRecord<'_>],
    column: SegmentColumn,
    segments: &[String],
) -> Vec<SegmentLtvProfile> {
    segments
        .iter()
        .map(|segment| {
            let values: Vec<f64> = scored
                .iter()
                .filter(|s| column.value_of(s.record) == Some(segment.as_str()))
                .map(|s| s.ltv)
                .collect();
            let users = values.len();
            let zero_ltv = values.iter().filter(|v| **v == 0.0).count();
            let histogram = describe_ltv(&values);
            let stats = ltv_stats(&histogram);
            debug!(
                column = %column,
                segment = %segment,
                users,
                zero_ltv,
                distinct = histogram.len(),
                "segment LTV profile"
            );
            SegmentLtvProfile {
                segment: segment.clone(),
                users,
                zero_ltv,
                zero_ltv_percent: percentage(zero_ltv as f64, users as f64, 2),
                histogram,
                stats,
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
