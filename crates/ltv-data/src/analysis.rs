//! Main analysis pipeline.
//!
//! Loads the export, computes product lifetimes and per-record LTV, and
//! builds every report section, returning an [`AnalysisResult`] ready for
//! rendering.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use ltv_core::calculations::LtvCalculator;
use ltv_core::models::{
    ProductCatalog, ProductLifetimes, ProductVariant, SegmentColumn, SubscriptionRecord,
};
use ltv_core::{LtvError, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::country::{ltv_by_country, CountryLtv};
use crate::ltv_profile::{segment_profiles, SegmentLtvProfile};
use crate::reader::load_records;
use crate::segments::{Distribution, SamplingSummary, SegmentAggregator};

// ── Public types ──────────────────────────────────────────────────────────────

/// Inputs of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// CSV file or directory of CSV files.
    pub input: PathBuf,
    pub catalog: ProductCatalog,
    /// Column whose top values get an LTV profile.
    pub segment_column: SegmentColumn,
    /// Number of top countries / segments considered.
    pub top_n: usize,
    /// Skip invalid rows instead of failing the load.
    pub skip_invalid: bool,
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    pub input: String,
    pub files_read: usize,
    pub records_loaded: usize,
    pub records_skipped: usize,
    /// Wall-clock seconds spent reading the CSV files.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent computing the report.
    pub compute_time_seconds: f64,
}

/// Average lifetime of one product cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifetimeSummary {
    pub variant: ProductVariant,
    pub product_id: String,
    /// Billing period name, e.g. `year` for `com.app.year`.
    pub period: String,
    /// `None` when the cohort has no completed users.
    pub lifetime: Option<f64>,
    pub completed_users: usize,
}

/// Earliest `first_seen_at` and latest `last_seen_at` in the dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimeSpan {
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl TimeSpan {
    pub fn of(records: &[SubscriptionRecord]) -> Self {
        Self {
            first_seen: records.iter().filter_map(|r| r.timestamps.first_seen_at).min(),
            last_seen: records.iter().filter_map(|r| r.timestamps.last_seen_at).max(),
        }
    }
}

/// The complete output of [`analyze`].
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// The loaded records.
    #[serde(skip)]
    pub records: Vec<SubscriptionRecord>,
    pub metadata: AnalysisMetadata,
    pub sampling: SamplingSummary,
    pub lifetimes: Vec<LifetimeSummary>,
    pub product_lifetimes: ProductLifetimes,
    pub status_distribution: Distribution,
    pub country_distribution: Distribution,
    /// Distribution of the configured segment column.
    pub segment_distribution: Distribution,
    /// LTV of the top countries, ranked.
    pub country_ltv: Vec<CountryLtv>,
    /// LTV profile of each top value of the segment column.
    pub ltv_profiles: Vec<SegmentLtvProfile>,
    pub time_span: TimeSpan,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full analysis pipeline.
///
/// 1. Load records from `options.input`.
/// 2. Compute the report sections via [`analyze_records`].
///
/// Fails with [`LtvError::EmptyDataset`] when no valid record was loaded.
pub fn analyze(options: &AnalysisOptions) -> Result<AnalysisResult> {
    // ── Step 1: Load records ──────────────────────────────────────────────────
    let load_start = Instant::now();
    let outcome = load_records(&options.input, options.skip_invalid)?;
    let load_time = load_start.elapsed().as_secs_f64();

    info!(
        files = outcome.files.len(),
        records = outcome.records.len(),
        skipped = outcome.skipped,
        "Loaded subscription export"
    );

    if outcome.records.is_empty() {
        return Err(LtvError::EmptyDataset);
    }

    // ── Step 2: Compute ───────────────────────────────────────────────────────
    let mut result = analyze_records(outcome.records, options);
    result.metadata.input = options.input.display().to_string();
    result.metadata.files_read = outcome.files.len();
    result.metadata.records_skipped = outcome.skipped;
    result.metadata.load_time_seconds = load_time;
    Ok(result)
}

/// Compute every report section over already-loaded records.
pub fn analyze_records(
    records: Vec<SubscriptionRecord>,
    options: &AnalysisOptions,
) -> AnalysisResult {
    let compute_start = Instant::now();
    let catalog = &options.catalog;

    // ── Step 1: Lifetimes ─────────────────────────────────────────────────────
    let product_lifetimes = LtvCalculator::product_lifetimes(&records, catalog);
    let lifetimes = lifetime_summaries(&records, catalog, &product_lifetimes);

    // ── Step 2: Per-record LTV ────────────────────────────────────────────────
    let scored = LtvCalculator::score_records(&records, catalog, &product_lifetimes);

    // ── Step 3: Segment reports ───────────────────────────────────────────────
    let sampling = SegmentAggregator::sampling_summary(&records, catalog);
    let status_distribution = SegmentAggregator::distribution(&records, SegmentColumn::Status);
    let country_distribution =
        SegmentAggregator::distribution(&records, SegmentColumn::IpCountry);
    let segment_distribution = SegmentAggregator::distribution(&records, options.segment_column);

    // ── Step 4: Country LTV ───────────────────────────────────────────────────
    let top_countries: Vec<String> = country_distribution
        .top(options.top_n)
        .iter()
        .map(|e| e.value.clone())
        .collect();
    let country_ltv = ltv_by_country(&records, &top_countries, catalog);

    // ── Step 5: LTV profiles ──────────────────────────────────────────────────
    let top_segments: Vec<String> = segment_distribution
        .top(options.top_n)
        .iter()
        .map(|e| e.value.clone())
        .collect();
    let ltv_profiles = segment_profiles(&scored, options.segment_column, &top_segments);

    // ── Step 6: Build result ──────────────────────────────────────────────────
    let time_span = TimeSpan::of(&records);
    let compute_time = compute_start.elapsed().as_secs_f64();
    debug!(seconds = compute_time, "Computed report sections");

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        input: String::new(),
        files_read: 0,
        records_loaded: records.len(),
        records_skipped: 0,
        load_time_seconds: 0.0,
        compute_time_seconds: compute_time,
    };

    AnalysisResult {
        records,
        metadata,
        sampling,
        lifetimes,
        product_lifetimes,
        status_distribution,
        country_distribution,
        segment_distribution,
        country_ltv,
        ltv_profiles,
        time_span,
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn lifetime_summaries(
    records: &[SubscriptionRecord],
    catalog: &ProductCatalog,
    lifetimes: &ProductLifetimes,
) -> Vec<LifetimeSummary> {
    ProductVariant::ALL
        .iter()
        .map(|&variant| {
            let product_id = catalog.product_id(variant);
            let completed_users = records
                .iter()
                .filter(|r| r.product_id == product_id && r.status.is_completed())
                .count();
            LifetimeSummary {
                variant,
                product_id: product_id.to_string(),
                period: ProductCatalog::period_label(product_id).to_string(),
                lifetime: lifetimes.get(variant),
                completed_users,
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
