//! CSV discovery and loading for subscription exports.
//!
//! Reads export rows with the `csv` crate, validates them and converts them
//! into [`SubscriptionRecord`]s, translating the epoch-millisecond timestamp
//! columns on the way.

use std::io::Read;
use std::path::{Path, PathBuf};

use ltv_core::models::{RecordTimestamps, SubscriptionRecord, SubscriptionStatus};
use ltv_core::time_utils::parse_epoch_millis;
use ltv_core::{LtvError, Result};
use serde::Deserialize;
use tracing::{debug, warn};

/// Columns holding Unix epoch milliseconds.
pub const TIMESTAMP_COLUMNS: [&str; 11] = [
    "first_seen_at",
    "last_seen_at",
    "first_purchase_at",
    "trial_start_at",
    "trial_end_at",
    "most_recent_purchase_at",
    "most_recent_renewal_at",
    "latest_expiration_at",
    "subscription_opt_out_at",
    "trial_opt_out_at",
    "most_recent_billing_issues_at",
];

/// Columns that must be present in the header row.
pub const REQUIRED_COLUMNS: [&str; 2] = ["status", "all_purchased_product_ids"];

// ── Public types ──────────────────────────────────────────────────────────────

/// Result of loading one or more export files.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    /// Valid records, in file order.
    pub records: Vec<SubscriptionRecord>,
    /// Rows dropped because they were invalid (only with `skip_invalid`).
    pub skipped: usize,
    /// Files that were read.
    pub files: Vec<PathBuf>,
}

/// One export row exactly as it appears in the file. Every cell is optional
/// text so that conversion errors can be reported with the row's line.
#[derive(Debug, Default, Deserialize)]
struct RawRecord {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    all_purchased_product_ids: Option<String>,
    #[serde(default)]
    total_renewals: Option<String>,
    #[serde(default)]
    total_spent: Option<String>,
    #[serde(default)]
    rpr: Option<String>,
    #[serde(default)]
    ip_country: Option<String>,
    #[serde(default)]
    first_seen_at: Option<String>,
    #[serde(default)]
    last_seen_at: Option<String>,
    #[serde(default)]
    first_purchase_at: Option<String>,
    #[serde(default)]
    trial_start_at: Option<String>,
    #[serde(default)]
    trial_end_at: Option<String>,
    #[serde(default)]
    most_recent_purchase_at: Option<String>,
    #[serde(default)]
    most_recent_renewal_at: Option<String>,
    #[serde(default)]
    latest_expiration_at: Option<String>,
    #[serde(default)]
    subscription_opt_out_at: Option<String>,
    #[serde(default)]
    trial_opt_out_at: Option<String>,
    #[serde(default)]
    most_recent_billing_issues_at: Option<String>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `dir`, sorted by path.
pub fn find_csv_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Input directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load subscription records from a CSV file or from every CSV file under a
/// directory.
///
/// Invalid rows fail the load with [`LtvError::InvalidRecord`] unless
/// `skip_invalid` is set, in which case they are logged and counted.
pub fn load_records(input: &Path, skip_invalid: bool) -> Result<LoadOutcome> {
    if !input.exists() {
        return Err(LtvError::InputNotFound(input.to_path_buf()));
    }

    let files = if input.is_dir() {
        let files = find_csv_files(input);
        if files.is_empty() {
            return Err(LtvError::NoDataFiles(input.to_path_buf()));
        }
        files
    } else {
        vec![input.to_path_buf()]
    };

    let mut outcome = LoadOutcome::default();
    for path in &files {
        let file = std::fs::File::open(path).map_err(|source| LtvError::FileRead {
            path: path.clone(),
            source,
        })?;
        let (records, skipped) = read_records(file, &path.display().to_string(), skip_invalid)?;
        debug!(
            "Read {} records ({} skipped) from {}",
            records.len(),
            skipped,
            path.display()
        );
        outcome.records.extend(records);
        outcome.skipped += skipped;
    }
    outcome.files = files;

    Ok(outcome)
}

/// Parse subscription rows from any reader holding CSV text with a header
/// row. `source` names the input in log messages.
///
/// Returns the valid records and the number of skipped rows.
pub fn read_records<R: Read>(
    reader: R,
    source: &str,
    skip_invalid: bool,
) -> Result<(Vec<SubscriptionRecord>, usize)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(LtvError::InvalidRecord {
                line: 1,
                reason: format!("missing required column `{column}`"),
            });
        }
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;
    let mut row = csv::ByteRecord::new();

    while rdr.read_byte_record(&mut row)? {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let converted = decode_row(&row, &headers, line)
            .and_then(|fields| {
                fields
                    .deserialize::<RawRecord>(Some(&headers))
                    .map_err(|e| LtvError::InvalidRecord {
                        line,
                        reason: e.to_string(),
                    })
            })
            .and_then(|raw| convert_record(raw, line));

        match converted {
            Ok(record) => records.push(record),
            Err(err) if skip_invalid => {
                warn!("Skipping row in {}: {}", source, err);
                skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok((records, skipped))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Check the field count of a raw row and decode it as UTF-8.
fn decode_row(
    row: &csv::ByteRecord,
    headers: &csv::StringRecord,
    line: u64,
) -> Result<csv::StringRecord> {
    if row.len() != headers.len() {
        return Err(LtvError::InvalidRecord {
            line,
            reason: format!("expected {} fields, found {}", headers.len(), row.len()),
        });
    }
    csv::StringRecord::from_byte_record(row.clone()).map_err(|e| LtvError::InvalidRecord {
        line,
        reason: format!("invalid UTF-8: {}", e.utf8_error()),
    })
}

/// Validate one raw row and convert it into a typed record.
fn convert_record(raw: RawRecord, line: u64) -> Result<SubscriptionRecord> {
    let invalid = |reason: String| LtvError::InvalidRecord { line, reason };

    let status_text = non_empty(raw.status.as_deref())
        .ok_or_else(|| invalid("status is missing".to_string()))?;
    let status: SubscriptionStatus = status_text
        .parse()
        .map_err(|e: LtvError| invalid(e.to_string()))?;

    let product_id = non_empty(raw.all_purchased_product_ids.as_deref())
        .ok_or_else(|| invalid("all_purchased_product_ids is missing".to_string()))?
        .to_string();

    let total_renewals = parse_renewals(raw.total_renewals.as_deref()).map_err(invalid)?;
    let total_spent = parse_number("total_spent", raw.total_spent.as_deref()).map_err(invalid)?;
    let rpr = parse_number("rpr", raw.rpr.as_deref()).map_err(invalid)?;
    let ip_country = non_empty(raw.ip_country.as_deref()).map(str::to_string);
    let timestamps = translate_timestamps(&raw).map_err(invalid)?;

    Ok(SubscriptionRecord {
        status,
        product_id,
        total_renewals,
        total_spent,
        rpr,
        ip_country,
        timestamps,
    })
}

/// Convert every epoch-millisecond column of a row into UTC timestamps.
fn translate_timestamps(raw: &RawRecord) -> std::result::Result<RecordTimestamps, String> {
    let cell = |column: &str, value: &Option<String>| {
        let parsed = match value.as_deref() {
            Some(text) => parse_epoch_millis(text),
            None => Ok(None),
        };
        parsed.map_err(|e| format!("{column}: {e}"))
    };

    Ok(RecordTimestamps {
        first_seen_at: cell(TIMESTAMP_COLUMNS[0], &raw.first_seen_at)?,
        last_seen_at: cell(TIMESTAMP_COLUMNS[1], &raw.last_seen_at)?,
        first_purchase_at: cell(TIMESTAMP_COLUMNS[2], &raw.first_purchase_at)?,
        trial_start_at: cell(TIMESTAMP_COLUMNS[3], &raw.trial_start_at)?,
        trial_end_at: cell(TIMESTAMP_COLUMNS[4], &raw.trial_end_at)?,
        most_recent_purchase_at: cell(TIMESTAMP_COLUMNS[5], &raw.most_recent_purchase_at)?,
        most_recent_renewal_at: cell(TIMESTAMP_COLUMNS[6], &raw.most_recent_renewal_at)?,
        latest_expiration_at: cell(TIMESTAMP_COLUMNS[7], &raw.latest_expiration_at)?,
        subscription_opt_out_at: cell(TIMESTAMP_COLUMNS[8], &raw.subscription_opt_out_at)?,
        trial_opt_out_at: cell(TIMESTAMP_COLUMNS[9], &raw.trial_opt_out_at)?,
        most_recent_billing_issues_at: cell(
            TIMESTAMP_COLUMNS[10],
            &raw.most_recent_billing_issues_at,
        )?,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an optional numeric cell. `NaN` text is treated as missing; any
/// other non-finite or non-numeric value is rejected.
fn parse_number(column: &str, value: Option<&str>) -> std::result::Result<Option<f64>, String> {
    let Some(text) = non_empty(value) else {
        return Ok(None);
    };
    let number: f64 = text
        .parse()
        .map_err(|_| format!("{column} is not a number: {text}"))?;
    if number.is_nan() {
        return Ok(None);
    }
    if !number.is_finite() {
        return Err(format!("{column} is not finite: {text}"));
    }
    Ok(Some(number))
}

/// Renewal counts may be written as floats (`"3.0"`) but must be whole and
/// non-negative.
fn parse_renewals(value: Option<&str>) -> std::result::Result<Option<u32>, String> {
    let Some(number) = parse_number("total_renewals", value)? else {
        return Ok(None);
    };
    if number < 0.0 {
        return Err(format!("total_renewals must be >= 0, got {number}"));
    }
    if number.fract() != 0.0 || number > u32::MAX as f64 {
        return Err(format!("total_renewals must be a whole count, got {number}"));
    }
    Ok(Some(number as u32))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
