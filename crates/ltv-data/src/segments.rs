//! Record counts by product, status and arbitrary segment columns.

use std::collections::HashMap;

use ltv_core::formatting::percentage;
use ltv_core::models::{
    ProductCatalog, ProductVariant, SegmentColumn, SubscriptionRecord, SubscriptionStatus,
};
use serde::Serialize;

/// Number of values listed individually in a distribution report.
pub const TOP_SEGMENTS: usize = 10;

// ── Sampling summary ──────────────────────────────────────────────────────────

/// Count and share of records for one product variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductShare {
    pub variant: ProductVariant,
    pub product_id: String,
    pub count: usize,
    /// Percentage of all records, rounded to two decimals.
    pub percent: f64,
}

/// Count and share of records in one lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusShare {
    pub status: SubscriptionStatus,
    pub count: usize,
    /// Percentage of all records, rounded to two decimals.
    pub percent: f64,
}

/// How the dataset splits across products and statuses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingSummary {
    pub total: usize,
    pub products: Vec<ProductShare>,
    pub statuses: Vec<StatusShare>,
}

// ── Distribution ──────────────────────────────────────────────────────────────

/// Users (and completed users) sharing one value of a segment column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentEntry {
    pub value: String,
    pub users: usize,
    pub completed: usize,
}

/// All values of a segment column, ranked by user count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub column: SegmentColumn,
    /// Ranked descending by `(users, completed)`, then by value.
    pub entries: Vec<SegmentEntry>,
}

impl Distribution {
    /// Number of distinct non-missing values.
    pub fn distinct_values(&self) -> usize {
        self.entries.len()
    }

    /// The `n` highest-ranked entries.
    pub fn top(&self, n: usize) -> &[SegmentEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Entries ranked below the top `n`.
    pub fn remainder(&self, n: usize) -> &[SegmentEntry] {
        &self.entries[n.min(self.entries.len())..]
    }

    /// `(min, max)` user count among the entries ranked below the top `n`,
    /// or `None` when there is no remainder.
    pub fn remainder_range(&self, n: usize) -> Option<(usize, usize)> {
        let rest = self.remainder(n);
        let min = rest.iter().map(|e| e.users).min()?;
        let max = rest.iter().map(|e| e.users).max()?;
        Some((min, max))
    }

    /// Values in rank order.
    pub fn ranked_values(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.value.clone()).collect()
    }
}

// ── SegmentAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that groups subscription records by segment.
pub struct SegmentAggregator;

impl SegmentAggregator {
    /// Count records per product variant and per status.
    ///
    /// Percentages are `0.0` for an empty dataset.
    pub fn sampling_summary(
        records: &[SubscriptionRecord],
        catalog: &ProductCatalog,
    ) -> SamplingSummary {
        let total = records.len();

        let products = ProductVariant::ALL
            .iter()
            .map(|&variant| {
                let product_id = catalog.product_id(variant).to_string();
                let count = records.iter().filter(|r| r.product_id == product_id).count();
                ProductShare {
                    variant,
                    product_id,
                    count,
                    percent: percentage(count as f64, total as f64, 2),
                }
            })
            .collect();

        let statuses = SubscriptionStatus::ALL
            .iter()
            .map(|&status| {
                let count = records.iter().filter(|r| r.status == status).count();
                StatusShare {
                    status,
                    count,
                    percent: percentage(count as f64, total as f64, 2),
                }
            })
            .collect();

        SamplingSummary {
            total,
            products,
            statuses,
        }
    }

    /// Count users and completed users for every non-missing value of
    /// `column`, ranked descending.
    pub fn distribution(records: &[SubscriptionRecord], column: SegmentColumn) -> Distribution {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

        for record in records {
            let Some(value) = column.value_of(record) else {
                continue;
            };
            let slot = counts.entry(value).or_default();
            slot.0 += 1;
            if record.status.is_completed() {
                slot.1 += 1;
            }
        }

        let mut entries: Vec<SegmentEntry> = counts
            .into_iter()
            .map(|(value, (users, completed))| SegmentEntry {
                value: value.to_string(),
                users,
                completed,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.users
                .cmp(&a.users)
                .then(b.completed.cmp(&a.completed))
                .then_with(|| a.value.cmp(&b.value))
        });

        Distribution { column, entries }
    }

    /// Records whose `column` equals `value`.
    pub fn filter<'a>(
        records: &'a [SubscriptionRecord],
        column: SegmentColumn,
        value: &str,
    ) -> Vec<&'a SubscriptionRecord> {
        records
            .iter()
            .filter(|r| column.value_of(r) == Some(value))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
