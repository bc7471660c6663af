//! Yearly and weekly LTV estimates per country.

use std::cmp::Ordering;
use std::collections::HashSet;

use ltv_core::calculations::LtvCalculator;
use ltv_core::models::{ProductCatalog, ProductVariant, SegmentColumn, SubscriptionRecord};
use serde::Serialize;
use tracing::debug;

use crate::segments::SegmentAggregator;

/// Renewal purchase rate applied to every country cohort.
pub const COUNTRY_RPR: f64 = 1.0;

/// LTV of the yearly and weekly cohorts of one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryLtv {
    pub country: String,
    /// Records from this country, any product.
    pub users: usize,
    /// `None` when the yearly cohort is empty or has no completed users.
    pub yearly: Option<f64>,
    /// `None` when the weekly cohort is empty or has no completed users.
    pub weekly: Option<f64>,
}

/// LTV of one product cohort: cohort mean AOV × [`COUNTRY_RPR`] × cohort
/// lifetime.
fn cohort_ltv(cohort: &[&SubscriptionRecord]) -> Option<f64> {
    let aov = LtvCalculator::cohort_average_order_value(cohort)?;
    let lifetime = LtvCalculator::lifetime(cohort)?;
    Some(LtvCalculator::ltv(aov, COUNTRY_RPR, lifetime))
}

/// `None` ranks below every value.
fn compare_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Compute [`CountryLtv`] for each listed country and rank the results
/// descending by `(yearly, weekly)`.
///
/// Repeated countries are reported once. A country with no records still
/// appears, with both cohorts `None`.
pub fn ltv_by_country(
    records: &[SubscriptionRecord],
    countries: &[String],
    catalog: &ProductCatalog,
) -> Vec<CountryLtv> {
    let mut seen = HashSet::new();
    let mut results: Vec<CountryLtv> = countries
        .iter()
        .filter(|country| seen.insert(*country))
        .map(|country| {
            let members = SegmentAggregator::filter(records, SegmentColumn::IpCountry, country);
            let cohort = |variant: ProductVariant| -> Vec<&SubscriptionRecord> {
                members
                    .iter()
                    .copied()
                    .filter(|r| catalog.variant_of(&r.product_id) == Some(variant))
                    .collect()
            };
            let yearly = cohort_ltv(&cohort(ProductVariant::Yearly));
            let weekly = cohort_ltv(&cohort(ProductVariant::Weekly));
            debug!(country = %country, users = members.len(), ?yearly, ?weekly, "country LTV");
            CountryLtv {
                country: country.clone(),
                users: members.len(),
                yearly,
                weekly,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        compare_optional(b.yearly, a.yearly)
            .then_with(|| compare_optional(b.weekly, a.weekly))
            .then_with(|| a.country.cmp(&b.country))
    });
    results
}

// ── Tests ─────────────────────────────────────────────────────────────────────
