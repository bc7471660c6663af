//! Plain-text report sections for the console.
//!
//! Every renderer returns a `String` so the binary decides where the text
//! goes and tests can assert on it directly.

use chrono_tz::Tz;
use ltv_core::formatting::{format_ltv_pair, format_number};
use ltv_core::models::{ProductVariant, SubscriptionStatus};
use ltv_core::time_utils::format_in_timezone;
use ltv_data::analysis::{AnalysisResult, LifetimeSummary, TimeSpan};
use ltv_data::country::CountryLtv;
use ltv_data::ltv_profile::SegmentLtvProfile;
use ltv_data::segments::{Distribution, SamplingSummary, TOP_SEGMENTS};

const COMPLETED_USER_NOTE: &str = "Completed user - a user who has already purchased a subscription \
a certain number of times and eventually cancelled it (the user's lifetime is presumably already over)";

fn section(title: &str) -> String {
    format!("── {title} {}", "─".repeat(60usize.saturating_sub(title.chars().count())))
}

// ── Sections ──────────────────────────────────────────────────────────────────

/// Record counts by product and by status.
pub fn render_sampling(summary: &SamplingSummary) -> String {
    let mut lines = vec![format!("Total Data: {} lines", summary.total)];

    for product in &summary.products {
        let label = match product.variant {
            ProductVariant::Yearly => "annual",
            ProductVariant::Weekly => "weekly",
        };
        lines.push(format!(
            "Number of lines about the {label} subscription: {} lines ({}%)",
            product.count,
            format_number(product.percent, 2)
        ));
    }

    lines.push(String::new());
    lines.push(COMPLETED_USER_NOTE.to_string());
    lines.push(String::new());

    for share in &summary.statuses {
        let description = share.status.description();
        lines.push(format!(
            "Number of {description}: {} ({}%)",
            share.count,
            format_number(share.percent, 2)
        ));
    }

    lines.join("\n")
}

/// Average lifetime of each product cohort.
pub fn render_lifetimes(lifetimes: &[LifetimeSummary]) -> String {
    lifetimes
        .iter()
        .map(|summary| match summary.lifetime {
            Some(lifetime) => format!(
                "The average user lifetime for a {} is {} {}",
                summary.product_id,
                format_number(lifetime, 2),
                summary.period
            ),
            None => format!(
                "The average user lifetime for a {} is unknown (no completed users)",
                summary.product_id
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Top values of a segment column and the spread of the rest.
pub fn render_distribution(distribution: &Distribution) -> String {
    let column = distribution.column.as_str();
    let mut lines = vec![
        format!("Number of {column}: {}", distribution.distinct_values()),
        String::new(),
        format!("Top {TOP_SEGMENTS} {column} by number of users:"),
    ];

    for (rank, entry) in distribution.top(TOP_SEGMENTS).iter().enumerate() {
        lines.push(format!(
            "{}. {} - {} users (and {} of them are completed users)",
            rank + 1,
            entry.value,
            entry.users,
            entry.completed
        ));
    }

    if let Some((min, max)) = distribution.remainder_range(TOP_SEGMENTS) {
        lines.push(String::new());
        lines.push(format!(
            "For other {column} the number of users is from {min} to {max} people"
        ));
    }

    lines.join("\n")
}

/// Ranked `(yearly, weekly)` LTV per country.
pub fn render_country_ltv(countries: &[CountryLtv]) -> String {
    if countries.is_empty() {
        return "No country data available".to_string();
    }
    countries
        .iter()
        .map(|c| {
            format!(
                "For users from {} LTV is {}",
                c.country,
                format_ltv_pair(c.yearly, c.weekly)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Zero-LTV share and summary statistics of each profiled segment.
pub fn render_profiles(profiles: &[SegmentLtvProfile]) -> String {
    let mut lines = Vec::new();
    for profile in profiles {
        lines.push(format!("{} ({} users)", profile.segment, profile.users));
        lines.push(format!(
            "  Numb of zero: {} ({}%)",
            profile.zero_ltv,
            format_number(profile.zero_ltv_percent, 2)
        ));
        match profile.stats {
            Some(stats) => lines.push(format!(
                "  LTV statistics: mean {}, min {}, max {}",
                format_number(stats.mean, 2),
                format_number(stats.min, 2),
                format_number(stats.max, 2)
            )),
            None => lines.push("  LTV statistics: n/a".to_string()),
        }
    }
    lines.join("\n")
}

/// Earliest and latest activity in `tz`.
pub fn render_time_span(span: &TimeSpan, tz: Tz) -> String {
    let show = |value: Option<chrono::DateTime<chrono::Utc>>| {
        value
            .map(|dt| format_in_timezone(dt, tz))
            .unwrap_or_else(|| "n/a".to_string())
    };
    format!(
        "Data covers {} to {}",
        show(span.first_seen),
        show(span.last_seen)
    )
}

/// The complete console report.
pub fn render_report(result: &AnalysisResult, tz: Tz) -> String {
    let mut parts = vec![
        section("Sampling"),
        render_sampling(&result.sampling),
        render_time_span(&result.time_span, tz),
        String::new(),
        section("Lifetime"),
        render_lifetimes(&result.lifetimes),
        String::new(),
        section("Status"),
        render_distribution(&result.status_distribution),
        String::new(),
        section("Countries"),
        render_distribution(&result.country_distribution),
        String::new(),
        section("LTV by country (yearly, weekly)"),
        render_country_ltv(&result.country_ltv),
        String::new(),
    ];

    if result.segment_distribution.column != result.country_distribution.column
        && result.segment_distribution.column != result.status_distribution.column
    {
        parts.push(section("Segments"));
        parts.push(render_distribution(&result.segment_distribution));
        parts.push(String::new());
    }

    parts.push(section(&format!(
        "LTV distribution by {}",
        result.segment_distribution.column
    )));
    parts.push(render_profiles(&result.ltv_profiles));

    if result.metadata.records_skipped > 0 {
        parts.push(String::new());
        parts.push(format!(
            "{} invalid rows were skipped",
            result.metadata.records_skipped
        ));
    }

    parts.join("\n")
}

/// Whether any completed user exists, i.e. whether lifetimes are defined at
/// all.
pub fn has_completed_users(summary: &SamplingSummary) -> bool {
    summary
        .statuses
        .iter()
        .any(|s| s.status == SubscriptionStatus::Cancelled && s.count > 0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ltv_core::models::{ProductCatalog, SegmentColumn, SubscriptionRecord};
    use ltv_data::analysis::{analyze_records, AnalysisOptions};
    use ltv_data::segments::SegmentAggregator;
    use std::path::PathBuf;

    fn country_records(counts: &[(&str, usize)]) -> Vec<SubscriptionRecord> {
        counts
            .iter()
            .flat_map(|&(country, n)| {
                (0..n).map(move |_| SubscriptionRecord {
                    ip_country: Some(country.to_string()),
                    total_renewals: Some(1),
                    total_spent: Some(10.0),
                    rpr: Some(1.0),
                    ..SubscriptionRecord::new(SubscriptionStatus::Cancelled, "com.app.week")
                })
            })
            .collect()
    }

    #[test]
    fn test_render_sampling() {
        let records = vec![
            SubscriptionRecord::new(SubscriptionStatus::Cancelled, "com.app.year"),
            SubscriptionRecord::new(SubscriptionStatus::Active, "com.app.week"),
            SubscriptionRecord::new(SubscriptionStatus::Active, "com.app.week"),
            SubscriptionRecord::new(SubscriptionStatus::Expired, "com.app.week"),
        ];
        let summary = SegmentAggregator::sampling_summary(&records, &ProductCatalog::default());
        let text = render_sampling(&summary);

        assert!(text.starts_with("Total Data: 4 lines"));
        assert!(text.contains("Number of lines about the annual subscription: 1 lines (25.00%)"));
        assert!(text.contains("Number of lines about the weekly subscription: 3 lines (75.00%)"));
        assert!(text.contains("Number of Completed users: 1 (25.00%)"));
        assert!(text.contains("Number of active users: 2 (50.00%)"));
        assert!(text.contains("Number of users who failed to issue a receipt: 1 (25.00%)"));
        assert!(has_completed_users(&summary));
    }

    #[test]
    fn test_render_lifetimes() {
        let lifetimes = vec![
            LifetimeSummary {
                variant: ProductVariant::Yearly,
                product_id: "com.app.year".to_string(),
                period: "year".to_string(),
                lifetime: Some(3.0),
                completed_users: 2,
            },
            LifetimeSummary {
                variant: ProductVariant::Weekly,
                product_id: "com.app.week".to_string(),
                period: "week".to_string(),
                lifetime: None,
                completed_users: 0,
            },
        ];
        let text = render_lifetimes(&lifetimes);
        assert!(text.contains("The average user lifetime for a com.app.year is 3.00 year"));
        assert!(text.contains("com.app.week is unknown"));
    }

    #[test]
    fn test_render_distribution_with_remainder() {
        let counts: Vec<(String, usize)> =
            (1..=12).map(|i| (format!("C{i:02}"), i)).collect();
        let refs: Vec<(&str, usize)> = counts.iter().map(|(c, n)| (c.as_str(), *n)).collect();
        let records = country_records(&refs);
        let dist = SegmentAggregator::distribution(&records, SegmentColumn::IpCountry);
        let text = render_distribution(&dist);

        assert!(text.starts_with("Number of ip_country: 12"));
        assert!(text.contains("1. C12 - 12 users (and 12 of them are completed users)"));
        assert!(text.contains("10. C03 - 3 users"));
        assert!(!text.contains("11."));
        assert!(text.contains("For other ip_country the number of users is from 1 to 2 people"));
    }

    #[test]
    fn test_render_distribution_without_remainder() {
        let records = country_records(&[("US", 2), ("DE", 1)]);
        let dist = SegmentAggregator::distribution(&records, SegmentColumn::IpCountry);
        let text = render_distribution(&dist);
        assert!(text.contains("2. DE - 1 users"));
        assert!(!text.contains("For other"));
    }

    #[test]
    fn test_render_country_ltv() {
        let countries = vec![
            CountryLtv {
                country: "US".to_string(),
                users: 3,
                yearly: Some(12.5),
                weekly: None,
            },
            CountryLtv {
                country: "DE".to_string(),
                users: 1,
                yearly: None,
                weekly: Some(4.0),
            },
        ];
        let text = render_country_ltv(&countries);
        assert_eq!(
            text,
            "For users from US LTV is (12.50, n/a)\nFor users from DE LTV is (n/a, 4.00)"
        );
        assert_eq!(render_country_ltv(&[]), "No country data available");
    }

    #[test]
    fn test_render_time_span() {
        let span = TimeSpan {
            first_seen: Some(chrono::Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
            last_seen: None,
        };
        assert_eq!(
            render_time_span(&span, Tz::UTC),
            "Data covers 2021-01-01 00:00:00 UTC to n/a"
        );
    }

    #[test]
    fn test_render_report_contains_every_section() {
        let records = country_records(&[("US", 2), ("DE", 1)]);
        let options = AnalysisOptions {
            input: PathBuf::from("export.csv"),
            catalog: ProductCatalog::default(),
            segment_column: SegmentColumn::Product,
            top_n: 10,
            skip_invalid: false,
        };
        let result = analyze_records(records, &options);
        let text = render_report(&result, Tz::UTC);

        assert!(text.contains("── Sampling"));
        assert!(text.contains("The average user lifetime for a com.app.week is 2.00 week"));
        assert!(text.contains("For users from US LTV is (n/a, 10.00)"));
        assert!(text.contains("── Segments"));
        assert!(text.contains("Number of all_purchased_product_ids: 1"));
        assert!(text.contains("com.app.week (3 users)"));
        assert!(text.contains("LTV statistics: mean 10.00, min 10.00, max 10.00"));
        assert!(!text.contains("invalid rows"));
    }
}
