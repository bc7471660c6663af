use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LtvError;

/// Lifecycle state of a subscription at export time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paying subscriber whose subscription is still running.
    Active,
    /// User inside the free trial period.
    FreeTrial,
    /// Subscriber who paid at least once and then cancelled ("completed" user).
    Cancelled,
    /// Subscription lapsed because a receipt could not be issued.
    Expired,
    /// User who did not convert after the trial period.
    CancelledTrial,
}

impl SubscriptionStatus {
    /// Every status, in report order.
    pub const ALL: [SubscriptionStatus; 5] = [
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Active,
        SubscriptionStatus::FreeTrial,
        SubscriptionStatus::Expired,
        SubscriptionStatus::CancelledTrial,
    ];

    /// The identifier used in the export file.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::FreeTrial => "free_trial",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::CancelledTrial => "cancelled_trial",
        }
    }

    /// Human-readable description of the users in this state, used by the
    /// sampling report.
    pub fn description(&self) -> &'static str {
        match self {
            SubscriptionStatus::Cancelled => "Completed users",
            SubscriptionStatus::Active => "active users",
            SubscriptionStatus::FreeTrial => "users who still have a free trial period",
            SubscriptionStatus::Expired => "users who failed to issue a receipt",
            SubscriptionStatus::CancelledTrial => {
                "users who did not renew their subscription after the trial period"
            }
        }
    }

    /// Whether the user's lifetime is over, i.e. the record counts towards
    /// the lifetime estimate.
    pub fn is_completed(&self) -> bool {
        matches!(self, SubscriptionStatus::Cancelled)
    }
}

impl FromStr for SubscriptionStatus {
    type Err = LtvError;

    /// Exact, trimmed match against the export identifiers.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "active" => Ok(SubscriptionStatus::Active),
            "free_trial" => Ok(SubscriptionStatus::FreeTrial),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "expired" => Ok(SubscriptionStatus::Expired),
            "cancelled_trial" => Ok(SubscriptionStatus::CancelledTrial),
            other => Err(LtvError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lifecycle timestamps carried by an export row, converted from epoch
/// milliseconds to UTC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordTimestamps {
    pub first_seen_at: Option<DateTime<Utc>>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub first_purchase_at: Option<DateTime<Utc>>,
    pub trial_start_at: Option<DateTime<Utc>>,
    pub trial_end_at: Option<DateTime<Utc>>,
    pub most_recent_purchase_at: Option<DateTime<Utc>>,
    pub most_recent_renewal_at: Option<DateTime<Utc>>,
    pub latest_expiration_at: Option<DateTime<Utc>>,
    pub subscription_opt_out_at: Option<DateTime<Utc>>,
    pub trial_opt_out_at: Option<DateTime<Utc>>,
    pub most_recent_billing_issues_at: Option<DateTime<Utc>>,
}

/// One row of the subscription export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Lifecycle state.
    pub status: SubscriptionStatus,
    /// Purchased product identifier, e.g. `com.app.year`.
    pub product_id: String,
    /// Number of renewals after the first purchase.
    #[serde(default)]
    pub total_renewals: Option<u32>,
    /// Total amount spent by the user.
    #[serde(default)]
    pub total_spent: Option<f64>,
    /// Renewal purchase rate multiplier.
    #[serde(default)]
    pub rpr: Option<f64>,
    /// Country the user was seen from.
    #[serde(default)]
    pub ip_country: Option<String>,
    /// Parsed lifecycle timestamps.
    #[serde(default)]
    pub timestamps: RecordTimestamps,
}

impl SubscriptionRecord {
    /// Record with the given status and product and every optional field
    /// missing.
    pub fn new(status: SubscriptionStatus, product_id: impl Into<String>) -> Self {
        Self {
            status,
            product_id: product_id.into(),
            total_renewals: None,
            total_spent: None,
            rpr: None,
            ip_country: None,
            timestamps: RecordTimestamps::default(),
        }
    }
}

// ── Products ──────────────────────────────────────────────────────────────────

/// The two subscription products the analysis distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductVariant {
    Yearly,
    Weekly,
}

impl ProductVariant {
    pub const ALL: [ProductVariant; 2] = [ProductVariant::Yearly, ProductVariant::Weekly];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductVariant::Yearly => "yearly",
            ProductVariant::Weekly => "weekly",
        }
    }
}

impl fmt::Display for ProductVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default identifier of the yearly product.
pub const DEFAULT_YEARLY_PRODUCT: &str = "com.app.year";
/// Default identifier of the weekly product.
pub const DEFAULT_WEEKLY_PRODUCT: &str = "com.app.week";

/// Maps product identifiers onto [`ProductVariant`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCatalog {
    pub yearly_id: String,
    pub weekly_id: String,
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_YEARLY_PRODUCT, DEFAULT_WEEKLY_PRODUCT)
    }
}

impl ProductCatalog {
    pub fn new(yearly_id: impl Into<String>, weekly_id: impl Into<String>) -> Self {
        Self {
            yearly_id: yearly_id.into(),
            weekly_id: weekly_id.into(),
        }
    }

    /// Variant for `product_id`, or `None` for a product outside the catalog.
    pub fn variant_of(&self, product_id: &str) -> Option<ProductVariant> {
        if product_id == self.yearly_id {
            Some(ProductVariant::Yearly)
        } else if product_id == self.weekly_id {
            Some(ProductVariant::Weekly)
        } else {
            None
        }
    }

    /// Product identifier configured for `variant`.
    pub fn product_id(&self, variant: ProductVariant) -> &str {
        match variant {
            ProductVariant::Yearly => &self.yearly_id,
            ProductVariant::Weekly => &self.weekly_id,
        }
    }

    /// Billing period named by the last dot-separated segment of a product
    /// identifier: `com.app.year` → `year`.
    pub fn period_label(product_id: &str) -> &str {
        product_id.rsplit('.').next().unwrap_or(product_id)
    }
}

/// Lifetime (in billing cycles) per product cohort. `None` when the cohort
/// has no completed users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductLifetimes {
    pub yearly: Option<f64>,
    pub weekly: Option<f64>,
}

impl ProductLifetimes {
    pub fn get(&self, variant: ProductVariant) -> Option<f64> {
        match variant {
            ProductVariant::Yearly => self.yearly,
            ProductVariant::Weekly => self.weekly,
        }
    }

    /// Lifetime constant applied to a record of `product_id`. Products
    /// outside the catalog, and cohorts without a lifetime, get 0.
    pub fn for_product(&self, catalog: &ProductCatalog, product_id: &str) -> f64 {
        catalog
            .variant_of(product_id)
            .and_then(|variant| self.get(variant))
            .unwrap_or(0.0)
    }
}

// ── Segments ──────────────────────────────────────────────────────────────────

/// Column a report can be segmented by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentColumn {
    Status,
    Product,
    IpCountry,
}

impl SegmentColumn {
    /// Column name as it appears in the export header.
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentColumn::Status => "status",
            SegmentColumn::Product => "all_purchased_product_ids",
            SegmentColumn::IpCountry => "ip_country",
        }
    }

    /// Value of this column for `record`, `None` when the cell was empty.
    pub fn value_of<'a>(&self, record: &'a SubscriptionRecord) -> Option<&'a str> {
        match self {
            SegmentColumn::Status => Some(record.status.as_str()),
            SegmentColumn::Product => Some(record.product_id.as_str()),
            SegmentColumn::IpCountry => record.ip_country.as_deref(),
        }
    }
}

impl FromStr for SegmentColumn {
    type Err = LtvError;

    /// Accepts the export column names plus the short alias `product`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "status" => Ok(SegmentColumn::Status),
            "product" | "all_purchased_product_ids" => Ok(SegmentColumn::Product),
            "ip_country" | "country" => Ok(SegmentColumn::IpCountry),
            other => Err(LtvError::Config(format!("unknown segment column: {other}"))),
        }
    }
}

impl fmt::Display for SegmentColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record together with its derived values for one report run.
#[derive(Debug, Clone, Copy)]
pub struct LtvRecord<'a> {
    pub record: &'a SubscriptionRecord,
    /// Average order value of the record.
    pub average_cost: f64,
    /// Lifetime constant of the record's product.
    pub lifetime: f64,
    /// `average_cost × rpr × lifetime`.
    pub ltv: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str_all_variants() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_from_str_rejects_unknown() {
        let err = "paused".parse::<SubscriptionStatus>().unwrap_err();
        assert!(matches!(err, LtvError::InvalidStatus(ref s) if s == "paused"));
    }

    #[test]
    fn test_status_from_str_trims() {
        assert_eq!(
            " cancelled ".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Cancelled
        );
    }

    #[test]
    fn test_only_cancelled_is_completed() {
        let completed: Vec<_> = SubscriptionStatus::ALL
            .iter()
            .filter(|s| s.is_completed())
            .collect();
        assert_eq!(completed, vec![&SubscriptionStatus::Cancelled]);
    }

    #[test]
    fn test_catalog_variant_lookup() {
        let catalog = ProductCatalog::default();
        assert_eq!(catalog.variant_of("com.app.year"), Some(ProductVariant::Yearly));
        assert_eq!(catalog.variant_of("com.app.week"), Some(ProductVariant::Weekly));
        assert_eq!(catalog.variant_of("com.app.month"), None);
        assert_eq!(catalog.product_id(ProductVariant::Weekly), "com.app.week");
    }

    #[test]
    fn test_period_label() {
        assert_eq!(ProductCatalog::period_label("com.app.year"), "year");
        assert_eq!(ProductCatalog::period_label("weekly"), "weekly");
    }

    #[test]
    fn test_lifetimes_for_product() {
        let catalog = ProductCatalog::default();
        let lifetimes = ProductLifetimes {
            yearly: Some(1.5),
            weekly: None,
        };
        assert_eq!(lifetimes.for_product(&catalog, "com.app.year"), 1.5);
        assert_eq!(lifetimes.for_product(&catalog, "com.app.week"), 0.0);
        assert_eq!(lifetimes.for_product(&catalog, "com.other"), 0.0);
    }

    #[test]
    fn test_segment_column_parse_and_lookup() {
        let column: SegmentColumn = "product".parse().unwrap();
        assert_eq!(column, SegmentColumn::Product);
        assert!("plan".parse::<SegmentColumn>().is_err());

        let mut record = SubscriptionRecord::new(SubscriptionStatus::Expired, "com.app.week");
        assert_eq!(SegmentColumn::IpCountry.value_of(&record), None);
        record.ip_country = Some("DE".to_string());
        assert_eq!(SegmentColumn::IpCountry.value_of(&record), Some("DE"));
        assert_eq!(SegmentColumn::Status.value_of(&record), Some("expired"));
        assert_eq!(SegmentColumn::Product.value_of(&record), Some("com.app.week"));
    }
}
