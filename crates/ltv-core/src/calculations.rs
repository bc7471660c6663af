use crate::models::{
    LtvRecord, ProductCatalog, ProductLifetimes, ProductVariant, SubscriptionRecord,
    SubscriptionStatus,
};

/// Interface for any subscription row from which lifetime, order value and
/// LTV figures can be derived.
pub trait SubscriptionLike {
    /// Lifecycle state of the subscription.
    fn status(&self) -> SubscriptionStatus;
    /// Purchased product identifier.
    fn product_id(&self) -> &str;
    /// Renewals after the first purchase, if recorded.
    fn total_renewals(&self) -> Option<u32>;
    /// Total amount spent, if recorded.
    fn total_spent(&self) -> Option<f64>;
    /// Renewal purchase rate, if recorded.
    fn rpr(&self) -> Option<f64>;

    /// Paid billing cycles: the first purchase plus every renewal. Missing
    /// renewals count as zero.
    fn billing_cycles(&self) -> u32 {
        self.total_renewals().unwrap_or(0).saturating_add(1)
    }
}

impl SubscriptionLike for SubscriptionRecord {
    fn status(&self) -> SubscriptionStatus {
        self.status
    }

    fn product_id(&self) -> &str {
        &self.product_id
    }

    fn total_renewals(&self) -> Option<u32> {
        self.total_renewals
    }

    fn total_spent(&self) -> Option<f64> {
        self.total_spent
    }

    fn rpr(&self) -> Option<f64> {
        self.rpr
    }
}

impl<T: SubscriptionLike + ?Sized> SubscriptionLike for &T {
    fn status(&self) -> SubscriptionStatus {
        (**self).status()
    }

    fn product_id(&self) -> &str {
        (**self).product_id()
    }

    fn total_renewals(&self) -> Option<u32> {
        (**self).total_renewals()
    }

    fn total_spent(&self) -> Option<f64> {
        (**self).total_spent()
    }

    fn rpr(&self) -> Option<f64> {
        (**self).rpr()
    }
}

// ── LtvCalculator ─────────────────────────────────────────────────────────────

/// Stateless collection of lifetime, order-value and LTV calculations.
pub struct LtvCalculator;

impl LtvCalculator {
    /// Average user lifetime in billing cycles: the mean of
    /// `total_renewals + 1` over completed (cancelled) records.
    ///
    /// Returns `None` when no record is completed.
    pub fn lifetime<B: SubscriptionLike>(records: &[B]) -> Option<f64> {
        let (sum, count) = records
            .iter()
            .filter(|r| r.status().is_completed())
            .fold((0.0_f64, 0usize), |(sum, count), r| {
                (sum + f64::from(r.billing_cycles()), count + 1)
            });
        if count == 0 {
            return None;
        }
        Some(sum / count as f64)
    }

    /// Average order value of a single record:
    /// `total_spent / (total_renewals + 1)` with missing values read as zero.
    pub fn average_order_value<B: SubscriptionLike>(record: &B) -> f64 {
        let spent = record.total_spent().unwrap_or(0.0);
        spent / f64::from(record.billing_cycles())
    }

    /// Mean average order value across a cohort, `None` for an empty cohort.
    pub fn cohort_average_order_value<B: SubscriptionLike>(records: &[B]) -> Option<f64> {
        if records.is_empty() {
            return None;
        }
        let total: f64 = records.iter().map(Self::average_order_value).sum();
        Some(total / records.len() as f64)
    }

    /// `aov × rpr × lifetime`.
    pub fn ltv(average_order_value: f64, rpr: f64, lifetime: f64) -> f64 {
        average_order_value * rpr * lifetime
    }

    /// Lifetime of each catalog product, each computed over its own cohort.
    pub fn product_lifetimes<B: SubscriptionLike>(
        records: &[B],
        catalog: &ProductCatalog,
    ) -> ProductLifetimes {
        let cohort = |variant: ProductVariant| -> Option<f64> {
            let members: Vec<&B> = records
                .iter()
                .filter(|r| catalog.variant_of(r.product_id()) == Some(variant))
                .collect();
            Self::lifetime(&members)
        };
        ProductLifetimes {
            yearly: cohort(ProductVariant::Yearly),
            weekly: cohort(ProductVariant::Weekly),
        }
    }

    /// Attach average order value, product lifetime and LTV to every record.
    ///
    /// Records of products outside the catalog get lifetime 0 and so LTV 0.
    /// A missing `rpr` is read as zero.
    pub fn score_records<'a>(
        records: &'a [SubscriptionRecord],
        catalog: &ProductCatalog,
        lifetimes: &ProductLifetimes,
    ) -> Vec<LtvRecord<'a>> {
        records
            .iter()
            .map(|record| {
                let average_cost = Self::average_order_value(record);
                let lifetime = lifetimes.for_product(catalog, &record.product_id);
                let ltv = Self::ltv(average_cost, record.rpr.unwrap_or(0.0), lifetime);
                LtvRecord {
                    record,
                    average_cost,
                    lifetime,
                    ltv,
                }
            })
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
