//! Offer resolution
//!
//! Offers are admin-authored, time-boxed discounts on single products. The
//! resolver is recomputed from scratch on every catalog refresh; nothing is
//! mutated in place. When several live offers target one product, the first
//! in the source list wins — list order, not best discount.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::Percent;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub product_id: Uuid,
    pub discount_percent: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Offer {
    /// Live iff active, `starts_at <= now < ends_at`, and the discount is a
    /// valid percentage.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at <= now
            && now < self.ends_at
            && Percent::new(self.discount_percent).is_ok()
    }
}

/// Join live offers to their products, at most one offer per product.
/// Offers whose product no longer exists are dropped.
pub fn active_offers_for<'a>(
    products: &'a [Product],
    offers: &'a [Offer],
    now: DateTime<Utc>,
) -> impl Iterator<Item = (&'a Product, &'a Offer)> + 'a {
    let mut claimed = HashSet::new();
    offers.iter().filter_map(move |offer| {
        if !offer.is_live(now) { return None; }
        let product = products.iter().find(|p| p.id == offer.product_id)?;
        if !claimed.insert(offer.product_id) { return None; }
        Some((product, offer))
    })
}

/// Offer-discounted display price for the catalog surface. An out-of-range
/// discount leaves the price untouched; the resolver never yields one.
pub fn display_price(product: &Product, offer: &Offer) -> Decimal {
    match Percent::new(offer.discount_percent) {
        Ok(pct) => pct.apply_to(product.effective_price(None)),
        Err(_) => product.effective_price(None),
    }
}
