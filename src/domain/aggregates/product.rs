//! Catalog product snapshot
//!
//! Products are authored in the external store; the core only reads them.
//! A product added to a cart is snapshotted, so later catalog edits never
//! reprice an open cart.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::Size;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    /// None means the house catalog, which acts as its own implicit merchant.
    pub merchant_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub size_s_price: Option<Decimal>,
    pub size_m_price: Option<Decimal>,
    pub size_l_price: Option<Decimal>,
    pub has_sizes: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Tier price when the product defines one for the requested tier,
    /// base price otherwise. An unknown or unset size falls back silently;
    /// this is policy, not an error.
    pub fn effective_price(&self, size: Option<Size>) -> Decimal {
        let tier = match size {
            Some(Size::S) => self.size_s_price,
            Some(Size::M) => self.size_m_price,
            Some(Size::L) => self.size_l_price,
            None => None,
        };
        tier.unwrap_or(self.price)
    }
}
