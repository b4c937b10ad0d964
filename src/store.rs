//! External store boundary
//!
//! Catalog, coupon, and offer records live in the backing store; this module
//! is the only place that talks to it. Reads are idempotent and re-fetched
//! per operation rather than cached. Every transport failure is wrapped into
//! `StorefrontError::StoreUnavailable`; whether to retry is the caller's
//! decision, no retry or timeout is enforced here.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::product::Product;
use crate::domain::coupons::{normalize_code, Coupon, CouponUsage};
use crate::domain::offers::Offer;
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct StoreClient {
    pool: PgPool,
}

impl StoreClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn fetch_products(&self, merchant: Option<Uuid>) -> Result<Vec<Product>> {
        let rows = match merchant {
            Some(m) => {
                sqlx::query_as::<_, Product>("SELECT * FROM products WHERE merchant_id = $1 ORDER BY name")
                    .bind(m).fetch_all(&self.pool).await
            }
            None => {
                sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name")
                    .fetch_all(&self.pool).await
            }
        };
        rows.map_err(unavailable)
    }

    pub async fn fetch_product(&self, id: Uuid) -> Result<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await
            .map_err(unavailable)?
            .ok_or(StorefrontError::ProductNotFound)
    }

    /// Coupons matching a code, case-normalized. Inactive rows are excluded
    /// at the source, so the validator reads them as unknown codes.
    pub async fn fetch_coupons_by_code(&self, code: &str) -> Result<Vec<Coupon>> {
        sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1 AND is_active")
            .bind(normalize_code(code)).fetch_all(&self.pool).await
            .map_err(unavailable)
    }

    /// A user's prior redemptions of one coupon, used as a count.
    pub async fn fetch_coupon_usages(&self, coupon_id: Uuid, user_id: &str) -> Result<Vec<CouponUsage>> {
        sqlx::query_as::<_, CouponUsage>("SELECT * FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2")
            .bind(coupon_id).bind(user_id).fetch_all(&self.pool).await
            .map_err(unavailable)
    }

    /// Append a redemption row and bump the advisory counter. The two
    /// statements are deliberately not one transaction; concurrent checkouts
    /// racing past validation is an accepted limitation.
    pub async fn record_coupon_usage(&self, coupon_id: Uuid, user_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO coupon_usages (id, coupon_id, user_id, used_at) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::now_v7()).bind(coupon_id).bind(user_id).bind(Utc::now())
            .execute(&self.pool).await.map_err(unavailable)?;
        sqlx::query("UPDATE coupons SET usage_count = usage_count + 1 WHERE id = $1")
            .bind(coupon_id).execute(&self.pool).await.map_err(unavailable)?;
        Ok(())
    }

    /// All offers in authoring order; the resolver's first-match tie-break
    /// depends on this order being stable.
    pub async fn fetch_offers(&self) -> Result<Vec<Offer>> {
        sqlx::query_as::<_, Offer>("SELECT * FROM offers ORDER BY created_at, id")
            .fetch_all(&self.pool).await
            .map_err(unavailable)
    }
}

fn unavailable(e: sqlx::Error) -> StorefrontError {
    StorefrontError::StoreUnavailable(e.to_string())
}
