//! Vendora Storefront
//!
//! Multi-tenant storefront core: shoppers browse per-merchant catalogs,
//! fill a cart, apply coupons, and check out via a messaging handoff.
//!
//! ## Features
//! - Cart with add-time price snapshots and a single-merchant constraint
//! - Coupon validation (date window, per-user usage ceiling)
//! - Time-boxed per-product offers with discounted display prices
//! - Durable per-session cart storage (best-effort JSON mirror)
//! - Checkout handoff message composer (no settlement happens here)

use thiserror::Error;

pub mod checkout;
pub mod domain;
pub mod storage;
pub mod store;

use crate::domain::aggregates::cart::CartError;
use crate::domain::coupons::CouponError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Coupon code not found")]
    InvalidCode,

    #[error("Coupon is outside its validity window")]
    Expired,

    #[error("Coupon usage limit reached")]
    UsageLimitReached,

    #[error("External store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Cart is restricted to a single merchant; clear it to switch")]
    GuardViolation,

    #[error("Product not found")]
    ProductNotFound,
}

impl From<CouponError> for StorefrontError {
    fn from(e: CouponError) -> Self {
        match e {
            CouponError::InvalidCode => Self::InvalidCode,
            CouponError::Expired => Self::Expired,
            CouponError::UsageLimitReached => Self::UsageLimitReached,
        }
    }
}

impl From<CartError> for StorefrontError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::MerchantMismatch => Self::GuardViolation,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
