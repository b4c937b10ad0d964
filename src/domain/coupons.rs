//! Coupon validation
//!
//! Pure and side-effect free: given the fetched coupon set, the user's prior
//! usage rows, and `now`, decide whether a code applies. Recording a usage
//! row happens separately, at confirmed checkout only, so repeated
//! validation of the same inputs returns the same result.
//!
//! Known limitation: the usage count is read as of the fetch, so two
//! concurrent checkouts by the same user can both pass validation before
//! either records a usage row. The ceiling enforced here is advisory.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::Percent;

/// Coupon record as authored in the external store. Codes are stored
/// upper-cased and matched case-insensitively.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_percent: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Per-user redemption ceiling as validated here. The global
    /// `usage_count` counter is carried but advisory.
    pub max_usage: i32,
    pub usage_count: i32,
    pub is_active: bool,
}

/// Append-only redemption audit row; one per successful checkout.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CouponUsage {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub user_id: String,
    pub used_at: DateTime<Utc>,
}

/// A validated coupon held alongside the cart until checkout or removal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub code: String,
    /// Who validated it; checkout records the usage row for this user.
    pub user_id: String,
    pub discount: Percent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponError { InvalidCode, Expired, UsageLimitReached }

impl CouponError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidCode => "invalid_code",
            Self::Expired => "expired",
            Self::UsageLimitReached => "usage_limit_reached",
        }
    }
}

impl std::error::Error for CouponError {}
impl std::fmt::Display for CouponError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCode => write!(f, "Coupon code not found"),
            Self::Expired => write!(f, "Coupon is outside its validity window"),
            Self::UsageLimitReached => write!(f, "Coupon usage limit reached"),
        }
    }
}

pub fn normalize_code(code: &str) -> String { code.trim().to_uppercase() }

/// Decide whether `code` applies for `user_id` at `now`.
///
/// Lookup is over the active coupon set, so an inactive coupon reads as an
/// unknown code. The validity window is half-open: `starts_at <= now < ends_at`.
pub fn validate_coupon(
    code: &str,
    user_id: &str,
    coupons: &[Coupon],
    usages: &[CouponUsage],
    now: DateTime<Utc>,
) -> Result<AppliedCoupon, CouponError> {
    let code = normalize_code(code);
    let coupon = coupons
        .iter()
        .find(|c| c.is_active && normalize_code(&c.code) == code)
        .ok_or(CouponError::InvalidCode)?;
    let discount = Percent::new(coupon.discount_percent).map_err(|_| CouponError::InvalidCode)?;
    if now < coupon.starts_at || now >= coupon.ends_at {
        return Err(CouponError::Expired);
    }
    let prior = usages
        .iter()
        .filter(|u| u.coupon_id == coupon.id && u.user_id == user_id)
        .count();
    if prior as i64 >= i64::from(coupon.max_usage) {
        return Err(CouponError::UsageLimitReached);
    }
    Ok(AppliedCoupon { coupon_id: coupon.id, code, user_id: user_id.to_string(), discount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(code: &str, max_usage: i32) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(), code: code.to_string(),
            discount_percent: Decimal::new(20, 0),
            starts_at: now - Duration::days(1), ends_at: now + Duration::days(1),
            max_usage, usage_count: 0, is_active: true,
        }
    }

    fn usage(c: &Coupon, user: &str) -> CouponUsage {
        CouponUsage { id: Uuid::new_v4(), coupon_id: c.id, user_id: user.into(), used_at: Utc::now() }
    }

    #[test]
    fn test_unknown_code() {
        let err = validate_coupon("NOPE", "u1", &[coupon("SAVE20", 5)], &[], Utc::now());
        assert_eq!(err, Err(CouponError::InvalidCode));
    }

    #[test]
    fn test_code_normalized() {
        let coupons = [coupon("SAVE20", 5)];
        let applied = validate_coupon("  save20 ", "u1", &coupons, &[], Utc::now()).unwrap();
        assert_eq!(applied.code, "SAVE20");
        assert_eq!(applied.discount.value(), Decimal::new(20, 0));
    }

    #[test]
    fn test_inactive_reads_as_unknown() {
        let mut c = coupon("SAVE20", 5);
        c.is_active = false;
        assert_eq!(validate_coupon("SAVE20", "u1", &[c], &[], Utc::now()), Err(CouponError::InvalidCode));
    }

    #[test]
    fn test_not_yet_started_is_expired() {
        let mut c = coupon("SAVE20", 5);
        c.starts_at = Utc::now() + Duration::days(1);
        c.ends_at = Utc::now() + Duration::days(2);
        assert_eq!(validate_coupon("SAVE20", "u1", &[c], &[], Utc::now()), Err(CouponError::Expired));
    }

    #[test]
    fn test_window_is_half_open() {
        let c = coupon("SAVE20", 5);
        assert!(validate_coupon("SAVE20", "u1", std::slice::from_ref(&c), &[], c.starts_at).is_ok());
        assert_eq!(
            validate_coupon("SAVE20", "u1", std::slice::from_ref(&c), &[], c.ends_at),
            Err(CouponError::Expired)
        );
    }

    #[test]
    fn test_per_user_usage_ceiling() {
        let c = coupon("SAVE20", 1);
        let used = [usage(&c, "userA")];
        assert_eq!(
            validate_coupon("SAVE20", "userA", std::slice::from_ref(&c), &used, Utc::now()),
            Err(CouponError::UsageLimitReached)
        );
        // a different user with no prior usage still qualifies
        let applied = validate_coupon("SAVE20", "userB", std::slice::from_ref(&c), &used, Utc::now()).unwrap();
        assert_eq!(applied.discount.value(), Decimal::new(20, 0));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let coupons = [coupon("SAVE20", 3)];
        let usages = [usage(&coupons[0], "u1")];
        let now = Utc::now();
        let a = validate_coupon("SAVE20", "u1", &coupons, &usages, now).unwrap();
        let b = validate_coupon("SAVE20", "u1", &coupons, &usages, now).unwrap();
        assert_eq!(a.coupon_id, b.coupon_id);
        assert_eq!(a.discount, b.discount);
    }

    #[test]
    fn test_out_of_range_percent_rejected() {
        let mut c = coupon("SAVE20", 5);
        c.discount_percent = Decimal::new(150, 0);
        assert_eq!(validate_coupon("SAVE20", "u1", &[c], &[], Utc::now()), Err(CouponError::InvalidCode));
    }
}
