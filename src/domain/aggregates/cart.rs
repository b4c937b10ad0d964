//! Cart Aggregate
//!
//! One ordered line per product id; all lines in a non-empty cart belong to
//! the same merchant. Line prices are captured at add time. Mutations raise
//! events the caller can drain with `take_events`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::product::Product;
use crate::domain::coupons::AppliedCoupon;
use crate::domain::events::CartEvent;
use crate::domain::value_objects::Size;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    coupon: Option<AppliedCoupon>,
    #[serde(skip)]
    events: Vec<CartEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub size: Option<Size>,
    /// Effective price at add time. Catalog edits never reprice this line.
    pub unit_price: Decimal,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Restore a cart from previously persisted lines.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines, coupon: None, events: vec![] }
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn coupon(&self) -> Option<&AppliedCoupon> { self.coupon.as_ref() }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn line_count(&self) -> usize { self.lines.len() }

    /// Single-merchant guard: true when the cart is empty or the product
    /// belongs to the same merchant as the existing lines. Never mutates;
    /// crossing merchants requires an explicit cart clear.
    pub fn is_selectable(&self, product: &Product) -> bool {
        match self.lines.first() {
            None => true,
            Some(first) => first.product.merchant_id == product.merchant_id,
        }
    }

    /// Add one unit of a product. An existing line for the same product id
    /// is incremented (quantity has no upper bound); otherwise a new line is
    /// appended at the add-time effective price for the chosen size.
    pub fn add_line(&mut self, product: Product, size: Option<Size>) -> Result<(), CartError> {
        if !self.is_selectable(&product) { return Err(CartError::MerchantMismatch); }
        if let Some(existing) = self.lines.iter_mut().find(|l| l.product.id == product.id) {
            existing.quantity += 1;
            let quantity = existing.quantity;
            self.raise(CartEvent::LineAdded { product_id: product.id, quantity });
        } else {
            let unit_price = product.effective_price(size);
            let product_id = product.id;
            self.lines.push(CartLine { product, quantity: 1, size, unit_price });
            self.raise(CartEvent::LineAdded { product_id, quantity: 1 });
        }
        Ok(())
    }

    /// Set a line's quantity exactly. Zero or negative removes the line;
    /// an absent product id is a no-op.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i32) {
        if quantity <= 0 {
            self.remove_line(product_id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product.id == product_id) {
            line.quantity = quantity as u32;
            self.raise(CartEvent::QuantityUpdated { product_id, quantity: quantity as u32 });
        }
    }

    /// Remove a line if present; absent is a no-op, not an error.
    pub fn remove_line(&mut self, product_id: Uuid) {
        let before = self.lines.len();
        self.lines.retain(|l| l.product.id != product_id);
        if self.lines.len() != before {
            self.raise(CartEvent::LineRemoved { product_id });
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.coupon = None;
        self.raise(CartEvent::Cleared);
    }

    pub fn apply_coupon(&mut self, coupon: AppliedCoupon) {
        self.raise(CartEvent::CouponApplied { code: coupon.code.clone(), discount_percent: coupon.discount.value() });
        self.coupon = Some(coupon);
    }

    pub fn clear_coupon(&mut self) {
        if self.coupon.take().is_some() {
            self.raise(CartEvent::CouponCleared);
        }
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().fold(Decimal::ZERO, |acc, l| acc + l.line_total())
    }

    /// Grand total after the applied coupon, or `total()` when none applies.
    pub fn total_due(&self) -> Decimal {
        match &self.coupon {
            Some(c) => c.discount.apply_to(self.total()),
            None => self.total(),
        }
    }

    pub fn take_events(&mut self) -> Vec<CartEvent> { std::mem::take(&mut self.events) }
    fn raise(&mut self, e: CartEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { MerchantMismatch }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cart is restricted to a single merchant; clear it to switch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Percent;
    use chrono::Utc;

    fn product(merchant: Option<Uuid>, price: i64) -> Product {
        Product {
            id: Uuid::new_v4(), name: "Item".into(), price: Decimal::new(price, 0),
            merchant_id: merchant, category_id: None,
            size_s_price: None, size_m_price: None, size_l_price: None,
            has_sizes: false, created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    fn coupon(percent: i64) -> AppliedCoupon {
        AppliedCoupon {
            coupon_id: Uuid::new_v4(), code: "SAVE".into(), user_id: "u1".into(),
            discount: Percent::new(Decimal::new(percent, 0)).unwrap(),
        }
    }

    #[test]
    fn test_add_merges_by_product_id() {
        let mut cart = Cart::new();
        let p = product(None, 100);
        cart.add_line(p.clone(), None).unwrap();
        cart.add_line(p, None).unwrap();
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.total(), Decimal::new(200, 0));
    }

    #[test]
    fn test_total_with_coupon() {
        let mut cart = Cart::new();
        cart.add_line(product(None, 100), None).unwrap();
        cart.update_quantity(cart.lines()[0].product.id, 2);
        assert_eq!(cart.total(), Decimal::new(200, 0));
        cart.apply_coupon(coupon(10));
        assert_eq!(cart.total_due(), Decimal::new(180, 0));
    }

    #[test]
    fn test_update_quantity_idempotent() {
        let mut cart = Cart::new();
        let p = product(None, 50);
        let id = p.id;
        cart.add_line(p, None).unwrap();
        cart.update_quantity(id, 3);
        let once = cart.total();
        cart.update_quantity(id, 3);
        assert_eq!(cart.total(), once);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_update_to_zero_removes() {
        let mut cart = Cart::new();
        let p = product(None, 50);
        let id = p.id;
        cart.add_line(p, None).unwrap();
        cart.update_quantity(id, 0);
        assert!(cart.is_empty());
        // absent id is a no-op
        cart.update_quantity(id, 5);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_remove_inverse() {
        let mut cart = Cart::new();
        cart.add_line(product(None, 30), None).unwrap();
        let snapshot = cart.total();
        let extra = product(None, 70);
        let id = extra.id;
        cart.add_line(extra, None).unwrap();
        cart.remove_line(id);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total(), snapshot);
        cart.remove_line(id); // already gone, no-op
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_total_monotonic() {
        let mut cart = Cart::new();
        let p = product(None, 25);
        let id = p.id;
        cart.add_line(p, None).unwrap();
        let t1 = cart.total();
        cart.update_quantity(id, 2);
        assert!(cart.total() >= t1);
        let t2 = cart.total();
        cart.remove_line(id);
        assert!(cart.total() <= t2);
    }

    #[test]
    fn test_merchant_guard() {
        let m1 = Some(Uuid::new_v4());
        let m2 = Some(Uuid::new_v4());
        let mut cart = Cart::new();
        cart.add_line(product(m1, 10), None).unwrap();
        let cross = product(m2, 10);
        assert!(!cart.is_selectable(&cross));
        assert_eq!(cart.add_line(cross.clone(), None), Err(CartError::MerchantMismatch));
        assert_eq!(cart.line_count(), 1);
        cart.clear();
        assert!(cart.is_selectable(&cross));
        cart.add_line(cross, None).unwrap();
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_house_catalog_is_its_own_merchant() {
        let mut cart = Cart::new();
        cart.add_line(product(None, 10), None).unwrap();
        assert!(!cart.is_selectable(&product(Some(Uuid::new_v4()), 10)));
        assert!(cart.is_selectable(&product(None, 10)));
    }

    #[test]
    fn test_coupon_discount_bound() {
        let mut cart = Cart::new();
        cart.add_line(product(None, 100), None).unwrap();
        for pct in [0i64, 15, 50, 100] {
            cart.apply_coupon(coupon(pct));
            assert!(cart.total_due() >= Decimal::ZERO);
            assert!(cart.total_due() <= cart.total());
        }
        cart.clear_coupon();
        assert_eq!(cart.total_due(), cart.total());
    }

    #[test]
    fn test_events_raised() {
        let mut cart = Cart::new();
        let p = product(None, 10);
        let id = p.id;
        cart.add_line(p, None).unwrap();
        cart.update_quantity(id, 2);
        cart.remove_line(id);
        let events = cart.take_events();
        assert_eq!(events.len(), 3);
        assert!(cart.take_events().is_empty());
    }
}
