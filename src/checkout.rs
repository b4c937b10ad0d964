//! Checkout handoff
//!
//! Formats the cart, customer info, and totals into a text message plus a
//! messaging deep link. No settlement happens here; the conversation
//! continues off-platform. The grand total in the message is the
//! post-coupon total whenever a coupon is applied.

use std::fmt::Write as _;

use serde::Deserialize;
use url::Url;
use validator::Validate;

use crate::domain::aggregates::cart::Cart;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CustomerInfo {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 300))]
    pub address: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

pub fn order_reference() -> String {
    format!("ORD-{:08}", rand::random::<u32>() % 100_000_000)
}

pub fn compose_message(reference: &str, cart: &Cart, customer: &CustomerInfo) -> String {
    let mut msg = String::new();
    let _ = writeln!(msg, "New order {reference}");
    let _ = writeln!(msg, "Name: {}", customer.name);
    let _ = writeln!(msg, "Phone: {}", customer.phone);
    let _ = writeln!(msg, "Address: {}", customer.address);
    let _ = writeln!(msg);
    for line in cart.lines() {
        let size = line.size.map(|s| format!(" ({s})")).unwrap_or_default();
        let _ = writeln!(
            msg,
            "{} x {}{} @ {} = {}",
            line.quantity, line.product.name, size, line.unit_price, line.line_total()
        );
    }
    let _ = writeln!(msg);
    let _ = writeln!(msg, "Subtotal: {}", cart.total());
    if let Some(coupon) = cart.coupon() {
        let _ = writeln!(msg, "Coupon {} (-{})", coupon.code, coupon.discount);
    }
    let _ = writeln!(msg, "Total: {}", cart.total_due());
    if let Some(notes) = customer.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(msg);
        let _ = writeln!(msg, "Notes: {notes}");
    }
    msg
}

/// `https://wa.me/<digits>?text=<message>`. None when the configured number
/// has no digits at all.
pub fn whatsapp_link(number: &str, message: &str) -> Option<Url> {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let mut url = Url::parse(&format!("https://wa.me/{digits}")).ok()?;
    url.query_pairs_mut().append_pair("text", message);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::Product;
    use crate::domain::coupons::AppliedCoupon;
    use crate::domain::value_objects::Percent;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn cart_with_coupon() -> Cart {
        let mut cart = Cart::new();
        let product = Product {
            id: Uuid::new_v4(), name: "Widget".into(), price: Decimal::new(100, 0),
            merchant_id: None, category_id: None,
            size_s_price: None, size_m_price: None, size_l_price: None,
            has_sizes: false, created_at: Utc::now(), updated_at: Utc::now(),
        };
        let id = product.id;
        cart.add_line(product, None).unwrap();
        cart.update_quantity(id, 2);
        cart.apply_coupon(AppliedCoupon {
            coupon_id: Uuid::new_v4(), code: "SAVE10".into(), user_id: "u1".into(),
            discount: Percent::new(Decimal::new(10, 0)).unwrap(),
        });
        cart
    }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Ada".into(), phone: "+2348000000".into(),
            address: "12 Main St".into(), notes: None,
        }
    }

    #[test]
    fn test_message_uses_post_coupon_total() {
        let msg = compose_message("ORD-00000001", &cart_with_coupon(), &customer());
        assert!(msg.contains("2 x Widget @ 100 = 200"));
        assert!(msg.contains("Subtotal: 200"));
        assert!(msg.contains("Coupon SAVE10"));
        assert!(msg.contains("Total: 180"));
    }

    #[test]
    fn test_whatsapp_link_encodes_message() {
        let url = whatsapp_link("+234 800-1234", "hello world").unwrap();
        assert_eq!(url.host_str(), Some("wa.me"));
        assert_eq!(url.path(), "/2348001234");
        assert!(url.query().unwrap().contains("hello"));
        assert!(whatsapp_link("no digits", "x").is_none());
    }

    #[test]
    fn test_customer_validation() {
        let mut c = customer();
        assert!(c.validate().is_ok());
        c.phone = "123".into();
        assert!(c.validate().is_err());
    }
}
