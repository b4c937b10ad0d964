//! Domain events
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub enum CartEvent {
    LineAdded { product_id: Uuid, quantity: u32 },
    QuantityUpdated { product_id: Uuid, quantity: u32 },
    LineRemoved { product_id: Uuid },
    Cleared,
    CouponApplied { code: String, discount_percent: Decimal },
    CouponCleared,
}
