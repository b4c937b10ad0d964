//! The pure storefront core.
//!
//! Everything here is synchronous and injectable: decision functions take
//! the cart, the fetched coupon/offer/usage sets, and `now` explicitly, with
//! no ambient state and no I/O.

pub mod aggregates;
pub mod coupons;
pub mod events;
pub mod offers;
pub mod value_objects;
