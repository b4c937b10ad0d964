//! Value Objects for the storefront core

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discount percentage value object, valid over [0, 100]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    pub fn new(value: Decimal) -> Result<Self, PercentError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED { return Err(PercentError::OutOfRange); }
        Ok(Self(value))
    }
    pub fn value(&self) -> Decimal { self.0 }
    /// `price * (1 - pct/100)`. Result stays within [0, price].
    pub fn apply_to(&self, price: Decimal) -> Decimal {
        price * (Decimal::ONE_HUNDRED - self.0) / Decimal::ONE_HUNDRED
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}%", self.0) }
}

#[derive(Debug, Clone)] pub enum PercentError { OutOfRange }
impl std::error::Error for PercentError {}
impl fmt::Display for PercentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Percentage out of range") }
}

/// Fixed size tiers a catalog product may price individually
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Size { S, M, L }

impl Size {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "S" => Some(Self::S),
            "M" => Some(Self::M),
            "L" => Some(Self::L),
            _ => None,
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self { Self::S => "S", Self::M => "M", Self::L => "L" }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}
