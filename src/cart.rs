use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const CART_KEY: &str = "cart";

/// Immutable order line supplied by the storefront. Prices are decimal
/// dollars straight from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

pub fn order_total(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

/// Convert a decimal dollar amount to integer cents. This is the only place
/// minor units are produced; everything displayed stays decimal.
pub fn minor_units(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Render an amount with exactly two decimals and no currency symbol.
pub fn two_dp(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// Render a dollar amount with exactly two decimals.
pub fn fmt_usd(amount: Decimal) -> String {
    format!("${}", two_dp(amount))
}
