//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Catalog identity of a product
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self { Self(value) }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn pkr(amount: Decimal) -> Self { Self::new(amount, "PKR") }
    pub fn rupees(whole: i64) -> Self { Self::pkr(Decimal::from(whole)) }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_zero(&self) -> bool { self.amount.is_zero() }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount - other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero("PKR") } }

/// Renders the storefront label, e.g. `Rs. 1,650,000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.amount.round_dp(2);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        let abs = rounded.abs();
        let whole = abs.trunc();
        let cents = ((abs - whole) * Decimal::ONE_HUNDRED).trunc();
        let symbol = match self.currency.as_str() {
            "PKR" => "Rs. ".to_string(),
            "USD" => "$".to_string(),
            other => format!("{other} "),
        };
        write!(f, "{sign}{symbol}{}", group_thousands(&whole.to_string()))?;
        if !cents.is_zero() { write!(f, ".{:0>2}", cents.to_string())?; }
        Ok(())
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 { out.push(','); }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Currency mismatch")]
    CurrencyMismatch,
}

/// Listed price of a product, optionally marked down.
///
/// A sale amount, when present, always wins over the list amount; there is no
/// "falsy" sale price, so a zero sale price is a real (free) price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Price {
    Plain(Money),
    Discounted { list: Money, sale: Money },
}

impl Price {
    pub fn plain(list: Money) -> Self { Self::Plain(list) }
    pub fn discounted(list: Money, sale: Money) -> Self { Self::Discounted { list, sale } }

    pub fn list(&self) -> &Money {
        match self { Self::Plain(list) | Self::Discounted { list, .. } => list }
    }

    pub fn sale(&self) -> Option<&Money> {
        match self { Self::Plain(_) => None, Self::Discounted { sale, .. } => Some(sale) }
    }

    /// The amount a shopper actually pays per unit.
    pub fn effective(&self) -> &Money {
        match self { Self::Plain(list) => list, Self::Discounted { sale, .. } => sale }
    }

    pub fn savings(&self) -> Money {
        match self {
            Self::Plain(list) => Money::zero(list.currency()),
            Self::Discounted { list, sale } => list.subtract(sale).unwrap_or_else(|_| Money::zero(list.currency())),
        }
    }
}
