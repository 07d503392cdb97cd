//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Money, ProductId};

/// In-memory shopping cart. Holds at most one line per product id.
#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    items: Vec<CartItem>,
    subtotal: Money,
    currency: String,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn product_id(&self) -> &ProductId { self.product.id() }
    pub fn unit_price(&self) -> &Money { self.product.effective_price() }
    pub fn line_total(&self) -> Money { self.unit_price().multiply(self.quantity) }
}

impl Cart {
    pub fn new(currency: &str) -> Self {
        Self { items: vec![], subtotal: Money::zero(currency), currency: currency.to_string(), updated_at: Utc::now() }
    }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn total(&self) -> &Money { &self.subtotal }
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Units across all lines, as shown on the cart badge.
    pub fn item_count(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity)).sum() }

    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.items.iter().find(|i| i.product_id() == product_id).map(|i| i.quantity)
    }

    /// Merges into an existing line or appends a new one. Returns the line's new quantity.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        let new_quantity = if let Some(existing) = self.items.iter_mut().find(|i| i.product_id() == product.id()) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            existing.quantity
        } else {
            self.items.push(CartItem { product: product.clone(), quantity });
            quantity
        };
        self.recalculate();
        Ok(new_quantity)
    }

    /// Applies `delta` to a line, clamping at zero; a line that reaches zero is dropped.
    /// Unknown ids are ignored and yield `None`.
    pub fn update_quantity(&mut self, product_id: &ProductId, delta: i64) -> Option<u32> {
        let item = self.items.iter_mut().find(|i| i.product_id() == product_id)?;
        let next = (i64::from(item.quantity) + delta).clamp(0, i64::from(u32::MAX));
        item.quantity = u32::try_from(next).unwrap_or(u32::MAX);
        let quantity = item.quantity;
        if quantity == 0 { self.items.retain(|i| i.product_id() != product_id); }
        self.recalculate();
        Some(quantity)
    }

    pub fn clear(&mut self) { self.items.clear(); self.recalculate(); }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total()).unwrap_or(acc));
        self.updated_at = Utc::now();
    }
}

impl Default for Cart { fn default() -> Self { Self::new("PKR") } }

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
}
