//! Wishlist Aggregate

use serde::Serialize;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::ProductId;

/// Bookmarked products in the order they were saved.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Wishlist {
    products: Vec<Product>,
}

impl Wishlist {
    pub fn new() -> Self { Self::default() }
    pub fn products(&self) -> &[Product] { &self.products }
    pub fn len(&self) -> usize { self.products.len() }
    pub fn is_empty(&self) -> bool { self.products.is_empty() }
    pub fn contains(&self, product_id: &ProductId) -> bool { self.products.iter().any(|p| p.id() == product_id) }

    /// Removes the product if it is saved, appends it otherwise. Returns `true` when saved.
    pub fn toggle(&mut self, product: &Product) -> bool {
        if self.contains(product.id()) {
            self.products.retain(|p| p.id() != product.id());
            false
        } else {
            self.products.push(product.clone());
            true
        }
    }
}
