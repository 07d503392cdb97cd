//! Product Aggregate

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Money, Price, ProductId};

/// A sellable catalog entry. Built once when the catalog loads and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    category: String,
    price: Price,
    image: String,
    specs: Vec<String>,
    flags: ProductFlags,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFlags { pub is_new: bool, pub on_sale: bool, pub best_seller: bool }

impl Product {
    pub fn create(id: impl Into<ProductId>, name: impl Into<String>, category: impl Into<String>, price: Price) -> Self {
        Self {
            id: id.into(), name: name.into(), category: category.into(), price,
            image: String::new(), specs: vec![], flags: ProductFlags::default(),
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self { self.image = url.into(); self }

    pub fn with_specs<I, S>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specs = specs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_flags(mut self, flags: ProductFlags) -> Self { self.flags = flags; self }

    pub fn id(&self) -> &ProductId { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn category(&self) -> &str { &self.category }
    pub fn price(&self) -> &Price { &self.price }
    pub fn effective_price(&self) -> &Money { self.price.effective() }
    pub fn image(&self) -> &str { &self.image }
    pub fn specs(&self) -> &[String] { &self.specs }
    pub fn flags(&self) -> ProductFlags { self.flags }
    pub fn is_new(&self) -> bool { self.flags.is_new }
    pub fn is_on_sale(&self) -> bool { self.flags.on_sale }
    pub fn is_best_seller(&self) -> bool { self.flags.best_seller }

    /// Exact, case-sensitive tag match.
    pub fn has_spec(&self, spec: &str) -> bool { self.specs.iter().any(|s| s == spec) }
}
