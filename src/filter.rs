//! Spec-tag filtering over the catalog.
//!
//! A selection is a set of tags; a product matches when its spec list contains every
//! selected tag (exact, case-sensitive). The empty selection matches everything.

use serde::Serialize;
use std::collections::BTreeSet;
use crate::domain::aggregates::Product;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SpecSelection(BTreeSet<String>);

impl SpecSelection {
    pub fn new() -> Self { Self::default() }

    /// Adds the tag if absent, removes it if present. Returns `true` when now selected.
    pub fn toggle(&mut self, spec: impl Into<String>) -> bool {
        let spec = spec.into();
        if self.0.remove(&spec) { false } else { self.0.insert(spec) }
    }

    pub fn clear(&mut self) { self.0.clear(); }
    pub fn contains(&self, spec: &str) -> bool { self.0.contains(spec) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &str> { self.0.iter().map(String::as_str) }

    pub fn matches(&self, product: &Product) -> bool { self.iter().all(|spec| product.has_spec(spec)) }
}

impl<S: Into<String>> FromIterator<S> for SpecSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self { Self(iter.into_iter().map(Into::into).collect()) }
}

pub fn filter_by_specs<'a>(catalog: &'a [Product], selected: &SpecSelection) -> Vec<&'a Product> {
    catalog.iter().filter(|p| selected.matches(p)).collect()
}

/// Every distinct spec in the catalog, sorted.
pub fn collect_all_specs(catalog: &[Product]) -> Vec<String> {
    catalog.iter()
        .flat_map(|p| p.specs().iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Clone, Debug, Serialize)]
pub struct CategorySection<'a> {
    pub category: &'a str,
    pub products: Vec<&'a Product>,
}

/// Groups products by category, categories in order of first appearance.
pub fn group_by_category<'a>(products: Vec<&'a Product>) -> Vec<CategorySection<'a>> {
    let mut sections: Vec<CategorySection<'a>> = Vec::new();
    for product in products {
        match sections.iter_mut().find(|s| s.category == product.category()) {
            Some(section) => section.products.push(product),
            None => sections.push(CategorySection { category: product.category(), products: vec![product] }),
        }
    }
    sections
}
