//! Screen routing. A flat set of screens; every screen is reachable from every other.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use crate::domain::value_objects::ProductId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    #[default]
    Home,
    Categories,
    Bestsellers,
    Wishlist,
    Contact,
    ProductDetail,
    Checkout,
    Confirmation,
}

impl View {
    pub const ALL: [View; 8] = [
        View::Home, View::Categories, View::Bestsellers, View::Wishlist,
        View::Contact, View::ProductDetail, View::Checkout, View::Confirmation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Home => "home",
            View::Categories => "categories",
            View::Bestsellers => "bestsellers",
            View::Wishlist => "wishlist",
            View::Contact => "contact",
            View::ProductDetail => "product-detail",
            View::Checkout => "checkout",
            View::Confirmation => "confirmation",
        }
    }

}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown view '{0}'")]
pub struct UnknownView(pub String);

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL.into_iter().find(|v| v.as_str() == s).ok_or_else(|| UnknownView(s.to_string()))
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Current screen plus the product shown on the detail screen, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    current: View,
    detailed_product: Option<ProductId>,
}

impl ViewState {
    pub fn current(&self) -> View { self.current }
    pub fn detailed_product(&self) -> Option<&ProductId> { self.detailed_product.as_ref() }

    /// Jumps to `view`; returns the screen that was left.
    pub fn navigate(&mut self, view: View) -> View {
        std::mem::replace(&mut self.current, view)
    }

    pub fn show_product(&mut self, product_id: ProductId) -> View {
        self.detailed_product = Some(product_id);
        self.navigate(View::ProductDetail)
    }
}

/// Navigation bar entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    pub highlighted: bool,
    pub view: View,
}

pub static NAV_ITEMS: [NavItem; 5] = [
    NavItem { label: "Home", href: "#", highlighted: false, view: View::Home },
    NavItem { label: "Collections", href: "#collections", highlighted: false, view: View::Categories },
    NavItem { label: "Best Sellers", href: "#best-sellers", highlighted: false, view: View::Bestsellers },
    NavItem { label: "Inventory Sale", href: "#sale", highlighted: true, view: View::Bestsellers },
    NavItem { label: "Contact Support", href: "#contact", highlighted: false, view: View::Contact },
];
