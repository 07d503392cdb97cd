//! ZM Storefront
//!
//! Wholesale computer-hardware storefront: the state behind a single-page shop.
//!
//! ## Features
//! - Static product catalog with spec-tag filtering
//! - Shopping cart and wishlist
//! - Checkout stub with order confirmation
//! - AI tech advisor backed by Gemini
//! - JSON API holding shopper sessions in memory

pub mod advisor;
pub mod api;
pub mod catalog;
pub mod domain;
pub mod filter;
pub mod storefront;
pub mod view;

pub use catalog::Catalog;
pub use storefront::{Storefront, StorefrontSnapshot};

use thiserror::Error;
use crate::domain::aggregates::{CartError, OrderError};
use crate::domain::value_objects::ProductId;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Advisor is still answering the previous message")]
    AdvisorBusy,

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<CartError> for StorefrontError {
    fn from(e: CartError) -> Self {
        match e { CartError::InvalidQuantity => Self::InvalidQuantity }
    }
}

impl From<OrderError> for StorefrontError {
    fn from(e: OrderError) -> Self {
        match e { OrderError::NoItems => Self::EmptyCart }
    }
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
