//! Domain events
use crate::domain::value_objects::ProductId;
use crate::view::View;
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Cart(CartEvent),
    Wishlist(WishlistEvent),
    Order(OrderEvent),
    Navigated { from: View, to: View },
    ContactRequested { company: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    ItemAdded { product_id: ProductId, quantity: u32 },
    QuantityChanged { product_id: ProductId, quantity: u32 },
    ItemRemoved { product_id: ProductId },
    Cleared,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WishlistEvent {
    Saved { product_id: ProductId },
    Removed { product_id: ProductId },
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Authorized { token: String, total: Decimal },
    Completed { token: String },
}
