//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod wishlist;

pub use product::{Product, ProductFlags};
pub use order::{CheckoutDetails, LineItem, Order, OrderError, OrderStatus};
pub use cart::{Cart, CartError, CartItem};
pub use wishlist::Wishlist;
