//! The storefront controller.
//!
//! One [`Storefront`] owns everything a single shopper session can change: cart,
//! wishlist, spec filters, current screen, cart drawer, quick-view product, advisor
//! chat and the last authorized order. Dependents read through the accessors or a
//! [`StorefrontSnapshot`]; every mutation goes through a method here and records a
//! [`DomainEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::advisor::{ChatSession, ChatTicket, TechAdvisor};
use crate::catalog::Catalog;
use crate::domain::aggregates::{Cart, CheckoutDetails, Order, Product, Wishlist};
use crate::domain::events::{CartEvent, DomainEvent, WishlistEvent};
use crate::domain::value_objects::{Money, ProductId};
use crate::filter::{CategorySection, SpecSelection};
use crate::view::{View, ViewState};
use crate::{Result, StorefrontError};

/// Enquiry sent from the contact screen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 120, message = "representative name is required"))]
    pub representative: String,
    #[validate(length(min = 1, max = 200, message = "company name is required"))]
    pub company: String,
    #[validate(length(min = 1, max = 4000, message = "message is required"))]
    pub message: String,
}

#[derive(Debug)]
pub struct Storefront {
    catalog: Arc<Catalog>,
    cart: Cart,
    wishlist: Wishlist,
    filters: SpecSelection,
    view: ViewState,
    cart_open: bool,
    quick_view: Option<ProductId>,
    chat: ChatSession,
    order: Option<Order>,
    events: Vec<DomainEvent>,
}

impl Storefront {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog, cart: Cart::default(), wishlist: Wishlist::new(), filters: SpecSelection::new(),
            view: ViewState::default(), cart_open: false, quick_view: None, chat: ChatSession::new(),
            order: None, events: vec![],
        }
    }

    pub fn catalog(&self) -> &Catalog { &self.catalog }
    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn wishlist(&self) -> &Wishlist { &self.wishlist }
    pub fn filters(&self) -> &SpecSelection { &self.filters }
    pub fn view(&self) -> &ViewState { &self.view }
    pub fn chat(&self) -> &ChatSession { &self.chat }
    pub fn order(&self) -> Option<&Order> { self.order.as_ref() }
    pub fn is_cart_open(&self) -> bool { self.cart_open }

    pub fn product(&self, id: &ProductId) -> Result<&Product> {
        self.catalog.find(id).ok_or_else(|| StorefrontError::ProductNotFound(id.clone()))
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// Adds `quantity` units and opens the cart drawer. Returns the line's new quantity.
    pub fn add_to_cart(&mut self, id: &ProductId, quantity: u32) -> Result<u32> {
        let product = self.catalog.find(id).ok_or_else(|| StorefrontError::ProductNotFound(id.clone()))?;
        let new_quantity = self.cart.add_item(product, quantity)?;
        self.cart_open = true;
        self.raise_event(DomainEvent::Cart(CartEvent::ItemAdded { product_id: id.clone(), quantity }));
        Ok(new_quantity)
    }

    /// Applies `delta` to a cart line. Unknown ids are ignored.
    pub fn update_quantity(&mut self, id: &ProductId, delta: i64) -> Option<u32> {
        let quantity = self.cart.update_quantity(id, delta)?;
        let event = if quantity == 0 {
            CartEvent::ItemRemoved { product_id: id.clone() }
        } else {
            CartEvent::QuantityChanged { product_id: id.clone(), quantity }
        };
        self.raise_event(DomainEvent::Cart(event));
        Some(quantity)
    }

    pub fn cart_total(&self) -> &Money { self.cart.total() }
    pub fn cart_count(&self) -> u64 { self.cart.item_count() }

    pub fn open_cart(&mut self) { self.cart_open = true; }
    pub fn close_cart(&mut self) { self.cart_open = false; }
    pub fn toggle_cart(&mut self) -> bool { self.cart_open = !self.cart_open; self.cart_open }

    // -------------------------------------------------------------------------
    // Wishlist
    // -------------------------------------------------------------------------

    /// Returns `true` when the product is now saved.
    pub fn toggle_wishlist(&mut self, id: &ProductId) -> Result<bool> {
        let product = self.catalog.find(id).ok_or_else(|| StorefrontError::ProductNotFound(id.clone()))?;
        let saved = self.wishlist.toggle(product);
        let event = if saved {
            WishlistEvent::Saved { product_id: id.clone() }
        } else {
            WishlistEvent::Removed { product_id: id.clone() }
        };
        self.raise_event(DomainEvent::Wishlist(event));
        Ok(saved)
    }

    pub fn is_wishlisted(&self, id: &ProductId) -> bool { self.wishlist.contains(id) }

    // -------------------------------------------------------------------------
    // Filters
    // -------------------------------------------------------------------------

    pub fn toggle_spec_filter(&mut self, spec: impl Into<String>) -> bool { self.filters.toggle(spec) }
    pub fn clear_spec_filters(&mut self) { self.filters.clear(); }
    pub fn filtered_products(&self) -> Vec<&Product> { self.catalog.filter(&self.filters) }
    pub fn category_sections(&self) -> Vec<CategorySection<'_>> { self.catalog.sections(&self.filters) }
    pub fn all_specs(&self) -> Vec<String> { self.catalog.all_specs() }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    pub fn navigate(&mut self, view: View) {
        let from = self.view.navigate(view);
        self.raise_event(DomainEvent::Navigated { from, to: view });
    }

    pub fn view_product(&mut self, id: &ProductId) -> Result<()> {
        self.product(id)?;
        let from = self.view.show_product(id.clone());
        self.raise_event(DomainEvent::Navigated { from, to: View::ProductDetail });
        Ok(())
    }

    pub fn detailed_product(&self) -> Option<&Product> {
        self.view.detailed_product().and_then(|id| self.catalog.find(id))
    }

    pub fn open_quick_view(&mut self, id: &ProductId) -> Result<()> {
        self.product(id)?;
        self.quick_view = Some(id.clone());
        Ok(())
    }

    pub fn close_quick_view(&mut self) { self.quick_view = None; }

    pub fn quick_view(&self) -> Option<&Product> { self.quick_view.as_ref().and_then(|id| self.catalog.find(id)) }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    pub fn begin_checkout(&mut self) {
        self.cart_open = false;
        self.navigate(View::Checkout);
    }

    pub fn authorize_order(&mut self, details: CheckoutDetails) -> Result<&Order> {
        details.validate()?;
        let mut order = Order::authorize(details, &self.cart)?;
        self.events.extend(order.take_events());
        self.navigate(View::Confirmation);
        tracing::info!(token = order.token(), total = %order.total(), lines = order.items().len(), "order authorized");
        Ok(self.order.insert(order))
    }

    /// Leaves the confirmation screen: completes the order, empties the cart, goes home.
    pub fn return_to_portal(&mut self) {
        if let Some(order) = self.order.as_mut() {
            order.complete();
            self.events.extend(order.take_events());
        }
        self.cart.clear();
        self.raise_event(DomainEvent::Cart(CartEvent::Cleared));
        self.navigate(View::Home);
    }

    pub fn submit_contact(&mut self, request: ContactRequest) -> Result<()> {
        request.validate()?;
        tracing::info!(company = %request.company, representative = %request.representative, "contact request received");
        self.raise_event(DomainEvent::ContactRequested { company: request.company });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Advisor
    // -------------------------------------------------------------------------

    pub fn begin_chat(&mut self, input: &str) -> Result<ChatTicket> { self.chat.begin_send(input) }

    pub fn finish_chat(&mut self, ticket: &ChatTicket, reply: impl Into<String>) -> bool {
        let applied = self.chat.complete(ticket, reply);
        if !applied { tracing::debug!("discarding stale advisor reply"); }
        applied
    }

    /// Gives up on `ticket` so the shopper can send again. Returns whether it was outstanding.
    pub fn abandon_chat(&mut self, ticket: &ChatTicket) -> bool {
        let abandoned = self.chat.abandon(ticket);
        if abandoned { tracing::debug!("advisor request abandoned"); }
        abandoned
    }

    /// Sends one message and waits for the reply. Callers that must not hold the
    /// session across the wait use [`begin_chat`](Self::begin_chat) and
    /// [`finish_chat`](Self::finish_chat) instead.
    pub async fn ask_advisor(&mut self, advisor: &TechAdvisor, input: &str) -> Result<()> {
        let ticket = self.begin_chat(input)?;
        let reply = advisor.get_advice(ticket.prompt()).await;
        self.finish_chat(&ticket, reply);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Read views
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> StorefrontSnapshot {
        StorefrontSnapshot {
            view: self.view.current(),
            detailed_product: self.view.detailed_product().cloned(),
            cart_open: self.cart_open,
            cart: self.cart.items().iter().map(|i| CartLine {
                product_id: i.product_id().clone(), name: i.product.name().to_string(), quantity: i.quantity,
                unit_price: i.unit_price().to_string(), line_total: i.line_total().to_string(),
            }).collect(),
            cart_count: self.cart.item_count(),
            cart_total: self.cart.total().clone(),
            cart_total_display: self.cart.total().to_string(),
            cart_updated_at: self.cart.updated_at(),
            wishlist: self.wishlist.products().iter().map(|p| p.id().clone()).collect(),
            selected_specs: self.filters.iter().map(str::to_string).collect(),
            quick_view: self.quick_view.clone(),
            advisor_waiting: self.chat.is_waiting(),
            confirmation_token: self.order.as_ref().map(|o| o.token().to_string()),
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

/// Serializable read view of a session.
#[derive(Clone, Debug, Serialize)]
pub struct StorefrontSnapshot {
    pub view: View,
    pub detailed_product: Option<ProductId>,
    pub cart_open: bool,
    pub cart: Vec<CartLine>,
    pub cart_count: u64,
    pub cart_total: Money,
    pub cart_total_display: String,
    pub cart_updated_at: DateTime<Utc>,
    pub wishlist: Vec<ProductId>,
    pub selected_specs: Vec<String>,
    pub quick_view: Option<ProductId>,
    pub advisor_waiting: bool,
    pub confirmation_token: Option<String>,
}
