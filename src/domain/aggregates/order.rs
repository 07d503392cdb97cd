//! Order Aggregate

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::Cart;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, ProductId};

/// Wholesale client verification and delivery details collected at checkout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CheckoutDetails {
    #[validate(length(min = 1, max = 200, message = "legal entity name is required"))]
    pub legal_entity: String,
    #[validate(length(min = 1, max = 64, message = "tax id is required"))]
    pub tax_id: String,
    #[validate(length(min = 7, max = 32, message = "contact phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, max = 300, message = "delivery address is required"))]
    pub address: String,
    #[validate(length(min = 1, max = 100, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 20, message = "postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100, message = "country is required"))]
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineItem { pub product_id: ProductId, pub name: String, pub quantity: u32, pub unit_price: Money, pub total: Money }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Authorized, Completed }

/// A checkout stub: snapshots the cart at authorization time. Nothing is charged or shipped.
#[derive(Clone, Debug, Serialize)]
pub struct Order {
    id: String,
    token: String,
    status: OrderStatus,
    customer: CheckoutDetails,
    items: Vec<LineItem>,
    total: Money,
    authorized_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Order {
    pub fn authorize(customer: CheckoutDetails, cart: &Cart) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::NoItems); }
        let id = Uuid::new_v4();
        let now = Utc::now();
        let items = cart.items().iter().map(|i| LineItem {
            product_id: i.product_id().clone(), name: i.product.name().to_string(), quantity: i.quantity,
            unit_price: i.unit_price().clone(), total: i.line_total(),
        }).collect();
        let mut order = Self {
            id: id.to_string(), token: confirmation_token(&id, now), status: OrderStatus::Authorized,
            customer, items, total: cart.total().clone(), authorized_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Authorized { token: order.token.clone(), total: order.total.amount() }));
        Ok(order)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn token(&self) -> &str { &self.token }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn customer(&self) -> &CheckoutDetails { &self.customer }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn total(&self) -> &Money { &self.total }
    pub fn authorized_at(&self) -> DateTime<Utc> { self.authorized_at }

    pub fn complete(&mut self) {
        if self.status == OrderStatus::Completed { return; }
        self.status = OrderStatus::Completed;
        self.raise_event(DomainEvent::Order(OrderEvent::Completed { token: self.token.clone() }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

/// `ZM-XXXX-XXX-YYYY`, taken from the order uuid and authorization year.
fn confirmation_token(id: &Uuid, at: DateTime<Utc>) -> String {
    let hex = id.simple().to_string().to_uppercase();
    format!("ZM-{}-{}-{}", &hex[..4], &hex[4..7], at.year())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Cannot authorize an order with no items")]
    NoItems,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Product;
    use crate::domain::value_objects::Price;

    fn details() -> CheckoutDetails {
        CheckoutDetails {
            legal_entity: "Indus Data Systems".into(), tax_id: "NTN-4412093".into(), phone: "+92 21 3456 7890".into(),
            address: "Plot 14, Korangi Industrial Area".into(), city: "Karachi".into(), postal_code: "74900".into(),
            country: "Pakistan".into(),
        }
    }

    #[test]
    fn test_order_workflow() {
        let mut cart = Cart::default();
        let monitor = Product::create("4", "Elysium S-Series 8K", "Monitors", Price::discounted(Money::rupees(240_000), Money::rupees(185_000)));
        cart.add_item(&monitor, 2).unwrap();

        let mut order = Order::authorize(details(), &cart).unwrap();
        assert_eq!(order.status(), OrderStatus::Authorized);
        assert_eq!(order.total(), &Money::rupees(370_000));
        assert_eq!(order.items()[0].unit_price, Money::rupees(185_000));
        assert!(order.token().starts_with("ZM-"));
        assert!(Uuid::parse_str(order.id()).is_ok());
        assert_eq!(order.customer().legal_entity, "Indus Data Systems");
        assert_eq!(order.token().len(), "ZM-XXXX-XXX-YYYY".len());

        order.complete();
        assert_eq!(order.status(), OrderStatus::Completed);
        let events = order.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DomainEvent::Order(OrderEvent::Authorized { .. })));
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(Order::authorize(details(), &Cart::default()).unwrap_err(), OrderError::NoItems);
    }

    #[test]
    fn test_details_validation() {
        assert!(details().validate().is_ok());
        let missing_city = CheckoutDetails { city: String::new(), ..details() };
        assert!(missing_city.validate().is_err());
        assert!(CheckoutDetails::default().validate().is_err());
    }
}
