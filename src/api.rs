//! JSON API over in-memory shopper sessions.

use axum::{extract::{Path, State}, http::StatusCode, response::{IntoResponse, Response}, routing::{get, patch, post}, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::advisor::{ChatMessage, ChatTicket, TechAdvisor};
use crate::domain::aggregates::{CheckoutDetails, LineItem, Order, Product};
use crate::domain::value_objects::ProductId;
use crate::storefront::{ContactRequest, StorefrontSnapshot};
use crate::view::{NavItem, View};
use crate::{Catalog, Storefront, StorefrontError};

pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A shopper session plus when it was last touched, in milliseconds since the state's clock started.
pub struct SessionEntry {
    store: Storefront,
    last_seen_ms: AtomicU64,
}

pub type Sessions = Arc<RwLock<HashMap<Uuid, SessionEntry>>>;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sessions: Sessions,
    pub advisor: TechAdvisor,
    idle_timeout: Duration,
    clock: Instant,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>, advisor: TechAdvisor) -> Self {
        Self {
            catalog, sessions: Arc::default(), advisor,
            idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS), clock: Instant::now(),
        }
    }

    /// Sessions untouched for longer than `idle` are treated as gone.
    pub fn with_idle_timeout(mut self, idle: Duration) -> Self { self.idle_timeout = idle; self }

    pub fn idle_timeout(&self) -> Duration { self.idle_timeout }

    fn now_ms(&self) -> u64 { u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX) }

    fn touch(&self, entry: &SessionEntry) { entry.last_seen_ms.store(self.now_ms(), Ordering::Relaxed); }

    fn is_stale(&self, entry: &SessionEntry) -> bool {
        let idle_ms = u64::try_from(self.idle_timeout.as_millis()).unwrap_or(u64::MAX);
        self.now_ms().saturating_sub(entry.last_seen_ms.load(Ordering::Relaxed)) > idle_ms
    }

    /// Drops every idle session. Returns how many were removed.
    pub async fn sweep_idle_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.evict_stale(&mut sessions)
    }

    fn evict_stale(&self, sessions: &mut HashMap<Uuid, SessionEntry>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_stale(entry));
        let removed = before - sessions.len();
        if removed > 0 { tracing::info!(removed, remaining = sessions.len(), "idle sessions expired"); }
        removed
    }
}

/// Periodically expires idle sessions for as long as the server runs.
pub fn spawn_session_sweeper(state: AppState) -> JoinHandle<()> {
    let period = state.idle_timeout().clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            state.sweep_idle_sessions().await;
        }
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "zm-storefront"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/:id", get(get_product))
        .route("/api/v1/specs", get(list_specs))
        .route("/api/v1/bestsellers", get(list_bestsellers))
        .route("/api/v1/nav", get(list_nav))
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/v1/sessions/:id/products", get(browse_products))
        .route("/api/v1/sessions/:id/cart", post(add_to_cart))
        .route("/api/v1/sessions/:id/cart/:product_id", patch(update_quantity))
        .route("/api/v1/sessions/:id/cart-drawer", post(set_cart_drawer))
        .route("/api/v1/sessions/:id/wishlist/:product_id", post(toggle_wishlist))
        .route("/api/v1/sessions/:id/filters", post(toggle_filter).delete(clear_filters))
        .route("/api/v1/sessions/:id/navigate", post(navigate))
        .route("/api/v1/sessions/:id/quick-view", post(set_quick_view))
        .route("/api/v1/sessions/:id/checkout", post(begin_checkout))
        .route("/api/v1/sessions/:id/orders", post(authorize_order))
        .route("/api/v1/sessions/:id/orders/complete", post(complete_order))
        .route("/api/v1/sessions/:id/contact", post(submit_contact))
        .route("/api/v1/sessions/:id/chat", get(get_chat).post(send_chat))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

pub struct ApiError(StorefrontError);

impl From<StorefrontError> for ApiError {
    fn from(e: StorefrontError) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StorefrontError::ProductNotFound(_) | StorefrontError::SessionNotFound => StatusCode::NOT_FOUND,
            StorefrontError::InvalidQuantity | StorefrontError::EmptyMessage => StatusCode::BAD_REQUEST,
            StorefrontError::EmptyCart | StorefrontError::AdvisorBusy => StatusCode::CONFLICT,
            StorefrontError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, Json(serde_json::json!({"error": self.0.to_string()}))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: String,
    pub numeric_price: Decimal,
    pub discount_price: Option<String>,
    pub numeric_discount_price: Option<Decimal>,
    pub savings: Option<String>,
    pub image: String,
    pub specs: Vec<String>,
    pub is_new: bool,
    pub is_sale: bool,
    pub is_best_seller: bool,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        let list = p.price().list();
        let sale = p.price().sale();
        Self {
            id: p.id().clone(), name: p.name().to_string(), category: p.category().to_string(),
            price: list.to_string(), numeric_price: list.amount(),
            discount_price: sale.map(ToString::to_string), numeric_discount_price: sale.map(|m| m.amount()),
            savings: sale.map(|_| p.price().savings().to_string()),
            image: p.image().to_string(), specs: p.specs().to_vec(),
            is_new: p.is_new(), is_sale: p.is_on_sale(), is_best_seller: p.is_best_seller(),
        }
    }
}

fn views<'a>(products: impl IntoIterator<Item = &'a Product>) -> Vec<ProductView> {
    products.into_iter().map(ProductView::from).collect()
}

#[derive(Debug, Serialize)] pub struct ProductDetailResponse { pub product: ProductView, pub related: Vec<ProductView> }
#[derive(Debug, Serialize)] pub struct SessionResponse { pub id: Uuid, pub state: StorefrontSnapshot }
#[derive(Debug, Serialize)] pub struct SectionView { pub category: String, pub products: Vec<ProductView> }
#[derive(Debug, Serialize)] pub struct BrowseResponse { pub selected_specs: Vec<String>, pub all_specs: Vec<String>, pub sections: Vec<SectionView> }
#[derive(Debug, Serialize)] pub struct ChatResponse { pub messages: Vec<ChatMessage>, pub waiting: bool }
#[derive(Debug, Serialize)] pub struct OrderResponse { pub order_id: String, pub legal_entity: String, pub token: String, pub items: Vec<LineItem>, pub total: String, pub authorized_at: chrono::DateTime<chrono::Utc> }

impl From<&Order> for OrderResponse {
    fn from(o: &Order) -> Self {
        Self {
            order_id: o.id().to_string(), legal_entity: o.customer().legal_entity.clone(), token: o.token().to_string(),
            items: o.items().to_vec(), total: o.total().to_string(), authorized_at: o.authorized_at(),
        }
    }
}

// =============================================================================
// Catalog handlers
// =============================================================================

async fn list_products(State(s): State<AppState>) -> Json<Vec<ProductView>> {
    Json(views(s.catalog.all()))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ProductDetailResponse>> {
    let id = ProductId::new(id);
    let product = s.catalog.find(&id).ok_or(StorefrontError::ProductNotFound(id))?;
    Ok(Json(ProductDetailResponse { product: product.into(), related: views(s.catalog.related(product)) }))
}

async fn list_specs(State(s): State<AppState>) -> Json<Vec<String>> { Json(s.catalog.all_specs()) }

async fn list_bestsellers(State(s): State<AppState>) -> Json<Vec<ProductView>> {
    Json(views(s.catalog.best_sellers()))
}

async fn list_nav(State(s): State<AppState>) -> Json<&'static [NavItem]> { Json(s.catalog.nav_items()) }

// =============================================================================
// Session handlers
// =============================================================================

/// Runs `f` against one session, logs the events it raised and returns its result.
async fn with_session<T>(s: &AppState, id: Uuid, f: impl FnOnce(&mut Storefront) -> crate::Result<T>) -> ApiResult<T> {
    let mut sessions = s.sessions.write().await;
    let entry = sessions.get_mut(&id).filter(|e| !s.is_stale(e)).ok_or(StorefrontError::SessionNotFound)?;
    s.touch(entry);
    let store = &mut entry.store;
    let result = f(store);
    for event in store.take_events() {
        tracing::debug!(session = %id, ?event, "storefront event");
    }
    Ok(result?)
}

/// Read-only access to one session; holds the map's read lock only.
async fn read_session<T>(s: &AppState, id: Uuid, f: impl FnOnce(&Storefront) -> T) -> ApiResult<T> {
    let sessions = s.sessions.read().await;
    let entry = sessions.get(&id).filter(|e| !s.is_stale(e)).ok_or(StorefrontError::SessionNotFound)?;
    s.touch(entry);
    Ok(f(&entry.store))
}

async fn snapshot_after(s: &AppState, id: Uuid, f: impl FnOnce(&mut Storefront) -> crate::Result<()>) -> ApiResult<Json<StorefrontSnapshot>> {
    with_session(s, id, |store| { f(store)?; Ok(store.snapshot()) }).await.map(Json)
}

async fn create_session(State(s): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let id = Uuid::now_v7();
    let store = Storefront::new(s.catalog.clone());
    let state = store.snapshot();
    let entry = SessionEntry { store, last_seen_ms: AtomicU64::new(s.now_ms()) };
    let mut sessions = s.sessions.write().await;
    s.evict_stale(&mut sessions);
    sessions.insert(id, entry);
    tracing::info!(session = %id, active = sessions.len(), "session created");
    (StatusCode::CREATED, Json(SessionResponse { id, state }))
}

async fn get_session(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<SessionResponse>> {
    let state = read_session(&s, id, Storefront::snapshot).await?;
    Ok(Json(SessionResponse { id, state }))
}

async fn delete_session(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    s.sessions.write().await.remove(&id).ok_or(StorefrontError::SessionNotFound)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn browse_products(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<BrowseResponse>> {
    let response = read_session(&s, id, |store| BrowseResponse {
        selected_specs: store.filters().iter().map(str::to_string).collect(),
        all_specs: store.all_specs(),
        sections: store.category_sections().into_iter().map(|section| SectionView {
            category: section.category.to_string(), products: views(section.products),
        }).collect(),
    }).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)] pub struct AddToCartRequest { pub product_id: String, pub quantity: Option<u32> }
#[derive(Debug, Deserialize)] pub struct UpdateQuantityRequest { pub delta: i64 }
#[derive(Debug, Deserialize)] pub struct CartDrawerRequest { pub open: Option<bool> }

async fn add_to_cart(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<AddToCartRequest>) -> ApiResult<Json<StorefrontSnapshot>> {
    let product_id = ProductId::new(r.product_id);
    snapshot_after(&s, id, |store| store.add_to_cart(&product_id, r.quantity.unwrap_or(1)).map(|_| ())).await
}

async fn update_quantity(State(s): State<AppState>, Path((id, product_id)): Path<(Uuid, String)>, Json(r): Json<UpdateQuantityRequest>) -> ApiResult<Json<StorefrontSnapshot>> {
    let product_id = ProductId::new(product_id);
    snapshot_after(&s, id, |store| { store.update_quantity(&product_id, r.delta); Ok(()) }).await
}

async fn set_cart_drawer(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<CartDrawerRequest>) -> ApiResult<Json<StorefrontSnapshot>> {
    snapshot_after(&s, id, |store| {
        match r.open {
            Some(true) => store.open_cart(),
            Some(false) => store.close_cart(),
            None => { store.toggle_cart(); }
        }
        Ok(())
    }).await
}

async fn toggle_wishlist(State(s): State<AppState>, Path((id, product_id)): Path<(Uuid, String)>) -> ApiResult<Json<StorefrontSnapshot>> {
    let product_id = ProductId::new(product_id);
    snapshot_after(&s, id, |store| store.toggle_wishlist(&product_id).map(|_| ())).await
}

#[derive(Debug, Deserialize)] pub struct FilterRequest { pub spec: String }

async fn toggle_filter(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<FilterRequest>) -> ApiResult<Json<StorefrontSnapshot>> {
    snapshot_after(&s, id, |store| { store.toggle_spec_filter(r.spec); Ok(()) }).await
}

async fn clear_filters(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<StorefrontSnapshot>> {
    snapshot_after(&s, id, |store| { store.clear_spec_filters(); Ok(()) }).await
}

#[derive(Debug, Deserialize)] pub struct NavigateRequest { pub view: String, pub product_id: Option<String> }
#[derive(Debug, Deserialize)] pub struct QuickViewRequest { pub product_id: Option<String> }

async fn navigate(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<NavigateRequest>) -> ApiResult<Json<StorefrontSnapshot>> {
    let view: View = r.view.parse().map_err(|e: crate::view::UnknownView| StorefrontError::Validation(e.to_string()))?;
    snapshot_after(&s, id, |store| match (view, r.product_id) {
        (View::ProductDetail, Some(product_id)) => store.view_product(&ProductId::new(product_id)),
        (view, _) => { store.navigate(view); Ok(()) }
    }).await
}

async fn set_quick_view(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<QuickViewRequest>) -> ApiResult<Json<StorefrontSnapshot>> {
    snapshot_after(&s, id, |store| match r.product_id {
        Some(product_id) => store.open_quick_view(&ProductId::new(product_id)),
        None => { store.close_quick_view(); Ok(()) }
    }).await
}

async fn begin_checkout(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<StorefrontSnapshot>> {
    snapshot_after(&s, id, |store| { store.begin_checkout(); Ok(()) }).await
}

async fn authorize_order(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<CheckoutDetails>) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let order = with_session(&s, id, |store| store.authorize_order(r).map(OrderResponse::from)).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn complete_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<StorefrontSnapshot>> {
    snapshot_after(&s, id, |store| { store.return_to_portal(); Ok(()) }).await
}

async fn submit_contact(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<ContactRequest>) -> ApiResult<StatusCode> {
    with_session(&s, id, |store| store.submit_contact(r)).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)] pub struct ChatRequest { pub text: String }

async fn get_chat(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<ChatResponse>> {
    read_session(&s, id, chat_response).await.map(Json)
}

/// Abandons an outstanding chat ticket if the request awaiting its reply is dropped
/// (client gone, timeout), so the session can send again.
struct PendingChat {
    sessions: Sessions,
    id: Uuid,
    ticket: Option<ChatTicket>,
}

impl PendingChat {
    fn new(s: &AppState, id: Uuid, ticket: ChatTicket) -> Self {
        Self { sessions: s.sessions.clone(), id, ticket: Some(ticket) }
    }

    fn disarm(mut self) { self.ticket = None; }
}

impl Drop for PendingChat {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else { return };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else { return };
        let (sessions, id) = (self.sessions.clone(), self.id);
        runtime.spawn(async move {
            if let Some(entry) = sessions.write().await.get_mut(&id) {
                if entry.store.abandon_chat(&ticket) {
                    tracing::info!(session = %id, "chat request dropped before the advisor replied");
                }
            }
        });
    }
}

/// The session lock is released while the advisor is thinking; the reply is
/// delivered only if the session and its ticket are still current.
async fn send_chat(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<ChatRequest>) -> ApiResult<Json<ChatResponse>> {
    let ticket = with_session(&s, id, |store| store.begin_chat(&r.text)).await?;
    let pending = PendingChat::new(&s, id, ticket.clone());
    let reply = s.advisor.get_advice(ticket.prompt()).await;
    pending.disarm();
    with_session(&s, id, |store| {
        store.finish_chat(&ticket, reply);
        Ok(chat_response(store))
    }).await.map(Json)
}

fn chat_response(store: &Storefront) -> ChatResponse {
    ChatResponse { messages: store.chat().messages().to_vec(), waiting: store.chat().is_waiting() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::testing::ScriptedBackend;
    use crate::advisor::{AdviceBackend, AdvisorError, FALLBACK_REPLY};
    use async_trait::async_trait;
    use axum::body::Body;
    use std::sync::atomic::AtomicBool;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(replies: Vec<Result<String, AdvisorError>>) -> Router {
        let advisor = TechAdvisor::new(ScriptedBackend::replying(replies));
        router(AppState::new(Arc::new(Catalog::builtin()), advisor))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => { request = request.header("content-type", "application/json"); Body::from(v.to_string()) }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = call(app, Method::POST, "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health() {
        let (status, body) = call(&app(vec![]), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn catalog_endpoints() {
        let app = app(vec![]);
        let (_, products) = call(&app, Method::GET, "/api/v1/products", None).await;
        assert_eq!(products.as_array().unwrap().len(), 8);
        assert_eq!(products[1]["discount_price"], "Rs. 890,000");
        assert_eq!(products[0]["discount_price"], Value::Null);

        let (_, detail) = call(&app, Method::GET, "/api/v1/products/3", None).await;
        assert_eq!(detail["product"]["name"], "Nano Core Ultra");
        assert_eq!(detail["related"][0]["id"], "6");

        let (status, _) = call(&app, Method::GET, "/api/v1/products/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, nav) = call(&app, Method::GET, "/api/v1/nav", None).await;
        assert_eq!(nav[3]["view"], "bestsellers");
        assert_eq!(nav[3]["highlighted"], true);
    }

    #[tokio::test]
    async fn cart_round_trip() {
        let app = app(vec![]);
        let id = new_session(&app).await;
        let cart = format!("/api/v1/sessions/{id}/cart");

        call(&app, Method::POST, &cart, Some(json!({"product_id": "2", "quantity": 2}))).await;
        let (status, state) = call(&app, Method::POST, &cart, Some(json!({"product_id": "2"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state["cart"].as_array().unwrap().len(), 1);
        assert_eq!(state["cart"][0]["quantity"], 3);
        assert_eq!(state["cart_open"], true);
        assert_eq!(state["cart_total_display"], "Rs. 2,670,000");

        let (_, state) = call(&app, Method::PATCH, &format!("{cart}/2"), Some(json!({"delta": -3}))).await;
        assert!(state["cart"].as_array().unwrap().is_empty());

        let (status, _) = call(&app, Method::POST, &cart, Some(json!({"product_id": "2", "quantity": 0}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn filters_and_browse() {
        let app = app(vec![]);
        let id = new_session(&app).await;
        call(&app, Method::POST, &format!("/api/v1/sessions/{id}/filters"), Some(json!({"spec": "RTX 4090 16GB"}))).await;
        let (_, browse) = call(&app, Method::GET, &format!("/api/v1/sessions/{id}/products"), None).await;
        assert_eq!(browse["sections"].as_array().unwrap().len(), 1);
        assert_eq!(browse["sections"][0]["products"][0]["name"], "Zenith Pro X1");
        assert_eq!(browse["all_specs"].as_array().unwrap().len(), 24);

        let (_, state) = call(&app, Method::DELETE, &format!("/api/v1/sessions/{id}/filters"), None).await;
        assert!(state["selected_specs"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn checkout_flow() {
        let app = app(vec![]);
        let id = new_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");

        let (status, _) = call(&app, Method::POST, &format!("{base}/orders"), Some(json!({
            "legal_entity": "Indus Data Systems", "tax_id": "NTN-1", "phone": "+92 21 3456 7890",
            "address": "Korangi", "city": "Karachi", "postal_code": "74900", "country": "Pakistan"
        }))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        call(&app, Method::POST, &format!("{base}/cart"), Some(json!({"product_id": "7"}))).await;
        let (_, state) = call(&app, Method::POST, &format!("{base}/checkout"), None).await;
        assert_eq!(state["view"], "checkout");
        assert_eq!(state["cart_open"], false);

        let (status, _) = call(&app, Method::POST, &format!("{base}/orders"), Some(json!({
            "legal_entity": "", "tax_id": "", "phone": "", "address": "", "city": "", "postal_code": "", "country": ""
        }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, order) = call(&app, Method::POST, &format!("{base}/orders"), Some(json!({
            "legal_entity": "Indus Data Systems", "tax_id": "NTN-1", "phone": "+92 21 3456 7890",
            "address": "Korangi", "city": "Karachi", "postal_code": "74900", "country": "Pakistan"
        }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["total"], "Rs. 45,000");
        assert_eq!(order["legal_entity"], "Indus Data Systems");
        assert!(Uuid::parse_str(order["order_id"].as_str().unwrap()).is_ok());

        let (_, state) = call(&app, Method::POST, &format!("{base}/orders/complete"), None).await;
        assert_eq!(state["view"], "home");
        assert!(state["cart"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn navigation_and_wishlist() {
        let app = app(vec![]);
        let id = new_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");
        let (_, state) = call(&app, Method::POST, &format!("{base}/navigate"), Some(json!({"view": "product-detail", "product_id": "8"}))).await;
        assert_eq!(state["view"], "product-detail");
        assert_eq!(state["detailed_product"], "8");

        let (status, body) = call(&app, Method::POST, &format!("{base}/navigate"), Some(json!({"view": "basket"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("unknown view 'basket'"));

        let (_, state) = call(&app, Method::POST, &format!("{base}/wishlist/8"), None).await;
        assert_eq!(state["wishlist"], json!(["8"]));
        let (_, state) = call(&app, Method::POST, &format!("{base}/wishlist/8"), None).await;
        assert_eq!(state["wishlist"], json!([]));
    }

    #[tokio::test]
    async fn chat_success_and_fallback() {
        let app = app(vec![Ok("The Matrix G7 suits render farms.".into()), Err(AdvisorError::ApiResponse { status: 503, body: String::new() })]);
        let id = new_session(&app).await;
        let chat = format!("/api/v1/sessions/{id}/chat");

        let (_, log) = call(&app, Method::POST, &chat, Some(json!({"text": "Render farm advice?"}))).await;
        assert_eq!(log["messages"].as_array().unwrap().len(), 3);
        assert_eq!(log["messages"][2]["text"], "The Matrix G7 suits render farms.");
        assert_eq!(log["waiting"], false);

        let (_, log) = call(&app, Method::POST, &chat, Some(json!({"text": "And pricing?"}))).await;
        let messages = log["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[4]["role"], "assistant");
        assert_eq!(messages[4]["text"], FALLBACK_REPLY);

        let (status, _) = call(&app, Method::POST, &chat, Some(json!({"text": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = app(vec![]);
        let uri = format!("/api/v1/sessions/{}", Uuid::nil());
        let (status, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Session not found");
        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    /// Never answers the first question; answers every later one.
    #[derive(Default)]
    struct StallsFirst { stalled: AtomicBool }

    #[async_trait]
    impl AdviceBackend for StallsFirst {
        async fn generate(&self, _system: &str, _prompt: &str, _temperature: f32) -> Result<String, AdvisorError> {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            Ok("The Blade 14 ships next week.".into())
        }
    }

    #[tokio::test]
    async fn dropped_chat_request_frees_the_session() {
        let advisor = TechAdvisor::new(Arc::new(StallsFirst::default()));
        let app = router(AppState::new(Arc::new(Catalog::builtin()), advisor));
        let id = new_session(&app).await;
        let chat = format!("/api/v1/sessions/{id}/chat");

        let first = call(&app, Method::POST, &chat, Some(json!({"text": "Is the Blade 14 in stock?"})));
        assert!(tokio::time::timeout(Duration::from_millis(50), first).await.is_err());

        // cleanup runs on a spawned task
        let mut waiting = true;
        for _ in 0..50 {
            let (_, log) = call(&app, Method::GET, &chat, None).await;
            waiting = log["waiting"].as_bool().unwrap();
            if !waiting { break; }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!waiting);

        let (status, log) = call(&app, Method::POST, &chat, Some(json!({"text": "When does it ship?"}))).await;
        assert_eq!(status, StatusCode::OK);
        let texts: Vec<_> = log["messages"].as_array().unwrap().iter().skip(1).map(|m| m["text"].as_str().unwrap()).collect();
        assert_eq!(texts, ["Is the Blade 14 in stock?", "When does it ship?", "The Blade 14 ships next week."]);
        assert_eq!(log["waiting"], false);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let state = AppState::new(Arc::new(Catalog::builtin()), TechAdvisor::new(ScriptedBackend::replying(vec![])))
            .with_idle_timeout(Duration::from_millis(20));
        let app = router(state.clone());
        let id = new_session(&app).await;
        let (status, _) = call(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let (status, body) = call(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Session not found");
        let (status, _) = call(&app, Method::POST, &format!("/api/v1/sessions/{id}/cart"), Some(json!({"product_id": "1"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        assert_eq!(state.sweep_idle_sessions().await, 1);
        assert!(state.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn creating_a_session_evicts_idle_ones() {
        let state = AppState::new(Arc::new(Catalog::builtin()), TechAdvisor::new(ScriptedBackend::replying(vec![])))
            .with_idle_timeout(Duration::from_millis(20));
        let app = router(state.clone());
        let stale = new_session(&app).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        let fresh = new_session(&app).await;

        let sessions = state.sessions.read().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains_key(&Uuid::parse_str(&fresh).unwrap()));
        assert!(!sessions.contains_key(&Uuid::parse_str(&stale).unwrap()));
    }
}
