//! Vendora Storefront - multi-tenant cart, coupon, and offer service

use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use validator::Validate;

use vendora_storefront::checkout::{compose_message, order_reference, whatsapp_link, CustomerInfo};
use vendora_storefront::domain::aggregates::cart::{Cart, CartLine};
use vendora_storefront::domain::aggregates::product::Product;
use vendora_storefront::domain::coupons::{validate_coupon, AppliedCoupon};
use vendora_storefront::domain::offers::{active_offers_for, display_price};
use vendora_storefront::domain::value_objects::Size;
use vendora_storefront::storage::CartStorage;
use vendora_storefront::store::StoreClient;
use vendora_storefront::StorefrontError;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreClient,
    pub carts: Arc<RwLock<HashMap<String, Cart>>>,
    pub storage: CartStorage,
    pub whatsapp: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let db = PgPoolOptions::new().max_connections(10).connect(&std::env::var("DATABASE_URL")?).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let state = AppState {
        store: StoreClient::new(db),
        carts: Arc::new(RwLock::new(HashMap::new())),
        storage: CartStorage::new(std::env::var("CART_DATA_DIR").unwrap_or_else(|_| "./data/carts".to_string())),
        whatsapp: std::env::var("STOREFRONT_WHATSAPP").unwrap_or_default(),
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "vendora-storefront"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/offers", get(list_offers))
        .route("/api/v1/cart/:session", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items", post(add_item))
        .route("/api/v1/cart/:session/items/:product_id", put(update_item).delete(remove_item))
        .route("/api/v1/cart/:session/coupon", post(apply_coupon).delete(remove_coupon))
        .route("/api/v1/cart/:session/checkout", post(checkout))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("vendora-storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

fn http_error(e: StorefrontError) -> (StatusCode, String) {
    let status = match &e {
        StorefrontError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StorefrontError::GuardViolation => StatusCode::CONFLICT,
        StorefrontError::ProductNotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string())
}

fn drain_events(session: &str, cart: &mut Cart) {
    for event in cart.take_events() {
        tracing::debug!(session, event = ?event, "cart event");
    }
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub coupon: Option<AppliedCoupon>,
    pub total: Decimal,
    pub total_due: Decimal,
}

fn cart_view(cart: &Cart) -> CartView {
    CartView { lines: cart.lines().to_vec(), coupon: cart.coupon().cloned(), total: cart.total(), total_due: cart.total_due() }
}

#[derive(Debug, Deserialize)]
pub struct CatalogParams { pub merchant: Option<Uuid>, pub session: Option<String> }

#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    /// Offer-discounted price when a live offer targets this product.
    pub display_price: Option<Decimal>,
    /// False once a non-empty cart pins the shopper to another merchant.
    pub selectable: bool,
}

async fn list_products(State(s): State<AppState>, Query(p): Query<CatalogParams>) -> Result<Json<Vec<ProductView>>, (StatusCode, String)> {
    let products = s.store.fetch_products(p.merchant).await.map_err(http_error)?;
    let offers = s.store.fetch_offers().await.map_err(http_error)?;
    let now = Utc::now();
    let discounts: HashMap<Uuid, Decimal> = active_offers_for(&products, &offers, now).map(|(pr, of)| (pr.id, display_price(pr, of))).collect();
    let cart = match &p.session {
        Some(session) => Some(session_snapshot(&s, session).await),
        None => None,
    };
    let views = products.iter().map(|pr| ProductView {
        product: pr.clone(),
        display_price: discounts.get(&pr.id).copied(),
        selectable: cart.as_ref().map_or(true, |c| c.is_selectable(pr)),
    }).collect();
    Ok(Json(views))
}

#[derive(Debug, Serialize)]
pub struct OfferView {
    pub offer_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: Decimal,
    pub discount_percent: Decimal,
    pub display_price: Decimal,
}

async fn list_offers(State(s): State<AppState>) -> Result<Json<Vec<OfferView>>, (StatusCode, String)> {
    let products = s.store.fetch_products(None).await.map_err(http_error)?;
    let offers = s.store.fetch_offers().await.map_err(http_error)?;
    let views = active_offers_for(&products, &offers, Utc::now()).map(|(pr, of)| OfferView {
        offer_id: of.id, product_id: pr.id, product_name: pr.name.clone(),
        price: pr.effective_price(None), discount_percent: of.discount_percent,
        display_price: display_price(pr, of),
    }).collect();
    Ok(Json(views))
}

/// Read-only view of a session's cart without pinning it into the map.
async fn session_snapshot(s: &AppState, session: &str) -> Cart {
    if let Some(cart) = s.carts.read().await.get(session) {
        return cart.clone();
    }
    Cart::from_lines(s.storage.load(session))
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Json<CartView> {
    let mut carts = s.carts.write().await;
    let cart = carts.entry(session.clone()).or_insert_with(|| Cart::from_lines(s.storage.load(&session)));
    Json(cart_view(cart))
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest { pub product_id: Uuid, pub size: Option<Size> }

async fn add_item(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddItemRequest>) -> Result<Json<CartView>, (StatusCode, String)> {
    let product = s.store.fetch_product(r.product_id).await.map_err(http_error)?;
    let mut carts = s.carts.write().await;
    let cart = carts.entry(session.clone()).or_insert_with(|| Cart::from_lines(s.storage.load(&session)));
    cart.add_line(product, r.size).map_err(|e| http_error(e.into()))?;
    drain_events(&session, cart);
    s.storage.save(&session, cart.lines());
    Ok(Json(cart_view(cart)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest { pub quantity: i32 }

async fn update_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, Uuid)>, Json(r): Json<UpdateItemRequest>) -> Json<CartView> {
    let mut carts = s.carts.write().await;
    let cart = carts.entry(session.clone()).or_insert_with(|| Cart::from_lines(s.storage.load(&session)));
    cart.update_quantity(product_id, r.quantity);
    drain_events(&session, cart);
    s.storage.save(&session, cart.lines());
    Json(cart_view(cart))
}

async fn remove_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, Uuid)>) -> Json<CartView> {
    let mut carts = s.carts.write().await;
    let cart = carts.entry(session.clone()).or_insert_with(|| Cart::from_lines(s.storage.load(&session)));
    cart.remove_line(product_id);
    drain_events(&session, cart);
    s.storage.save(&session, cart.lines());
    Json(cart_view(cart))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> StatusCode {
    let mut carts = s.carts.write().await;
    if let Some(cart) = carts.get_mut(&session) {
        cart.clear();
        drain_events(&session, cart);
    }
    s.storage.delete(&session);
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest { pub code: String, pub user_id: String }

async fn apply_coupon(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<ApplyCouponRequest>) -> Result<Json<CartView>, (StatusCode, String)> {
    let coupons = s.store.fetch_coupons_by_code(&r.code).await.map_err(http_error)?;
    let mut usages = Vec::new();
    for coupon in &coupons {
        usages.extend(s.store.fetch_coupon_usages(coupon.id, &r.user_id).await.map_err(http_error)?);
    }
    let applied = validate_coupon(&r.code, &r.user_id, &coupons, &usages, Utc::now()).map_err(|e| http_error(e.into()))?;
    let mut carts = s.carts.write().await;
    let cart = carts.entry(session.clone()).or_insert_with(|| Cart::from_lines(s.storage.load(&session)));
    cart.apply_coupon(applied);
    drain_events(&session, cart);
    Ok(Json(cart_view(cart)))
}

async fn remove_coupon(State(s): State<AppState>, Path(session): Path<String>) -> Json<CartView> {
    let mut carts = s.carts.write().await;
    let cart = carts.entry(session.clone()).or_insert_with(|| Cart::from_lines(s.storage.load(&session)));
    cart.clear_coupon();
    drain_events(&session, cart);
    Json(cart_view(cart))
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub reference: String,
    pub total: Decimal,
    pub message: String,
    pub link: Option<String>,
}

async fn checkout(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<CustomerInfo>) -> Result<Json<CheckoutResponse>, (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let cart = {
        let mut carts = s.carts.write().await;
        let cart = carts.entry(session.clone()).or_insert_with(|| Cart::from_lines(s.storage.load(&session)));
        if cart.is_empty() {
            return Err((StatusCode::UNPROCESSABLE_ENTITY, "Cart is empty".to_string()));
        }
        cart.clone()
    };
    // usage is recorded only now, at confirmed checkout; validation itself
    // never writes
    if let Some(coupon) = cart.coupon() {
        s.store.record_coupon_usage(coupon.coupon_id, &coupon.user_id).await.map_err(http_error)?;
    }
    let reference = order_reference();
    let message = compose_message(&reference, &cart, &r);
    let link = whatsapp_link(&s.whatsapp, &message).map(|u| u.to_string());
    {
        let mut carts = s.carts.write().await;
        if let Some(cart) = carts.get_mut(&session) {
            cart.clear();
            drain_events(&session, cart);
        }
        s.storage.delete(&session);
    }
    tracing::info!(session, reference, "checkout handed off");
    Ok(Json(CheckoutResponse { reference, total: cart.total_due(), message, link }))
}
