pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::gateway::PaymentGateway;
use crate::services::accounts::AccountService;
use crate::services::carts::CartService;
use crate::services::catalog::CatalogService;
use crate::services::coupons::CouponService;
use crate::services::orders::OrderService;
use crate::services::payments::PaymentService;
use crate::services::wallet::WalletService;

/// Service instances shared by all request handlers.
#[derive(Clone)]
pub struct AppServices {
    pub carts: CartService,
    pub coupons: CouponService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub wallet: WalletService,
    pub catalog: CatalogService,
    pub accounts: AccountService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            carts: CartService::new(db.clone(), event_sender.clone(), config.clone()),
            coupons: CouponService::new(db.clone(), event_sender.clone(), config.clone()),
            orders: OrderService::new(db.clone(), event_sender.clone(), config.clone()),
            payments: PaymentService::new(
                db.clone(),
                event_sender.clone(),
                config.clone(),
                gateway,
            ),
            wallet: WalletService::new(db.clone(), event_sender.clone()),
            catalog: CatalogService::new(db.clone()),
            accounts: AccountService::new(db),
        }
    }
}

pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
}

async fn health_check() -> &'static str {
    "OK"
}

/// Builds the full API router over the shared application state. Resource
/// routes live under /api/v1; the health probe stays at the root.
pub fn api_router(state: Arc<AppState>) -> Router {
    let v1 = Router::new()
        .merge(handlers::products_routes())
        .merge(handlers::carts_routes())
        .merge(handlers::checkout_routes())
        .merge(handlers::orders_routes())
        .merge(handlers::accounts_routes())
        .merge(handlers::admin_routes());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1)
        .with_state(state)
}
