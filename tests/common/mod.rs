#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tempfile::TempDir;
use uuid::Uuid;

use storefront_api::config::AppConfig;
use storefront_api::entities::offer::DiscountType;
use storefront_api::entities::{category, coupon, customer, product};
use storefront_api::errors::ServiceError;
use storefront_api::gateway::{GatewayOrderHandle, GatewayOrderRequest, PaymentGateway};
use storefront_api::services::accounts::CreateCustomerRequest;
use storefront_api::services::catalog::CreateProductRequest;
use storefront_api::services::coupons::CreateCouponRequest;
use storefront_api::{db, events, AppServices, AppState};

/// Gateway double that accepts every order and echoes the amount back.
pub struct StubGateway;

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(
        &self,
        request: GatewayOrderRequest,
    ) -> Result<GatewayOrderHandle, ServiceError> {
        Ok(GatewayOrderHandle {
            gateway_order_id: format!("gw_{}", request.receipt),
            amount_minor: request.amount_minor,
            currency: request.currency,
        })
    }
}

/// Full application wired against a throwaway SQLite database.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub config: Arc<AppConfig>,
    _tmp: TempDir,
}

impl TestApp {
    /// Shipping is zeroed by default so totals in assertions are just the
    /// item subtotals; shipping-specific tests override it.
    pub async fn new() -> Self {
        Self::with_config(|cfg| {
            cfg.shipping_flat_rate = Decimal::ZERO;
        })
        .await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let tmp = TempDir::new().expect("temp dir");
        let db_path = tmp.path().join("test.sqlite");
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut config = AppConfig::new(
            database_url,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // SQLite needs a single writer.
        config.db_max_connections = 1;
        config.db_min_connections = 1;
        adjust(&mut config);

        let db = Arc::new(
            db::establish_connection_from_app_config(&config)
                .await
                .expect("connect"),
        );
        db::run_migrations(&db).await.expect("migrate");

        let (event_sender, _handle) = events::start();
        let config = Arc::new(config);
        let services = AppServices::new(
            db.clone(),
            Arc::new(event_sender),
            config.clone(),
            Arc::new(StubGateway),
        );

        Self {
            db,
            services,
            config,
            _tmp: tmp,
        }
    }

    pub fn into_state(self) -> (Arc<AppState>, TempDir) {
        let (event_sender, _handle) = events::start();
        let state = Arc::new(AppState {
            db: self.db,
            config: self.config,
            event_sender: Arc::new(event_sender),
            services: self.services,
        });
        (state, self._tmp)
    }

    pub async fn seed_customer(&self, email: &str) -> customer::Model {
        self.services
            .accounts
            .create_customer(CreateCustomerRequest {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "Customer".to_string(),
                mobile: Some("5550100100".to_string()),
            })
            .await
            .expect("seed customer")
    }

    pub async fn seed_category(&self, name: &str) -> category::Model {
        self.services
            .catalog
            .create_category(name.to_string(), None)
            .await
            .expect("seed category")
    }

    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        stock: i32,
        category_id: Uuid,
    ) -> product::Model {
        self.services
            .catalog
            .create_product(CreateProductRequest {
                name: name.to_string(),
                description: format!("{} description", name),
                price,
                stock,
                category_id,
            })
            .await
            .expect("seed product")
    }

    /// Coupon valid from yesterday through tomorrow.
    pub async fn seed_coupon(
        &self,
        code: &str,
        discount_type: DiscountType,
        discount_value: Decimal,
        min_cart_value: Option<Decimal>,
        max_discount_value: Option<Decimal>,
    ) -> coupon::Model {
        let now = Utc::now();
        self.services
            .coupons
            .create_coupon(CreateCouponRequest {
                code: code.to_string(),
                discount_type,
                discount_value,
                min_cart_value,
                max_discount_value,
                valid_from: now - Duration::days(1),
                valid_until: now + Duration::days(1),
                usage_limit: None,
            })
            .await
            .expect("seed coupon")
    }

    /// Puts money in the customer's wallet through the normal top-up path.
    pub async fn fund_wallet(&self, customer_id: Uuid, amount: Decimal) {
        self.services
            .wallet
            .top_up(customer_id, amount)
            .await
            .expect("fund wallet");
    }

    pub fn shipping_details() -> storefront_api::services::orders::ShippingDetails {
        storefront_api::services::orders::ShippingDetails {
            name: "Test Customer".to_string(),
            mobile: "5550100100".to_string(),
            alternate_mobile: None,
            location: "12 Harbor Lane".to_string(),
            city: "Pune".to_string(),
            state: "MH".to_string(),
            landmark: None,
            zip: "411001".to_string(),
        }
    }
}
