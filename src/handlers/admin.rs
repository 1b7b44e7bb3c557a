use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::order::OrderStatus;
use crate::errors::ServiceError;
use crate::handlers::common::{created, success};
use crate::services::catalog::{CreateOfferRequest, CreateProductRequest};
use crate::services::coupons::CreateCouponRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct SetActiveBody {
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct AttachOfferBody {
    offer_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusBody {
    status: OrderStatus,
}

#[derive(Debug, Deserialize)]
struct CreateCategoryBody {
    name: String,
    description: Option<String>,
}

async fn create_coupon(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCouponRequest>,
) -> Result<Response, ServiceError> {
    let coupon = state.services.coupons.create_coupon(body).await?;
    Ok(created(coupon))
}

async fn list_coupons(State(state): State<Arc<AppState>>) -> Result<Response, ServiceError> {
    let coupons = state.services.coupons.list_coupons().await?;
    Ok(success(coupons))
}

async fn set_coupon_active(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(body): Json<SetActiveBody>,
) -> Result<Response, ServiceError> {
    let coupon = state
        .services
        .coupons
        .set_active(&code, body.is_active)
        .await?;
    Ok(success(coupon))
}

async fn create_offer(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateOfferRequest>,
) -> Result<Response, ServiceError> {
    let offer = state.services.catalog.create_offer(body).await?;
    Ok(created(offer))
}

async fn attach_offer_to_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
    Json(body): Json<AttachOfferBody>,
) -> Result<Response, ServiceError> {
    let product = state
        .services
        .catalog
        .attach_offer_to_product(product_id, body.offer_id)
        .await?;
    Ok(success(product))
}

async fn attach_offer_to_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<Uuid>,
    Json(body): Json<AttachOfferBody>,
) -> Result<Response, ServiceError> {
    let category = state
        .services
        .catalog
        .attach_offer_to_category(category_id, body.offer_id)
        .await?;
    Ok(success(category))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateProductRequest>,
) -> Result<Response, ServiceError> {
    let product = state.services.catalog.create_product(body).await?;
    Ok(created(product))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCategoryBody>,
) -> Result<Response, ServiceError> {
    let category = state
        .services
        .catalog
        .create_category(body.name, body.description)
        .await?;
    Ok(created(category))
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Response, ServiceError> {
    let order = state
        .services
        .orders
        .update_status(order_id, body.status)
        .await?;
    Ok(success(order))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/coupons", post(create_coupon))
        .route("/admin/coupons", get(list_coupons))
        .route("/admin/coupons/{code}/active", put(set_coupon_active))
        .route("/admin/offers", post(create_offer))
        .route(
            "/admin/products/{product_id}/offer",
            put(attach_offer_to_product),
        )
        .route(
            "/admin/categories/{category_id}/offer",
            put(attach_offer_to_category),
        )
        .route("/admin/products", post(create_product))
        .route("/admin/categories", post(create_category))
        .route("/admin/orders/{order_id}/status", put(update_order_status))
}
