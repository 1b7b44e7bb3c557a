use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::order::PaymentMethod;
use crate::errors::ServiceError;
use crate::handlers::common::{created, success};
use crate::services::orders::ShippingDetails;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct ApplyCouponBody {
    code: String,
}

/// Shipping comes either inline or from a saved address (the default one
/// when `address_id` is absent).
#[derive(Debug, Deserialize)]
struct PlaceOrderBody {
    shipping: Option<ShippingDetails>,
    address_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct ConfirmPaymentBody {
    method: PaymentMethod,
}

async fn apply_coupon(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
    Json(body): Json<ApplyCouponBody>,
) -> Result<Response, ServiceError> {
    let cart = state
        .services
        .coupons
        .apply_to_cart(customer_id, &body.code)
        .await?;
    Ok(success(cart))
}

async fn remove_coupon(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let cart = state.services.coupons.remove_from_cart(customer_id).await?;
    Ok(success(cart))
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
    Json(body): Json<PlaceOrderBody>,
) -> Result<Response, ServiceError> {
    let shipping = match body.shipping {
        Some(shipping) => shipping,
        None => {
            state
                .services
                .accounts
                .shipping_details_for(customer_id, body.address_id)
                .await?
        }
    };
    let order = state
        .services
        .orders
        .place_order(customer_id, shipping)
        .await?;
    Ok(created(order))
}

async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ConfirmPaymentBody>,
) -> Result<Response, ServiceError> {
    let order = state
        .services
        .payments
        .confirm_payment(order_id, customer_id, body.method)
        .await?;
    Ok(success(order))
}

async fn wallet_payment(
    State(state): State<Arc<AppState>>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ServiceError> {
    let order = state
        .services
        .payments
        .process_wallet_payment(order_id, customer_id)
        .await?;
    Ok(success(order))
}

async fn gateway_order(
    State(state): State<Arc<AppState>>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ServiceError> {
    let handle = state
        .services
        .payments
        .create_gateway_order(order_id, customer_id)
        .await?;
    Ok(created(handle))
}

pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers/{customer_id}/cart/coupon", post(apply_coupon))
        .route(
            "/customers/{customer_id}/cart/coupon",
            delete(remove_coupon),
        )
        .route("/customers/{customer_id}/orders", post(place_order))
        .route(
            "/customers/{customer_id}/orders/{order_id}/payment",
            post(confirm_payment),
        )
        .route(
            "/customers/{customer_id}/orders/{order_id}/payment/wallet",
            post(wallet_payment),
        )
        .route(
            "/customers/{customer_id}/orders/{order_id}/payment/gateway-order",
            post(gateway_order),
        )
}
