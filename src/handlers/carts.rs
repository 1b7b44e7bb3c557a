use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::success;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct AddItemBody {
    product_id: Uuid,
    quantity: i32,
}

async fn get_cart(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let cart = state.services.carts.get_cart(customer_id).await?;
    Ok(success(cart))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
    Json(body): Json<AddItemBody>,
) -> Result<Response, ServiceError> {
    let cart = state
        .services
        .carts
        .add_item(customer_id, body.product_id, body.quantity)
        .await?;
    Ok(success(cart))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path((customer_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ServiceError> {
    let cart = state
        .services
        .carts
        .remove_item(customer_id, product_id)
        .await?;
    Ok(success(cart))
}

pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers/{customer_id}/cart", get(get_cart))
        .route("/customers/{customer_id}/cart/items", post(add_item))
        .route(
            "/customers/{customer_id}/cart/items/{product_id}",
            delete(remove_item),
        )
}
