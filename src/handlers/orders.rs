use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::success;
use crate::AppState;

async fn order_history(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let orders = state.services.orders.list_for_customer(customer_id).await?;
    Ok(success(orders))
}

async fn order_detail(
    State(state): State<Arc<AppState>>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ServiceError> {
    let view = state.services.orders.get_order(order_id).await?;
    if view.order.customer_id != customer_id {
        return Err(ServiceError::Unauthorized(
            "Order belongs to a different customer".to_string(),
        ));
    }
    Ok(success(view))
}

async fn order_invoice(
    State(state): State<Arc<AppState>>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ServiceError> {
    let invoice = state
        .services
        .orders
        .invoice(order_id, customer_id)
        .await?;
    Ok(success(invoice))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ServiceError> {
    let order = state
        .services
        .orders
        .cancel_order(order_id, customer_id)
        .await?;
    Ok(success(order))
}

pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers/{customer_id}/orders", get(order_history))
        .route(
            "/customers/{customer_id}/orders/{order_id}",
            get(order_detail),
        )
        .route(
            "/customers/{customer_id}/orders/{order_id}/invoice",
            get(order_invoice),
        )
        .route(
            "/customers/{customer_id}/orders/{order_id}/cancel",
            post(cancel_order),
        )
}
