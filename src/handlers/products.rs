use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::success;
use crate::services::catalog::ProductQuery;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
}

#[derive(Debug, Serialize)]
struct StockResponse {
    product_id: Uuid,
    stock: i32,
    is_out_of_stock: bool,
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Response, ServiceError> {
    let products = state.services.catalog.list_products(query).await?;
    Ok(success(products))
}

async fn search_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ServiceError> {
    let products = state.services.catalog.search_products(&params.q).await?;
    Ok(success(products))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let product = state.services.catalog.get_product(product_id).await?;
    Ok(success(product))
}

async fn get_stock(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let (stock, is_out_of_stock) = state.services.catalog.get_stock(product_id).await?;
    Ok(success(StockResponse {
        product_id,
        stock,
        is_out_of_stock,
    }))
}

async fn list_categories(State(state): State<Arc<AppState>>) -> Result<Response, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(success(categories))
}

pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/search", get(search_products))
        .route("/products/{product_id}", get(get_product))
        .route("/products/{product_id}/stock", get(get_stock))
        .route("/categories", get(list_categories))
}
