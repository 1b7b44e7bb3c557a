use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::wallet_transaction;
use crate::errors::ServiceError;
use crate::handlers::common::{created, no_content, success};
use crate::services::accounts::{AddAddressRequest, CreateCustomerRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
struct WalletView {
    balance: Decimal,
    transactions: Vec<wallet_transaction::Model>,
}

#[derive(Debug, Deserialize)]
struct TopUpBody {
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct WishlistBody {
    product_id: Uuid,
}

async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCustomerRequest>,
) -> Result<Response, ServiceError> {
    let customer = state.services.accounts.create_customer(body).await?;
    Ok(created(customer))
}

async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let customer = state.services.accounts.get_customer(customer_id).await?;
    Ok(success(customer))
}

async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let balance = state.services.wallet.balance(customer_id).await?;
    let transactions = state.services.wallet.list_transactions(customer_id).await?;
    Ok(success(WalletView {
        balance,
        transactions,
    }))
}

async fn top_up_wallet(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
    Json(body): Json<TopUpBody>,
) -> Result<Response, ServiceError> {
    let balance = state
        .services
        .wallet
        .top_up(customer_id, body.amount)
        .await?;
    Ok(success(serde_json::json!({ "balance": balance })))
}

async fn add_address(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
    Json(body): Json<AddAddressRequest>,
) -> Result<Response, ServiceError> {
    let address = state
        .services
        .accounts
        .add_address(customer_id, body)
        .await?;
    Ok(created(address))
}

async fn list_addresses(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let addresses = state.services.accounts.list_addresses(customer_id).await?;
    Ok(success(addresses))
}

async fn update_address(
    State(state): State<Arc<AppState>>,
    Path((customer_id, address_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<AddAddressRequest>,
) -> Result<Response, ServiceError> {
    let address = state
        .services
        .accounts
        .update_address(customer_id, address_id, body)
        .await?;
    Ok(success(address))
}

async fn remove_address(
    State(state): State<Arc<AppState>>,
    Path((customer_id, address_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ServiceError> {
    state
        .services
        .accounts
        .remove_address(customer_id, address_id)
        .await?;
    Ok(no_content())
}

async fn add_to_wishlist(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
    Json(body): Json<WishlistBody>,
) -> Result<Response, ServiceError> {
    let item = state
        .services
        .catalog
        .add_to_wishlist(customer_id, body.product_id)
        .await?;
    Ok(created(item))
}

async fn list_wishlist(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let items = state.services.catalog.list_wishlist(customer_id).await?;
    Ok(success(items))
}

async fn remove_from_wishlist(
    State(state): State<Arc<AppState>>,
    Path((customer_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ServiceError> {
    state
        .services
        .catalog
        .remove_from_wishlist(customer_id, product_id)
        .await?;
    Ok(no_content())
}

pub fn accounts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers", post(create_customer))
        .route("/customers/{customer_id}", get(get_customer))
        .route("/customers/{customer_id}/wallet", get(get_wallet))
        .route("/customers/{customer_id}/wallet/top-up", post(top_up_wallet))
        .route("/customers/{customer_id}/addresses", post(add_address))
        .route("/customers/{customer_id}/addresses", get(list_addresses))
        .route(
            "/customers/{customer_id}/addresses/{address_id}",
            put(update_address).delete(remove_address),
        )
        .route("/customers/{customer_id}/wishlist", post(add_to_wishlist))
        .route("/customers/{customer_id}/wishlist", get(list_wishlist))
        .route(
            "/customers/{customer_id}/wishlist/{product_id}",
            delete(remove_from_wishlist),
        )
}
