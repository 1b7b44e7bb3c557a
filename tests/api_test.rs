mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal_macros::dec;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::api_router;

use common::TestApp;

#[tokio::test]
async fn health_check_responds() {
    let app = TestApp::new().await;
    let (state, _tmp) = app.into_state();
    let router = api_router(state);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn product_listing_and_missing_product() {
    let app = TestApp::new().await;
    let category = app.seed_category("Http").await;
    app.seed_product("Cable", dec!(15), 5, category.id).await;
    let (state, _tmp) = app.into_state();
    let router = api_router(state);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/products")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/products/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cart_flow_over_http() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("http@example.com").await;
    let category = app.seed_category("HttpCart").await;
    let product = app.seed_product("Adapter", dec!(25), 5, category.id).await;
    let (state, _tmp) = app.into_state();
    let router = api_router(state);

    let body = serde_json::json!({ "product_id": product.id, "quantity": 2 });
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/customers/{}/cart/items", customer.id))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/customers/{}/cart", customer.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let cart: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let final_total: rust_decimal::Decimal = cart["final_total"]
        .as_str()
        .expect("decimal serialized as string")
        .parse()
        .unwrap();
    assert_eq!(final_total, dec!(50));
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_quantity_maps_to_bad_request() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("badqty@example.com").await;
    let category = app.seed_category("HttpBad").await;
    let product = app.seed_product("Plug", dec!(25), 5, category.id).await;
    let (state, _tmp) = app.into_state();
    let router = api_router(state);

    let body = serde_json::json!({ "product_id": product.id, "quantity": 0 });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/customers/{}/cart/items", customer.id))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
