mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use storefront_api::entities::offer::{DiscountType, OfferKind};
use storefront_api::services::catalog::{CreateOfferRequest, ProductQuery, ProductSort};

use common::TestApp;

async fn offer(
    app: &TestApp,
    kind: OfferKind,
    discount_type: DiscountType,
    value: rust_decimal::Decimal,
    cap: Option<rust_decimal::Decimal>,
) -> storefront_api::entities::offer::Model {
    let now = Utc::now();
    app.services
        .catalog
        .create_offer(CreateOfferRequest {
            name: format!("{:?} {:?} {}", kind, discount_type, value),
            offer_kind: kind,
            discount_type,
            discount_value: value,
            max_discount_value: cap,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn the_larger_offer_wins_between_product_and_category() {
    let app = TestApp::new().await;
    let category = app.seed_category("Outdoor").await;
    let product = app.seed_product("Tent", dec!(200), 5, category.id).await;

    let product_offer = offer(&app, OfferKind::Product, DiscountType::Fixed, dec!(20), None).await;
    let category_offer = offer(
        &app,
        OfferKind::Category,
        DiscountType::Fixed,
        dec!(50),
        None,
    )
    .await;
    app.services
        .catalog
        .attach_offer_to_product(product.id, product_offer.id)
        .await
        .unwrap();
    app.services
        .catalog
        .attach_offer_to_category(category.id, category_offer.id)
        .await
        .unwrap();

    let detail = app.services.catalog.get_product(product.id).await.unwrap();
    assert_eq!(detail.product.effective_price, dec!(150));
}

#[tokio::test]
async fn a_tie_between_offers_goes_to_the_product() {
    let app = TestApp::new().await;
    let category = app.seed_category("Tied").await;
    let product = app.seed_product("Jacket", dec!(200), 5, category.id).await;

    // Both discounts come to 30 on a base of 200.
    let product_offer = offer(&app, OfferKind::Product, DiscountType::Fixed, dec!(30), None).await;
    let category_offer = offer(
        &app,
        OfferKind::Category,
        DiscountType::Percentage,
        dec!(15),
        None,
    )
    .await;
    app.services
        .catalog
        .attach_offer_to_product(product.id, product_offer.id)
        .await
        .unwrap();
    app.services
        .catalog
        .attach_offer_to_category(category.id, category_offer.id)
        .await
        .unwrap();

    let detail = app.services.catalog.get_product(product.id).await.unwrap();
    assert_eq!(detail.product.effective_price, dec!(170));
}

#[tokio::test]
async fn listing_filters_by_category_and_price_and_sorts() {
    let app = TestApp::new().await;
    let books = app.seed_category("Books").await;
    let tools = app.seed_category("Tools").await;
    app.seed_product("Cheap book", dec!(10), 5, books.id).await;
    app.seed_product("Pricey book", dec!(90), 5, books.id).await;
    app.seed_product("Hammer", dec!(40), 5, tools.id).await;

    let in_books = app
        .services
        .catalog
        .list_products(ProductQuery {
            category_id: Some(books.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(in_books.len(), 2);

    let mid_priced = app
        .services
        .catalog
        .list_products(ProductQuery {
            min_price: Some(dec!(20)),
            max_price: Some(dec!(50)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(mid_priced.len(), 1);
    assert_eq!(mid_priced[0].product.name, "Hammer");

    let by_price = app
        .services
        .catalog
        .list_products(ProductQuery {
            sort: Some(ProductSort::PriceAsc),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_price[0].product.name, "Cheap book");
    assert_eq!(by_price[2].product.name, "Pricey book");
}

#[tokio::test]
async fn search_matches_on_name_prefix() {
    let app = TestApp::new().await;
    let category = app.seed_category("Search").await;
    app.seed_product("Blue mug", dec!(10), 5, category.id).await;
    app.seed_product("Blue plate", dec!(12), 5, category.id)
        .await;
    app.seed_product("Red mug", dec!(10), 5, category.id).await;

    let hits = app.services.catalog.search_products("Blue").await.unwrap();
    assert_eq!(hits.len(), 2);

    let none = app.services.catalog.search_products("mug").await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn wishlist_rejects_duplicates_and_removes_cleanly() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("wish@example.com").await;
    let category = app.seed_category("Wish").await;
    let product = app.seed_product("Drone", dec!(999), 5, category.id).await;

    app.services
        .catalog
        .add_to_wishlist(customer.id, product.id)
        .await
        .unwrap();
    let err = app
        .services
        .catalog
        .add_to_wishlist(customer.id, product.id)
        .await
        .unwrap_err();
    assert_matches!(err, storefront_api::errors::ServiceError::Conflict(_));

    let list = app
        .services
        .catalog
        .list_wishlist(customer.id)
        .await
        .unwrap();
    assert_eq!(list.len(), 1);

    app.services
        .catalog
        .remove_from_wishlist(customer.id, product.id)
        .await
        .unwrap();
    let list = app
        .services
        .catalog
        .list_wishlist(customer.id)
        .await
        .unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn product_detail_lists_related_products_from_its_category() {
    let app = TestApp::new().await;
    let category = app.seed_category("Related").await;
    let other = app.seed_category("Unrelated").await;
    let main = app.seed_product("Table", dec!(100), 5, category.id).await;
    app.seed_product("Chair", dec!(50), 5, category.id).await;
    app.seed_product("Bench", dec!(70), 5, category.id).await;
    app.seed_product("Spoon", dec!(5), 5, other.id).await;

    let detail = app.services.catalog.get_product(main.id).await.unwrap();
    assert_eq!(detail.related.len(), 2);
    assert!(detail
        .related
        .iter()
        .all(|p| p.product.category_id == category.id && p.product.id != main.id));
}

#[tokio::test]
async fn popularity_sort_reflects_sales() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("popular@example.com").await;
    let category = app.seed_category("Popular").await;
    let slow = app.seed_product("Slow mover", dec!(10), 50, category.id).await;
    let fast = app.seed_product("Fast mover", dec!(10), 50, category.id).await;
    let _ = slow;

    app.services
        .carts
        .add_item(customer.id, fast.id, 1)
        .await
        .unwrap();
    app.services
        .orders
        .place_order(customer.id, TestApp::shipping_details())
        .await
        .unwrap();

    let ranked = app
        .services
        .catalog
        .list_products(ProductQuery {
            sort: Some(ProductSort::Popularity),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ranked[0].product.name, "Fast mover");
}
