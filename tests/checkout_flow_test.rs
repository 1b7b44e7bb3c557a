mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, EntityTrait};

use storefront_api::entities::offer::DiscountType;
use storefront_api::entities::order::{OrderStatus, PaymentMethod};
use storefront_api::entities::wallet_transaction::WalletTransactionType;
use storefront_api::entities::{cart, cart_item, coupon, order, order_item, product};
use storefront_api::errors::ServiceError;

use common::TestApp;

#[tokio::test]
async fn placing_an_order_snapshots_the_cart_and_deletes_it() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("place@example.com").await;
    let category = app.seed_category("Kitchen").await;
    let item = app.seed_product("Kettle", dec!(120), 10, category.id).await;
    app.seed_coupon("SAVE20", DiscountType::Fixed, dec!(20), None, None)
        .await;

    app.services
        .carts
        .add_item(customer.id, item.id, 2)
        .await
        .unwrap();
    app.services
        .coupons
        .apply_to_cart(customer.id, "SAVE20")
        .await
        .unwrap();

    let placed = app
        .services
        .orders
        .place_order(customer.id, TestApp::shipping_details())
        .await
        .unwrap();

    assert!(placed.order.order_number.starts_with("ORD-"));
    assert_eq!(placed.order.total_amount, dec!(240));
    assert_eq!(placed.order.discount_applied, dec!(20));
    assert_eq!(placed.order.final_total, dec!(220));
    assert_eq!(placed.order.applied_coupon, Some("SAVE20".to_string()));
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.payment_method, None);
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].quantity, 2);

    // The cart is gone.
    let carts = cart::Entity::find().all(&*app.db).await.unwrap();
    assert!(carts.is_empty());

    // Stock and popularity were adjusted.
    let after = product::Entity::find_by_id(item.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 8);
    assert!(!after.is_out_of_stock);
    assert_eq!(after.popularity, 1);

    // Coupon usage was counted.
    let coupons = coupon::Entity::find().all(&*app.db).await.unwrap();
    assert_eq!(coupons[0].usage_count, 1);
}

#[tokio::test]
async fn placing_an_order_from_an_empty_cart_is_rejected() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("emptyorder@example.com").await;
    app.services.carts.get_cart(customer.id).await.unwrap();

    let err = app
        .services
        .orders
        .place_order(customer.id, TestApp::shipping_details())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn oversold_product_floors_at_zero_and_is_flagged() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("oversell@example.com").await;
    let category = app.seed_category("Clearance").await;
    let item = app.seed_product("Last lamp", dec!(60), 2, category.id).await;

    app.services
        .carts
        .add_item(customer.id, item.id, 5)
        .await
        .unwrap();
    app.services
        .orders
        .place_order(customer.id, TestApp::shipping_details())
        .await
        .unwrap();

    let after = product::Entity::find_by_id(item.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 0);
    assert!(after.is_out_of_stock);
}

#[tokio::test]
async fn a_failing_placement_step_leaves_no_partial_state() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("atomic@example.com").await;
    let category = app.seed_category("Kitchen").await;
    let kept = app.seed_product("Kettle", dec!(120), 10, category.id).await;
    let doomed = app.seed_product("Toaster", dec!(80), 5, category.id).await;

    app.services
        .carts
        .add_item(customer.id, kept.id, 1)
        .await
        .unwrap();
    app.services
        .carts
        .add_item(customer.id, doomed.id, 2)
        .await
        .unwrap();

    // A catalog row disappears out of band. Constraint checks are paused
    // only around the delete so the cart line stays behind.
    app.db
        .execute_unprepared("PRAGMA foreign_keys = OFF")
        .await
        .unwrap();
    product::Entity::delete_by_id(doomed.id)
        .exec(&*app.db)
        .await
        .unwrap();
    app.db
        .execute_unprepared("PRAGMA foreign_keys = ON")
        .await
        .unwrap();

    let result = app
        .services
        .orders
        .place_order(customer.id, TestApp::shipping_details())
        .await;
    assert!(result.is_err());

    // The aborted placement wrote nothing.
    assert!(order::Entity::find().all(&*app.db).await.unwrap().is_empty());
    assert!(order_item::Entity::find()
        .all(&*app.db)
        .await
        .unwrap()
        .is_empty());
    let lines = cart_item::Entity::find().all(&*app.db).await.unwrap();
    assert_eq!(lines.len(), 2);
    let kettle = product::Entity::find_by_id(kept.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kettle.stock, 10);
    assert_eq!(kettle.popularity, 0);
}

async fn place_order_worth(app: &TestApp, email: &str, price: rust_decimal::Decimal) -> (uuid::Uuid, uuid::Uuid) {
    let customer = app.seed_customer(email).await;
    let category = app.seed_category(&format!("cat-{}", email)).await;
    let product = app
        .seed_product(&format!("item-{}", email), price, 10, category.id)
        .await;
    app.services
        .carts
        .add_item(customer.id, product.id, 1)
        .await
        .unwrap();
    let placed = app
        .services
        .orders
        .place_order(customer.id, TestApp::shipping_details())
        .await
        .unwrap();
    (customer.id, placed.order.id)
}

#[tokio::test]
async fn cash_on_delivery_over_the_ceiling_is_rejected() {
    let app = TestApp::new().await;
    let (customer_id, order_id) = place_order_worth(&app, "codfail@example.com", dec!(1500)).await;

    let err = app
        .services
        .payments
        .confirm_payment(order_id, customer_id, PaymentMethod::Cod)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn cash_on_delivery_under_the_ceiling_is_confirmed() {
    let app = TestApp::new().await;
    let (customer_id, order_id) = place_order_worth(&app, "codok@example.com", dec!(900)).await;

    let order = app
        .services
        .payments
        .confirm_payment(order_id, customer_id, PaymentMethod::Cod)
        .await
        .unwrap();
    assert_eq!(order.payment_method, Some(PaymentMethod::Cod));
    assert_eq!(order.status, OrderStatus::Processed);
}

#[tokio::test]
async fn paying_twice_conflicts() {
    let app = TestApp::new().await;
    let (customer_id, order_id) = place_order_worth(&app, "twice@example.com", dec!(100)).await;

    app.services
        .payments
        .confirm_payment(order_id, customer_id, PaymentMethod::Cod)
        .await
        .unwrap();
    let err = app
        .services
        .payments
        .confirm_payment(order_id, customer_id, PaymentMethod::Cod)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn wallet_payment_fails_without_enough_balance() {
    let app = TestApp::new().await;
    let (customer_id, order_id) = place_order_worth(&app, "poorwallet@example.com", dec!(700)).await;
    app.fund_wallet(customer_id, dec!(500)).await;

    let err = app
        .services
        .payments
        .process_wallet_payment(order_id, customer_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::PaymentFailed(_));

    // Nothing moved.
    assert_eq!(
        app.services.wallet.balance(customer_id).await.unwrap(),
        dec!(500)
    );
    let order = app.services.orders.get_order(order_id).await.unwrap();
    assert_eq!(order.order.status, OrderStatus::Pending);
    assert_eq!(order.order.payment_method, None);
}

#[tokio::test]
async fn wallet_payment_debits_exactly_and_records_the_ledger() {
    let app = TestApp::new().await;
    let (customer_id, order_id) = place_order_worth(&app, "wallet@example.com", dec!(700)).await;
    app.fund_wallet(customer_id, dec!(700)).await;

    let order = app
        .services
        .payments
        .process_wallet_payment(order_id, customer_id)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Processed);
    assert_eq!(order.payment_method, Some(PaymentMethod::Wallet));

    assert_eq!(
        app.services.wallet.balance(customer_id).await.unwrap(),
        dec!(0.00)
    );
    let transactions = app
        .services
        .wallet
        .list_transactions(customer_id)
        .await
        .unwrap();
    let debit = transactions
        .iter()
        .find(|t| t.transaction_type == WalletTransactionType::Debit)
        .expect("debit entry");
    assert_eq!(debit.amount, dec!(700));
    assert!(debit.description.starts_with("Payment for order ORD-"));
}

#[tokio::test]
async fn wallet_payment_checks_order_ownership() {
    let app = TestApp::new().await;
    let (_, order_id) = place_order_worth(&app, "owner@example.com", dec!(100)).await;
    let stranger = app.seed_customer("stranger@example.com").await;
    app.fund_wallet(stranger.id, dec!(500)).await;

    let err = app
        .services
        .payments
        .process_wallet_payment(order_id, stranger.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));
}

#[tokio::test]
async fn wallet_method_is_rejected_on_the_generic_confirm_path() {
    let app = TestApp::new().await;
    let (customer_id, order_id) = place_order_worth(&app, "wrongpath@example.com", dec!(100)).await;

    let err = app
        .services
        .payments
        .confirm_payment(order_id, customer_id, PaymentMethod::Wallet)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));
}

#[tokio::test]
async fn gateway_order_carries_the_amount_in_minor_units() {
    let app = TestApp::new().await;
    let (customer_id, order_id) = place_order_worth(&app, "gateway@example.com", dec!(249.50)).await;

    let checkout = app
        .services
        .payments
        .create_gateway_order(order_id, customer_id)
        .await
        .unwrap();
    assert_eq!(checkout.gateway.amount_minor, 24950);
    assert_eq!(checkout.gateway.currency, "INR");
    assert!(checkout.gateway.gateway_order_id.starts_with("gw_ORD-"));
    assert_eq!(checkout.order.id, order_id);

    // Registering with the provider does not move the order forward.
    let order = app.services.orders.get_order(order_id).await.unwrap();
    assert_eq!(order.order.status, OrderStatus::Pending);
}
