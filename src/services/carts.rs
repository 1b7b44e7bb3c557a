use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::{cart, cart_item, category, coupon, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::pricing;

/// Cart contents plus the owning cart row.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: cart::Model,
    pub items: Vec<cart_item::Model>,
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Fetches the customer's cart, creating an empty one if none exists.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, customer_id: Uuid) -> Result<CartView, ServiceError> {
        let existing = cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?;

        let cart = match existing {
            Some(cart) => cart,
            None => {
                let created = self.create_empty_cart(&*self.db, customer_id).await?;
                self.event_sender
                    .send_or_log(Event::CartCreated(created.id))
                    .await;
                created
            }
        };

        let items = cart
            .find_related(cart_item::Entity)
            .all(&*self.db)
            .await?;
        Ok(CartView { cart, items })
    }

    /// Adds a product to the cart, or replaces the quantity of an existing
    /// line. The unit price is snapshotted from the catalog (with any
    /// eligible offer applied) when the line is first created and kept on
    /// later quantity changes.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let product = product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let cart = match cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
        {
            Some(cart) => cart,
            None => self.create_empty_cart(&txn, customer_id).await?,
        };

        let existing_line = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        let now = Utc::now();
        match existing_line {
            Some(line) => {
                let unit_price = line.unit_price;
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(quantity);
                active.subtotal = Set(unit_price * Decimal::from(quantity));
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                let unit_price = self.effective_unit_price(&txn, &product).await?;
                let line = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    product_id: Set(product.id),
                    name: Set(product.name.clone()),
                    unit_price: Set(unit_price),
                    quantity: Set(quantity),
                    subtotal: Set(unit_price * Decimal::from(quantity)),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                line.insert(&txn).await?;
            }
        }

        let cart = recalculate_cart_totals(&txn, cart.id, &self.config).await?;
        let items = cart.find_related(cart_item::Entity).all(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart.id))
            .await;
        Ok(CartView { cart, items })
    }

    /// Removes a product line from the cart. Removing a product that is not
    /// in the cart is a no-op.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Cart for customer {} not found", customer_id))
            })?;

        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;

        let cart = recalculate_cart_totals(&txn, cart.id, &self.config).await?;
        let items = cart.find_related(cart_item::Entity).all(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart.id))
            .await;
        Ok(CartView { cart, items })
    }

    async fn create_empty_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        customer_id: Uuid,
    ) -> Result<cart::Model, ServiceError> {
        let now = Utc::now();
        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            shipping_charge: Set(Decimal::ZERO),
            total: Set(Decimal::ZERO),
            applied_coupon: Set(None),
            discount_applied: Set(Decimal::ZERO),
            final_total: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(cart.insert(conn).await?)
    }

    /// Unit price after the better of the product's and its category's offer.
    async fn effective_unit_price<C: ConnectionTrait>(
        &self,
        conn: &C,
        product: &product::Model,
    ) -> Result<Decimal, ServiceError> {
        let product_offer = match product.offer_id {
            Some(offer_id) => {
                crate::entities::offer::Entity::find_by_id(offer_id)
                    .one(conn)
                    .await?
            }
            None => None,
        };

        let category = category::Entity::find_by_id(product.category_id)
            .one(conn)
            .await?;
        let category_offer = match category.and_then(|c| c.offer_id) {
            Some(offer_id) => {
                crate::entities::offer::Entity::find_by_id(offer_id)
                    .one(conn)
                    .await?
            }
            None => None,
        };

        Ok(pricing::discounted_price(
            product.price,
            product_offer.as_ref(),
            category_offer.as_ref(),
            Utc::now(),
        ))
    }
}

/// The only place cart totals are written. Sums line subtotals, derives the
/// shipping charge, re-evaluates any applied coupon against the new total and
/// keeps `final_total = total - discount_applied`.
///
/// A coupon that no longer qualifies after the change (cart dropped below its
/// minimum, or emptied) is removed rather than left stale.
pub async fn recalculate_cart_totals<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    config: &AppConfig,
) -> Result<cart::Model, ServiceError> {
    let cart = cart::Entity::find_by_id(cart_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

    let items = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .all(conn)
        .await?;

    let items_subtotal: Decimal = items.iter().map(|i| i.subtotal).sum();

    let shipping_charge = if items.is_empty() || items_subtotal >= config.free_shipping_threshold {
        Decimal::ZERO
    } else {
        config.shipping_flat_rate
    };
    let total = items_subtotal + shipping_charge;

    let (applied_coupon, discount_applied) = match &cart.applied_coupon {
        Some(code) => {
            let coupon = coupon::Entity::find()
                .filter(coupon::Column::Code.eq(code.as_str()))
                .one(conn)
                .await?;
            match coupon {
                Some(coupon) if coupon_still_qualifies(&coupon, total) => {
                    let discount = pricing::discount_amount(
                        coupon.discount_type,
                        coupon.discount_value,
                        coupon.max_discount_value,
                        total,
                    );
                    (Some(code.clone()), discount)
                }
                _ => (None, Decimal::ZERO),
            }
        }
        None => (None, Decimal::ZERO),
    };

    let final_total = total - discount_applied;

    let mut active: cart::ActiveModel = cart.into();
    active.shipping_charge = Set(shipping_charge);
    active.total = Set(total);
    active.applied_coupon = Set(applied_coupon);
    active.discount_applied = Set(discount_applied);
    active.final_total = Set(final_total);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Re-runs the apply-time eligibility checks. A coupon that expires, is
/// deactivated, or runs out of uses after application is dropped on the
/// next cart change.
fn coupon_still_qualifies(coupon: &coupon::Model, total: Decimal) -> bool {
    if total <= Decimal::ZERO {
        return false;
    }
    if !coupon.is_active || !coupon.is_within_window(Utc::now()) || coupon.usage_exhausted() {
        return false;
    }
    match coupon.min_cart_value {
        Some(min) => total >= min,
        None => true,
    }
}
