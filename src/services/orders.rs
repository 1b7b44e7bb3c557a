use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::order::OrderStatus;
use crate::entities::{cart, cart_item, coupon, order, order_item, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::wallet::credit_wallet;
use validator::Validate;

/// Shipping destination captured on the order at placement time.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShippingDetails {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub mobile: String,
    pub alternate_mobile: Option<String>,
    #[validate(length(min = 1))]
    pub location: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    pub landmark: Option<String>,
    #[validate(length(min = 1))]
    pub zip: String,
}

/// Order plus its line items.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct InvoiceLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Billing document for an order: the shipping block and totals captured at
/// placement plus one priced line per item.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Invoice {
    #[serde(flatten)]
    pub order: order::Model,
    pub lines: Vec<InvoiceLine>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    #[allow(dead_code)]
    config: Arc<AppConfig>,
}

impl OrderService {
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

    /// Converts the customer's cart into an order. Everything happens in one
    /// transaction: the order and its items are written, stock and popularity
    /// are adjusted, coupon usage is counted and the cart is deleted. A
    /// failure at any step leaves the cart untouched.
    #[instrument(skip(self, shipping))]
    pub async fn place_order(
        &self,
        customer_id: Uuid,
        shipping: ShippingDetails,
    ) -> Result<OrderView, ServiceError> {
        shipping.validate()?;

        let txn = self.db.begin().await?;

        let cart = cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Cart for customer {} not found", customer_id))
            })?;

        let items = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "Cannot place an order from an empty cart".to_string(),
            ));
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = format!(
            "ORD-{}",
            order_id.simple().to_string()[..8].to_uppercase()
        );

        let placed = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            customer_id: Set(customer_id),
            ship_name: Set(shipping.name),
            ship_mobile: Set(shipping.mobile),
            ship_alternate_mobile: Set(shipping.alternate_mobile),
            ship_location: Set(shipping.location),
            ship_city: Set(shipping.city),
            ship_state: Set(shipping.state),
            ship_landmark: Set(shipping.landmark),
            ship_zip: Set(shipping.zip),
            shipping_charge: Set(cart.shipping_charge),
            total_amount: Set(cart.total),
            discount_applied: Set(cart.discount_applied),
            final_total: Set(cart.final_total),
            applied_coupon: Set(cart.applied_coupon.clone()),
            payment_method: Set(None),
            status: Set(OrderStatus::Pending),
            is_cancelled: Set(false),
            placed_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for item in &items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            self.adjust_product_after_sale(&txn, item.product_id, item.quantity)
                .await?;
        }

        if let Some(code) = &cart.applied_coupon {
            if let Some(coupon) = coupon::Entity::find()
                .filter(coupon::Column::Code.eq(code.as_str()))
                .one(&txn)
                .await?
            {
                let count = coupon.usage_count;
                let mut active: coupon::ActiveModel = coupon.into();
                active.usage_count = Set(count + 1);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
        }

        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        cart::Entity::delete_by_id(cart.id).exec(&txn).await?;

        let order_items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderPlaced(order_id))
            .await;
        Ok(OrderView {
            order: placed,
            items: order_items,
        })
    }

    /// Stock floors at zero; a sale that would take it to or below zero marks
    /// the product out of stock. Every sale bumps popularity.
    async fn adjust_product_after_sale<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let product = product::Entity::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let remaining = product.stock - quantity;
        let popularity = product.popularity + 1;
        let mut active: product::ActiveModel = product.into();
        active.stock = Set(remaining.max(0));
        active.is_out_of_stock = Set(remaining <= 0);
        active.popularity = Set(popularity);
        active.updated_at = Set(Utc::now());
        active.update(conn).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(OrderView { order, items })
    }

    #[instrument(skip(self))]
    pub async fn invoice(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Invoice, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if order.customer_id != customer_id {
            return Err(ServiceError::Unauthorized(
                "Order belongs to a different customer".to_string(),
            ));
        }

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;
        let lines = items
            .into_iter()
            .map(|(item, product)| {
                let (name, unit_price) = match product {
                    Some(p) => (p.name, p.price),
                    None => (format!("Product {}", item.product_id), Decimal::ZERO),
                };
                InvoiceLine {
                    product_id: item.product_id,
                    name,
                    quantity: item.quantity,
                    line_total: unit_price * Decimal::from(item.quantity),
                    unit_price,
                }
            })
            .collect();

        Ok(Invoice { order, lines })
    }

    /// Customer order history, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<order::Model>, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::PlacedAt)
            .all(&*self.db)
            .await?)
    }

    /// Fulfilment-side status update. Cancelled is terminal; nothing moves
    /// out of it.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.status == OrderStatus::Cancelled {
            return Err(ServiceError::Conflict(
                "Order is already cancelled".to_string(),
            ));
        }
        // Fulfilment only moves forward; cancellation is reachable from any
        // live status.
        if new_status != OrderStatus::Cancelled
            && fulfilment_rank(new_status) < fulfilment_rank(order.status)
        {
            return Err(ServiceError::InvalidOperation(format!(
                "Order status cannot move back from {} to {}",
                order.status, new_status
            )));
        }

        let old_status = order.status;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        if new_status == OrderStatus::Cancelled {
            active.is_cancelled = Set(true);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            })
            .await;
        Ok(updated)
    }

    /// Customer-initiated cancellation. Orders not yet shipped are cancelled
    /// outright and the amount paid comes back as wallet credit, in the same
    /// transaction as the status change. Shipped or delivered orders only get
    /// flagged for review; the status is untouched until fulfilment acts on
    /// the flag.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.customer_id != customer_id {
            return Err(ServiceError::Unauthorized(
                "Order belongs to a different customer".to_string(),
            ));
        }

        match order.status {
            OrderStatus::Cancelled => Err(ServiceError::Conflict(
                "Order is already cancelled".to_string(),
            )),
            OrderStatus::Shipped | OrderStatus::Delivered => {
                if order.is_cancelled {
                    return Err(ServiceError::Conflict(
                        "Cancellation has already been requested".to_string(),
                    ));
                }
                let mut active: order::ActiveModel = order.into();
                active.is_cancelled = Set(true);
                active.updated_at = Set(Utc::now());
                let updated = active.update(&txn).await?;
                txn.commit().await?;

                self.event_sender
                    .send_or_log(Event::CancellationRequested(order_id))
                    .await;
                Ok(updated)
            }
            OrderStatus::Pending | OrderStatus::Processed => {
                let refund = order.final_total;
                if refund > Decimal::ZERO {
                    credit_wallet(
                        &txn,
                        customer_id,
                        refund,
                        &format!("Refund for order {}", order.order_number),
                    )
                    .await?;
                }

                let mut active: order::ActiveModel = order.into();
                active.status = Set(OrderStatus::Cancelled);
                active.is_cancelled = Set(true);
                active.updated_at = Set(Utc::now());
                let updated = active.update(&txn).await?;
                txn.commit().await?;

                self.event_sender
                    .send_or_log(Event::OrderCancelled(order_id))
                    .await;
                if refund > Decimal::ZERO {
                    self.event_sender
                        .send_or_log(Event::WalletCredited {
                            customer_id,
                            amount: refund.round_dp(2),
                        })
                        .await;
                }
                Ok(updated)
            }
        }
    }
}

fn fulfilment_rank(status: OrderStatus) -> u8 {
    match status {
        OrderStatus::Pending => 0,
        OrderStatus::Processed => 1,
        OrderStatus::Shipped => 2,
        OrderStatus::Delivered => 3,
        OrderStatus::Cancelled => 4,
    }
}
