use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use tracing::instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::order::{self, OrderStatus, PaymentMethod};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::{GatewayOrderHandle, GatewayOrderRequest, PaymentGateway};
use crate::services::wallet::debit_wallet;

/// What the client needs to complete an externally hosted payment.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GatewayCheckout {
    pub order: order::Model,
    pub gateway: GatewayOrderHandle,
}

#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            gateway,
        }
    }

    /// Records a payment method on a pending order and moves it to
    /// processed. Cash on delivery is rejected above the configured ceiling.
    /// Wallet payments must go through the wallet flow instead, since they
    /// move money.
    #[instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
        method: PaymentMethod,
    ) -> Result<order::Model, ServiceError> {
        if method == PaymentMethod::Wallet {
            return Err(ServiceError::InvalidInput(
                "Wallet payments are processed through the wallet payment flow".to_string(),
            ));
        }

        let order = self.load_payable_order(order_id, customer_id).await?;

        if method == PaymentMethod::Cod && order.final_total > self.config.cod_limit {
            return Err(ServiceError::InvalidOperation(format!(
                "Cash on delivery is limited to orders of {} or less",
                self.config.cod_limit
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.payment_method = Set(Some(method));
        active.status = Set(OrderStatus::Processed);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PaymentConfirmed { order_id, method })
            .await;
        Ok(updated)
    }

    /// Pays for a pending order from the customer's wallet. The debit, the
    /// ledger entry and the order update commit together or not at all.
    #[instrument(skip(self))]
    pub async fn process_wallet_payment(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        Self::check_payable(&order, customer_id)?;

        let amount = order.final_total.round_dp(2);
        if amount > Decimal::ZERO {
            debit_wallet(
                &txn,
                customer_id,
                amount,
                &format!("Payment for order {}", order.order_number),
            )
            .await?;
        }

        let mut active: order::ActiveModel = order.into();
        active.payment_method = Set(Some(PaymentMethod::Wallet));
        active.status = Set(OrderStatus::Processed);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        if amount > Decimal::ZERO {
            self.event_sender
                .send_or_log(Event::WalletDebited {
                    customer_id,
                    amount,
                })
                .await;
        }
        self.event_sender
            .send_or_log(Event::PaymentConfirmed {
                order_id,
                method: PaymentMethod::Wallet,
            })
            .await;
        Ok(updated)
    }

    /// Registers the order with the external payment provider and returns the
    /// provider-side handle together with the local order. The order itself
    /// stays pending until the client completes the flow and payment is
    /// confirmed.
    #[instrument(skip(self))]
    pub async fn create_gateway_order(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
    ) -> Result<GatewayCheckout, ServiceError> {
        let order = self.load_payable_order(order_id, customer_id).await?;

        let amount_minor = (order.final_total.round_dp(2) * Decimal::from(100))
            .to_i64()
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Order amount {} not representable in minor units",
                    order.final_total
                ))
            })?;

        let handle = self
            .gateway
            .create_order(GatewayOrderRequest {
                amount_minor,
                currency: "INR".to_string(),
                receipt: order.order_number.clone(),
            })
            .await?;

        Ok(GatewayCheckout {
            order,
            gateway: handle,
        })
    }

    async fn load_payable_order(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        Self::check_payable(&order, customer_id)?;
        Ok(order)
    }

    fn check_payable(order: &order::Model, customer_id: Uuid) -> Result<(), ServiceError> {
        if order.customer_id != customer_id {
            return Err(ServiceError::Unauthorized(
                "Order belongs to a different customer".to_string(),
            ));
        }
        if order.payment_method.is_some() {
            return Err(ServiceError::Conflict(
                "Order has already been paid".to_string(),
            ));
        }
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Order in status {} cannot accept payment",
                order.status
            )));
        }
        Ok(())
    }
}
