use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::wallet_transaction::WalletTransactionType;
use crate::entities::{customer, wallet_transaction};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Adds to the customer's wallet and records a ledger entry. Runs on any
/// connection so callers can fold it into a larger transaction. Amounts are
/// rounded to two decimal places before they touch the balance.
pub async fn credit_wallet<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    amount: Decimal,
    description: &str,
) -> Result<Decimal, ServiceError> {
    let amount = amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(
            "Credit amount must be positive".to_string(),
        ));
    }

    let customer = customer::Entity::find_by_id(customer_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

    let new_balance = (customer.wallet_balance + amount).round_dp(2);
    let mut active: customer::ActiveModel = customer.into();
    active.wallet_balance = Set(new_balance);
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;

    record_transaction(conn, customer_id, WalletTransactionType::Credit, amount, description)
        .await?;
    Ok(new_balance)
}

/// Takes from the customer's wallet and records a ledger entry. Fails with a
/// payment error when the balance does not cover the amount.
pub async fn debit_wallet<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    amount: Decimal,
    description: &str,
) -> Result<Decimal, ServiceError> {
    let amount = amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(
            "Debit amount must be positive".to_string(),
        ));
    }

    let customer = customer::Entity::find_by_id(customer_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

    if customer.wallet_balance < amount {
        return Err(ServiceError::PaymentFailed(format!(
            "Insufficient wallet balance: {} available, {} required",
            customer.wallet_balance, amount
        )));
    }

    let new_balance = (customer.wallet_balance - amount).round_dp(2);
    let mut active: customer::ActiveModel = customer.into();
    active.wallet_balance = Set(new_balance);
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;

    record_transaction(conn, customer_id, WalletTransactionType::Debit, amount, description)
        .await?;
    Ok(new_balance)
}

async fn record_transaction<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    transaction_type: WalletTransactionType,
    amount: Decimal,
    description: &str,
) -> Result<wallet_transaction::Model, ServiceError> {
    let entry = wallet_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        transaction_type: Set(transaction_type),
        amount: Set(amount),
        description: Set(description.to_string()),
        created_at: Set(Utc::now()),
    };
    Ok(entry.insert(conn).await?)
}

#[derive(Clone)]
pub struct WalletService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl WalletService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn balance(&self, customer_id: Uuid) -> Result<Decimal, ServiceError> {
        let customer = customer::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;
        Ok(customer.wallet_balance)
    }

    /// Ledger entries for the customer, newest first.
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<wallet_transaction::Model>, ServiceError> {
        Ok(wallet_transaction::Entity::find()
            .filter(wallet_transaction::Column::CustomerId.eq(customer_id))
            .order_by_desc(wallet_transaction::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Manual top-up, used by support tooling.
    #[instrument(skip(self))]
    pub async fn top_up(
        &self,
        customer_id: Uuid,
        amount: Decimal,
    ) -> Result<Decimal, ServiceError> {
        let txn = self.db.begin().await?;
        let balance = credit_wallet(&txn, customer_id, amount, "Wallet top-up").await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::WalletCredited {
                customer_id,
                amount: amount.round_dp(2),
            })
            .await;
        Ok(balance)
    }
}
