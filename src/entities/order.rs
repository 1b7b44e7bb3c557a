use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable order snapshot taken from a cart at placement time.
///
/// Orders are never deleted. After placement only three things may change:
/// payment confirmation (sets `payment_method`, moves status to Processed),
/// admin status transitions, and cancellation. `is_cancelled` is a separate
/// request flag used when a Shipped/Delivered order asks for cancellation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    // Shipping snapshot
    pub ship_name: String,
    pub ship_mobile: String,
    pub ship_alternate_mobile: Option<String>,
    pub ship_location: String,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_landmark: Option<String>,
    pub ship_zip: String,
    // Totals copied verbatim from the cart
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub shipping_charge: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discount_applied: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub final_total: Decimal,
    #[sea_orm(nullable)]
    pub applied_coupon: Option<String>,
    /// Null until a payment method is confirmed.
    #[sea_orm(nullable)]
    pub payment_method: Option<PaymentMethod>,
    pub status: OrderStatus,
    pub is_cancelled: bool,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processed")]
    Processed,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery; only eligible below a configured order ceiling.
    #[sea_orm(string_value = "cod")]
    Cod,
    /// Stored-value wallet balance.
    #[sea_orm(string_value = "wallet")]
    Wallet,
    /// External payment gateway.
    #[sea_orm(string_value = "gateway")]
    Gateway,
}
