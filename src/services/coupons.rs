use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::entities::offer::DiscountType;
use crate::entities::{cart, coupon};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::carts::recalculate_cart_totals;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_cart_value: Option<Decimal>,
    pub max_discount_value: Option<Decimal>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i32>,
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CouponService {
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

    /// Applies a coupon code to the customer's cart. The discount is computed
    /// against the cart total (items plus shipping) and one coupon is allowed
    /// per cart.
    #[instrument(skip(self))]
    pub async fn apply_to_cart(
        &self,
        customer_id: Uuid,
        code: &str,
    ) -> Result<cart::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Cart for customer {} not found", customer_id))
            })?;

        if cart.applied_coupon.is_some() {
            return Err(ServiceError::Conflict(
                "A coupon is already applied to this cart".to_string(),
            ));
        }
        if cart.total <= Decimal::ZERO {
            return Err(ServiceError::InvalidOperation(
                "Cannot apply a coupon to an empty cart".to_string(),
            ));
        }

        let coupon = coupon::Entity::find()
            .filter(coupon::Column::Code.eq(code))
            .filter(coupon::Column::IsActive.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))?;

        let now = Utc::now();
        if !coupon.is_within_window(now) {
            return Err(ServiceError::InvalidOperation(
                "Coupon is not valid at this time".to_string(),
            ));
        }
        if coupon.usage_exhausted() {
            return Err(ServiceError::InvalidOperation(
                "Coupon usage limit reached".to_string(),
            ));
        }
        if let Some(min) = coupon.min_cart_value {
            if cart.total < min {
                return Err(ServiceError::InvalidOperation(format!(
                    "Cart total must be at least {} to use this coupon",
                    min
                )));
            }
        }

        let cart_id = cart.id;
        let mut active: cart::ActiveModel = cart.into();
        active.applied_coupon = Set(Some(coupon.code.clone()));
        active.update(&txn).await?;

        let cart = recalculate_cart_totals(&txn, cart_id, &self.config).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CouponApplied {
                cart_id,
                code: coupon.code,
            })
            .await;
        Ok(cart)
    }

    /// Clears the applied coupon from the cart. Re-applying the same code
    /// afterwards is allowed.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, customer_id: Uuid) -> Result<cart::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Cart for customer {} not found", customer_id))
            })?;

        if cart.applied_coupon.is_none() {
            return Err(ServiceError::InvalidOperation(
                "No coupon is applied to this cart".to_string(),
            ));
        }

        let cart_id = cart.id;
        let mut active: cart::ActiveModel = cart.into();
        active.applied_coupon = Set(None);
        active.update(&txn).await?;

        let cart = recalculate_cart_totals(&txn, cart_id, &self.config).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CouponRemoved { cart_id })
            .await;
        Ok(cart)
    }

    #[instrument(skip(self, request))]
    pub async fn create_coupon(
        &self,
        request: CreateCouponRequest,
    ) -> Result<coupon::Model, ServiceError> {
        request.validate()?;
        if request.discount_value <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Discount value must be positive".to_string(),
            ));
        }
        if request.valid_until <= request.valid_from {
            return Err(ServiceError::InvalidInput(
                "Validity window must end after it starts".to_string(),
            ));
        }

        let duplicate = coupon::Entity::find()
            .filter(coupon::Column::Code.eq(request.code.as_str()))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon {} already exists",
                request.code
            )));
        }

        let now = Utc::now();
        let coupon = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(request.code),
            discount_type: Set(request.discount_type),
            discount_value: Set(request.discount_value),
            min_cart_value: Set(request.min_cart_value),
            max_discount_value: Set(request.max_discount_value),
            valid_from: Set(request.valid_from),
            valid_until: Set(request.valid_until),
            usage_limit: Set(request.usage_limit),
            usage_count: Set(0),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(coupon.insert(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, code: &str, is_active: bool) -> Result<coupon::Model, ServiceError> {
        let coupon = coupon::Entity::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))?;

        let mut active: coupon::ActiveModel = coupon.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn list_coupons(&self) -> Result<Vec<coupon::Model>, ServiceError> {
        Ok(coupon::Entity::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}
