use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{address, customer};
use crate::errors::ServiceError;
use crate::services::orders::ShippingDetails;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    pub mobile: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddAddressRequest {
    #[validate(length(min = 1))]
    pub location: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    pub landmark: Option<String>,
    #[validate(length(min = 1))]
    pub zip: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
}

impl AccountService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request))]
    pub async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;

        let duplicate = customer::Entity::find()
            .filter(customer::Column::Email.eq(request.email.as_str()))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Customer with email {} already exists",
                request.email
            )));
        }

        let now = Utc::now();
        let customer = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(request.email),
            first_name: Set(request.first_name),
            last_name: Set(request.last_name),
            mobile: Set(request.mobile),
            wallet_balance: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(customer.insert(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, customer_id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
    }

    /// Adds an address for the customer. The first address becomes the
    /// default automatically; marking a later one default clears the flag on
    /// the others.
    #[instrument(skip(self, request))]
    pub async fn add_address(
        &self,
        customer_id: Uuid,
        request: AddAddressRequest,
    ) -> Result<address::Model, ServiceError> {
        request.validate()?;
        self.get_customer(customer_id).await?;

        let txn = self.db.begin().await?;

        let existing = address::Entity::find()
            .filter(address::Column::CustomerId.eq(customer_id))
            .all(&txn)
            .await?;
        let make_default = request.is_default || existing.is_empty();

        if make_default {
            for other in existing.into_iter().filter(|a| a.is_default) {
                let mut active: address::ActiveModel = other.into();
                active.is_default = Set(false);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;
            }
        }

        let now = Utc::now();
        let created = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            location: Set(request.location),
            city: Set(request.city),
            state: Set(request.state),
            landmark: Set(request.landmark),
            zip: Set(request.zip),
            is_default: Set(make_default),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(created)
    }

    /// Rewrites an address in place. Promoting it to default demotes the
    /// others, same as on create.
    #[instrument(skip(self, request))]
    pub async fn update_address(
        &self,
        customer_id: Uuid,
        address_id: Uuid,
        request: AddAddressRequest,
    ) -> Result<address::Model, ServiceError> {
        request.validate()?;

        let txn = self.db.begin().await?;

        let found = address::Entity::find_by_id(address_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Address {} not found", address_id)))?;
        if found.customer_id != customer_id {
            return Err(ServiceError::Unauthorized(
                "Address belongs to a different customer".to_string(),
            ));
        }

        if request.is_default && !found.is_default {
            let defaults = address::Entity::find()
                .filter(address::Column::CustomerId.eq(customer_id))
                .filter(address::Column::IsDefault.eq(true))
                .all(&txn)
                .await?;
            for other in defaults {
                let mut active: address::ActiveModel = other.into();
                active.is_default = Set(false);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;
            }
        }

        let keep_default = found.is_default || request.is_default;
        let mut active: address::ActiveModel = found.into();
        active.location = Set(request.location);
        active.city = Set(request.city);
        active.state = Set(request.state);
        active.landmark = Set(request.landmark);
        active.zip = Set(request.zip);
        active.is_default = Set(keep_default);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn list_addresses(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<address::Model>, ServiceError> {
        Ok(address::Entity::find()
            .filter(address::Column::CustomerId.eq(customer_id))
            .order_by_desc(address::Column::IsDefault)
            .order_by_desc(address::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn remove_address(
        &self,
        customer_id: Uuid,
        address_id: Uuid,
    ) -> Result<(), ServiceError> {
        let found = address::Entity::find_by_id(address_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Address {} not found", address_id)))?;
        if found.customer_id != customer_id {
            return Err(ServiceError::Unauthorized(
                "Address belongs to a different customer".to_string(),
            ));
        }
        address::Entity::delete_by_id(address_id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Builds the shipping block for an order from a saved address, falling
    /// back to the customer's default address when none is named.
    #[instrument(skip(self))]
    pub async fn shipping_details_for(
        &self,
        customer_id: Uuid,
        address_id: Option<Uuid>,
    ) -> Result<ShippingDetails, ServiceError> {
        let customer = self.get_customer(customer_id).await?;

        let address = match address_id {
            Some(id) => {
                let found = address::Entity::find_by_id(id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Address {} not found", id)))?;
                if found.customer_id != customer_id {
                    return Err(ServiceError::Unauthorized(
                        "Address belongs to a different customer".to_string(),
                    ));
                }
                found
            }
            None => address::Entity::find()
                .filter(address::Column::CustomerId.eq(customer_id))
                .filter(address::Column::IsDefault.eq(true))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvalidOperation(
                        "Customer has no default shipping address".to_string(),
                    )
                })?,
        };

        let mobile = customer.mobile.clone().ok_or_else(|| {
            ServiceError::InvalidOperation(
                "Customer has no mobile number on file".to_string(),
            )
        })?;

        Ok(ShippingDetails {
            name: customer.full_name(),
            mobile,
            alternate_mobile: None,
            location: address.location,
            city: address.city,
            state: address.state,
            landmark: address.landmark,
            zip: address.zip,
        })
    }
}
