use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::offer::{DiscountType, OfferKind};
use crate::entities::{category, offer, product, wishlist_item};
use crate::errors::ServiceError;
use crate::services::pricing;

/// Catalog product together with the price after the best eligible offer.
#[derive(Debug, Clone, Serialize)]
pub struct PricedProduct {
    #[serde(flatten)]
    pub product: product::Model,
    pub effective_price: Decimal,
}

/// Product detail page payload: the product plus others from its category.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: PricedProduct,
    pub related: Vec<PricedProduct>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    Popularity,
    Newest,
}

/// Typed listing filter; every field is optional and unset fields do not
/// constrain the result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<ProductSort>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOfferRequest {
    pub name: String,
    pub offer_kind: OfferKind,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount_value: Option<Decimal>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists active products in active categories matching the filter, each
    /// with its effective price. Offers are loaded in one batch rather than
    /// per product.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ProductQuery,
    ) -> Result<Vec<PricedProduct>, ServiceError> {
        let mut select = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .join(JoinType::InnerJoin, product::Relation::Category.def())
            .filter(category::Column::IsActive.eq(true));

        if let Some(category_id) = query.category_id {
            select = select.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(min) = query.min_price {
            select = select.filter(product::Column::Price.gte(min));
        }
        if let Some(max) = query.max_price {
            select = select.filter(product::Column::Price.lte(max));
        }

        select = match query.sort.unwrap_or(ProductSort::Newest) {
            ProductSort::PriceAsc => select.order_by_asc(product::Column::Price),
            ProductSort::PriceDesc => select.order_by_desc(product::Column::Price),
            ProductSort::Popularity => select.order_by_desc(product::Column::Popularity),
            ProductSort::Newest => select.order_by_desc(product::Column::CreatedAt),
        };

        let products = select.all(&*self.db).await?;
        self.with_effective_prices(products).await
    }

    /// Product detail plus up to five related products from the same
    /// category.
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        let category_id = product.category_id;

        let mut priced = self.with_effective_prices(vec![product]).await?;
        let product = priced.remove(0);

        let neighbours = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::CategoryId.eq(category_id))
            .filter(product::Column::Id.ne(product_id))
            .order_by_desc(product::Column::Popularity)
            .limit(5)
            .all(&*self.db)
            .await?;
        let related = self.with_effective_prices(neighbours).await?;

        Ok(ProductDetail { product, related })
    }

    /// Case-insensitive prefix search on the product name.
    #[instrument(skip(self))]
    pub async fn search_products(&self, prefix: &str) -> Result<Vec<PricedProduct>, ServiceError> {
        let pattern = format!("{}%", prefix.to_lowercase());
        let products = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(
                Expr::expr(Func::lower(Expr::col((
                    product::Entity,
                    product::Column::Name,
                ))))
                .like(pattern),
            )
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await?;
        self.with_effective_prices(products).await
    }

    #[instrument(skip(self))]
    pub async fn get_stock(&self, product_id: Uuid) -> Result<(i32, bool), ServiceError> {
        let product = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        Ok((product.stock, product.is_out_of_stock))
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(category::Entity::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<category::Model, ServiceError> {
        let duplicate = category::Entity::find()
            .filter(category::Column::Name.eq(name.as_str()))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category {} already exists",
                name
            )));
        }

        let now = Utc::now();
        let category = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(description),
            offer_id: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(category.insert(&*self.db).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        if request.price <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Product price must be positive".to_string(),
            ));
        }
        if request.stock < 0 {
            return Err(ServiceError::InvalidInput(
                "Stock cannot be negative".to_string(),
            ));
        }
        category::Entity::find_by_id(request.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category {} not found", request.category_id))
            })?;

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            description: Set(request.description),
            price: Set(request.price),
            stock: Set(request.stock),
            popularity: Set(0),
            is_active: Set(true),
            is_out_of_stock: Set(request.stock == 0),
            category_id: Set(request.category_id),
            offer_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(product.insert(&*self.db).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn create_offer(
        &self,
        request: CreateOfferRequest,
    ) -> Result<offer::Model, ServiceError> {
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

        let now = Utc::now();
        let offer = offer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            offer_kind: Set(request.offer_kind),
            discount_type: Set(request.discount_type),
            discount_value: Set(request.discount_value),
            max_discount_value: Set(request.max_discount_value),
            valid_from: Set(request.valid_from),
            valid_until: Set(request.valid_until),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(offer.insert(&*self.db).await?)
    }

    /// Replaces whatever offer the product currently carries.
    #[instrument(skip(self))]
    pub async fn attach_offer_to_product(
        &self,
        product_id: Uuid,
        offer_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        offer::Entity::find_by_id(offer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Offer {} not found", offer_id)))?;
        let product = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let mut active: product::ActiveModel = product.into();
        active.offer_id = Set(Some(offer_id));
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn attach_offer_to_category(
        &self,
        category_id: Uuid,
        offer_id: Uuid,
    ) -> Result<category::Model, ServiceError> {
        offer::Entity::find_by_id(offer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Offer {} not found", offer_id)))?;
        let category = category::Entity::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))?;

        let mut active: category::ActiveModel = category.into();
        active.offer_id = Set(Some(offer_id));
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn add_to_wishlist(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<wishlist_item::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let existing = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::CustomerId.eq(customer_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Product is already on the wishlist".to_string(),
            ));
        }

        let item = wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            product_id: Set(product_id),
            created_at: Set(Utc::now()),
        };
        Ok(item.insert(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn remove_from_wishlist(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::CustomerId.eq(customer_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_wishlist(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<PricedProduct>, ServiceError> {
        let items = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::CustomerId.eq(customer_id))
            .all(&*self.db)
            .await?;
        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let products = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(&*self.db)
            .await?;
        self.with_effective_prices(products).await
    }

    async fn with_effective_prices(
        &self,
        products: Vec<product::Model>,
    ) -> Result<Vec<PricedProduct>, ServiceError> {
        let category_ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();
        let categories: HashMap<Uuid, category::Model> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            category::Entity::find()
                .filter(category::Column::Id.is_in(category_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };

        let mut offer_ids: Vec<Uuid> = products.iter().filter_map(|p| p.offer_id).collect();
        offer_ids.extend(categories.values().filter_map(|c| c.offer_id));
        let offers: HashMap<Uuid, offer::Model> = if offer_ids.is_empty() {
            HashMap::new()
        } else {
            offer::Entity::find()
                .filter(offer::Column::Id.is_in(offer_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|o| (o.id, o))
                .collect()
        };

        let now = Utc::now();
        Ok(products
            .into_iter()
            .map(|product| {
                let product_offer = product.offer_id.and_then(|id| offers.get(&id));
                let category_offer = categories
                    .get(&product.category_id)
                    .and_then(|c| c.offer_id)
                    .and_then(|id| offers.get(&id));
                let effective_price = pricing::discounted_price(
                    product.price,
                    product_offer,
                    category_offer,
                    now,
                );
                PricedProduct {
                    product,
                    effective_price,
                }
            })
            .collect())
    }
}
