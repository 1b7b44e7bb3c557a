//! Database entities for the storefront.

pub mod address;
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod coupon;
pub mod customer;
pub mod offer;
pub mod order;
pub mod order_item;
pub mod product;
pub mod wallet_transaction;
pub mod wishlist_item;

// Re-export entities
pub use address::{Entity as Address, Model as AddressModel};
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use coupon::{Entity as Coupon, Model as CouponModel};
pub use customer::{Entity as Customer, Model as CustomerModel};
pub use offer::{DiscountType, Entity as Offer, Model as OfferModel, OfferKind};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, PaymentMethod};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use wallet_transaction::{
    Entity as WalletTransaction, Model as WalletTransactionModel, WalletTransactionType,
};
pub use wishlist_item::{Entity as WishlistItem, Model as WishlistItemModel};
