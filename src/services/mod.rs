pub mod accounts;
pub mod carts;
pub mod catalog;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod wallet;
