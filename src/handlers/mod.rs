pub mod accounts;
pub mod admin;
pub mod carts;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod products;

pub use accounts::accounts_routes;
pub use admin::admin_routes;
pub use carts::carts_routes;
pub use checkout::checkout_routes;
pub use orders::orders_routes;
pub use products::products_routes;
