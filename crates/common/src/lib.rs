//! Shared types for the storefront services.
//!
//! Both deployed services (orders-api and notify-api) exchange the same
//! identifiers over HTTP and the database, so the newtypes live here
//! rather than in either service crate.

pub mod identity;
pub mod ids;
pub mod money;

pub use identity::{Identity, Role};
pub use ids::{AccountId, ConnectionId, CustomerId, NotificationId, OrderId, ProductId};
pub use money::Money;
