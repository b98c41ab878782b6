//! Durable storage for the storefront services.
//!
//! Two implementations share the trait surface in [`store`]: a
//! PostgreSQL store used in production and an in-memory store with the
//! same semantics for tests. The stock decrement and the order commit
//! are a single atomic unit in both.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use records::{
    CustomerRecord, NewCustomer, NewNotification, NewOrder, NewOrderLine, NewProduct,
    NotificationRecord, OrderLineRecord, OrderRecord, OrderStatus, ProductRecord,
};
pub use store::{CatalogStore, CustomerStore, NotificationStore, OrderStore};
