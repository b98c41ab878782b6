//! Checkout error types.

use common::{AccountId, OrderId, ProductId};
use datastore::StoreError;
use thiserror::Error;

/// Errors surfaced by the checkout pipeline.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid quantity for product {product_id}")]
    InvalidQuantity { product_id: ProductId },

    #[error("no customer profile for account {account_id}")]
    NoCustomerProfile { account_id: AccountId },

    #[error("product {product_id} not found")]
    ProductNotFound { product_id: ProductId },

    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    #[error("order {order_id} not found")]
    OrderNotFound { order_id: OrderId },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
