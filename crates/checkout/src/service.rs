//! The order placement pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{AccountId, CustomerId, Identity, Money, OrderId, ProductId};
use datastore::{
    CatalogStore, CustomerStore, NewOrder, NewOrderLine, OrderRecord, OrderStatus, OrderStore,
    StoreError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CheckoutError, Result};
use crate::notifier::{NotificationSender, OrderNotice};

/// Cart submission from an authenticated customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub shipping_address: Option<String>,
    pub order_details: Vec<CartItem>,
}

/// One cart line: what and how many.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Wire view of a committed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    pub total_cents: i64,
    pub status: String,
    pub shipping_address: Option<String>,
    pub customer_id: CustomerId,
    pub customer_name: Option<String>,
    pub order_details: Vec<OrderLineView>,
}

/// Wire view of one order line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    pub id: i64,
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl OrderView {
    fn from_record(order: OrderRecord, customer_name: Option<String>) -> Self {
        Self {
            id: order.id,
            order_date: order.order_date,
            total_cents: order.total.cents(),
            status: order.status.to_string(),
            shipping_address: order.shipping_address,
            customer_id: order.customer_id,
            customer_name,
            order_details: order
                .lines
                .into_iter()
                .map(|line| OrderLineView {
                    id: line.id,
                    product_id: line.product_id,
                    product_name: line.product_name,
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    line_total_cents: line.line_total.cents(),
                })
                .collect(),
        }
    }
}

/// Turns cart submissions into committed orders.
pub struct CheckoutService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
}

impl<S, N> CheckoutService<S, N>
where
    S: CatalogStore + CustomerStore + OrderStore,
    N: NotificationSender,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self { store, notifier }
    }

    /// Places an order for the authenticated account.
    ///
    /// Prices are captured from the catalog at placement time; the
    /// submitted cart carries only product ids and quantities. The
    /// stock decrement and the order insert commit atomically, so a
    /// conflicting concurrent order leaves the catalog untouched. The
    /// announcement to the notification service is best-effort: a
    /// failed delivery is logged and the order still stands.
    #[tracing::instrument(skip(self, request), fields(account_id = %account_id))]
    pub async fn place_order(
        &self,
        account_id: AccountId,
        request: PlaceOrderRequest,
    ) -> Result<OrderView> {
        let customer = self
            .store
            .customer_by_account(account_id)
            .await?
            .ok_or(CheckoutError::NoCustomerProfile { account_id })?;

        if request.order_details.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(request.order_details.len());
        for item in &request.order_details {
            if item.quantity == 0 {
                return Err(CheckoutError::InvalidQuantity {
                    product_id: item.product_id,
                });
            }
            let product = self
                .store
                .get_product(item.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound {
                    product_id: item.product_id,
                })?;
            if product.stock < i64::from(item.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    requested: item.quantity,
                    available: product.stock,
                });
            }
            lines.push(NewOrderLine {
                product_id: product.id,
                quantity: item.quantity,
                unit_price: product.price,
            });
        }

        let total: Money = lines.iter().map(NewOrderLine::line_total).sum();
        let new_order = NewOrder {
            customer_id: customer.id,
            // An omitted shipping address means "ship to the profile
            // address".
            shipping_address: request
                .shipping_address
                .clone()
                .or_else(|| customer.address.clone()),
            total,
            lines,
        };

        // The pre-check above races with concurrent checkouts; the
        // store's conditional decrement is the source of truth.
        let order = match self.store.create_order(new_order).await {
            Ok(order) => order,
            Err(StoreError::StockConflict { product_id }) => {
                let available = self
                    .store
                    .get_product(product_id)
                    .await?
                    .map(|p| p.stock)
                    .unwrap_or(0);
                let requested = request
                    .order_details
                    .iter()
                    .find(|item| item.product_id == product_id)
                    .map(|item| item.quantity)
                    .unwrap_or(0);
                return Err(CheckoutError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                });
            }
            Err(err) => return Err(err.into()),
        };

        info!(order_id = %order.id, total = %order.total, "order placed");
        metrics::counter!("checkout_orders_placed_total").increment(1);

        let notice = OrderNotice {
            kind: "NewOrder".to_string(),
            title: "New Order Received".to_string(),
            message: format!(
                "Order #{} placed by {} for {}",
                order.id,
                customer.display_name(),
                order.total
            ),
            order_id: order.id,
            customer_id: customer.id,
            customer_email: customer.email.clone(),
        };
        if let Err(err) = self.notifier.deliver(notice).await {
            warn!(order_id = %order.id, error = %err, "order announcement failed");
            metrics::counter!("checkout_announcements_failed_total").increment(1);
        }

        Ok(OrderView::from_record(
            order,
            Some(customer.display_name()),
        ))
    }

    /// Fetches one order, scoped to the caller.
    ///
    /// A customer only sees their own orders; someone else's order id
    /// reads as not found.
    pub async fn get_order(&self, identity: &Identity, order_id: OrderId) -> Result<OrderView> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound { order_id })?;
        if !identity.is_admin() {
            let customer = self
                .store
                .customer_by_account(identity.account_id)
                .await?
                .ok_or(CheckoutError::NoCustomerProfile {
                    account_id: identity.account_id,
                })?;
            if order.customer_id != customer.id {
                return Err(CheckoutError::OrderNotFound { order_id });
            }
        }
        let name = self.customer_name(order.customer_id).await?;
        Ok(OrderView::from_record(order, name))
    }

    /// Lists orders: all of them for admins, own orders for customers.
    pub async fn list_orders(&self, identity: &Identity) -> Result<Vec<OrderView>> {
        let orders = if identity.is_admin() {
            self.store.list_orders().await?
        } else {
            let customer = self
                .store
                .customer_by_account(identity.account_id)
                .await?
                .ok_or(CheckoutError::NoCustomerProfile {
                    account_id: identity.account_id,
                })?;
            self.store.orders_for_customer(customer.id).await?
        };

        let mut names: HashMap<CustomerId, Option<String>> = HashMap::new();
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let name = match names.get(&order.customer_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self.customer_name(order.customer_id).await?;
                    names.insert(order.customer_id, name.clone());
                    name
                }
            };
            views.push(OrderView::from_record(order, name));
        }
        Ok(views)
    }

    /// Moves an order to a new status. Admin-only at the API edge.
    pub async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<OrderView> {
        let order = self
            .store
            .update_status(order_id, status)
            .await?
            .ok_or(CheckoutError::OrderNotFound { order_id })?;
        let name = self.customer_name(order.customer_id).await?;
        Ok(OrderView::from_record(order, name))
    }

    /// Removes an order. Admin-only at the API edge.
    pub async fn delete_order(&self, order_id: OrderId) -> Result<()> {
        if self.store.delete_order(order_id).await? {
            Ok(())
        } else {
            Err(CheckoutError::OrderNotFound { order_id })
        }
    }

    async fn customer_name(&self, customer_id: CustomerId) -> Result<Option<String>> {
        Ok(self
            .store
            .customer_by_id(customer_id)
            .await?
            .map(|c| c.display_name()))
    }
}
