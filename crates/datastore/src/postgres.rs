//! PostgreSQL-backed store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, CustomerId, NotificationId, OrderId, ProductId};
use common::Money;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{Result, StoreError};
use crate::records::{
    CustomerRecord, NewCustomer, NewNotification, NewOrder, NewProduct, NotificationRecord,
    OrderLineRecord, OrderRecord, OrderStatus, ProductRecord,
};
use crate::store::{CatalogStore, CustomerStore, NotificationStore, OrderStore};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<ProductRecord> {
        Ok(ProductRecord {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get("stock")?,
            category: row.try_get("category")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_customer(row: PgRow) -> Result<CustomerRecord> {
        Ok(CustomerRecord {
            id: CustomerId::new(row.try_get("id")?),
            account_id: AccountId::new(row.try_get("account_id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            address: row.try_get("address")?,
        })
    }

    fn row_to_notification(row: PgRow) -> Result<NotificationRecord> {
        Ok(NotificationRecord {
            id: NotificationId::new(row.try_get("id")?),
            kind: row.try_get("kind")?,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            order_id: row.try_get::<Option<i64>, _>("order_id")?.map(OrderId::new),
            customer_id: row
                .try_get::<Option<i64>, _>("customer_id")?
                .map(CustomerId::new),
            customer_email: row.try_get("customer_email")?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
            sent_at: row.try_get("sent_at")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLineRecord> {
        Ok(OrderLineRecord {
            id: row.try_get("id")?,
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: row.try_get::<i64, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            line_total: Money::from_cents(row.try_get("line_total_cents")?),
        })
    }

    async fn lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLineRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.product_id, p.name AS product_name,
                   l.quantity, l.unit_price_cents, l.line_total_cents
            FROM order_lines l
            LEFT JOIN products p ON p.id = l.product_id
            WHERE l.order_id = $1
            ORDER BY l.id ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn order_from_row(&self, row: PgRow) -> Result<OrderRecord> {
        let id = OrderId::new(row.try_get("id")?);
        let status: String = row.try_get("status")?;
        let lines = self.lines_for_order(id).await?;

        Ok(OrderRecord {
            id,
            customer_id: CustomerId::new(row.try_get("customer_id")?),
            order_date: row.try_get("order_date")?,
            total: Money::from_cents(row.try_get("total_cents")?),
            // Rows are only ever written from OrderStatus::as_str.
            status: OrderStatus::parse(&status).unwrap_or(OrderStatus::Pending),
            shipping_address: row.try_get("shipping_address")?,
            lines,
        })
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn insert_product(&self, product: NewProduct) -> Result<ProductRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, description, price_cents, stock, category)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, price_cents, stock, category, created_at
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock)
        .bind(&product.category)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(
            "SELECT id, name, description, price_cents, stock, category, created_at \
             FROM products WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<ProductRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, description, price_cents, stock, category, created_at \
             FROM products ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }
}

#[async_trait]
impl CustomerStore for PostgresStore {
    async fn insert_customer(&self, customer: NewCustomer) -> Result<CustomerRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO customers (account_id, first_name, last_name, email, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, account_id, first_name, last_name, email, address
            "#,
        )
        .bind(customer.account_id.as_i64())
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.address)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_customer(row)
    }

    async fn customer_by_account(&self, account_id: AccountId) -> Result<Option<CustomerRecord>> {
        let row = sqlx::query(
            "SELECT id, account_id, first_name, last_name, email, address \
             FROM customers WHERE account_id = $1",
        )
        .bind(account_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn customer_by_id(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        let row = sqlx::query(
            "SELECT id, account_id, first_name, last_name, email, address \
             FROM customers WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrements first. Zero affected rows means the
        // product was exhausted between the read check and now; dropping
        // the transaction rolls back every earlier decrement.
        for line in &order.lines {
            let result = sqlx::query(
                "UPDATE products SET stock = stock - $1 WHERE id = $2 AND stock >= $1",
            )
            .bind(i64::from(line.quantity))
            .bind(line.product_id.as_i64())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::StockConflict {
                    product_id: line.product_id,
                });
            }
        }

        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (customer_id, total_cents, status, shipping_address)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(order.customer_id.as_i64())
        .bind(order.total.cents())
        .bind(OrderStatus::Pending.as_str())
        .bind(&order.shipping_address)
        .fetch_one(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, quantity, unit_price_cents, line_total_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id.as_i64())
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.cents())
            .bind(line.line_total().cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_order(OrderId::new(order_id))
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            "SELECT id, customer_id, order_date, total_cents, status, shipping_address \
             FROM orders WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.order_from_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            "SELECT id, customer_id, order_date, total_cents, status, shipping_address \
             FROM orders ORDER BY order_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.order_from_row(row).await?);
        }
        Ok(orders)
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            "SELECT id, customer_id, order_date, total_cents, status, shipping_address \
             FROM orders WHERE customer_id = $1 ORDER BY order_date DESC, id DESC",
        )
        .bind(customer_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.order_from_row(row).await?);
        }
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_order(id).await
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO notifications (kind, title, message, order_id, customer_id, customer_email, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, kind, title, message, order_id, customer_id, customer_email,
                      is_read, created_at, sent_at
            "#,
        )
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.order_id.map(|id| id.as_i64()))
        .bind(notification.customer_id.map(|id| id.as_i64()))
        .bind(&notification.customer_email)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_notification(row)
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Option<NotificationRecord>> {
        let row = sqlx::query(
            "SELECT id, kind, title, message, order_id, customer_id, customer_email, \
             is_read, created_at, sent_at FROM notifications WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_notification).transpose()
    }

    async fn list_notifications(&self) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            "SELECT id, kind, title, message, order_id, customer_id, customer_email, \
             is_read, created_at, sent_at FROM notifications \
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn notifications_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            "SELECT id, kind, title, message, order_id, customer_id, customer_email, \
             is_read, created_at, sent_at FROM notifications \
             WHERE customer_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(customer_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn unread_notifications(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<NotificationRecord>> {
        let rows = match customer_id {
            Some(customer_id) => {
                sqlx::query(
                    "SELECT id, kind, title, message, order_id, customer_id, customer_email, \
                     is_read, created_at, sent_at FROM notifications \
                     WHERE is_read = FALSE AND customer_id = $1 \
                     ORDER BY created_at DESC, id DESC",
                )
                .bind(customer_id.as_i64())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, kind, title, message, order_id, customer_id, customer_email, \
                     is_read, created_at, sent_at FROM notifications \
                     WHERE is_read = FALSE ORDER BY created_at DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn unread_count(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE is_read = FALSE")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn mark_read(&self, id: NotificationId) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, customer_id: CustomerId) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE \
             WHERE customer_id = $1 AND is_read = FALSE",
        )
        .bind(customer_id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn mark_sent(&self, id: NotificationId, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET sent_at = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unsent_notifications(&self) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            "SELECT id, kind, title, message, order_id, customer_id, customer_email, \
             is_read, created_at, sent_at FROM notifications \
             WHERE sent_at IS NULL ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn delete_read_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE is_read = TRUE AND created_at < $1")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
