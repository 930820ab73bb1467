// src/db/order_repo.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use crate::{
    db::store::{LineRemoval, OrderStore, StoreError},
    models::order::{Order, OrderFilter, OrderLineItem, OrderRow, OrderStatus, StatusChange},
};

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn insert_order(&self, order: &Order) -> Result<Order, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (
                id, customer_number, customer_name, status, status_kitchen, add_user,
                subtotal, total, discount, line_items,
                is_paid, payment_method, paid_at, payer_ref, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(&order.customer_number)
        .bind(&order.customer_name)
        .bind(order.status)
        .bind(order.status_kitchen)
        .bind(order.add_user)
        .bind(order.subtotal)
        .bind(order.total)
        .bind(order.discount)
        .bind(Json(&order.line_items))
        .bind(order.payment.is_paid)
        .bind(order.payment.method.as_deref())
        .bind(order.payment.time)
        .bind(order.payment.payer_ref)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Order::from))
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT * FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
              AND ($2::kitchen_status IS NULL OR status_kitchen = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status)
        .bind(filter.status_kitchen)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn find_active_orders(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT * FROM orders
            WHERE status NOT IN ($1, $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(OrderStatus::Completed)
        .bind(OrderStatus::Cancelled)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn push_line_item(
        &self,
        id: Uuid,
        line: &OrderLineItem,
        amount: Decimal,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE orders
            SET line_items = line_items || jsonb_build_array($2::jsonb),
                subtotal = subtotal + $3,
                total = total + $3,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(line))
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Order::from))
    }

    async fn pull_line_item(
        &self,
        id: Uuid,
        menu_item_id: Uuid,
        amount: Decimal,
    ) -> Result<LineRemoval, StoreError> {
        // Lê e reescreve o pedido com a linha travada (FOR UPDATE) dentro da transação.
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(current) = current else {
            return Ok(LineRemoval::OrderMissing);
        };

        let mut lines = current.line_items.0;
        let Some(index) = lines.iter().position(|l| l.menu_item_id == menu_item_id) else {
            return Ok(LineRemoval::LineMissing);
        };
        lines.remove(index);

        // A condição no WHERE mantém o total >= 0 sem depender do CHECK
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE orders
            SET line_items = $2,
                subtotal = subtotal - $3,
                total = total - $3,
                updated_at = now()
            WHERE id = $1 AND total >= $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(&lines))
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(LineRemoval::WouldGoNegative);
        };

        tx.commit().await?;
        Ok(LineRemoval::Removed(row.into()))
    }

    async fn update_status(&self, id: Uuid, change: StatusChange) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE orders
            SET status = COALESCE($2, status),
                status_kitchen = COALESCE($3, status_kitchen),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(change.status)
        .bind(change.status_kitchen)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Order::from))
    }

    async fn delete_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>("DELETE FROM orders WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Order::from))
    }
}

