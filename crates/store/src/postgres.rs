use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use common::{CategoryId, Money, OrderId, OrderStatus, ProductId, RoleId, RoleName, UserId};
use sqlx::{
    PgConnection, PgPool, Postgres, Row, Transaction, error::ErrorKind, postgres::PgPoolOptions,
    postgres::PgRow,
};

use crate::{
    Category, LineRequest, NewCategory, NewOrder, NewProduct, NewUser, Order, OrderFilter,
    OrderLine, OrderPatch, Product, ProductPatch, Result, Role, StoreError, User, UserPatch,
    reconcile::{Reconciliation, reconcile, requested_product_ids},
    store::{CatalogStore, OrderRepository, UserStore},
};

const ORDER_COLUMNS: &str = "id, client_id, date_placed, status, total_amount_cents";
const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, stock, category_id";
const USER_COLUMNS: &str =
    "id, last_name, first_name, email, address, phone, password_hash, role_id, created_at";

/// PostgreSQL-backed store implementation.
///
/// Each multi-statement operation runs in its own transaction; an early
/// return or error drops the transaction, which rolls it back.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `url` with at most `max_connections` connections.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Starts a read-only transaction whose statements all see one snapshot.
    ///
    /// Reads that combine order headers with their lines use it so a
    /// concurrent line replacement never shows up half applied.
    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

/// Maps constraint violations on writes to [`StoreError::Conflict`].
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && matches!(
            db_err.kind(),
            ErrorKind::UniqueViolation | ErrorKind::ForeignKeyViolation
        )
    {
        let message = match db_err.constraint() {
            Some("unique_user_email") => "email is already registered".to_string(),
            Some("orders_client_id_fkey") => "client does not exist or still has orders".to_string(),
            Some("products_category_id_fkey") => "category does not exist".to_string(),
            Some("users_role_id_fkey") => "role does not exist".to_string(),
            Some(constraint) => format!("constraint {constraint} violated"),
            None => db_err.message().to_string(),
        };
        return StoreError::Conflict(message);
    }
    StoreError::Database(e)
}

fn row_to_category(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id")?),
        name: row.try_get("name")?,
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: row.try_get("stock")?,
        category_id: row
            .try_get::<Option<i64>, _>("category_id")?
            .map(CategoryId::new),
    })
}

/// Maps an order row. Lines are loaded separately.
fn row_to_order(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status: OrderStatus = status
        .parse()
        .map_err(|e: common::ParseEnumError| StoreError::InvalidData(e.to_string()))?;

    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        client_id: UserId::new(row.try_get("client_id")?),
        date_placed: row.try_get("date_placed")?,
        status,
        total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
        lines: Vec::new(),
    })
}

fn row_to_line(row: &PgRow) -> Result<OrderLine> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(OrderLine {
        order_id: OrderId::new(row.try_get("order_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::InvalidData(format!("negative quantity {quantity}")))?,
    })
}

fn row_to_role(row: &PgRow) -> Result<Role> {
    let name: String = row.try_get("name")?;
    Ok(Role {
        id: RoleId::new(row.try_get("id")?),
        name: name
            .parse()
            .map_err(|e: common::ParseEnumError| StoreError::InvalidData(e.to_string()))?,
    })
}

fn row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        last_name: row.try_get("last_name")?,
        first_name: row.try_get("first_name")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        password_hash: row.try_get("password_hash")?,
        role_id: row.try_get::<Option<i64>, _>("role_id")?.map(RoleId::new),
        created_at: row.try_get("created_at")?,
    })
}

/// Loads the lines of several orders, grouped by order.
async fn load_lines(
    conn: &mut PgConnection,
    order_ids: &[OrderId],
) -> Result<HashMap<OrderId, Vec<OrderLine>>> {
    let mut grouped: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let raw: Vec<i64> = order_ids.iter().map(OrderId::as_i64).collect();
    let rows = sqlx::query(
        r#"
        SELECT order_id, product_id, quantity
        FROM order_lines
        WHERE order_id = ANY($1)
        ORDER BY order_id ASC, product_id ASC
        "#,
    )
    .bind(raw)
    .fetch_all(&mut *conn)
    .await?;

    for row in &rows {
        let line = row_to_line(row)?;
        grouped.entry(line.order_id).or_default().push(line);
    }
    Ok(grouped)
}

async fn load_order(conn: &mut PgConnection, id: OrderId) -> Result<Option<Order>> {
    let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut order = row_to_order(&row)?;
    order.lines = load_lines(&mut *conn, &[id]).await?.remove(&id).unwrap_or_default();
    Ok(Some(order))
}

/// Current prices of the given products, read on the caller's connection.
async fn fetch_prices(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<HashMap<ProductId, Money>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let raw: Vec<i64> = ids.iter().map(ProductId::as_i64).collect();
    let rows = sqlx::query("SELECT id, price_cents FROM products WHERE id = ANY($1)")
        .bind(raw)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| -> Result<(ProductId, Money)> {
            Ok((
                ProductId::new(row.try_get("id")?),
                Money::from_cents(row.try_get("price_cents")?),
            ))
        })
        .collect()
}

/// Replaces the lines of `order_id` and stores the recomputed total.
///
/// Must run inside the caller's transaction.
async fn replace_lines(
    conn: &mut PgConnection,
    order_id: OrderId,
    requested: &[LineRequest],
) -> Result<Reconciliation> {
    sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
        .bind(order_id.as_i64())
        .execute(&mut *conn)
        .await?;

    let prices = fetch_prices(&mut *conn, &requested_product_ids(requested)).await?;
    let reconciled = reconcile(order_id, requested, &prices)?;

    for line in &reconciled.lines {
        let quantity = i32::try_from(line.quantity)
            .map_err(|_| StoreError::InvalidData(format!("quantity {} too large", line.quantity)))?;
        sqlx::query("INSERT INTO order_lines (order_id, product_id, quantity) VALUES ($1, $2, $3)")
            .bind(order_id.as_i64())
            .bind(line.product_id.as_i64())
            .bind(quantity)
            .execute(&mut *conn)
            .await
            .map_err(map_write_error)?;
    }

    sqlx::query("UPDATE orders SET total_amount_cents = $2 WHERE id = $1")
        .bind(order_id.as_i64())
        .bind(reconciled.total.cents())
        .execute(&mut *conn)
        .await?;

    Ok(reconciled)
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn create_category(&self, category: NewCategory) -> Result<Category> {
        let row = sqlx::query("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
            .bind(&category.name)
            .fetch_one(&self.pool)
            .await?;
        row_to_category(&row)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_category).collect()
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_category).transpose()
    }

    async fn rename_category(&self, id: CategoryId, name: String) -> Result<Option<Category>> {
        let row = sqlx::query("UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id.as_i64())
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_category).transpose()
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool> {
        // products.category_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (name, description, price_cents, stock, category_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock)
        .bind(product.category_id.map(|c| c.as_i64()))
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        row_to_product(&row)
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                price_cents = COALESCE($5, price_cents),
                stock = COALESCE($6, stock),
                category_id = COALESCE($7, category_id)
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(patch.name)
        .bind(patch.description.is_some())
        .bind(patch.description.flatten())
        .bind(patch.price.map(|p| p.cents()))
        .bind(patch.stock)
        .bind(patch.category_id.map(|c| c.as_i64()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn prices_for(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Money>> {
        let mut conn = self.pool.acquire().await?;
        fetch_prices(&mut conn, ids).await
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    #[tracing::instrument(skip(self, order), fields(client_id = %order.client_id))]
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO orders (client_id, date_placed, status, total_amount_cents)
            VALUES ($1, $2, $3, 0)
            RETURNING id
            "#,
        )
        .bind(order.client_id.as_i64())
        .bind(order.date_placed.unwrap_or_else(Utc::now))
        .bind(order.status.unwrap_or_default().as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;
        let id = OrderId::new(row.try_get("id")?);

        replace_lines(&mut tx, id, &order.lines).await?;

        let created = load_order(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::InvalidData(format!("order {id} vanished after insert")))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut tx = self.begin_snapshot().await?;
        let order = load_order(&mut tx, id).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;
        let bounds = filter.day_bounds();

        // Build dynamic query
        if filter.client_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND client_id = ${param_count}"));
        }
        if filter.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if let Some((_, end)) = bounds {
            param_count += 1;
            sql.push_str(&format!(" AND date_placed >= ${param_count}"));
            if end.is_some() {
                param_count += 1;
                sql.push_str(&format!(" AND date_placed < ${param_count}"));
            }
        }
        sql.push_str(" ORDER BY id ASC");

        let mut query = sqlx::query(&sql);
        if let Some(client_id) = filter.client_id {
            query = query.bind(client_id.as_i64());
        }
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some((start, end)) = bounds {
            query = query.bind(start);
            if let Some(end) = end {
                query = query.bind(end);
            }
        }

        let mut tx = self.begin_snapshot().await?;
        let rows = query.fetch_all(&mut *tx).await?;
        let mut orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut lines = load_lines(&mut tx, &ids).await?;
        tx.commit().await?;

        for order in &mut orders {
            order.lines = lines.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Option<Order>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        if patch.client_id.is_some() || patch.date_placed.is_some() || patch.status.is_some() {
            sqlx::query(
                r#"
                UPDATE orders SET
                    client_id = COALESCE($2, client_id),
                    date_placed = COALESCE($3, date_placed),
                    status = COALESCE($4, status)
                WHERE id = $1
                "#,
            )
            .bind(id.as_i64())
            .bind(patch.client_id.map(|c| c.as_i64()))
            .bind(patch.date_placed)
            .bind(patch.status.map(|s| s.as_str()))
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        }

        if let Some(lines) = &patch.lines {
            replace_lines(&mut tx, id, lines).await?;
        }

        let updated = load_order(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        // order_lines.order_id is ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn create_role(&self, name: RoleName) -> Result<Role> {
        let row = sqlx::query("INSERT INTO roles (name) VALUES ($1) RETURNING id, name")
            .bind(name.as_str())
            .fetch_one(&self.pool)
            .await?;
        row_to_role(&row)
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let rows = sqlx::query("SELECT id, name FROM roles ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_role).collect()
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_role).transpose()
    }

    async fn rename_role(&self, id: RoleId, name: RoleName) -> Result<Option<Role>> {
        let row = sqlx::query("UPDATE roles SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id.as_i64())
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_role).transpose()
    }

    async fn delete_role(&self, id: RoleId) -> Result<Option<Vec<UserId>>> {
        let mut tx = self.pool.begin().await?;

        let affected: Vec<i64> =
            sqlx::query_scalar("UPDATE users SET role_id = NULL WHERE role_id = $1 RETURNING id")
                .bind(id.as_i64())
                .fetch_all(&mut *tx)
                .await?;

        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        tx.commit().await?;
        let mut affected: Vec<UserId> = affected.into_iter().map(UserId::new).collect();
        affected.sort_unstable();
        Ok(Some(affected))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (last_name, first_name, email, address, phone, password_hash, role_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.last_name)
        .bind(&user.first_name)
        .bind(&user.email)
        .bind(&user.address)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role_id.map(|r| r.as_i64()))
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        row_to_user(&row)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET
                last_name = COALESCE($2, last_name),
                first_name = COALESCE($3, first_name),
                address = CASE WHEN $4 THEN $5 ELSE address END,
                phone = CASE WHEN $6 THEN $7 ELSE phone END,
                password_hash = COALESCE($8, password_hash),
                role_id = COALESCE($9, role_id)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(patch.last_name)
        .bind(patch.first_name)
        .bind(patch.address.is_some())
        .bind(patch.address.flatten())
        .bind(patch.phone.is_some())
        .bind(patch.phone.flatten())
        .bind(patch.password_hash)
        .bind(patch.role_id.map(|r| r.as_i64()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }
}
