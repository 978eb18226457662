use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BranchId, Email, GeoPoint, Money, OrderId, Page, ProductId, UserId};
use sqlx::{
    PgPool, Postgres, Row,
    postgres::{PgArguments, PgRow},
    query::Query,
};
use uuid::Uuid;

use crate::{
    Branch, BranchQuery, DateRange, OpeningHours, Order, OrderLine, OrderQuery, PaymentDetails,
    PasswordReset, Product, ProductQuery, Result, Session, SortDirection, StoreError, User,
    Weekday,
    query::like_pattern,
    store::{BranchStore, OrderStore, ProductStore, UserStore},
};

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, role, avatar, is_active, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, description, price, category, image, stock, is_available, created_at, updated_at";
const BRANCH_COLUMNS: &str = "id, name, address, phone, latitude, longitude, formatted_address, is_active, operating_hours, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, order_number, user_id, branch_id, branch_name, items, total_amount, status, payment_method, payment_status, payment_details, created_at, updated_at";

/// A bind value for dynamically built filters.
enum Param {
    Text(String),
    Bool(bool),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Param],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Param::Text(v) => query.bind(v.as_str()),
            Param::Bool(v) => query.bind(*v),
            Param::Uuid(v) => query.bind(*v),
            Param::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

/// Accumulates `AND` conditions with numbered placeholders.
#[derive(Default)]
struct Filter {
    sql: String,
    params: Vec<Param>,
}

impl Filter {
    /// Appends a condition. Every `{}` in `clause` is replaced by the
    /// placeholder of `param`.
    fn push(&mut self, clause: &str, param: Param) {
        self.params.push(param);
        let placeholder = format!("${}", self.params.len());
        self.sql.push_str(" AND ");
        self.sql.push_str(&clause.replace("{}", &placeholder));
    }

    fn next_placeholder(&self) -> usize {
        self.params.len() + 1
    }
}

/// Maps a unique-constraint violation to `Conflict`.
fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(message());
    }
    StoreError::Database(err)
}

fn stock_to_db(stock: u32) -> Result<i32> {
    i32::try_from(stock).map_err(|_| StoreError::Decode(format!("stock out of range: {stock}")))
}

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and returns a store over a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
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

    fn row_to_user(row: PgRow) -> Result<User> {
        let email: String = row.try_get("email")?;
        let role: String = row.try_get("role")?;
        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: Email::parse(&email).map_err(|e| StoreError::Decode(e.to_string()))?,
            phone: row.try_get("phone")?,
            password_hash: row.try_get("password_hash")?,
            role: role.parse()?,
            avatar: row.try_get("avatar")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_session(row: PgRow) -> Result<Session> {
        Ok(Session {
            token_hash: row.try_get("token_hash")?,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_password_reset(row: PgRow) -> Result<PasswordReset> {
        Ok(PasswordReset {
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            token_hash: row.try_get("token_hash")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let category: String = row.try_get("category")?;
        let stock: i32 = row.try_get("stock")?;
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_amount(row.try_get("price")?),
            category: category.parse()?,
            image: row.try_get("image")?,
            stock: u32::try_from(stock)
                .map_err(|_| StoreError::Decode(format!("negative stock: {stock}")))?,
            is_available: row.try_get("is_available")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_branch(row: PgRow) -> Result<Branch> {
        let hours: serde_json::Value = row.try_get("operating_hours")?;
        let operating_hours: BTreeMap<Weekday, OpeningHours> = serde_json::from_value(hours)?;
        Ok(Branch {
            id: BranchId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            phone: row.try_get("phone")?,
            location: GeoPoint::new(row.try_get("latitude")?, row.try_get("longitude")?),
            formatted_address: row.try_get("formatted_address")?,
            is_active: row.try_get("is_active")?,
            operating_hours,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let items: serde_json::Value = row.try_get("items")?;
        let details: serde_json::Value = row.try_get("payment_details")?;
        let status: String = row.try_get("status")?;
        let payment_method: String = row.try_get("payment_method")?;
        let payment_status: String = row.try_get("payment_status")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: row.try_get("order_number")?,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            branch_id: BranchId::from_uuid(row.try_get::<Uuid, _>("branch_id")?),
            branch_name: row.try_get("branch_name")?,
            items: serde_json::from_value::<Vec<OrderLine>>(items)?,
            total_amount: Money::from_amount(row.try_get("total_amount")?),
            status: status.parse()?,
            payment_method: payment_method.parse()?,
            payment_status: payment_status.parse()?,
            payment_details: serde_json::from_value::<PaymentDetails>(details)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Runs a filtered, paginated `SELECT` plus the matching `COUNT(*)`.
    async fn fetch_page<T>(
        &self,
        table: &str,
        columns: &str,
        filter: Filter,
        order_by: &str,
        page: common::PageRequest,
        map: fn(PgRow) -> Result<T>,
    ) -> Result<Page<T>> {
        let count_sql = format!("SELECT COUNT(*) AS total FROM {table} WHERE 1=1{}", filter.sql);
        let total: i64 = bind_params(sqlx::query(&count_sql), &filter.params)
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let limit_param = filter.next_placeholder();
        let select_sql = format!(
            "SELECT {columns} FROM {table} WHERE 1=1{} ORDER BY {order_by} LIMIT ${} OFFSET ${}",
            filter.sql,
            limit_param,
            limit_param + 1
        );
        let rows = bind_params(sqlx::query(&select_sql), &filter.params)
            .bind(i64::from(page.limit()))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let data = rows.into_iter().map(map).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(data, page, total.max(0) as u64))
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, password_hash, role, avatar, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.avatar)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("email already registered: {}", user.email)))?;

        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_user).transpose()
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_user).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, phone = $4, password_hash = $5, role = $6,
                avatar = $7, is_active = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.avatar)
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("email already registered: {}", user.email)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("User", user.id));
        }
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token_hash)
        .bind(session.user_id.as_uuid())
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT token_hash, user_id, expires_at, created_at FROM sessions WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_session).transpose()
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn upsert_password_reset(&self, reset: &PasswordReset) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(reset.user_id.as_uuid())
        .bind(&reset.token_hash)
        .bind(reset.expires_at)
        .bind(reset.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || "reset token already issued".to_string()))?;

        Ok(())
    }

    async fn find_password_reset(&self, token_hash: &str) -> Result<Option<PasswordReset>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, token_hash, expires_at, created_at
            FROM password_resets
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_password_reset).transpose()
    }

    async fn delete_password_reset(&self, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM password_resets WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let mut filter = Filter::default();
        if let Some(category) = query.category {
            filter.push("category = {}", Param::Text(category.as_str().to_string()));
        }
        if let Some(available) = query.is_available {
            filter.push("is_available = {}", Param::Bool(available));
        }
        if let Some(ref term) = query.search {
            filter.push(
                "(name ILIKE {} OR description ILIKE {})",
                Param::Text(like_pattern(term)),
            );
        }

        let direction = match query.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let order_by = format!("{} {direction}, id {direction}", query.sort.sql_key());

        self.fetch_page(
            "products",
            PRODUCT_COLUMNS,
            filter,
            &order_by,
            query.page,
            Self::row_to_product,
        )
        .await
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_product).transpose()
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category, image, stock, is_available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.category.as_str())
        .bind(&product.image)
        .bind(stock_to_db(product.stock)?)
        .bind(product.is_available)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("product already exists: {}", product.id)))?;

        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, category = $5, image = $6,
                stock = $7, is_available = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.category.as_str())
        .bind(&product.image)
        .bind(stock_to_db(product.stock)?)
        .bind(product.is_available)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", product.id));
        }
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }
        Ok(())
    }

    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<u32> {
        let quantity_db = stock_to_db(quantity)?;
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING stock
            "#,
        )
        .bind(id.as_uuid())
        .bind(quantity_db)
        .fetch_optional(&self.pool)
        .await?;

        match remaining {
            Some(stock) => Ok(u32::try_from(stock).unwrap_or(0)),
            None => {
                // Distinguish a missing product from an insufficient one.
                let current: Option<i32> =
                    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
                        .bind(id.as_uuid())
                        .fetch_optional(&self.pool)
                        .await?;
                match current {
                    Some(stock) => Err(StoreError::Conflict(format!(
                        "insufficient stock for product {id}: {stock} left, {quantity} requested"
                    ))),
                    None => Err(StoreError::not_found("Product", id)),
                }
            }
        }
    }
}

#[async_trait]
impl BranchStore for PostgresStore {
    async fn list_branches(&self, query: &BranchQuery) -> Result<Page<Branch>> {
        let mut filter = Filter::default();
        if let Some(active) = query.is_active {
            filter.push("is_active = {}", Param::Bool(active));
        }
        if let Some(ref term) = query.search {
            filter.push(
                "(name ILIKE {} OR address ILIKE {})",
                Param::Text(like_pattern(term)),
            );
        }

        self.fetch_page(
            "branches",
            BRANCH_COLUMNS,
            filter,
            "created_at DESC, id DESC",
            query.page,
            Self::row_to_branch,
        )
        .await
    }

    async fn find_branch(&self, id: BranchId) -> Result<Option<Branch>> {
        let row = sqlx::query(&format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_branch).transpose()
    }

    async fn active_branches(&self) -> Result<Vec<Branch>> {
        let rows = sqlx::query(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE is_active = TRUE"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_branch).collect()
    }

    async fn insert_branch(&self, branch: &Branch) -> Result<()> {
        let hours = serde_json::to_value(&branch.operating_hours)?;
        sqlx::query(
            r#"
            INSERT INTO branches (id, name, address, phone, latitude, longitude, formatted_address, is_active, operating_hours, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(branch.id.as_uuid())
        .bind(&branch.name)
        .bind(&branch.address)
        .bind(&branch.phone)
        .bind(branch.location.lat)
        .bind(branch.location.lng)
        .bind(&branch.formatted_address)
        .bind(branch.is_active)
        .bind(hours)
        .bind(branch.created_at)
        .bind(branch.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("branch already exists: {}", branch.id)))?;

        Ok(())
    }

    async fn update_branch(&self, branch: &Branch) -> Result<()> {
        let hours = serde_json::to_value(&branch.operating_hours)?;
        let result = sqlx::query(
            r#"
            UPDATE branches
            SET name = $2, address = $3, phone = $4, latitude = $5, longitude = $6,
                formatted_address = $7, is_active = $8, operating_hours = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(branch.id.as_uuid())
        .bind(&branch.name)
        .bind(&branch.address)
        .bind(&branch.phone)
        .bind(branch.location.lat)
        .bind(branch.location.lng)
        .bind(&branch.formatted_address)
        .bind(branch.is_active)
        .bind(hours)
        .bind(branch.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Branch", branch.id));
        }
        Ok(())
    }

    async fn delete_branch(&self, id: BranchId) -> Result<()> {
        let result = sqlx::query("DELETE FROM branches WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Branch", id));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let items = serde_json::to_value(&order.items)?;
        let details = serde_json::to_value(&order.payment_details)?;
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, user_id, branch_id, branch_name, items, total_amount,
                                status, payment_method, payment_status, payment_details, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.user_id.as_uuid())
        .bind(order.branch_id.as_uuid())
        .bind(&order.branch_name)
        .bind(items)
        .bind(order.total_amount.amount())
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(details)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(e, || format!("duplicate order number: {}", order.order_number))
        })?;

        Ok(())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let mut filter = Filter::default();
        if let Some(user_id) = query.user_id {
            filter.push("user_id = {}", Param::Uuid(user_id.as_uuid()));
        }
        if let Some(branch_id) = query.branch_id {
            filter.push("branch_id = {}", Param::Uuid(branch_id.as_uuid()));
        }
        if let Some(status) = query.status {
            filter.push("status = {}", Param::Text(status.as_str().to_string()));
        }
        if let Some(payment_status) = query.payment_status {
            filter.push(
                "payment_status = {}",
                Param::Text(payment_status.as_str().to_string()),
            );
        }
        push_range(&mut filter, query.created);

        self.fetch_page(
            "orders",
            ORDER_COLUMNS,
            filter,
            "created_at DESC, id DESC",
            query.page,
            Self::row_to_order,
        )
        .await
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let items = serde_json::to_value(&order.items)?;
        let details = serde_json::to_value(&order.payment_details)?;
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET branch_name = $2, items = $3, total_amount = $4, status = $5,
                payment_method = $6, payment_status = $7, payment_details = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.branch_name)
        .bind(items)
        .bind(order.total_amount.amount())
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(details)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order", order.id));
        }
        Ok(())
    }

    async fn successful_orders(&self, range: DateRange) -> Result<Vec<Order>> {
        let mut filter = Filter::default();
        filter.push("payment_status = {}", Param::Text("SUCCESS".to_string()));
        push_range(&mut filter, range);

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1{} ORDER BY created_at ASC",
            filter.sql
        );
        let rows = bind_params(sqlx::query(&sql), &filter.params)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }
}

fn push_range(filter: &mut Filter, range: DateRange) {
    if let Some(from) = range.from {
        filter.push("created_at >= {}", Param::Timestamp(from));
    }
    if let Some(to) = range.to {
        filter.push("created_at <= {}", Param::Timestamp(to));
    }
}
