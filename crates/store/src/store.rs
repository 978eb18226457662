use async_trait::async_trait;
use common::{BranchId, Email, OrderId, Page, ProductId, UserId};

use crate::{
    Branch, BranchQuery, DateRange, Order, OrderQuery, PasswordReset, Product, ProductQuery,
    Result, Session, User,
};

/// Accounts and login sessions.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user.
    ///
    /// Fails with `Conflict` if another user already has the same email.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>>;

    /// Replaces a stored user. Fails with `NotFound` if it does not exist.
    async fn update_user(&self, user: &User) -> Result<()>;

    async fn insert_session(&self, session: &Session) -> Result<()>;

    /// Looks up a session by token hash. Expired sessions are still returned;
    /// callers decide what expiry means.
    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>>;

    /// Deletes one session. Returns whether it existed.
    async fn delete_session(&self, token_hash: &str) -> Result<bool>;

    /// Deletes every session of a user. Returns how many were removed.
    async fn delete_user_sessions(&self, user_id: UserId) -> Result<u64>;

    /// Stores a reset token for its user, replacing any earlier one.
    async fn upsert_password_reset(&self, reset: &PasswordReset) -> Result<()>;

    /// Looks up a reset by token hash, expired or not.
    async fn find_password_reset(&self, token_hash: &str) -> Result<Option<PasswordReset>>;

    /// Deletes the reset of a user. Returns whether there was one.
    async fn delete_password_reset(&self, user_id: UserId) -> Result<bool>;
}

/// The product catalog and its stock levels.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>>;

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Fetches several products at once. Missing ids are skipped, so callers
    /// compare lengths to detect them.
    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    async fn insert_product(&self, product: &Product) -> Result<()>;

    async fn update_product(&self, product: &Product) -> Result<()>;

    async fn delete_product(&self, id: ProductId) -> Result<()>;

    /// Atomically decrements stock by `quantity`.
    ///
    /// Fails with `Conflict` when fewer than `quantity` units remain and with
    /// `NotFound` when the product does not exist. Returns the remaining stock.
    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<u32>;
}

/// Shop branches.
#[async_trait]
pub trait BranchStore: Send + Sync {
    async fn list_branches(&self, query: &BranchQuery) -> Result<Page<Branch>>;

    async fn find_branch(&self, id: BranchId) -> Result<Option<Branch>>;

    /// All branches currently accepting orders.
    async fn active_branches(&self) -> Result<Vec<Branch>>;

    async fn insert_branch(&self, branch: &Branch) -> Result<()>;

    async fn update_branch(&self, branch: &Branch) -> Result<()>;

    async fn delete_branch(&self, id: BranchId) -> Result<()>;
}

/// Orders and their payment state.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an order. Fails with `Conflict` on a duplicate order number.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>>;

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>>;

    async fn update_order(&self, order: &Order) -> Result<()>;

    /// Orders whose payment succeeded, created within `range`.
    async fn successful_orders(&self, range: DateRange) -> Result<Vec<Order>>;
}

/// A complete storage backend.
pub trait Store:
    UserStore + ProductStore + BranchStore + OrderStore + Clone + Send + Sync + 'static
{
}

impl<T> Store for T where
    T: UserStore + ProductStore + BranchStore + OrderStore + Clone + Send + Sync + 'static
{
}
