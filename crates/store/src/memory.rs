use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{BranchId, Email, OrderId, Page, ProductId, UserId};
use tokio::sync::RwLock;

use crate::{
    Branch, BranchQuery, DateRange, Order, OrderQuery, PaymentStatus, Product, ProductQuery,
    PasswordReset, ProductSort, Result, Session, SortDirection, StoreError, User,
    query::contains_ci,
    store::{BranchStore, OrderStore, ProductStore, UserStore},
};

/// In-memory store implementation.
///
/// Used by the test suites and when the server runs without a database.
/// Enforces the same uniqueness and stock constraints as the PostgreSQL schema.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    password_resets: Arc<RwLock<HashMap<UserId, PasswordReset>>>,
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    branches: Arc<RwLock<HashMap<BranchId, Branch>>>,
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all data.
    pub async fn clear(&self) {
        self.users.write().await.clear();
        self.sessions.write().await.clear();
        self.password_resets.write().await.clear();
        self.products.write().await.clear();
        self.branches.write().await.clear();
        self.orders.write().await.clear();
    }
}

fn compare_products(a: &Product, b: &Product, sort: ProductSort) -> Ordering {
    let ord = match sort {
        ProductSort::CreatedAt => a.created_at.cmp(&b.created_at),
        ProductSort::Price => a.price.cmp(&b.price),
        ProductSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        ProductSort::Stock => a.stock.cmp(&b.stock),
    };
    ord.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| &u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("User", user.id)),
        }
    }

    async fn insert_session(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(token_hash).is_some())
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn upsert_password_reset(&self, reset: &PasswordReset) -> Result<()> {
        let mut resets = self.password_resets.write().await;
        if resets
            .values()
            .any(|r| r.user_id != reset.user_id && r.token_hash == reset.token_hash)
        {
            return Err(StoreError::Conflict("reset token already issued".into()));
        }
        resets.insert(reset.user_id, reset.clone());
        Ok(())
    }

    async fn find_password_reset(&self, token_hash: &str) -> Result<Option<PasswordReset>> {
        let resets = self.password_resets.read().await;
        Ok(resets.values().find(|r| r.token_hash == token_hash).cloned())
    }

    async fn delete_password_reset(&self, user_id: UserId) -> Result<bool> {
        Ok(self.password_resets.write().await.remove(&user_id).is_some())
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let products = self.products.read().await;
        let mut matching: Vec<_> = products
            .values()
            .filter(|p| {
                if let Some(category) = query.category
                    && p.category != category
                {
                    return false;
                }
                if let Some(available) = query.is_available
                    && p.is_available != available
                {
                    return false;
                }
                if let Some(ref term) = query.search
                    && !contains_ci(&p.name, term)
                    && !contains_ci(&p.description, term)
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ord = compare_products(a, b, query.sort);
            match query.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        Ok(Page::from_sorted(matching, query.page))
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!(
                "product already exists: {}",
                product.id
            )));
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        match self.products.write().await.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("Product", product.id)),
        }
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        match self.products.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found("Product", id)),
        }
    }

    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<u32> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Product", id))?;

        if product.stock < quantity {
            return Err(StoreError::Conflict(format!(
                "insufficient stock for product {id}: {} left, {quantity} requested",
                product.stock
            )));
        }
        product.stock -= quantity;
        product.updated_at = chrono::Utc::now();
        Ok(product.stock)
    }
}

#[async_trait]
impl BranchStore for InMemoryStore {
    async fn list_branches(&self, query: &BranchQuery) -> Result<Page<Branch>> {
        let branches = self.branches.read().await;
        let mut matching: Vec<_> = branches
            .values()
            .filter(|b| {
                if let Some(active) = query.is_active
                    && b.is_active != active
                {
                    return false;
                }
                if let Some(ref term) = query.search
                    && !contains_ci(&b.name, term)
                    && !contains_ci(&b.address, term)
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(Page::from_sorted(matching, query.page))
    }

    async fn find_branch(&self, id: BranchId) -> Result<Option<Branch>> {
        Ok(self.branches.read().await.get(&id).cloned())
    }

    async fn active_branches(&self) -> Result<Vec<Branch>> {
        let branches = self.branches.read().await;
        Ok(branches.values().filter(|b| b.is_active).cloned().collect())
    }

    async fn insert_branch(&self, branch: &Branch) -> Result<()> {
        let mut branches = self.branches.write().await;
        if branches.contains_key(&branch.id) {
            return Err(StoreError::Conflict(format!(
                "branch already exists: {}",
                branch.id
            )));
        }
        branches.insert(branch.id, branch.clone());
        Ok(())
    }

    async fn update_branch(&self, branch: &Branch) -> Result<()> {
        match self.branches.write().await.get_mut(&branch.id) {
            Some(existing) => {
                *existing = branch.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("Branch", branch.id)),
        }
    }

    async fn delete_branch(&self, id: BranchId) -> Result<()> {
        match self.branches.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found("Branch", id)),
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        if order.items.is_empty() {
            return Err(StoreError::Conflict("order must contain at least one item".into()));
        }
        let mut orders = self.orders.write().await;
        if orders
            .values()
            .any(|o| o.id == order.id || o.order_number == order.order_number)
        {
            return Err(StoreError::Conflict(format!(
                "duplicate order number: {}",
                order.order_number
            )));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.order_number == order_number)
            .cloned())
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<_> = orders
            .values()
            .filter(|o| {
                if let Some(user_id) = query.user_id
                    && o.user_id != user_id
                {
                    return false;
                }
                if let Some(branch_id) = query.branch_id
                    && o.branch_id != branch_id
                {
                    return false;
                }
                if let Some(status) = query.status
                    && o.status != status
                {
                    return false;
                }
                if let Some(payment_status) = query.payment_status
                    && o.payment_status != payment_status
                {
                    return false;
                }
                query.created.contains(o.created_at)
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(Page::from_sorted(matching, query.page))
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        match self.orders.write().await.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("Order", order.id)),
        }
    }

    async fn successful_orders(&self, range: DateRange) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<_> = orders
            .values()
            .filter(|o| o.payment_status == PaymentStatus::Success && range.contains(o.created_at))
            .cloned()
            .collect();
        matching.sort_by_key(|o| o.created_at);
        Ok(matching)
    }
}
