use chrono::{DateTime, Utc};
use common::{BranchId, PageRequest, UserId};

use crate::models::{Category, OrderStatus, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Sortable product columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    CreatedAt,
    Price,
    Name,
    Stock,
}

impl ProductSort {
    /// Parses the API spelling of a sort key.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "createdAt" | "created_at" => Some(ProductSort::CreatedAt),
            "price" => Some(ProductSort::Price),
            "name" => Some(ProductSort::Name),
            "stock" => Some(ProductSort::Stock),
            _ => None,
        }
    }

    /// SQL sort key. Names compare case-insensitively, as in memory.
    pub(crate) fn sql_key(&self) -> &'static str {
        match self {
            ProductSort::CreatedAt => "created_at",
            ProductSort::Price => "price",
            ProductSort::Name => "LOWER(name)",
            ProductSort::Stock => "stock",
        }
    }
}

/// Filters for listing products.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category: Option<Category>,
    pub is_available: Option<bool>,
    /// Case-insensitive substring match on name or description.
    pub search: Option<String>,
    pub sort: ProductSort,
    pub direction: SortDirection,
    pub page: PageRequest,
}

/// Filters for listing branches. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct BranchQuery {
    pub is_active: Option<bool>,
    /// Case-insensitive substring match on name or address.
    pub search: Option<String>,
    pub page: PageRequest,
}

/// Inclusive creation-time window. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

/// Filters for listing orders. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub user_id: Option<UserId>,
    pub branch_id: Option<BranchId>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub created: DateRange,
    pub page: PageRequest,
}

impl OrderQuery {
    /// Creates a query scoped to one customer.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }
}

/// Case-insensitive containment used by the in-memory backend, mirroring
/// `ILIKE '%term%'`.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Escapes `%`, `_` and `\` so user input is matched literally by `ILIKE`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
