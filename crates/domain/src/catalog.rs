//! Product catalog.

use chrono::Utc;
use common::{Money, Page, ProductId};
use store::{Category, Product, ProductQuery, Store};
use tracing::info;

use crate::error::{DomainError, Result};
use crate::validation::Validator;

/// Input for [`CatalogService::create`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub category: Category,
    /// Hosted image URL. Required.
    pub image: Option<String>,
    pub stock: i64,
    pub is_available: Option<bool>,
}

/// Partial product update.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<Category>,
    pub image: Option<String>,
    pub stock: Option<i64>,
    pub is_available: Option<bool>,
}

fn check_name(v: &mut Validator, name: &str) {
    v.length("Product name", name, 2, 200);
}

fn check_description(v: &mut Validator, description: &str) {
    v.length("Description", description, 10, 1000);
}

/// Highest accepted unit price, in rupiah.
pub const MAX_PRICE: i64 = 1_000_000_000;

fn check_price(v: &mut Validator, price: i64) {
    v.check(price > 0, "Price must be greater than 0");
    v.check(
        price <= MAX_PRICE,
        format!("Price must not exceed {MAX_PRICE}"),
    );
}

fn check_stock(v: &mut Validator, stock: i64) {
    v.check(
        (0..=i64::from(i32::MAX)).contains(&stock),
        "Stock must be a non-negative integer",
    );
}

fn stock_units(stock: i64) -> Result<u32> {
    u32::try_from(stock).map_err(|_| DomainError::Validation("Stock must be a non-negative integer".into()))
}

/// Catalog management.
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: ProductQuery) -> Result<Page<Product>> {
        Ok(self.store.list_products(&query).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Product> {
        self.store
            .find_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewProduct) -> Result<Product> {
        let mut v = Validator::new();
        check_name(&mut v, &input.name);
        check_description(&mut v, &input.description);
        check_price(&mut v, input.price);
        check_stock(&mut v, input.stock);
        match input.image.as_deref().map(str::trim) {
            Some(image) if !image.is_empty() => {
                v.url("Product image", image);
            }
            _ => {
                v.check(false, "Product image is required");
            }
        }
        v.finish()?;

        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            price: Money::from_amount(input.price),
            category: input.category,
            image: input.image.unwrap_or_default().trim().to_string(),
            stock: stock_units(input.stock)?,
            is_available: input.is_available.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_product(&product).await?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    #[tracing::instrument(skip(self, changes))]
    pub async fn update(&self, id: ProductId, changes: ProductChanges) -> Result<Product> {
        let mut v = Validator::new();
        if let Some(ref name) = changes.name {
            check_name(&mut v, name);
        }
        if let Some(ref description) = changes.description {
            check_description(&mut v, description);
        }
        if let Some(price) = changes.price {
            check_price(&mut v, price);
        }
        if let Some(stock) = changes.stock {
            check_stock(&mut v, stock);
        }
        if let Some(ref image) = changes.image {
            v.url("Product image", image);
        }
        v.finish()?;

        let mut product = self.get(id).await?;
        if let Some(name) = changes.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            product.description = description.trim().to_string();
        }
        if let Some(price) = changes.price {
            product.price = Money::from_amount(price);
        }
        if let Some(category) = changes.category {
            product.category = category;
        }
        if let Some(image) = changes.image {
            product.image = image.trim().to_string();
        }
        if let Some(stock) = changes.stock {
            product.stock = stock_units(stock)?;
        }
        if let Some(available) = changes.is_available {
            product.is_available = available;
        }
        product.updated_at = Utc::now();

        self.store.update_product(&product).await?;
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        self.store.delete_product(id).await?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}
