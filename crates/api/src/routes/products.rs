//! Product catalog endpoints. Reads are public; writes need an admin.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Money, PageRequest, ProductId};
use domain::{NewProduct, ProductChanges};
use serde::{Deserialize, Serialize};
use store::{Category, Product, ProductQuery, ProductSort, SortDirection, Store};

use super::parse_id;
use crate::AppState;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::response::{self, ApiResponse};

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsParams {
    pub category: Option<Category>,
    pub is_available: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TryFrom<ListProductsParams> for ProductQuery {
    type Error = ApiError;

    fn try_from(params: ListProductsParams) -> Result<Self, Self::Error> {
        let sort = match params.sort_by.as_deref() {
            None => ProductSort::default(),
            Some(key) => ProductSort::parse(key)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown sort field: {key}")))?,
        };
        let direction = match params.sort_order.as_deref() {
            None | Some("desc") => SortDirection::Desc,
            Some("asc") => SortDirection::Asc,
            Some(other) => {
                return Err(ApiError::BadRequest(format!(
                    "Sort order must be asc or desc, got {other}"
                )));
            }
        };
        Ok(ProductQuery {
            category: params.category,
            is_available: params.is_available,
            search: params.search.filter(|s| !s.trim().is_empty()),
            sort,
            direction,
            page: PageRequest::new(params.page, params.limit),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub category: Category,
    pub image: Option<String>,
    #[serde(default)]
    pub stock: i64,
    pub is_available: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<Category>,
    pub image: Option<String>,
    pub stock: Option<i64>,
    pub is_available: Option<bool>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: Category,
    pub image: String,
    pub stock: u32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            category: p.category,
            image: p.image,
            stock: p.stock,
            is_available: p.is_available,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

// -- Handlers --

/// GET /api/v1/products
#[tracing::instrument(skip(state, params))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<ListProductsParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, ApiError> {
    let Query(params) = params?;
    let products = state.catalog.list(params.try_into()?).await?;
    Ok(response::page(products.map(ProductResponse::from)))
}

/// GET /api/v1/products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    let product = state.catalog.get(parse_id(&id)?).await?;
    Ok(response::ok(product.into()))
}

/// POST /api/v1/products
#[tracing::instrument(skip(state, admin, payload), fields(admin = %admin.0.user_id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ApiError> {
    let Json(req) = payload?;
    let product = state
        .catalog
        .create(NewProduct {
            name: req.name,
            description: req.description,
            price: req.price,
            category: req.category,
            image: req.image,
            stock: req.stock,
            is_available: req.is_available,
        })
        .await?;
    Ok(response::created(product.into()))
}

/// PUT /api/v1/products/{id}
#[tracing::instrument(skip(state, admin, payload), fields(admin = %admin.0.user_id))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    let Json(req) = payload?;
    let product = state
        .catalog
        .update(
            parse_id(&id)?,
            ProductChanges {
                name: req.name,
                description: req.description,
                price: req.price,
                category: req.category,
                image: req.image,
                stock: req.stock,
                is_available: req.is_available,
            },
        )
        .await?;
    Ok(response::ok(product.into()))
}

/// DELETE /api/v1/products/{id}
#[tracing::instrument(skip(state, admin), fields(admin = %admin.0.user_id))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.catalog.delete(parse_id(&id)?).await?;
    Ok(response::message("Product deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ListProductsParams {
        ListProductsParams {
            category: None,
            is_available: None,
            search: None,
            sort_by: None,
            sort_order: None,
            page: None,
            limit: None,
        }
    }

    #[test]
    fn test_default_listing_is_newest_first() {
        let query = ProductQuery::try_from(params()).unwrap();
        assert_eq!(query.sort, ProductSort::CreatedAt);
        assert_eq!(query.direction, SortDirection::Desc);
        assert_eq!(query.page.limit(), 10);
    }

    #[test]
    fn test_sort_parameters() {
        let query = ProductQuery::try_from(ListProductsParams {
            sort_by: Some("price".into()),
            sort_order: Some("asc".into()),
            search: Some("   ".into()),
            ..params()
        })
        .unwrap();
        assert_eq!(query.sort, ProductSort::Price);
        assert_eq!(query.direction, SortDirection::Asc);
        assert!(query.search.is_none());

        assert!(
            ProductQuery::try_from(ListProductsParams {
                sort_by: Some("color".into()),
                ..params()
            })
            .is_err()
        );
        assert!(
            ProductQuery::try_from(ListProductsParams {
                sort_order: Some("sideways".into()),
                ..params()
            })
            .is_err()
        );
    }
}
