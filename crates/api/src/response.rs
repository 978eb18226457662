//! Success envelope shared by every `/api/v1` handler.

use axum::Json;
use axum::http::StatusCode;
use common::{Page, PageInfo};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
}

/// `200 OK` with `data`.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        message: None,
        pagination: None,
    })
}

/// `201 Created` with `data`.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}

/// `200 OK` with a page of `data` and its pagination block.
pub fn page<T: Serialize>(page: Page<T>) -> Json<ApiResponse<Vec<T>>> {
    Json(ApiResponse {
        success: true,
        data: Some(page.data),
        message: None,
        pagination: Some(page.pagination),
    })
}

/// `200 OK` with only a message.
pub fn message(message: &'static str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        data: None,
        message: Some(message),
        pagination: None,
    })
}
