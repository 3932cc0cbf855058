use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::models::Post as DBPost;

/// Success envelope: `{ "success": true, "data": ..., "pagination"?: ... }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    respond(StatusCode::OK, data)
}

pub fn created<T: Serialize>(data: T) -> Response {
    respond(StatusCode::CREATED, data)
}

pub fn respond<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        Json(Envelope {
            success: true,
            data,
            pagination: None,
        }),
    )
        .into_response()
}

pub fn paginated<T: Serialize>(data: T, pagination: Pagination) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            data,
            pagination: Some(pagination),
        }),
    )
        .into_response()
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// Capped so that `offset` stays within an `i64` for any limit.
    pub fn page(&self) -> i64 {
        self.page
            .unwrap_or(1)
            .clamp(1, i64::MAX / crate::MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(crate::DEFAULT_PAGE_SIZE)
            .clamp(1, crate::MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn with_total(&self, total: i64) -> Pagination {
        let limit = self.limit();
        Pagination {
            page: self.page(),
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Post with the display names of its category and author.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(flatten)]
    pub post: DBPost,
    pub category_name: String,
    pub author_name: String,
}

impl Post {
    pub fn new_from(post: DBPost, category_name: String, author_name: String) -> Self {
        Post {
            post,
            category_name,
            author_name,
        }
    }
}
