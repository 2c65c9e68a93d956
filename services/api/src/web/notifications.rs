//! services/api/src/web/notifications.rs
//!
//! Notification reads for any authenticated principal. Rows are scoped to
//! the receiver; the only mutation is marking a row read.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use goodhands_core::domain::Notification;

#[derive(Deserialize, ToSchema)]
pub struct NotificationParams {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct NotificationView {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationView {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            title: n.title,
            content: n.content,
            data: n.data,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

/// GET /api/notifications - The caller's own notifications, newest first.
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(
        ("unread_only" = Option<bool>, Query, description = "Only unread rows"),
        ("limit" = Option<i64>, Query, description = "Max rows, default 50"),
    ),
    responses(
        (status = 200, description = "Notification list", body = [NotificationView]),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<NotificationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let rows = state
        .store
        .notifications_for_user(auth.0.id, params.unread_only, limit)
        .await?;
    Ok(Json(
        rows.into_iter()
            .map(NotificationView::from)
            .collect::<Vec<_>>(),
    ))
}

/// PUT /api/notifications/{id}/read - Mark one of the caller's rows read.
#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    params(("id" = i64, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Marked read"),
        (status = 404, description = "Unknown notification or not the receiver"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(notification_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .mark_notification_read(notification_id, auth.0.id)
        .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
