//! Item endpoints.
//!
//! `POST /api/todos` is where clients submit newly created items; every
//! accepted item is appended to the repository and pushed to observers.

use crate::repository::TodoRepository;
use axum::{Json, body, extract::Request};
use http::StatusCode;
use std::sync::Arc;
use todos_core::TodoItem;
use todos_web::{AppError, WebResult};
use tracing::info;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// `GET /api/todos`: every item in creation order
pub async fn list(repository: Arc<TodoRepository>) -> Json<Vec<TodoItem>> {
    Json(repository.list().await)
}

/// `POST /api/todos`: store a submitted item
///
/// # Errors
///
/// - 400 if the body is unreadable or not a JSON item
/// - 422 if the title is blank
pub async fn create(
    repository: Arc<TodoRepository>,
    request: Request,
) -> WebResult<(StatusCode, Json<TodoItem>)> {
    let bytes = body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::bad_request(format!("Unreadable request body: {e}")))?;

    let item: TodoItem = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::bad_request(format!("Invalid todo item: {e}")))?;

    if item.title.trim().is_empty() {
        return Err(AppError::validation("Title must not be empty"));
    }

    let item = repository.create(item).await;
    metrics::counter!("todos.created.total").increment(1);
    info!(title = %item.title, completed = item.completed, "Todo item accepted");
    Ok((StatusCode::CREATED, Json(item)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{body::Body, response::IntoResponse};

    fn post(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/api/todos")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_an_item() {
        let repository = Arc::new(TodoRepository::default());

        let (status, Json(item)) = create(
            Arc::clone(&repository),
            post(r#"{"title":"call mom","completed":false}"#),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item, TodoItem::new("call mom"));
        assert_eq!(list(repository).await.0, vec![TodoItem::new("call mom")]);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let repository = Arc::new(TodoRepository::default());
        let err = create(Arc::clone(&repository), post("{not json")).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(repository.is_empty().await);
    }

    #[tokio::test]
    async fn blank_title_is_unprocessable() {
        let repository = Arc::new(TodoRepository::default());
        let err = create(repository, post(r#"{"title":"  ","completed":false}"#))
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
