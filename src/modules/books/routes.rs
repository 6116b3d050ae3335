//! HTTP handlers for `/books`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use shelf_http::error::AppError;

use super::models::{Book, BookPatch, NewBook};
use super::service::{BookError, BookService};

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::InvalidIdentifier(_) => AppError::bad_request("Invalid ID format"),
            BookError::NotFound(_) => AppError::not_found("Book not found"),
            BookError::Store(source) => AppError::Internal(source),
            other @ BookError::CreationVerificationFailed(_) => {
                AppError::Internal(anyhow::Error::new(other))
            }
        }
    }
}

fn malformed_body(rejection: JsonRejection) -> AppError {
    AppError::bad_request_with(
        vec![serde_json::json!({ "reason": rejection.body_text() })],
        "Malformed request body",
    )
}

pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(service)
}

const CREATE_FAILED: &str = "Book could not be created";

/// Every failure on create is reported as a bad request.
async fn create_book(
    State(service): State<BookService>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(book) = payload.map_err(malformed_body)?;

    match service.create(book).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(created))),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "book creation failed");
            Err(AppError::bad_request(CREATE_FAILED))
        }
    }
}

async fn list_books(State(service): State<BookService>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(service.list_all().await?))
}

async fn get_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(service.get_by_id(&id).await?))
}

async fn update_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
    payload: Result<Json<BookPatch>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(patch) = payload.map_err(malformed_body)?;
    Ok(Json(service.update(&id, patch).await?))
}

async fn delete_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::store::MemoryBookStore;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
        response::Response,
    };
    use serde_json::{json, Value};
    use crate::modules::books::store::BookStore;
    use async_trait::async_trait;
    use mongodb::bson::oid::ObjectId;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        router(BookService::new(Arc::new(MemoryBookStore::new())))
    }

    /// Accepts inserts but the read-back finds nothing.
    struct LosingStore;

    #[async_trait]
    impl BookStore for LosingStore {
        async fn insert_one(&self, _book: &NewBook) -> anyhow::Result<ObjectId> {
            Ok(ObjectId::new())
        }

        async fn find_one(&self, _id: ObjectId) -> anyhow::Result<Option<Book>> {
            Ok(None)
        }

        async fn find_all(&self) -> anyhow::Result<Vec<Book>> {
            Ok(Vec::new())
        }

        async fn find_one_and_update(
            &self,
            _id: ObjectId,
            _patch: &BookPatch,
        ) -> anyhow::Result<Option<Book>> {
            Ok(None)
        }

        async fn delete_one(&self, _id: ObjectId) -> anyhow::Result<u64> {
            Ok(0)
        }
    }

    /// Fails every call with a connection error.
    struct OfflineStore;

    #[async_trait]
    impl BookStore for OfflineStore {
        async fn insert_one(&self, _book: &NewBook) -> anyhow::Result<ObjectId> {
            Err(anyhow::anyhow!("connection refused").context("insert into books failed"))
        }

        async fn find_one(&self, _id: ObjectId) -> anyhow::Result<Option<Book>> {
            anyhow::bail!("connection refused")
        }

        async fn find_all(&self) -> anyhow::Result<Vec<Book>> {
            anyhow::bail!("connection refused")
        }

        async fn find_one_and_update(
            &self,
            _id: ObjectId,
            _patch: &BookPatch,
        ) -> anyhow::Result<Option<Book>> {
            anyhow::bail!("connection refused")
        }

        async fn delete_one(&self, _id: ObjectId) -> anyhow::Result<u64> {
            anyhow::bail!("connection refused")
        }
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn dune() -> Value {
        json!({
            "title": "Dune",
            "author": "Herbert",
            "price": 15,
            "isbn": "9780441013593",
            "language": "English",
            "numberOfPage": 412,
            "publisher": "Ace"
        })
    }

    #[test]
    fn book_errors_map_to_statuses() {
        let cases = [
            (BookError::InvalidIdentifier("x".into()), StatusCode::BAD_REQUEST),
            (BookError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                BookError::CreationVerificationFailed("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                BookError::Store(anyhow::anyhow!("timeout")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn create_returns_created_book() {
        let response = app()
            .oneshot(json_request(Method::POST, "/", dune()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        let id = body["_id"].as_str().unwrap();
        assert!(crate::modules::books::models::is_valid_id(id));
        assert_eq!(body["title"], "Dune");
        assert_eq!(body["price"], 15.0);
        assert_eq!(body["numberOfPage"], 412);
    }

    #[tokio::test]
    async fn create_with_malformed_body_is_bad_request() {
        let response = app()
            .oneshot(json_request(Method::POST, "/", json!({"title": "Dune"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn create_when_store_fails_is_bad_request_without_store_detail() {
        let response = router(BookService::new(Arc::new(OfflineStore)))
            .oneshot(json_request(Method::POST, "/", dune()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "bad_request");
        assert_eq!(body["error"]["message"], CREATE_FAILED);
        assert!(!body.to_string().contains("insert into books failed"));
        assert!(!body.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn create_when_read_back_is_empty_is_bad_request() {
        let response = router(BookService::new(Arc::new(LosingStore)))
            .oneshot(json_request(Method::POST, "/", dune()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], CREATE_FAILED);
    }

    #[tokio::test]
    async fn list_when_store_fails_is_server_error() {
        let response = router(BookService::new(Arc::new(OfflineStore)))
            .oneshot(empty_request(Method::GET, "/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn get_with_invalid_id_is_bad_request() {
        let response = app()
            .oneshot(empty_request(Method::GET, "/not-a-valid-id"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Invalid ID format");
    }

    #[tokio::test]
    async fn get_missing_book_is_not_found() {
        let response = app()
            .oneshot(empty_request(Method::GET, "/507f1f77bcf86cd799439011"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_missing_book_is_not_found() {
        let response = app()
            .oneshot(json_request(
                Method::PUT,
                "/507f1f77bcf86cd799439011",
                json!({"price": 20}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_with_non_object_body_is_bad_request() {
        let response = app()
            .oneshot(json_request(
                Method::PUT,
                "/507f1f77bcf86cd799439011",
                json!(["price", 20]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_with_invalid_id_is_bad_request() {
        let response = app()
            .oneshot(empty_request(Method::DELETE, "/123"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_on_empty_store_is_empty_array() {
        let response = app()
            .oneshot(empty_request(Method::GET, "/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }
}
