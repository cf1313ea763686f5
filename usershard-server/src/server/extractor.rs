//! JSON Body Extractor
//!
//! Same as `axum::Json`, but a body that fails to parse or deserialize is
//! rejected as `ShardError::InvalidRequest` (400 with the JSON error envelope).

use crate::core::ShardError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};

/// Request body extractor
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ShardError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NewUser;
    use axum::body::Body;
    use axum::http::{StatusCode, header};

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/user")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_extracts() {
        let req = json_request(r#"{"username":"a","email":"a@b.com","password":"pw"}"#);
        let JsonBody(user) = JsonBody::<NewUser>::from_request(req, &()).await.unwrap();
        assert_eq!(user.email, "a@b.com");
        assert!(user.bio.is_empty());
    }

    #[tokio::test]
    async fn test_missing_field_is_invalid_request() {
        let req = json_request(r#"{"username":"a","email":"a@b.com"}"#);
        let err = JsonBody::<NewUser>::from_request(req, &()).await.unwrap_err();

        assert!(matches!(&err, ShardError::InvalidRequest(msg) if msg.contains("password")));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_syntax_error_is_invalid_request() {
        let req = json_request("{not json");
        let err = JsonBody::<NewUser>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, ShardError::InvalidRequest(_)));
    }
}
