//! Response and request helpers shared by every route module

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::types::ServiceError;

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorResponse {
            error: message.to_string(),
        },
    )
}

pub fn message_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &MessageResponse {
            message: message.to_string(),
        },
    )
}

pub fn service_error_response(err: ServiceError) -> Response<Full<Bytes>> {
    let (status, body) = err.into_status_code_and_body();
    error_response(status, &body)
}

/// CORS preflight response
pub fn cors_preflight() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });
    json_response(StatusCode::NOT_FOUND, &body)
}

pub fn method_not_allowed() -> Response<Full<Bytes>> {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

pub fn get_auth_header<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

pub fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ServiceError> {
    serde_json::from_slice(body).map_err(ServiceError::from)
}

pub fn parse_query<T: DeserializeOwned>(query: Option<&str>) -> Result<T, ServiceError> {
    serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| ServiceError::BadRequest(format!("Invalid query: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Query {
        id: Option<String>,
        limit: Option<String>,
    }

    #[test]
    fn test_parse_query() {
        let q: Query = parse_query(Some("id=abc&limit=5")).unwrap();
        assert_eq!(q.id.as_deref(), Some("abc"));
        assert_eq!(q.limit.as_deref(), Some("5"));

        let q: Query = parse_query(None).unwrap();
        assert_eq!(q, Query { id: None, limit: None });
    }

    #[test]
    fn test_error_response_shape() {
        let response = error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_get_auth_header() {
        let req = Request::builder()
            .header("Authorization", "Bearer abc")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(get_auth_header(&req), Some("Bearer abc"));

        let req = Request::builder().body(Bytes::new()).unwrap();
        assert_eq!(get_auth_header(&req), None);
    }
}
