use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use serde_json::{json, Value};
use tracing::{error, warn};

pub const DEFAULT_MAX_REQUEST_SIZE: u64 = 1024 * 1024;

type Rejection = (StatusCode, Json<Value>);

fn rejection(status: StatusCode, error: &str, message: String) -> Rejection {
    (
        status,
        Json(json!({
            "error": error,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Rejects bodies that are not JSON or larger than `max_request_size` bytes
pub async fn request_validation_middleware(
    State(max_request_size): State<u64>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, Rejection> {
    validate_content_type(&request)?;
    validate_request_size(&request, max_request_size)?;

    Ok(next.run(request).await)
}

fn validate_content_type(request: &Request<Body>) -> Result<(), Rejection> {
    let method = request.method();
    if method != Method::POST && method != Method::PUT && method != Method::PATCH {
        return Ok(());
    }

    // Bodyless admin calls are allowed through
    let has_body = request
        .headers()
        .get("content-length")
        .and_then(|value| value.to_str().ok())
        .map_or(true, |length| length != "0");

    match request.headers().get("content-type") {
        Some(content_type) => {
            let content_type = content_type.to_str().unwrap_or("");
            if !content_type.starts_with("application/json") {
                warn!("Invalid content type: {}", content_type);
                return Err(rejection(
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "Unsupported media type",
                    "Content-Type must be application/json".to_string(),
                ));
            }
            Ok(())
        }
        None if has_body && !request.uri().path().starts_with("/api/admin/") => {
            warn!("Missing content type header");
            Err(rejection(
                StatusCode::BAD_REQUEST,
                "Missing content type",
                "Content-Type header is required for requests with body".to_string(),
            ))
        }
        None => Ok(()),
    }
}

fn validate_request_size(request: &Request<Body>, max_request_size: u64) -> Result<(), Rejection> {
    let length = request
        .headers()
        .get("content-length")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    if let Some(length) = length {
        if length > max_request_size {
            error!("Request too large: {} bytes", length);
            return Err(rejection(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request too large",
                format!(
                    "Request size {} bytes exceeds maximum of {} bytes",
                    length, max_request_size
                ),
            ));
        }
    }

    Ok(())
}

/// CORS headers for browser clients
pub async fn cors_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert("Access-Control-Max-Age", HeaderValue::from_static("86400"));

    response
}

pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("X-XSS-Protection", HeaderValue::from_static("1; mode=block"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("default-src 'self'"),
    );

    response
}
