use axum::{
    extract::{MatchedPath, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::{Status, TraceContextExt};
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, info, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::Metrics;

/// First address in `x-forwarded-for`, else `x-real-ip`
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|value| value.to_str().ok()))
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

/// Request attributes captured before the handler consumes the request
struct RequestInfo {
    method: String,
    route: String,
    uri: String,
    user_agent: String,
    client_ip: String,
}

impl RequestInfo {
    fn from_request(request: &Request) -> Self {
        let uri = request.uri().to_string();
        // Route templates keep metric label cardinality bounded
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|matched| matched.as_str().to_string())
            .unwrap_or_else(|| uri.clone());

        Self {
            method: request.method().to_string(),
            route,
            uri,
            user_agent: request
                .headers()
                .get("user-agent")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
            client_ip: client_ip(request.headers()),
        }
    }

    fn span(&self) -> tracing::Span {
        let name = format!("{} {}", self.method, self.route);
        tracing::info_span!(
            target: "foodlog_rs::http",
            "{}", name,
            otel.name = %name,
            otel.kind = "server",
            http.method = %self.method,
            http.route = %self.route,
            http.url = %self.uri,
            http.user_agent = %self.user_agent,
            client.address = %self.client_ip,
            http.status_code = tracing::field::Empty,
            http.response_time_ms = tracing::field::Empty,
        )
    }
}

/// Per-request server span plus HTTP metrics
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let info = RequestInfo::from_request(&request);
    let span = info.span();

    async move {
        let span = tracing::Span::current();
        let trace_id = span.context().span().span_context().trace_id().to_string();

        metrics.increment_in_flight(&info.method, &info.route);
        debug!(trace_id = %trace_id, client_ip = %info.client_ip, "Processing request");

        let response = next.run(request).await;

        let elapsed = started.elapsed();
        let status = response.status();
        span.record("http.status_code", status.as_u16());
        span.record("http.response_time_ms", elapsed.as_millis());
        span.context().span().set_status(if status.is_client_error() || status.is_server_error() {
            Status::error("HTTP error")
        } else {
            Status::Ok
        });

        metrics.record_http_request(&info.method, &info.route, status.as_u16(), elapsed.as_secs_f64());
        metrics.decrement_in_flight(&info.method, &info.route);

        if status.is_server_error() {
            error!(
                trace_id = %trace_id,
                method = %info.method,
                path = %info.route,
                status_code = status.as_u16(),
                duration_ms = elapsed.as_millis(),
                "Request failed"
            );
        } else {
            info!(
                trace_id = %trace_id,
                method = %info.method,
                path = %info.route,
                status_code = status.as_u16(),
                duration_ms = elapsed.as_millis(),
                "Request completed"
            );
        }

        response
    }
    .instrument(span)
    .await
}
