//! Request forwarding to upstream services.

use axum::{
    body::Body,
    http::{Request, StatusCode, Uri, header},
    response::Response,
};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use tracing::{debug, error};

use crate::config::RouteTarget;

/// Longest-prefix route table, built once from config.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteTarget>,
}

impl RouteTable {
    pub fn new(mut routes: Vec<RouteTarget>) -> Self {
        // Longest prefix first so lookup can take the first hit.
        routes.sort_by_key(|r| std::cmp::Reverse(r.prefix.len()));
        Self { routes }
    }

    pub fn upstream_for(&self, path: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| path == r.prefix || path.starts_with(&format!("{}/", r.prefix)))
            .map(|r| r.upstream.as_str())
    }
}

/// Forward a request to an upstream base URL, preserving path and query.
pub async fn forward(
    client: Client<HttpConnector, Body>,
    mut req: Request<Body>,
    upstream: &str,
) -> Result<Response, StatusCode> {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target_uri = format!("{}{}", upstream.trim_end_matches('/'), path_and_query);

    debug!(target = %target_uri, "forwarding request");

    let uri: Uri = target_uri.parse().map_err(|e| {
        error!(target = %target_uri, error = ?e, "invalid upstream URI");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    *req.uri_mut() = uri;

    // Host header must match the target authority.
    if let Some(authority) = req.uri().authority() {
        let value = axum::http::HeaderValue::from_str(authority.as_str()).map_err(|e| {
            error!(authority = %authority, error = ?e, "invalid host header value");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        req.headers_mut().insert(header::HOST, value);
    }

    let response = client.request(req).await.map_err(|e| {
        error!(error = ?e, "upstream request failed");
        if e.is_connect() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::BAD_GATEWAY
        }
    })?;

    let (parts, body) = response.into_parts();
    Ok(Response::from_parts(parts, Body::new(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(vec![
            RouteTarget {
                prefix: "/auth".to_string(),
                upstream: "http://usermgr".to_string(),
            },
            RouteTarget {
                prefix: "/cafeterias".to_string(),
                upstream: "http://catalog".to_string(),
            },
            RouteTarget {
                prefix: "/cafeterias/media".to_string(),
                upstream: "http://media".to_string(),
            },
        ])
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = table();
        assert_eq!(table.upstream_for("/auth/login"), Some("http://usermgr"));
        assert_eq!(table.upstream_for("/cafeterias/3"), Some("http://catalog"));
        assert_eq!(
            table.upstream_for("/cafeterias/media/7"),
            Some("http://media")
        );
    }

    #[test]
    fn test_prefix_respects_segment_boundaries() {
        let table = table();
        assert_eq!(table.upstream_for("/cafeterias"), Some("http://catalog"));
        assert_eq!(table.upstream_for("/cafeteriasx"), None);
        assert_eq!(table.upstream_for("/reviews"), None);
    }
}
