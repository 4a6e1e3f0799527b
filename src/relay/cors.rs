//! Cross-origin policy
//!
//! A fixed allow-list per environment, credentials allowed. Credentialed CORS
//! can't use wildcards, so methods and headers are listed explicitly too.

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;

pub(crate) fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
