use api_client::basic_credentials;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use core_types::Credentials;

/// Extracts provider credentials from the incoming request headers.
///
/// A full `Authorization` header wins; otherwise an `x-api-key-id` /
/// `x-api-secret` pair is combined into a Basic header. The optional
/// `x-provider-environment` header is carried along either way. Returns
/// `None` when neither form is present, so the handler can fail fast with a
/// 401 before any upstream call.
pub fn credentials_from_headers(headers: &HeaderMap) -> Option<Credentials> {
    let environment = headers
        .get("x-provider-environment")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return Some(Credentials::new(auth, environment));
    }

    let key_id = headers.get("x-api-key-id").and_then(|v| v.to_str().ok())?;
    let secret = headers.get("x-api-secret").and_then(|v| v.to_str().ok())?;
    Some(basic_credentials(key_id, secret, environment))
}
