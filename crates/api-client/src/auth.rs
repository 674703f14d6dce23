use base64::{Engine as _, engine::general_purpose::STANDARD};
use core_types::Credentials;

/// Builds Basic-auth credentials from an API key pair.
///
/// The provider accepts either a pre-built `Authorization` header or a key
/// id/secret pair; this helper turns the latter into the former so the rest
/// of the system only ever deals with one credential shape.
pub fn basic_credentials(
    api_key_id: &str,
    api_secret: &str,
    environment: Option<String>,
) -> Credentials {
    let token = STANDARD.encode(format!("{api_key_id}:{api_secret}"));
    Credentials::new(format!("Basic {token}"), environment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_key_pair_as_basic_header() {
        let creds = basic_credentials("user", "pass", None);
        assert_eq!(creds.authorization, "Basic dXNlcjpwYXNz");
        assert_eq!(creds.environment, None);
    }

    #[test]
    fn environment_is_carried_through() {
        let creds = basic_credentials("k", "s", Some("staging".to_string()));
        assert_eq!(creds.environment.as_deref(), Some("staging"));
    }
}
