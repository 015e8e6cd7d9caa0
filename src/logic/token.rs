use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Issue a new opaque bearer token (two v4 UUIDs, 244 random bits)
pub fn issue_token() -> String {
    format!(
        "tp_{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Hex SHA-256 of a token; this is the only form that is persisted
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
