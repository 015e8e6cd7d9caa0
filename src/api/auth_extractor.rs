use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;
use crate::logic::{hash_token, parse_bearer};
use crate::model::User;
use crate::store::Store;

/// The user behind the request's `Authorization: Bearer <token>` header
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<AppState<S>> for AuthUser
where
    S: Store + 'static,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| unauthorized("Missing or malformed bearer token"))?;

        match state.store.find_user_by_token_hash(&hash_token(token)).await {
            Ok(Some(user)) => Ok(AuthUser(user)),
            Ok(None) => Err(unauthorized("Invalid bearer token")),
            Err(e) => {
                log::error!("Token lookup failed: {:#}", e);
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(&e.to_string())),
                )
                    .into_response())
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer)
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
        Json(ErrorResponse::new(message)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tp_abc"));
        assert_eq!(bearer_token(&headers), Some("tp_abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token tp_abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_unauthorized_sets_challenge() {
        let response = unauthorized("nope");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
