//! Bearer-token authentication.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::error::ApiError;
use crate::error::Error;
use crate::service::Brain;

/// The authenticated caller. Extracting it fails with 401 when the
/// `Authorization: Bearer <token>` header is missing, unknown or expired.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

impl FromRequestParts<Brain> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, brain: &Brain) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError(Error::Unauthorized))?;
        let user_id = brain.authenticate(token.clone()).await?;
        Ok(Self { user_id, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/notes");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token(&parts(Some("Bearer syn_abc"))).as_deref(), Some("syn_abc"));
        assert_eq!(bearer_token(&parts(Some("bearer  syn_abc "))).as_deref(), Some("syn_abc"));
        assert!(bearer_token(&parts(Some("Basic dXNlcg=="))).is_none());
        assert!(bearer_token(&parts(Some("Bearer "))).is_none());
        assert!(bearer_token(&parts(None)).is_none());
    }
}
