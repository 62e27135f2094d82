use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use crate::{db::models::AuthUser, names, rejections::AppError, AppState};

/// Guard extractor that verifies the caller's session against the database.
/// Accepts the `x-session-token` header (mobile clients) or the session
/// cookie (web). Token issuance is out of scope; only the lookup lives here.
pub struct AuthGuard(pub AuthUser);

impl FromRequestParts<AppState> for AuthGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_token = parts
            .headers
            .get(names::SESSION_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let cookie_token = CookieJar::from_headers(&parts.headers)
            .get(names::USER_SESSION_COOKIE_NAME)
            .map(|c| c.value().to_string());

        for token in header_token.into_iter().chain(cookie_token) {
            if let Ok(Some(user)) = state.db.get_user_by_session(&token).await {
                return Ok(AuthGuard(user));
            }
        }

        Err(AppError::Unauthorized)
    }
}
