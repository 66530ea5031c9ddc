/// HTTP Basic guard for private endpoints
use crate::{context::AppContext, error::AuthnError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use constant_time_eq::constant_time_eq;

/// Proof that the caller presented the configured API credentials
#[derive(Debug, Clone, Copy)]
pub struct PrivateAccess;

#[async_trait]
impl FromRequestParts<AppContext> for PrivateAccess {
    type Rejection = AuthnError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        // Without configured credentials the private surface stays closed
        let expected = state
            .config
            .authentication
            .api_credentials
            .as_ref()
            .ok_or(AuthnError::Unauthorized)?;

        let TypedHeader(Authorization(basic)) =
            TypedHeader::<Authorization<Basic>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthnError::Unauthorized)?;

        let username_ok = constant_time_eq(basic.username().as_bytes(), expected.username.as_bytes());
        let password_ok = constant_time_eq(basic.password().as_bytes(), expected.password.as_bytes());

        if username_ok && password_ok {
            Ok(PrivateAccess)
        } else {
            tracing::debug!("private endpoint credentials rejected");
            Err(AuthnError::Unauthorized)
        }
    }
}
