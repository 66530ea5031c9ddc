/// Account provisioning, lifecycle and session endpoints
use crate::{
    account::{AccountInfo, CreateAccountRequest, CreateAccountResponse},
    auth::PrivateAccess,
    context::AppContext,
    error::{AuthnError, AuthnResult},
    token::SESSION_COOKIE,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/:id", get(get_account).delete(delete_account))
        .route("/accounts/:id/archive", patch(archive_account))
        .route("/session", delete(delete_session))
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Create account endpoint
async fn create_account(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Form(req): Form<CreateAccountRequest>,
) -> AuthnResult<(StatusCode, CookieJar, Json<CreateAccountResponse>)> {
    let account = ctx
        .account_creator
        .create(&req.username, &req.password)
        .await?;

    let issued = match ctx.token_issuer.issue_session(&account).await {
        Ok(issued) => issued,
        Err(e) => {
            tracing::error!(account_id = account.id, "create_account: failed to issue session: {}", e);
            // No session means no signup; release the username for a retry
            if let Err(discard_err) = ctx.account_store.discard(account.id).await {
                tracing::error!(
                    account_id = account.id,
                    "create_account: failed to discard account: {}",
                    discard_err
                );
            }
            return Err(e);
        }
    };

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(issued.session_token)),
        Json(CreateAccountResponse {
            id_token: issued.identity_token,
        }),
    ))
}

/// Look up an account by id, including archived and deleted accounts
async fn get_account(
    _access: PrivateAccess,
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> AuthnResult<Json<AccountInfo>> {
    let account = ctx.account_store.find(id).await?;
    Ok(Json(account.into()))
}

async fn archive_account(
    _access: PrivateAccess,
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> AuthnResult<StatusCode> {
    ctx.account_store.archive(id).await?;
    Ok(StatusCode::OK)
}

async fn delete_account(
    _access: PrivateAccess,
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> AuthnResult<StatusCode> {
    ctx.account_store.delete(id).await?;
    Ok(StatusCode::OK)
}

/// Logout: revoke the refresh handle behind the session cookie, if any
async fn delete_session(
    State(ctx): State<AppContext>,
    jar: CookieJar,
) -> AuthnResult<(StatusCode, CookieJar)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match ctx.token_issuer.revoke_session(cookie.value()).await {
            // A forged or foreign cookie has nothing to revoke
            Ok(()) | Err(AuthnError::Unauthorized) => {}
            Err(e) => return Err(e),
        }
    }

    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    Ok((StatusCode::OK, jar.remove(removal)))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{body_json, form_request, private_request, TestApp};
    use crate::error::{codes, FieldError};
    use crate::token::issuer::IdentityClaims;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum_extra::extract::cookie::Cookie;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    fn session_value(response: &axum::response::Response) -> String {
        let raw = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie set")
            .to_str()
            .unwrap()
            .to_string();
        let cookie = Cookie::parse(raw).unwrap();
        assert_eq!(cookie.name(), "authn");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        cookie.value().to_string()
    }

    #[tokio::test]
    async fn test_create_account_success() {
        let app = TestApp::new().await;

        let response = app
            .send(form_request("/accounts", "username=new%40test.com&password=s3cr3t-passw0rd"))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let session = session_value(&response);
        assert_eq!(session.split('.').count(), 3);

        let body = body_json(response).await;
        let id_token = body["id_token"].as_str().unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&app.ctx.config.authentication.audience]);
        let claims = decode::<IdentityClaims>(
            id_token,
            &DecodingKey::from_secret(&app.ctx.config.authentication.identity_signing_key),
            &validation,
        )
        .unwrap()
        .claims;

        assert_eq!(claims.iss, app.ctx.config.service.base_url);

        let account_id: i64 = claims.sub.parse().unwrap();
        let account = app.ctx.account_store.find(account_id).await.unwrap();
        assert_eq!(account.username, "new@test.com");

        // The cookie resolves back to the same account through the token store
        assert_eq!(
            app.ctx.token_issuer.resolve_session(&session).await.unwrap(),
            account_id
        );
    }

    #[tokio::test]
    async fn test_create_account_reports_all_errors() {
        let app = TestApp::new().await;

        let response = app.send(form_request("/accounts", "")).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let body = body_json(response).await;
        let errors: Vec<FieldError> = serde_json::from_value(body["errors"].clone()).unwrap();
        assert_eq!(
            errors,
            vec![
                FieldError::new("username", codes::MISSING),
                FieldError::new("password", codes::MISSING),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_duplicate_account() {
        let app = TestApp::new().await;
        let form = "username=dupe%40test.com&password=s3cr3t-passw0rd";

        let first = app.send(form_request("/accounts", form)).await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app.send(form_request("/accounts", form)).await;
        assert_eq!(second.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(second).await;
        assert_eq!(
            body,
            serde_json::json!({"errors": [{"field": "username", "message": "TAKEN"}]})
        );
    }

    #[tokio::test]
    async fn test_create_account_fails_when_token_store_down() {
        let app = TestApp::new().await;
        app.tokens.set_available(false);

        let response = app
            .send(form_request("/accounts", "username=down%40test.com&password=s3cr3t-passw0rd"))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_signup_retry_after_token_store_recovers() {
        let app = TestApp::new().await;
        let form = "username=retry%40test.com&password=s3cr3t-passw0rd";

        app.tokens.set_available(false);
        let failed = app.send(form_request("/accounts", form)).await;
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account")
            .fetch_one(&app.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        app.tokens.set_available(true);
        let retried = app.send(form_request("/accounts", form)).await;
        assert_eq!(retried.status(), StatusCode::CREATED);
        session_value(&retried);
    }

    #[tokio::test]
    async fn test_delete_unknown_account() {
        let app = TestApp::new().await;

        let response = app.send(private_request(Method::DELETE, "/accounts/999999")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_unarchived_account() {
        let app = TestApp::new().await;
        let account = app.ctx.account_store.create("unlocked@test.com", "bar").await.unwrap();

        let response = app
            .send(private_request(Method::DELETE, &format!("/accounts/{}", account.id)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let account = app.ctx.account_store.find(account.id).await.unwrap();
        assert!(account.deleted_at.is_some());
        assert!(account.archived_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_archived_account() {
        let app = TestApp::new().await;
        let account = app.ctx.account_store.create("locked@test.com", "bar").await.unwrap();

        let response = app
            .send(private_request(Method::PATCH, &format!("/accounts/{}/archive", account.id)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .send(private_request(Method::DELETE, &format!("/accounts/{}", account.id)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let account = app.ctx.account_store.find(account.id).await.unwrap();
        assert!(account.archived_at.unwrap() <= account.deleted_at.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let app = TestApp::new().await;
        let account = app.ctx.account_store.create("twice@test.com", "bar").await.unwrap();
        let uri = format!("/accounts/{}", account.id);

        app.send(private_request(Method::DELETE, &uri)).await;
        let deleted_at = app.ctx.account_store.find(account.id).await.unwrap().deleted_at;

        let response = app.send(private_request(Method::DELETE, &uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            app.ctx.account_store.find(account.id).await.unwrap().deleted_at,
            deleted_at
        );
    }

    #[tokio::test]
    async fn test_archive_unknown_account() {
        let app = TestApp::new().await;

        let response = app
            .send(private_request(Method::PATCH, "/accounts/999999/archive"))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_account_hides_digest() {
        let app = TestApp::new().await;
        let account = app.ctx.account_store.create("visible@test.com", "bar").await.unwrap();
        app.ctx.account_store.delete(account.id).await.unwrap();

        let response = app
            .send(private_request(Method::GET, &format!("/accounts/{}", account.id)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["username"], "visible@test.com");
        assert_eq!(body["state"], "deleted");
        assert!(body.get("password_digest").is_none());
    }

    #[tokio::test]
    async fn test_private_routes_require_credentials() {
        let app = TestApp::new().await;
        let account = app.ctx.account_store.create("guarded@test.com", "bar").await.unwrap();

        let anonymous = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/accounts/{}", account.id))
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(anonymous).await.status(), StatusCode::UNAUTHORIZED);

        let wrong = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/accounts/{}", account.id))
            .header(header::AUTHORIZATION, "Basic YWRtaW46d3Jvbmc=")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(wrong).await.status(), StatusCode::UNAUTHORIZED);

        let wrong_user = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/accounts/{}", account.id))
            .header(header::AUTHORIZATION, "Basic YWRtaW06c2VjcmV0")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(wrong_user).await.status(), StatusCode::UNAUTHORIZED);

        let found = app.ctx.account_store.find(account.id).await.unwrap();
        assert!(found.deleted_at.is_none());

        let uri = format!("/accounts/{}", account.id);
        let authorized = app.send(private_request(Method::DELETE, &uri)).await;
        assert_eq!(authorized.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let app = TestApp::new().await;

        let response = app
            .send(form_request("/accounts", "username=bye%40test.com&password=s3cr3t-passw0rd"))
            .await;
        let session = session_value(&response);

        let logout = Request::builder()
            .method(Method::DELETE)
            .uri("/session")
            .header(header::COOKIE, format!("authn={}", session))
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(logout).await.status(), StatusCode::OK);

        assert!(app.ctx.token_issuer.resolve_session(&session).await.is_err());
    }

    #[tokio::test]
    async fn test_logout_without_session() {
        let app = TestApp::new().await;

        let logout = Request::builder()
            .method(Method::DELETE)
            .uri("/session")
            .header(header::COOKIE, "authn=garbage")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(logout).await.status(), StatusCode::OK);
    }
}
