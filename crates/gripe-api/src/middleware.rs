use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use gripe_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Extract and validate the JWT from the Authorization header. An absent or
/// invalid token is answered with 401, never a panic further in.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::create_token;
    use crate::test_support::test_state;
    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn protected() -> &'static str {
        "ok"
    }

    fn app() -> (Router, String) {
        let (state, _db) = test_state();
        let token =
            create_token(&state.jwt_secret, Uuid::new_v4(), "Alice", "alice@example.com").unwrap();

        let router = Router::new()
            .route("/protected", get(protected))
            .layer(axum::middleware::from_fn_with_state(state, require_auth));
        (router, token)
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let (app, _token) = app();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/protected")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let (app, _token) = app();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/protected")
                    .header("Authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_passes_through() {
        let (app, token) = app();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/protected")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_unauthorized() {
        let (app, _token) = app();
        let forged =
            create_token("some-other-secret", Uuid::new_v4(), "Mallory", "m@example.com").unwrap();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/protected")
                    .header("Authorization", format!("Bearer {forged}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
