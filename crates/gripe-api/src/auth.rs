use std::sync::Arc;

use anyhow::Context;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use gripe_db::Database;
use gripe_push::Dispatcher;
use gripe_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub vapid_public_key: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if !is_valid_email(&req.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }

    // Check if the email is taken
    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Conflict(
            "an account with this email already exists".into(),
        ));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();

    let user_id = Uuid::new_v4();

    state
        .db
        .create_user(&user_id.to_string(), &req.email, name, &password_hash)?;

    let token = create_token(&state.jwt_secret, user_id, name, &req.email)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored password hash is invalid: {e}"))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user.id.parse().context("stored user id is not a UUID")?;

    let token = create_token(&state.jwt_secret, user_id, &user.name, &user.email)?;

    Ok(Json(LoginResponse {
        user_id,
        name: user.name,
        email: user.email,
        token,
    }))
}

pub(crate) fn create_token(
    secret: &str,
    user_id: Uuid,
    name: &str,
    email: &str,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Cheap shape check only: one '@', a dotted domain, no whitespace.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{response_json, test_state};
    use axum::response::IntoResponse;

    fn register_request(email: &str, password: &str, name: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            name: name.into(),
        }
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice bob@example.com"));
        assert!(!is_valid_email("alice@ex@ample.com"));
    }

    #[tokio::test]
    async fn register_creates_user_and_returns_token() {
        let (state, db) = test_state();

        let result = register(
            State(state),
            Json(register_request("alice@example.com", "hunter2hunter2", "Alice")),
        )
        .await;

        let response = result.unwrap().into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response_json(response).await;
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

        let stored = db.get_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(stored.name, "Alice");
        // Hash, never the plaintext
        assert_ne!(stored.password, "hunter2hunter2");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let (state, db) = test_state();

        register(
            State(state.clone()),
            Json(register_request("alice@example.com", "hunter2hunter2", "Alice")),
        )
        .await
        .unwrap();

        let second = register(
            State(state),
            Json(register_request("alice@example.com", "another-pass", "Imposter")),
        )
        .await;

        assert!(matches!(second, Err(ApiError::Conflict(_))));
        let stored = db.get_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(stored.name, "Alice");
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let (state, _db) = test_state();

        let bad_email = register(
            State(state.clone()),
            Json(register_request("not-an-email", "hunter2hunter2", "Alice")),
        )
        .await;
        assert!(matches!(bad_email, Err(ApiError::Validation(_))));

        let short_password = register(
            State(state.clone()),
            Json(register_request("alice@example.com", "short", "Alice")),
        )
        .await;
        assert!(matches!(short_password, Err(ApiError::Validation(_))));

        let blank_name = register(
            State(state),
            Json(register_request("alice@example.com", "hunter2hunter2", "   ")),
        )
        .await;
        assert!(matches!(blank_name, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn register_then_login_roundtrip() {
        let (state, _db) = test_state();

        register(
            State(state.clone()),
            Json(register_request("alice@example.com", "hunter2hunter2", "Alice")),
        )
        .await
        .unwrap();

        let response = login(
            State(state),
            Json(LoginRequest {
                email: "alice@example.com".into(),
                password: "hunter2hunter2".into(),
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["name"], "Alice");
        assert_eq!(body["email"], "alice@example.com");
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_email() {
        let (state, _db) = test_state();

        register(
            State(state.clone()),
            Json(register_request("alice@example.com", "hunter2hunter2", "Alice")),
        )
        .await
        .unwrap();

        let wrong_password = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "alice@example.com".into(),
                password: "wrong-password".into(),
            }),
        )
        .await;
        assert!(matches!(wrong_password, Err(ApiError::Unauthorized)));

        let unknown = login(
            State(state),
            Json(LoginRequest {
                email: "nobody@example.com".into(),
                password: "hunter2hunter2".into(),
            }),
        )
        .await;
        assert!(matches!(unknown, Err(ApiError::Unauthorized)));
    }
}
