use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use gripe_push::NotificationPayload;
use gripe_types::api::{
    Claims, SubscribeRequest, TestPushRequest, TestPushResponse, UnsubscribeRequest,
    VapidPublicKeyResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;

/// The application-server key a browser needs to create a subscription.
pub async fn vapid_public_key(State(state): State<AppState>) -> Json<VapidPublicKeyResponse> {
    Json(VapidPublicKeyResponse {
        public_key: state.vapid_public_key.clone(),
    })
}

pub async fn subscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.user_agent.trim().is_empty() {
        return Err(ApiError::Validation("user_agent must not be empty".into()));
    }

    let db = state.db.clone();
    let id = Uuid::new_v4().to_string();
    let uid = claims.sub.to_string();
    tokio::task::spawn_blocking(move || {
        db.upsert_push_subscription(
            &id,
            &uid,
            req.user_agent.trim(),
            &req.subscription.endpoint,
            req.subscription.expiration_time,
            &req.subscription.keys.p256dh,
            &req.subscription.keys.auth,
        )
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UnsubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let uid = claims.sub.to_string();

    // Deleting nothing is still a successful unsubscribe.
    tokio::task::spawn_blocking(move || db.delete_push_subscription(&uid, req.user_agent.trim()))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    Ok(StatusCode::NO_CONTENT)
}

/// Sends a notification to the caller's own devices, so they can check their
/// subscription actually works.
pub async fn test_push(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TestPushRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = NotificationPayload {
        title: "Test notification".into(),
        body: req.message,
    };

    let report = state
        .dispatcher
        .notify_user(claims.sub, &payload)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(TestPushResponse {
        success: report.all_delivered(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransport, response_json, seeded_user, test_state, test_state_with};
    use axum::response::IntoResponse;
    use gripe_types::api::{PushSubscriptionDescriptor, PushSubscriptionKeys};

    fn subscribe_request(user_agent: &str, endpoint: &str) -> SubscribeRequest {
        SubscribeRequest {
            subscription: PushSubscriptionDescriptor {
                endpoint: endpoint.into(),
                expiration_time: None,
                keys: PushSubscriptionKeys {
                    p256dh: "p256dh-key".into(),
                    auth: "auth-secret".into(),
                },
            },
            user_agent: user_agent.into(),
        }
    }

    #[tokio::test]
    async fn subscribing_twice_keeps_one_row_per_device() {
        let (state, db) = test_state();
        let alice = seeded_user(&db, "Alice");

        for endpoint in ["https://push.example/old", "https://push.example/new"] {
            let response = subscribe(
                State(state.clone()),
                Extension(alice.clone()),
                Json(subscribe_request("Firefox on laptop", endpoint)),
            )
            .await
            .unwrap()
            .into_response();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        let subs = db.push_subscriptions_for_user(&alice.sub.to_string()).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].endpoint, "https://push.example/new");
    }

    #[tokio::test]
    async fn subscribe_rejects_blank_device_identifier() {
        let (state, db) = test_state();
        let alice = seeded_user(&db, "Alice");

        let result = subscribe(
            State(state),
            Extension(alice.clone()),
            Json(subscribe_request("   ", "https://push.example/x")),
        )
        .await;

        assert!(matches!(result, Err(ApiError::Validation(_))));
        assert!(db.push_subscriptions_for_user(&alice.sub.to_string()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_removes_the_device_row() {
        let (state, db) = test_state();
        let alice = seeded_user(&db, "Alice");

        subscribe(
            State(state.clone()),
            Extension(alice.clone()),
            Json(subscribe_request("Firefox on laptop", "https://push.example/x")),
        )
        .await
        .unwrap();

        let response = unsubscribe(
            State(state),
            Extension(alice.clone()),
            Json(UnsubscribeRequest {
                user_agent: "Firefox on laptop".into(),
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(db.push_subscriptions_for_user(&alice.sub.to_string()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsubscribing_unknown_device_reports_success() {
        let (state, db) = test_state();
        let alice = seeded_user(&db, "Alice");

        let response = unsubscribe(
            State(state),
            Extension(alice),
            Json(UnsubscribeRequest {
                user_agent: "never subscribed".into(),
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_push_reports_partial_failure() {
        let (transport, attempted) = ScriptedTransport::new();
        let (state, db) = test_state_with(transport);
        let alice = seeded_user(&db, "Alice");

        for (ua, endpoint) in [
            ("laptop", "https://push.example/ok"),
            ("phone", "https://push.example/fail"),
        ] {
            subscribe(
                State(state.clone()),
                Extension(alice.clone()),
                Json(subscribe_request(ua, endpoint)),
            )
            .await
            .unwrap();
        }

        let response = test_push(
            State(state),
            Extension(alice),
            Json(TestPushRequest {
                message: "does this thing work".into(),
            }),
        )
        .await
        .unwrap()
        .into_response();

        let body = response_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(attempted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_push_with_no_subscriptions_succeeds() {
        let (state, db) = test_state();
        let alice = seeded_user(&db, "Alice");

        let response = test_push(
            State(state),
            Extension(alice),
            Json(TestPushRequest {
                message: "hello, nobody".into(),
            }),
        )
        .await
        .unwrap()
        .into_response();

        let body = response_json(response).await;
        assert_eq!(body["success"], true);
    }
}
