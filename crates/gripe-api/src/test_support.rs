use std::sync::{Arc, Mutex};

use axum::response::Response;
use futures_util::future::BoxFuture;
use uuid::Uuid;

use gripe_db::{Database, models::PushSubscriptionRow};
use gripe_push::{DeliveryError, Dispatcher, PushTransport};
use gripe_types::api::Claims;

use crate::auth::{AppState, AppStateInner};

/// Records every attempted endpoint; fails endpoints containing "fail".
pub(crate) struct ScriptedTransport {
    attempted: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let attempted = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                attempted: attempted.clone(),
            },
            attempted,
        )
    }
}

impl PushTransport for ScriptedTransport {
    fn deliver<'a>(
        &'a self,
        subscription: &'a PushSubscriptionRow,
        _payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async move {
            self.attempted
                .lock()
                .unwrap()
                .push(subscription.endpoint.clone());
            if subscription.endpoint.contains("fail") {
                Err(DeliveryError::Send("410 Gone".into()))
            } else {
                Ok(())
            }
        })
    }
}

pub(crate) fn test_state() -> (AppState, Arc<Database>) {
    let (transport, _attempted) = ScriptedTransport::new();
    test_state_with(transport)
}

pub(crate) fn test_state_with(transport: ScriptedTransport) -> (AppState, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let dispatcher = Dispatcher::new(db.clone(), transport);
    let state = Arc::new(AppStateInner {
        db: db.clone(),
        jwt_secret: "test-secret".into(),
        dispatcher,
        vapid_public_key: "test-public-key".into(),
    });
    (state, db)
}

/// Inserts a user row and returns the claims a session for them would carry.
pub(crate) fn seeded_user(db: &Database, name: &str) -> Claims {
    let id = Uuid::new_v4();
    let email = format!("{}@example.com", name.to_lowercase());
    db.create_user(&id.to_string(), &email, name, "argon2-hash")
        .unwrap();
    Claims {
        sub: id,
        name: name.to_string(),
        email,
        exp: usize::MAX,
    }
}

pub(crate) async fn response_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
