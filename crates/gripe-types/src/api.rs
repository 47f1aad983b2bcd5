use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared between gripe-api (REST middleware) and gripe-server.
/// Canonical definition lives here in gripe-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub token: String,
}

// -- Grievances --

/// Both fields optional so a missing one is answered with a proper
/// validation message instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGrievanceRequest {
    pub against: Option<Uuid>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateGrievanceResponse {
    pub id: Uuid,
}

/// The other party of a grievance, as shown in listings.
#[derive(Debug, Clone, Serialize)]
pub struct Counterparty {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiledGrievance {
    pub id: Uuid,
    pub against: Counterparty,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedGrievance {
    pub id: Uuid,
    pub by: Counterparty,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrievanceListResponse {
    pub by_you: Vec<FiledGrievance>,
    pub against_you: Vec<ReceivedGrievance>,
}

// -- Push subscriptions --

/// Browser-native subscription JSON, as produced by
/// `PushSubscription.toJSON()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscriptionDescriptor {
    pub endpoint: String,
    pub expiration_time: Option<i64>,
    pub keys: PushSubscriptionKeys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushSubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscribeRequest {
    pub subscription: PushSubscriptionDescriptor,
    pub user_agent: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnsubscribeRequest {
    pub user_agent: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestPushRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TestPushResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct VapidPublicKeyResponse {
    pub public_key: String,
}
