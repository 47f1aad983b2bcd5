/// Database row types — these map directly to SQLite rows.
/// Distinct from gripe-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub created_at: String,
}

/// A grievance joined with the counterparty's display name. Which side the
/// counterparty is on depends on the query that produced the row.
pub struct GrievanceRow {
    pub id: String,
    pub filed_by: String,
    pub filed_against: String,
    pub counterparty_name: String,
    pub text: String,
    pub created_at: String,
}

pub struct PushSubscriptionRow {
    pub id: String,
    pub user_id: String,
    pub user_agent: String,
    pub endpoint: String,
    pub expiration_time: Option<i64>,
    pub p256dh: String,
    pub auth: String,
}
