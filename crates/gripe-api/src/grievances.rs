use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use tracing::{error, warn};
use uuid::Uuid;

use gripe_push::NotificationPayload;
use gripe_types::api::{
    Claims, Counterparty, CreateGrievanceRequest, CreateGrievanceResponse, FiledGrievance,
    GrievanceListResponse, ReceivedGrievance,
};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn create_grievance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGrievanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let against = req
        .against
        .ok_or_else(|| ApiError::Validation("a grievance must be filed against someone".into()))?;

    let text = req.text.unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("a grievance needs text".into()));
    }

    // Foreign keys are ON; check the target up front so a bad id is a 400,
    // not a constraint violation.
    let db = state.db.clone();
    let target = against.to_string();
    let target_exists = tokio::task::spawn_blocking(move || db.get_user_by_id(&target))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??
        .is_some();
    if !target_exists {
        return Err(ApiError::Validation("no such user to file against".into()));
    }

    let grievance_id = Uuid::new_v4();

    // Run blocking DB insert off the async runtime
    let db = state.db.clone();
    let gid = grievance_id.to_string();
    let filed_by = claims.sub.to_string();
    let filed_against = against.to_string();
    let body = text.to_string();
    tokio::task::spawn_blocking(move || db.insert_grievance(&gid, &filed_by, &filed_against, &body))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    // Fire-and-forget: the grievance is created whether or not any push
    // delivery succeeds.
    let dispatcher = state.dispatcher.clone();
    let payload = NotificationPayload {
        title: "New grievance".into(),
        body: format!("{} filed a grievance against you", claims.name),
    };
    tokio::spawn(async move {
        if let Err(e) = dispatcher.notify_user(against, &payload).await {
            error!("failed to dispatch grievance notification: {e:#}");
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(CreateGrievanceResponse { id: grievance_id }),
    ))
}

pub async fn list_grievances(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    // Run both blocking queries off the async runtime
    let db = state.db.clone();
    let uid = claims.sub.to_string();
    let (by_you_rows, against_you_rows) = tokio::task::spawn_blocking(move || {
        let by_you = db.grievances_filed_by(&uid)?;
        let against_you = db.grievances_filed_against(&uid)?;
        Ok::<_, anyhow::Error>((by_you, against_you))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {e}"))??;

    let by_you = by_you_rows
        .into_iter()
        .map(|row| {
            let created_at = parse_stored_timestamp(&row.created_at, &row.id);
            FiledGrievance {
                id: parse_stored_id(&row.id),
                against: Counterparty {
                    id: parse_stored_id(&row.filed_against),
                    name: row.counterparty_name,
                },
                text: row.text,
                created_at,
            }
        })
        .collect();

    let against_you = against_you_rows
        .into_iter()
        .map(|row| {
            let created_at = parse_stored_timestamp(&row.created_at, &row.id);
            ReceivedGrievance {
                id: parse_stored_id(&row.id),
                by: Counterparty {
                    id: parse_stored_id(&row.filed_by),
                    name: row.counterparty_name,
                },
                text: row.text,
                created_at,
            }
        })
        .collect();

    Ok(Json(GrievanceListResponse { by_you, against_you }))
}

fn parse_stored_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}

fn parse_stored_timestamp(raw: &str, grievance_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!(
                "Corrupt created_at '{}' on grievance '{}': {}",
                raw, grievance_id, e
            );
            DateTime::default()
        })
}
