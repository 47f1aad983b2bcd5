use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use gripe_db::Database;

use crate::transport::PushTransport;

/// Payload shown by the device's notification handler.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
}

/// Aggregate outcome of one fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.delivered == self.attempted
    }
}

/// Delivers one logical notification to every device subscription the target
/// user owns.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    db: Arc<Database>,
    transport: Box<dyn PushTransport>,
}

impl Dispatcher {
    pub fn new(db: Arc<Database>, transport: impl PushTransport + 'static) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                db,
                transport: Box::new(transport),
            }),
        }
    }

    /// Fan out `payload` to every subscription `user_id` owns. Deliveries run
    /// concurrently; one failure never blocks or cancels the others. Zero
    /// subscriptions is a successful no-op. Per-endpoint failures are logged
    /// and folded into the report, never returned as errors.
    pub async fn notify_user(
        &self,
        user_id: Uuid,
        payload: &NotificationPayload,
    ) -> anyhow::Result<DispatchReport> {
        let db = self.inner.db.clone();
        let uid = user_id.to_string();
        let subscriptions =
            tokio::task::spawn_blocking(move || db.push_subscriptions_for_user(&uid)).await??;

        if subscriptions.is_empty() {
            return Ok(DispatchReport {
                attempted: 0,
                delivered: 0,
            });
        }

        let body = serde_json::to_vec(payload)?;

        let attempts = subscriptions
            .iter()
            .map(|sub| self.inner.transport.deliver(sub, &body));
        let results = join_all(attempts).await;

        let mut delivered = 0;
        for (sub, result) in subscriptions.iter().zip(&results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => warn!(endpoint = %sub.endpoint, "push delivery failed: {e}"),
            }
        }

        Ok(DispatchReport {
            attempted: subscriptions.len(),
            delivered,
        })
    }
}
