use anyhow::{Context, Result};
use std::env;

/// VAPID application-server keys, URL-safe base64 as produced by
/// `web-push generate-vapid-keys`.
#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}

impl VapidConfig {
    pub fn from_env() -> Result<Self> {
        let private_key = env::var("GRIPE_VAPID_PRIVATE_KEY")
            .context("GRIPE_VAPID_PRIVATE_KEY must be set")?;
        let public_key =
            env::var("GRIPE_VAPID_PUBLIC_KEY").context("GRIPE_VAPID_PUBLIC_KEY must be set")?;
        let subject = env::var("GRIPE_VAPID_SUBJECT")
            .unwrap_or_else(|_| "mailto:admin@example.com".into());

        Ok(Self {
            private_key,
            public_key,
            subject,
        })
    }
}
