use base64::URL_SAFE_NO_PAD;
use futures_util::future::BoxFuture;
use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushMessageBuilder,
};

use gripe_db::models::PushSubscriptionRow;

use crate::vapid::VapidConfig;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to build push message: {0}")]
    Build(String),
    #[error("push endpoint rejected delivery: {0}")]
    Send(String),
}

/// Seam between the dispatcher and the Web Push wire protocol. Tests swap in
/// a scripted implementation.
pub trait PushTransport: Send + Sync {
    fn deliver<'a>(
        &'a self,
        subscription: &'a PushSubscriptionRow,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), DeliveryError>>;
}

/// Production transport: VAPID-signed, aes128gcm-encoded Web Push messages.
pub struct WebPushTransport {
    client: HyperWebPushClient,
    vapid: VapidConfig,
}

impl WebPushTransport {
    pub fn new(vapid: VapidConfig) -> Self {
        Self {
            client: HyperWebPushClient::new(),
            vapid,
        }
    }
}

impl PushTransport for WebPushTransport {
    fn deliver<'a>(
        &'a self,
        subscription: &'a PushSubscriptionRow,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async move {
            let info = SubscriptionInfo::new(
                subscription.endpoint.clone(),
                subscription.p256dh.clone(),
                subscription.auth.clone(),
            );

            let mut signature =
                VapidSignatureBuilder::from_base64(&self.vapid.private_key, URL_SAFE_NO_PAD, &info)
                    .map_err(|e| DeliveryError::Build(e.to_string()))?;
            signature.add_claim("sub", self.vapid.subject.clone());

            let mut builder = WebPushMessageBuilder::new(&info);
            builder.set_payload(ContentEncoding::Aes128Gcm, payload);
            builder.set_vapid_signature(
                signature
                    .build()
                    .map_err(|e| DeliveryError::Build(e.to_string()))?,
            );

            let message = builder
                .build()
                .map_err(|e| DeliveryError::Build(e.to_string()))?;

            self.client
                .send(message)
                .await
                .map_err(|e| DeliveryError::Send(e.to_string()))
        })
    }
}
