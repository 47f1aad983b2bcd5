pub mod dispatcher;
pub mod transport;
pub mod vapid;

pub use dispatcher::{DispatchReport, Dispatcher, NotificationPayload};
pub use transport::{DeliveryError, PushTransport, WebPushTransport};
pub use vapid::VapidConfig;
