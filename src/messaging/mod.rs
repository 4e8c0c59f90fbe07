pub mod channels;
pub mod frontend;
pub mod notification;

pub use channels::{NotificationConsumer, NotificationProducer, create_notification_channel};
pub use frontend::{CancelToken, Frontend, NoProgress, NotificationFrontend, Progress, ViewState};
pub use notification::{Notification, NotificationCategory, NotificationLevel};
