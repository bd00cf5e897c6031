mod handler;
mod model;

pub use handler::{NotificationPoller, NotificationSource, PollerHandle};
pub use model::NotificationSummary;
