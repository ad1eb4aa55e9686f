mod clock;
mod dispatcher;
mod local_dispatcher;
mod registry;
mod reminder_scheduler;

pub mod message;
pub mod policy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{
    NotificationDispatcher, NotificationHandle, NotificationPayload, NotificationRequest,
    ReminderPayload,
};
pub use local_dispatcher::{FiredNotification, LocalNotificationDispatcher};
pub use registry::ScheduledReminder;
pub use reminder_scheduler::{DispatchFailure, ReminderScheduler, ScheduleReport};
