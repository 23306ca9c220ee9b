mod check_data;
mod contact;
mod event;
mod ids;
mod notification;
mod schedule;
mod state;
mod subscription;
mod trigger;

pub use check_data::{CheckData, MetricState};
pub use contact::Contact;
pub use event::NotificationEvent;
pub use ids::{ContactId, OwnerId, SubscriptionId, TriggerId};
pub use notification::{DispatchKey, ScheduledNotification, TriggerData};
pub use schedule::{Schedule, ScheduleDay};
pub use state::{State, TtlState};
pub use subscription::{PlottingOptions, Subscription};
pub use trigger::{Trigger, TriggerType};
