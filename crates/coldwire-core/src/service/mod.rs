//! Services: warmup math, capacity planning, dispatch, transport, and
//! draft-generation processing.

pub mod capacity;
pub mod dispatch;
pub mod processor;
pub mod transport;
pub mod warmup;

pub use capacity::{CapacityPlan, CapacitySlot};
pub use dispatch::{
    AccountBreakdown, DispatchConfig, DispatchReason, DispatchReport, Dispatcher, SendWindow,
};
pub use processor::{DEFAULT_MAX_ATTEMPTS, DraftGenerator, JobProcessor, ProcessReport};
pub use transport::{MailTransport, OutgoingEmail, SmtpDefaults, SmtpMailer, TransportError};
pub use warmup::{DEFAULT_MAX_PER_DAY, daily_limit, start_of_day_utc};
