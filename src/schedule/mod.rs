pub mod clock;
pub mod scheduler;
pub mod supervisor;

pub use clock::{Clock, SystemClock};
pub use scheduler::{SchedulerSettings, SportScheduler};
pub use supervisor::{Reconciliation, SeasonSupervisor};
