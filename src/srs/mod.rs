pub mod intervals;
pub mod scheduler;

pub use intervals::{interval_days, next_due, RETRY_DELAY_MINUTES};
pub use scheduler::pick_next;
