pub mod daily;
pub mod feedback;
pub mod records;
pub mod session;
pub mod similar;

pub use daily::DailyTracker;
pub use session::{DrillEvent, DrillState, SessionState};
pub use similar::{PregenState, SimilarCache};
