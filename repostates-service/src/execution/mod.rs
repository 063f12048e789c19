// Execution Engine Module
// Schedules repository units, reports progress and collects results

pub mod aggregator;
pub mod cancel;
pub mod events;
pub mod executor;

// Re-export key types
pub use aggregator::ResultAggregator;
pub use cancel::CancelToken;
pub use events::{progress_channel, EventSender, ExecutionEvent, ProgressReceiver, ProgressSender};
pub use executor::{RepoScheduler, SchedulerConfig};
