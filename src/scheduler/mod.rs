//! Upload orchestration
//!
//! [`UploadScheduler`] owns the current batch, caps concurrent chunk
//! transfers and routes transfer outcomes back into the file sessions.

pub mod batch;
pub mod error;
pub mod scheduler;

pub use batch::{Dispatch, RetryRequest, UploadBatch};
pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::UploadScheduler;
