mod bus;
mod types;

pub use bus::EventBus;
pub use types::{UploadEvent, INVALID_TYPE_MESSAGE};
