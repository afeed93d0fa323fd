mod error;
mod types;

pub use error::{ConfigError, ConfigResult};
pub use types::{OversizePolicy, UploadConfig};
