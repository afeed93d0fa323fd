mod error;
mod registry;

pub use error::{AdmissionError, AdmissionResult};
pub use registry::SessionRegistry;
