pub mod error;
pub mod planner;
pub mod types;

pub use error::{ChunkError, ChunkResult};
pub use planner::{plan, ChunkPlanner};
pub use types::ChunkDescriptor;
