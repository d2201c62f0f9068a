pub mod job;
pub mod snapshot;
pub mod target;
pub mod timestamp;

pub use job::*;
pub use snapshot::*;
pub use target::*;
