pub mod entities;
pub mod jobs;
pub mod layer;

pub use entities::*;
pub use jobs::*;
pub use layer::*;
