pub mod bounds;
pub mod error;
pub mod pan;
pub mod transform;
pub mod view;
pub mod zoom;

pub use bounds::*;
pub use error::*;
pub use pan::*;
pub use transform::*;
pub use view::*;
pub use zoom::*;
