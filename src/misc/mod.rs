pub mod coordinates;
pub mod floating_point;
pub mod invertible;

pub use coordinates::*;
pub use floating_point::*;
pub use invertible::*;
