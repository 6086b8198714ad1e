pub mod curve_fit;
pub mod least_squares;
pub mod progressive;
pub mod surface_fit;

pub use curve_fit::*;
pub use least_squares::*;
pub use progressive::*;
pub use surface_fit::*;

#[cfg(test)]
mod tests;
