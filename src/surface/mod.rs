pub mod bspline_surface;
pub use bspline_surface::*;
