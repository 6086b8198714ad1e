#![allow(clippy::needless_range_loop)]

mod basis;
mod curve;
mod error;
mod evaluation;
mod fit;
mod knot;
mod misc;
mod parameterization;
mod surface;
mod transfinite;

pub mod prelude {
    pub use crate::basis::*;
    pub use crate::curve::*;
    pub use crate::error::SplineFitError;
    pub use crate::evaluation::*;
    pub use crate::fit::*;
    pub use crate::knot::*;
    pub use crate::misc::*;
    pub use crate::parameterization::*;
    pub use crate::surface::*;
    pub use crate::transfinite::*;
}
