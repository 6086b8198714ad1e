pub mod transfinite_inversion_broyden;
pub mod transfinite_inversion_problem;
pub mod transfinite_map;

pub use transfinite_inversion_broyden::*;
pub use transfinite_inversion_problem::*;
pub use transfinite_map::*;
