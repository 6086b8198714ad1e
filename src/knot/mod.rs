pub mod clustering;
pub mod knot_strategy;
pub mod knot_vector;
pub use clustering::*;
pub use knot_strategy::*;
pub use knot_vector::*;
