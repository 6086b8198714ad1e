/// Entities whose parameter direction can be reversed
/// (knot vectors, curves, and anything built from them).
pub trait Invertible: Clone {
    /// Reverse the parameter direction in place
    fn invert(&mut self);

    /// Return a reversed copy
    fn inverse(&self) -> Self {
        let mut reversed = self.clone();
        reversed.invert();
        reversed
    }
}
