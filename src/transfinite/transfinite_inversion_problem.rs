use argmin::core::{CostFunction, Operator};
use nalgebra::{Point2, Vector2};

use crate::{misc::FloatingPoint, transfinite::TransfiniteMap};

/// Residual provider for inverting a transfinite map at a target point
pub struct TransfiniteInversionProblem<'a, T: FloatingPoint> {
    map: &'a TransfiniteMap<T>,
    target: &'a Point2<T>,
}

impl<'a, T: FloatingPoint> TransfiniteInversionProblem<'a, T> {
    pub fn new(map: &'a TransfiniteMap<T>, target: &'a Point2<T>) -> Self {
        Self { map, target }
    }
}

impl<T: FloatingPoint> Operator for TransfiniteInversionProblem<'_, T> {
    type Param = Vector2<T>;
    type Output = Vector2<T>;

    fn apply(&self, param: &Self::Param) -> Result<Self::Output, anyhow::Error> {
        Ok(self.map.residual(param.x, param.y, self.target))
    }
}

impl<T: FloatingPoint> CostFunction for TransfiniteInversionProblem<'_, T> {
    type Param = Vector2<T>;
    type Output = T;

    /// Largest absolute component of the residual
    fn cost(&self, param: &Self::Param) -> Result<Self::Output, anyhow::Error> {
        Ok(self.map.residual(param.x, param.y, self.target).amax())
    }
}
