use nalgebra::{convert, Point};

use crate::{
    error::ensure_argument,
    fit::{fit_planar_curve, CurveFit, KnotPlacement},
    misc::FloatingPoint,
};

/// Options of the progressive knot refinement
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressiveFitOptions<T> {
    /// Refinement stops once the residual norm is at or below this
    pub target_residual: T,
    /// Refinement stops before the interior knot count reaches this
    pub max_interior_knots: usize,
    pub degree: usize,
    pub initial_interior_knots: usize,
    /// Interior knots added per iteration
    pub knot_step: usize,
    pub placement: KnotPlacement,
    /// Ridge term of each least squares solve
    pub smoothing: T,
}

impl<T: FloatingPoint> Default for ProgressiveFitOptions<T> {
    fn default() -> Self {
        Self {
            target_residual: convert(0.1),
            max_interior_knots: 100,
            degree: 3,
            initial_interior_knots: 2,
            knot_step: 2,
            placement: KnotPlacement::Uniform,
            smoothing: T::zero(),
        }
    }
}

impl<T: FloatingPoint> ProgressiveFitOptions<T> {
    pub fn with_target_residual(mut self, target_residual: T) -> Self {
        self.target_residual = target_residual;
        self
    }

    pub fn with_max_interior_knots(mut self, max_interior_knots: usize) -> Self {
        self.max_interior_knots = max_interior_knots;
        self
    }

    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn with_initial_interior_knots(mut self, initial_interior_knots: usize) -> Self {
        self.initial_interior_knots = initial_interior_knots;
        self
    }

    pub fn with_knot_step(mut self, knot_step: usize) -> Self {
        self.knot_step = knot_step;
        self
    }

    pub fn with_placement(mut self, placement: KnotPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_smoothing(mut self, smoothing: T) -> Self {
        self.smoothing = smoothing;
        self
    }
}

/// Outcome of `fit_progressive`
#[derive(Clone, Debug)]
pub struct ProgressiveFit<T: FloatingPoint, const D: usize> {
    /// The last fit computed
    pub fit: CurveFit<T, D>,
    /// Residual norm of the last fit
    pub residual: T,
    /// Interior knot count of the last fit
    pub interior_knots: usize,
    pub iterations: usize,
}

/// Fit `points` with an increasing number of interior knots
/// until the residual norm reaches the target or the knot cap is hit.
/// At least one fit is always computed.
pub fn fit_progressive<T: FloatingPoint, const D: usize>(
    points: &[Point<T, D>],
    options: &ProgressiveFitOptions<T>,
) -> anyhow::Result<ProgressiveFit<T, D>> {
    ensure_argument!(options.knot_step > 0, "Knot step must be positive");

    let mut interior = options.initial_interior_knots;
    let mut iterations = 0;
    loop {
        iterations += 1;
        let fit = fit_planar_curve(
            points,
            interior,
            options.degree,
            options.placement,
            options.smoothing,
        )?;
        let residual = fit.residual();

        #[cfg(feature = "log")]
        log::debug!(
            "iteration: {}, interior knots: {}, residual: {:?}",
            iterations,
            interior,
            residual
        );

        let next = interior + options.knot_step;
        if residual <= options.target_residual || next >= options.max_interior_knots {
            return Ok(ProgressiveFit {
                fit,
                residual,
                interior_knots: interior,
                iterations,
            });
        }
        interior = next;
    }
}
