use nalgebra::{Point, SVector};

use crate::{
    curve::BSplineCurve,
    error::{ensure_argument, ensure_shape},
    fit::{fit_scalar, LeastSquaresOptions},
    knot::KnotVector,
    misc::FloatingPoint,
    parameterization::{chord_length, linear_range_map},
};

/// Curve fitted to points with the residual of each axis
#[derive(Clone, Debug)]
pub struct CurveFit<T: FloatingPoint, const D: usize> {
    pub curve: BSplineCurve<T, D>,
    pub residuals: SVector<T, D>,
}

impl<T: FloatingPoint, const D: usize> CurveFit<T, D> {
    /// Euclidean norm of the per-axis residuals
    pub fn residual(&self) -> T {
        self.residuals.norm()
    }
}

/// How interior knots are placed over the chord length parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KnotPlacement {
    #[default]
    Uniform,
    Clustered,
    Averaged,
}

impl KnotPlacement {
    /// Build a clamped knot vector on `[0, 1]` with `interior` interior knots
    pub fn knots<T: FloatingPoint>(
        &self,
        params: &[T],
        interior: usize,
        degree: usize,
    ) -> anyhow::Result<KnotVector<T>> {
        let (a, b) = (T::zero(), T::one());
        match self {
            KnotPlacement::Uniform => Ok(KnotVector::uniform(interior, degree, a, b)),
            KnotPlacement::Clustered => {
                KnotVector::try_clustered(params, None, interior, degree, a, b)
            }
            KnotPlacement::Averaged => KnotVector::try_averaged(params, interior, degree, a, b),
        }
    }
}

/// Fit a curve through `points` parameterized by `params`
/// Each axis is fitted independently with the same options.
pub fn fit_curve<T: FloatingPoint, const D: usize>(
    params: &[T],
    points: &[Point<T, D>],
    knots: &KnotVector<T>,
    degree: usize,
    options: &LeastSquaresOptions<T>,
) -> anyhow::Result<CurveFit<T, D>> {
    ensure_shape!(
        params.len() == points.len(),
        "Got {} parameters for {} points",
        params.len(),
        points.len()
    );

    let mut axes = Vec::with_capacity(D);
    let mut residuals = SVector::<T, D>::zeros();
    for axis in 0..D {
        let values: Vec<T> = points.iter().map(|p| p[axis]).collect();
        let fit = fit_scalar(params, &values, knots, degree, options)?;
        residuals[axis] = fit.residual;
        axes.push(fit.control_points);
    }

    let count = knots.control_point_count(degree);
    let control_points = (0..count)
        .map(|i| Point::from(SVector::<T, D>::from_fn(|axis, _| axes[axis][i])))
        .collect();
    let curve = BSplineCurve::try_new(degree, control_points, knots.clone())?;

    Ok(CurveFit { curve, residuals })
}

/// Fit a curve with `interior` interior knots to `points`
/// using the chord length parameterization on `[0, 1]`
pub fn fit_planar_curve<T: FloatingPoint, const D: usize>(
    points: &[Point<T, D>],
    interior: usize,
    degree: usize,
    placement: KnotPlacement,
    smoothing: T,
) -> anyhow::Result<CurveFit<T, D>> {
    let params = chord_length(points, T::zero(), T::one());
    let knots = placement.knots(&params, interior, degree)?;
    let options = LeastSquaresOptions::default().with_smoothing(smoothing);
    fit_curve(&params, points, &knots, degree, &options)
}

/// Fit a curve with `interior` uniform interior knots to `points`,
/// parameterized by the coordinate `axis` mapped onto `[0, 1]`
pub fn fit_planar_curve_by_axis<T: FloatingPoint, const D: usize>(
    points: &[Point<T, D>],
    interior: usize,
    degree: usize,
    axis: usize,
) -> anyhow::Result<CurveFit<T, D>> {
    ensure_argument!(axis < D, "Axis {} is out of range for dimension {}", axis, D);
    let coordinates: Vec<T> = points.iter().map(|p| p[axis]).collect();
    let params = linear_range_map(&coordinates, T::zero(), T::one());
    let knots = KnotVector::uniform(interior, degree, T::zero(), T::one());
    fit_curve(
        &params,
        points,
        &knots,
        degree,
        &LeastSquaresOptions::default(),
    )
}
