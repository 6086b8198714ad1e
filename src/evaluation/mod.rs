use nalgebra::{DMatrix, Point};

use crate::{error::ensure_shape, knot::KnotVector, misc::FloatingPoint};

/// Evaluate a scalar B-spline curve at `u`
/// `u` on the last knot returns the last control value exactly.
///
/// # Failures
/// - if the knot vector does not match the control values and degree
pub fn curve_point<T: FloatingPoint>(
    degree: usize,
    knots: &KnotVector<T>,
    control_points: &[T],
    u: T,
) -> anyhow::Result<T> {
    knots.ensure_compatible(control_points.len(), degree)?;
    Ok(scalar_curve_point(degree, knots, control_points, u))
}

/// Evaluate a scalar B-spline curve at every sample, in order
/// The iterator is lazy and can be cloned to restart the sweep.
pub fn evaluate_curve<'a, T: FloatingPoint>(
    degree: usize,
    knots: &'a KnotVector<T>,
    control_points: &'a [T],
    samples: &'a [T],
) -> anyhow::Result<impl Iterator<Item = T> + Clone + 'a> {
    knots.ensure_compatible(control_points.len(), degree)?;
    Ok(samples
        .iter()
        .map(move |u| scalar_curve_point(degree, knots, control_points, *u)))
}

pub(crate) fn scalar_curve_point<T: FloatingPoint>(
    degree: usize,
    knots: &KnotVector<T>,
    control_points: &[T],
    u: T,
) -> T {
    let n = control_points.len() - 1;
    if u == knots.last() {
        return control_points[n];
    }
    let span = knots.find_knot_span(n, degree, u);
    let basis = knots.basis_functions(span, u, degree);
    basis
        .iter()
        .enumerate()
        .fold(T::zero(), |acc, (i, b)| acc + *b * control_points[span - degree + i])
}

/// Evaluate a scalar tensor product B-spline surface at `(u, v)`
/// `control_points` has one row per `v` control index and one column per `u` control index.
pub fn surface_point<T: FloatingPoint>(
    u_degree: usize,
    v_degree: usize,
    u_knots: &KnotVector<T>,
    v_knots: &KnotVector<T>,
    control_points: &DMatrix<T>,
    u: T,
    v: T,
) -> anyhow::Result<T> {
    ensure_surface_shape(u_degree, v_degree, u_knots, v_knots, control_points)?;
    Ok(scalar_surface_point(
        u_degree,
        v_degree,
        u_knots,
        v_knots,
        control_points,
        u,
        v,
    ))
}

/// Evaluate a scalar surface on the grid `us x vs`
/// Entry `(i, j)` of the result is the surface at `(us[i], vs[j])`.
pub fn evaluate_surface<T: FloatingPoint>(
    u_degree: usize,
    v_degree: usize,
    u_knots: &KnotVector<T>,
    v_knots: &KnotVector<T>,
    control_points: &DMatrix<T>,
    us: &[T],
    vs: &[T],
) -> anyhow::Result<DMatrix<T>> {
    ensure_surface_shape(u_degree, v_degree, u_knots, v_knots, control_points)?;
    Ok(DMatrix::from_fn(us.len(), vs.len(), |i, j| {
        scalar_surface_point(
            u_degree,
            v_degree,
            u_knots,
            v_knots,
            control_points,
            us[i],
            vs[j],
        )
    }))
}

fn ensure_surface_shape<T: FloatingPoint>(
    u_degree: usize,
    v_degree: usize,
    u_knots: &KnotVector<T>,
    v_knots: &KnotVector<T>,
    control_points: &DMatrix<T>,
) -> anyhow::Result<()> {
    u_knots.ensure_compatible(control_points.ncols(), u_degree)?;
    v_knots.ensure_compatible(control_points.nrows(), v_degree)?;
    Ok(())
}

pub(crate) fn scalar_surface_point<T: FloatingPoint>(
    u_degree: usize,
    v_degree: usize,
    u_knots: &KnotVector<T>,
    v_knots: &KnotVector<T>,
    control_points: &DMatrix<T>,
    u: T,
    v: T,
) -> T {
    let n = control_points.ncols() - 1;
    let m = control_points.nrows() - 1;
    let u_span = u_knots.find_knot_span(n, u_degree, u);
    let v_span = v_knots.find_knot_span(m, v_degree, v);
    let u_basis = u_knots.basis_functions(u_span, u, u_degree);
    let v_basis = v_knots.basis_functions(v_span, v, v_degree);

    let mut value = T::zero();
    for l in 0..=v_degree {
        let row = v_span - v_degree + l;
        let mut temp = T::zero();
        for k in 0..=u_degree {
            temp += u_basis[k] * control_points[(row, u_span - u_degree + k)];
        }
        value += v_basis[l] * temp;
    }
    value
}

/// Euclidean distance between each point and the curve evaluated at its parameter
/// `control_points` holds one scalar control array per axis.
pub fn distance_to_curve<T: FloatingPoint, const D: usize>(
    degree: usize,
    knots: &KnotVector<T>,
    control_points: [&[T]; D],
    params: &[T],
    points: &[Point<T, D>],
) -> anyhow::Result<Vec<T>> {
    ensure_shape!(
        params.len() == points.len(),
        "Got {} parameters for {} points",
        params.len(),
        points.len()
    );
    for axis in control_points.iter() {
        knots.ensure_compatible(axis.len(), degree)?;
    }

    Ok(params
        .iter()
        .zip(points.iter())
        .map(|(u, p)| {
            let evaluated = Point::<T, D>::from(nalgebra::SVector::<T, D>::from_fn(|i, _| {
                scalar_curve_point(degree, knots, control_points[i], *u)
            }));
            (evaluated - p).norm()
        })
        .collect())
}
