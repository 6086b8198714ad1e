use nalgebra::{convert, DMatrix, DVector, Point3, Vector3};

use crate::{
    error::{ensure_argument, ensure_shape},
    fit::regularized_pseudo_inverse_solve,
    knot::KnotVector,
    misc::FloatingPoint,
    surface::BSplineSurface,
};

/// Options of the scalar surface fit
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceFitOptions<T> {
    /// Ridge term added to the diagonal of the normal equations
    pub smoothing: T,
    /// Scale of the Laplacian penalty on the control grid
    pub penalty: T,
    /// Singular values at or below this are dropped from the solve
    pub tolerance: T,
    /// Sample indices whose values are pinned onto the nearest corners of the control grid
    pub corners: Option<[usize; 4]>,
}

impl<T: FloatingPoint> Default for SurfaceFitOptions<T> {
    fn default() -> Self {
        Self {
            smoothing: convert(0.2),
            penalty: convert(0.1),
            tolerance: convert(1e-12),
            corners: None,
        }
    }
}

impl<T: FloatingPoint> SurfaceFitOptions<T> {
    pub fn with_smoothing(mut self, smoothing: T) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_penalty(mut self, penalty: T) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_corners(mut self, corners: [usize; 4]) -> Self {
        self.corners = Some(corners);
        self
    }
}

/// Scalar control grid of a surface fit, one row per `v` control index
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarSurfaceFit<T: FloatingPoint> {
    pub control_points: DMatrix<T>,
    pub residual: T,
}

/// Surface fitted to three dimensional samples with the residual of each axis
#[derive(Clone, Debug)]
pub struct SurfaceFit<T: FloatingPoint> {
    pub surface: BSplineSurface<T>,
    pub residuals: Vector3<T>,
}

/// Second differences along `u` and `v` of a control grid flattened as `i + j * su`
/// Each direction only contributes to rows with neighbors on both sides in that direction.
pub fn laplacian_matrix<T: FloatingPoint>(su: usize, sv: usize) -> DMatrix<T> {
    let one = T::one();
    let two = one + one;
    let mut d = DMatrix::zeros(su * sv, su * sv);
    for i in 1..su.saturating_sub(1) {
        for j in 0..sv {
            let row = i + j * su;
            d[(row, row - 1)] += one;
            d[(row, row)] -= two;
            d[(row, row + 1)] += one;
        }
    }
    for i in 0..su {
        for j in 1..sv.saturating_sub(1) {
            let row = i + j * su;
            d[(row, row)] -= two;
            d[(row, row - su)] += one;
            d[(row, row + su)] += one;
        }
    }
    d
}

/// Fit the scalar samples `z(u, v)` with a tensor product B-spline on `u_knots x v_knots`
///
/// The penalty is `R = penalty * D^T D / h^2` with `D` the Laplacian of the control grid and
/// `h = 1 / (nu - 1)` where `nu + 1` is the number of `u` control values.
///
/// # Failures
/// - if `u`, `v` and `z` differ in length or are empty
/// - if a knot vector is too short for its degree
/// - if a corner index is out of range
#[allow(clippy::too_many_arguments)]
pub fn fit_surface_scalar<T: FloatingPoint>(
    u: &[T],
    v: &[T],
    z: &[T],
    u_knots: &KnotVector<T>,
    v_knots: &KnotVector<T>,
    u_degree: usize,
    v_degree: usize,
    options: &SurfaceFitOptions<T>,
) -> anyhow::Result<ScalarSurfaceFit<T>> {
    ensure_shape!(
        u.len() == v.len() && u.len() == z.len(),
        "Got {} u, {} v parameters for {} values",
        u.len(),
        v.len(),
        z.len()
    );
    ensure_shape!(!z.is_empty(), "Nothing to fit");
    ensure_shape!(
        u_knots.len() >= 2 * (u_degree + 1) && v_knots.len() >= 2 * (v_degree + 1),
        "Knot vectors are too short for degrees ({}, {})",
        u_degree,
        v_degree
    );
    if let Some(corners) = &options.corners {
        ensure_argument!(
            corners.iter().all(|c| *c < z.len()),
            "Corner indices {:?} exceed the {} samples",
            corners,
            z.len()
        );
    }

    let su = u_knots.control_point_count(u_degree);
    let sv = v_knots.control_point_count(v_degree);
    let (nu, nv) = (su - 1, sv - 1);

    let mut a = DMatrix::zeros(z.len(), su * sv);
    for i in 0..z.len() {
        let span_u = u_knots.find_knot_span(nu, u_degree, u[i]);
        let span_v = v_knots.find_knot_span(nv, v_degree, v[i]);
        let basis_u = u_knots.basis_functions(span_u, u[i], u_degree);
        let basis_v = v_knots.basis_functions(span_v, v[i], v_degree);
        for (k, nk) in basis_u.iter().enumerate() {
            for (l, nl) in basis_v.iter().enumerate() {
                a[(i, (span_v + l - v_degree) * su + (span_u + k - u_degree))] = *nk * *nl;
            }
        }
    }
    let b = DVector::from_column_slice(z);

    let d = laplacian_matrix::<T>(su, sv);
    let h = if nu > 1 {
        T::one() / convert::<f64, T>((nu - 1) as f64)
    } else {
        T::one()
    };
    let r = d.transpose() * &d * (options.penalty / (h * h));

    let solution =
        regularized_pseudo_inverse_solve(&a, &b, options.smoothing, options.tolerance, Some(&r))?;
    let residual = (&a * &solution - &b).norm();

    let mut control_points = DMatrix::from_fn(sv, su, |row, col| solution[col + row * su]);

    if let Some(corners) = &options.corners {
        let (u0, u1) = u_knots.domain(u_degree);
        let (v0, v1) = v_knots.domain(v_degree);
        let two = T::one() + T::one();
        for &index in corners {
            let col = if u[index] - u0 <= (u1 - u0) / two { 0 } else { nu };
            let row = if v[index] - v0 <= (v1 - v0) / two { 0 } else { nv };
            control_points[(row, col)] = z[index];
        }
    }

    Ok(ScalarSurfaceFit {
        control_points,
        residual,
    })
}

/// Fit a surface through three dimensional samples parameterized by `(u, v)`
/// Each axis is fitted independently with the same options.
#[allow(clippy::too_many_arguments)]
pub fn fit_surface<T: FloatingPoint>(
    u: &[T],
    v: &[T],
    points: &[Point3<T>],
    u_knots: &KnotVector<T>,
    v_knots: &KnotVector<T>,
    u_degree: usize,
    v_degree: usize,
    options: &SurfaceFitOptions<T>,
) -> anyhow::Result<SurfaceFit<T>> {
    let mut grids = vec![];
    let mut residuals = Vector3::zeros();
    for axis in 0..3 {
        let values: Vec<T> = points.iter().map(|p| p[axis]).collect();
        let fit = fit_surface_scalar(
            u, v, &values, u_knots, v_knots, u_degree, v_degree, options,
        )?;
        residuals[axis] = fit.residual;
        grids.push(fit.control_points);
    }

    let [x, y, z]: [DMatrix<T>; 3] = grids
        .try_into()
        .map_err(|_| anyhow::anyhow!("Expected three axis grids"))?;
    let surface = BSplineSurface::try_from_axis_grids(
        u_degree,
        v_degree,
        u_knots.clone(),
        v_knots.clone(),
        [x, y, z],
    )?;

    Ok(SurfaceFit { surface, residuals })
}
