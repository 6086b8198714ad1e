use nalgebra::{convert, DMatrix, DVector};

use crate::{error::ensure_shape, knot::KnotVector, misc::FloatingPoint};

/// Options of the scalar least squares fit
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeastSquaresOptions<T> {
    /// Ridge term `s` added to the diagonal of the normal equations
    pub smoothing: T,
    /// Singular values at or below this are dropped from the solve
    pub tolerance: T,
    /// Scale of the second difference penalty on the control values
    pub penalty: T,
    /// Per control value weights of the penalty, ones when `None`
    pub weights: Option<Vec<T>>,
}

impl<T: FloatingPoint> Default for LeastSquaresOptions<T> {
    fn default() -> Self {
        Self {
            smoothing: T::zero(),
            tolerance: convert(1e-6),
            penalty: T::zero(),
            weights: None,
        }
    }
}

impl<T: FloatingPoint> LeastSquaresOptions<T> {
    pub fn with_smoothing(mut self, smoothing: T) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_penalty(mut self, penalty: T) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_weights(mut self, weights: Vec<T>) -> Self {
        self.weights = Some(weights);
        self
    }
}

/// Control values of a scalar fit and the residual norm of the solved system
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarFit<T> {
    pub control_points: Vec<T>,
    pub residual: T,
}

/// Fit the scalar samples `y(x)` with a B-spline on the knot vector `knots`
///
/// Solves `(A^T A + sI + R) c = A^T y` where `A` is the collocation matrix and
/// `R = penalty * D^T diag(w) D` penalizes second differences of the control values.
/// The residual is `||A c - y||` of the solved system, measured before the first and last
/// control values are pinned to `y[0]` and `y[last]`.
///
/// # Failures
/// - if `x` and `y` differ in length or are empty
/// - if the knot vector is too short for the degree
/// - if the number of weights differs from the number of control values
pub fn fit_scalar<T: FloatingPoint>(
    x: &[T],
    y: &[T],
    knots: &KnotVector<T>,
    degree: usize,
    options: &LeastSquaresOptions<T>,
) -> anyhow::Result<ScalarFit<T>> {
    ensure_shape!(
        x.len() == y.len(),
        "Got {} parameters for {} values",
        x.len(),
        y.len()
    );
    ensure_shape!(!x.is_empty(), "Nothing to fit");
    ensure_shape!(
        knots.len() >= 2 * (degree + 1),
        "A knot vector of length {} is too short for degree {}",
        knots.len(),
        degree
    );

    let count = knots.control_point_count(degree);
    let a = collocation_matrix(x, knots, degree);
    let b = DVector::from_column_slice(y);

    let weights = match &options.weights {
        Some(w) => {
            ensure_shape!(
                w.len() == count,
                "Got {} weights for {} control values",
                w.len(),
                count
            );
            DVector::from_column_slice(w)
        }
        None => DVector::from_element(count, T::one()),
    };
    let d = derivative_matrix::<T>(count);
    let r = d.transpose() * DMatrix::from_diagonal(&weights) * &d * options.penalty;

    let solution = regularized_pseudo_inverse_solve(
        &a,
        &b,
        options.smoothing,
        options.tolerance,
        Some(&r),
    )?;
    let residual = (&a * &solution - &b).norm();

    let mut control_points: Vec<T> = solution.iter().copied().collect();
    control_points[0] = y[0];
    control_points[count - 1] = y[y.len() - 1];

    Ok(ScalarFit {
        control_points,
        residual,
    })
}

/// Row `i` holds the non-vanishing basis functions at `x[i]`
pub(crate) fn collocation_matrix<T: FloatingPoint>(
    x: &[T],
    knots: &KnotVector<T>,
    degree: usize,
) -> DMatrix<T> {
    let count = knots.control_point_count(degree);
    let n = count - 1;
    let mut a = DMatrix::zeros(x.len(), count);
    for (i, xi) in x.iter().enumerate() {
        let span = knots.find_knot_span(n, degree, *xi);
        let basis = knots.basis_functions(span, *xi, degree);
        for (j, nj) in basis.into_iter().enumerate() {
            a[(i, span + j - degree)] = nj;
        }
    }
    a
}

/// Second difference operator over `n` control values
///
/// Interior rows hold the `[1, -2, 1]` stencil centered on the diagonal,
/// the first row the forward stencil and the last row the backward stencil.
/// Two values only support `[[-1, 1], [-1, 1]]`; fewer give a zero matrix.
pub fn derivative_matrix<T: FloatingPoint>(n: usize) -> DMatrix<T> {
    let one = T::one();
    let two = one + one;
    let mut d = DMatrix::zeros(n, n);
    match n {
        0 | 1 => {}
        2 => {
            d[(0, 0)] = -one;
            d[(0, 1)] = one;
            d[(1, 0)] = -one;
            d[(1, 1)] = one;
        }
        _ => {
            d[(0, 0)] = one;
            d[(0, 1)] = -two;
            d[(0, 2)] = one;
            for i in 1..n - 1 {
                d[(i, i - 1)] = one;
                d[(i, i)] = -two;
                d[(i, i + 1)] = one;
            }
            d[(n - 1, n - 3)] = one;
            d[(n - 1, n - 2)] = -two;
            d[(n - 1, n - 1)] = one;
        }
    }
    d
}

/// Solve the regularized normal equations `(A^T A + sI + R) x = A^T b`
/// by a truncated singular value decomposition.
pub fn regularized_pseudo_inverse_solve<T: FloatingPoint>(
    a: &DMatrix<T>,
    b: &DVector<T>,
    smoothing: T,
    tolerance: T,
    regularization: Option<&DMatrix<T>>,
) -> anyhow::Result<DVector<T>> {
    ensure_shape!(
        a.nrows() == b.len(),
        "Matrix has {} rows, right hand side has {}",
        a.nrows(),
        b.len()
    );
    let at = a.transpose();
    let mut m = &at * a + DMatrix::identity(a.ncols(), a.ncols()) * smoothing;
    if let Some(r) = regularization {
        ensure_shape!(
            r.shape() == m.shape(),
            "Regularization matrix is {:?}, expected {:?}",
            r.shape(),
            m.shape()
        );
        m += r;
    }
    let rhs = at * b;

    let svd = m.svd(true, true);
    svd.solve(&rhs, tolerance)
        .map_err(|e| anyhow::anyhow!("Solve failed: {}", e))
}
