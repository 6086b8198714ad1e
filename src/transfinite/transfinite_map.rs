use argmin::core::{ArgminFloat, Executor, State};
use nalgebra::{convert, Point2, RealField, Vector2};

use crate::{
    curve::BSplineCurve2D,
    error::ensure_argument,
    misc::{Coordinates, FloatingPoint, Invertible},
    transfinite::{TransfiniteInversionBroyden, TransfiniteInversionProblem},
};

/// Options of the transfinite map inversion
#[derive(Clone, Debug, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InversionOptions<T> {
    /// Largest absolute residual component accepted as converged
    pub tolerance: T,
    /// Maximum number of iterations
    pub max_iters: u64,
}

impl<T: FloatingPoint> Default for InversionOptions<T> {
    fn default() -> Self {
        Self {
            tolerance: convert(1e-2),
            max_iters: 30,
        }
    }
}

impl<T: FloatingPoint> InversionOptions<T> {
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }
}

/// Result of inverting a transfinite map
#[derive(Clone, Debug, PartialEq)]
pub struct Inversion<T: FloatingPoint> {
    /// Best parameter found, clamped into the unit square
    pub parameter: Vector2<T>,
    /// Best parameter found, before clamping
    pub raw: Vector2<T>,
    /// Largest absolute residual component at `raw`
    pub residual: T,
    pub converged: bool,
    pub iterations: u64,
}

/// Transfinite (Coons) interpolation of four boundary curves over the unit square
///
/// `left` and `right` run along `v`, `bottom` and `top` run along `u`.
/// Each boundary is evaluated by mapping `[0, 1]` onto its knot domain.
#[derive(Clone, Debug)]
pub struct TransfiniteMap<T: FloatingPoint> {
    left: BSplineCurve2D<T>,
    right: BSplineCurve2D<T>,
    bottom: BSplineCurve2D<T>,
    top: BSplineCurve2D<T>,
}

impl<T: FloatingPoint> TransfiniteMap<T> {
    /// Create a map from four boundaries
    /// Boundaries are reversed where needed so that `bottom` and `top` run towards increasing x
    /// and `left` and `right` towards increasing y.
    /// # Failures
    /// - if a boundary has an empty knot domain
    pub fn try_new(
        left: BSplineCurve2D<T>,
        right: BSplineCurve2D<T>,
        bottom: BSplineCurve2D<T>,
        top: BSplineCurve2D<T>,
    ) -> anyhow::Result<Self> {
        for (name, curve) in [
            ("left", &left),
            ("right", &right),
            ("bottom", &bottom),
            ("top", &top),
        ] {
            let (a, b) = curve.knots_domain();
            ensure_argument!(a < b, "The {} boundary has an empty knot domain", name);
        }

        Ok(Self {
            left: oriented(left, 1),
            right: oriented(right, 1),
            bottom: oriented(bottom, 0),
            top: oriented(top, 0),
        })
    }

    pub fn left(&self) -> &BSplineCurve2D<T> {
        &self.left
    }

    pub fn right(&self) -> &BSplineCurve2D<T> {
        &self.right
    }

    pub fn bottom(&self) -> &BSplineCurve2D<T> {
        &self.bottom
    }

    pub fn top(&self) -> &BSplineCurve2D<T> {
        &self.top
    }

    /// Evaluate the map at `(u, v)`
    pub fn point_at(&self, u: T, v: T) -> Point2<T> {
        let one = T::one();
        let (l, r) = (boundary(&self.left, v), boundary(&self.right, v));
        let (b, t) = (boundary(&self.bottom, u), boundary(&self.top, u));

        let (b0, b1) = (boundary(&self.bottom, T::zero()), boundary(&self.bottom, one));
        let (t0, t1) = (boundary(&self.top, T::zero()), boundary(&self.top, one));
        let (l0, l1) = (boundary(&self.left, T::zero()), boundary(&self.left, one));
        let (r0, r1) = (boundary(&self.right, T::zero()), boundary(&self.right, one));

        let blend = |lv: T, rv: T, bu: T, tu: T| {
            (one - u) * lv + u * rv + (one - v) * bu + v * tu
        };
        let x = blend(l.x, r.x, b.x, t.x)
            - (one - u) * (one - v) * b0.x
            - (one - u) * v * t0.x
            - u * (one - v) * b1.x
            - u * v * t1.x;
        let y = blend(l.y, r.y, b.y, t.y)
            - (one - u) * (one - v) * l0.y
            - (one - u) * v * l1.y
            - u * (one - v) * r0.y
            - u * v * r1.y;
        Point2::new(x, y)
    }

    /// `point_at(u, v) - target`
    pub fn residual(&self, u: T, v: T, target: &Point2<T>) -> Vector2<T> {
        self.point_at(u, v) - target
    }

    /// Find `(u, v)` with `point_at(u, v) == target` starting from `initial`
    ///
    /// Running out of iterations is not an error; check `Inversion::converged`.
    pub fn invert(
        &self,
        target: &Point2<T>,
        initial: Vector2<T>,
        options: &InversionOptions<T>,
    ) -> anyhow::Result<Inversion<T>>
    where
        T: ArgminFloat,
    {
        let problem = TransfiniteInversionProblem::new(self, target);
        let solver = TransfiniteInversionBroyden::new().with_cost_tolerance(options.tolerance);

        let res = Executor::new(problem, solver)
            .configure(|state| state.param(initial).max_iters(options.max_iters))
            .run()?;

        let state = res.state();
        let raw = state
            .get_best_param()
            .or(state.get_param())
            .copied()
            .unwrap_or(initial);
        let residual = self.residual(raw.x, raw.y, target).amax();
        let converged = residual <= options.tolerance;

        #[cfg(feature = "log")]
        if !converged {
            log::warn!(
                "transfinite inversion did not converge after {} iterations, residual: {:?}",
                state.get_iter(),
                residual
            );
        }

        let unit = |x: T| RealField::clamp(x, T::zero(), T::one());
        Ok(Inversion {
            parameter: Vector2::new(unit(raw.x), unit(raw.y)),
            raw,
            residual,
            converged,
            iterations: state.get_iter(),
        })
    }
}

/// Reverse `curve` if its start lies beyond its end along `axis`
fn oriented<T: FloatingPoint>(curve: BSplineCurve2D<T>, axis: usize) -> BSplineCurve2D<T> {
    let (start, end) = (boundary(&curve, T::zero()), boundary(&curve, T::one()));
    if start[axis] > end[axis] {
        curve.inverse()
    } else {
        curve
    }
}

/// Evaluate a boundary at `s` in `[0, 1]` mapped onto its knot domain
fn boundary<T: FloatingPoint>(curve: &BSplineCurve2D<T>, s: T) -> Point2<T> {
    let (a, b) = curve.knots_domain();
    let t = if s == T::one() { b } else { a + (b - a) * s };
    curve.point_at(t, Coordinates::Local)
}

/// Invert the transfinite map of four boundaries at `target` with default options
/// and return the parameter clamped into the unit square.
pub fn uv_inverse<T: FloatingPoint + ArgminFloat>(
    target: &Point2<T>,
    initial: Vector2<T>,
    left: &BSplineCurve2D<T>,
    right: &BSplineCurve2D<T>,
    bottom: &BSplineCurve2D<T>,
    top: &BSplineCurve2D<T>,
) -> anyhow::Result<Vector2<T>> {
    let map = TransfiniteMap::try_new(left.clone(), right.clone(), bottom.clone(), top.clone())?;
    let inversion = map.invert(target, initial, &InversionOptions::default())?;
    Ok(inversion.parameter)
}
