use std::ops::Index;

use nalgebra::convert;
use simba::scalar::SupersetOf;

use crate::{
    error::{ensure_argument, ensure_shape},
    knot::{cluster_centers, ClusterOptions},
    misc::{FloatingPoint, Invertible},
};

/// Knot vector representation
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnotVector<T>(Vec<T>);

impl<T: FloatingPoint> KnotVector<T> {
    pub fn new(knots: Vec<T>) -> Self {
        Self(knots)
    }

    /// Create a clamped knot vector from the given interior knots
    /// the bounds `a` and `b` are repeated `degree + 1` times
    fn clamped(interior: impl IntoIterator<Item = T>, degree: usize, a: T, b: T) -> Self {
        let mut knots = vec![a; degree + 1];
        knots.extend(interior);
        knots.extend(std::iter::repeat_n(b, degree + 1));
        Self(knots)
    }

    /// Create a clamped knot vector with `m` interior knots linearly spaced in `(a, b)`
    /// # Example
    /// ```
    /// use splinefit::prelude::KnotVector;
    /// let knots: KnotVector<f64> = KnotVector::uniform(3, 3, 0., 1.);
    /// assert_eq!(knots.len(), 11);
    /// assert_eq!(
    ///     knots.to_vec(),
    ///     vec![0., 0., 0., 0., 0.25, 0.5, 0.75, 1., 1., 1., 1.]
    /// );
    /// ```
    pub fn uniform(m: usize, degree: usize, a: T, b: T) -> Self {
        let step = (b - a) / convert::<f64, T>((m + 1) as f64);
        Self::clamped(
            (1..=m).map(|i| a + step * convert::<f64, T>(i as f64)),
            degree,
            a,
            b,
        )
    }

    /// Create a clamped knot vector with caller supplied interior knots
    /// # Failures
    /// - if the interior knots are not sorted
    /// - if an interior knot lies outside of `[a, b]`
    pub fn try_custom(interior: &[T], degree: usize, a: T, b: T) -> anyhow::Result<Self> {
        ensure_argument!(
            interior.windows(2).all(|w| w[0] <= w[1]),
            "Interior knots must be sorted in ascending order"
        );
        ensure_argument!(
            interior.iter().all(|t| *t >= a && *t <= b),
            "Interior knots must lie within the domain [{}, {}]",
            a,
            b
        );
        Ok(Self::clamped(interior.iter().copied(), degree, a, b))
    }

    /// Create a clamped knot vector whose `m` interior knots are the cluster centers of `samples`
    /// Centers on or beyond a bound are pulled just inside `(a, b)`.
    pub fn try_clustered(
        samples: &[T],
        weights: Option<&[T]>,
        m: usize,
        degree: usize,
        a: T,
        b: T,
    ) -> anyhow::Result<Self> {
        let mut centers = cluster_centers(samples, weights, m, &ClusterOptions::default())?;
        centers.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
        Ok(Self::clamped(
            centers.into_iter().map(|c| strictly_inside(c, a, b)),
            degree,
            a,
            b,
        ))
    }

    /// Create a clamped knot vector whose interior knot `i` is the mean of
    /// `max(degree - 1, 1)` consecutive samples starting at sample `i + 1`
    pub fn try_averaged(samples: &[T], m: usize, degree: usize, a: T, b: T) -> anyhow::Result<Self> {
        let window = degree.saturating_sub(1).max(1);
        ensure_shape!(
            m == 0 || samples.len() >= m + window,
            "Averaging {} knots over windows of {} needs at least {} samples, got {}",
            m,
            window,
            m + window,
            samples.len()
        );
        let inv = T::one() / convert::<f64, T>(window as f64);
        let mut interior: Vec<T> = (0..m)
            .map(|i| {
                let start = (i + 1).min(samples.len() - window);
                let sum = samples[start..start + window]
                    .iter()
                    .fold(T::zero(), |acc, s| acc + *s);
                strictly_inside(sum * inv, a, b)
            })
            .collect();
        interior.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
        Ok(Self::clamped(interior, degree, a, b))
    }

    /// Number of knots needed by `control_points` control points of the given degree
    pub fn knot_count(control_points: usize, degree: usize) -> usize {
        control_points + degree + 1
    }

    /// Number of interior knots of a clamped vector for `control_points` control points
    pub fn interior_knot_count(control_points: usize, degree: usize) -> usize {
        (control_points + degree + 1).saturating_sub(2 * (degree + 1))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.0.clone()
    }

    pub fn first(&self) -> T {
        self.0[0]
    }

    pub fn last(&self) -> T {
        self.0[self.0.len() - 1]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Get the domain of the knot vector by degree
    pub fn domain(&self, degree: usize) -> (T, T) {
        (self.0[degree], self.0[self.0.len() - 1 - degree])
    }

    pub fn clamp(&self, degree: usize, u: T) -> T {
        let (min, max) = self.domain(degree);
        u.clamp(min, max)
    }

    /// Number of control points this knot vector supports for the given degree
    pub fn control_point_count(&self, degree: usize) -> usize {
        self.0.len().saturating_sub(degree + 1)
    }

    /// Check that the knot vector is non-decreasing
    pub fn is_non_decreasing(&self) -> bool {
        self.0.windows(2).all(|w| w[0] <= w[1])
    }

    /// Check if the knot vector is clamped
    /// `clamped` means the first and last `degree + 1` knots are equal to the domain bounds
    /// e.g. [0, 0, 0, 1, 2, 3, 3, 3] with degree 2 is clamped
    pub fn is_clamped(&self, degree: usize) -> bool {
        if self.0.len() < 2 * (degree + 1) {
            return false;
        }
        let (a, b) = (self.first(), self.last());
        self.0[..=degree].iter().all(|k| *k == a)
            && self.0[self.0.len() - degree - 1..].iter().all(|k| *k == b)
    }

    /// Ensure the knot vector matches `control_points` control points of the given degree
    pub fn ensure_compatible(&self, control_points: usize, degree: usize) -> anyhow::Result<()> {
        ensure_shape!(
            control_points > degree,
            "Too few control points ({}) for degree {}",
            control_points,
            degree
        );
        ensure_shape!(
            self.len() == Self::knot_count(control_points, degree),
            "Invalid number of knots, got {}, expected {}",
            self.len(),
            Self::knot_count(control_points, degree)
        );
        Ok(())
    }

    /// Find the knot span index by linear scan
    /// `n` is the number of control points - 1
    ///
    /// # Example
    /// ```
    /// use splinefit::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// assert_eq!(knots.find_knot_span(4, 2, 2.5), 4);
    /// assert_eq!(knots.find_knot_span(4, 2, 3.0), 4);
    /// ```
    pub fn find_knot_span(&self, n: usize, degree: usize, u: T) -> usize {
        if u == self[n + 1] {
            return n;
        }

        (degree..=n)
            .find(|&i| u >= self[i] && u < self[i + 1])
            .unwrap_or(if u < self[degree] { degree } else { n })
    }

    /// Find the knot span index by binary search
    /// Same contract as `find_knot_span`
    ///
    /// # Example
    /// ```
    /// use splinefit::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// let idx = knots.find_knot_span_index(4, 2, 2.5);
    /// assert_eq!(idx, 4);
    /// ```
    pub fn find_knot_span_index(&self, n: usize, degree: usize, u: T) -> usize {
        if u >= self[n + 1] {
            return n;
        }

        if u < self[degree] {
            return degree;
        }

        // binary search
        let mut low = degree;
        let mut high = n + 1;
        let mut mid = (low + high) / 2;
        while u < self[mid] || self[mid + 1] <= u {
            if u < self[mid] {
                high = mid;
            } else {
                low = mid;
            }
            let next = (low + high) / 2;
            if mid == next {
                break;
            }
            mid = next;
        }

        mid
    }

    /// Compute the non-vanishing basis functions `[N_0 .. N_p]` at `u`
    ///
    /// `u` on the first or last knot yields a one-hot vector,
    /// and a numerically zero denominator contributes zero instead of NaN.
    pub fn basis_functions(&self, knot_span_index: usize, u: T, degree: usize) -> Vec<T> {
        let mut basis_functions = vec![T::zero(); degree + 1];

        let eps = T::default_epsilon();
        if (u - self.first()).abs() <= eps {
            basis_functions[0] = T::one();
            return basis_functions;
        }
        if (u - self.last()).abs() <= eps {
            basis_functions[degree] = T::one();
            return basis_functions;
        }

        let mut left = vec![T::zero(); degree + 1];
        let mut right = vec![T::zero(); degree + 1];
        basis_functions[0] = T::one();

        for j in 1..=degree {
            left[j] = u - self[knot_span_index + 1 - j];
            right[j] = self[knot_span_index + j] - u;
            let mut saved = T::zero();

            for r in 0..j {
                let denom = right[r + 1] + left[j - r];
                let temp = if denom.abs() <= eps {
                    T::zero()
                } else {
                    basis_functions[r] / denom
                };
                basis_functions[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }

            basis_functions[j] = saved;
        }

        basis_functions
    }

    /// Cast the knot vector to another floating point type
    /// # Example
    /// ```
    /// use splinefit::prelude::*;
    /// let knots: KnotVector<f64> = KnotVector::new(vec![1., 2., 3., 4., 5., 6.]);
    /// let knots2 = knots.cast::<f32>();
    /// assert_eq!(knots2.first(), 1.0);
    /// ```
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> KnotVector<F> {
        KnotVector::new(self.0.iter().map(|v| convert(*v)).collect())
    }
}

/// Pull `value` strictly inside `(a, b)` so that no interior knot repeats a bound
fn strictly_inside<T: FloatingPoint>(value: T, a: T, b: T) -> T {
    let margin = (b - a) * T::default_epsilon().sqrt();
    value.clamp(a + margin, b - margin)
}

impl<T> Index<usize> for KnotVector<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> FromIterator<T> for KnotVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: FloatingPoint> Invertible for KnotVector<T> {
    /// Reverses the knot vector by reflecting it within its bounds
    /// # Example
    /// ```
    /// use splinefit::prelude::*;
    /// let mut knot = KnotVector::new(vec![0., 0., 0., 1., 2., 2.5, 3.5, 4.0, 4.0]);
    /// knot.invert();
    ///
    /// let dst = vec![0.0, 0.0, 0.5, 1.5, 2.0, 3.0, 4.0, 4.0, 4.0];
    /// knot.iter().enumerate().for_each(|(i, v)| {
    ///     assert_eq!(*v, dst[i]);
    /// });
    /// ```
    fn invert(&mut self) {
        if self.0.is_empty() {
            return;
        }
        let (a, b) = (self.first(), self.last());
        self.0 = self.0.iter().rev().map(|k| a + b - *k).collect();
    }
}
