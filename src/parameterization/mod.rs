use itertools::Itertools;
use nalgebra::{convert, Point};

use crate::{basis::min_max, misc::non_zero_or_one, misc::FloatingPoint};

/// Point based parameterization for curve fitting
/// https://en.wikipedia.org/wiki/Centripetal_Catmull%E2%80%93Rom_spline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterStyle {
    #[default]
    Chordal,
    Centripetal,
}

impl ParameterStyle {
    /// Map `points` onto `[a, b]`
    /// The first point maps to `a`, the last to `b`.
    pub fn parameterize<T: FloatingPoint, const D: usize>(
        &self,
        points: &[Point<T, D>],
        a: T,
        b: T,
    ) -> Vec<T> {
        if points.is_empty() {
            return vec![];
        }

        let alpha = self.alpha::<T>();
        let steps = points
            .iter()
            .tuple_windows()
            .map(|(p, q)| (q - p).norm().powf(alpha));

        let mut acc = T::zero();
        let cumulative: Vec<T> = std::iter::once(T::zero())
            .chain(steps.map(|d| {
                acc += d;
                acc
            }))
            .collect();

        // a sequence of coincident points has no length to distribute
        let total = cumulative[cumulative.len() - 1];
        let span = b - a;
        let inv = T::one() / non_zero_or_one(total);
        cumulative.into_iter().map(|c| a + span * c * inv).collect()
    }

    pub fn alpha<T: FloatingPoint>(&self) -> T {
        match self {
            ParameterStyle::Chordal => T::one(),
            ParameterStyle::Centripetal => convert(0.5),
        }
    }
}

/// Chord length parameterization of `points` onto `[a, b]`
pub fn chord_length<T: FloatingPoint, const D: usize>(points: &[Point<T, D>], a: T, b: T) -> Vec<T> {
    ParameterStyle::Chordal.parameterize(points, a, b)
}

/// Centripetal parameterization of `points` onto `[a, b]`, using square-rooted chord lengths
pub fn centripetal<T: FloatingPoint, const D: usize>(points: &[Point<T, D>], a: T, b: T) -> Vec<T> {
    ParameterStyle::Centripetal.parameterize(points, a, b)
}

/// Map `values` linearly from their own range onto `[a, b]`
/// All-equal values map to `a`.
pub fn linear_range_map<T: FloatingPoint>(values: &[T], a: T, b: T) -> Vec<T> {
    let (min, max) = min_max(values);
    let scale = (b - a) / non_zero_or_one(max - min);
    values.iter().map(|v| a + (*v - min) * scale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3};

    fn zigzag() -> Vec<Point2<f64>> {
        vec![
            Point2::new(0., 0.),
            Point2::new(1., 0.),
            Point2::new(1., 2.),
            Point2::new(4., 6.),
            Point2::new(4., 6.),
            Point2::new(5., 6.),
        ]
    }

    #[test]
    fn chord_length_is_monotone() {
        let params = chord_length(&zigzag(), 0., 1.);
        assert_eq!(params.len(), 6);
        assert_relative_eq!(params[0], 0.);
        assert_relative_eq!(params[5], 1.);
        assert!(params.windows(2).all(|w| w[0] <= w[1]));
        // segment lengths 1, 2, 5, 0, 1
        assert_relative_eq!(params[1], 1. / 9., epsilon = 1e-12);
        assert_relative_eq!(params[3], params[4]);
    }

    #[test]
    fn centripetal_is_monotone() {
        let params = centripetal(&zigzag(), 2., 3.);
        assert_relative_eq!(params[0], 2.);
        assert_relative_eq!(params[5], 3.);
        assert!(params.windows(2).all(|w| w[0] <= w[1]));
        let total = 1. + 2f64.sqrt() + 5f64.sqrt() + 1.;
        assert_relative_eq!(params[1], 2. + 1. / total, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_points_map_to_start() {
        let points = vec![Point3::new(1., 1., 1.); 4];
        let params = chord_length(&points, 0.5, 1.);
        assert!(params.iter().all(|p| *p == 0.5));
        assert!(chord_length::<f64, 3>(&[], 0., 1.).is_empty());
    }

    #[test]
    fn linear_map() {
        let params = linear_range_map(&[3., 1., 2., 5.], 0., 1.);
        assert_eq!(params, vec![0.5, 0., 0.25, 1.]);
        let flat = linear_range_map(&[2., 2.], -1., 1.);
        assert_eq!(flat, vec![-1., -1.]);
    }
}
