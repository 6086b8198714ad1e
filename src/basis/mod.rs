use nalgebra::{convert, Matrix4, RowVector4, Vector4};

use crate::{error::ensure_shape, misc::non_zero_or_one, misc::FloatingPoint};

/// Evaluate the four uniform cubic B-spline basis weights at a local parameter `t` in `[0, 1]`
///
/// `[B0, B1, B2, B3] = [t^3, t^2, t, 1] * B`
///
/// # Example
/// ```
/// use splinefit::prelude::uniform_cubic_basis;
/// use approx::assert_relative_eq;
/// let w = uniform_cubic_basis(0.0_f64);
/// assert_relative_eq!(w[0], 1. / 6.);
/// assert_relative_eq!(w[1], 4. / 6.);
/// assert_relative_eq!(w[2], 1. / 6.);
/// assert_relative_eq!(w[3], 0.);
/// ```
pub fn uniform_cubic_basis<T: FloatingPoint>(t: T) -> [T; 4] {
    let b = uniform_cubic_matrix::<T>();
    let powers = RowVector4::new(t * t * t, t * t, t, T::one());
    let w = powers * b;
    [w[0], w[1], w[2], w[3]]
}

fn uniform_cubic_matrix<T: FloatingPoint>() -> Matrix4<T> {
    let c = |v: f64| convert::<f64, T>(v / 6.);
    Matrix4::new(
        c(-1.),
        c(3.),
        c(-3.),
        c(1.),
        c(3.),
        c(-6.),
        c(3.),
        c(0.),
        c(-3.),
        c(0.),
        c(3.),
        c(0.),
        c(1.),
        c(4.),
        c(1.),
        c(0.),
    )
}

/// Evaluate a uniform cubic B-spline over its control values, `samples` points per segment
/// Returns the local abscissae `i + t` and the curve values, one segment after another.
pub fn evaluate_uniform_cubic<T: FloatingPoint>(
    control_points: &[T],
    samples: usize,
) -> anyhow::Result<(Vec<T>, Vec<T>)> {
    ensure_shape!(
        control_points.len() >= 4,
        "A uniform cubic needs at least 4 control points, got {}",
        control_points.len()
    );
    ensure_shape!(samples >= 2, "At least 2 samples per segment are required");

    let step = T::one() / convert::<f64, T>((samples - 1) as f64);
    let (xs, ys): (Vec<T>, Vec<T>) = control_points
        .windows(4)
        .enumerate()
        .flat_map(|(i, window)| {
            let p = Vector4::new(window[0], window[1], window[2], window[3]);
            (0..samples).map(move |j| {
                let t = step * convert::<f64, T>(j as f64);
                let w = uniform_cubic_basis(t);
                let y = Vector4::new(w[0], w[1], w[2], w[3]).dot(&p);
                (convert::<f64, T>(i as f64) + t, y)
            })
        })
        .unzip();
    Ok((xs, ys))
}

/// Bounds used to map scalar samples onto `[0, n]` and back
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizationConstants<T> {
    pub min: T,
    pub max: T,
}

/// Map `values` onto `[0, n]` where `n + 1` is the number of control points
/// All-equal values map to zero.
pub fn normalize<T: FloatingPoint>(values: &[T], n: usize) -> (Vec<T>, NormalizationConstants<T>) {
    let (min, max) = min_max(values);
    let scale = convert::<f64, T>(n as f64) / non_zero_or_one(max - min);
    let out = values.iter().map(|v| (*v - min) * scale).collect();
    (out, NormalizationConstants { min, max })
}

/// Inverse of `normalize`
pub fn denormalize<T: FloatingPoint>(
    values: &[T],
    constants: &NormalizationConstants<T>,
    n: usize,
) -> Vec<T> {
    let scale = (constants.max - constants.min) / convert::<f64, T>(n.max(1) as f64);
    values.iter().map(|v| *v * scale + constants.min).collect()
}

/// Smallest degree not above `degree` that `num_points` points can support
pub fn min_degree(num_points: usize, degree: usize) -> usize {
    degree.min(num_points.saturating_sub(degree).max(1))
}

pub(crate) fn min_max<T: FloatingPoint>(values: &[T]) -> (T, T) {
    match values.first() {
        Some(first) => values
            .iter()
            .fold((*first, *first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
        None => (T::zero(), T::zero()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cubic_basis_sums_to_one() {
        for i in 0..=20 {
            let t = i as f64 / 20.;
            let w = uniform_cubic_basis(t);
            assert_relative_eq!(w.iter().sum::<f64>(), 1., epsilon = 1e-12);
        }
        let w = uniform_cubic_basis(1.0);
        assert_relative_eq!(w[0], 0., epsilon = 1e-12);
        assert_relative_eq!(w[1], 1. / 6., epsilon = 1e-12);
        assert_relative_eq!(w[2], 4. / 6., epsilon = 1e-12);
        assert_relative_eq!(w[3], 1. / 6., epsilon = 1e-12);
    }

    #[test]
    fn uniform_cubic_reproduces_lines() {
        // uniform B-splines reproduce linear functions of the control index
        let control: Vec<f64> = (0..6).map(|i| 2. * i as f64 + 1.).collect();
        let (xs, ys) = evaluate_uniform_cubic(&control, 5).unwrap();
        assert_eq!(xs.len(), 3 * 5);
        xs.iter().zip(ys.iter()).for_each(|(x, y)| {
            // the segment starting at control i is centered on control i + 1
            assert_relative_eq!(*y, 2. * (x + 1.) + 1., epsilon = 1e-12);
        });
        assert!(evaluate_uniform_cubic(&control[..3], 5).is_err());
    }

    #[test]
    fn normalize_round_trip() {
        let values = vec![2., 4., 3., 10.];
        let (normalized, constants) = normalize(&values, 4);
        assert_relative_eq!(normalized[0], 0.);
        assert_relative_eq!(normalized[3], 4.);
        assert_relative_eq!(normalized[1], 1.);
        let restored = denormalize(&normalized, &constants, 4);
        values
            .iter()
            .zip(restored.iter())
            .for_each(|(a, b)| assert_relative_eq!(a, b, epsilon = 1e-12));

        let (flat, _) = normalize(&[1., 1., 1.], 3);
        assert!(flat.iter().all(|v| *v == 0.));
    }

    #[test]
    fn degree_limit() {
        assert_eq!(min_degree(10, 3), 3);
        assert_eq!(min_degree(4, 3), 1);
        assert_eq!(min_degree(5, 3), 2);
        assert_eq!(min_degree(2, 3), 1);
    }
}
