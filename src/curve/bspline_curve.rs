use std::fmt;

use nalgebra::{convert, Point};

use crate::{
    error::{ensure_argument, ensure_shape},
    evaluation::distance_to_curve,
    knot::KnotVector,
    misc::{Coordinates, FloatingPoint, Invertible},
};

/// Non-rational B-spline curve representation
/// By const generics, it can be used for 2D or 3D curves with f32 or f64 scalar types
///
/// The curve owns two control point sets: the local set produced by fitting in normalized
/// coordinates, and the world set written by `denormalize`. Until then the world set is a copy
/// of the local one.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "BSplineCurveData<T, D>")
)]
pub struct BSplineCurve<T: FloatingPoint, const D: usize> {
    control_points: Vec<Point<T, D>>,
    world_control_points: Vec<Point<T, D>>,
    degree: usize,
    /// the length of the knot vector is equal to the `# of control points + degree + 1`
    knots: KnotVector<T>,
    label: String,
}

/// 2D B-spline curve alias
pub type BSplineCurve2D<T> = BSplineCurve<T, 2>;

/// 3D B-spline curve alias
pub type BSplineCurve3D<T> = BSplineCurve<T, 3>;

impl<T: FloatingPoint, const D: usize> BSplineCurve<T, D> {
    /// Create a new B-spline curve
    /// # Failures
    /// - if the number of control points is not greater than the degree
    /// - if the number of knots is not equal to the number of control points + the degree + 1
    /// - if the knots are decreasing somewhere
    ///
    /// # Example
    /// ```
    /// use splinefit::prelude::*;
    /// use nalgebra::Point2;
    ///
    /// let control_points = vec![
    ///     Point2::new(0., 0.),
    ///     Point2::new(1., 2.),
    ///     Point2::new(3., 2.),
    ///     Point2::new(4., 0.),
    /// ];
    /// let knots = KnotVector::uniform(0, 3, 0., 1.);
    /// let curve = BSplineCurve2D::try_new(3, control_points, knots);
    /// assert!(curve.is_ok());
    /// ```
    pub fn try_new(
        degree: usize,
        control_points: Vec<Point<T, D>>,
        knots: KnotVector<T>,
    ) -> anyhow::Result<Self> {
        knots.ensure_compatible(control_points.len(), degree)?;
        ensure_argument!(
            knots.is_non_decreasing(),
            "Knot vector must be non-decreasing"
        );

        Ok(Self {
            world_control_points: control_points.clone(),
            control_points,
            degree,
            knots,
            label: "untitled".to_string(),
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &KnotVector<T> {
        &self.knots
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn control_points(&self) -> &[Point<T, D>] {
        &self.control_points
    }

    pub fn world_control_points(&self) -> &[Point<T, D>] {
        &self.world_control_points
    }

    /// Control points in the requested coordinate system
    pub fn control_points_in(&self, coordinates: Coordinates) -> &[Point<T, D>] {
        match coordinates {
            Coordinates::Local => &self.control_points,
            Coordinates::Global => &self.world_control_points,
        }
    }

    pub fn knots_domain(&self) -> (T, T) {
        self.knots.domain(self.degree)
    }

    /// Evaluate the curve at a given parameter
    pub fn point_at(&self, u: T, coordinates: Coordinates) -> Point<T, D> {
        self.point(self.control_points_in(coordinates), u)
    }

    /// Sample the curve at `samples` parameters evenly spaced over the knot domain
    pub fn eval(&self, samples: usize, coordinates: Coordinates) -> Vec<Point<T, D>> {
        let (start, end) = self.knots_domain();
        let step = if samples > 1 {
            (end - start) / convert::<f64, T>((samples - 1) as f64)
        } else {
            T::zero()
        };
        let points = self.control_points_in(coordinates);
        (0..samples)
            .map(|i| {
                // the last sample hits the end knot exactly
                let u = if i + 1 == samples && samples > 1 {
                    end
                } else {
                    start + step * convert::<f64, T>(i as f64)
                };
                self.point(points, u)
            })
            .collect()
    }

    /// Write the world control points by applying `transform` to the local ones
    pub fn denormalize<F>(&mut self, transform: F)
    where
        F: Fn(&Point<T, D>) -> Point<T, D>,
    {
        self.world_control_points = self.control_points.iter().map(transform).collect();
    }

    /// Scalar control values of one axis, as consumed by exporters
    pub fn axis_control_points(
        &self,
        axis: usize,
        coordinates: Coordinates,
    ) -> anyhow::Result<Vec<T>> {
        ensure_argument!(axis < D, "Axis {} is out of range for dimension {}", axis, D);
        Ok(self
            .control_points_in(coordinates)
            .iter()
            .map(|p| p[axis])
            .collect())
    }

    /// Distance between each point and the local curve evaluated at its parameter
    pub fn distances(&self, params: &[T], points: &[Point<T, D>]) -> anyhow::Result<Vec<T>> {
        let axes: Vec<Vec<T>> = (0..D)
            .map(|i| self.control_points.iter().map(|p| p[i]).collect())
            .collect();
        let slices: [&[T]; D] = std::array::from_fn(|i| axes[i].as_slice());
        distance_to_curve(self.degree, &self.knots, slices, params, points)
    }

    fn point(&self, control_points: &[Point<T, D>], u: T) -> Point<T, D> {
        let n = control_points.len() - 1;
        if u == self.knots.last() {
            return control_points[n];
        }

        let knot_span_index = self.knots.find_knot_span(n, self.degree, u);
        let basis = self.knots.basis_functions(knot_span_index, u, self.degree);
        let mut position = Point::<T, D>::origin();
        for i in 0..=self.degree {
            position.coords += control_points[knot_span_index - self.degree + i].coords * basis[i];
        }
        position
    }
}

/// Serialized form of a curve, validated by `try_new` on the way in
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct BSplineCurveData<T: FloatingPoint, const D: usize> {
    control_points: Vec<Point<T, D>>,
    world_control_points: Vec<Point<T, D>>,
    degree: usize,
    knots: KnotVector<T>,
    label: String,
}

#[cfg(feature = "serde")]
impl<T: FloatingPoint, const D: usize> TryFrom<BSplineCurveData<T, D>> for BSplineCurve<T, D> {
    type Error = anyhow::Error;

    fn try_from(data: BSplineCurveData<T, D>) -> Result<Self, Self::Error> {
        ensure_shape!(
            data.world_control_points.len() == data.control_points.len(),
            "Got {} world control points for {} control points",
            data.world_control_points.len(),
            data.control_points.len()
        );
        let mut curve =
            Self::try_new(data.degree, data.control_points, data.knots)?.with_label(data.label);
        curve.world_control_points = data.world_control_points;
        Ok(curve)
    }
}

impl<T: FloatingPoint, const D: usize> Invertible for BSplineCurve<T, D> {
    /// Reverse the direction of the curve
    fn invert(&mut self) {
        self.control_points.reverse();
        self.world_control_points.reverse();
        self.knots.invert();
    }
}

impl<T: FloatingPoint, const D: usize> fmt::Display for BSplineCurve<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BSpline Curve: {}", self.label)?;
        writeln!(f, "Control points:    {}", self.control_points.len())?;
        write!(f, "Degree:            {}", self.degree)
    }
}
