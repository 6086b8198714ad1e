use std::fmt;

use nalgebra::{convert, DMatrix, Point3};

use crate::{
    error::{ensure_argument, ensure_shape, SplineFitError},
    knot::KnotVector,
    misc::{Coordinates, DistanceMetric, FloatingPoint},
};

/// Grid of surface points stored by `BSplineSurface::eval`
/// Entry `(i, j)` of each axis matrix is the surface at the `i`-th `u` and `j`-th `v` sample.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceSamples<T: FloatingPoint> {
    pub x: DMatrix<T>,
    pub y: DMatrix<T>,
    pub z: DMatrix<T>,
    pub coordinates: Coordinates,
}

impl<T: FloatingPoint> SurfaceSamples<T> {
    pub fn shape(&self) -> (usize, usize) {
        self.x.shape()
    }

    pub fn point(&self, i: usize, j: usize) -> Point3<T> {
        Point3::new(self.x[(i, j)], self.y[(i, j)], self.z[(i, j)])
    }
}

/// Tensor product B-spline surface representation
///
/// Control points form a grid of `rows x columns` where rows follow `v` and columns follow `u`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "BSplineSurfaceData<T>")
)]
pub struct BSplineSurface<T: FloatingPoint> {
    control_points: Vec<Vec<Point3<T>>>,
    world_control_points: Vec<Vec<Point3<T>>>,
    u_degree: usize,
    v_degree: usize,
    u_knots: KnotVector<T>,
    v_knots: KnotVector<T>,
    label: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    evaluated: Option<SurfaceSamples<T>>,
}

impl<T: FloatingPoint> BSplineSurface<T> {
    /// Create a new B-spline surface
    /// # Failures
    /// - if the control point grid is empty or ragged
    /// - if a knot vector does not match its control point count and degree
    pub fn try_new(
        u_degree: usize,
        v_degree: usize,
        u_knots: KnotVector<T>,
        v_knots: KnotVector<T>,
        control_points: Vec<Vec<Point3<T>>>,
    ) -> anyhow::Result<Self> {
        ensure_shape!(
            !control_points.is_empty(),
            "Control point grid must not be empty"
        );
        let columns = control_points[0].len();
        ensure_shape!(
            control_points.iter().all(|row| row.len() == columns),
            "Control point rows must have equal lengths"
        );
        u_knots.ensure_compatible(columns, u_degree)?;
        v_knots.ensure_compatible(control_points.len(), v_degree)?;
        ensure_argument!(
            u_knots.is_non_decreasing() && v_knots.is_non_decreasing(),
            "Knot vectors must be non-decreasing"
        );

        Ok(Self {
            world_control_points: control_points.clone(),
            control_points,
            u_degree,
            v_degree,
            u_knots,
            v_knots,
            label: "untitled".to_string(),
            evaluated: None,
        })
    }

    /// Create a surface from one scalar control grid per axis
    /// Each grid has one row per `v` control index and one column per `u` control index.
    pub fn try_from_axis_grids(
        u_degree: usize,
        v_degree: usize,
        u_knots: KnotVector<T>,
        v_knots: KnotVector<T>,
        grids: [DMatrix<T>; 3],
    ) -> anyhow::Result<Self> {
        let [x, y, z] = grids;
        ensure_shape!(
            x.shape() == y.shape() && x.shape() == z.shape(),
            "Axis grids differ in shape: {:?}, {:?}, {:?}",
            x.shape(),
            y.shape(),
            z.shape()
        );
        let control_points = (0..x.nrows())
            .map(|r| {
                (0..x.ncols())
                    .map(|c| Point3::new(x[(r, c)], y[(r, c)], z[(r, c)]))
                    .collect()
            })
            .collect();
        Self::try_new(u_degree, v_degree, u_knots, v_knots, control_points)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn u_degree(&self) -> usize {
        self.u_degree
    }

    pub fn v_degree(&self) -> usize {
        self.v_degree
    }

    pub fn u_knots(&self) -> &KnotVector<T> {
        &self.u_knots
    }

    pub fn v_knots(&self) -> &KnotVector<T> {
        &self.v_knots
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn control_points(&self) -> &Vec<Vec<Point3<T>>> {
        &self.control_points
    }

    pub fn world_control_points(&self) -> &Vec<Vec<Point3<T>>> {
        &self.world_control_points
    }

    /// Control grid shape as `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.control_points.len(), self.control_points[0].len())
    }

    /// The grid stored by the last `eval` call
    pub fn evaluated(&self) -> Option<&SurfaceSamples<T>> {
        self.evaluated.as_ref()
    }

    pub fn control_points_in(&self, coordinates: Coordinates) -> &Vec<Vec<Point3<T>>> {
        match coordinates {
            Coordinates::Local => &self.control_points,
            Coordinates::Global => &self.world_control_points,
        }
    }

    pub fn knots_domain(&self) -> ((T, T), (T, T)) {
        (
            self.u_knots.domain(self.u_degree),
            self.v_knots.domain(self.v_degree),
        )
    }

    /// Evaluate the surface at a given parameter pair
    pub fn point_at(&self, u: T, v: T, coordinates: Coordinates) -> Point3<T> {
        self.point(self.control_points_in(coordinates), u, v)
    }

    /// Sample the surface on an `nu x nv` grid evenly spaced over the knot domains
    /// and keep the result for `compute_distances`.
    pub fn eval(&mut self, nu: usize, nv: usize, coordinates: Coordinates) -> &SurfaceSamples<T> {
        let ((u0, u1), (v0, v1)) = self.knots_domain();
        let us = linspace(u0, u1, nu);
        let vs = linspace(v0, v1, nv);
        let control_points = self.control_points_in(coordinates);

        let mut x = DMatrix::zeros(nu, nv);
        let mut y = DMatrix::zeros(nu, nv);
        let mut z = DMatrix::zeros(nu, nv);
        for (i, u) in us.iter().enumerate() {
            for (j, v) in vs.iter().enumerate() {
                let p = self.point(control_points, *u, *v);
                x[(i, j)] = p.x;
                y[(i, j)] = p.y;
                z[(i, j)] = p.z;
            }
        }

        self.evaluated.insert(SurfaceSamples {
            x,
            y,
            z,
            coordinates,
        })
    }

    /// Distance from each evaluated grid point to its nearest query point
    /// # Failures
    /// - if `eval` has not been called
    /// - if `points` is empty
    pub fn compute_distances(
        &self,
        points: &[Point3<T>],
        metric: DistanceMetric,
    ) -> anyhow::Result<DMatrix<T>> {
        let samples = self
            .evaluated
            .as_ref()
            .ok_or(SplineFitError::NotEvaluated)?;
        ensure_shape!(!points.is_empty(), "No query points given");

        let (rows, cols) = samples.shape();
        Ok(DMatrix::from_fn(rows, cols, |i, j| {
            let p = samples.point(i, j);
            points
                .iter()
                .map(|q| metric.norm(&(p - q)))
                .fold(None, |min: Option<T>, d| match min {
                    Some(m) if m <= d => Some(m),
                    _ => Some(d),
                })
                .unwrap_or(T::zero())
        }))
    }

    /// Distance between each point and the global surface at its parameters
    pub fn compute_misfit(
        &self,
        us: &[T],
        vs: &[T],
        points: &[Point3<T>],
        metric: DistanceMetric,
    ) -> anyhow::Result<Vec<T>> {
        ensure_shape!(
            us.len() == vs.len() && us.len() == points.len(),
            "Got {} u, {} v parameters for {} points",
            us.len(),
            vs.len(),
            points.len()
        );
        Ok(us
            .iter()
            .zip(vs.iter())
            .zip(points.iter())
            .map(|((u, v), q)| {
                let p = self.point(&self.world_control_points, *u, *v);
                metric.norm(&(p - q))
            })
            .collect())
    }

    /// Squared euclidean distance between `point` and the surface at `(u, v)`
    pub fn squared_distance(&self, u: T, v: T, point: &Point3<T>, coordinates: Coordinates) -> T {
        (self.point_at(u, v, coordinates) - point).norm_squared()
    }

    /// Global surface points at the given parameter pairs
    pub fn surface_points(&self, us: &[T], vs: &[T]) -> anyhow::Result<Vec<Point3<T>>> {
        ensure_shape!(
            us.len() == vs.len(),
            "Got {} u and {} v parameters",
            us.len(),
            vs.len()
        );
        Ok(us
            .iter()
            .zip(vs.iter())
            .map(|(u, v)| self.point(&self.world_control_points, *u, *v))
            .collect())
    }

    /// Write the world control points by applying `transform` to the local ones
    pub fn denormalize<F>(&mut self, transform: F)
    where
        F: Fn(&Point3<T>) -> Point3<T>,
    {
        self.world_control_points = self
            .control_points
            .iter()
            .map(|row| row.iter().map(&transform).collect())
            .collect();
    }

    /// Scalar control grid of one axis, as consumed by exporters
    pub fn axis_control_grid(
        &self,
        axis: usize,
        coordinates: Coordinates,
    ) -> anyhow::Result<DMatrix<T>> {
        ensure_argument!(axis < 3, "Axis {} is out of range for a surface", axis);
        let grid = self.control_points_in(coordinates);
        let (rows, cols) = self.shape();
        Ok(DMatrix::from_fn(rows, cols, |r, c| grid[r][c][axis]))
    }

    fn point(&self, control_points: &[Vec<Point3<T>>], u: T, v: T) -> Point3<T> {
        let n = control_points[0].len() - 1;
        let m = control_points.len() - 1;
        let u_span = self.u_knots.find_knot_span(n, self.u_degree, u);
        let v_span = self.v_knots.find_knot_span(m, self.v_degree, v);
        let u_basis = self.u_knots.basis_functions(u_span, u, self.u_degree);
        let v_basis = self.v_knots.basis_functions(v_span, v, self.v_degree);

        let mut position = Point3::origin();
        for l in 0..=self.v_degree {
            let row = &control_points[v_span - self.v_degree + l];
            let mut temp = Point3::origin();
            for k in 0..=self.u_degree {
                temp.coords += row[u_span - self.u_degree + k].coords * u_basis[k];
            }
            position.coords += temp.coords * v_basis[l];
        }
        position
    }
}

/// Serialized form of a surface, validated by `try_new` on the way in
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct BSplineSurfaceData<T: FloatingPoint> {
    control_points: Vec<Vec<Point3<T>>>,
    world_control_points: Vec<Vec<Point3<T>>>,
    u_degree: usize,
    v_degree: usize,
    u_knots: KnotVector<T>,
    v_knots: KnotVector<T>,
    label: String,
}

#[cfg(feature = "serde")]
impl<T: FloatingPoint> TryFrom<BSplineSurfaceData<T>> for BSplineSurface<T> {
    type Error = anyhow::Error;

    fn try_from(data: BSplineSurfaceData<T>) -> Result<Self, Self::Error> {
        ensure_shape!(
            data.world_control_points.len() == data.control_points.len()
                && data
                    .world_control_points
                    .iter()
                    .zip(data.control_points.iter())
                    .all(|(w, l)| w.len() == l.len()),
            "World control grid differs in shape from the control grid"
        );
        let mut surface = Self::try_new(
            data.u_degree,
            data.v_degree,
            data.u_knots,
            data.v_knots,
            data.control_points,
        )?
        .with_label(data.label);
        surface.world_control_points = data.world_control_points;
        Ok(surface)
    }
}

fn linspace<T: FloatingPoint>(start: T, end: T, n: usize) -> Vec<T> {
    if n < 2 {
        return vec![start; n];
    }
    let step = (end - start) / convert::<f64, T>((n - 1) as f64);
    (0..n)
        .map(|i| {
            if i + 1 == n {
                end
            } else {
                start + step * convert::<f64, T>(i as f64)
            }
        })
        .collect()
}

impl<T: FloatingPoint> fmt::Display for BSplineSurface<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.shape();
        writeln!(f, "BSpline Surface: {}", self.label)?;
        writeln!(f, " * Control points:  {} x {}", rows, cols)?;
        write!(f, " * Degree:          ({}, {})", self.u_degree, self.v_degree)
    }
}
