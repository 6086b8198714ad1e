use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use splinefit::prelude::*;

/// Gently curved sheet sampled on a jittered grid, 15 columns along u and 12 rows along v
fn sheet() -> (Vec<f64>, Vec<f64>, Vec<Point3<f64>>) {
    let mut us = vec![];
    let mut vs = vec![];
    let mut points = vec![];
    for i in 0..15 {
        for j in 0..12 {
            // interior columns are jittered, the boundary columns stay on u = 0 and u = 1
            let jitter = match (i, (i + j) % 2) {
                (0, _) | (14, _) => 0.,
                (_, 0) => 0.01,
                _ => -0.01,
            };
            let u = i as f64 / 14. + jitter;
            let v = j as f64 / 11.;
            us.push(u);
            vs.push(v);
            points.push(Point3::new(3. * u, 2. * v, 0.2 * (u * v + 0.5 * u * u)));
        }
    }
    (us, vs, points)
}

#[test]
fn fit_evaluate_and_measure() {
    let (us, vs, points) = sheet();
    let u_knots = KnotVector::uniform(3, 3, 0., 1.);
    let v_knots = KnotVector::uniform(2, 3, 0., 1.);
    let options = SurfaceFitOptions::default()
        .with_smoothing(1e-8)
        .with_penalty(0.);
    let fit = fit_surface(&us, &vs, &points, &u_knots, &v_knots, 3, 3, &options).unwrap();
    assert!(fit.residuals.norm() < 1e-4);

    let mut surface = fit.surface.with_label("sheet");
    assert_eq!(surface.shape(), (6, 7));

    let misfit = surface
        .compute_misfit(&us, &vs, &points, DistanceMetric::L2)
        .unwrap();
    assert!(misfit.iter().all(|m| *m < 1e-4));

    let err = surface
        .compute_distances(&points, DistanceMetric::L2)
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<SplineFitError>(),
        Some(&SplineFitError::NotEvaluated)
    );

    surface.eval(8, 5, Coordinates::Local);
    let distances = surface
        .compute_distances(&points, DistanceMetric::L2)
        .unwrap();
    assert_eq!(distances.shape(), (8, 5));
    // the grid corners coincide with sample points
    assert!(distances[(0, 0)] < 1e-4);
    assert!(distances[(7, 4)] < 1e-4);
}

#[test]
fn smoothing_trades_residual_for_fairness() {
    let (us, vs, points) = sheet();
    let knots = KnotVector::uniform(4, 3, 0., 1.);
    let exact = SurfaceFitOptions::default()
        .with_smoothing(0.)
        .with_penalty(0.);
    let sharp = fit_surface(&us, &vs, &points, &knots, &knots, 3, 3, &exact).unwrap();
    let smooth = fit_surface(&us, &vs, &points, &knots, &knots, 3, 3, &Default::default()).unwrap();
    assert!(smooth.residuals.z >= sharp.residuals.z);
    assert!(smooth.residuals.norm().is_finite());
}

#[test]
fn world_grid_follows_denormalization() {
    let (us, vs, points) = sheet();
    let knots = KnotVector::uniform(2, 2, 0., 1.);
    let options = SurfaceFitOptions::default().with_corners([0, 11, 168, 179]);
    let fit = fit_surface(&us, &vs, &points, &knots, &knots, 2, 2, &options).unwrap();
    let mut surface = fit.surface;

    let offset = Vector3::new(10., -5., 1.);
    surface.denormalize(|p| p + offset);
    let local = surface.axis_control_grid(0, Coordinates::Local).unwrap();
    let global = surface.axis_control_grid(0, Coordinates::Global).unwrap();
    assert_eq!(global, local.add_scalar(10.));

    let world = surface.surface_points(&[0.5], &[0.5]).unwrap();
    let p = surface.point_at(0.5, 0.5, Coordinates::Local);
    assert_relative_eq!(world[0], p + offset, epsilon = 1e-12);
    assert_relative_eq!(
        surface.squared_distance(0.5, 0.5, &(p + offset), Coordinates::Global),
        0.,
        epsilon = 1e-20
    );
}
