use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector, Point2, Point3};

use super::*;
use crate::{
    error::SplineFitError,
    evaluation::curve_point,
    knot::KnotVector,
    misc::Coordinates,
};

#[test]
fn derivative_matrix_stencils() {
    let d = derivative_matrix::<f64>(4);
    assert_eq!(
        d,
        DMatrix::from_row_slice(
            4,
            4,
            &[
                1., -2., 1., 0., //
                1., -2., 1., 0., //
                0., 1., -2., 1., //
                0., 1., -2., 1.,
            ]
        )
    );
    assert_eq!(
        derivative_matrix::<f64>(2),
        DMatrix::from_row_slice(2, 2, &[-1., 1., -1., 1.])
    );
    assert_eq!(derivative_matrix::<f64>(1), DMatrix::zeros(1, 1));
}

#[test]
fn laplacian_stencils() {
    let d = laplacian_matrix::<f64>(3, 3);
    assert_eq!(d.shape(), (9, 9));
    // center node sees all four neighbors
    assert_eq!(d[(4, 4)], -4.);
    for neighbor in [1, 3, 5, 7] {
        assert_eq!(d[(4, neighbor)], 1.);
    }
    // corners have no full stencil in either direction
    assert!(d.row(0).iter().all(|v| *v == 0.));
    // bottom edge only differences along u
    assert_eq!(d[(1, 0)], 1.);
    assert_eq!(d[(1, 1)], -2.);
    assert_eq!(d[(1, 2)], 1.);
    assert_eq!(d[(1, 4)], 0.);
}

#[test]
fn truncated_solve_drops_null_space() {
    let a = DMatrix::from_row_slice(2, 2, &[1., 0., 0., 0.]);
    let b = DVector::from_column_slice(&[2., 3.]);
    let x = regularized_pseudo_inverse_solve(&a, &b, 0., 1e-8, None).unwrap();
    assert_relative_eq!(x[0], 2., epsilon = 1e-12);
    assert_relative_eq!(x[1], 0., epsilon = 1e-12);

    let bad = DMatrix::zeros(3, 3);
    assert!(regularized_pseudo_inverse_solve(&a, &b, 0., 1e-8, Some(&bad)).is_err());
}

#[test]
fn cubic_reproduces_quadratic() {
    let x = [0., 1., 2., 3.];
    let y = [0., 1., 4., 9.];
    let knots = KnotVector::uniform(0, 3, 0., 3.);
    let fit = fit_scalar(&x, &y, &knots, 3, &LeastSquaresOptions::default()).unwrap();
    assert!(fit.residual < 1e-8);
    let expected = [0., 0., 3., 9.];
    fit.control_points
        .iter()
        .zip(expected.iter())
        .for_each(|(c, e)| assert_relative_eq!(c, e, epsilon = 1e-9));
}

#[test]
fn round_trip_recovers_control_points() {
    let knots = KnotVector::uniform(3, 3, 0., 1.);
    let control = vec![0.3, -1.2, 2.5, 0.7, 1.9, -0.4, 1.1];
    let x: Vec<f64> = (0..50).map(|i| i as f64 / 49.).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|u| curve_point(3, &knots, &control, *u).unwrap())
        .collect();

    let fit = fit_scalar(&x, &y, &knots, 3, &LeastSquaresOptions::default()).unwrap();
    assert!(fit.residual < 1e-6);
    fit.control_points
        .iter()
        .zip(control.iter())
        .for_each(|(c, e)| assert_relative_eq!(c, e, epsilon = 1e-6));
}

#[test]
fn end_points_are_pinned() {
    let x: Vec<f64> = (0..30).map(|i| i as f64 / 29.).collect();
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(i, u)| u * u + if i % 2 == 0 { 0.05 } else { -0.05 })
        .collect();
    let knots = KnotVector::uniform(4, 3, 0., 1.);
    let options = LeastSquaresOptions::default()
        .with_smoothing(0.1)
        .with_penalty(0.5)
        .with_weights(vec![1.; 8]);
    let fit = fit_scalar(&x, &y, &knots, 3, &options).unwrap();
    assert_eq!(fit.control_points.len(), 8);
    assert_eq!(fit.control_points[0], y[0]);
    assert_eq!(fit.control_points[7], y[29]);
    assert!(fit.residual > 0.);
}

#[test]
fn scalar_fit_shape_errors() {
    let knots = KnotVector::uniform(1, 2, 0., 1.);
    let err = fit_scalar(&[0., 0.5], &[1.], &knots, 2, &LeastSquaresOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SplineFitError>(),
        Some(SplineFitError::InvalidShape(_))
    ));

    let options = LeastSquaresOptions::default().with_weights(vec![1.; 3]);
    assert!(fit_scalar(&[0., 0.5, 1.], &[1., 2., 3.], &knots, 2, &options).is_err());
    assert!(fit_scalar(&[], &[], &knots, 2, &LeastSquaresOptions::default()).is_err());
}

fn bilinear(u: f64, v: f64) -> f64 {
    1. + 2. * u - 3. * v + 4. * u * v
}

fn grid_samples() -> (Vec<f64>, Vec<f64>) {
    let mut us = vec![];
    let mut vs = vec![];
    for i in 0..10 {
        for j in 0..10 {
            us.push(i as f64 / 9.);
            vs.push(j as f64 / 9.);
        }
    }
    (us, vs)
}

fn exact_surface_options() -> SurfaceFitOptions<f64> {
    SurfaceFitOptions::default()
        .with_smoothing(0.)
        .with_penalty(0.)
}

#[test]
fn surface_reproduces_bilinear() {
    let (us, vs) = grid_samples();
    let z: Vec<f64> = us.iter().zip(vs.iter()).map(|(u, v)| bilinear(*u, *v)).collect();
    let u_knots = KnotVector::uniform(1, 2, 0., 1.);
    let v_knots = KnotVector::uniform(2, 3, 0., 1.);
    let fit = fit_surface_scalar(
        &us,
        &vs,
        &z,
        &u_knots,
        &v_knots,
        2,
        3,
        &exact_surface_options(),
    )
    .unwrap();
    // rows follow v, columns follow u
    assert_eq!(fit.control_points.shape(), (6, 4));
    assert!(fit.residual < 1e-8);

    for (u, v) in [(0.1, 0.9), (0.5, 0.5), (0.77, 0.21)] {
        let value = crate::evaluation::surface_point(
            2,
            3,
            &u_knots,
            &v_knots,
            &fit.control_points,
            u,
            v,
        )
        .unwrap();
        assert_relative_eq!(value, bilinear(u, v), epsilon = 1e-8);
    }
}

#[test]
fn surface_defaults_and_corners() {
    let (us, vs) = grid_samples();
    let z: Vec<f64> = us
        .iter()
        .zip(vs.iter())
        .map(|(u, v)| (3. * u).sin() * (2. * v).cos())
        .collect();
    let knots = KnotVector::uniform(2, 3, 0., 1.);

    let smooth = fit_surface_scalar(&us, &vs, &z, &knots, &knots, 3, 3, &Default::default())
        .unwrap();
    assert!(smooth.residual.is_finite());

    // samples at (0, 0), (1, 0), (0, 1), (1, 1)
    let corners = [0, 90, 9, 99];
    let options = SurfaceFitOptions::default().with_corners(corners);
    let pinned = fit_surface_scalar(&us, &vs, &z, &knots, &knots, 3, 3, &options).unwrap();
    let cp = &pinned.control_points;
    let last = cp.nrows() - 1;
    assert_eq!(cp[(0, 0)], z[0]);
    assert_eq!(cp[(0, last)], z[90]);
    assert_eq!(cp[(last, 0)], z[9]);
    assert_eq!(cp[(last, last)], z[99]);

    let bad = SurfaceFitOptions::default().with_corners([0, 1, 2, 100]);
    assert!(fit_surface_scalar(&us, &vs, &z, &knots, &knots, 3, 3, &bad).is_err());
    assert!(fit_surface_scalar(&us, &vs[1..], &z, &knots, &knots, 3, 3, &options).is_err());
}

#[test]
fn surface_through_points() {
    let (us, vs) = grid_samples();
    let points: Vec<Point3<f64>> = us
        .iter()
        .zip(vs.iter())
        .map(|(u, v)| Point3::new(2. * u, v + 0.5 * u, bilinear(*u, *v)))
        .collect();
    let knots = KnotVector::uniform(1, 2, 0., 1.);
    let fit = fit_surface(&us, &vs, &points, &knots, &knots, 2, 2, &exact_surface_options())
        .unwrap();
    assert!(fit.residuals.norm() < 1e-8);
    let p = fit.surface.point_at(0.4, 0.6, Coordinates::Local);
    assert_relative_eq!(p.x, 0.8, epsilon = 1e-8);
    assert_relative_eq!(p.y, 0.8, epsilon = 1e-8);
    assert_relative_eq!(p.z, bilinear(0.4, 0.6), epsilon = 1e-8);
}

fn wave(n: usize) -> Vec<Point2<f64>> {
    (0..n)
        .map(|i| {
            let t = i as f64 / (n - 1) as f64 * std::f64::consts::TAU;
            Point2::new(t, t.sin())
        })
        .collect()
}

#[test]
fn curve_fit_pins_both_axes() {
    let points = wave(40);
    let params: Vec<f64> = (0..40).map(|i| i as f64 / 39.).collect();
    let knots = KnotVector::uniform(5, 3, 0., 1.);
    let fit = fit_curve(&params, &points, &knots, 3, &LeastSquaresOptions::default()).unwrap();
    let curve = &fit.curve;
    assert_eq!(curve.control_points().len(), 9);
    assert_eq!(curve.control_points()[0], points[0]);
    assert_eq!(curve.control_points()[8], points[39]);
    assert!(fit.residual() < 0.1);
    assert!(fit_curve(&params[1..], &points, &knots, 3, &LeastSquaresOptions::default()).is_err());
}

#[test]
fn planar_fit_with_each_placement() {
    let points = wave(60);
    for placement in [
        KnotPlacement::Uniform,
        KnotPlacement::Clustered,
        KnotPlacement::Averaged,
    ] {
        let fit = fit_planar_curve(&points, 8, 3, placement, 0.).unwrap();
        let knots = fit.curve.knots();
        assert_eq!(knots.len(), 8 + 8);
        assert!(knots.is_clamped(3));
        assert!(fit.residual().is_finite());
        if placement == KnotPlacement::Uniform {
            assert!(fit.residual() < 0.05);
        }
        let end = fit.curve.point_at(1., Coordinates::Local);
        assert_relative_eq!(end.x, points[59].x);
    }
}

#[test]
fn planar_fit_by_axis() {
    let points: Vec<Point2<f64>> = (0..20)
        .map(|i| {
            let x = 1. + i as f64 / 4.;
            Point2::new(x, x * x)
        })
        .collect();
    let fit = fit_planar_curve_by_axis(&points, 2, 3, 0).unwrap();
    assert!(fit.residual() < 1e-8);
    assert!(fit_planar_curve_by_axis(&points, 2, 3, 2).is_err());
}

#[test]
fn progressive_stops_at_target() {
    let points: Vec<Point2<f64>> = (0..30).map(|i| Point2::new(i as f64, 2. * i as f64)).collect();
    let result = fit_progressive(&points, &ProgressiveFitOptions::default()).unwrap();
    assert_eq!(result.iterations, 1);
    assert_eq!(result.interior_knots, 2);
    assert!(result.residual <= 0.1);
}

#[test]
fn progressive_stops_at_cap() {
    let points: Vec<Point2<f64>> = (0..40)
        .map(|i| Point2::new(i as f64, if i % 2 == 0 { 1. } else { -1. }))
        .collect();
    let options = ProgressiveFitOptions::default()
        .with_target_residual(0.)
        .with_max_interior_knots(7);
    let result = fit_progressive(&points, &options).unwrap();
    assert_eq!(result.iterations, 3);
    assert_eq!(result.interior_knots, 6);
    assert_eq!(result.fit.curve.control_points().len(), 10);
    assert!(result.residual > 0.);

    let stalled = ProgressiveFitOptions::default().with_knot_step(0);
    assert!(fit_progressive(&points, &stalled).is_err());
}
