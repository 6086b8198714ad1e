use argmin::{argmin_error_closure, core::*, float};
use nalgebra::{Matrix2, Vector2};

use crate::misc::FloatingPoint;

/// Broyden's method for the root of a two dimensional residual
///
/// The Jacobian is estimated by finite differences at the initial parameter and refined by
/// rank one ("good" Broyden) updates. It is carried in the jacobian slot of the state.
/// Steps that increase the residual are halved a few times before being accepted.
#[derive(Clone, Copy)]
pub struct TransfiniteInversionBroyden<F> {
    /// Iteration stops once the cost is at or below this
    cost_tolerance: F,

    /// Step of the finite difference Jacobian estimate
    difference_step: F,

    /// Maximum number of step halvings per iteration
    backtrack_max_iters: u64,

    /// Set when the Jacobian estimate cannot be solved
    singular: bool,
}

impl<F> Default for TransfiniteInversionBroyden<F>
where
    F: FloatingPoint,
{
    fn default() -> Self {
        Self {
            cost_tolerance: float!(1e-2),
            difference_step: float!(1e-6),
            backtrack_max_iters: 4,
            singular: false,
        }
    }
}

impl<F> TransfiniteInversionBroyden<F>
where
    F: FloatingPoint,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cost_tolerance(mut self, tolerance: F) -> Self {
        self.cost_tolerance = tolerance;
        self
    }

    pub fn with_difference_step(mut self, step: F) -> Self {
        self.difference_step = step;
        self
    }
}

type BroydenState<F> = IterState<Vector2<F>, (), Matrix2<F>, (), (), F>;

impl<O, F> Solver<O, BroydenState<F>> for TransfiniteInversionBroyden<F>
where
    O: Operator<Param = Vector2<F>, Output = Vector2<F>>
        + CostFunction<Param = Vector2<F>, Output = F>,
    F: FloatingPoint + ArgminFloat,
{
    const NAME: &'static str = "Transfinite inversion broyden method";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: BroydenState<F>,
    ) -> Result<(BroydenState<F>, Option<KV>), Error> {
        let x0 = *state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            concat!(
                "`Broyden` requires an initial parameter vector. ",
                "Please provide an initial guess via `Executor`s `configure` method."
            )
        ))?;

        let r0 = problem.apply(&x0)?;
        let h = self.difference_step;
        let mut jacobian = Matrix2::zeros();
        for k in 0..2 {
            let mut x = x0;
            x[k] += h;
            let r = problem.apply(&x)?;
            jacobian.set_column(k, &((r - r0) / h));
        }

        Ok((state.cost(r0.amax()).jacobian(jacobian), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: BroydenState<F>,
    ) -> Result<(BroydenState<F>, Option<KV>), Error> {
        let x0 = *state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            concat!(
                "`Broyden` requires an initial parameter vector. ",
                "Please provide an initial guess via `Executor`s `configure` method."
            )
        ))?;
        let j0 = state
            .get_jacobian()
            .cloned()
            .ok_or_else(argmin_error_closure!(
                NotInitialized,
                "`Broyden` requires an initial Jacobian estimate."
            ))?;

        let r0 = problem.apply(&x0)?;
        let Some(step) = j0.lu().solve(&-r0) else {
            self.singular = true;
            return Ok((state.param(x0), None));
        };

        let half = float!(0.5);
        let mut t = F::one();
        let mut x1 = x0 + step;
        let mut r1 = problem.apply(&x1)?;
        for _ in 0..self.backtrack_max_iters {
            if r1.norm() <= r0.norm() {
                break;
            }
            t *= half;
            x1 = x0 + step * t;
            r1 = problem.apply(&x1)?;
        }

        let s = x1 - x0;
        let ss = s.dot(&s);
        let j1 = if ss > F::default_epsilon() {
            let y = r1 - r0;
            j0 + (y - j0 * s) * s.transpose() / ss
        } else {
            j0
        };

        Ok((state.param(x1).cost(r1.amax()).jacobian(j1), None))
    }

    fn terminate(&mut self, state: &BroydenState<F>) -> TerminationStatus {
        if self.singular {
            return TerminationStatus::Terminated(TerminationReason::SolverExit(
                "jacobian is singular".into(),
            ));
        }

        if state.get_cost() <= self.cost_tolerance {
            return TerminationStatus::Terminated(TerminationReason::SolverConverged);
        }

        TerminationStatus::NotTerminated
    }
}
