//! # Simplex Solver
//!
//! $$
//! \min_{\mathbf{w}\in\Delta} f(\mathbf{w}),\qquad
//! \Delta=\{\mathbf{w}:\ w_i\ge 0,\ \textstyle\sum_i w_i=1\}
//! $$
//!
//! Spectral projected gradient on the probability simplex. Any argmin problem
//! exposing [`CostFunction`] and [`Gradient`] over `Vec<f64>` can be solved.
//! Every iterate is a projection (or a convex combination of feasible points),
//! so the equality and `[0, 1]` box constraints hold throughout.

use std::cmp::Ordering;
use std::collections::VecDeque;

use anyhow::anyhow;
use argmin::core::CostFunction;
use argmin::core::Error;
use argmin::core::Executor;
use argmin::core::Gradient;
use argmin::core::IterState;
use argmin::core::KV;
use argmin::core::OptimizationResult;
use argmin::core::Problem;
use argmin::core::Solver;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use tracing::debug;

use super::performance::dot;

/// Iteration budget and tolerances of [`ProjectedGradient`].
#[derive(Clone, Debug)]
pub struct SolverConfig {
  /// Maximum number of iterations.
  pub max_iters: u64,
  /// Stationarity tolerance on `||P(w - g) - w||_inf`.
  pub tolerance: f64,
  /// Sufficient decrease constant of the Armijo test.
  pub armijo: f64,
  /// Number of past costs the non-monotone line search compares against.
  pub memory: usize,
  /// Step halvings tried before the line search gives up.
  pub max_backtracks: usize,
  /// Lower clamp of the spectral step length.
  pub min_step: f64,
  /// Upper clamp of the spectral step length.
  pub max_step: f64,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      max_iters: 1000,
      tolerance: 1e-7,
      armijo: 1e-4,
      memory: 10,
      max_backtracks: 60,
      min_step: 1e-10,
      max_step: 1e10,
    }
  }
}

/// Euclidean projection of `v` onto the probability simplex.
pub fn project_onto_simplex(v: &[f64]) -> Vec<f64> {
  if v.is_empty() {
    return Vec::new();
  }

  let mut u = v.to_vec();
  u.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

  let mut cumsum = 0.0;
  let mut theta = 0.0;
  for (j, &uj) in u.iter().enumerate() {
    cumsum += uj;
    let t = (cumsum - 1.0) / (j + 1) as f64;
    if uj - t > 0.0 {
      theta = t;
    }
  }

  v.iter().map(|&x| (x - theta).max(0.0)).collect()
}

/// `P(x - step * g) - x`
fn projected_direction(x: &[f64], g: &[f64], step: f64) -> Vec<f64> {
  let shifted: Vec<f64> = x.iter().zip(g).map(|(xi, gi)| xi - step * gi).collect();
  project_onto_simplex(&shifted)
    .iter()
    .zip(x)
    .map(|(p, xi)| p - xi)
    .collect()
}

fn inf_norm(v: &[f64]) -> f64 {
  v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

/// Spectral projected gradient (Barzilai-Borwein steps with a non-monotone
/// Armijo line search) over the probability simplex.
///
/// Driven by an argmin [`Executor`]. The starting parameter is projected onto
/// the simplex in `init`. The run converges once `||P(w - g) - w||_inf` drops to
/// the configured tolerance; a line search that finds no acceptable step exits
/// with [`TerminationReason::SolverExit`].
#[derive(Clone, Debug, Default)]
pub struct ProjectedGradient {
  config: SolverConfig,
  step: f64,
  history: VecDeque<f64>,
  stationarity: f64,
}

/// argmin state carried by [`ProjectedGradient`].
pub type SimplexState = IterState<Vec<f64>, Vec<f64>, (), (), (), f64>;

impl ProjectedGradient {
  pub fn new(config: SolverConfig) -> Self {
    Self {
      config,
      ..Self::default()
    }
  }

  pub fn config(&self) -> &SolverConfig {
    &self.config
  }

  /// Stationarity measure at the last iterate seen by `terminate`.
  pub fn stationarity(&self) -> f64 {
    self.stationarity
  }

  fn remember(&mut self, cost: f64) {
    self.history.push_back(cost);
    if self.history.len() > self.config.memory.max(1) {
      self.history.pop_front();
    }
  }
}

impl<O> Solver<O, SimplexState> for ProjectedGradient
where
  O: CostFunction<Param = Vec<f64>, Output = f64> + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>,
{
  const NAME: &'static str = "Spectral Projected Gradient";

  fn init(&mut self, problem: &mut Problem<O>, mut state: SimplexState) -> Result<(SimplexState, Option<KV>), Error> {
    let x0 = state
      .take_param()
      .ok_or_else(|| anyhow!("projected gradient needs a starting point"))?;

    let x = project_onto_simplex(&x0);
    let f = problem.cost(&x)?;
    if !f.is_finite() {
      return Err(anyhow!("cost is not finite at the starting point"));
    }
    let g = problem.gradient(&x)?;

    let pg = inf_norm(&projected_direction(&x, &g, 1.0));
    self.step = if pg > 0.0 {
      (1.0 / pg).clamp(self.config.min_step, self.config.max_step)
    } else {
      1.0
    };
    self.stationarity = pg;
    self.history.clear();
    self.remember(f);

    Ok((state.param(x).cost(f).gradient(g), None))
  }

  fn next_iter(&mut self, problem: &mut Problem<O>, mut state: SimplexState) -> Result<(SimplexState, Option<KV>), Error> {
    let x = state
      .take_param()
      .ok_or_else(|| anyhow!("projected gradient lost its iterate"))?;
    let g = state
      .take_gradient()
      .ok_or_else(|| anyhow!("projected gradient lost its gradient"))?;
    let f = state.get_cost();

    let d = projected_direction(&x, &g, self.step);
    let gd = dot(&g, &d);
    let f_ref = self.history.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut lambda = 1.0;
    let mut accepted = None;
    for _ in 0..self.config.max_backtracks {
      let trial: Vec<f64> = x.iter().zip(&d).map(|(xi, di)| xi + lambda * di).collect();
      match problem.cost(&trial) {
        Ok(ft) if ft.is_finite() && ft <= f_ref + self.config.armijo * lambda * gd => {
          accepted = Some((trial, ft));
          break;
        }
        _ => lambda *= 0.5,
      }
    }

    let Some((x_new, f_new)) = accepted else {
      debug!(
        iterations = state.get_iter(),
        cost = f,
        stationarity = self.stationarity,
        "line search failed"
      );
      let state = state
        .param(x)
        .gradient(g)
        .cost(f)
        .terminate_with(TerminationReason::SolverExit(
          "line search could not find a decreasing step".to_string(),
        ));
      return Ok((state, None));
    };

    let g_new = problem.gradient(&x_new)?;
    let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
    let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
    let sy = dot(&s, &y);
    self.step = if sy > 0.0 {
      (dot(&s, &s) / sy).clamp(self.config.min_step, self.config.max_step)
    } else {
      self.config.max_step
    };
    self.remember(f_new);

    Ok((state.param(x_new).gradient(g_new).cost(f_new), None))
  }

  fn terminate(&mut self, state: &SimplexState) -> TerminationStatus {
    let (Some(x), Some(g)) = (state.get_param(), state.get_gradient()) else {
      return TerminationStatus::NotTerminated;
    };

    self.stationarity = inf_norm(&projected_direction(x, g, 1.0));
    if self.stationarity <= self.config.tolerance {
      debug!(
        iterations = state.get_iter(),
        cost = state.get_cost(),
        stationarity = self.stationarity,
        "projected gradient converged"
      );
      return TerminationStatus::Terminated(TerminationReason::SolverConverged);
    }

    TerminationStatus::NotTerminated
  }
}

/// Run [`ProjectedGradient`] on `problem` from `x0` under the budget in `config`.
pub fn minimize_on_simplex<O>(
  problem: O,
  x0: Vec<f64>,
  config: &SolverConfig,
) -> Result<OptimizationResult<O, ProjectedGradient, SimplexState>, Error>
where
  O: CostFunction<Param = Vec<f64>, Output = f64> + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>,
{
  Executor::new(problem, ProjectedGradient::new(config.clone()))
    .configure(|state| state.param(x0).max_iters(config.max_iters))
    .run()
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use rand::Rng;
  use rand::SeedableRng;
  use rand::rngs::StdRng;

  use super::*;

  /// `||x - target||^2`, minimized over the simplex at the projection of `target`.
  struct Distance {
    target: Vec<f64>,
  }

  impl CostFunction for Distance {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
      Ok(x.iter().zip(&self.target).map(|(a, b)| (a - b).powi(2)).sum())
    }
  }

  impl Gradient for Distance {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
      Ok(x.iter().zip(&self.target).map(|(a, b)| 2.0 * (a - b)).collect())
    }
  }

  struct Broken;

  impl CostFunction for Broken {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, _x: &Self::Param) -> Result<Self::Output, Error> {
      Err(anyhow!("model is not defined here"))
    }
  }

  impl Gradient for Broken {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
      Ok(vec![0.0; x.len()])
    }
  }

  #[test]
  fn projection_keeps_feasible_points() {
    let w = vec![0.2, 0.5, 0.3];
    let p = project_onto_simplex(&w);
    for (a, b) in p.iter().zip(&w) {
      assert_abs_diff_eq!(*a, *b, epsilon = 1e-15);
    }
  }

  #[test]
  fn projection_of_known_points() {
    let p = project_onto_simplex(&[0.8, 0.6, -0.2]);
    assert_abs_diff_eq!(p[0], 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(p[1], 0.4, epsilon = 1e-12);
    assert_eq!(p[2], 0.0);

    let p = project_onto_simplex(&[0.5, 0.5, 0.5]);
    for w in p {
      assert_abs_diff_eq!(w, 1.0 / 3.0, epsilon = 1e-12);
    }

    assert_eq!(project_onto_simplex(&[3.0, 0.0]), vec![1.0, 0.0]);
    assert!(project_onto_simplex(&[]).is_empty());
  }

  #[test]
  fn projection_lands_on_the_simplex() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
      let n = rng.gen_range(1..8);
      let v: Vec<f64> = (0..n).map(|_| rng.gen_range(-3.0..3.0)).collect();
      let p = project_onto_simplex(&v);

      assert_abs_diff_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
      assert!(p.iter().all(|&w| (0.0..=1.0).contains(&w)));
    }
  }

  #[test]
  fn solver_finds_the_closest_simplex_point() {
    let problem = Distance {
      target: vec![0.8, 0.6, -0.2],
    };
    let res = minimize_on_simplex(problem, vec![1.0 / 3.0; 3], &SolverConfig::default()).unwrap();

    assert_eq!(
      res.state.get_termination_reason(),
      Some(&TerminationReason::SolverConverged)
    );
    let w = res.state.get_param().unwrap();
    assert_abs_diff_eq!(w[0], 0.6, epsilon = 1e-6);
    assert_abs_diff_eq!(w[1], 0.4, epsilon = 1e-6);
    assert_abs_diff_eq!(w[2], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert!(res.solver.stationarity() <= res.solver.config().tolerance);
  }

  #[test]
  fn interior_optimum_is_reached() {
    let target = vec![0.1, 0.2, 0.3, 0.4];
    let problem = Distance { target: target.clone() };
    let res = minimize_on_simplex(problem, vec![0.25; 4], &SolverConfig::default()).unwrap();

    assert_eq!(
      res.state.get_termination_reason(),
      Some(&TerminationReason::SolverConverged)
    );
    for (w, t) in res.state.get_param().unwrap().iter().zip(&target) {
      assert_abs_diff_eq!(*w, *t, epsilon = 1e-6);
    }
  }

  #[test]
  fn infeasible_start_is_projected() {
    let problem = Distance {
      target: vec![0.5, 0.5],
    };
    let res = minimize_on_simplex(problem, vec![2.0, 1.0], &SolverConfig::default()).unwrap();

    let w = res.state.get_param().unwrap();
    assert_abs_diff_eq!(w[0], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(w[1], 0.5, epsilon = 1e-6);
  }

  #[test]
  fn exhausted_budget_is_reported() {
    let problem = Distance {
      target: vec![0.9, 0.1],
    };
    let config = SolverConfig {
      max_iters: 0,
      ..SolverConfig::default()
    };
    let res = minimize_on_simplex(problem, vec![0.5, 0.5], &config).unwrap();

    assert_eq!(
      res.state.get_termination_reason(),
      Some(&TerminationReason::MaxItersReached)
    );
    assert_eq!(res.state.get_iter(), 0);
    assert!(res.solver.stationarity() > config.tolerance);
  }

  #[test]
  fn executor_drives_the_solver_directly() {
    let solver = ProjectedGradient::new(SolverConfig {
      max_iters: 500,
      ..SolverConfig::default()
    });
    assert_eq!(solver.config().max_iters, 500);

    let problem = Distance {
      target: vec![0.7, 0.3],
    };
    let res = Executor::new(problem, solver)
      .configure(|state| state.param(vec![0.5, 0.5]).max_iters(500))
      .run()
      .unwrap();

    assert!(res.state.get_iter() <= 500);
    assert_abs_diff_eq!(res.state.get_param().unwrap()[0], 0.7, epsilon = 1e-6);
  }

  #[test]
  fn starting_point_errors_propagate() {
    let err = minimize_on_simplex(Broken, vec![0.5, 0.5], &SolverConfig::default())
      .err()
      .unwrap();
    assert!(err.to_string().contains("not defined"));
  }

  #[test]
  fn missing_starting_point_is_an_error() {
    let problem = Distance {
      target: vec![0.5, 0.5],
    };
    let err = Executor::new(problem, ProjectedGradient::default())
      .run()
      .err()
      .unwrap();
    assert!(err.to_string().contains("starting point"));
  }
}
