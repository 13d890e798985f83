//! Fixed-step driver for scalar initial-value problems.

use crate::error::{NumericsError, Result};
use crate::solvers::OdeMethod;
use crate::traits::{SlopeFunction, Steppable};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// What to do when the final bound does not lie after the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "steps", rename_all = "snake_case")]
pub enum RangePolicy {
    /// Fail with `InvalidRange`.
    Reject,
    /// Integrate exactly this many steps from the start instead.
    DefaultSteps(usize),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntegrationSettings {
    /// Slack on the stopping test `t < t_final - boundary_tolerance`, so that
    /// rounding in `t0 + n h` cannot add a spurious final step.
    pub boundary_tolerance: f64,
    pub range_policy: RangePolicy,
    pub max_steps: usize,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            boundary_tolerance: 1e-9,
            range_policy: RangePolicy::Reject,
            max_steps: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub n: usize,
    pub t: f64,
    pub x: f64,
}

/// Ordered output of one solve. `n` starts at 0 and the spacing in `t` is
/// the constant step size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub method: OdeMethod,
    pub step: f64,
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    /// Dependent value at the last emitted point.
    pub fn final_value(&self) -> Option<f64> {
        self.last().map(|p| p.x)
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.t).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }
}

/// Integrates dx/dt = slope(t, x) from (t0, x0) to t_final with step h.
///
/// All preconditions are checked before the first slope evaluation. A slope
/// failure at any stage aborts the whole solve.
pub fn solve(
    method: OdeMethod,
    slope: &impl SlopeFunction,
    t0: f64,
    x0: f64,
    h: f64,
    t_final: f64,
    settings: IntegrationSettings,
) -> Result<Trajectory> {
    if h.is_nan() || h <= 0.0 || h.is_infinite() {
        return Err(NumericsError::InvalidStep(h));
    }
    if !t0.is_finite() || !t_final.is_finite() || !x0.is_finite() {
        return Err(NumericsError::InvalidRange {
            start: t0,
            end: t_final,
        });
    }

    let t_end = if t_final > t0 {
        t_final
    } else {
        match settings.range_policy {
            RangePolicy::Reject => {
                return Err(NumericsError::InvalidRange {
                    start: t0,
                    end: t_final,
                })
            }
            RangePolicy::DefaultSteps(steps) => {
                let t_end = t0 + steps as f64 * h;
                warn!(
                    "Final bound {} is not after start {}; integrating {} default steps to {}.",
                    t_final, t0, steps, t_end
                );
                t_end
            }
        }
    };

    let required = ((t_end - t0 - settings.boundary_tolerance) / h).ceil().max(0.0);
    if required > settings.max_steps as f64 {
        return Err(NumericsError::TooManySteps {
            required: required as usize,
            limit: settings.max_steps,
        });
    }

    debug!(
        "Integrating with {} from t = {} to t = {} (h = {}, ~{} steps).",
        method, t0, t_end, h, required
    );

    let mut points = Vec::with_capacity((required as usize).min(1 << 16).saturating_add(1));
    let mut n = 0usize;
    let mut t = t0;
    let mut x = x0;
    points.push(TrajectoryPoint { n, t, x });

    while t < t_end - settings.boundary_tolerance {
        x = method.advance(slope, t, x, h)?;
        n += 1;
        // Index-based time keeps the grid free of accumulated rounding.
        t = t0 + n as f64 * h;
        points.push(TrajectoryPoint { n, t, x });
    }

    info!(
        "{} integration finished after {} steps at t = {} (x = {}).",
        method, n, t, x
    );

    Ok(Trajectory {
        method,
        step: h,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvaluationError;
    use approx::assert_abs_diff_eq;

    fn constant(_t: f64, _x: f64) -> std::result::Result<f64, EvaluationError> {
        Ok(1.0)
    }

    fn ramp(t: f64, _x: f64) -> std::result::Result<f64, EvaluationError> {
        Ok(t)
    }

    fn final_error(method: OdeMethod, h: f64) -> f64 {
        let trajectory = solve(method, &ramp, 0.0, 0.0, h, 1.0, IntegrationSettings::default())
            .expect("solve should succeed");
        (trajectory.final_value().unwrap() - 0.5).abs()
    }

    #[test]
    fn straight_line_solution_is_exact_for_every_method() {
        for method in OdeMethod::ALL {
            let trajectory = solve(method, &constant, 0.0, 2.0, 0.1, 1.0, IntegrationSettings::default())
                .expect("solve should succeed");
            assert_eq!(trajectory.len(), 11);
            for point in trajectory.points() {
                assert_abs_diff_eq!(point.x, 2.0 + point.t, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn trajectory_grid_is_uniform_and_indexed_from_zero() {
        let trajectory = solve(OdeMethod::Euler, &constant, 0.3, 0.0, 0.1, 1.3, IntegrationSettings::default())
            .expect("solve should succeed");
        for (i, point) in trajectory.points().iter().enumerate() {
            assert_eq!(point.n, i);
            assert_abs_diff_eq!(point.t, 0.3 + i as f64 * 0.1, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(trajectory.last().unwrap().t, 1.3, epsilon = 1e-12);
        assert_eq!(trajectory.times().len(), trajectory.values().len());
    }

    #[test]
    fn step_count_is_ceiling_of_range_over_step() {
        let trajectory = solve(OdeMethod::Euler, &constant, 0.0, 0.0, 0.3, 1.0, IntegrationSettings::default())
            .expect("solve should succeed");
        // ceil(1.0 / 0.3) = 4 steps, overshooting to t = 1.2
        assert_eq!(trajectory.len(), 5);
        assert_abs_diff_eq!(trajectory.last().unwrap().t, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn rk4_matches_quadratic_solution() {
        let trajectory = solve(OdeMethod::Rk4, &ramp, 0.0, 0.0, 0.1, 1.0, IntegrationSettings::default())
            .expect("solve should succeed");
        assert_abs_diff_eq!(trajectory.final_value().unwrap(), 0.5, epsilon = 1e-10);
    }

    #[test]
    fn euler_error_shrinks_linearly() {
        let coarse = final_error(OdeMethod::Euler, 0.1);
        let fine = final_error(OdeMethod::Euler, 0.05);
        // Euler on x' = t has error exactly h / 2
        assert_abs_diff_eq!(coarse, 0.05, epsilon = 1e-9);
        assert_abs_diff_eq!(coarse / fine, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn heun_and_rk4_converge_at_their_orders() {
        let cubic = |t: f64, _x: f64| -> std::result::Result<f64, EvaluationError> { Ok(4.0 * t.powi(3)) };
        let error = |method: OdeMethod, h: f64| {
            let trajectory = solve(method, &cubic, 0.0, 0.0, h, 1.0, IntegrationSettings::default())
                .expect("solve should succeed");
            (trajectory.final_value().unwrap() - 1.0).abs()
        };
        let heun_ratio = error(OdeMethod::Heun, 0.1) / error(OdeMethod::Heun, 0.05);
        assert!((heun_ratio - 4.0).abs() < 0.2, "Heun ratio {heun_ratio}");

        let growth = |_t: f64, x: f64| -> std::result::Result<f64, EvaluationError> { Ok(x) };
        let rk4_error = |h: f64| {
            let trajectory = solve(OdeMethod::Rk4, &growth, 0.0, 1.0, h, 1.0, IntegrationSettings::default())
                .expect("solve should succeed");
            (trajectory.final_value().unwrap() - std::f64::consts::E).abs()
        };
        let rk4_ratio = rk4_error(0.1) / rk4_error(0.05);
        assert!((rk4_ratio - 16.0).abs() < 1.0, "RK4 ratio {rk4_ratio}");
    }

    #[test]
    fn non_positive_step_is_rejected_before_any_evaluation() {
        let calls = std::cell::Cell::new(0);
        let counting = |_t: f64, x: f64| -> std::result::Result<f64, EvaluationError> {
            calls.set(calls.get() + 1);
            Ok(x)
        };
        for h in [0.0, -0.1, f64::NAN] {
            let result = solve(OdeMethod::Rk4, &counting, 0.0, 1.0, h, 1.0, IntegrationSettings::default());
            assert!(matches!(result, Err(NumericsError::InvalidStep(_))));
        }
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn inverted_range_is_rejected_by_default() {
        let result = solve(OdeMethod::Euler, &constant, 1.0, 0.0, 0.1, 1.0, IntegrationSettings::default());
        assert_eq!(result, Err(NumericsError::InvalidRange { start: 1.0, end: 1.0 }));
    }

    #[test]
    fn fallback_policy_integrates_default_steps() {
        let settings = IntegrationSettings {
            range_policy: RangePolicy::DefaultSteps(10),
            ..IntegrationSettings::default()
        };
        let trajectory = solve(OdeMethod::Heun, &constant, 0.0, 0.0, 0.5, -3.0, settings)
            .expect("fallback range should be used");
        assert_eq!(trajectory.len(), 11);
        assert_abs_diff_eq!(trajectory.last().unwrap().t, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn excessive_step_count_is_rejected() {
        let settings = IntegrationSettings {
            max_steps: 100,
            ..IntegrationSettings::default()
        };
        let result = solve(OdeMethod::Euler, &constant, 0.0, 0.0, 0.001, 1.0, settings);
        assert!(matches!(
            result,
            Err(NumericsError::TooManySteps { limit: 100, .. })
        ));
    }

    #[test]
    fn slope_failure_aborts_solve() {
        let blows_up = |t: f64, x: f64| -> std::result::Result<f64, EvaluationError> {
            if t > 0.45 {
                Err(EvaluationError::Domain {
                    function: "log",
                    argument: -x,
                })
            } else {
                Ok(1.0)
            }
        };
        let result = solve(OdeMethod::Euler, &blows_up, 0.0, 0.0, 0.1, 1.0, IntegrationSettings::default());
        assert!(matches!(
            result,
            Err(NumericsError::Evaluation(EvaluationError::Domain { function: "log", .. }))
        ));
    }
}
