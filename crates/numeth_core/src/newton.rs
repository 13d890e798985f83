use crate::error::{NumericsError, Result};
use crate::sampling::{sample_curve, Curve};
use crate::traits::UnivariateFunction;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 1e-6,
        }
    }
}

impl NewtonSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(NumericsError::InvalidIterationLimit);
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(NumericsError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }
}

/// One estimate in a Newton run. The derivative is `None` for the last row of
/// a run, where it was never needed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationStep {
    pub iteration: usize,
    pub x: f64,
    pub fx: f64,
    pub dfx: Option<f64>,
}

/// Successive estimates x0, x1, ..., xk, starting with the initial guess.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub steps: Vec<IterationStep>,
}

impl IterationRecord {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn estimates(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.x).collect()
    }

    /// The path (x_i, f(x_i)) for plotting.
    pub fn path(&self) -> Curve {
        Curve {
            xs: self.steps.iter().map(|s| s.x).collect(),
            ys: self.steps.iter().map(|s| s.fx).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewtonResult {
    pub root: f64,
    /// `false` when the iteration limit was reached first; `root` is then the
    /// last estimate, not a verified root.
    pub converged: bool,
    pub iterations: usize,
    pub record: IterationRecord,
}

/// Newton-Raphson on a scalar function with a caller-supplied derivative.
///
/// Stops as soon as |f(x_{i+1})| < tolerance. A derivative of exactly zero is
/// fatal. Running out of iterations is not an error: the last estimate is
/// returned with `converged == false`.
pub fn find_root(
    f: &impl UnivariateFunction,
    fprime: &impl UnivariateFunction,
    x0: f64,
    settings: NewtonSettings,
) -> Result<NewtonResult> {
    settings.validate()?;

    // Most runs stop long before the limit, which may be arbitrarily large.
    let mut steps = Vec::with_capacity(settings.max_iterations.min(64).saturating_add(1));
    let mut x = x0;
    let mut fx = f.value(x)?;
    let mut converged = false;
    let mut iterations = 0usize;

    while iterations < settings.max_iterations {
        let dfx = fprime.value(x)?;
        if dfx == 0.0 {
            return Err(NumericsError::ZeroDerivative {
                x,
                iteration: iterations,
            });
        }
        steps.push(IterationStep {
            iteration: iterations,
            x,
            fx,
            dfx: Some(dfx),
        });

        x -= fx / dfx;
        fx = f.value(x)?;
        iterations += 1;
        debug!("Newton iteration {}: x = {}, f(x) = {}", iterations, x, fx);

        if fx.abs() < settings.tolerance {
            converged = true;
            break;
        }
    }

    steps.push(IterationStep {
        iteration: iterations,
        x,
        fx,
        dfx: None,
    });

    if converged {
        info!("Newton converged to {} after {} iterations.", x, iterations);
    } else {
        warn!(
            "Newton stopped after {} iterations without convergence (x = {}, |f(x)| = {}).",
            iterations,
            x,
            fx.abs()
        );
    }

    Ok(NewtonResult {
        root: x,
        converged,
        iterations,
        record: IterationRecord { steps },
    })
}

/// Curves of f and f' around a root, for plotting next to the iteration path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewtonPlot {
    pub function: Curve,
    pub derivative: Curve,
    pub path: Curve,
}

pub fn plot_around_root(
    f: &impl UnivariateFunction,
    fprime: &impl UnivariateFunction,
    result: &NewtonResult,
    half_width: f64,
    samples: usize,
) -> NewtonPlot {
    let (start, end) = (result.root - half_width, result.root + half_width);
    NewtonPlot {
        function: sample_curve(f, start, end, samples),
        derivative: sample_curve(fprime, start, end, samples),
        path: result.record.path(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation_engine::CompiledExpression;
    use crate::error::EvaluationError;
    use approx::assert_abs_diff_eq;

    fn compiled(source: &str) -> CompiledExpression {
        CompiledExpression::compile(source, &["x"]).expect("expression should compile")
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn converges_to_root_of_cubic() {
        let f = compiled("x**3 - 6*x**2 + 9*x");
        let df = compiled("3*x**2 - 12*x + 9");
        let settings = NewtonSettings::default();
        let result = find_root(&f, &df, 0.5, settings).expect("newton should run");

        assert!(result.converged);
        assert!(result.root.abs() < 1e-3);
        assert!(f.eval(&[result.root]).unwrap().abs() < settings.tolerance);
        assert!(result.record.len() <= settings.max_iterations + 1);
        assert_eq!(result.record.steps[0].x, 0.5);
        assert_eq!(result.record.steps.last().unwrap().x, result.root);
    }

    #[test]
    fn each_estimate_follows_newton_update() {
        let f = compiled("x**2 - 2");
        let df = compiled("2*x");
        let result = find_root(&f, &df, 1.0, NewtonSettings { max_iterations: 10, tolerance: 1e-12 })
            .expect("newton should run");

        assert_abs_diff_eq!(result.root, std::f64::consts::SQRT_2, epsilon = 1e-12);
        for pair in result.record.steps.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            let dfx = current.dfx.expect("derivative recorded for non-final rows");
            assert_eq!(next.x, current.x - current.fx / dfx);
        }
    }

    #[test]
    fn zero_derivative_is_fatal() {
        let f = compiled("x**2 + 1");
        let df = compiled("2*x");
        let result = find_root(&f, &df, 0.0, NewtonSettings::default());
        assert_eq!(result, Err(NumericsError::ZeroDerivative { x: 0.0, iteration: 0 }));
        assert_err_contains(find_root(&f, &df, 0.0, NewtonSettings::default()), "Derivative is zero");
    }

    #[test]
    fn iteration_cap_returns_last_estimate_without_error() {
        // No real roots: Newton wanders without converging.
        let f = compiled("x**2 + 1");
        let df = compiled("2*x");
        let settings = NewtonSettings { max_iterations: 5, tolerance: 1e-8 };
        let result = find_root(&f, &df, 0.5, settings).expect("cap is not an error");

        assert!(!result.converged);
        assert_eq!(result.iterations, 5);
        assert_eq!(result.record.len(), settings.max_iterations + 1);
        assert_eq!(result.record.steps.last().unwrap().x, result.root);
    }

    #[test]
    fn already_converged_guess_still_takes_one_step() {
        let f = compiled("x - 3");
        let df = compiled("1");
        let result = find_root(&f, &df, 3.0, NewtonSettings::default()).expect("newton should run");
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.root, 3.0);
    }

    #[test]
    fn huge_iteration_limit_is_accepted() {
        let f = compiled("x - 3");
        let df = compiled("1");
        for max_iterations in [usize::MAX, u32::MAX as usize, usize::MAX / 2] {
            let settings = NewtonSettings { max_iterations, tolerance: 1e-6 };
            let result = find_root(&f, &df, 3.0, settings).expect("newton should run");
            assert!(result.converged);
            assert_eq!(result.record.len(), 2);
        }
    }

    #[test]
    fn evaluation_errors_abort_the_run() {
        let f = compiled("log(x)");
        let df = compiled("1/x");
        // x1 = 3 - log(3) * 3 < 0, so f(x1) leaves the domain
        let result = find_root(&f, &df, 3.0, NewtonSettings::default());
        assert!(matches!(
            result,
            Err(NumericsError::Evaluation(EvaluationError::Domain { function: "log", .. }))
        ));
    }

    #[test]
    fn rejects_invalid_settings() {
        let f = compiled("x");
        let df = compiled("1");
        assert_err_contains(
            find_root(&f, &df, 1.0, NewtonSettings { max_iterations: 0, tolerance: 1e-6 }),
            "Iteration limit",
        );
        assert_err_contains(
            find_root(&f, &df, 1.0, NewtonSettings { max_iterations: 5, tolerance: 0.0 }),
            "Tolerance must be positive",
        );
    }

    #[test]
    fn plot_samples_span_root_neighbourhood() {
        let f = compiled("x**2 - 4");
        let df = compiled("2*x");
        let result = find_root(&f, &df, 3.0, NewtonSettings::default()).expect("newton should run");
        let plot = plot_around_root(&f, &df, &result, 5.0, 400);
        assert_eq!(plot.function.len(), 400);
        assert_abs_diff_eq!(plot.function.xs[0], result.root - 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(plot.derivative.xs[399], result.root + 5.0, epsilon = 1e-12);
        assert_eq!(plot.path.len(), result.record.len());
    }

    #[test]
    fn plot_window_outside_the_domain_keeps_the_root() {
        let f = compiled("log(x)");
        let df = compiled("1/x");
        let result = find_root(&f, &df, 0.5, NewtonSettings::default()).expect("newton should run");
        assert!(result.converged);
        assert_abs_diff_eq!(result.root, 1.0, epsilon = 1e-6);

        let plot = plot_around_root(&f, &df, &result, 5.0, 400);
        assert!(plot.function.ys[0].is_nan());
        assert!(plot.function.ys[399].is_finite());
        assert_eq!(plot.derivative.len(), 400);
    }
}
