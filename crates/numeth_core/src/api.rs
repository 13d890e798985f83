//! Text-level entry points used by presentation layers.
//!
//! Each call parses its expressions, runs one computation to completion and
//! returns an owned result. Nothing is cached between calls.

use crate::characteristic::{
    resolve_roots, CharacteristicReport, CharacteristicSettings, QuadraticCoefficients,
};
use crate::equation_engine::{parse, CompiledExpression};
use crate::error::{EvaluationError, Result};
use crate::ivp::{solve, IntegrationSettings, Trajectory};
use crate::newton::{find_root, plot_around_root, NewtonPlot, NewtonResult, NewtonSettings};
use crate::polynomial::Polynomial;
use crate::quadrature::{integrate, QuadratureResult, QuadratureSettings};
use crate::solvers::OdeMethod;
use std::collections::HashMap;

/// Name of the single variable in root-finding and quadrature expressions.
pub const UNIVARIATE_VARIABLE: &str = "x";

/// Half-width and resolution of the f / f' plot around a Newton root.
pub const NEWTON_PLOT_HALF_WIDTH: f64 = 5.0;
pub const NEWTON_PLOT_SAMPLES: usize = 400;

fn univariate(source: &str) -> Result<CompiledExpression> {
    Ok(CompiledExpression::compile(source, &[UNIVARIATE_VARIABLE])?)
}

/// Evaluates `expr` once with the given variable values.
pub fn evaluate(expr: &str, bindings: &HashMap<String, f64>) -> Result<f64, EvaluationError> {
    crate::equation_engine::evaluate(expr, bindings)
}

/// Solves dx/dt = expr(t, x), where `var_names` gives the names used for
/// (t, x) inside `expr`.
pub fn ode_solve(
    method: OdeMethod,
    expr: &str,
    var_names: (&str, &str),
    t0: f64,
    x0: f64,
    h: f64,
    t_final: f64,
) -> Result<Trajectory> {
    ode_solve_with(
        method,
        expr,
        var_names,
        t0,
        x0,
        h,
        t_final,
        IntegrationSettings::default(),
    )
}

#[allow(clippy::too_many_arguments)]
pub fn ode_solve_with(
    method: OdeMethod,
    expr: &str,
    var_names: (&str, &str),
    t0: f64,
    x0: f64,
    h: f64,
    t_final: f64,
    settings: IntegrationSettings,
) -> Result<Trajectory> {
    let slope = CompiledExpression::compile(expr, &[var_names.0, var_names.1])?;
    solve(method, &slope, t0, x0, h, t_final, settings)
}

/// Newton-Raphson on `expr` with the derivative given as `deriv_expr`.
pub fn newton_root(expr: &str, deriv_expr: &str, x0: f64, max_iter: usize) -> Result<NewtonResult> {
    let f = univariate(expr)?;
    let fprime = univariate(deriv_expr)?;
    let settings = NewtonSettings {
        max_iterations: max_iter,
        ..NewtonSettings::default()
    };
    find_root(&f, &fprime, x0, settings)
}

/// Curves of f and f' around the root of a finished run, plus its path.
pub fn newton_plot(expr: &str, deriv_expr: &str, result: &NewtonResult) -> Result<NewtonPlot> {
    let f = univariate(expr)?;
    let fprime = univariate(deriv_expr)?;
    Ok(plot_around_root(&f, &fprime, result, NEWTON_PLOT_HALF_WIDTH, NEWTON_PLOT_SAMPLES))
}

/// Both roots of the quadratic `expr` in `x`, each from its own Newton run.
pub fn characteristic_roots(
    expr: &str,
    deriv_expr: &str,
    x0_guess1: f64,
    x0_guess2: f64,
    max_iter: usize,
) -> Result<CharacteristicReport> {
    let defaults = CharacteristicSettings::default();
    let settings = CharacteristicSettings {
        newton: NewtonSettings {
            max_iterations: max_iter,
            ..defaults.newton
        },
        ..defaults
    };
    characteristic_roots_with(expr, deriv_expr, (x0_guess1, x0_guess2), settings)
}

pub fn characteristic_roots_with(
    expr: &str,
    deriv_expr: &str,
    guesses: (f64, f64),
    settings: CharacteristicSettings,
) -> Result<CharacteristicReport> {
    let f = univariate(expr)?;
    let fprime = univariate(deriv_expr)?;
    let poly = Polynomial::from_expr(&parse(expr)?, UNIVARIATE_VARIABLE)?;
    let coefficients = QuadraticCoefficients::from_polynomial(&poly)?;
    resolve_roots(&f, &fprime, coefficients, guesses, settings)
}

/// Composite trapezoid rule for `expr` in `x` over [a, b] with n intervals.
pub fn trapezoid_integral(expr: &str, a: f64, b: f64, n: usize) -> Result<QuadratureResult> {
    let f = univariate(expr)?;
    integrate(&f, a, b, n, QuadratureSettings::default())
}
