//! Roots of the characteristic equation a m^2 + b m + c = 0 of the linear
//! ODE a x'' + b x' + c x = 0, found iteratively with Newton-Raphson.
//!
//! The two roots come from two independent Newton runs started at different
//! guesses. For complex or repeated roots both runs may land on the same real
//! value, hit a zero derivative, or stop at the iteration limit; the report
//! keeps the closed-form roots alongside so the caller can tell.

use crate::error::{NumericsError, Result};
use crate::newton::{find_root, NewtonResult, NewtonSettings};
use crate::polynomial::Polynomial;
use crate::sampling::{linspace, sample_curve, Curve};
use crate::traits::UnivariateFunction;
use log::{debug, info};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CharacteristicSettings {
    pub newton: NewtonSettings,
    /// Roots closer than this are treated as one double root.
    pub root_tolerance: f64,
    pub curve_range: (f64, f64),
    pub curve_samples: usize,
    pub solution_horizon: f64,
    pub solution_samples: usize,
}

impl Default for CharacteristicSettings {
    fn default() -> Self {
        Self {
            newton: NewtonSettings {
                max_iterations: 20,
                tolerance: 1e-8,
            },
            root_tolerance: 1e-6,
            curve_range: (-10.0, 10.0),
            curve_samples: 400,
            solution_horizon: 10.0,
            solution_samples: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadraticCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl QuadraticCoefficients {
    /// Takes the degree 2, 1 and 0 coefficients of an expanded polynomial.
    pub fn from_polynomial(poly: &Polynomial) -> Result<Self> {
        if poly.degree() > 2 {
            return Err(NumericsError::NotPolynomial(format!(
                "degree {} is above 2",
                poly.degree()
            )));
        }
        Ok(Self {
            a: poly.coeff(2),
            b: poly.coeff(1),
            c: poly.coeff(0),
        })
    }

    pub fn discriminant(&self) -> f64 {
        self.b * self.b - 4.0 * self.a * self.c
    }

    /// Closed-form roots, or `None` when the equation is not quadratic.
    pub fn closed_form_roots(&self) -> Option<[Complex64; 2]> {
        if self.a == 0.0 {
            return None;
        }
        let sqrt_disc = Complex64::new(self.discriminant(), 0.0).sqrt();
        let two_a = 2.0 * self.a;
        Some([
            (-self.b + sqrt_disc) / two_a,
            (-self.b - sqrt_disc) / two_a,
        ])
    }

    /// The ODE this equation is characteristic of.
    pub fn differential_equation(&self) -> String {
        format!("{}x'' + {}x' + {}x = 0", self.a, self.b, self.c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCase {
    DoubleRoot,
    DistinctRoots,
}

/// General solution family x(t) built from the two roots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneralSolution {
    pub case: RootCase,
    pub m1: f64,
    pub m2: f64,
}

impl GeneralSolution {
    pub fn classify(m1: f64, m2: f64, tolerance: f64) -> Self {
        let case = if (m1 - m2).abs() < tolerance {
            RootCase::DoubleRoot
        } else {
            RootCase::DistinctRoots
        };
        Self { case, m1, m2 }
    }

    /// x(t) for the given constants.
    pub fn eval(&self, t: f64, k1: f64, k2: f64) -> f64 {
        match self.case {
            RootCase::DoubleRoot => {
                let growth = (self.m1 * t).exp();
                k1 * growth + t * k2 * growth
            }
            RootCase::DistinctRoots => k1 * (self.m1 * t).exp() + k2 * (self.m2 * t).exp(),
        }
    }

    pub fn formula(&self) -> String {
        match self.case {
            RootCase::DoubleRoot => format!(
                "x(t) = k1·e^({m:.6}·t) + t·k2·e^({m:.6}·t)",
                m = self.m1
            ),
            RootCase::DistinctRoots => format!(
                "x(t) = k1·e^({:.6}·t) + k2·e^({:.6}·t)",
                self.m1, self.m2
            ),
        }
    }
}

/// The two iterated roots and how they classify.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootPair {
    pub m1: f64,
    pub m2: f64,
    pub case: RootCase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicCurves {
    pub characteristic: Curve,
    pub first_path: Curve,
    pub second_path: Curve,
    /// Particular solution with k1 = k2 = 1.
    pub solution: Curve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicReport {
    pub coefficients: QuadraticCoefficients,
    pub discriminant: f64,
    pub differential_equation: String,
    pub first: NewtonResult,
    pub second: NewtonResult,
    pub roots: RootPair,
    pub solution: GeneralSolution,
    pub formula: String,
    pub closed_form: Option<[Complex64; 2]>,
    pub curves: CharacteristicCurves,
}

/// Runs Newton from both guesses on `f` and classifies the result.
///
/// `coefficients` are supplied by the caller (typically from
/// [`Polynomial::from_expr`]); only the discriminant and the closed-form
/// comparison use them.
pub fn resolve_roots(
    f: &impl UnivariateFunction,
    fprime: &impl UnivariateFunction,
    coefficients: QuadraticCoefficients,
    guesses: (f64, f64),
    settings: CharacteristicSettings,
) -> Result<CharacteristicReport> {
    if settings.root_tolerance.is_nan() || settings.root_tolerance <= 0.0 {
        return Err(NumericsError::InvalidTolerance(settings.root_tolerance));
    }
    let discriminant = coefficients.discriminant();
    debug!(
        "Characteristic equation {}m² + {}m + {} = 0 (discriminant {}).",
        coefficients.a, coefficients.b, coefficients.c, discriminant
    );

    let first = find_root(f, fprime, guesses.0, settings.newton)?;
    let second = find_root(f, fprime, guesses.1, settings.newton)?;

    let solution = GeneralSolution::classify(first.root, second.root, settings.root_tolerance);
    info!(
        "Characteristic roots m1 = {}, m2 = {} ({:?}).",
        solution.m1, solution.m2, solution.case
    );

    let (lo, hi) = settings.curve_range;
    let characteristic = sample_curve(f, lo, hi, settings.curve_samples);
    let solution_ts = linspace(0.0, settings.solution_horizon, settings.solution_samples);
    let solution_curve = Curve {
        ys: solution_ts.iter().map(|&t| solution.eval(t, 1.0, 1.0)).collect(),
        xs: solution_ts,
    };

    let curves = CharacteristicCurves {
        characteristic,
        first_path: first.record.path(),
        second_path: second.record.path(),
        solution: solution_curve,
    };

    Ok(CharacteristicReport {
        coefficients,
        discriminant,
        differential_equation: coefficients.differential_equation(),
        roots: RootPair {
            m1: solution.m1,
            m2: solution.m2,
            case: solution.case,
        },
        formula: solution.formula(),
        closed_form: coefficients.closed_form_roots(),
        solution,
        first,
        second,
        curves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation_engine::{parse, CompiledExpression};
    use approx::assert_abs_diff_eq;

    fn run(source: &str, derivative: &str, guesses: (f64, f64)) -> Result<CharacteristicReport> {
        let f = CompiledExpression::compile(source, &["x"]).unwrap();
        let df = CompiledExpression::compile(derivative, &["x"]).unwrap();
        let poly = Polynomial::from_expr(&parse(source).unwrap(), "x").unwrap();
        let coefficients = QuadraticCoefficients::from_polynomial(&poly).unwrap();
        resolve_roots(&f, &df, coefficients, guesses, CharacteristicSettings::default())
    }

    #[test]
    fn distinct_real_roots_are_found_from_both_sides() {
        let report = run("2*x**2 + 8*x - 10", "4*x + 8", (-5.0, 5.0)).expect("resolves");

        assert_eq!(report.coefficients, QuadraticCoefficients { a: 2.0, b: 8.0, c: -10.0 });
        assert_eq!(report.discriminant, 144.0);
        assert_eq!(report.roots.case, RootCase::DistinctRoots);
        assert_abs_diff_eq!(report.roots.m1, -5.0, epsilon = 1e-8);
        assert_abs_diff_eq!(report.roots.m2, 1.0, epsilon = 1e-8);
        assert!(report.first.converged && report.second.converged);
        assert_eq!(report.differential_equation, "2x'' + 8x' + -10x = 0");
        assert!(report.formula.starts_with("x(t) = k1·e^(-5.000000·t) + k2·e^(1.000000·t)"));

        let closed = report.closed_form.expect("quadratic");
        assert_abs_diff_eq!(closed[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(closed[1].re, -5.0, epsilon = 1e-12);
    }

    #[test]
    fn classification_uses_root_tolerance() {
        assert_eq!(GeneralSolution::classify(2.0, 2.0 + 1e-7, 1e-6).case, RootCase::DoubleRoot);
        assert_eq!(GeneralSolution::classify(2.0, 2.0 + 1e-5, 1e-6).case, RootCase::DistinctRoots);
    }

    #[test]
    fn repeated_root_converges_linearly_from_each_side() {
        // Newton converges only linearly onto a double root, so |f| < 1e-8
        // leaves each estimate ~1e-4 away from 2, on opposite sides.
        let report = run("x**2 - 4*x + 4", "2*x - 4", (0.0, 5.0)).expect("resolves");
        assert_eq!(report.discriminant, 0.0);
        assert_eq!(report.roots.case, RootCase::DistinctRoots);
        assert!(report.roots.m1 < 2.0 && report.roots.m2 > 2.0);

        let f = CompiledExpression::compile("x**2 - 4*x + 4", &["x"]).unwrap();
        let df = CompiledExpression::compile("2*x - 4", &["x"]).unwrap();
        let settings = CharacteristicSettings {
            root_tolerance: 1e-3,
            ..CharacteristicSettings::default()
        };
        let coefficients = QuadraticCoefficients { a: 1.0, b: -4.0, c: 4.0 };
        let report = resolve_roots(&f, &df, coefficients, (0.0, 5.0), settings).expect("resolves");
        assert_eq!(report.roots.case, RootCase::DoubleRoot);
        assert!(report.formula.contains("t·k2"));
        // x(t) = e^{2t} + t e^{2t} at t = 1
        assert_abs_diff_eq!(report.solution.eval(1.0, 1.0, 1.0), 2.0 * 2f64.exp(), epsilon = 1e-2);
    }

    #[test]
    fn curves_have_configured_resolution() {
        let report = run("x**2 - 1", "2*x", (-3.0, 3.0)).expect("resolves");
        let settings = CharacteristicSettings::default();
        assert_eq!(report.curves.characteristic.len(), settings.curve_samples);
        assert_eq!(report.curves.characteristic.xs[0], -10.0);
        assert_eq!(report.curves.solution.len(), settings.solution_samples);
        assert_eq!(report.curves.first_path.len(), report.first.record.len());
        assert_eq!(report.curves.second_path.len(), report.second.record.len());
        assert_abs_diff_eq!(report.curves.solution.ys[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn complex_roots_surface_through_newton() {
        // m^2 + 1 has no real roots; starting at 0 hits f'(0) = 0.
        let result = run("x**2 + 1", "2*x", (0.0, 1.0));
        assert!(matches!(result, Err(NumericsError::ZeroDerivative { .. })));

        let report = run("x**2 + 1", "2*x", (0.5, 1.5)).expect("cap is not an error");
        assert!(!report.first.converged);
        let closed = report.closed_form.expect("quadratic");
        assert_abs_diff_eq!(closed[0].im.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn linear_equation_has_no_closed_form_pair() {
        let poly = Polynomial::from_expr(&parse("3*x + 6").unwrap(), "x").unwrap();
        let coefficients = QuadraticCoefficients::from_polynomial(&poly).unwrap();
        assert_eq!(coefficients.a, 0.0);
        assert!(coefficients.closed_form_roots().is_none());
    }

    #[test]
    fn cubic_is_rejected() {
        let poly = Polynomial::from_expr(&parse("x**3 - x").unwrap(), "x").unwrap();
        assert!(matches!(
            QuadraticCoefficients::from_polynomial(&poly),
            Err(NumericsError::NotPolynomial(_))
        ));
    }
}
