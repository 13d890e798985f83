use crate::error::EvaluationError;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types the expression VM can evaluate over.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Right-hand side f(t, x) of the scalar IVP dx/dt = f(t, x).
///
/// Evaluation is fallible: a user expression may leave its domain mid-solve,
/// and the solver must abort rather than skip the step.
pub trait SlopeFunction {
    fn slope(&self, t: f64, x: f64) -> Result<f64, EvaluationError>;
}

impl<F> SlopeFunction for F
where
    F: Fn(f64, f64) -> Result<f64, EvaluationError>,
{
    fn slope(&self, t: f64, x: f64) -> Result<f64, EvaluationError> {
        self(t, x)
    }
}

/// A real function of one real variable, used by root finding and quadrature.
pub trait UnivariateFunction {
    fn value(&self, x: f64) -> Result<f64, EvaluationError>;
}

impl<F> UnivariateFunction for F
where
    F: Fn(f64) -> Result<f64, EvaluationError>,
{
    fn value(&self, x: f64) -> Result<f64, EvaluationError> {
        self(x)
    }
}

/// A fixed-step scheme that advances a scalar IVP by one step.
pub trait Steppable {
    /// Returns x(t + h) given x(t).
    /// slope: right-hand side of the ODE
    /// t: current value of the independent variable
    /// x: current value of the dependent variable
    /// h: step size (validated by the caller)
    fn advance(
        &self,
        slope: &impl SlopeFunction,
        t: f64,
        x: f64,
        h: f64,
    ) -> Result<f64, EvaluationError>;
}
