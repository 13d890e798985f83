use crate::error::{EvaluationError, NumericsError};
use crate::traits::{SlopeFunction, Steppable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forward Euler: x_next = x + h f(t, x). First order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euler;

impl Steppable for Euler {
    fn advance(
        &self,
        slope: &impl SlopeFunction,
        t: f64,
        x: f64,
        h: f64,
    ) -> Result<f64, EvaluationError> {
        Ok(x + h * slope.slope(t, x)?)
    }
}

/// Heun / improved Euler predictor-corrector. Second order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Heun;

impl Steppable for Heun {
    fn advance(
        &self,
        slope: &impl SlopeFunction,
        t: f64,
        x: f64,
        h: f64,
    ) -> Result<f64, EvaluationError> {
        // Predictor: plain Euler step
        let k1 = slope.slope(t, x)?;
        let predicted = x + h * k1;

        // Corrector: slope at the predicted end point
        let k2 = slope.slope(t + h, predicted)?;

        Ok(x + h * (k1 + k2) / 2.0)
    }
}

/// Classic Runge-Kutta 4th Order Solver
#[derive(Debug, Clone, Copy, Default)]
pub struct RK4;

impl Steppable for RK4 {
    fn advance(
        &self,
        slope: &impl SlopeFunction,
        t: f64,
        x: f64,
        h: f64,
    ) -> Result<f64, EvaluationError> {
        let half = 0.5 * h;

        // k1 = f(t, x)
        let k1 = slope.slope(t, x)?;

        // k2 = f(t + h/2, x + h*k1/2)
        let k2 = slope.slope(t + half, x + half * k1)?;

        // k3 = f(t + h/2, x + h*k2/2)
        let k3 = slope.slope(t + half, x + half * k2)?;

        // k4 = f(t + h, x + h*k3)
        let k4 = slope.slope(t + h, x + h * k3)?;

        // x_next = x + h/6 * (k1 + 2k2 + 2k3 + k4)
        Ok(x + (h / 6.0) * (k1 + 2.0 * k2 + 2.0 * k3 + k4))
    }
}

/// Method selector for the fixed-step integrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OdeMethod {
    Euler,
    Heun,
    Rk4,
}

impl OdeMethod {
    pub const ALL: [OdeMethod; 3] = [OdeMethod::Euler, OdeMethod::Heun, OdeMethod::Rk4];

    /// Global order of accuracy of the scheme.
    pub fn order(self) -> u32 {
        match self {
            OdeMethod::Euler => 1,
            OdeMethod::Heun => 2,
            OdeMethod::Rk4 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OdeMethod::Euler => "euler",
            OdeMethod::Heun => "heun",
            OdeMethod::Rk4 => "rk4",
        }
    }
}

impl Steppable for OdeMethod {
    fn advance(
        &self,
        slope: &impl SlopeFunction,
        t: f64,
        x: f64,
        h: f64,
    ) -> Result<f64, EvaluationError> {
        match self {
            OdeMethod::Euler => Euler.advance(slope, t, x, h),
            OdeMethod::Heun => Heun.advance(slope, t, x, h),
            OdeMethod::Rk4 => RK4.advance(slope, t, x, h),
        }
    }
}

impl fmt::Display for OdeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OdeMethod {
    type Err = NumericsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euler" => Ok(OdeMethod::Euler),
            "heun" | "improved_euler" | "improved-euler" => Ok(OdeMethod::Heun),
            "rk4" | "runge_kutta" | "runge-kutta" => Ok(OdeMethod::Rk4),
            _ => Err(NumericsError::UnknownMethod(s.to_string())),
        }
    }
}
