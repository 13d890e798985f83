//! The `numeth_core` crate holds the numerical engine behind the numeth tools:
//! fixed-step ODE integration, Newton-Raphson root finding and the composite
//! trapezoid rule, all driven by user-typed formulas.
//!
//! Key components:
//! - **Equation Engine**: a sandboxed parser and bytecode VM that turns formula text into callables.
//! - **Solvers / IVP**: Euler, Heun and RK4 steppers plus the fixed-step trajectory driver.
//! - **Newton / Characteristic**: single-root Newton runs and the two-root characteristic workflow.
//! - **Quadrature**: composite trapezoid integration.
//! - **API**: text-in, result-out entry points for presentation layers.
pub mod api;
pub mod characteristic;
pub mod equation_engine;
pub mod error;
pub mod ivp;
pub mod newton;
pub mod polynomial;
pub mod quadrature;
pub mod sampling;
pub mod solvers;
pub mod traits;

pub use error::{EvaluationError, NumericsError, Result};
