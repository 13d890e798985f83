//! Error taxonomy shared by every numerical routine in the crate.

use thiserror::Error;

/// Failures raised while parsing, compiling or evaluating a user expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("Syntax error: {message}")]
    Syntax { message: String },
    #[error("Unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    #[error("'{0}' is a function and cannot be used as a value")]
    FunctionAsValue(String),
    #[error("Variable name '{0}' collides with a reserved name")]
    ReservedName(String),
    #[error("Variable '{0}' is declared more than once")]
    DuplicateVariable(String),
    #[error("Expected {expected} variable values, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Math domain error: {function}({argument})")]
    Domain {
        function: &'static str,
        argument: f64,
    },
    #[error("Expression produced a non-finite value")]
    NonFinite,
}

impl EvaluationError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        EvaluationError::Syntax {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the solvers and the text-level entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericsError {
    #[error("Step size h must be positive (got {0})")]
    InvalidStep(f64),
    #[error("Final bound {end} must be greater than start {start}")]
    InvalidRange { start: f64, end: f64 },
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("Derivative is zero at x = {x} (iteration {iteration}); Newton iteration cannot continue")]
    ZeroDerivative { x: f64, iteration: usize },
    #[error("Integration would need {required} steps, above the limit of {limit}")]
    TooManySteps { required: usize, limit: usize },
    #[error("Partition count must be at least 1 (got {0})")]
    InvalidPartition(usize),
    #[error("Partition count {requested} is above the limit of {limit}")]
    TooManyPartitions { requested: usize, limit: usize },
    #[error("Iteration limit must be at least 1")]
    InvalidIterationLimit,
    #[error("Tolerance must be positive (got {0})")]
    InvalidTolerance(f64),
    #[error("Expression is not a quadratic polynomial: {0}")]
    NotPolynomial(String),
    #[error("Unknown integration method '{0}'")]
    UnknownMethod(String),
}

pub type Result<T, E = NumericsError> = std::result::Result<T, E>;
