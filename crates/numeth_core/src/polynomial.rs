//! Expansion of a parsed expression into a dense univariate polynomial.

use crate::equation_engine::{BinaryOp, Expr, Function, CONSTANTS};
use crate::error::{EvaluationError, NumericsError, Result};

/// Exponents above this are refused rather than expanded.
const MAX_EXPANDED_DEGREE: usize = 64;

/// Coefficients in increasing degree: `coeffs[k]` multiplies `var^k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    pub fn constant(value: f64) -> Self {
        Self::from_coeffs(vec![value])
    }

    pub fn from_coeffs(mut coeffs: Vec<f64>) -> Self {
        while coeffs.len() > 1 && coeffs.last() == Some(&0.0) {
            coeffs.pop();
        }
        if coeffs.is_empty() {
            coeffs.push(0.0);
        }
        Self { coeffs }
    }

    fn variable() -> Self {
        Self::from_coeffs(vec![0.0, 1.0])
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// Coefficient of `var^k` (zero beyond the degree).
    pub fn coeff(&self, k: usize) -> f64 {
        self.coeffs.get(k).copied().unwrap_or(0.0)
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    fn as_constant(&self) -> Option<f64> {
        (self.degree() == 0).then(|| self.coeffs[0])
    }

    fn add(&self, other: &Self) -> Self {
        let len = self.coeffs.len().max(other.coeffs.len());
        Self::from_coeffs((0..len).map(|k| self.coeff(k) + other.coeff(k)).collect())
    }

    fn scale(&self, factor: f64) -> Self {
        Self::from_coeffs(self.coeffs.iter().map(|c| c * factor).collect())
    }

    fn mul(&self, other: &Self) -> Self {
        let mut coeffs = vec![0.0; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        Self::from_coeffs(coeffs)
    }

    /// Horner evaluation.
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    /// Expands `expr` as a polynomial in `var`.
    ///
    /// Constant sub-expressions (including whitelisted function calls on
    /// constants) are folded; any other use of `var` inside a function, a
    /// denominator or an exponent is rejected.
    pub fn from_expr(expr: &Expr, var: &str) -> Result<Self> {
        match expr {
            Expr::Number(n) => Ok(Self::constant(*n)),
            Expr::Variable(name) => {
                if name == var {
                    Ok(Self::variable())
                } else if let Some((_, value)) = CONSTANTS.iter().find(|(c, _)| *c == name.as_str()) {
                    Ok(Self::constant(*value))
                } else {
                    Err(EvaluationError::UnknownSymbol(name.clone()).into())
                }
            }
            Expr::Neg(operand) => Ok(Self::from_expr(operand, var)?.scale(-1.0)),
            Expr::Call(name, arg) => {
                let function = Function::lookup(name)
                    .ok_or_else(|| EvaluationError::UnknownFunction(name.clone()))?;
                let inner = Self::from_expr(arg, var)?;
                let value = inner.as_constant().ok_or_else(|| {
                    NumericsError::NotPolynomial(format!("{}() of an expression in {}", name, var))
                })?;
                Ok(Self::constant(function.apply(value)?))
            }
            Expr::Binary(left, op, right) => {
                let lhs = Self::from_expr(left, var)?;
                let rhs = Self::from_expr(right, var)?;
                match op {
                    BinaryOp::Add => Ok(lhs.add(&rhs)),
                    BinaryOp::Sub => Ok(lhs.add(&rhs.scale(-1.0))),
                    BinaryOp::Mul => Ok(lhs.mul(&rhs)),
                    BinaryOp::Div => {
                        let divisor = rhs.as_constant().ok_or_else(|| {
                            NumericsError::NotPolynomial(format!("division by an expression in {}", var))
                        })?;
                        if divisor == 0.0 {
                            return Err(EvaluationError::DivisionByZero.into());
                        }
                        Ok(lhs.scale(1.0 / divisor))
                    }
                    BinaryOp::Pow => Self::power(&lhs, &rhs, var),
                }
            }
        }
    }

    fn power(base: &Self, exponent: &Self, var: &str) -> Result<Self> {
        let exponent = exponent.as_constant().ok_or_else(|| {
            NumericsError::NotPolynomial(format!("exponent depends on {}", var))
        })?;
        if let Some(base) = base.as_constant() {
            if base == 0.0 && exponent < 0.0 {
                return Err(EvaluationError::DivisionByZero.into());
            }
            let value = base.powf(exponent);
            if !value.is_finite() {
                return Err(EvaluationError::NonFinite.into());
            }
            return Ok(Self::constant(value));
        }
        if exponent < 0.0 || exponent.fract() != 0.0 {
            return Err(NumericsError::NotPolynomial(format!(
                "non-integer or negative power {} of an expression in {}",
                exponent, var
            )));
        }
        // base is non-constant here, so degree() >= 1.
        if exponent > (MAX_EXPANDED_DEGREE / base.degree()) as f64 {
            return Err(NumericsError::NotPolynomial(format!(
                "expansion exceeds degree {}",
                MAX_EXPANDED_DEGREE
            )));
        }
        let exponent = exponent as usize;
        Ok((0..exponent).fold(Self::constant(1.0), |acc, _| acc.mul(base)))
    }
}
