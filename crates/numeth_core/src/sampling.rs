//! Uniform grids and sampled curves handed to the plotting layer.

use crate::error::EvaluationError;
use crate::traits::UnivariateFunction;
use serde::{Deserialize, Serialize};

/// `samples` equally spaced points from `start` to `end` inclusive.
///
/// Each point is computed from its index rather than by repeated addition,
/// and the last point is exactly `end`.
pub fn linspace(start: f64, end: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (samples - 1) as f64;
            (0..samples)
                .map(|i| {
                    if i == samples - 1 {
                        end
                    } else {
                        start + i as f64 * step
                    }
                })
                .collect()
        }
    }
}

/// Paired abscissae/ordinates, column-major so a chart can consume them directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl Curve {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Evaluates `f` at each of `xs`, failing on the first evaluation error.
    pub fn from_points(
        f: &impl UnivariateFunction,
        xs: Vec<f64>,
    ) -> Result<Self, EvaluationError> {
        let ys = xs
            .iter()
            .map(|&x| f.value(x))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { xs, ys })
    }
}

/// Samples `f` on `linspace(start, end, samples)` for display.
///
/// Points where `f` is undefined are kept with a NaN ordinate, so a pole or
/// a domain edge inside the window leaves a gap instead of failing the plot.
pub fn sample_curve(f: &impl UnivariateFunction, start: f64, end: f64, samples: usize) -> Curve {
    let xs = linspace(start, end, samples);
    let ys = xs.iter().map(|&x| f.value(x).unwrap_or(f64::NAN)).collect();
    Curve { xs, ys }
}
