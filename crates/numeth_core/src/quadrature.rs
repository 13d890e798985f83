//! Composite trapezoid rule over a uniform partition.

use crate::error::{NumericsError, Result};
use crate::sampling::{linspace, sample_curve, Curve};
use crate::traits::UnivariateFunction;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuadratureSettings {
    /// Resolution of the smooth integrand curve drawn behind the trapezoids.
    pub curve_samples: usize,
    pub max_partitions: usize,
}

impl Default for QuadratureSettings {
    fn default() -> Self {
        Self {
            curve_samples: 400,
            max_partitions: 1_000_000,
        }
    }
}

/// The n + 1 partition points x_i = a + i h and f(x_i).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadraturePartition {
    pub h: f64,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl QuadraturePartition {
    /// Number of sub-intervals.
    pub fn intervals(&self) -> usize {
        self.xs.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadratureResult {
    pub area: f64,
    pub partition: QuadraturePartition,
    /// Signed area of each trapezoid, in partition order.
    pub trapezoid_areas: Vec<f64>,
    /// Smooth integrand for display; NaN where the integrand is undefined.
    pub curve: Curve,
}

/// Approximates the integral of `f` over [a, b] with `n` trapezoids:
/// (h/2) (f(x0) + 2 Σ f(x_i) + f(x_n)).
pub fn integrate(
    f: &impl UnivariateFunction,
    a: f64,
    b: f64,
    n: usize,
    settings: QuadratureSettings,
) -> Result<QuadratureResult> {
    if n == 0 {
        return Err(NumericsError::InvalidPartition(n));
    }
    if n > settings.max_partitions {
        return Err(NumericsError::TooManyPartitions {
            requested: n,
            limit: settings.max_partitions,
        });
    }
    if !a.is_finite() || !b.is_finite() || b <= a {
        return Err(NumericsError::InvalidRange { start: a, end: b });
    }

    let h = (b - a) / n as f64;
    debug!("Trapezoid rule on [{}, {}] with n = {} (h = {}).", a, b, n, h);

    let partition_curve = Curve::from_points(f, linspace(a, b, n + 1))?;
    let ys = &partition_curve.ys;

    let interior: f64 = ys[1..n].iter().sum();
    let area = (h / 2.0) * (ys[0] + 2.0 * interior + ys[n]);

    let trapezoid_areas = ys.windows(2).map(|w| (h / 2.0) * (w[0] + w[1])).collect();
    let curve = sample_curve(f, a, b, settings.curve_samples);

    info!("Trapezoid area on [{}, {}] with {} intervals: {}", a, b, n, area);

    Ok(QuadratureResult {
        area,
        partition: QuadraturePartition {
            h,
            xs: partition_curve.xs,
            ys: partition_curve.ys,
        },
        trapezoid_areas,
        curve,
    })
}
