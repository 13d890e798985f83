//! Fixed-step ODE solves returned as table columns.

use anyhow::Context;
use numeth_core::api;
use numeth_core::ivp::{IntegrationSettings, RangePolicy, Trajectory};
use numeth_core::solvers::OdeMethod;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{to_js, to_js_error};

/// Columns of the n / t / x table, ready for the grid and the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OdeTable {
    pub method: OdeMethod,
    pub step: f64,
    pub n: Vec<usize>,
    pub t: Vec<f64>,
    pub x: Vec<f64>,
}

impl From<&Trajectory> for OdeTable {
    fn from(trajectory: &Trajectory) -> Self {
        Self {
            method: trajectory.method,
            step: trajectory.step,
            n: trajectory.points().iter().map(|p| p.n).collect(),
            t: trajectory.times(),
            x: trajectory.values(),
        }
    }
}

/// `fallback_steps == 0` rejects an inverted range; any other value
/// integrates that many steps from `t0` instead.
#[allow(clippy::too_many_arguments)]
pub fn build_ode_table(
    method: &str,
    expr: &str,
    indep: &str,
    dep: &str,
    t0: f64,
    x0: f64,
    h: f64,
    t_final: f64,
    fallback_steps: u32,
) -> anyhow::Result<OdeTable> {
    let method: OdeMethod = method.parse()?;
    let range_policy = match fallback_steps {
        0 => RangePolicy::Reject,
        steps => RangePolicy::DefaultSteps(steps as usize),
    };
    let settings = IntegrationSettings {
        range_policy,
        ..IntegrationSettings::default()
    };
    let trajectory = api::ode_solve_with(method, expr, (indep, dep), t0, x0, h, t_final, settings)
        .with_context(|| format!("{} solve of dx/dt = {} failed", method, expr))?;
    Ok(OdeTable::from(&trajectory))
}

#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn solve_ode(
    method: &str,
    expr: &str,
    indep: &str,
    dep: &str,
    t0: f64,
    x0: f64,
    h: f64,
    t_final: f64,
    fallback_steps: u32,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let table = build_ode_table(method, expr, indep, dep, t0, x0, h, t_final, fallback_steps)
        .map_err(to_js_error)?;
    to_js(&table)
}
