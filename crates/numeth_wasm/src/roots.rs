//! Newton-Raphson runs: single root with its iteration table, and the
//! two-root characteristic workflow.

use anyhow::Context;
use numeth_core::api;
use numeth_core::characteristic::CharacteristicReport;
use numeth_core::newton::{IterationStep, NewtonPlot};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{to_js, to_js_error};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewtonTable {
    pub root: f64,
    pub converged: bool,
    pub iterations: usize,
    /// (iteration, x, f(x), f'(x)) rows, starting at the initial guess.
    pub rows: Vec<IterationStep>,
    pub plot: NewtonPlot,
}

pub fn build_newton_table(
    expr: &str,
    deriv_expr: &str,
    x0: f64,
    max_iter: u32,
) -> anyhow::Result<NewtonTable> {
    let result = api::newton_root(expr, deriv_expr, x0, max_iter as usize)
        .with_context(|| format!("Newton-Raphson from x0 = {} failed", x0))?;
    let plot = api::newton_plot(expr, deriv_expr, &result).context("Plot sampling failed")?;
    Ok(NewtonTable {
        root: result.root,
        converged: result.converged,
        iterations: result.iterations,
        rows: result.record.steps,
        plot,
    })
}

#[wasm_bindgen]
pub fn newton_root(expr: &str, deriv_expr: &str, x0: f64, max_iter: u32) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let table = build_newton_table(expr, deriv_expr, x0, max_iter).map_err(to_js_error)?;
    to_js(&table)
}

pub fn build_characteristic_report(
    expr: &str,
    deriv_expr: &str,
    x0_guess1: f64,
    x0_guess2: f64,
    max_iter: u32,
) -> anyhow::Result<CharacteristicReport> {
    api::characteristic_roots(expr, deriv_expr, x0_guess1, x0_guess2, max_iter as usize)
        .with_context(|| format!("Characteristic roots of {} failed", expr))
}

#[wasm_bindgen]
pub fn characteristic_roots(
    expr: &str,
    deriv_expr: &str,
    x0_guess1: f64,
    x0_guess2: f64,
    max_iter: u32,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let report = build_characteristic_report(expr, deriv_expr, x0_guess1, x0_guess2, max_iter)
        .map_err(to_js_error)?;
    to_js(&report)
}
