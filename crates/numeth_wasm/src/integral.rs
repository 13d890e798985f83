//! Composite trapezoid integration.

use anyhow::Context;
use numeth_core::api;
use numeth_core::quadrature::QuadratureResult;
use wasm_bindgen::prelude::*;

use crate::{to_js, to_js_error};

pub fn build_integral(expr: &str, a: f64, b: f64, n: u32) -> anyhow::Result<QuadratureResult> {
    api::trapezoid_integral(expr, a, b, n as usize)
        .with_context(|| format!("Integral of {} over [{}, {}] failed", expr, a, b))
}

#[wasm_bindgen]
pub fn trapezoid_integral(expr: &str, a: f64, b: f64, n: u32) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let result = build_integral(expr, a, b, n).map_err(to_js_error)?;
    to_js(&result)
}
