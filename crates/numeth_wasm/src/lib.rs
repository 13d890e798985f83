//! WASM bridge exposing the numeth entry points to the browser UI.
//!
//! Every exported function has a `build_*` twin that returns plain Rust
//! values, so the conversion logic stays testable off the wasm target.

mod expression;
mod integral;
mod ode;
mod roots;

pub use expression::WasmExpression;
pub use integral::{build_integral, trapezoid_integral};
pub use ode::{build_ode_table, solve_ode, OdeTable};
pub use roots::{
    build_characteristic_report, build_newton_table, characteristic_roots, newton_root,
    NewtonTable,
};

use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Flattens an error chain into the single message shown by the UI.
pub(crate) fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}
