//! Compiled formula handle for repeated evaluation from JS.

use anyhow::Context;
use numeth_core::equation_engine::CompiledExpression;
use wasm_bindgen::prelude::*;

use crate::to_js_error;

#[wasm_bindgen]
pub struct WasmExpression {
    compiled: CompiledExpression,
}

impl WasmExpression {
    pub(crate) fn build(source: &str, var_names: &[String]) -> anyhow::Result<Self> {
        let compiled = CompiledExpression::compile(source, var_names)
            .with_context(|| format!("Invalid expression '{}'", source))?;
        Ok(Self { compiled })
    }

    pub(crate) fn eval_values(&self, values: &[f64]) -> anyhow::Result<f64> {
        self.compiled
            .eval(values)
            .with_context(|| format!("Evaluating '{}' failed", self.compiled.source()))
    }
}

#[wasm_bindgen]
impl WasmExpression {
    #[wasm_bindgen(constructor)]
    pub fn new(source: &str, var_names: Vec<String>) -> Result<WasmExpression, JsValue> {
        console_error_panic_hook::set_once();
        Self::build(source, &var_names).map_err(to_js_error)
    }

    pub fn eval(&self, values: &[f64]) -> Result<f64, JsValue> {
        self.eval_values(values).map_err(to_js_error)
    }

    /// Evaluates a single-variable expression at every abscissa.
    pub fn sample(&self, xs: &[f64]) -> Result<Vec<f64>, JsValue> {
        xs.iter()
            .map(|&x| self.eval_values(&[x]))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(to_js_error)
    }

    pub fn var_names(&self) -> Vec<String> {
        self.compiled.var_names().to_vec()
    }
}
