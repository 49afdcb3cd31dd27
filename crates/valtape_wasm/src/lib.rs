use serde::Serialize;
use serde_wasm_bindgen::to_value;
use valtape_core::{CompareOp, OpEnum, Registry, Tape, TapeError};
use wasm_bindgen::prelude::*;

fn to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

/// Result of a traced evaluation.
#[derive(Serialize)]
struct EvalReport {
    dep: Vec<f64>,
    compare_false: usize,
    output: String,
}

/// A tape over `f64` values, recorded and optimized from JavaScript.
#[wasm_bindgen]
pub struct WasmTape {
    tape: Tape<f64>,
    registry: Registry<f64>,
    compare_false: usize,
    output: String,
}

#[wasm_bindgen]
impl WasmTape {
    #[wasm_bindgen(constructor)]
    pub fn new(n_ind: usize) -> WasmTape {
        console_error_panic_hook::set_once();
        WasmTape {
            tape: Tape::new(n_ind),
            registry: Registry::new(),
            compare_false: 0,
            output: String::new(),
        }
    }

    pub fn n_ind(&self) -> usize {
        self.tape.n_ind()
    }

    pub fn n_val(&self) -> usize {
        self.tape.n_val()
    }

    pub fn zero_index(&self) -> usize {
        self.tape.zero_index()
    }

    fn check_args(&self, args: &[usize]) -> Result<(), JsValue> {
        match args.iter().find(|&&i| i >= self.tape.n_val()) {
            Some(i) => Err(JsValue::from_str(&format!(
                "Argument {} is not a value of this tape (n_val = {}).",
                i,
                self.tape.n_val()
            ))),
            None => Ok(()),
        }
    }

    fn compare_op(name: &str) -> Result<CompareOp, JsValue> {
        CompareOp::from_name(name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown comparison: {name}")))
    }

    pub fn con(&mut self, value: f64) -> usize {
        self.tape.record_con(value)
    }

    pub fn unary(&mut self, name: &str, x: usize) -> Result<usize, JsValue> {
        let op = OpEnum::from_name(name)
            .filter(|op| op.is_unary())
            .ok_or_else(|| JsValue::from_str(&format!("Unknown unary operator: {name}")))?;
        self.check_args(&[x])?;
        Ok(self.tape.record_op(op, &[x]))
    }

    pub fn binary(&mut self, name: &str, left: usize, right: usize) -> Result<usize, JsValue> {
        let op = OpEnum::from_name(name)
            .filter(|op| op.is_binary())
            .ok_or_else(|| JsValue::from_str(&format!("Unknown binary operator: {name}")))?;
        self.check_args(&[left, right])?;
        Ok(self.tape.record_op(op, &[left, right]))
    }

    pub fn csum(&mut self, add: Vec<usize>, sub: Vec<usize>) -> Result<usize, JsValue> {
        self.check_args(&add)?;
        self.check_args(&sub)?;
        Ok(self.tape.record_csum(&add, &sub))
    }

    pub fn compare(&mut self, cmp: &str, left: usize, right: usize) -> Result<(), JsValue> {
        let cmp = Self::compare_op(cmp)?;
        self.check_args(&[left, right])?;
        self.tape.record_comp(cmp, left, right);
        Ok(())
    }

    pub fn cexp(
        &mut self,
        cmp: &str,
        left: usize,
        right: usize,
        if_true: usize,
        if_false: usize,
    ) -> Result<usize, JsValue> {
        let cmp = Self::compare_op(cmp)?;
        self.check_args(&[left, right, if_true, if_false])?;
        Ok(self.tape.record_cexp(cmp, left, right, if_true, if_false))
    }

    pub fn print(&mut self, before: &str, after: &str, flag: usize, value: usize) -> Result<(), JsValue> {
        self.check_args(&[flag, value])?;
        self.tape.record_pri(before, after, flag, value);
        Ok(())
    }

    pub fn set_dep(&mut self, dep: Vec<usize>) -> Result<(), JsValue> {
        if self.tape.dep_is_set() {
            return Err(JsValue::from_str("Dependent values are already set."));
        }
        self.check_args(&dep)?;
        self.tape.set_dep(dep);
        Ok(())
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), JsValue> {
        self.tape.set_option(name, value).map_err(to_js)
    }

    fn run(&mut self, x: Vec<f64>, trace: bool) -> Result<Vec<f64>, JsValue> {
        if x.len() != self.tape.n_ind() {
            return Err(to_js(
                TapeError::ValueLength {
                    expected: self.tape.n_ind(),
                    actual: x.len(),
                }
                .into(),
            ));
        }
        let mut val_vec = vec![f64::NAN; self.tape.n_val()];
        val_vec[..x.len()].copy_from_slice(&x);
        let mut out: Vec<u8> = Vec::new();
        self.compare_false = self
            .tape
            .eval_to(&self.registry, trace, &mut val_vec, &mut out)
            .map_err(to_js)?;
        self.output = String::from_utf8_lossy(&out).into_owned();
        Ok(self.tape.dep_vec().iter().map(|&i| val_vec[i]).collect())
    }

    /// Evaluates at `x` and returns the dependent values.
    pub fn eval(&mut self, x: Vec<f64>) -> Result<Vec<f64>, JsValue> {
        self.run(x, false)
    }

    /// Evaluates at `x` with one trace line per usage.
    pub fn trace(&mut self, x: Vec<f64>) -> Result<JsValue, JsValue> {
        let dep = self.run(x, true)?;
        let report = EvalReport {
            dep,
            compare_false: self.compare_false,
            output: self.output.clone(),
        };
        to_value(&report).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Text written by print usages during the last evaluation.
    pub fn output(&self) -> String {
        self.output.clone()
    }

    /// Comparisons that did not hold during the last `eval`.
    pub fn compare_false(&self) -> usize {
        self.compare_false
    }

    fn replace(&mut self, new: anyhow::Result<Tape<f64>>) -> Result<(), JsValue> {
        let mut new = new.map_err(to_js)?;
        self.tape.swap(&mut new);
        Ok(())
    }

    pub fn dead_code(&mut self) -> Result<(), JsValue> {
        let new = self.tape.dead_code(&self.registry);
        self.replace(new)
    }

    pub fn renumber(&mut self) -> Result<(), JsValue> {
        let new = self.tape.renumber();
        self.replace(new)
    }

    pub fn fold_con(&mut self) -> Result<(), JsValue> {
        let new = self.tape.fold_con(&self.registry);
        self.replace(new)
    }

    pub fn summation(&mut self) -> Result<(), JsValue> {
        let new = self.tape.summation();
        self.replace(new)
    }

    pub fn optimize(&mut self) -> Result<(), JsValue> {
        let new = self.tape.optimize(&self.registry);
        self.replace(new)
    }

    pub fn stats(&self) -> Result<JsValue, JsValue> {
        to_value(&self.tape.stats()).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}
