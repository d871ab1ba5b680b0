//! WASM bindings for Resonator Core.
//!
//! JavaScript-friendly bindings for driving the resonator from a Web Audio
//! AudioWorklet.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmResonator } from 'resonator_core';
//!
//! await init();
//!
//! const sim = new WasmResonator(48000);
//! sim.set_pipe_length(0.35);
//!
//! // In AudioWorkletProcessor.process():
//! const output = outputs[0][0];
//! sim.process_block(output);
//! ```

use wasm_bindgen::prelude::*;

use crate::output::OutputStage;
use crate::simulation::{ControlParams, Simulation, SimulationConfig};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(err: crate::ResonatorError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// WASM-compatible resonator.
///
/// Setters only record the new value; it is applied at the start of the
/// next processed block.
#[wasm_bindgen]
pub struct WasmResonator {
    simulation: Simulation,
    controls: ControlParams,
    output: OutputStage,
    scratch: Vec<f32>,
}

#[wasm_bindgen]
impl WasmResonator {
    /// Create a resonator with default geometry, sounding immediately.
    ///
    /// # Example
    /// ```javascript
    /// const sim = new WasmResonator(48000);
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64) -> Result<WasmResonator, JsValue> {
        let config = SimulationConfig::default();
        let controls = ControlParams::new(&config);
        let simulation = Simulation::with_config(sample_rate, config).map_err(to_js)?;

        Ok(WasmResonator {
            simulation,
            controls,
            output: OutputStage::default(),
            scratch: Vec::new(),
        })
    }

    /// Render `output.len()` samples into `output`.
    ///
    /// # Example (AudioWorklet)
    /// ```javascript
    /// class ResonatorProcessor extends AudioWorkletProcessor {
    ///   process(inputs, outputs) {
    ///     const output = outputs[0][0];
    ///     if (output) {
    ///       this.sim.process_block(output);
    ///     }
    ///     return true;
    ///   }
    /// }
    /// ```
    #[wasm_bindgen]
    pub fn process_block(&mut self, output: &mut [f32]) {
        // rejected values are logged and the previous ones stay in effect
        let _ = self.simulation.apply_controls(&self.controls.snapshot());

        let wave = self.simulation.advance(output.len() as f64);
        self.output.convert(wave, &mut self.scratch);

        output.fill(0.0);
        let len = self.scratch.len().min(output.len());
        output[..len].copy_from_slice(&self.scratch[..len]);
    }

    /// Render `len` samples into a new array.
    #[wasm_bindgen]
    pub fn process_block_alloc(&mut self, len: usize) -> Vec<f32> {
        let mut output = vec![0.0; len];
        self.process_block(&mut output);
        output
    }

    /// Fade the source in.
    #[wasm_bindgen]
    pub fn start(&self) {
        self.controls.set_running(true);
    }

    /// Fade the source out; the pipe keeps ringing until its echoes decay.
    #[wasm_bindgen]
    pub fn stop(&self) {
        self.controls.set_running(false);
    }

    #[wasm_bindgen]
    pub fn set_frequency(&self, frequency: f64) {
        self.controls.set_frequency(frequency);
    }

    /// Changing the echo count clears the pipe.
    #[wasm_bindgen]
    pub fn set_echo_iterations(&self, echo_iterations: usize) {
        self.controls.set_echo_iterations(echo_iterations);
    }

    /// Changing the length clears the pipe.
    #[wasm_bindgen]
    pub fn set_pipe_length(&self, pipe_length: f64) {
        self.controls.set_pipe_length(pipe_length);
    }

    /// Changing the radius clears the pipe.
    #[wasm_bindgen]
    pub fn set_pipe_radius(&self, pipe_radius: f64) {
        self.controls.set_pipe_radius(pipe_radius);
    }

    /// Get the sample rate this resonator was configured with.
    #[wasm_bindgen(getter)]
    pub fn sample_rate(&self) -> f64 {
        self.simulation.sample_rate()
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get the default sample rate.
#[wasm_bindgen]
pub fn default_sample_rate() -> f64 {
    crate::DEFAULT_SAMPLE_RATE
}
