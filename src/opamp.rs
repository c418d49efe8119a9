//! Built-in op-amp parameter library.
//!
//! A read-only `model name -> parameter set` map. The circuit layer consumes
//! this through [`OpAmpLibrary::lookup`]; it never mutates a looked-up
//! entry, it clones and applies caller overrides on top.

use std::collections::HashMap;

use crate::error::{CircuitError, Result};

/// Frequency-dependent op-amp parameters.
///
/// Open-loop gain is:
/// `a0 / (1 + j*f*a0/gbw) * exp(-j*2*pi*f*delay) * prod(1 + jf/zero) / prod(1 + jf/pole)`
#[derive(Debug, Clone, PartialEq)]
pub struct OpAmpParams {
    pub a0: f64,
    pub gbw: f64,
    pub delay: f64,
    pub zeros: Vec<f64>,
    pub poles: Vec<f64>,
    pub vnoise: f64,
    pub vcorner: f64,
    pub inoise: f64,
    pub icorner: f64,
    pub vmax: f64,
    pub imax: f64,
    pub slew: f64,
}

impl OpAmpParams {
    /// An idealized op-amp: infinite-ish gain, huge bandwidth, no noise.
    pub fn ideal() -> Self {
        OpAmpParams {
            a0: 1e12,
            gbw: 1e12,
            delay: 0.0,
            zeros: Vec::new(),
            poles: Vec::new(),
            vnoise: 0.0,
            vcorner: 0.0,
            inoise: 0.0,
            icorner: 0.0,
            vmax: f64::INFINITY,
            imax: f64::INFINITY,
            slew: f64::INFINITY,
        }
    }

    /// Apply a single named override. Keys match the DSL override table.
    pub fn apply_override(&mut self, key: &str, value: f64) -> Result<()> {
        match key {
            "a0" => self.a0 = value,
            "gbw" => self.gbw = value,
            "delay" => self.delay = value,
            "un" => self.vnoise = value,
            "uc" => self.vcorner = value,
            "in" => self.inoise = value,
            "ic" => self.icorner = value,
            "umax" => self.vmax = value,
            "imax" => self.imax = value,
            "sr" => self.slew = value,
            other => {
                return Err(CircuitError::config(format!(
                    "unknown op-amp override key: {other}"
                )))
            }
        }
        Ok(())
    }
}

/// A read-only lookup table of op-amp models, keyed case-insensitively.
#[derive(Debug, Clone)]
pub struct OpAmpLibrary {
    models: HashMap<String, OpAmpParams>,
}

impl OpAmpLibrary {
    /// The library shipped with this crate: a handful of real parameter
    /// sets plus an `IDEAL` entry, enough to drive the worked examples.
    pub fn builtin() -> Self {
        let mut models = HashMap::new();

        models.insert(
            "op27".to_string(),
            OpAmpParams {
                a0: 1.8e6,
                gbw: 8e6,
                delay: 0.0,
                zeros: Vec::new(),
                poles: vec![8e6],
                vnoise: 3.2e-9,
                vcorner: 2.7,
                inoise: 0.4e-12,
                icorner: 140.0,
                vmax: 13.0,
                imax: 0.01,
                slew: 2.8e6,
            },
        );

        models.insert(
            "tl072".to_string(),
            OpAmpParams {
                a0: 2.0e5,
                gbw: 3e6,
                delay: 0.0,
                zeros: Vec::new(),
                poles: Vec::new(),
                vnoise: 18e-9,
                vcorner: 50.0,
                inoise: 0.01e-12,
                icorner: 0.0,
                vmax: 13.5,
                imax: 0.04,
                slew: 13e6,
            },
        );

        models.insert("ideal".to_string(), OpAmpParams::ideal());

        OpAmpLibrary { models }
    }

    pub fn with_model(mut self, name: impl Into<String>, params: OpAmpParams) -> Self {
        self.models.insert(name.into().to_lowercase(), params);
        self
    }

    pub fn lookup(&self, model: &str) -> Result<OpAmpParams> {
        self.models
            .get(&model.to_lowercase())
            .cloned()
            .ok_or_else(|| CircuitError::not_found("op-amp model", model))
    }
}

impl Default for OpAmpLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_models_are_case_insensitive() {
        let lib = OpAmpLibrary::builtin();
        assert!(lib.lookup("OP27").is_ok());
        assert!(lib.lookup("Op27").is_ok());
    }

    #[test]
    fn unknown_model_fails() {
        let lib = OpAmpLibrary::builtin();
        assert!(lib.lookup("NE5534").is_err());
    }

    #[test]
    fn override_rejects_unknown_key() {
        let mut params = OpAmpParams::ideal();
        assert!(params.apply_override("bogus", 1.0).is_err());
        assert!(params.apply_override("gbw", 5e6).is_ok());
        assert_eq!(params.gbw, 5e6);
    }
}
