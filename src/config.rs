//! Configuration loading (C11).
//!
//! A missing config file is never an error -- [`Config::default`] supplies
//! every constant the core consumes. Only a malformed file fails, with
//! [`CircuitError::Config`].

use std::path::Path;

use serde::Deserialize;

use crate::error::{CircuitError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Constants {
    /// Boltzmann constant, J/K.
    #[serde(rename = "kB")]
    pub k_b: f64,
    /// Ambient temperature, K.
    #[serde(rename = "T")]
    pub t: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Constants {
            k_b: 1.380649e-23,
            t: 298.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Format {
    pub table: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Liso {
    pub path: Option<String>,
}

/// Top-level configuration. `plot` is retained as an opaque table the core
/// never interprets.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub constants: Constants,
    pub format: Format,
    pub liso: Liso,
    #[serde(rename = "plot")]
    pub plot: toml::value::Table,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| CircuitError::config(e.to_string()))
    }

    /// Discover the reference binary path: explicit config value, else the
    /// `LISO_PATH` environment variable.
    pub fn liso_path(&self) -> Option<String> {
        self.liso
            .path
            .clone()
            .or_else(|| std::env::var("LISO_PATH").ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_constant() {
        let config = Config::default();
        assert_relative_eq(config.constants.k_b, 1.380649e-23);
        assert_relative_eq(config.constants.t, 298.15);
    }

    fn assert_relative_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-30 || (a - b).abs() / b.abs() < 1e-12);
    }

    #[test]
    fn parses_partial_overrides() {
        let text = "[constants]\nT = 300.0\n";
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.constants.t, 300.0);
        // kB falls back to its Default since it wasn't present in the TOML.
        assert_relative_eq(config.constants.k_b, 1.380649e-23);
    }
}
