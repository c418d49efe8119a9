//! AC analysis: complex MNA assembly, transfer-function sweeps, and
//! noise-projection sweeps.
//!
//! The matrix structure at each frequency is:
//! ```text
//! [ node KCL rows   ][ node voltages  ]   [ injected currents ]
//! [ branch eqn rows ][ branch currents] = [ branch RHS values ]
//! ```
//! Every component contributes exactly one branch-current row (§4.3); there
//! is no separate "usually zero" block since op-amps and inputs always own
//! a branch row too.

mod mna;
pub mod noise;
pub mod transfer;

pub use mna::{opamp_gain, stamp, MnaMatrix};

use crate::circuit::Circuit;
use crate::error::{CircuitError, Result};

/// Where a transfer function or noise projection is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// A node voltage.
    Node(String),
    /// A component's branch current.
    Branch(String),
}

impl Sink {
    /// Resolve to a row index in the MNA unknown vector.
    pub fn row(&self, circuit: &Circuit) -> Result<usize> {
        match self {
            Sink::Node(name) => Ok(circuit.lookup_node(name)?.0),
            Sink::Branch(name) => {
                let idx = circuit
                    .components()
                    .iter()
                    .position(|c| c.name().eq_ignore_ascii_case(name))
                    .ok_or_else(|| CircuitError::not_found("component", name))?;
                Ok(circuit.node_count() + idx)
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Sink::Node(name) => name,
            Sink::Branch(name) => name,
        }
    }
}
