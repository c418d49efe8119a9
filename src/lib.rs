//! # accirc_core
//!
//! An AC small-signal circuit simulation core: Modified Nodal Analysis over
//! a complex coefficient matrix, swept across a frequency vector, driven by
//! a LISO-compatible netlist DSL.
//!
//! This library provides:
//! - A node-interned circuit model over resistors, capacitors, inductors
//!   (with mutual coupling), frequency-dependent op-amps, and a single
//!   input source
//! - A complex-valued MNA builder with a hand-rolled LU solver supporting
//!   both forward and adjoint solves
//! - AC transfer-function analysis and AC noise analysis (with optional
//!   input-referral)
//! - A hand-written recursive-descent parser for the netlist DSL
//! - A parser for the reference binary's textual output, and a runner to
//!   invoke that binary for cross-validation
//!
//! ## Architecture
//!
//! - [`quantity`] - SI-prefixed numeric parsing/formatting
//! - [`circuit`] - node interner, component model, noise sources
//! - [`opamp`] - built-in op-amp parameter library
//! - [`solver`] - MNA assembly, transfer-function sweep, noise sweep
//! - [`solution`] - frequency-indexed function container and algebra
//! - [`dsl`] - netlist lexer, parser, and circuit/analysis builder
//! - [`liso_output`] - reference-output parser, for cross-validation
//! - [`runner`] - external reference-binary invocation
//! - [`config`] - TOML configuration with full defaults
//!
//! ## Usage
//!
//! ```no_run
//! let source = std::fs::read_to_string("circuit.liso").unwrap();
//! let script = accirc_core::dsl::parse(&source).unwrap();
//! let library = accirc_core::opamp::OpAmpLibrary::builtin();
//! let (circuit, freq_spec, request) = accirc_core::dsl::build(&script, &library).unwrap();
//! let frequencies = accirc_core::dsl::expand_frequencies(&freq_spec).unwrap();
//! match request {
//!     accirc_core::dsl::AnalysisRequest::Transfer { sinks } => {
//!         let _solution = accirc_core::solver::transfer::sweep(&circuit, &frequencies, &sinks, false);
//!     }
//!     accirc_core::dsl::AnalysisRequest::Noise { sink, .. } => {
//!         let constants = accirc_core::config::Constants::default();
//!         let _solution = accirc_core::solver::noise::sweep(&circuit, &frequencies, &sink, false, &constants, false);
//!     }
//! }
//! ```

pub mod circuit;
pub mod config;
pub mod dsl;
pub mod error;
pub mod liso_output;
pub mod opamp;
pub mod quantity;
pub mod runner;
pub mod solution;
pub mod solver;

pub use circuit::Circuit;
pub use error::{CircuitError, Result};
pub use solution::Solution;

/// Default relative tolerance used by [`solution::Solution::difference`]
/// when none is specified by the caller.
pub const DEFAULT_DIFFERENCE_TOLERANCE: f64 = 1e-4;
