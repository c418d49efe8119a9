//! Circuit graph representation: nodes, components, and noise sources.
//!
//! A [`Circuit`] owns a node interner and an insertion-ordered component
//! list. Enumeration order is part of the contract (see module docs on
//! [`graph`]): tests and the MNA builder both depend on it.

mod component;
mod graph;
mod node;
mod noise;

pub use component::{Component, InductorHandle, Input, InputType, Inductor, OpAmp};
pub use graph::Circuit;
pub use node::{NodeId, NodeInterner};
pub use noise::NoiseSource;
