//! LISO-compatible netlist DSL: lexer, parser, and the circuit/analysis
//! builder that turns a parsed [`Script`] into a [`crate::circuit::Circuit`]
//! plus an [`AnalysisRequest`].
//!
//! Grammar (one statement per line, `#` starts a comment to end of line):
//!
//! ```text
//! r name value n1 n2
//! c name value n1 n2
//! l name value n1 n2
//! op name model n+ n- nout [key=value ...]
//! freq lin|log start stop steps
//! uinput n+ [n- [Z]]
//! iinput n+ [Z]
//! uoutput target[:scale ...] ... | all | allop
//! ioutput target[:scale ...] ... | all | allop
//! noise sink source[:+|-|u] ... | all | allop | allr
//! ```
//!
//! `uoutput`/`ioutput` and `noise` are mutually exclusive within one script;
//! `freq` must appear exactly once.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use parser::Parser;

use crate::circuit::{Circuit, InputType, NoiseSource};
use crate::error::{CircuitError, Result};
use crate::opamp::OpAmpLibrary;
use crate::solver::Sink;

/// What the script asked the core to compute.
#[derive(Debug, Clone)]
pub enum AnalysisRequest {
    Transfer { sinks: Vec<Sink> },
    Noise { sink: Sink, requested_labels: Vec<String> },
}

/// Parse `source` and build the circuit plus analysis request it describes.
pub fn parse(source: &str) -> Result<Script> {
    Parser::new(source).parse()
}

pub fn build(script: &Script, library: &OpAmpLibrary) -> Result<(Circuit, FreqSpec, AnalysisRequest)> {
    let mut circuit = Circuit::new();
    let mut freq_spec = None;
    let mut request: Option<AnalysisRequest> = None;

    for instruction in &script.instructions {
        match instruction {
            Instruction::Resistor { name, value, n1, n2 } => {
                circuit.add_resistor(name, *value, n1, n2)?
            }
            Instruction::Capacitor { name, value, n1, n2 } => {
                circuit.add_capacitor(name, *value, n1, n2)?
            }
            Instruction::Inductor { name, value, n1, n2 } => {
                circuit.add_inductor(name, *value, n1, n2)?
            }
            Instruction::OpAmp { name, model, n_plus, n_minus, n_out, overrides } => {
                let overrides_ref: Vec<(&str, f64)> =
                    overrides.iter().map(|(k, v)| (k.as_str(), *v)).collect();
                circuit.add_library_opamp(library, name, model, n_plus, n_minus, n_out, &overrides_ref)?;
            }
            Instruction::Freq(spec) => freq_spec = Some(spec.clone()),
            Instruction::UInput(spec) => build_input(&mut circuit, spec, InputType::Voltage)?,
            Instruction::IInput(spec) => build_input(&mut circuit, spec, InputType::Current)?,
            Instruction::UOutput(specs) => {
                request = Some(AnalysisRequest::Transfer {
                    sinks: expand_output_sinks(&circuit, specs, true)?,
                });
            }
            Instruction::IOutput(specs) => {
                request = Some(AnalysisRequest::Transfer {
                    sinks: expand_output_sinks(&circuit, specs, false)?,
                });
            }
            Instruction::Noise { sink, sources } => {
                let sink = resolve_sink(&circuit, sink)?;
                request = Some(AnalysisRequest::Noise {
                    sink,
                    requested_labels: expand_noise_sources(&circuit, sources)?,
                });
            }
        }
    }

    let freq_spec = freq_spec.ok_or_else(|| CircuitError::topology("script has no freq directive"))?;
    let request = request.ok_or_else(|| CircuitError::topology("script requests no outputs"))?;
    Ok((circuit, freq_spec, request))
}

/// Expand the `freq` directive into the concrete frequency vector (§4.7:
/// `steps+1` points inclusive).
pub fn expand_frequencies(spec: &FreqSpec) -> Result<Vec<f64>> {
    if spec.start <= 0.0 || spec.stop <= 0.0 {
        return Err(CircuitError::topology("frequencies must be strictly positive"));
    }
    if spec.stop < spec.start {
        return Err(CircuitError::topology("freq stop must not be less than start"));
    }
    let n = spec.steps as usize;
    let mut out = Vec::with_capacity(n + 1);
    match spec.kind {
        SweepKind::Linear => {
            let step = (spec.stop - spec.start) / spec.steps as f64;
            for i in 0..=n {
                out.push(spec.start + step * i as f64);
            }
        }
        SweepKind::Logarithmic => {
            let log_start = spec.start.log10();
            let log_stop = spec.stop.log10();
            let step = (log_stop - log_start) / spec.steps as f64;
            for i in 0..=n {
                out.push(10f64.powf(log_start + step * i as f64));
            }
        }
    }
    Ok(out)
}

fn resolve_sink(circuit: &Circuit, name: &str) -> Result<Sink> {
    if circuit.lookup_node(name).is_ok() {
        Ok(Sink::Node(name.to_string()))
    } else if circuit.lookup_component(name).is_ok() {
        Ok(Sink::Branch(name.to_string()))
    } else {
        Err(CircuitError::not_found("node or component", name))
    }
}

/// The LISO default source impedance for a single-ended voltage input with
/// no explicit `Z` argument.
const DEFAULT_INPUT_IMPEDANCE: f64 = 50.0;

fn build_input(circuit: &mut Circuit, spec: &InputSpec, input_type: InputType) -> Result<()> {
    match input_type {
        InputType::Voltage => {
            let z = spec.impedance.unwrap_or(DEFAULT_INPUT_IMPEDANCE);
            let minus = spec.n_minus.clone().unwrap_or_else(|| "gnd".to_string());
            if z > 0.0 {
                const INTERNAL: &str = "__uin_src";
                circuit.add_resistor("rsrc_in", z, INTERNAL, &spec.n_plus)?;
                circuit.add_input("in", InputType::Voltage, INTERNAL, &minus, None)?;
            } else {
                circuit.add_input("in", InputType::Voltage, &spec.n_plus, &minus, None)?;
            }
        }
        InputType::Current => {
            if spec.n_minus.is_some() {
                return Err(CircuitError::topology("iinput does not accept a floating (n+ n- Z) form"));
            }
            if let Some(z) = spec.impedance {
                if z > 0.0 {
                    circuit.add_resistor("rsrc_in", z, &spec.n_plus, "gnd")?;
                }
            }
            circuit.add_input("in", InputType::Current, &spec.n_plus, "gnd", None)?;
        }
        InputType::Noise => unreachable!("uinput/iinput never produce a Noise-typed input"),
    }
    Ok(())
}

fn expand_output_sinks(circuit: &Circuit, specs: &[OutputSpec], voltage: bool) -> Result<Vec<Sink>> {
    let mut sinks = Vec::new();
    for spec in specs {
        match spec {
            OutputSpec::Named { target, .. } => {
                sinks.push(if voltage {
                    Sink::Node(target.clone())
                } else {
                    Sink::Branch(target.clone())
                });
            }
            OutputSpec::All => {
                if voltage {
                    sinks.extend(circuit.interner().names().map(|n| Sink::Node(n.to_string())));
                } else {
                    sinks.extend(circuit.components().iter().map(|c| Sink::Branch(c.name().to_string())));
                }
            }
            OutputSpec::AllOpamp => {
                for c in circuit.components() {
                    if let crate::circuit::Component::OpAmp(op) = c {
                        sinks.push(if voltage {
                            Sink::Node(circuit.interner().name(op.n_out.expect("op-amp output is never ground")).to_string())
                        } else {
                            Sink::Branch(op.name.clone())
                        });
                    }
                }
            }
        }
    }
    Ok(sinks)
}

fn expand_noise_sources(circuit: &Circuit, specs: &[NoiseSpec]) -> Result<Vec<String>> {
    let all_sources = circuit.noise_sources();
    let mut labels = Vec::new();
    for spec in specs {
        match spec {
            NoiseSpec::All => labels.extend(all_sources.iter().map(|s| s.label())),
            NoiseSpec::AllOpamp => labels.extend(
                all_sources
                    .iter()
                    .filter(|s| !matches!(s, NoiseSource::Johnson { .. }))
                    .map(|s| s.label()),
            ),
            NoiseSpec::AllResistor => labels.extend(
                all_sources
                    .iter()
                    .filter(|s| matches!(s, NoiseSource::Johnson { .. }))
                    .map(|s| s.label()),
            ),
            NoiseSpec::Named { name, suffix } => {
                labels.push(resolve_named_noise(circuit, name, *suffix)?);
            }
        }
    }
    Ok(labels)
}

fn resolve_named_noise(circuit: &Circuit, name: &str, suffix: Option<char>) -> Result<String> {
    match suffix {
        Some('u') => Ok(NoiseSource::OpAmpVoltage { opamp: name.to_string() }.label()),
        Some('+') | Some('-') => {
            let component = circuit.lookup_component(name)?;
            let op = match component {
                crate::circuit::Component::OpAmp(op) => op,
                _ => return Err(CircuitError::topology(format!("'{name}' is not an op-amp"))),
            };
            let node = if suffix == Some('+') { op.n_plus } else { op.n_minus };
            let node = node.ok_or_else(|| CircuitError::topology("current noise terminal is tied to ground"))?;
            Ok(NoiseSource::OpAmpCurrent {
                opamp: name.to_string(),
                node,
                node_name: circuit.interner().name(node).to_string(),
            }
            .label())
        }
        Some(other) => Err(CircuitError::topology(format!("unknown noise suffix: {other}"))),
        None => {
            // No suffix: resistor -> Johnson noise, op-amp -> voltage noise.
            match circuit.lookup_component(name)? {
                crate::circuit::Component::Resistor { .. } => {
                    Ok(NoiseSource::Johnson { resistor: name.to_string() }.label())
                }
                crate::circuit::Component::OpAmp(_) => {
                    Ok(NoiseSource::OpAmpVoltage { opamp: name.to_string() }.label())
                }
                _ => Err(CircuitError::topology(format!("'{name}' has no associated noise source"))),
            }
        }
    }
}

/// The `sum` pseudo-source referenced by some LISO noise scripts has no
/// defined semantics in this core; requesting it is a hard error rather
/// than a silent guess.
pub fn reject_sum_pseudo_source(name: &str) -> Result<()> {
    if name.eq_ignore_ascii_case("sum") {
        Err(CircuitError::topology(
            "the 'sum' pseudo-source is not supported",
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_vector_parsing_matches_literal_scenario() {
        let spec = FreqSpec { kind: SweepKind::Logarithmic, start: 1.0, stop: 1e5, steps: 5 };
        let freqs = expand_frequencies(&spec).unwrap();
        let expected = [1.0, 10.0, 100.0, 1e3, 1e4, 1e5];
        assert_eq!(freqs.len(), expected.len());
        for (a, b) in freqs.iter().zip(expected.iter()) {
            assert!((a - b).abs() / b <= 1e-9);
        }
    }

    #[test]
    fn builds_rc_lowpass_from_script() {
        let source = "r r1 1k nin nout\nc c1 1u nout gnd\nuinput nin\nuoutput nout\nfreq log 1 1e4 3\n";
        let script = parse(source).unwrap();
        let library = OpAmpLibrary::builtin();
        let (circuit, freq_spec, request) = build(&script, &library).unwrap();
        assert_eq!(circuit.components().len(), 4); // r1, c1, rsrc_in, in
        assert_eq!(freq_spec.steps, 3);
        assert!(matches!(request, AnalysisRequest::Transfer { .. }));
    }

    #[test]
    fn sum_pseudo_source_is_rejected() {
        assert!(reject_sum_pseudo_source("sum").is_err());
        assert!(reject_sum_pseudo_source("r1").is_ok());
    }
}
