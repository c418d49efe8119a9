//! Parsed representation of a LISO-compatible script: one [`Instruction`]
//! per non-blank, non-comment line, in file order.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    Linear,
    Logarithmic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreqSpec {
    pub kind: SweepKind,
    pub start: f64,
    pub stop: f64,
    pub steps: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub n_plus: String,
    pub n_minus: Option<String>,
    pub impedance: Option<f64>,
}

/// A single `uoutput`/`ioutput` target: a node or component name, plus any
/// `:scale` tags, or the `all`/`allop` wildcards (left for the caller to
/// expand against a built circuit, since that needs the node/component
/// list).
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSpec {
    Named { target: String, scales: Vec<String> },
    All,
    AllOpamp,
}

/// A single `noise` source reference: a name plus an optional suffix
/// selecting which current-noise terminal (`+`/`-`) or forcing voltage
/// noise (`u`), or a wildcard.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseSpec {
    Named { name: String, suffix: Option<char> },
    All,
    AllOpamp,
    AllResistor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Resistor {
        name: String,
        value: f64,
        n1: String,
        n2: String,
    },
    Capacitor {
        name: String,
        value: f64,
        n1: String,
        n2: String,
    },
    Inductor {
        name: String,
        value: f64,
        n1: String,
        n2: String,
    },
    OpAmp {
        name: String,
        model: String,
        n_plus: String,
        n_minus: String,
        n_out: String,
        overrides: Vec<(String, f64)>,
    },
    Freq(FreqSpec),
    UInput(InputSpec),
    IInput(InputSpec),
    UOutput(Vec<OutputSpec>),
    IOutput(Vec<OutputSpec>),
    Noise {
        sink: String,
        sources: Vec<NoiseSpec>,
    },
}

/// The full parsed script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub instructions: Vec<Instruction>,
}
