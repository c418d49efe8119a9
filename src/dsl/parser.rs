//! Hand-written recursive-descent parser over the lexer's CHUNK token
//! stream (see module docs in [`super`]), plus the circuit/analysis
//! builder that consumes the resulting [`Script`].

use super::ast::{FreqSpec, Instruction, InputSpec, NoiseSpec, OutputSpec, Script, SweepKind};
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{CircuitError, Result};
use crate::quantity::parse_value_or_err;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Parser { lexer, current }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn expect_chunk(&mut self, line: usize) -> Result<String> {
        if self.current.kind == TokenKind::Chunk {
            let text = self.current.text.clone();
            self.advance();
            Ok(text)
        } else {
            Err(CircuitError::parse(line, "expected a token, found end of line"))
        }
    }

    pub fn parse(&mut self) -> Result<Script> {
        let mut script = Script::default();
        let mut seen_freq = false;
        let mut seen_outputs = false;
        let mut seen_noise = false;

        while self.current.kind != TokenKind::Eof {
            if self.current.kind == TokenKind::Newline {
                self.advance();
                continue;
            }

            let keyword = self.current.text.clone();
            let line = self.current.line;
            self.advance();
            let instruction = self.parse_instruction(&keyword, line)?;

            match &instruction {
                Instruction::Freq(_) => {
                    if seen_freq {
                        return Err(CircuitError::parse(line, "freq may appear only once"));
                    }
                    seen_freq = true;
                }
                Instruction::UOutput(_) | Instruction::IOutput(_) => seen_outputs = true,
                Instruction::Noise { .. } => seen_noise = true,
                _ => {}
            }
            if seen_outputs && seen_noise {
                return Err(CircuitError::parse(
                    line,
                    "a script may request transfer-function outputs or noise, not both",
                ));
            }

            script.instructions.push(instruction);

            if self.current.kind == TokenKind::Newline {
                self.advance();
            } else if self.current.kind != TokenKind::Eof {
                return Err(CircuitError::parse(
                    self.current.line,
                    "unexpected trailing tokens on line",
                ));
            }
        }

        Ok(script)
    }

    fn parse_instruction(&mut self, keyword: &str, line: usize) -> Result<Instruction> {
        match keyword.to_lowercase().as_str() {
            "r" => {
                let (name, value, n1, n2) = self.parse_rcl(line)?;
                Ok(Instruction::Resistor { name, value, n1, n2 })
            }
            "c" => {
                let (name, value, n1, n2) = self.parse_rcl(line)?;
                Ok(Instruction::Capacitor { name, value, n1, n2 })
            }
            "l" => {
                let (name, value, n1, n2) = self.parse_rcl(line)?;
                Ok(Instruction::Inductor { name, value, n1, n2 })
            }
            "op" => self.parse_opamp(line),
            "freq" => self.parse_freq(line),
            "uinput" => self.parse_input(line, true).map(Instruction::UInput),
            "iinput" => self.parse_input(line, false).map(Instruction::IInput),
            "uoutput" => self.parse_outputs(line).map(Instruction::UOutput),
            "ioutput" => self.parse_outputs(line).map(Instruction::IOutput),
            "noise" => self.parse_noise(line),
            other => Err(CircuitError::parse(line, format!("unknown instruction: {other}"))),
        }
    }

    fn parse_rcl(&mut self, line: usize) -> Result<(String, f64, String, String)> {
        let name = self.expect_chunk(line)?;
        let value_text = self.expect_chunk(line)?;
        let n1 = self.expect_chunk(line)?;
        let n2 = self.expect_chunk(line)?;
        if !self.at_line_end() {
            return Err(CircuitError::parse(line, "unexpected trailing tokens"));
        }
        let value = parse_value_or_err(&value_text, line)?;
        Ok((name, value, n1, n2))
    }

    fn parse_opamp(&mut self, line: usize) -> Result<Instruction> {
        let name = self.expect_chunk(line)?;
        let model = self.expect_chunk(line)?;
        let n_plus = self.expect_chunk(line)?;
        let n_minus = self.expect_chunk(line)?;
        let n_out = self.expect_chunk(line)?;

        let mut overrides = Vec::new();
        while !self.at_line_end() {
            let tok = self.expect_chunk(line)?;
            let (key, val_text) = tok.split_once('=').ok_or_else(|| {
                CircuitError::parse(line, format!("expected key=value override, got '{tok}'"))
            })?;
            let value = parse_value_or_err(val_text, line)?;
            overrides.push((key.to_lowercase(), value));
        }

        Ok(Instruction::OpAmp {
            name,
            model,
            n_plus,
            n_minus,
            n_out,
            overrides,
        })
    }

    fn parse_freq(&mut self, line: usize) -> Result<Instruction> {
        let kind_text = self.expect_chunk(line)?;
        let kind = match kind_text.to_lowercase().as_str() {
            "lin" => SweepKind::Linear,
            "log" => SweepKind::Logarithmic,
            other => return Err(CircuitError::parse(line, format!("unknown sweep kind: {other}"))),
        };
        let start = parse_value_or_err(&self.expect_chunk(line)?, line)?;
        let stop = parse_value_or_err(&self.expect_chunk(line)?, line)?;
        let steps_text = self.expect_chunk(line)?;
        let steps: u64 = steps_text
            .parse()
            .map_err(|_| CircuitError::parse(line, format!("invalid step count: {steps_text}")))?;
        if !self.at_line_end() {
            return Err(CircuitError::parse(line, "unexpected trailing tokens"));
        }
        Ok(Instruction::Freq(FreqSpec { kind, start, stop, steps }))
    }

    /// Parse a `uinput`/`iinput` argument list. `allow_floating` gates the
    /// 3-argument floating form (`n+ n- Z`): current inputs are never
    /// floating, so `iinput` rejects a 3rd token instead of silently
    /// treating it as `n_minus`.
    fn parse_input(&mut self, line: usize, allow_floating: bool) -> Result<InputSpec> {
        let n_plus = self.expect_chunk(line)?;
        if self.at_line_end() {
            return Ok(InputSpec { n_plus, n_minus: None, impedance: None });
        }
        let second = self.expect_chunk(line)?;
        if self.at_line_end() {
            // Two arguments: single-ended with explicit impedance.
            let impedance = parse_value_or_err(&second, line)?;
            return Ok(InputSpec { n_plus, n_minus: None, impedance: Some(impedance) });
        }
        if !allow_floating {
            return Err(CircuitError::parse(
                line,
                "iinput does not accept a floating (n+ n- Z) form",
            ));
        }
        // Three arguments: floating input with an explicit impedance.
        let z_text = self.expect_chunk(line)?;
        if !self.at_line_end() {
            return Err(CircuitError::parse(line, "unexpected trailing tokens"));
        }
        let impedance = parse_value_or_err(&z_text, line)?;
        Ok(InputSpec { n_plus, n_minus: Some(second), impedance: Some(impedance) })
    }

    fn parse_outputs(&mut self, line: usize) -> Result<Vec<OutputSpec>> {
        let mut specs = Vec::new();
        if self.at_line_end() {
            return Err(CircuitError::parse(line, "expected at least one output target"));
        }
        while !self.at_line_end() {
            let tok = self.expect_chunk(line)?;
            specs.push(match tok.to_lowercase().as_str() {
                "all" => OutputSpec::All,
                "allop" => OutputSpec::AllOpamp,
                _ => {
                    let mut parts = tok.split(':');
                    let target = parts.next().unwrap_or(&tok).to_string();
                    let scales = parts.map(|s| s.to_string()).collect();
                    OutputSpec::Named { target, scales }
                }
            });
        }
        Ok(specs)
    }

    fn parse_noise(&mut self, line: usize) -> Result<Instruction> {
        let sink = self.expect_chunk(line)?;
        let mut sources = Vec::new();
        while !self.at_line_end() {
            let tok = self.expect_chunk(line)?;
            sources.push(match tok.to_lowercase().as_str() {
                "all" => NoiseSpec::All,
                "allop" => NoiseSpec::AllOpamp,
                "allr" => NoiseSpec::AllResistor,
                _ => {
                    if let Some((name, suffix)) = tok.split_once(':') {
                        let suffix_char = suffix.chars().next();
                        NoiseSpec::Named { name: name.to_string(), suffix: suffix_char }
                    } else {
                        NoiseSpec::Named { name: tok, suffix: None }
                    }
                }
            });
        }
        if sources.is_empty() {
            return Err(CircuitError::parse(line, "noise requires at least one source"));
        }
        Ok(Instruction::Noise { sink, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resistor_line() {
        let mut parser = Parser::new("r r1 1k nin nout\n");
        let script = parser.parse().unwrap();
        assert_eq!(
            script.instructions[0],
            Instruction::Resistor {
                name: "r1".into(),
                value: 1000.0,
                n1: "nin".into(),
                n2: "nout".into(),
            }
        );
    }

    #[test]
    fn parses_opamp_with_overrides() {
        let mut parser = Parser::new("op u1 op27 gnd nm nout a0=1e6 uc=2.7\n");
        let script = parser.parse().unwrap();
        match &script.instructions[0] {
            Instruction::OpAmp { overrides, .. } => {
                assert_eq!(overrides, &vec![("a0".to_string(), 1e6), ("uc".to_string(), 2.7)]);
            }
            other => panic!("unexpected instruction: {other:?}"),
        }
    }

    #[test]
    fn parses_freq_directive() {
        let mut parser = Parser::new("freq log 1 1e5 5\n");
        let script = parser.parse().unwrap();
        assert_eq!(
            script.instructions[0],
            Instruction::Freq(FreqSpec {
                kind: SweepKind::Logarithmic,
                start: 1.0,
                stop: 1e5,
                steps: 5,
            })
        );
    }

    #[test]
    fn rejects_output_and_noise_together() {
        let mut parser = Parser::new("uoutput nout\nnoise nout r1\n");
        assert!(parser.parse().is_err());
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let mut parser = Parser::new("# header comment\n\nr r1 1k nin nout\n");
        let script = parser.parse().unwrap();
        assert_eq!(script.instructions.len(), 1);
    }

    #[test]
    fn rejects_unknown_override_syntax() {
        let mut parser = Parser::new("op u1 op27 gnd nm nout bogus\n");
        assert!(parser.parse().is_err());
    }

    #[test]
    fn iinput_rejects_floating_form() {
        let mut parser = Parser::new("iinput n1 n2 50\n");
        assert!(parser.parse().is_err());
    }

    #[test]
    fn uinput_accepts_floating_form() {
        let mut parser = Parser::new("uinput n1 n2 50\nfreq log 1 10 1\nuoutput n1\n");
        assert!(parser.parse().is_ok());
    }
}
