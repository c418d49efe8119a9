//! Lexer for the LISO-compatible netlist DSL.
//!
//! Tokens: newline, a `CHUNK` (`[A-Za-z0-9_=.:]+`), and nothing else -- `#`
//! starts a comment that runs to end of line and is discarded entirely
//! (never emitted as a token).

use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Chunk,
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

fn is_chunk_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '=' | '.' | ':')
}

pub struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    source: &'a str,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.char_indices().peekable(),
            source,
            line: 1,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            match self.peek_char() {
                None => {
                    return Token {
                        kind: TokenKind::Eof,
                        text: String::new(),
                        line: self.line,
                    }
                }
                Some(' ') | Some('\t') | Some('\r') => {
                    self.chars.next();
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                Some('\n') => {
                    let line = self.line;
                    self.chars.next();
                    self.line += 1;
                    return Token {
                        kind: TokenKind::Newline,
                        text: "\n".to_string(),
                        line,
                    };
                }
                Some(c) if is_chunk_char(c) => {
                    let start = self.chars.peek().unwrap().0;
                    let line = self.line;
                    let mut end = start;
                    while let Some((i, c)) = self.chars.peek().copied() {
                        if is_chunk_char(c) {
                            end = i + c.len_utf8();
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    return Token {
                        kind: TokenKind::Chunk,
                        text: self.source[start..end].to_string(),
                        line,
                    };
                }
                Some(other) => {
                    // Any character outside the CHUNK alphabet and not
                    // whitespace/comment/newline is simply skipped; LISO
                    // netlists do not use punctuation outside CHUNK tokens.
                    let _ = other;
                    self.chars.next();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        tokens
    }

    #[test]
    fn lexes_simple_line() {
        let tokens = lex_all("r r1 1k nin nout\n");
        let chunks: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Chunk)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(chunks, vec!["r", "r1", "1k", "nin", "nout"]);
    }

    #[test]
    fn strips_comments_to_end_of_line() {
        let tokens = lex_all("r r1 1k nin nout # a comment\nc c1 1u nout gnd\n");
        let chunks: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Chunk)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(
            chunks,
            vec!["r", "r1", "1k", "nin", "nout", "c", "c1", "1u", "nout", "gnd"]
        );
    }

    #[test]
    fn chunk_regex_allows_equals_dot_colon() {
        let tokens = lex_all("op u1 op27 gnd nm nout a0=1e6 uc=2.7\n");
        let chunks: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Chunk)
            .map(|t| t.text.as_str())
            .collect();
        assert!(chunks.contains(&"a0=1e6"));
        assert!(chunks.contains(&"uc=2.7"));
    }
}
