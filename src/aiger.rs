//! Reader for the ASCII AIGER format (`aag`).
//!
//! ```text
//! aag M I L O A
//! <input literal>                      (I lines)
//! <latch literal> <next> [<init>]      (L lines, init is 0, 1 or the latch literal itself)
//! <output literal>                     (O lines)
//! <and literal> <rhs0> <rhs1>          (A lines)
//! ```
//!
//! Symbol tables and comments after the gates are ignored. Bad-state sections of
//! AIGER 1.9 are not supported: properties are given as outputs.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::aig::{Aig, Lit};

#[derive(Debug, Error)]
pub enum AigerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("line {line}: invalid token '{token}'")]
    InvalidToken { line: usize, token: String },

    #[error("unexpected end of file, expected {0}")]
    UnexpectedEof(&'static str),

    #[error("literal {0} is used but never defined")]
    Undefined(u32),

    #[error("literal {0} is defined twice")]
    Redefined(u32),

    #[error("combinational cycle through literal {0}")]
    Cycle(u32),

    #[error("unsupported feature: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, AigerError>;

struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    /// Next line split into numeric tokens, with its 1-based number.
    fn numbers(&mut self, what: &'static str) -> Result<(usize, Vec<u32>)> {
        let (i, line) = self.inner.next().ok_or(AigerError::UnexpectedEof(what))?;
        let numbers = line
            .split_whitespace()
            .map(|t| {
                t.parse::<u32>().map_err(|_| AigerError::InvalidToken {
                    line: i + 1,
                    token: t.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((i + 1, numbers))
    }
}

fn expect_len(line: usize, numbers: &[u32], allowed: &[usize]) -> Result<()> {
    if allowed.contains(&numbers.len()) {
        Ok(())
    } else {
        Err(AigerError::InvalidToken {
            line,
            token: format!("{} fields", numbers.len()),
        })
    }
}

fn expect_even(line: usize, lit: u32) -> Result<u32> {
    if lit & 1 == 1 || lit == 0 {
        return Err(AigerError::InvalidToken {
            line,
            token: lit.to_string(),
        });
    }
    Ok(lit >> 1)
}

/// Parses an `aag` file from a string.
pub fn parse_aag(text: &str) -> Result<Aig> {
    let mut lines = Lines {
        inner: text.lines().enumerate(),
    };

    let header = lines
        .inner
        .next()
        .ok_or(AigerError::UnexpectedEof("header"))?
        .1;
    let tokens: Vec<&str> = header.split_whitespace().collect();
    match tokens.first() {
        Some(&"aag") => {}
        Some(&"aig") => return Err(AigerError::Unsupported("binary AIGER".to_string())),
        _ => return Err(AigerError::InvalidHeader(header.to_string())),
    }
    if tokens.len() != 6 {
        return Err(AigerError::InvalidHeader(header.to_string()));
    }
    let fields = tokens[1..]
        .iter()
        .map(|t| t.parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| AigerError::InvalidHeader(header.to_string()))?;
    let (m, i, l, o, a) = (fields[0], fields[1], fields[2], fields[3], fields[4]);
    if i + l + a > m {
        return Err(AigerError::InvalidHeader(header.to_string()));
    }

    let mut aig = Aig::new();
    // AIGER variable -> literal in `aig`.
    let mut map: HashMap<u32, Lit> = HashMap::new();
    map.insert(0, Lit::FALSE);

    for _ in 0..i {
        let (line, numbers) = lines.numbers("input")?;
        expect_len(line, &numbers, &[1])?;
        let var = expect_even(line, numbers[0])?;
        let lit = aig.add_input();
        if map.insert(var, lit).is_some() {
            return Err(AigerError::Redefined(numbers[0]));
        }
    }

    let mut nexts = Vec::with_capacity(l);
    for _ in 0..l {
        let (line, numbers) = lines.numbers("latch")?;
        expect_len(line, &numbers, &[2, 3])?;
        let var = expect_even(line, numbers[0])?;
        let init = match numbers.get(2) {
            None | Some(0) => Some(false),
            Some(1) => Some(true),
            Some(&x) if x == numbers[0] => None,
            Some(&x) => {
                return Err(AigerError::InvalidToken {
                    line,
                    token: x.to_string(),
                })
            }
        };
        let lit = aig.add_latch(init);
        if map.insert(var, lit).is_some() {
            return Err(AigerError::Redefined(numbers[0]));
        }
        nexts.push(numbers[1]);
    }

    let mut outputs = Vec::with_capacity(o);
    for _ in 0..o {
        let (line, numbers) = lines.numbers("output")?;
        expect_len(line, &numbers, &[1])?;
        outputs.push(numbers[0]);
    }

    let mut gates: HashMap<u32, (u32, u32)> = HashMap::new();
    for _ in 0..a {
        let (line, numbers) = lines.numbers("and gate")?;
        expect_len(line, &numbers, &[3])?;
        let var = expect_even(line, numbers[0])?;
        if map.contains_key(&var) || gates.insert(var, (numbers[1], numbers[2])).is_some() {
            return Err(AigerError::Redefined(numbers[0]));
        }
    }

    let mut builder = Builder {
        aig,
        map,
        gates,
        active: Vec::new(),
    };
    for (reg, next) in nexts.into_iter().enumerate() {
        let lit = builder.resolve(next)?;
        builder.aig.set_next(reg, lit);
    }
    for out in outputs {
        let lit = builder.resolve(out)?;
        builder.aig.add_output(lit);
    }
    Ok(builder.aig)
}

/// Reads an `aag` file from disk.
pub fn read_aag(path: impl AsRef<Path>) -> Result<Aig> {
    let text = std::fs::read_to_string(path)?;
    parse_aag(&text)
}

struct Builder {
    aig: Aig,
    map: HashMap<u32, Lit>,
    gates: HashMap<u32, (u32, u32)>,
    /// Gates whose fanins are being resolved.
    active: Vec<u32>,
}

impl Builder {
    /// Translates an AIGER literal, building the gates of its cone bottom-up.
    fn resolve(&mut self, lit: u32) -> Result<Lit> {
        let mut stack = vec![lit >> 1];
        while let Some(&var) = stack.last() {
            if self.map.contains_key(&var) {
                stack.pop();
                continue;
            }
            let &(x, y) = self.gates.get(&var).ok_or(AigerError::Undefined(var << 1))?;
            let pending: Vec<u32> = [x >> 1, y >> 1]
                .into_iter()
                .filter(|v| !self.map.contains_key(v))
                .collect();
            if pending.is_empty() {
                let a = self.translate(x);
                let b = self.translate(y);
                let out = self.aig.and(a, b);
                self.map.insert(var, out);
                self.active.retain(|&v| v != var);
                stack.pop();
                continue;
            }
            if self.active.contains(&var) {
                return Err(AigerError::Cycle(var << 1));
            }
            self.active.push(var);
            stack.extend(pending);
        }
        Ok(self.translate(lit))
    }

    fn translate(&self, lit: u32) -> Lit {
        let base = self.map[&(lit >> 1)];
        if lit & 1 == 1 {
            !base
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    const TOGGLE: &str = "\
aag 3 1 1 1 1
2
4 7 0
6
6 2 4
i0 enable
l0 q
o0 bad
c
toggle flip-flop
";

    #[test]
    fn test_parse_toggle() {
        let aig = parse_aag(TOGGLE).unwrap();
        assert_eq!(aig.num_pis(), 1);
        assert_eq!(aig.num_regs(), 1);
        assert_eq!(aig.num_outputs(), 1);
        assert_eq!(aig.num_ands(), 1);
        assert_eq!(aig.latches()[0].init, Some(false));
        // next = !(en & q)
        let (out, next) = aig.step(&[true], &[true]);
        assert_eq!(out, vec![true]);
        assert_eq!(next, vec![false]);
        let (out, next) = aig.step(&[false], &[true]);
        assert_eq!(out, vec![false]);
        assert_eq!(next, vec![true]);
    }

    #[test]
    fn test_latch_init() {
        let aig = parse_aag("aag 3 0 3 0 0\n2 2 1\n4 4 4\n6 6\n").unwrap();
        let inits: Vec<_> = aig.latches().iter().map(|l| l.init).collect();
        assert_eq!(inits, vec![Some(true), None, Some(false)]);
    }

    #[test]
    fn test_gates_out_of_order() {
        let aig = parse_aag("aag 4 2 0 1 2\n2\n4\n9\n8 6 2\n6 2 4\n").unwrap();
        assert_eq!(aig.num_ands(), 2);
        let (out, _) = aig.step(&[true, true], &[]);
        assert_eq!(out, vec![false]);
        let (out, _) = aig.step(&[false, true], &[]);
        assert_eq!(out, vec![true]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse_aag(""), Err(AigerError::UnexpectedEof(_))));
        assert!(matches!(parse_aag("aig 0 0 0 0 0\n"), Err(AigerError::Unsupported(_))));
        assert!(matches!(parse_aag("aag 1 1 0 0\n"), Err(AigerError::InvalidHeader(_))));
        assert!(matches!(parse_aag("aag 1 1 0 0 0\n3\n"), Err(AigerError::InvalidToken { line: 2, .. })));
        assert!(matches!(parse_aag("aag 1 0 0 1 0\n2\n"), Err(AigerError::Undefined(2))));
        assert!(matches!(parse_aag("aag 2 0 0 1 2\n2\n2 4 1\n4 2 1\n"), Err(AigerError::Cycle(_))));
        assert!(matches!(parse_aag("aag 1 1 0 0 0\n"), Err(AigerError::UnexpectedEof("input"))));
    }
}
