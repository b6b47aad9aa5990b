//! The effect command grammar: `SYSTEM.<VERB>(k=v, k=v, ...)` (spec.md §6
//! "Effect command grammar", consumed by `taleforge-engine`'s rules/apply
//! module). A small recursive-descent parser over the value grammar:
//! `identifier | number | string | list[value] | object{field->value}`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectValue {
    Identifier(String),
    Number(f64),
    Str(String),
    List(Vec<EffectValue>),
    Object(BTreeMap<String, EffectValue>),
}

impl EffectValue {
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            EffectValue::Identifier(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            EffectValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str_value(&self) -> Option<&str> {
        match self {
            EffectValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[EffectValue]> {
        match self {
            EffectValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// One parsed `SYSTEM.<VERB>(k=v, ...)` effect line (spec.md §4.10,
/// §6 "the only form accepted by the applier").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectLine {
    pub op: String,
    pub args: BTreeMap<String, EffectValue>,
}

impl EffectLine {
    pub fn arg(&self, key: &str) -> Option<&EffectValue> {
        self.args.get(key)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EffectParseError {
    #[error("expected 'SYSTEM.' prefix in {0:?}")]
    MissingPrefix(String),
    #[error("unexpected end of input while parsing {0}")]
    UnexpectedEof(&'static str),
    #[error("unexpected character {0:?} at position {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),
}

/// Parse one `SYSTEM.<VERB>(k=v, ...)` line.
pub fn parse_effect_line(input: &str) -> Result<EffectLine, EffectParseError> {
    let input = input.trim();
    let rest = input
        .strip_prefix("SYSTEM.")
        .ok_or_else(|| EffectParseError::MissingPrefix(input.to_string()))?;
    let open = rest.find('(').ok_or(EffectParseError::UnexpectedEof("op name"))?;
    let op = rest[..open].trim().to_string();
    if !rest.trim_end().ends_with(')') {
        return Err(EffectParseError::UnexpectedEof("closing paren"));
    }
    let body = &rest[open + 1..rest.trim_end().len() - 1];
    let mut p = Parser::new(body);
    let args = p.parse_kv_list()?;
    Ok(EffectLine { op, args })
}

pub fn parse_effect_lines(input: &str) -> Result<Vec<EffectLine>, EffectParseError> {
    input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(parse_effect_line)
        .collect()
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    _marker: std::marker::PhantomData<&'a str>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { chars: input.chars().collect(), pos: 0, _marker: std::marker::PhantomData }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect(&mut self, expected: char) -> Result<(), EffectParseError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(EffectParseError::UnexpectedChar(c, self.pos)),
            None => Err(EffectParseError::UnexpectedEof("expected char")),
        }
    }

    fn parse_kv_list(&mut self) -> Result<BTreeMap<String, EffectValue>, EffectParseError> {
        let mut map = BTreeMap::new();
        self.skip_ws();
        if self.peek().is_none() {
            return Ok(map);
        }
        loop {
            self.skip_ws();
            let key = self.parse_identifier()?;
            self.expect('=')?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    continue;
                }
                _ => break,
            }
        }
        Ok(map)
    }

    fn parse_identifier(&mut self) -> Result<String, EffectParseError> {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '.') {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(EffectParseError::UnexpectedEof("identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_value(&mut self) -> Result<EffectValue, EffectParseError> {
        self.skip_ws();
        match self.peek() {
            Some('"') => self.parse_string(),
            Some('[') => self.parse_list(),
            Some('{') => self.parse_object(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(_) => Ok(EffectValue::Identifier(self.parse_identifier()?)),
            None => Err(EffectParseError::UnexpectedEof("value")),
        }
    }

    fn parse_string(&mut self) -> Result<EffectValue, EffectParseError> {
        self.expect('"')?;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c != '"') {
            self.pos += 1;
        }
        let s: String = self.chars[start..self.pos].iter().collect();
        self.expect('"')?;
        Ok(EffectValue::Str(s))
    }

    fn parse_number(&mut self) -> Result<EffectValue, EffectParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        raw.parse::<f64>()
            .map(EffectValue::Number)
            .map_err(|_| EffectParseError::InvalidNumber(raw))
    }

    fn parse_list(&mut self) -> Result<EffectValue, EffectParseError> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(EffectValue::List(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    continue;
                }
                Some(']') => {
                    self.bump();
                    break;
                }
                _ => return Err(EffectParseError::UnexpectedEof("list")),
            }
        }
        Ok(EffectValue::List(items))
    }

    fn parse_object(&mut self) -> Result<EffectValue, EffectParseError> {
        self.expect('{')?;
        let mut map = BTreeMap::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(EffectValue::Object(map));
        }
        loop {
            self.skip_ws();
            let key = self.parse_identifier()?;
            self.skip_ws();
            match self.peek() {
                Some('=') | Some(':') => {
                    self.bump();
                }
                _ => return Err(EffectParseError::UnexpectedEof("object separator")),
            }
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    continue;
                }
                Some('}') => {
                    self.bump();
                    break;
                }
                _ => return Err(EffectParseError::UnexpectedEof("object")),
            }
        }
        Ok(EffectValue::Object(map))
    }
}

impl fmt::Display for EffectLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SYSTEM.{}(", self.op)?;
        for (i, (k, v)) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v:?}")?;
        }
        write!(f, ")")
    }
}
