//! Value encoding
//!
//! Values arrive from callers as text more often than not (`"1.5"`, `"True"`,
//! `"['a', 'b']"`). Before they are stored, string values are coerced to their
//! natural type by a closed literal parser. Nothing is ever evaluated.
//!
//! Grammar: `None`, `True`, `False`, integers (decimal, `0x`, `0o`, `0b`),
//! floats, single or double quoted strings, `[...]` lists, `(...)` tuples and
//! `{...}` mappings or sets of literals. When a string does not parse, the
//! parse is retried on its lower-cased then capitalized form (so `TRUE` and
//! `none` are recognized); if that fails too the string is kept unchanged.

use serde_json::{Map, Number, Value};

/// Converts raw caller values into stored values.
pub trait ValueEncoder: Send + Sync {
    fn encode_value(&self, raw: Value) -> Value;

    fn encode(&self, raw: Map<String, Value>) -> Map<String, Value> {
        raw.into_iter()
            .map(|(k, v)| (k, self.encode_value(v)))
            .collect()
    }
}

/// Default encoder backed by the literal grammar.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralEncoder;

impl ValueEncoder for LiteralEncoder {
    fn encode_value(&self, raw: Value) -> Value {
        match raw {
            Value::String(s) => parse_literal(&s)
                .or_else(|| parse_literal(&capitalize(&s.to_lowercase())))
                .unwrap_or(Value::String(s)),
            other => other,
        }
    }
}

/// Stores every value exactly as given.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawEncoder;

impl ValueEncoder for RawEncoder {
    fn encode_value(&self, raw: Value) -> Value {
        raw
    }
}

/// Parse a complete literal, or `None` if `text` is not one.
pub fn parse_literal(text: &str) -> Option<Value> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    parser.at_end().then_some(value)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Deepest container nesting accepted; deeper text is kept as a string.
pub const MAX_NESTING: usize = 100;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Option<Value> {
        match self.peek()? {
            '\'' | '"' => self.string().map(Value::String),
            '[' | '(' | '{' => self.container(),
            '-' | '+' => self.signed_number(),
            c if c.is_ascii_digit() || c == '.' => self.number(false),
            c if c.is_alphabetic() => self.keyword(),
            _ => None,
        }
    }

    fn container(&mut self) -> Option<Value> {
        if self.depth >= MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let value = match self.peek()? {
            '[' => {
                self.pos += 1;
                self.sequence(']').map(|(items, _)| Value::Array(items))
            }
            '(' => self.tuple_or_group(),
            _ => self.mapping_or_set(),
        };
        self.depth -= 1;
        value
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "None" => Some(Value::Null),
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            _ => None,
        }
    }

    /// Any run of unary signs, each optionally followed by whitespace.
    fn signed_number(&mut self) -> Option<Value> {
        let mut negative = false;
        while let Some(sign @ ('-' | '+')) = self.peek() {
            self.pos += 1;
            negative ^= sign == '-';
            self.skip_ws();
        }
        match self.peek()? {
            c if c.is_ascii_digit() || c == '.' => self.number(negative),
            _ => None,
        }
    }

    fn number(&mut self, negative: bool) -> Option<Value> {
        let start = self.pos;
        if self.peek() == Some('0') {
            let radix = match self.chars.get(self.pos + 1).map(|c| c.to_ascii_lowercase()) {
                Some('x') => Some(16),
                Some('o') => Some(8),
                Some('b') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits_start = self.pos;
                while self.peek().is_some_and(|c| c.is_digit(radix) || c == '_') {
                    self.pos += 1;
                }
                let digits: String = self.chars[digits_start..self.pos]
                    .iter()
                    .filter(|c| **c != '_')
                    .collect();
                let magnitude = i64::from_str_radix(&digits, radix).ok()?;
                return Some(Value::from(if negative { -magnitude } else { magnitude }));
            }
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => self.pos += 1,
                '.' => {
                    is_float = true;
                    self.pos += 1;
                }
                'e' | 'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some('+') | Some('-')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if text.is_empty() || text == "." {
            return None;
        }
        let text = if negative { format!("-{text}") } else { text };
        if is_float {
            let f: f64 = text.parse().ok()?;
            Number::from_f64(f).map(Value::Number)
        } else {
            // Leading zeros are only valid on zero itself.
            let digits = text.trim_start_matches('-');
            if digits.starts_with('0') && !digits.trim_start_matches('0').is_empty() {
                return None;
            }
            if let Ok(i) = text.parse::<i64>() {
                Some(Value::from(i))
            } else {
                text.parse::<u64>().ok().map(Value::from)
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                c if c == quote => return Some(out),
                '\\' => {
                    let escaped = self.bump()?;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' | '\'' | '"' => out.push(escaped),
                        'x' => out.push(self.hex_escape(2)?),
                        'u' => out.push(self.hex_escape(4)?),
                        '\n' => {}
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                '\n' => return None,
                c => out.push(c),
            }
        }
    }

    fn hex_escape(&mut self, len: usize) -> Option<char> {
        let end = self.pos + len;
        let digits: String = self.chars.get(self.pos..end)?.iter().collect();
        self.pos = end;
        char::from_u32(u32::from_str_radix(&digits, 16).ok()?)
    }

    /// Comma separated literals up to `close`. The flag reports whether a
    /// comma was seen, which distinguishes `(1,)` from `(1)`.
    fn sequence(&mut self, close: char) -> Option<(Vec<Value>, bool)> {
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Some((items, saw_comma));
            }
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(',') {
                saw_comma = true;
            } else if self.eat(close) {
                return Some((items, saw_comma));
            } else {
                return None;
            }
        }
    }

    fn tuple_or_group(&mut self) -> Option<Value> {
        self.pos += 1;
        let (mut items, saw_comma) = self.sequence(')')?;
        if items.len() == 1 && !saw_comma {
            items.pop()
        } else {
            Some(Value::Array(items))
        }
    }

    fn mapping_or_set(&mut self) -> Option<Value> {
        self.pos += 1;
        self.skip_ws();
        if self.eat('}') {
            return Some(Value::Object(Map::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if self.peek() != Some(':') {
            // Set literal, stored as a sequence.
            let mut items = vec![first];
            if self.eat(',') {
                let (rest, _) = self.sequence('}')?;
                items.extend(rest);
            } else if !self.eat('}') {
                return None;
            }
            return Some(Value::Array(items));
        }

        let mut map = Map::new();
        let mut key = first;
        loop {
            self.skip_ws();
            if !self.eat(':') {
                return None;
            }
            self.skip_ws();
            let value = self.value()?;
            map.insert(mapping_key(key), value);
            self.skip_ws();
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            if !self.eat(',') {
                return None;
            }
            self.skip_ws();
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            key = self.value()?;
        }
    }
}

fn negate(value: Value) -> Option<Value> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        i.checked_neg().map(Value::from)
    } else {
        n.as_f64().and_then(|f| Number::from_f64(-f)).map(Value::Number)
    }
}

fn mapping_key(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
