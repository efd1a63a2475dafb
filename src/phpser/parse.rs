//! phpser/parse - recursive-descent `unserialize`.
//!
//! Works on bytes: `s:<len>` counts bytes, not characters. Every length and count is
//! checked against the remaining input before anything is sliced, so malformed input
//! yields `UnserializeError`, never a panic. Capacity hints from the input are clamped.

use crate::consts::UNSERIALIZE_MAX_DEPTH;

use super::{SerKey, SerValue, UnserializeError};

const MAX_PREALLOC: usize = 1024;

/// Parse a whole buffer; trailing bytes are an error.
pub fn unserialize(input: &[u8]) -> Result<SerValue, UnserializeError> {
    Parser::new(input).parse()
}

/// True if `input` is exactly one well-formed serialized value.
pub fn is_valid(input: &[u8]) -> bool {
    unserialize(input).is_ok()
}

pub struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
    /// Values seen so far; `r:`/`R:` must point into 1..=slots.
    slots: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            max_depth: UNSERIALIZE_MAX_DEPTH,
            slots: 0,
        }
    }

    /// Override the nesting limit (0 disables it).
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn parse(mut self) -> Result<SerValue, UnserializeError> {
        let v = self.value()?;
        if self.pos != self.input.len() {
            return Err(UnserializeError::TrailingData {
                offset: self.pos,
                len: self.input.len(),
            });
        }
        Ok(v)
    }

    // ---------------- helpers ----------------

    fn malformed(&self, at: usize) -> UnserializeError {
        UnserializeError::Malformed {
            offset: at,
            len: self.input.len(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, b: u8, at: usize) -> Result<(), UnserializeError> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.malformed(at))
        }
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Unsigned length / count.
    fn uint(&mut self, at: usize) -> Result<usize, UnserializeError> {
        let start = self.pos;
        if self.digits() == 0 {
            return Err(self.malformed(at));
        }
        let mut n: usize = 0;
        for &b in &self.input[start..self.pos] {
            n = n
                .checked_mul(10)
                .and_then(|n| n.checked_add((b - b'0') as usize))
                .ok_or_else(|| self.malformed(at))?;
        }
        Ok(n)
    }

    /// Signed integer: [+-]?[0-9]+
    fn int(&mut self, at: usize) -> Result<i64, UnserializeError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        if self.digits() == 0 {
            return Err(self.malformed(at));
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| self.malformed(at))
    }

    /// Exactly `len` raw bytes.
    fn take(&mut self, len: usize, at: usize) -> Result<&'a [u8], UnserializeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&e| e <= self.input.len())
            .ok_or_else(|| self.malformed(at))?;
        let input = self.input;
        let out = &input[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// `<len>:"<len bytes>"` - class names of O:/C: and the E: payload.
    fn quoted(&mut self, at: usize) -> Result<&'a [u8], UnserializeError> {
        let len = self.uint(at)?;
        self.expect(b':', at)?;
        self.expect(b'"', at)?;
        let bytes = self.take(len, at)?;
        self.expect(b'"', at)?;
        Ok(bytes)
    }

    /// `s:` body: `<len>:"<len bytes>";` including the terminator.
    ///
    /// Offsets follow PHP: a length running past the input points at the length digits,
    /// a missing closing quote at the byte after the payload, a missing `;` one further.
    fn str_body(&mut self, at: usize) -> Result<&'a [u8], UnserializeError> {
        let len = self.str_len(at)?;
        let bytes = self.take(len, at)?;
        self.str_close()?;
        Ok(bytes)
    }

    /// `S:` body: like `str_body`, but `\xx` hex escapes count as one byte.
    fn escaped(&mut self, at: usize) -> Result<Vec<u8>, UnserializeError> {
        let len = self.str_len(at)?;
        let mut out = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            let b = self.peek().ok_or_else(|| self.malformed(at))?;
            self.pos += 1;
            if b != b'\\' {
                out.push(b);
                continue;
            }
            let hi = self.peek().and_then(hex_val).ok_or_else(|| self.malformed(at))?;
            self.pos += 1;
            let lo = self.peek().and_then(hex_val).ok_or_else(|| self.malformed(at))?;
            self.pos += 1;
            out.push((hi << 4) | lo);
        }
        self.str_close()?;
        Ok(out)
    }

    /// `<len>:"` of s:/S:; the declared length must fit into the remaining input.
    fn str_len(&mut self, at: usize) -> Result<usize, UnserializeError> {
        let len_at = self.pos;
        let len = self.uint(at)?;
        self.expect(b':', at)?;
        self.expect(b'"', at)?;
        if self.input.len() - self.pos < len {
            return Err(self.malformed(len_at));
        }
        Ok(len)
    }

    fn str_close(&mut self) -> Result<(), UnserializeError> {
        let end = self.pos;
        self.expect(b'"', end)?;
        self.expect(b';', end + 1)
    }

    fn enter(&mut self, at: usize) -> Result<(), UnserializeError> {
        self.depth += 1;
        if self.max_depth > 0 && self.depth > self.max_depth {
            return Err(UnserializeError::DepthExceeded {
                max_depth: self.max_depth,
                offset: at,
                len: self.input.len(),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ---------------- grammar ----------------

    fn value(&mut self) -> Result<SerValue, UnserializeError> {
        let at = self.pos;
        let tag = self.peek().ok_or_else(|| self.malformed(at))?;
        self.pos += 1;

        if tag == b'N' {
            self.expect(b';', at)?;
            self.slots += 1;
            return Ok(SerValue::Null);
        }
        self.expect(b':', at)?;

        match tag {
            b'b' => {
                let v = match self.peek() {
                    Some(b'0') => false,
                    Some(b'1') => true,
                    _ => return Err(self.malformed(at)),
                };
                self.pos += 1;
                self.expect(b';', at)?;
                self.slots += 1;
                Ok(SerValue::Bool(v))
            }
            b'i' => {
                let v = self.int(at)?;
                self.expect(b';', at)?;
                self.slots += 1;
                Ok(SerValue::Int(v))
            }
            b'd' => {
                let v = self.float(at)?;
                self.slots += 1;
                Ok(SerValue::Float(v))
            }
            b's' => {
                let bytes = self.str_body(at)?;
                self.slots += 1;
                Ok(SerValue::Str(bytes.to_vec()))
            }
            b'S' => {
                let bytes = self.escaped(at)?;
                self.slots += 1;
                Ok(SerValue::Str(bytes))
            }
            b'a' => {
                let count = self.uint(at)?;
                self.expect(b':', at)?;
                self.slots += 1;
                let items = self.members(count, at)?;
                Ok(SerValue::Array(items))
            }
            b'O' => {
                let class = self.class_name(at)?;
                self.expect(b':', at)?;
                let count = self.uint(at)?;
                self.expect(b':', at)?;
                self.slots += 1;
                let props = self.members(count, at)?;
                Ok(SerValue::Object { class, props })
            }
            b'C' => {
                let class = self.class_name(at)?;
                self.expect(b':', at)?;
                let len = self.uint(at)?;
                self.expect(b':', at)?;
                self.expect(b'{', at)?;
                let data = self.take(len, at)?.to_vec();
                self.expect(b'}', at)?;
                self.slots += 1;
                Ok(SerValue::Custom { class, data })
            }
            b'E' => {
                let payload = self.quoted(at)?;
                self.expect(b';', at)?;
                let colon = payload
                    .iter()
                    .position(|&b| b == b':')
                    .ok_or_else(|| self.malformed(at))?;
                let (class, case) = (&payload[..colon], &payload[colon + 1..]);
                if !valid_class_name(class) || case.is_empty() {
                    return Err(self.malformed(at));
                }
                self.slots += 1;
                Ok(SerValue::Enum {
                    class: String::from_utf8_lossy(class).into_owned(),
                    case: String::from_utf8_lossy(case).into_owned(),
                })
            }
            b'r' | b'R' => {
                let id = self.uint(at)?;
                self.expect(b';', at)?;
                if id == 0 || id > self.slots {
                    return Err(self.malformed(at));
                }
                if tag == b'r' {
                    self.slots += 1;
                    Ok(SerValue::Ref(id))
                } else {
                    Ok(SerValue::RefHard(id))
                }
            }
            _ => Err(self.malformed(at)),
        }
    }

    /// `{` (key value){count} `}` for arrays and objects.
    fn members(
        &mut self,
        count: usize,
        at: usize,
    ) -> Result<Vec<(SerKey, SerValue)>, UnserializeError> {
        self.expect(b'{', at)?;
        self.enter(at)?;
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            let k = self.key()?;
            let v = self.value()?;
            items.push((k, v));
        }
        let close = self.pos;
        self.expect(b'}', close)?;
        self.leave();
        Ok(items)
    }

    /// Keys do not occupy reference slots.
    fn key(&mut self) -> Result<SerKey, UnserializeError> {
        let at = self.pos;
        let tag = self.peek().ok_or_else(|| self.malformed(at))?;
        self.pos += 1;
        self.expect(b':', at)?;
        let k = match tag {
            b'i' => {
                let i = self.int(at)?;
                self.expect(b';', at)?;
                SerKey::Int(i)
            }
            b's' => SerKey::Str(self.str_body(at)?.to_vec()),
            b'S' => SerKey::Str(self.escaped(at)?),
            _ => return Err(self.malformed(at)),
        };
        Ok(k)
    }

    fn class_name(&mut self, at: usize) -> Result<String, UnserializeError> {
        let raw = self.quoted(at)?;
        if !valid_class_name(raw) {
            return Err(self.malformed(at));
        }
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    /// `d:` body up to and including `;`.
    fn float(&mut self, at: usize) -> Result<f64, UnserializeError> {
        let input = self.input;
        let rest = &input[self.pos..];
        let semi = rest
            .iter()
            .position(|&b| b == b';')
            .ok_or_else(|| self.malformed(at))?;
        let v = parse_php_float(&rest[..semi]).ok_or_else(|| self.malformed(at))?;
        self.pos += semi + 1;
        Ok(v)
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn valid_class_name(name: &[u8]) -> bool {
    !name.is_empty()
        && !name[0].is_ascii_digit()
        && name
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'\\' || b >= 0x80)
}

/// PHP float token: NAN | -?INF | [+-]? (digits [. digits*] | . digits) ([eE] [+-]? digits)?
fn parse_php_float(tok: &[u8]) -> Option<f64> {
    match tok {
        b"NAN" => return Some(f64::NAN),
        b"INF" => return Some(f64::INFINITY),
        b"-INF" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    let mut i = 0;
    let neg = match tok.first() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let int_start = i;
    while i < tok.len() && tok[i].is_ascii_digit() {
        i += 1;
    }
    let int_part = &tok[int_start..i];

    let mut frac_part: &[u8] = &[];
    if i < tok.len() && tok[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < tok.len() && tok[i].is_ascii_digit() {
            i += 1;
        }
        frac_part = &tok[frac_start..i];
    }
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    let mut exp_part: &[u8] = &[];
    if i < tok.len() && (tok[i] == b'e' || tok[i] == b'E') {
        i += 1;
        let exp_start = i;
        if i < tok.len() && (tok[i] == b'+' || tok[i] == b'-') {
            i += 1;
        }
        let digits_start = i;
        while i < tok.len() && tok[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            return None;
        }
        exp_part = &tok[exp_start..i];
    }
    if i != tok.len() {
        return None;
    }

    // Normalized "<int>.<frac>e<exp>" always parses with std.
    let mut norm = String::with_capacity(tok.len() + 4);
    if neg {
        norm.push('-');
    }
    norm.push_str(if int_part.is_empty() { "0" } else { std::str::from_utf8(int_part).ok()? });
    norm.push('.');
    norm.push_str(if frac_part.is_empty() { "0" } else { std::str::from_utf8(frac_part).ok()? });
    if !exp_part.is_empty() {
        norm.push('e');
        norm.push_str(std::str::from_utf8(exp_part).ok()?);
    }
    norm.parse::<f64>().ok()
}
