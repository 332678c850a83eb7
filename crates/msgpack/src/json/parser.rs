//! Order-preserving JSON parser producing [`Value`].

use crate::{Value, MAX_DEPTH};

use super::JsonError;

/// Parses JSON text into a [`Value`].
///
/// Unlike `serde_json::Value`, objects become [`Value::Map`] with their keys
/// in source order and duplicates kept.
///
/// ```
/// use weaver_msgpack::{json, Value};
///
/// let v = json::parse(r#"{"b": 1, "a": 2.5}"#).unwrap();
/// assert_eq!(
///     v,
///     Value::Map(vec![("b".into(), Value::Int(1)), ("a".into(), Value::Float(2.5))])
/// );
/// ```
pub fn parse(text: &str) -> Result<Value, JsonError> {
    let mut parser = Parser {
        src: text,
        data: text.as_bytes(),
        x: 0,
        depth: 0,
    };
    parser.skip_ws();
    let value = parser.read_any()?;
    parser.skip_ws();
    if parser.x < parser.data.len() {
        return Err(JsonError::parse(parser.x, "trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    data: &'a [u8],
    x: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.data.get(self.x) {
            self.x += 1;
        }
    }

    fn peek(&self) -> Result<u8, JsonError> {
        self.data
            .get(self.x)
            .copied()
            .ok_or(JsonError::parse(self.x, "unexpected end of input"))
    }

    fn expect(&mut self, byte: u8, message: &'static str) -> Result<(), JsonError> {
        if self.peek()? != byte {
            return Err(JsonError::parse(self.x, message));
        }
        self.x += 1;
        Ok(())
    }

    fn literal(&mut self, word: &'static str, value: Value) -> Result<Value, JsonError> {
        if self.data[self.x..].starts_with(word.as_bytes()) {
            self.x += word.len();
            Ok(value)
        } else {
            Err(JsonError::parse(self.x, "invalid literal"))
        }
    }

    fn read_any(&mut self) -> Result<Value, JsonError> {
        match self.peek()? {
            b'{' => self.nested(Self::read_obj),
            b'[' => self.nested(Self::read_arr),
            b'"' => Ok(Value::Str(self.read_str()?)),
            b't' => self.literal("true", Value::Bool(true)),
            b'f' => self.literal("false", Value::Bool(false)),
            b'n' => self.literal("null", Value::Nil),
            b'-' | b'0'..=b'9' => self.read_num(),
            _ => Err(JsonError::parse(self.x, "unexpected character")),
        }
    }

    fn nested(
        &mut self,
        read: fn(&mut Self) -> Result<Value, JsonError>,
    ) -> Result<Value, JsonError> {
        if self.depth >= MAX_DEPTH {
            return Err(JsonError::parse(self.x, "nesting too deep"));
        }
        self.depth += 1;
        let value = read(self);
        self.depth -= 1;
        value
    }

    fn read_arr(&mut self) -> Result<Value, JsonError> {
        self.x += 1;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek()? == b']' {
            self.x += 1;
            return Ok(Value::Array(items));
        }
        loop {
            self.skip_ws();
            items.push(self.read_any()?);
            self.skip_ws();
            match self.peek()? {
                b',' => self.x += 1,
                b']' => {
                    self.x += 1;
                    return Ok(Value::Array(items));
                }
                _ => return Err(JsonError::parse(self.x, "expected `,` or `]`")),
            }
        }
    }

    fn read_obj(&mut self) -> Result<Value, JsonError> {
        self.x += 1;
        let mut entries = Vec::new();
        self.skip_ws();
        if self.peek()? == b'}' {
            self.x += 1;
            return Ok(Value::Map(entries));
        }
        loop {
            self.skip_ws();
            if self.peek()? != b'"' {
                return Err(JsonError::parse(self.x, "expected string key"));
            }
            let key = self.read_str()?;
            self.skip_ws();
            self.expect(b':', "expected `:`")?;
            self.skip_ws();
            let value = self.read_any()?;
            entries.push((Value::Str(key), value));
            self.skip_ws();
            match self.peek()? {
                b',' => self.x += 1,
                b'}' => {
                    self.x += 1;
                    return Ok(Value::Map(entries));
                }
                _ => return Err(JsonError::parse(self.x, "expected `,` or `}`")),
            }
        }
    }

    fn read_str(&mut self) -> Result<String, JsonError> {
        self.x += 1;
        let mut out = String::new();
        let mut run = self.x;
        loop {
            let ch = self.peek()?;
            match ch {
                b'"' => {
                    out.push_str(&self.src[run..self.x]);
                    self.x += 1;
                    return Ok(out);
                }
                b'\\' => {
                    out.push_str(&self.src[run..self.x]);
                    self.x += 1;
                    self.read_escape(&mut out)?;
                    run = self.x;
                }
                0x00..=0x1f => {
                    return Err(JsonError::parse(self.x, "control character in string"));
                }
                _ => self.x += 1,
            }
        }
    }

    fn read_escape(&mut self, out: &mut String) -> Result<(), JsonError> {
        let at = self.x;
        let ch = self.peek()?;
        self.x += 1;
        match ch {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'/' => out.push('/'),
            b'b' => out.push('\u{0008}'),
            b'f' => out.push('\u{000c}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => {
                let hi = self.read_hex4()?;
                let code = if (0xd800..0xdc00).contains(&hi) {
                    if !self.data[self.x..].starts_with(b"\\u") {
                        return Err(JsonError::parse(self.x, "unpaired surrogate"));
                    }
                    self.x += 2;
                    let lo = self.read_hex4()?;
                    if !(0xdc00..0xe000).contains(&lo) {
                        return Err(JsonError::parse(self.x - 4, "invalid low surrogate"));
                    }
                    0x10000 + ((hi - 0xd800) << 10) + (lo - 0xdc00)
                } else {
                    hi
                };
                let c = char::from_u32(code)
                    .ok_or(JsonError::parse(at, "invalid unicode escape"))?;
                out.push(c);
            }
            _ => return Err(JsonError::parse(at, "invalid escape")),
        }
        Ok(())
    }

    fn read_hex4(&mut self) -> Result<u32, JsonError> {
        let digits = self
            .src
            .get(self.x..self.x + 4)
            .ok_or(JsonError::parse(self.x, "truncated unicode escape"))?;
        let code = u32::from_str_radix(digits, 16)
            .map_err(|_| JsonError::parse(self.x, "invalid unicode escape"))?;
        self.x += 4;
        Ok(code)
    }

    fn digits(&mut self) -> usize {
        let start = self.x;
        while let Some(b'0'..=b'9') = self.data.get(self.x) {
            self.x += 1;
        }
        self.x - start
    }

    fn read_num(&mut self) -> Result<Value, JsonError> {
        let start = self.x;
        if self.data[self.x] == b'-' {
            self.x += 1;
        }
        let int_start = self.x;
        let int_digits = self.digits();
        if int_digits == 0 {
            return Err(JsonError::parse(self.x, "expected digit"));
        }
        if int_digits > 1 && self.data[int_start] == b'0' {
            return Err(JsonError::parse(int_start, "leading zero"));
        }
        let mut is_float = false;
        if let Some(b'.') = self.data.get(self.x) {
            self.x += 1;
            if self.digits() == 0 {
                return Err(JsonError::parse(self.x, "expected digit after `.`"));
            }
            is_float = true;
        }
        if let Some(b'e' | b'E') = self.data.get(self.x) {
            self.x += 1;
            if let Some(b'+' | b'-') = self.data.get(self.x) {
                self.x += 1;
            }
            if self.digits() == 0 {
                return Err(JsonError::parse(self.x, "expected exponent digit"));
            }
            is_float = true;
        }
        let text = &self.src[start..self.x];
        if !is_float {
            // Integers beyond u64 fall back to a float.
            if let Ok(int) = text.parse::<i64>() {
                return Ok(Value::Int(int));
            }
            if let Ok(uint) = text.parse::<u64>() {
                return Ok(Value::UInt(uint));
            }
        }
        text.parse::<f64>()
            .map(Value::Float)
            .map_err(|_| JsonError::parse(start, "invalid number"))
    }
}
