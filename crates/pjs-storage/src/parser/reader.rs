//! Recursive descent over a complete UTF-8 document

use tracing::warn;

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::storage::StorageHandle;
use crate::value::{Array, JsonString, Object, Value};

/// Nesting depth guard
struct DepthTracker {
    current: usize,
    max: usize,
}

impl DepthTracker {
    fn with_max_depth(max: usize) -> Self {
        Self { current: 0, max }
    }

    fn enter(&mut self) -> Result<()> {
        if self.current >= self.max {
            warn!(max_depth = self.max, "JSON nesting depth limit reached");
            return Err(Error::DepthLimitExceeded { depth: self.max });
        }
        self.current += 1;
        Ok(())
    }

    fn exit(&mut self) {
        self.current = self.current.saturating_sub(1);
    }
}

/// Single-use reader producing one value tree.
///
/// Finished children wait on scratch stacks owned by the reader; each array
/// or object is allocated from the storage handle once, when it closes, with
/// its exact size.
pub(super) struct Reader<'a, 'r> {
    input: &'a str,
    pos: usize,
    storage: &'a StorageHandle<'r>,
    config: ParserConfig,
    depth: DepthTracker,
    values: Vec<Value<'r>>,
    keys: Vec<JsonString<'r>>,
    text: String,
}

impl<'a, 'r> Reader<'a, 'r> {
    pub(super) fn new(
        input: &'a str,
        storage: &'a StorageHandle<'r>,
        config: ParserConfig,
    ) -> Self {
        Self {
            input,
            pos: 0,
            storage,
            config,
            depth: DepthTracker::with_max_depth(config.max_depth),
            values: Vec::new(),
            keys: Vec::new(),
            text: String::new(),
        }
    }

    pub(super) fn read_document(mut self) -> Result<Value<'r>> {
        self.skip_whitespace()?;
        if self.peek().is_none() {
            return Err(Error::Incomplete);
        }
        let value = self.read_value()?;
        self.skip_whitespace()?;
        if self.peek().is_some() {
            return Err(self.error("unexpected data after the document"));
        }
        Ok(value)
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    #[inline]
    fn next_byte(&mut self) -> Result<u8> {
        let byte = self.peek().ok_or(Error::Incomplete)?;
        self.pos += 1;
        Ok(byte)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::syntax(self.pos, message)
    }

    /// Error for the byte just consumed
    fn error_before(&self, message: impl Into<String>) -> Error {
        Error::syntax(self.pos.saturating_sub(1), message)
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.pos += 1,
                Some(b'/') if self.config.allow_comments => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        self.pos += 1;
        match self.next_byte()? {
            b'/' => {
                while let Some(byte) = self.peek() {
                    self.pos += 1;
                    if byte == b'\n' {
                        break;
                    }
                }
                Ok(())
            }
            b'*' => loop {
                if self.next_byte()? == b'*' && self.peek() == Some(b'/') {
                    self.pos += 1;
                    return Ok(());
                }
            },
            _ => Err(self.error_before("invalid comment")),
        }
    }

    fn read_value(&mut self) -> Result<Value<'r>> {
        match self.peek().ok_or(Error::Incomplete)? {
            b'{' => self.read_object(),
            b'[' => self.read_array(),
            b'"' => Ok(self.read_string()?.into()),
            b't' => {
                self.read_literal("true")?;
                Ok(Value::from_bool(true, self.storage.clone()))
            }
            b'f' => {
                self.read_literal("false")?;
                Ok(Value::from_bool(false, self.storage.clone()))
            }
            b'n' => {
                self.read_literal("null")?;
                Ok(Value::null(self.storage.clone()))
            }
            b'-' | b'0'..=b'9' => self.read_number(),
            _ => Err(self.error("unexpected character")),
        }
    }

    fn read_literal(&mut self, literal: &'static str) -> Result<()> {
        let rest = &self.input.as_bytes()[self.pos..];
        if rest.starts_with(literal.as_bytes()) {
            self.pos += literal.len();
            Ok(())
        } else if literal.as_bytes().starts_with(rest) {
            Err(Error::Incomplete)
        } else {
            Err(self.error(format!("expected `{literal}`")))
        }
    }

    /// After a `,`: whether the container closes with `close` right away
    fn trailing_comma(&mut self, close: u8) -> Result<bool> {
        self.skip_whitespace()?;
        if self.peek() != Some(close) {
            return Ok(false);
        }
        if !self.config.allow_trailing_commas {
            return Err(self.error("trailing comma"));
        }
        self.pos += 1;
        Ok(true)
    }

    fn read_array(&mut self) -> Result<Value<'r>> {
        self.depth.enter()?;
        self.pos += 1;
        let mark = self.values.len();

        self.skip_whitespace()?;
        if self.peek() == Some(b']') {
            self.pos += 1;
        } else {
            loop {
                let value = self.read_value()?;
                self.values.push(value);
                self.skip_whitespace()?;
                match self.next_byte()? {
                    b',' => {
                        if self.trailing_comma(b']')? {
                            break;
                        }
                    }
                    b']' => break,
                    _ => return Err(self.error_before("expected `,` or `]`")),
                }
            }
        }

        self.depth.exit();
        let array = Array::from_values_in(self.values.drain(mark..), self.storage.clone())?;
        Ok(array.into())
    }

    fn read_object(&mut self) -> Result<Value<'r>> {
        self.depth.enter()?;
        self.pos += 1;
        let (key_mark, value_mark) = (self.keys.len(), self.values.len());

        self.skip_whitespace()?;
        if self.peek() == Some(b'}') {
            self.pos += 1;
        } else {
            loop {
                match self.peek() {
                    Some(b'"') => {}
                    Some(_) => return Err(self.error("expected a string key")),
                    None => return Err(Error::Incomplete),
                }
                let key = self.read_string()?;
                self.skip_whitespace()?;
                if self.next_byte()? != b':' {
                    return Err(self.error_before("expected `:`"));
                }
                self.skip_whitespace()?;
                let value = self.read_value()?;
                self.keys.push(key);
                self.values.push(value);

                self.skip_whitespace()?;
                match self.next_byte()? {
                    b',' => {
                        if self.trailing_comma(b'}')? {
                            break;
                        }
                    }
                    b'}' => break,
                    _ => return Err(self.error_before("expected `,` or `}`")),
                }
            }
        }

        self.depth.exit();
        let pairs = self.keys.drain(key_mark..).zip(self.values.drain(value_mark..));
        let object = Object::from_pairs_in(pairs, self.storage.clone())?;
        Ok(object.into())
    }

    fn read_string(&mut self) -> Result<JsonString<'r>> {
        let input = self.input;
        self.pos += 1;
        let start = self.pos;

        // Unescaped strings are copied straight from the input
        loop {
            match self.peek() {
                None => return Err(Error::Incomplete),
                Some(b'"') => {
                    let s = &input[start..self.pos];
                    self.pos += 1;
                    return Ok(JsonString::from_str_in(s, self.storage.clone())?);
                }
                Some(b'\\') => break,
                Some(0x00..=0x1f) => return Err(self.error("control character in string")),
                Some(_) => self.pos += 1,
            }
        }

        self.text.clear();
        self.text.push_str(&input[start..self.pos]);
        loop {
            match self.next_byte()? {
                b'"' => break,
                b'\\' => self.read_escape()?,
                0x00..=0x1f => return Err(self.error_before("control character in string")),
                _ => {
                    let run = self.pos - 1;
                    while let Some(byte) = self.peek() {
                        if byte == b'"' || byte == b'\\' || byte < 0x20 {
                            break;
                        }
                        self.pos += 1;
                    }
                    self.text.push_str(&input[run..self.pos]);
                }
            }
        }
        Ok(JsonString::from_str_in(&self.text, self.storage.clone())?)
    }

    fn read_escape(&mut self) -> Result<()> {
        let c = match self.next_byte()? {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => self.read_unicode_escape()?,
            _ => return Err(self.error_before("invalid escape sequence")),
        };
        self.text.push(c);
        Ok(())
    }

    fn read_hex4(&mut self) -> Result<u32> {
        let input = self.input.as_bytes();
        let digits = input.get(self.pos..self.pos + 4).ok_or(Error::Incomplete)?;
        let mut code = 0;
        for &digit in digits {
            let nibble = char::from(digit)
                .to_digit(16)
                .ok_or_else(|| self.error("invalid unicode escape"))?;
            code = code * 16 + nibble;
        }
        self.pos += 4;
        Ok(code)
    }

    fn read_unicode_escape(&mut self) -> Result<char> {
        let first = self.read_hex4()?;
        let code = match first {
            0xD800..=0xDBFF => {
                match (self.peek(), self.input.as_bytes().get(self.pos + 1).copied()) {
                    (Some(b'\\'), Some(b'u')) => self.pos += 2,
                    (None, _) | (Some(b'\\'), None) => return Err(Error::Incomplete),
                    _ => return Err(self.error("unpaired surrogate")),
                }
                let second = self.read_hex4()?;
                if !(0xDC00..=0xDFFF).contains(&second) {
                    return Err(self.error("invalid low surrogate"));
                }
                0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(self.error("unpaired surrogate")),
            _ => first,
        };
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|byte| byte.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn expect_digits(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'0'..=b'9') => {
                self.skip_digits();
                Ok(())
            }
            Some(_) => Err(self.error("expected a digit")),
            None => Err(Error::Incomplete),
        }
    }

    fn read_number(&mut self) -> Result<Value<'r>> {
        let start = self.pos;
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => self.skip_digits(),
            Some(_) => return Err(self.error("expected a digit")),
            None => return Err(Error::Incomplete),
        }

        let mut integer = true;
        if self.peek() == Some(b'.') {
            integer = false;
            self.pos += 1;
            self.expect_digits()?;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            integer = false;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            self.expect_digits()?;
        }

        let text = &self.input[start..self.pos];
        let storage = self.storage.clone();
        if integer {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::from_i64(n, storage));
            }
            if !negative && let Ok(n) = text.parse::<u64>() {
                return Ok(Value::from_u64(n, storage));
            }
        }
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::from_f64(n, storage)),
            _ => Err(Error::syntax(start, "number out of range")),
        }
    }
}
